//! Topology scanner: depth-first discovery of every reachable node.

use std::collections::HashSet;

use spider_netenv::NetEnv;

/// One discovered node with its distance from the scan root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    pub hostname: String,
    pub depth: u32,
}

/// Walk the graph from `root`, emitting each reachable node exactly once in
/// DFS pre-order following the environment's native neighbor ordering.
///
/// The order is a contract: a node always precedes all of its descendants,
/// which the per-cycle report relies on. Cycles are handled by the visited
/// set; the explicit stack keeps deep graphs off the call stack.
pub fn scan(env: &dyn NetEnv, root: &str) -> Vec<Discovery> {
    let mut visited: HashSet<String> = HashSet::new();
    let mut stack: Vec<(String, u32)> = vec![(root.to_string(), 0)];
    let mut discovered = Vec::new();

    while let Some((hostname, depth)) = stack.pop() {
        if !visited.insert(hostname.clone()) {
            continue;
        }
        let neighbors = env.neighbors(&hostname);
        discovered.push(Discovery { hostname, depth });
        // Reverse push so the first neighbor is processed first, matching
        // recursive pre-order.
        for neighbor in neighbors.into_iter().rev() {
            if !visited.contains(&neighbor) {
                stack.push((neighbor, depth + 1));
            }
        }
    }

    discovered
}

#[cfg(test)]
mod tests {
    use super::*;
    use spider_netenv::{SimNet, SimNode};

    fn hostnames(discoveries: &[Discovery]) -> Vec<&str> {
        discoveries.iter().map(|d| d.hostname.as_str()).collect()
    }

    #[test]
    fn test_chain_depths() {
        let net = SimNet::new(1);
        for host in ["home", "n1", "n2"] {
            net.add_node(SimNode::new(host));
        }
        net.connect("home", "n1");
        net.connect("n1", "n2");

        let discoveries = scan(&net, "home");
        assert_eq!(hostnames(&discoveries), vec!["home", "n1", "n2"]);
        assert_eq!(
            discoveries.iter().map(|d| d.depth).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_cycle_emits_each_node_once() {
        let net = SimNet::new(1);
        for host in ["home", "a", "b", "c"] {
            net.add_node(SimNode::new(host));
        }
        // Diamond with a cycle: home-a, home-b, a-c, b-c.
        net.connect("home", "a");
        net.connect("home", "b");
        net.connect("a", "c");
        net.connect("b", "c");

        let discoveries = scan(&net, "home");
        assert_eq!(discoveries.len(), 4);
        let mut names = hostnames(&discoveries);
        names.sort_unstable();
        assert_eq!(names, vec!["a", "b", "c", "home"]);
        // Pre-order along first-neighbor edges: c is reached through a,
        // and b only afterwards through c.
        assert_eq!(hostnames(&discoveries), vec!["home", "a", "c", "b"]);
    }

    #[test]
    fn test_parent_precedes_descendants() {
        let net = SimNet::new(1);
        for host in ["home", "a", "b", "a1", "a2", "b1"] {
            net.add_node(SimNode::new(host));
        }
        net.connect("home", "a");
        net.connect("home", "b");
        net.connect("a", "a1");
        net.connect("a", "a2");
        net.connect("b", "b1");

        let discoveries = scan(&net, "home");
        let position = |host: &str| {
            discoveries
                .iter()
                .position(|d| d.hostname == host)
                .unwrap()
        };
        assert!(position("a") < position("a1"));
        assert!(position("a") < position("a2"));
        assert!(position("b") < position("b1"));
        // A subtree is contiguous: both children of `a` come before `b`.
        assert!(position("a2") < position("b"));
    }
}
