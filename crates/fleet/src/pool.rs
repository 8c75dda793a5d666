//! The exec pool: nodes usable as compute donors, in scheduling priority
//! order.

use spider_netenv::NetEnv;

/// Ordered compute donors. Capacity-only nodes discovered during
/// classification are prepended (highest priority); the root node sits last
/// as the fallback. The pool grows monotonically within a run and has a
/// single writer, the classifier.
#[derive(Debug, Clone)]
pub struct ExecPool {
    hosts: Vec<String>,
}

impl ExecPool {
    /// Seed the pool: purchased nodes matching one of the configured name
    /// prefixes first, then the root.
    pub fn seeded(env: &dyn NetEnv, prefixes: &[String], root: &str) -> Self {
        let mut hosts: Vec<String> = env
            .purchased_nodes()
            .into_iter()
            .filter(|h| prefixes.iter().any(|p| h.starts_with(p.as_str())))
            .collect();
        hosts.push(root.to_string());
        Self { hosts }
    }

    pub fn from_hosts(hosts: Vec<String>) -> Self {
        Self { hosts }
    }

    /// Prepend a newly discovered capacity-only node, unless already pooled.
    pub fn register(&mut self, hostname: &str) {
        if !self.contains(hostname) {
            self.hosts.insert(0, hostname.to_string());
        }
    }

    pub fn contains(&self, hostname: &str) -> bool {
        self.hosts.iter().any(|h| h == hostname)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.hosts.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spider_netenv::{SimNet, SimNode};

    #[test]
    fn test_seed_filters_by_prefix_and_ends_with_root() {
        let net = SimNet::new(1);
        net.add_node(SimNode::new("home").owned());
        for host in ["exec-node-0", "exec-node-1", "db-server"] {
            net.add_node(SimNode::new(host).owned());
            net.add_purchased(host);
        }

        let pool = ExecPool::seeded(&net, &["exec-node".to_string()], "home");
        let hosts: Vec<&str> = pool.iter().collect();
        assert_eq!(hosts, vec!["exec-node-0", "exec-node-1", "home"]);
    }

    #[test]
    fn test_register_prepends_without_duplicates() {
        let mut pool = ExecPool::from_hosts(vec!["home".to_string()]);
        pool.register("cap-1");
        pool.register("cap-2");
        pool.register("cap-1");

        let hosts: Vec<&str> = pool.iter().collect();
        assert_eq!(hosts, vec!["cap-2", "cap-1", "home"]);
        assert_eq!(pool.len(), 3);
    }
}
