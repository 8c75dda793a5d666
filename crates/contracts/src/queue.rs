//! Fixed-capacity FIFO ports bridging the scan cycle and the dispatch
//! consumer.
//!
//! Semantics are best-effort, at-most-once: `try_enqueue` never blocks and
//! silently drops when the port is full; `try_dequeue` never blocks and
//! returns `None` when empty. There is no acknowledgement and no redelivery.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::error::QueueError;

struct Port {
    capacity: usize,
    buf: VecDeque<String>,
}

/// Registry of ports keyed by a well-known numeric id.
pub struct PortRegistry {
    ports: Mutex<HashMap<u16, Port>>,
}

impl PortRegistry {
    pub fn new() -> Self {
        Self {
            ports: Mutex::new(HashMap::new()),
        }
    }

    /// Open a port with a fixed capacity. Re-opening keeps the existing
    /// contents and capacity.
    pub fn open(&self, port: u16, capacity: usize) {
        if let Ok(mut ports) = self.ports.lock() {
            ports.entry(port).or_insert_with(|| Port {
                capacity,
                buf: VecDeque::with_capacity(capacity),
            });
        }
    }

    /// Non-blocking write. Returns `false` (and drops the payload) when the
    /// port is full.
    pub fn try_enqueue(&self, port: u16, payload: &str) -> Result<bool, QueueError> {
        let mut ports = self.ports.lock().map_err(|_| QueueError::Poisoned)?;
        let port = ports.get_mut(&port).ok_or(QueueError::Closed(port))?;
        if port.buf.len() >= port.capacity {
            return Ok(false);
        }
        port.buf.push_back(payload.to_string());
        Ok(true)
    }

    /// Non-blocking read. Returns `None` when the port is empty.
    pub fn try_dequeue(&self, port: u16) -> Result<Option<String>, QueueError> {
        let mut ports = self.ports.lock().map_err(|_| QueueError::Poisoned)?;
        let port = ports.get_mut(&port).ok_or(QueueError::Closed(port))?;
        Ok(port.buf.pop_front())
    }

    /// Number of payloads currently buffered.
    pub fn len(&self, port: u16) -> usize {
        self.ports
            .lock()
            .ok()
            .and_then(|ports| ports.get(&port).map(|p| p.buf.len()))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, port: u16) -> bool {
        self.len(port) == 0
    }
}

impl Default for PortRegistry {
    fn default() -> Self {
        Self::new()
    }
}
