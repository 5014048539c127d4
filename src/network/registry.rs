//! Connection Registry
//!
//! Keeps a handle on every accepted socket until its job finishes, so a
//! forced shutdown can unblock workers stuck in socket I/O.

use std::collections::HashMap;
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    next_id: AtomicU64,
    live: Mutex<HashMap<u64, TcpStream>>,
}

/// Removes its connection from the registry when dropped
#[derive(Debug)]
pub struct Registration {
    registry: Arc<ConnectionRegistry>,
    id: u64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `stream` until the returned registration is dropped
    pub fn register(self: &Arc<Self>, stream: &TcpStream) -> Result<Registration> {
        let handle = stream.try_clone()?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.live.lock().insert(id, handle);

        Ok(Registration {
            registry: Arc::clone(self),
            id,
        })
    }

    /// Number of tracked connections
    pub fn len(&self) -> usize {
        self.live.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shut down every tracked socket; returns how many were shut down
    pub fn abort_all(&self) -> usize {
        let live = self.live.lock();
        for (id, stream) in live.iter() {
            if let Err(e) = stream.shutdown(Shutdown::Both) {
                tracing::debug!("Connection {} already closed: {}", id, e);
            }
        }
        live.len()
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.live.lock().remove(&self.id);
    }
}
