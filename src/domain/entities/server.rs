use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// Identifies one server connection of the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerId(pub u32);

impl std::fmt::Display for ServerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-server state owned by whichever module needs it.
///
/// Lifetime of an entry is tied to the server connection; callers reset the
/// entry when the connection is re-established.
pub struct ServerStateMap<T> {
    inner: RwLock<HashMap<ServerId, T>>,
}

impl<T> ServerStateMap<T> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Get a copy of the state for a server, if any.
    pub fn get(&self, id: ServerId) -> Option<T>
    where
        T: Clone,
    {
        self.inner.read().ok()?.get(&id).cloned()
    }

    /// Replace the state for a server.
    pub fn set(&self, id: ServerId, value: T) {
        if let Ok(mut map) = self.inner.write() {
            map.insert(id, value);
        }
    }

    /// Mutate the state for a server in place, inserting the default first
    /// if the server has none yet.
    pub fn update<R>(&self, id: ServerId, f: impl FnOnce(&mut T) -> R) -> Option<R>
    where
        T: Default,
    {
        let mut map = self.inner.write().ok()?;
        Some(f(map.entry(id).or_default()))
    }

    /// Drop the state for a server (called on reconnect).
    pub fn reset(&self, id: ServerId) {
        if let Ok(mut map) = self.inner.write() {
            map.remove(&id);
        }
    }
}

impl<T> Default for ServerStateMap<T> {
    fn default() -> Self {
        Self::new()
    }
}
