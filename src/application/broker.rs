//! Variable broker - read-only host state queries for modules

use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::entities::ServerId;
use crate::domain::traits::HostVars;

/// Holds host-side per-server values modules may query by key and server id.
///
/// The request path is the only one modules see; writes happen host-side at
/// assembly time. Unknown keys and unknown servers resolve to `None`, which
/// callers treat as normal absence.
pub struct VariableBroker {
    vars: RwLock<HashMap<ServerId, HashMap<String, String>>>,
}

impl VariableBroker {
    pub fn new() -> Self {
        Self {
            vars: RwLock::new(HashMap::new()),
        }
    }

    /// Host-side: publish a value for one server.
    pub fn set(&self, server_id: ServerId, key: impl Into<String>, value: impl Into<String>) {
        if let Ok(mut vars) = self.vars.write() {
            vars.entry(server_id)
                .or_default()
                .insert(key.into(), value.into());
        }
    }

    pub fn request(&self, key: &str, server_id: ServerId) -> Option<String> {
        self.vars.read().ok()?.get(&server_id)?.get(key).cloned()
    }
}

impl Default for VariableBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl HostVars for VariableBroker {
    fn request(&self, key: &str, server_id: ServerId) -> Option<String> {
        VariableBroker::request(self, key, server_id)
    }
}
