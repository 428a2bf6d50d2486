//! Module proxy - host-side handle forwarding calls into one context

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::factory::ModuleFactory;
use super::sandbox::IsolationContext;
use crate::application::errors::{InvokeError, LoadError};
use crate::domain::entities::{ModuleDescriptor, OutputLine};
use crate::domain::traits::{HandlerCall, HostCapabilities, ModuleId, ModuleInvoker, Registration};

/// Per-module host object owning the context reference and forwarding
/// load, invocation, and teardown across the isolation boundary.
pub struct ModuleProxy {
    module_id: ModuleId,
    display_name: String,
    context: Arc<IsolationContext>,
}

impl ModuleProxy {
    /// Load a module into the given context, returning the proxy and the
    /// registrations the module made during its initialization.
    pub fn load(
        module_id: ModuleId,
        descriptor: &ModuleDescriptor,
        factory: &ModuleFactory,
        context: Arc<IsolationContext>,
        caps: &HostCapabilities,
    ) -> Result<(Self, Vec<Registration>), LoadError> {
        let registrations = context.load(factory, descriptor, caps)?;
        tracing::info!(
            "Loaded module '{}' ({} registration(s))",
            descriptor.display_name,
            registrations.len()
        );
        Ok((
            Self {
                module_id,
                display_name: descriptor.display_name.clone(),
                context,
            },
            registrations,
        ))
    }

    pub fn module_id(&self) -> ModuleId {
        self.module_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Invoke one handler, marshaling the call in and the lines out.
    pub async fn invoke(&self, call: HandlerCall) -> Result<Vec<OutputLine>, InvokeError> {
        let payload = serde_json::to_value(&call)
            .map_err(|e| InvokeError::Fault(format!("call marshaling: {}", e)))?;
        let result = self.context.invoke(payload).await?;
        serde_json::from_value(result)
            .map_err(|e| InvokeError::Fault(format!("result marshaling: {}", e)))
    }

    /// Destroy the backing context; any in-flight invocation finishes first.
    pub async fn shutdown(&self) {
        self.context.destroy().await;
        tracing::info!("Unloaded module '{}'", self.display_name);
    }
}

/// Live proxies by module id; read by the dispatcher on every invocation,
/// mutated only by the module manager.
pub struct ModuleTable {
    inner: RwLock<HashMap<ModuleId, Arc<ModuleProxy>>>,
}

impl ModuleTable {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    pub fn insert(&self, proxy: Arc<ModuleProxy>) {
        if let Ok(mut table) = self.inner.write() {
            table.insert(proxy.module_id(), proxy);
        }
    }

    pub fn remove(&self, module_id: ModuleId) {
        if let Ok(mut table) = self.inner.write() {
            table.remove(&module_id);
        }
    }

    pub fn get(&self, module_id: ModuleId) -> Option<Arc<ModuleProxy>> {
        self.inner.read().ok()?.get(&module_id).cloned()
    }
}

impl Default for ModuleTable {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModuleInvoker for ModuleTable {
    async fn invoke(
        &self,
        module_id: ModuleId,
        call: HandlerCall,
    ) -> Result<Vec<OutputLine>, InvokeError> {
        match self.get(module_id) {
            Some(proxy) => proxy.invoke(call).await,
            None => Err(InvokeError::ContextGone),
        }
    }
}
