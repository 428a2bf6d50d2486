//! Isolation context - the boundary between host and module code
//!
//! Each context hosts exactly one module instance. Calls cross the boundary
//! through `invoke`, which marshals the payload, runs the handler off the
//! async runtime with a bounded timeout, and converts panics and handler
//! errors into `InvokeError` values; no fault raised inside the context ever
//! escapes as a host fault. Invocations from different servers run
//! concurrently against the shared instance; teardown waits until every
//! in-flight call has returned. Contexts are never shared between modules.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex as StdMutex, RwLock as StdRwLock};
use std::time::Duration;
use tokio::sync::RwLock as AsyncRwLock;

use super::factory::ModuleFactory;
use crate::application::errors::{InvokeError, LoadError};
use crate::domain::entities::ModuleDescriptor;
use crate::domain::traits::{BotModule, HandlerCall, HostCapabilities, Registrar, Registration};

/// Context identifier, derived from the module's slot number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(pub usize);

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ctx-{}", self.0)
    }
}

/// Privilege granted to a context. Restricted is the default; Full is an
/// explicit elevation for lifecycle-management modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustLevel {
    Restricted,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Created,
    Active,
    Unloading,
    Destroyed,
}

/// Handler calls take the read side; init and shutdown take the write side.
type Instance = Arc<StdRwLock<Box<dyn BotModule>>>;

/// Sandboxed execution environment hosting one module instance.
pub struct IsolationContext {
    id: ContextId,
    trust: TrustLevel,
    timeout: Duration,
    state: StdMutex<ContextState>,
    instance: StdMutex<Option<Instance>>,
    /// Invocations hold this shared; destroy takes it exclusively, so
    /// teardown admits no new call and waits out the in-flight ones.
    invoke_gate: AsyncRwLock<()>,
}

impl IsolationContext {
    pub fn create(id: ContextId, trust: TrustLevel, timeout: Duration) -> Self {
        Self {
            id,
            trust,
            timeout,
            state: StdMutex::new(ContextState::Created),
            instance: StdMutex::new(None),
            invoke_gate: AsyncRwLock::new(()),
        }
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn trust(&self) -> TrustLevel {
        self.trust
    }

    pub fn state(&self) -> ContextState {
        *self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn set_state(&self, next: ContextState) {
        *self.state.lock().unwrap_or_else(|p| p.into_inner()) = next;
    }

    /// Construct the descriptor's entry type inside the context and run the
    /// module's own initialization, collecting its registrations.
    ///
    /// On any failure nothing is retained; the caller destroys the context,
    /// making a failed load fully reversible.
    pub fn load(
        &self,
        factory: &ModuleFactory,
        descriptor: &ModuleDescriptor,
        caps: &HostCapabilities,
    ) -> Result<Vec<Registration>, LoadError> {
        if self.state() != ContextState::Created {
            return Err(LoadError::SlotBusy(descriptor.display_name.clone()));
        }
        let mut module = factory.construct(&descriptor.entry_type)?;
        tracing::debug!(
            "{}: constructed '{}' ({}, {} file(s))",
            self.id,
            descriptor.display_name,
            descriptor.entry_type,
            descriptor.files.len()
        );

        let mut registrar = Registrar::new();
        let init = std::panic::catch_unwind(AssertUnwindSafe(|| {
            module.init(&mut registrar, caps)
        }));
        match init {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(LoadError::Init(e.to_string())),
            Err(_) => {
                return Err(LoadError::Init(format!(
                    "'{}' panicked during init",
                    descriptor.display_name
                )))
            }
        }

        let registrations = registrar.take();
        *self
            .instance
            .lock()
            .unwrap_or_else(|p| p.into_inner()) = Some(Arc::new(StdRwLock::new(module)));
        self.set_state(ContextState::Active);
        Ok(registrations)
    }

    /// Boundary-crossing call: marshal the payload in, run the handler on a
    /// blocking thread under the configured timeout, marshal the result out.
    ///
    /// Calls from different server streams proceed concurrently; each one is
    /// bounded by its own timeout.
    pub async fn invoke(
        &self,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value, InvokeError> {
        let _gate = self.invoke_gate.read().await;
        if self.state() != ContextState::Active {
            return Err(InvokeError::ContextGone);
        }
        let instance = self
            .instance
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
            .ok_or(InvokeError::ContextGone)?;

        let bound = self.timeout;
        let task = tokio::task::spawn_blocking(move || -> Result<serde_json::Value, InvokeError> {
            let call: HandlerCall = serde_json::from_value(payload)
                .map_err(|e| InvokeError::Fault(format!("payload marshaling: {}", e)))?;
            let module = instance.read().unwrap_or_else(|p| p.into_inner());
            let lines = module
                .handle(&call)
                .map_err(|e| InvokeError::Fault(e.to_string()))?;
            serde_json::to_value(lines)
                .map_err(|e| InvokeError::Fault(format!("result marshaling: {}", e)))
        });

        match tokio::time::timeout(bound, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) if join.is_panic() => {
                Err(InvokeError::Fault("handler panicked".to_string()))
            }
            Ok(Err(_)) => Err(InvokeError::Fault("handler task cancelled".to_string())),
            // The blocking call is abandoned; it cannot outlive the context
            // because shutdown takes the instance lock exclusively.
            Err(_) => Err(InvokeError::Timeout(bound)),
        }
    }

    /// Tear the context down and invalidate all handles into it.
    /// Idempotent: destroying a destroyed context is a no-op.
    pub async fn destroy(&self) {
        {
            let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
            if matches!(*state, ContextState::Destroyed) {
                return;
            }
            *state = ContextState::Unloading;
        }
        // Exclusive gate: no new invocation enters, in-flight ones return.
        let _gate = self.invoke_gate.write().await;
        let instance = self
            .instance
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take();
        if let Some(instance) = instance {
            let _ = tokio::task::spawn_blocking(move || {
                let mut module = instance.write().unwrap_or_else(|p| p.into_inner());
                module.shutdown();
            })
            .await;
        }
        self.set_state(ContextState::Destroyed);
        tracing::debug!("{}: destroyed", self.id);
    }
}
