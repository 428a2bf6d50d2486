//! Module lifecycle - per-slot state machine and the manager that drives it

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex as AsyncMutex};

use super::factory::ModuleFactory;
use super::proxy::{ModuleProxy, ModuleTable};
use super::sandbox::{ContextId, IsolationContext, TrustLevel};
use crate::application::broker::VariableBroker;
use crate::application::dispatch::registry::{EventRegistry, HandlerBinding};
use crate::application::errors::{HostError, LoadError};
use crate::domain::entities::{ModuleDescriptor, PrivilegeTier, Sender};
use crate::domain::traits::{AdminCommand, AdminHandle, HostCapabilities, HostVars, ModuleId};

/// Lifecycle state of one module slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Unloaded,
    Loading,
    Active,
    Unloading,
}

impl std::fmt::Display for SlotState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SlotState::Unloaded => "unloaded",
            SlotState::Loading => "loading",
            SlotState::Active => "active",
            SlotState::Unloading => "unloading",
        };
        write!(f, "{}", s)
    }
}

/// Operator-facing snapshot of one slot.
#[derive(Debug, Clone)]
pub struct ModuleStatus {
    pub slot: ModuleId,
    pub name: String,
    pub state: SlotState,
}

struct SlotInner {
    descriptor: ModuleDescriptor,
    state: SlotState,
    proxy: Option<Arc<ModuleProxy>>,
}

struct ModuleSlot {
    id: ModuleId,
    name: String,
    trusted: bool,
    inner: AsyncMutex<SlotInner>,
}

/// Orchestrates every configured module's lifecycle.
///
/// Each slot moves Unloaded -> Loading -> Active -> Unloading -> Unloaded,
/// and the slot becomes eligible for a fresh load after each unload.
/// Reload is explicitly unload-then-load; events arriving in the gap are
/// simply undispatched.
pub struct ModuleManager {
    slots: Vec<ModuleSlot>,
    factory: ModuleFactory,
    registry: Arc<EventRegistry>,
    table: Arc<ModuleTable>,
    broker: Arc<VariableBroker>,
    handler_timeout: Duration,
    admin_tx: mpsc::UnboundedSender<AdminCommand>,
}

impl ModuleManager {
    /// Build the manager over configured descriptors. `trusted` descriptors
    /// get full-trust contexts when loaded. Returns the receiving end of
    /// the admin channel; pass it to `serve_admin`.
    pub fn new(
        factory: ModuleFactory,
        registry: Arc<EventRegistry>,
        table: Arc<ModuleTable>,
        broker: Arc<VariableBroker>,
        handler_timeout: Duration,
        descriptors: Vec<(ModuleDescriptor, bool)>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<AdminCommand>) {
        let (admin_tx, admin_rx) = mpsc::unbounded_channel();
        let slots = descriptors
            .into_iter()
            .enumerate()
            .map(|(id, (descriptor, trusted))| ModuleSlot {
                id,
                name: descriptor.display_name.clone(),
                trusted,
                inner: AsyncMutex::new(SlotInner {
                    descriptor,
                    state: SlotState::Unloaded,
                    proxy: None,
                }),
            })
            .collect();
        (
            Arc::new(Self {
                slots,
                factory,
                registry,
                table,
                broker,
                handler_timeout,
                admin_tx,
            }),
            admin_rx,
        )
    }

    fn find(&self, name: &str) -> Result<&ModuleSlot, LoadError> {
        self.slots
            .iter()
            .find(|slot| slot.name == name)
            .ok_or_else(|| LoadError::NotFound(name.to_string()))
    }

    /// Handle given to full-trust contexts so lifecycle-management modules
    /// can drive other modules.
    pub fn admin_handle(&self) -> AdminHandle {
        AdminHandle::new(self.admin_tx.clone())
    }

    /// Load a configured module into a fresh isolation context.
    pub async fn load(&self, name: &str) -> Result<(), LoadError> {
        let slot = self.find(name)?;
        let mut inner = slot.inner.lock().await;
        if inner.state != SlotState::Unloaded {
            return Err(LoadError::SlotBusy(name.to_string()));
        }
        inner.state = SlotState::Loading;

        let trust = if slot.trusted {
            TrustLevel::Full
        } else {
            TrustLevel::Restricted
        };
        let context = Arc::new(IsolationContext::create(
            ContextId(slot.id),
            trust,
            self.handler_timeout,
        ));
        tracing::debug!(
            "{}: created for '{}' with {:?} trust",
            context.id(),
            name,
            context.trust()
        );
        let caps = HostCapabilities {
            vars: self.broker.clone() as Arc<dyn HostVars>,
            admin: slot.trusted.then(|| self.admin_handle()),
        };

        let loaded = ModuleProxy::load(slot.id, &inner.descriptor, &self.factory, context.clone(), &caps);
        let (proxy, registrations) = match loaded {
            Ok(loaded) => loaded,
            Err(e) => {
                // Failed loads are fully reversible: no context, no bindings.
                context.destroy().await;
                inner.state = SlotState::Unloaded;
                tracing::error!("Load of '{}' failed: {}", name, e);
                return Err(e);
            }
        };

        // Dispatch-eligible once the proxy is reachable and the module's
        // registrations are committed.
        let proxy = Arc::new(proxy);
        self.table.insert(proxy.clone());
        for registration in registrations {
            if let Err(e) = self
                .registry
                .register(HandlerBinding::from_registration(slot.id, registration))
            {
                self.registry.unregister_all(slot.id);
                self.table.remove(slot.id);
                context.destroy().await;
                inner.state = SlotState::Unloaded;
                tracing::error!("Registration for '{}' failed: {}", name, e);
                return Err(e);
            }
        }

        inner.proxy = Some(proxy);
        inner.state = SlotState::Active;
        Ok(())
    }

    /// Unload an active module. Deregistration happens synchronously before
    /// any context teardown, so no dispatch can reach the module
    /// mid-teardown; an in-flight invocation is allowed to finish.
    pub async fn unload(&self, name: &str) -> Result<(), LoadError> {
        let slot = self.find(name)?;
        let mut inner = slot.inner.lock().await;
        if inner.state != SlotState::Active {
            return Err(LoadError::SlotBusy(name.to_string()));
        }
        inner.state = SlotState::Unloading;

        self.registry.unregister_all(slot.id);
        self.table.remove(slot.id);
        if let Some(proxy) = inner.proxy.take() {
            proxy.shutdown().await;
        }

        inner.state = SlotState::Unloaded;
        Ok(())
    }

    /// Reload = unload then load with the slot's descriptor.
    pub async fn reload(&self, name: &str) -> Result<(), LoadError> {
        match self.unload(name).await {
            Ok(()) | Err(LoadError::SlotBusy(_)) => {}
            Err(e) => return Err(e),
        }
        self.load(name).await
    }

    /// Load every given module, reporting per-module failures without
    /// aborting the rest.
    pub async fn load_all(&self, names: &[String]) {
        for name in names {
            if let Err(e) = self.load(name).await {
                tracing::error!("Skipping module '{}': {}", name, e);
            }
        }
    }

    /// Snapshot of all slots for the operator surface.
    pub async fn status(&self) -> Vec<ModuleStatus> {
        let mut out = Vec::with_capacity(self.slots.len());
        for slot in &self.slots {
            let inner = slot.inner.lock().await;
            out.push(ModuleStatus {
                slot: slot.id,
                name: slot.name.clone(),
                state: inner.state,
            });
        }
        out
    }

    /// Operator entry point; restricted to the highest privilege tier.
    pub async fn execute_admin(
        &self,
        command: &AdminCommand,
        caller: &Sender,
    ) -> Result<String, HostError> {
        if caller.tier < PrivilegeTier::Owner {
            return Err(HostError::PermissionDenied);
        }
        self.apply(command).await.map_err(HostError::Load)
    }

    async fn apply(&self, command: &AdminCommand) -> Result<String, LoadError> {
        match command {
            AdminCommand::Load(name) => {
                self.load(name).await?;
                Ok(format!("Loaded '{}'", name))
            }
            AdminCommand::Unload(name) => {
                self.unload(name).await?;
                Ok(format!("Unloaded '{}'", name))
            }
            AdminCommand::Reload(name) => {
                self.reload(name).await?;
                Ok(format!("Reloaded '{}'", name))
            }
        }
    }

    /// Drain commands submitted by full-trust modules. Trust was granted at
    /// load time, so no further gate applies here.
    pub async fn serve_admin(self: Arc<Self>, mut rx: mpsc::UnboundedReceiver<AdminCommand>) {
        while let Some(command) = rx.recv().await {
            match self.apply(&command).await {
                Ok(summary) => tracing::info!("Admin: {}", summary),
                Err(e) => tracing::error!("Admin command {:?} failed: {}", command, e),
            }
        }
    }
}
