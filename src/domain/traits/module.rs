//! Module-facing API - everything a hosted module sees of the host

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::application::errors::{InvokeError, ModuleError};
use crate::domain::entities::{EventKey, OutputLine, ParseType, PermissionRequirement, ServerId};

/// Slot-derived identifier of a loaded module.
pub type ModuleId = usize;

/// Opaque reference to one registered handler inside a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallbackHandle(pub u32);

/// Payload marshaled across the isolation boundary for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerCall {
    pub handle: CallbackHandle,
    pub server_id: ServerId,
    /// Channel the event arrived on, absent for private and named events.
    pub channel: Option<String>,
    pub sender_nick: String,
    /// Command remainder, or the wildcard-extracted text.
    pub args: String,
    pub raw: String,
}

impl HandlerCall {
    /// Where a reply to this call should be addressed: the originating
    /// channel, or the sender directly.
    pub fn reply_target(&self) -> &str {
        self.channel.as_deref().unwrap_or(&self.sender_nick)
    }
}

/// One registration request collected while a module initializes.
#[derive(Debug, Clone)]
pub struct Registration {
    pub key: EventKey,
    pub parse_types: Vec<ParseType>,
    pub permission: Option<PermissionRequirement>,
    pub handle: CallbackHandle,
}

/// Registration API handed to a module during its own initialization.
///
/// Requests are collected here and committed to the event registry by the
/// host only after initialization succeeds, so a failed load leaves no
/// bindings behind.
pub struct Registrar {
    next_handle: u32,
    pending: Vec<Registration>,
}

impl Registrar {
    pub fn new() -> Self {
        Self {
            next_handle: 0,
            pending: Vec::new(),
        }
    }

    /// Register a fixed command key.
    pub fn command(
        &mut self,
        key: impl Into<String>,
        parse_types: &[ParseType],
        permission: Option<PermissionRequirement>,
    ) -> CallbackHandle {
        self.push(EventKey::Exact(key.into()), parse_types, permission)
    }

    /// Register a wildcard pattern, `*` matching any non-space run.
    pub fn wildcard(
        &mut self,
        pattern: impl Into<String>,
        parse_types: &[ParseType],
        permission: Option<PermissionRequirement>,
    ) -> CallbackHandle {
        self.push(EventKey::Wildcard(pattern.into()), parse_types, permission)
    }

    /// Register a named lifecycle event such as `connect` or `ping`.
    pub fn named_event(&mut self, name: impl Into<String>) -> CallbackHandle {
        self.push(
            EventKey::Named(name.into()),
            &[ParseType::NamedEvent],
            None,
        )
    }

    fn push(
        &mut self,
        key: EventKey,
        parse_types: &[ParseType],
        permission: Option<PermissionRequirement>,
    ) -> CallbackHandle {
        let handle = CallbackHandle(self.next_handle);
        self.next_handle += 1;
        self.pending.push(Registration {
            key,
            parse_types: parse_types.to_vec(),
            permission,
            handle,
        });
        handle
    }

    /// Drain the collected requests for commit by the host.
    pub fn take(&mut self) -> Vec<Registration> {
        std::mem::take(&mut self.pending)
    }
}

impl Default for Registrar {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only host state queries available to modules.
///
/// The only window a module gets onto host-side state; absence of a key or
/// server is normal, never an error.
pub trait HostVars: Send + Sync {
    fn request(&self, key: &str, server_id: ServerId) -> Option<String>;
}

/// Administrative command an elevated module may submit to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    Load(String),
    Unload(String),
    Reload(String),
}

/// Narrow channel through which a full-trust module drives module lifecycle.
#[derive(Clone)]
pub struct AdminHandle {
    tx: mpsc::UnboundedSender<AdminCommand>,
}

impl AdminHandle {
    pub fn new(tx: mpsc::UnboundedSender<AdminCommand>) -> Self {
        Self { tx }
    }

    /// Submit a command; returns false if the host side is gone.
    pub fn submit(&self, command: AdminCommand) -> bool {
        self.tx.send(command).is_ok()
    }
}

/// Capabilities granted to a module's isolation context.
///
/// Restricted contexts get the variable broker only; `admin` is populated
/// solely for contexts the host explicitly elevated to full trust.
#[derive(Clone)]
pub struct HostCapabilities {
    pub vars: Arc<dyn HostVars>,
    pub admin: Option<AdminHandle>,
}

/// Trait every hosted module implements.
pub trait BotModule: Send + Sync {
    /// Name used in logs and status output.
    fn name(&self) -> &str;

    /// Perform the module's registrations; called exactly once, inside the
    /// module's isolation context, before any dispatch reaches it.
    fn init(&mut self, reg: &mut Registrar, caps: &HostCapabilities) -> Result<(), ModuleError>;

    /// Handle one invocation. Returning `Err` is a raised fault; a handler
    /// that wants to report a failure to users emits a normal output line.
    fn handle(&self, call: &HandlerCall) -> Result<Vec<OutputLine>, ModuleError>;

    /// Release resources before the context is destroyed.
    fn shutdown(&mut self) {}
}

/// Seam the dispatcher invokes modules through, implemented by the host-side
/// module table.
#[async_trait]
pub trait ModuleInvoker: Send + Sync {
    async fn invoke(
        &self,
        module_id: ModuleId,
        call: HandlerCall,
    ) -> Result<Vec<OutputLine>, InvokeError>;
}
