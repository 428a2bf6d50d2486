//! Domain traits - Abstractions at the host's seams

pub mod module;
pub mod sink;

pub use module::{
    AdminCommand, AdminHandle, BotModule, CallbackHandle, HandlerCall, HostCapabilities, HostVars,
    ModuleId, ModuleInvoker, Registrar, Registration,
};
pub use sink::ProtocolSink;
