//! Module hosting - isolation contexts, proxies, and lifecycle management
//!
//! Modules are constructed through the factory, live one-per-context, and
//! are reached only through their proxy. The manager drives the slot state
//! machine and keeps the event registry and module table consistent.

pub mod factory;
pub mod host;
pub mod proxy;
pub mod sandbox;

pub use factory::ModuleFactory;
pub use host::{ModuleManager, ModuleStatus, SlotState};
pub use proxy::{ModuleProxy, ModuleTable};
pub use sandbox::{ContextId, ContextState, IsolationContext, TrustLevel};
