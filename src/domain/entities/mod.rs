//! Domain entities - Core business objects with no external dependencies

pub mod descriptor;
pub mod event;
pub mod sender;
pub mod server;

pub use descriptor::ModuleDescriptor;
pub use event::{EventBody, EventKey, OutputLine, ParseType, ProtocolEvent};
pub use sender::{PermissionRequirement, PrivilegeTier, Sender};
pub use server::{ServerId, ServerStateMap};
