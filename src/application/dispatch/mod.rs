//! Event dispatch - registry lookup, permission gates, handler invocation

pub mod dispatcher;
pub mod parser;
pub mod registry;

pub use dispatcher::Dispatcher;
pub use parser::EventParser;
pub use registry::{EventRegistry, HandlerBinding};
