//! Application layer - Use cases and business logic
//!
//! This layer contains:
//! - Dispatch: registry, parser, and the dispatcher itself
//! - Broker: read-only host state queries for modules
//! - Services: per-server worker orchestration
//! - Errors: host-side error types

pub mod broker;
pub mod dispatch;
pub mod errors;
pub mod services;
