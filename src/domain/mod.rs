//! Domain layer - Core business logic with no external dependencies
//!
//! This layer contains:
//! - Entities: Core business objects (events, senders, descriptors)
//! - Traits: Abstractions at the host/module and host/protocol seams

pub mod entities;
pub mod traits;
