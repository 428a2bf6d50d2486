//! Infrastructure layer - External concerns
//!
//! This layer contains:
//! - Config: Configuration loading
//! - Modules: isolation contexts, proxies, lifecycle management
//! - Adapters: protocol integrations (console for development)

pub mod adapters;
pub mod config;
pub mod modules;
