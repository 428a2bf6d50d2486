//! rook-bot - plugin-hosting core of a multi-server chat bot
//!
//! Hosts independently authored command modules in isolated execution
//! contexts, routes protocol events to the handlers that registered
//! interest, enforces per-handler permission gates, and supports
//! load/unload/reload without restarting the host.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod modules;
