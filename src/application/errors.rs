//! Application layer errors

use std::time::Duration;
use thiserror::Error;

/// Top-level host errors
#[derive(Error, Debug)]
pub enum HostError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Module load failures; each aborts that load only, never the host.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Unknown entry type: {0}")]
    UnknownEntryType(String),

    #[error("Module init failed: {0}")]
    Init(String),

    #[error("Invalid registration: {0}")]
    Registration(String),

    #[error("Module not found: {0}")]
    NotFound(String),

    #[error("Module '{0}' is not in a loadable state")]
    SlotBusy(String),
}

/// Failures crossing the isolation boundary during dispatch; caught at the
/// boundary and treated as "this handler produced no output".
#[derive(Error, Debug)]
pub enum InvokeError {
    #[error("Handler fault: {0}")]
    Fault(String),

    #[error("Handler exceeded {0:?}")]
    Timeout(Duration),

    #[error("Context no longer accepts calls")]
    ContextGone,
}

/// Errors raised by module code itself.
#[derive(Error, Debug)]
pub enum ModuleError {
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("Execution failed: {0}")]
    Failed(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}
