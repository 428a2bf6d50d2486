//! Module factory - maps configured entry types to constructors
//!
//! Entry types are resolved through this table at load time instead of
//! loading code dynamically; builtins are always present and embedders or
//! tests may register their own constructors.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::application::errors::LoadError;
use crate::domain::traits::BotModule;
use crate::modules::{EchoModule, GreeterModule};

pub type Constructor = Box<dyn Fn() -> Box<dyn BotModule> + Send + Sync>;

fn make_echo() -> Box<dyn BotModule> {
    Box::new(EchoModule::new())
}

fn make_greeter() -> Box<dyn BotModule> {
    Box::new(GreeterModule::new())
}

static BUILTINS: Lazy<Vec<(&'static str, fn() -> Box<dyn BotModule>)>> =
    Lazy::new(|| vec![("builtin.echo", make_echo), ("builtin.greeter", make_greeter)]);

/// Registry of module constructors keyed by entry type.
pub struct ModuleFactory {
    constructors: HashMap<String, Constructor>,
}

impl ModuleFactory {
    /// Empty factory, mainly for tests that register their own modules.
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Factory pre-populated with the builtin modules.
    pub fn with_builtins() -> Self {
        let mut factory = Self::new();
        for (entry_type, ctor) in BUILTINS.iter() {
            factory.register(*entry_type, *ctor);
        }
        factory
    }

    /// Register a constructor; a repeated entry type replaces the earlier one.
    pub fn register(
        &mut self,
        entry_type: impl Into<String>,
        ctor: impl Fn() -> Box<dyn BotModule> + Send + Sync + 'static,
    ) {
        self.constructors.insert(entry_type.into(), Box::new(ctor));
    }

    pub fn has(&self, entry_type: &str) -> bool {
        self.constructors.contains_key(entry_type)
    }

    /// Construct a fresh instance for an entry type.
    pub fn construct(&self, entry_type: &str) -> Result<Box<dyn BotModule>, LoadError> {
        self.constructors
            .get(entry_type)
            .map(|ctor| ctor())
            .ok_or_else(|| LoadError::UnknownEntryType(entry_type.to_string()))
    }
}

impl Default for ModuleFactory {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_entry_type_is_a_load_error() {
        let factory = ModuleFactory::with_builtins();
        assert!(factory.has("builtin.echo"));
        assert!(matches!(
            factory.construct("no.such.module"),
            Err(LoadError::UnknownEntryType(_))
        ));
    }
}
