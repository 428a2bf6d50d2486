//! Event registry - process-wide table of handler bindings

use regex_lite::Regex;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::application::errors::LoadError;
use crate::domain::entities::{EventKey, ParseType, PermissionRequirement};
use crate::domain::traits::{CallbackHandle, ModuleId, Registration};

/// One registered handler, owned by the module that registered it.
#[derive(Debug, Clone)]
pub struct HandlerBinding {
    pub key: EventKey,
    pub parse_types: Vec<ParseType>,
    pub permission: Option<PermissionRequirement>,
    pub module_id: ModuleId,
    pub handle: CallbackHandle,
}

impl HandlerBinding {
    pub fn from_registration(module_id: ModuleId, reg: Registration) -> Self {
        Self {
            key: reg.key,
            parse_types: reg.parse_types,
            permission: reg.permission,
            module_id,
            handle: reg.handle,
        }
    }

    fn accepts(&self, parse_type: ParseType) -> bool {
        self.parse_types.contains(&parse_type)
    }

    /// Wildcard bindings also match when registered for any message kind.
    fn accepts_wildcard(&self, parse_type: ParseType) -> bool {
        self.accepts(parse_type) || self.accepts(ParseType::Wildcard)
    }

    fn duplicates(&self, other: &Self) -> bool {
        if self.module_id != other.module_id || self.key != other.key {
            return false;
        }
        let mut a = self.parse_types.clone();
        let mut b = other.parse_types.clone();
        a.sort();
        b.sort();
        a == b
    }
}

struct WildcardBinding {
    binding: HandlerBinding,
    regex: Regex,
}

#[derive(Default)]
struct RegistryInner {
    /// Exact command keys, lowercased; vec order is registration order.
    exact: HashMap<String, Vec<HandlerBinding>>,
    /// Named lifecycle events, lowercased.
    named: HashMap<String, Vec<HandlerBinding>>,
    /// Wildcard bindings, matched by pattern independently of exact keys.
    wildcards: Vec<WildcardBinding>,
}

/// Process-wide table mapping event keys to ordered handler bindings.
///
/// Mutation happens only through `register` / `unregister_all`; the
/// dispatcher reads a consistent snapshot on every event, so an unload that
/// returns guarantees no later dispatch resolves the removed bindings.
pub struct EventRegistry {
    inner: RwLock<RegistryInner>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
        }
    }

    /// Insert a binding. A duplicate (key, parse types) pair from the same
    /// module overwrites the earlier binding in place, keeping its position,
    /// so the same event is never dispatched to one module twice.
    pub fn register(&self, binding: HandlerBinding) -> Result<(), LoadError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| LoadError::Registration("registry lock poisoned".to_string()))?;

        match binding.key.clone() {
            EventKey::Exact(key) => {
                Self::insert_keyed(inner.exact.entry(key.to_lowercase()).or_default(), binding);
            }
            EventKey::Named(name) => {
                Self::insert_keyed(inner.named.entry(name.to_lowercase()).or_default(), binding);
            }
            EventKey::Wildcard(pattern) => {
                let regex = wildcard_regex(&pattern).map_err(|e| {
                    LoadError::Registration(format!("Bad wildcard pattern '{}': {}", pattern, e))
                })?;
                if let Some(slot) = inner
                    .wildcards
                    .iter_mut()
                    .find(|w| w.binding.duplicates(&binding))
                {
                    tracing::warn!(
                        "Module {} re-registered wildcard '{}', overwriting",
                        binding.module_id,
                        pattern
                    );
                    *slot = WildcardBinding { binding, regex };
                } else {
                    inner.wildcards.push(WildcardBinding { binding, regex });
                }
            }
        }
        Ok(())
    }

    fn insert_keyed(bindings: &mut Vec<HandlerBinding>, binding: HandlerBinding) {
        if let Some(slot) = bindings.iter_mut().find(|b| b.duplicates(&binding)) {
            tracing::warn!(
                "Module {} re-registered '{}', overwriting",
                binding.module_id,
                binding.key
            );
            *slot = binding;
        } else {
            bindings.push(binding);
        }
    }

    /// Remove every binding owned by a module. Atomic with respect to
    /// concurrent dispatch; required for clean unload.
    pub fn unregister_all(&self, module_id: ModuleId) {
        let Ok(mut inner) = self.inner.write() else {
            return;
        };
        for bindings in inner.exact.values_mut() {
            bindings.retain(|b| b.module_id != module_id);
        }
        inner.exact.retain(|_, v| !v.is_empty());
        for bindings in inner.named.values_mut() {
            bindings.retain(|b| b.module_id != module_id);
        }
        inner.named.retain(|_, v| !v.is_empty());
        inner.wildcards.retain(|w| w.binding.module_id != module_id);
    }

    /// Exact-key bindings for a command, in registration order, filtered to
    /// those accepting the event's parse type.
    pub fn resolve_exact(&self, key: &str, parse_type: ParseType) -> Vec<HandlerBinding> {
        let Ok(inner) = self.inner.read() else {
            return Vec::new();
        };
        inner
            .exact
            .get(&key.to_lowercase())
            .map(|bindings| {
                bindings
                    .iter()
                    .filter(|b| b.accepts(parse_type))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Wildcard bindings whose pattern matches somewhere in the text, in
    /// registration order, each paired with the extracted match.
    pub fn resolve_wildcards(
        &self,
        text: &str,
        parse_type: ParseType,
    ) -> Vec<(HandlerBinding, String)> {
        let Ok(inner) = self.inner.read() else {
            return Vec::new();
        };
        inner
            .wildcards
            .iter()
            .filter(|w| w.binding.accepts_wildcard(parse_type))
            .filter_map(|w| {
                w.regex
                    .find(text)
                    .map(|m| (w.binding.clone(), m.as_str().to_string()))
            })
            .collect()
    }

    /// Bindings for a named lifecycle event, in registration order.
    pub fn resolve_named(&self, name: &str) -> Vec<HandlerBinding> {
        let Ok(inner) = self.inner.read() else {
            return Vec::new();
        };
        inner
            .named
            .get(&name.to_lowercase())
            .cloned()
            .unwrap_or_default()
    }

    /// Total number of live bindings.
    pub fn binding_count(&self) -> usize {
        let Ok(inner) = self.inner.read() else {
            return 0;
        };
        inner.exact.values().map(Vec::len).sum::<usize>()
            + inner.named.values().map(Vec::len).sum::<usize>()
            + inner.wildcards.len()
    }
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Compile a wildcard shape into a regex, `*` matching any non-space run.
fn wildcard_regex(pattern: &str) -> Result<Regex, regex_lite::Error> {
    let mut source = String::with_capacity(pattern.len() + 8);
    for c in pattern.chars() {
        match c {
            '*' => source.push_str(r"\S+"),
            '.' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '^' | '$' | '\\' => {
                source.push('\\');
                source.push(c);
            }
            _ => source.push(c),
        }
    }
    Regex::new(&source)
}
