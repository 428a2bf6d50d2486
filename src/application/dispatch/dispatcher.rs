//! Dispatcher - resolves protocol events against the registry and invokes
//! matching handlers across the isolation boundary

use std::sync::Arc;

use super::parser::EventParser;
use super::registry::{EventRegistry, HandlerBinding};
use crate::domain::entities::{EventBody, OutputLine, ProtocolEvent};
use crate::domain::traits::{HandlerCall, ModuleInvoker};

/// Routes one inbound event to every matching handler.
///
/// Handlers for a single event run sequentially, in registration order, so
/// the concatenated output is deterministic. A faulting or timed-out
/// handler is logged and skipped; it never cancels the remaining bindings.
pub struct Dispatcher {
    registry: Arc<EventRegistry>,
    modules: Arc<dyn ModuleInvoker>,
    parser: EventParser,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<EventRegistry>,
        modules: Arc<dyn ModuleInvoker>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            modules,
            parser: EventParser::new(prefix),
        }
    }

    /// Dispatch one event and return the lines to transmit, in the order
    /// their producing bindings ran. Zero matches is a no-op.
    pub async fn dispatch(&self, event: &ProtocolEvent) -> Vec<OutputLine> {
        let mut output = Vec::new();
        for (binding, args, raw) in self.plan(event) {
            if let Some(requirement) = binding.permission {
                if !requirement.met_by(&event.sender) {
                    // Gated commands must stay indistinguishable from
                    // unknown ones: skip with no reply.
                    tracing::debug!(
                        "Permission unmet for '{}' by {}, skipping",
                        binding.key,
                        event.sender
                    );
                    continue;
                }
            }

            let call = HandlerCall {
                handle: binding.handle,
                server_id: event.server_id,
                channel: event.channel().map(str::to_string),
                sender_nick: event.sender.nick.clone(),
                args,
                raw,
            };

            match self.modules.invoke(binding.module_id, call).await {
                Ok(lines) => output.extend(lines),
                Err(e) => {
                    tracing::warn!(
                        "Handler for '{}' in module {} failed: {}",
                        binding.key,
                        binding.module_id,
                        e
                    );
                }
            }
        }
        output
    }

    /// Resolve the bindings this event reaches: exact-key matches in
    /// registration order, then wildcard matches in registration order.
    fn plan(&self, event: &ProtocolEvent) -> Vec<(HandlerBinding, String, String)> {
        let mut plan = Vec::new();
        match &event.body {
            EventBody::Channel { text, .. } | EventBody::Private { text } => {
                let parse_type = event.body.parse_type();
                if let Some((key, rest)) = self.parser.command_of(text) {
                    for binding in self.registry.resolve_exact(&key, parse_type) {
                        plan.push((binding, rest.to_string(), text.clone()));
                    }
                }
                for (binding, extracted) in self.registry.resolve_wildcards(text, parse_type) {
                    plan.push((binding, extracted, text.clone()));
                }
            }
            EventBody::Named { name } => {
                for binding in self.registry.resolve_named(name) {
                    plan.push((binding, String::new(), name.clone()));
                }
            }
        }
        plan
    }
}
