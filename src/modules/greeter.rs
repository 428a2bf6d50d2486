//! Greeter module - announces the first connect of each server
//!
//! Exercises named lifecycle events, the variable broker, and per-server
//! state: the connect announcement runs once per connection and is re-armed
//! when the server disconnects.

use std::sync::Arc;

use crate::application::errors::ModuleError;
use crate::domain::entities::{OutputLine, ServerStateMap};
use crate::domain::traits::{BotModule, CallbackHandle, HandlerCall, HostCapabilities, HostVars, Registrar};

pub struct GreeterModule {
    connect: Option<CallbackHandle>,
    disconnect: Option<CallbackHandle>,
    vars: Option<Arc<dyn HostVars>>,
    announced: ServerStateMap<bool>,
}

impl GreeterModule {
    pub fn new() -> Self {
        Self {
            connect: None,
            disconnect: None,
            vars: None,
            announced: ServerStateMap::new(),
        }
    }
}

impl Default for GreeterModule {
    fn default() -> Self {
        Self::new()
    }
}

impl BotModule for GreeterModule {
    fn name(&self) -> &str {
        "greeter"
    }

    fn init(&mut self, reg: &mut Registrar, caps: &HostCapabilities) -> Result<(), ModuleError> {
        self.connect = Some(reg.named_event("connect"));
        self.disconnect = Some(reg.named_event("disconnect"));
        self.vars = Some(caps.vars.clone());
        Ok(())
    }

    fn handle(&self, call: &HandlerCall) -> Result<Vec<OutputLine>, ModuleError> {
        if self.disconnect == Some(call.handle) {
            self.announced.reset(call.server_id);
            return Ok(Vec::new());
        }
        if self.connect != Some(call.handle) {
            return Err(ModuleError::InvalidArgs(format!(
                "unknown handle {:?}",
                call.handle
            )));
        }

        let first = self
            .announced
            .update(call.server_id, |done| !std::mem::replace(done, true))
            .unwrap_or(false);
        if !first {
            return Ok(Vec::new());
        }

        let vars = self
            .vars
            .as_ref()
            .ok_or_else(|| ModuleError::Failed("not initialized".to_string()))?;
        // Without a home channel there is nowhere to announce; absence of
        // the variable is normal.
        let Some(channel) = vars.request("home-channel", call.server_id) else {
            return Ok(Vec::new());
        };
        let server_name = vars
            .request("server-name", call.server_id)
            .unwrap_or_else(|| call.server_id.to_string());

        Ok(vec![OutputLine::new(
            call.server_id,
            channel,
            format!("Connected to {}", server_name),
        )])
    }
}
