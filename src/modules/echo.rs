//! Echo module - repeats a command's arguments back to the caller

use crate::application::errors::ModuleError;
use crate::domain::entities::{OutputLine, ParseType};
use crate::domain::traits::{BotModule, CallbackHandle, HandlerCall, HostCapabilities, Registrar};

pub struct EchoModule {
    echo: Option<CallbackHandle>,
}

impl EchoModule {
    pub fn new() -> Self {
        Self { echo: None }
    }
}

impl Default for EchoModule {
    fn default() -> Self {
        Self::new()
    }
}

impl BotModule for EchoModule {
    fn name(&self) -> &str {
        "echo"
    }

    fn init(&mut self, reg: &mut Registrar, _caps: &HostCapabilities) -> Result<(), ModuleError> {
        self.echo = Some(reg.command(
            "echo",
            &[ParseType::ChannelMessage, ParseType::PrivateMessage],
            None,
        ));
        Ok(())
    }

    fn handle(&self, call: &HandlerCall) -> Result<Vec<OutputLine>, ModuleError> {
        if self.echo != Some(call.handle) {
            return Err(ModuleError::InvalidArgs(format!(
                "unknown handle {:?}",
                call.handle
            )));
        }
        if call.args.is_empty() {
            // Nothing to repeat; no output is a valid outcome.
            return Ok(Vec::new());
        }
        Ok(vec![OutputLine::new(
            call.server_id,
            call.reply_target(),
            call.args.clone(),
        )])
    }
}
