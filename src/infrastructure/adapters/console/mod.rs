//! Console adapter for development/testing

use async_trait::async_trait;

use crate::application::errors::HostError;
use crate::domain::entities::OutputLine;
use crate::domain::traits::ProtocolSink;

/// Protocol sink that prints outbound lines instead of transmitting them.
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProtocolSink for ConsoleSink {
    async fn deliver(&self, lines: Vec<OutputLine>) -> Result<(), HostError> {
        for line in lines {
            println!("[server {}] -> {}: {}", line.server_id, line.target, line.text);
        }
        Ok(())
    }
}
