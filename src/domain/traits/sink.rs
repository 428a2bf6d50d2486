use async_trait::async_trait;
use crate::application::errors::HostError;
use crate::domain::entities::OutputLine;

/// Protocol egress - abstraction over the wire-protocol client that
/// transmits the lines dispatch produced.
#[async_trait]
pub trait ProtocolSink: Send + Sync {
    /// Transmit the lines of one dispatch, in order. An empty batch is
    /// never delivered.
    async fn deliver(&self, lines: Vec<OutputLine>) -> Result<(), HostError>;
}
