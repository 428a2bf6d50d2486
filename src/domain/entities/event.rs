use super::{Sender, ServerId};
use serde::{Deserialize, Serialize};

/// Classification of inbound events a handler can opt into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParseType {
    ChannelMessage,
    PrivateMessage,
    /// Matched by pattern over the whole text, independent of the prefix.
    Wildcard,
    /// Protocol lifecycle events such as `connect` or `ping`.
    NamedEvent,
}

/// Key a handler registers under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKey {
    /// Fixed command word looked up after prefix stripping.
    Exact(String),
    /// Non-exact shape, `*` matching any non-space run (e.g. `http://*`).
    Wildcard(String),
    /// Named lifecycle event.
    Named(String),
}

impl std::fmt::Display for EventKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKey::Exact(key) => write!(f, "{}", key),
            EventKey::Wildcard(pattern) => write!(f, "~{}", pattern),
            EventKey::Named(name) => write!(f, "@{}", name),
        }
    }
}

/// Body of a protocol event, discriminated by kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventBody {
    Channel { channel: String, text: String },
    Private { text: String },
    Named { name: String },
}

impl EventBody {
    /// Message text, if this event carries any.
    pub fn text(&self) -> Option<&str> {
        match self {
            EventBody::Channel { text, .. } | EventBody::Private { text } => Some(text),
            EventBody::Named { .. } => None,
        }
    }

    /// Parse type a message-shaped body corresponds to.
    pub fn parse_type(&self) -> ParseType {
        match self {
            EventBody::Channel { .. } => ParseType::ChannelMessage,
            EventBody::Private { .. } => ParseType::PrivateMessage,
            EventBody::Named { .. } => ParseType::NamedEvent,
        }
    }
}

/// One event handed in by the protocol layer.
#[derive(Debug, Clone)]
pub struct ProtocolEvent {
    pub server_id: ServerId,
    pub sender: Sender,
    pub body: EventBody,
}

impl ProtocolEvent {
    pub fn channel_message(
        server_id: ServerId,
        sender: Sender,
        channel: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            server_id,
            sender,
            body: EventBody::Channel {
                channel: channel.into(),
                text: text.into(),
            },
        }
    }

    pub fn private_message(server_id: ServerId, sender: Sender, text: impl Into<String>) -> Self {
        Self {
            server_id,
            sender,
            body: EventBody::Private { text: text.into() },
        }
    }

    pub fn named(server_id: ServerId, sender: Sender, name: impl Into<String>) -> Self {
        Self {
            server_id,
            sender,
            body: EventBody::Named { name: name.into() },
        }
    }

    /// Channel this event arrived on, if any.
    pub fn channel(&self) -> Option<&str> {
        match &self.body {
            EventBody::Channel { channel, .. } => Some(channel),
            _ => None,
        }
    }
}

/// One raw line produced by a handler, addressed for transmission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLine {
    pub server_id: ServerId,
    /// Channel name or nick the line is addressed to.
    pub target: String,
    pub text: String,
}

impl OutputLine {
    pub fn new(server_id: ServerId, target: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            server_id,
            target: target.into(),
            text: text.into(),
        }
    }
}
