//! Event parser - derives the command lookup key from message text

/// Splits message text into a command key and remainder using the
/// configured command prefix.
pub struct EventParser {
    prefix: String,
}

impl EventParser {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Returns the lowercased leading token after the prefix and the
    /// remainder of the line, or `None` if the text is not prefixed.
    pub fn command_of<'a>(&self, text: &'a str) -> Option<(String, &'a str)> {
        let stripped = text.strip_prefix(&self.prefix)?;
        let mut parts = stripped.splitn(2, char::is_whitespace);
        let key = parts.next().filter(|k| !k.is_empty())?;
        let rest = parts.next().unwrap_or("").trim();
        Some((key.to_lowercase(), rest))
    }
}
