//! Per-kind length limits on the serialized (markup included) form of content.
use crate::error::{BotError, LengthScope};
use crate::model::{Content, MediaKind};

/// Telegram ceiling for message text, tags included.
pub const MAX_TEXT_LEN: usize = 4096;
/// Telegram ceiling for media captions, tags included.
pub const MAX_CAPTION_LEN: usize = 1024;
pub const DEFAULT_SNIPPET_LEN: usize = 1500;

pub fn limit_for(kind: MediaKind) -> usize {
    match kind {
        MediaKind::Text => MAX_TEXT_LEN,
        MediaKind::Photo | MediaKind::Video => MAX_CAPTION_LEN,
    }
}

/// Length of the exact string that will be transmitted, in Unicode scalar values.
pub fn serialized_len(markup: &str) -> usize {
    markup.chars().count()
}

/// First `max` characters of `s`.
pub fn snippet(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[derive(Debug, Clone, Copy)]
pub struct ContentValidator {
    snippet_len: usize,
}

impl Default for ContentValidator {
    fn default() -> Self {
        Self::new(DEFAULT_SNIPPET_LEN)
    }
}

impl ContentValidator {
    pub fn new(snippet_len: usize) -> Self {
        Self { snippet_len }
    }

    pub fn snippet_len(&self) -> usize {
        self.snippet_len
    }

    /// Validate freshly submitted source-language content.
    pub fn validate(&self, content: Content) -> Result<Content, BotError> {
        self.validate_as(content, LengthScope::Source)
    }

    /// Returns the content unchanged when it fits its kind's limit.
    pub fn validate_as(&self, content: Content, scope: LengthScope) -> Result<Content, BotError> {
        if let Content::Text(text) = &content {
            if text.trim().is_empty() {
                return Err(BotError::EmptyContent);
            }
        }
        let kind = content.kind();
        let markup = content.markup();
        let len = serialized_len(markup);
        let limit = limit_for(kind);
        if len > limit {
            return Err(BotError::ContentTooLong {
                scope,
                kind,
                len,
                limit,
                snippet: snippet(markup, self.snippet_len),
            });
        }
        Ok(content)
    }
}
