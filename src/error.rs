//! Error types shared across the draft pipeline, the channel gateway and the post store.
use crate::markup::escape_html;
use crate::model::{MediaKind, MessageHandle};
use thiserror::Error;

/// A single translator call failed. Never fatal: the affected leaf stays untranslated.
#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("translator request failed: {0}")]
    Request(String),
    #[error("unexpected translator response: {0}")]
    Response(String),
    #[error("translator returned empty text")]
    Empty,
}

impl From<reqwest::Error> for TranslationError {
    fn from(err: reqwest::Error) -> Self {
        TranslationError::Request(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway rejected the request: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("corrupt post record {id}: {reason}")]
    Corrupt { id: i64, reason: String },
}

/// Which content a length check was applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthScope {
    Source,
    Translated,
    ManualTarget,
}

impl LengthScope {
    fn label(&self) -> &'static str {
        match self {
            LengthScope::Source => "Source",
            LengthScope::Translated => "Translated",
            LengthScope::ManualTarget => "Replacement",
        }
    }
}

#[derive(Debug, Error)]
pub enum BotError {
    #[error("only text, photo and video messages are supported")]
    UnsupportedContentKind,
    #[error("text message is empty")]
    EmptyContent,
    #[error("{scope:?} {kind} content is {len} units long, limit is {limit}")]
    ContentTooLong {
        scope: LengthScope,
        kind: MediaKind,
        len: usize,
        limit: usize,
        snippet: String,
    },
    #[error("expected {expected} content, got {got}")]
    ContentKindMismatch { expected: MediaKind, got: MediaKind },
    #[error("no draft in progress")]
    NoActiveDraft,
    #[error("a draft is waiting for a publish/edit/cancel decision")]
    DecisionPending,
    #[error("a replacement target version is expected")]
    ManualTargetPending,
    #[error("post {0} not found")]
    PostNotFound(i64),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    /// The channel refused the post; the draft is gone, its text travels with the error.
    #[error("publishing failed: {source}")]
    PublishRejected {
        source: GatewayError,
        source_snippet: String,
        target_snippet: String,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("message {} in {} was published but could not be recorded: {source}", .message.message_id, .message.chat)]
    PublishedButUnpersisted {
        message: MessageHandle,
        #[source]
        source: StoreError,
    },
}

impl BotError {
    /// Published-but-unrecorded is the only outcome that cannot be fixed by retrying.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BotError::PublishedButUnpersisted { .. })
    }

    /// HTML reply shown to the operator.
    pub fn operator_message(&self) -> String {
        match self {
            BotError::UnsupportedContentKind => {
                "Only text, photo or video posts are supported.".to_string()
            }
            BotError::EmptyContent => "⚠️ The message is empty.".to_string(),
            BotError::ContentTooLong {
                scope,
                kind,
                len,
                limit,
                snippet,
            } => {
                let what = if *kind == MediaKind::Text {
                    "text"
                } else {
                    "caption"
                };
                format!(
                    "⚠️ {} {} with markup is {} characters long, the limit is {}.\n<b>Draft:</b>\n<code>{}</code>",
                    scope.label(),
                    what,
                    len,
                    limit,
                    escape_html(snippet)
                )
            }
            BotError::ContentKindMismatch { expected, got } => format!(
                "The media type does not match the original: expected {}, got {}.",
                expected, got
            ),
            BotError::NoActiveDraft => "There is no draft to act on. Send a new post.".to_string(),
            BotError::DecisionPending => {
                "Finish the current draft first: publish, edit or cancel it.".to_string()
            }
            BotError::ManualTargetPending => {
                "Send the replacement version of the draft first.".to_string()
            }
            BotError::PostNotFound(_) => "Post not found".to_string(),
            BotError::Gateway(err) => format!("Telegram error: {}", escape_html(&err.to_string())),
            BotError::PublishRejected {
                source,
                source_snippet,
                target_snippet,
            } => format!(
                "⚠️ The channel rejected the post: {}\nThe draft was discarded. Its text, to resubmit:\n\
                 <b>Source:</b>\n<code>{}</code>\n<b>Translation:</b>\n<code>{}</code>",
                escape_html(&source.to_string()),
                escape_html(source_snippet),
                escape_html(target_snippet)
            ),
            BotError::Store(err) => format!("Storage error: {}", escape_html(&err.to_string())),
            BotError::PublishedButUnpersisted { message, .. } => format!(
                "🚨 The post was sent to the channel (message {}) but could not be saved. \
                 Its language toggle will not work; remove it from the channel manually.",
                message.message_id
            ),
        }
    }

    /// Plain text for a callback alert (Telegram caps these at 200 characters).
    pub fn alert_text(&self) -> String {
        let text = match self {
            BotError::Gateway(err) | BotError::PublishRejected { source: err, .. } => {
                format!("Error: {}", err)
            }
            other => other.to_string(),
        };
        text.chars().take(200).collect()
    }
}
