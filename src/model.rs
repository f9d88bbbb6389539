use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Telegram user id of a trusted operator.
pub type OperatorId = i64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Text,
    Photo,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Text => "text",
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
        }
    }

    pub fn parse_kind(s: &str) -> Option<Self> {
        match s {
            "text" => Some(MediaKind::Text),
            "photo" => Some(MediaKind::Photo),
            "video" => Some(MediaKind::Video),
            _ => None,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which language variant of a post is on display.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    Source,
    Target,
}

impl Lang {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lang::Source => "source",
            Lang::Target => "target",
        }
    }

    pub fn parse_lang(s: &str) -> Option<Self> {
        match s {
            "source" => Some(Lang::Source),
            "target" => Some(Lang::Target),
            _ => None,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Lang::Source => Lang::Target,
            Lang::Target => Lang::Source,
        }
    }
}

/// One language variant of a post. Media always carries a file reference;
/// the caption may be empty. All text is Telegram HTML.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Content {
    Text(String),
    Photo { file_id: String, caption: String },
    Video { file_id: String, caption: String },
}

impl Content {
    /// Build a media variant. Returns `None` for `MediaKind::Text` or an empty file reference.
    pub fn media(kind: MediaKind, file_id: String, caption: String) -> Option<Self> {
        if file_id.trim().is_empty() {
            return None;
        }
        match kind {
            MediaKind::Text => None,
            MediaKind::Photo => Some(Content::Photo { file_id, caption }),
            MediaKind::Video => Some(Content::Video { file_id, caption }),
        }
    }

    pub fn kind(&self) -> MediaKind {
        match self {
            Content::Text(_) => MediaKind::Text,
            Content::Photo { .. } => MediaKind::Photo,
            Content::Video { .. } => MediaKind::Video,
        }
    }

    /// The marked-up text that gets transmitted: message text or media caption.
    pub fn markup(&self) -> &str {
        match self {
            Content::Text(text) => text,
            Content::Photo { caption, .. } | Content::Video { caption, .. } => caption,
        }
    }

    pub fn file_id(&self) -> Option<&str> {
        match self {
            Content::Text(_) => None,
            Content::Photo { file_id, .. } | Content::Video { file_id, .. } => Some(file_id),
        }
    }

    /// Same shape and file reference, different marked-up text.
    pub fn with_markup(&self, markup: String) -> Self {
        match self {
            Content::Text(_) => Content::Text(markup),
            Content::Photo { file_id, .. } => Content::Photo {
                file_id: file_id.clone(),
                caption: markup,
            },
            Content::Video { file_id, .. } => Content::Video {
                file_id: file_id.clone(),
                caption: markup,
            },
        }
    }
}

/// Chat address as the gateway understands it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ChatRef {
    Id(i64),
    Username(String),
}

impl ChatRef {
    /// Accepts `@channel` or a numeric chat id such as `-1001234567890`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Some(name) = s.strip_prefix('@') {
            if name.is_empty() {
                return None;
            }
            return Some(ChatRef::Username(s.to_string()));
        }
        s.parse::<i64>().ok().map(ChatRef::Id)
    }
}

impl fmt::Display for ChatRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatRef::Id(id) => write!(f, "{}", id),
            ChatRef::Username(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MessageHandle {
    pub chat: ChatRef,
    pub message_id: i32,
}

/// Ephemeral bilingual candidate owned by one operator's session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub source: Content,
    pub target: Content,
    pub preview: MessageHandle,
}

impl Draft {
    pub fn media_kind(&self) -> MediaKind {
        self.source.kind()
    }
}

/// A post that has been sent to the channel but has no id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub channel_message: MessageHandle,
    pub source: Content,
    pub target: Content,
    pub created_at: DateTime<Utc>,
}

impl NewPost {
    pub fn into_post(self, id: i64) -> Post {
        Post {
            id,
            channel_message: self.channel_message,
            source: self.source,
            target: self.target,
            current_lang: Lang::Source,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub id: i64,
    pub channel_message: MessageHandle,
    pub source: Content,
    pub target: Content,
    pub current_lang: Lang,
    pub created_at: DateTime<Utc>,
}

impl Post {
    pub fn media_kind(&self) -> MediaKind {
        self.source.kind()
    }

    pub fn content(&self, lang: Lang) -> &Content {
        match lang {
            Lang::Source => &self.source,
            Lang::Target => &self.target,
        }
    }
}
