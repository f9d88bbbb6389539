//! Row model of the `posts` table.
//!
//! Language variants are stored flat (text / file / caption columns per
//! language) and rebuilt into `Content` here, so callers never see a half-valid row.

use crate::error::StoreError;
use crate::model::{ChatRef, Content, Lang, MediaKind, MessageHandle, Post};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostRow {
    pub id: i64,
    pub channel_chat: String,
    pub channel_msg_id: i64,
    pub media_type: String,
    pub source_text: Option<String>,
    pub target_text: Option<String>,
    pub source_file_id: Option<String>,
    pub target_file_id: Option<String>,
    pub source_caption: Option<String>,
    pub target_caption: Option<String>,
    pub current_lang: String,
    pub created_at: DateTime<Utc>,
}

/// Column values of one language variant: (text, file_id, caption).
pub fn content_columns(content: &Content) -> (Option<&str>, Option<&str>, Option<&str>) {
    match content {
        Content::Text(text) => (Some(text), None, None),
        Content::Photo { file_id, caption } | Content::Video { file_id, caption } => {
            (None, Some(file_id), Some(caption))
        }
    }
}

impl PostRow {
    pub fn into_post(self) -> Result<Post, StoreError> {
        let id = self.id;
        let corrupt = |reason: &str| StoreError::Corrupt {
            id,
            reason: reason.to_string(),
        };

        let kind = MediaKind::parse_kind(&self.media_type)
            .ok_or_else(|| corrupt("unknown media_type"))?;
        let current_lang =
            Lang::parse_lang(&self.current_lang).ok_or_else(|| corrupt("unknown current_lang"))?;
        let chat = ChatRef::parse(&self.channel_chat).ok_or_else(|| corrupt("bad channel_chat"))?;
        let message_id =
            i32::try_from(self.channel_msg_id).map_err(|_| corrupt("channel_msg_id out of range"))?;

        let (source, target) = match kind {
            MediaKind::Text => {
                let source = self.source_text.ok_or_else(|| corrupt("missing source_text"))?;
                let target = self.target_text.ok_or_else(|| corrupt("missing target_text"))?;
                (Content::Text(source), Content::Text(target))
            }
            MediaKind::Photo | MediaKind::Video => {
                let source_file = self
                    .source_file_id
                    .ok_or_else(|| corrupt("missing source_file_id"))?;
                // Older rows carry no distinct target asset.
                let target_file = self.target_file_id.unwrap_or_else(|| source_file.clone());
                let source = Content::media(kind, source_file, self.source_caption.unwrap_or_default())
                    .ok_or_else(|| corrupt("empty source_file_id"))?;
                let target = Content::media(kind, target_file, self.target_caption.unwrap_or_default())
                    .ok_or_else(|| corrupt("empty target_file_id"))?;
                (source, target)
            }
        };

        Ok(Post {
            id,
            channel_message: MessageHandle { chat, message_id },
            source,
            target,
            current_lang,
            created_at: self.created_at,
        })
    }
}
