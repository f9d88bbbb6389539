//! Channel Gateway: the message transport the pipeline talks to.
//!
//! The pipeline only sees `ChannelGateway`; `telegram::TelegramGateway` is the
//! teloxide-backed implementation used by the binary.
use crate::error::GatewayError;
use crate::model::{ChatRef, Content, Lang, MessageHandle};
use async_trait::async_trait;

pub mod telegram;

pub use telegram::TelegramGateway;

/// Post id used for toggle buttons sent before the post is stored.
pub const UNBOUND_POST_ID: i64 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Publish,
    Edit,
    Cancel,
}

/// Inline buttons attached to a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Controls {
    None,
    /// Publish / Edit / Cancel under a draft preview.
    Decision,
    /// Single button under a channel post switching it to `show`.
    Toggle { post_id: i64, show: Lang },
}

/// Decoded callback payload of an inline button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback {
    Draft(Decision),
    Toggle(i64),
}

impl Callback {
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            "draft_publish" => Some(Callback::Draft(Decision::Publish)),
            "draft_edit" => Some(Callback::Draft(Decision::Edit)),
            "draft_cancel" => Some(Callback::Draft(Decision::Cancel)),
            _ => data
                .strip_prefix("toggle_")
                .and_then(|id| id.parse::<i64>().ok())
                .map(Callback::Toggle),
        }
    }

    pub fn data(&self) -> String {
        match self {
            Callback::Draft(Decision::Publish) => "draft_publish".into(),
            Callback::Draft(Decision::Edit) => "draft_edit".into(),
            Callback::Draft(Decision::Cancel) => "draft_cancel".into(),
            Callback::Toggle(id) => format!("toggle_{}", id),
        }
    }
}

#[async_trait]
pub trait ChannelGateway: Send + Sync {
    async fn send(
        &self,
        chat: &ChatRef,
        content: &Content,
        controls: &Controls,
    ) -> Result<MessageHandle, GatewayError>;

    async fn edit_text(
        &self,
        handle: &MessageHandle,
        text: &str,
        controls: &Controls,
    ) -> Result<(), GatewayError>;

    async fn edit_media_caption(
        &self,
        handle: &MessageHandle,
        caption: &str,
        controls: &Controls,
    ) -> Result<(), GatewayError>;

    /// Replace the file and caption of a media message.
    async fn edit_media(
        &self,
        handle: &MessageHandle,
        content: &Content,
        controls: &Controls,
    ) -> Result<(), GatewayError>;

    async fn edit_controls(
        &self,
        handle: &MessageHandle,
        controls: &Controls,
    ) -> Result<(), GatewayError>;
}
