use crate::error::GatewayError;
use crate::gateway::{ChannelGateway, Controls};
use crate::model::{ChatRef, Content, MediaKind, MessageHandle};
use std::sync::Arc;

pub const CANCELLED_NOTICE: &str = "❌ Draft cancelled";
pub const PUBLISHED_NOTICE: &str = "✅ Post published!";
pub const EDIT_PROMPT: &str =
    "✏️ Send the corrected translation as a new message of the same type (text, photo or video).";

pub fn greeting(source_lang: &str, target_lang: &str) -> String {
    format!(
        "Send a post in <b>{}</b> (text, photo or video). It will be translated to <b>{}</b>, \
         shown as a preview, and published to the channel once you approve it.",
        source_lang, target_lang
    )
}

/// Renders draft previews in the operator's chat and updates them in place.
#[derive(Clone)]
pub struct PreviewPresenter {
    gateway: Arc<dyn ChannelGateway>,
}

impl PreviewPresenter {
    pub fn new(gateway: Arc<dyn ChannelGateway>) -> Self {
        Self { gateway }
    }

    /// The operator approves what readers will see on toggle, so the preview
    /// shows the target-language variant.
    pub async fn render(&self, chat: &ChatRef, target: &Content) -> Result<MessageHandle, GatewayError> {
        self.gateway.send(chat, target, &Controls::Decision).await
    }

    /// Replace the preview's text or caption with a status line and drop its buttons.
    pub async fn update(
        &self,
        preview: &MessageHandle,
        kind: MediaKind,
        text: &str,
    ) -> Result<(), GatewayError> {
        match kind {
            MediaKind::Text => self.gateway.edit_text(preview, text, &Controls::None).await,
            MediaKind::Photo | MediaKind::Video => {
                self.gateway
                    .edit_media_caption(preview, text, &Controls::None)
                    .await
            }
        }
    }

    /// Plain reply to the operator.
    pub async fn notify(&self, chat: &ChatRef, html: &str) -> Result<MessageHandle, GatewayError> {
        self.gateway
            .send(chat, &Content::Text(html.to_string()), &Controls::None)
            .await
    }
}
