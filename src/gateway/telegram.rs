use crate::config::Labels;
use crate::error::{BotError, GatewayError};
use crate::gateway::{Callback, ChannelGateway, Controls, Decision};
use crate::markup::{escape_html, render_entities, Entity, EntityTag};
use crate::model::{ChatRef, Content, Lang, MediaKind, MessageHandle};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{
    ChatId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, InputMedia, InputMediaPhoto,
    InputMediaVideo, MessageEntity, MessageEntityKind, MessageId, ParseMode, Recipient,
};
use teloxide::RequestError;
use tracing::instrument;

impl From<RequestError> for GatewayError {
    fn from(err: RequestError) -> Self {
        GatewayError::Rejected(err.to_string())
    }
}

/// `ChannelGateway` over the Telegram Bot API. All text is sent in HTML parse mode.
#[derive(Clone)]
pub struct TelegramGateway {
    bot: Bot,
    labels: Labels,
}

impl TelegramGateway {
    pub fn new(bot: Bot, labels: Labels) -> Self {
        Self { bot, labels }
    }

    fn keyboard(&self, controls: &Controls) -> Option<InlineKeyboardMarkup> {
        let button = |text: &str, cb: Callback| InlineKeyboardButton::callback(text, cb.data());
        match controls {
            Controls::None => None,
            Controls::Decision => Some(InlineKeyboardMarkup::new(vec![
                vec![
                    button("✅ Publish", Callback::Draft(Decision::Publish)),
                    button("✏️ Edit", Callback::Draft(Decision::Edit)),
                ],
                vec![button("❌ Cancel", Callback::Draft(Decision::Cancel))],
            ])),
            Controls::Toggle { post_id, show } => {
                let label = match show {
                    Lang::Source => &self.labels.show_source,
                    Lang::Target => &self.labels.show_target,
                };
                Some(InlineKeyboardMarkup::new(vec![vec![button(
                    label,
                    Callback::Toggle(*post_id),
                )]]))
            }
        }
    }

    /// Edits replace the whole keyboard; an empty one removes it.
    fn edit_keyboard(&self, controls: &Controls) -> InlineKeyboardMarkup {
        self.keyboard(controls).unwrap_or_default()
    }
}

fn recipient(chat: &ChatRef) -> Recipient {
    match chat {
        ChatRef::Id(id) => Recipient::Id(ChatId(*id)),
        ChatRef::Username(name) => Recipient::ChannelUsername(name.clone()),
    }
}

fn input_media(content: &Content) -> Option<InputMedia> {
    match content {
        Content::Text(_) => None,
        Content::Photo { file_id, caption } => Some(InputMedia::Photo(
            InputMediaPhoto::new(InputFile::file_id(file_id.clone()))
                .caption(caption.clone())
                .parse_mode(ParseMode::Html),
        )),
        Content::Video { file_id, caption } => Some(InputMedia::Video(
            InputMediaVideo::new(InputFile::file_id(file_id.clone()))
                .caption(caption.clone())
                .parse_mode(ParseMode::Html),
        )),
    }
}

#[async_trait]
impl ChannelGateway for TelegramGateway {
    #[instrument(skip_all, fields(chat = %chat))]
    async fn send(
        &self,
        chat: &ChatRef,
        content: &Content,
        controls: &Controls,
    ) -> Result<MessageHandle, GatewayError> {
        let to = recipient(chat);
        let keyboard = self.keyboard(controls);
        let sent = match content {
            Content::Text(text) => {
                let mut req = self
                    .bot
                    .send_message(to, text.clone())
                    .parse_mode(ParseMode::Html);
                if let Some(kb) = keyboard {
                    req = req.reply_markup(kb);
                }
                req.await?
            }
            Content::Photo { file_id, caption } => {
                let mut req = self
                    .bot
                    .send_photo(to, InputFile::file_id(file_id.clone()))
                    .parse_mode(ParseMode::Html);
                if !caption.is_empty() {
                    req = req.caption(caption.clone());
                }
                if let Some(kb) = keyboard {
                    req = req.reply_markup(kb);
                }
                req.await?
            }
            Content::Video { file_id, caption } => {
                let mut req = self
                    .bot
                    .send_video(to, InputFile::file_id(file_id.clone()))
                    .parse_mode(ParseMode::Html);
                if !caption.is_empty() {
                    req = req.caption(caption.clone());
                }
                if let Some(kb) = keyboard {
                    req = req.reply_markup(kb);
                }
                req.await?
            }
        };
        Ok(MessageHandle {
            chat: chat.clone(),
            message_id: sent.id.0,
        })
    }

    async fn edit_text(
        &self,
        handle: &MessageHandle,
        text: &str,
        controls: &Controls,
    ) -> Result<(), GatewayError> {
        self.bot
            .edit_message_text(recipient(&handle.chat), MessageId(handle.message_id), text)
            .parse_mode(ParseMode::Html)
            .reply_markup(self.edit_keyboard(controls))
            .await?;
        Ok(())
    }

    async fn edit_media_caption(
        &self,
        handle: &MessageHandle,
        caption: &str,
        controls: &Controls,
    ) -> Result<(), GatewayError> {
        self.bot
            .edit_message_caption(recipient(&handle.chat), MessageId(handle.message_id))
            .caption(caption)
            .parse_mode(ParseMode::Html)
            .reply_markup(self.edit_keyboard(controls))
            .await?;
        Ok(())
    }

    async fn edit_media(
        &self,
        handle: &MessageHandle,
        content: &Content,
        controls: &Controls,
    ) -> Result<(), GatewayError> {
        let Some(media) = input_media(content) else {
            return self.edit_text(handle, content.markup(), controls).await;
        };
        self.bot
            .edit_message_media(recipient(&handle.chat), MessageId(handle.message_id), media)
            .reply_markup(self.edit_keyboard(controls))
            .await?;
        Ok(())
    }

    async fn edit_controls(
        &self,
        handle: &MessageHandle,
        controls: &Controls,
    ) -> Result<(), GatewayError> {
        self.bot
            .edit_message_reply_markup(recipient(&handle.chat), MessageId(handle.message_id))
            .reply_markup(self.edit_keyboard(controls))
            .await?;
        Ok(())
    }
}

fn entity_tag(kind: &MessageEntityKind) -> Option<EntityTag> {
    match kind {
        MessageEntityKind::Bold => Some(EntityTag::Bold),
        MessageEntityKind::Italic => Some(EntityTag::Italic),
        MessageEntityKind::Underline => Some(EntityTag::Underline),
        MessageEntityKind::Strikethrough => Some(EntityTag::Strikethrough),
        MessageEntityKind::Spoiler => Some(EntityTag::Spoiler),
        MessageEntityKind::Code => Some(EntityTag::Code),
        MessageEntityKind::Pre { language } => Some(EntityTag::Pre(language.clone())),
        MessageEntityKind::TextLink { url } => Some(EntityTag::Link(url.to_string())),
        MessageEntityKind::CustomEmoji { custom_emoji_id } => {
            Some(EntityTag::CustomEmoji(custom_emoji_id.clone()))
        }
        _ => None,
    }
}

/// Telegram text plus its entities as HTML.
fn as_html(text: &str, entities: Option<&[MessageEntity]>) -> String {
    let entities: Vec<Entity> = entities
        .unwrap_or_default()
        .iter()
        .filter_map(|e| {
            entity_tag(&e.kind).map(|tag| Entity {
                offset: e.offset,
                length: e.length,
                tag,
            })
        })
        .collect();
    if entities.is_empty() {
        return escape_html(text);
    }
    render_entities(text, &entities)
}

/// Convert an inbound message into typed content with its formatting as HTML.
pub fn content_from_message(msg: &Message) -> Result<Content, BotError> {
    if let Some(text) = msg.text() {
        return Ok(Content::Text(as_html(text, msg.entities())));
    }
    let caption = msg
        .caption()
        .map(|c| as_html(c, msg.caption_entities()))
        .unwrap_or_default();
    if let Some(size) = msg.photo().and_then(|sizes| sizes.last()) {
        return Content::media(MediaKind::Photo, size.file.id.clone(), caption)
            .ok_or(BotError::UnsupportedContentKind);
    }
    if let Some(video) = msg.video() {
        return Content::media(MediaKind::Video, video.file.id.clone(), caption)
            .ok_or(BotError::UnsupportedContentKind);
    }
    Err(BotError::UnsupportedContentKind)
}
