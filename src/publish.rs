use crate::db::PostStore;
use crate::error::BotError;
use crate::gateway::{ChannelGateway, Controls, UNBOUND_POST_ID};
use crate::model::{ChatRef, Draft, Lang, NewPost, Post};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

#[derive(Debug, Clone)]
pub struct PublishReport {
    pub post: Post,
    /// `false` when the toggle button still points at the placeholder id.
    pub controls_bound: bool,
}

/// Commits a finished draft: channel message first, then the stored record.
#[derive(Clone)]
pub struct PublishCoordinator {
    gateway: Arc<dyn ChannelGateway>,
    store: Arc<dyn PostStore>,
    channel: ChatRef,
}

impl PublishCoordinator {
    pub fn new(gateway: Arc<dyn ChannelGateway>, store: Arc<dyn PostStore>, channel: ChatRef) -> Self {
        Self {
            gateway,
            store,
            channel,
        }
    }

    pub fn channel(&self) -> &ChatRef {
        &self.channel
    }

    #[instrument(skip_all, fields(kind = %draft.media_kind()))]
    pub async fn publish(&self, draft: &Draft) -> Result<PublishReport, BotError> {
        let placeholder = Controls::Toggle {
            post_id: UNBOUND_POST_ID,
            show: Lang::Target,
        };
        let message = self
            .gateway
            .send(&self.channel, &draft.source, &placeholder)
            .await?;
        info!(chat = %message.chat, message_id = message.message_id, "sent post to channel");

        let new_post = NewPost {
            channel_message: message.clone(),
            source: draft.source.clone(),
            target: draft.target.clone(),
            created_at: Utc::now(),
        };
        let id = match self.store.insert(&new_post).await {
            Ok(id) => id,
            Err(err) => {
                error!(
                    target: "consistency",
                    chat = %message.chat,
                    message_id = message.message_id,
                    ?err,
                    "post published to channel but not recorded"
                );
                return Err(BotError::PublishedButUnpersisted {
                    message,
                    source: err,
                });
            }
        };

        let bound = Controls::Toggle {
            post_id: id,
            show: Lang::Target,
        };
        let controls_bound = match self.gateway.edit_controls(&message, &bound).await {
            Ok(()) => true,
            Err(err) => {
                warn!(?err, post_id = id, "failed to bind toggle button to post id");
                false
            }
        };

        info!(post_id = id, controls_bound, "post published");
        Ok(PublishReport {
            post: new_post.into_post(id),
            controls_bound,
        })
    }
}
