use crate::db::PostStore;
use crate::error::BotError;
use crate::gateway::{ChannelGateway, Controls};
use crate::model::{Content, Lang};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

/// Switches the displayed language of published posts.
///
/// Toggles of one post run one at a time: read, remote edit and store update
/// happen under a per-post lock, and the store is only written after the
/// remote edit succeeded.
pub struct ToggleService {
    gateway: Arc<dyn ChannelGateway>,
    store: Arc<dyn PostStore>,
    locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl ToggleService {
    pub fn new(gateway: Arc<dyn ChannelGateway>, store: Arc<dyn PostStore>) -> Self {
        Self {
            gateway,
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the language now on display.
    #[instrument(skip(self))]
    pub async fn toggle(&self, post_id: i64) -> Result<Lang, BotError> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(post_id).or_default().clone()
        };
        let result = {
            let _guard = lock.lock().await;
            self.toggle_locked(post_id).await
        };
        self.release(post_id, lock).await;
        result
    }

    async fn toggle_locked(&self, post_id: i64) -> Result<Lang, BotError> {
        let post = self
            .store
            .get(post_id)
            .await?
            .ok_or(BotError::PostNotFound(post_id))?;

        let shown = post.current_lang;
        let next = shown.opposite();
        let controls = Controls::Toggle {
            post_id,
            show: next.opposite(),
        };
        let handle = &post.channel_message;

        let wanted = post.content(next);
        match wanted {
            Content::Text(text) => self.gateway.edit_text(handle, text, &controls).await?,
            Content::Photo { caption, .. } | Content::Video { caption, .. } => {
                // Same asset in both languages: only the caption changes.
                if post.content(shown).file_id() == wanted.file_id() {
                    self.gateway
                        .edit_media_caption(handle, caption, &controls)
                        .await?
                } else {
                    self.gateway.edit_media(handle, wanted, &controls).await?
                }
            }
        }

        match self.store.set_current_lang(post_id, shown, next).await {
            Ok(true) => {}
            Ok(false) => {
                // Report what the store holds, not what was attempted.
                let stored = self
                    .store
                    .get(post_id)
                    .await?
                    .ok_or(BotError::PostNotFound(post_id))?;
                warn!(post_id, lang = stored.current_lang.as_str(), "current_lang changed underneath toggle");
                return Ok(stored.current_lang);
            }
            Err(err) => {
                error!(?err, post_id, lang = next.as_str(), "channel shows a language the store did not record");
                return Err(err.into());
            }
        }
        info!(post_id, lang = next.as_str(), "toggled post language");
        Ok(next)
    }

    /// Drop the post's lock entry once nobody else holds or waits on it.
    async fn release(&self, post_id: i64, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        // One reference in the map, one here.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(&post_id);
        }
    }
}
