#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tg_dualpost::db::{PostStore, SqlitePostStore};
use tg_dualpost::error::{GatewayError, StoreError, TranslationError};
use tg_dualpost::gateway::{ChannelGateway, Controls};
use tg_dualpost::model::{ChatRef, Content, Lang, MessageHandle, NewPost, Post};
use tg_dualpost::service::{BotService, ServiceSettings};
use tg_dualpost::translator::Translator;
use tokio::sync::Mutex;

pub const OPERATOR: i64 = 7;

pub fn channel() -> ChatRef {
    ChatRef::Username("@dualpost_test".into())
}

pub fn operator_chat() -> ChatRef {
    ChatRef::Id(OPERATOR)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Send {
        chat: ChatRef,
        content: Content,
        controls: Controls,
    },
    EditText {
        handle: MessageHandle,
        text: String,
        controls: Controls,
    },
    EditCaption {
        handle: MessageHandle,
        caption: String,
        controls: Controls,
    },
    EditMedia {
        handle: MessageHandle,
        content: Content,
        controls: Controls,
    },
    EditControls {
        handle: MessageHandle,
        controls: Controls,
    },
}

/// Gateway fake: records every call and answers from a script.
/// Once the script runs dry every call succeeds.
#[derive(Clone, Default)]
pub struct RecordingGateway {
    script: Arc<Mutex<VecDeque<Result<(), String>>>>,
    calls: Arc<Mutex<Vec<Call>>>,
    next_message_id: Arc<AtomicI32>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(script: Vec<Result<(), String>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::from(script))),
            ..Default::default()
        }
    }

    pub async fn push_script(&self, result: Result<(), String>) {
        self.script.lock().await.push_back(result);
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.calls.lock().await.clone()
    }

    pub async fn last_call(&self) -> Option<Call> {
        self.calls.lock().await.last().cloned()
    }

    async fn record(&self, call: Call) -> Result<(), GatewayError> {
        self.calls.lock().await.push(call);
        match self.script.lock().await.pop_front() {
            Some(Err(reason)) => Err(GatewayError::Rejected(reason)),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl ChannelGateway for RecordingGateway {
    async fn send(
        &self,
        chat: &ChatRef,
        content: &Content,
        controls: &Controls,
    ) -> Result<MessageHandle, GatewayError> {
        self.record(Call::Send {
            chat: chat.clone(),
            content: content.clone(),
            controls: controls.clone(),
        })
        .await?;
        Ok(MessageHandle {
            chat: chat.clone(),
            message_id: 100 + self.next_message_id.fetch_add(1, Ordering::SeqCst),
        })
    }

    async fn edit_text(
        &self,
        handle: &MessageHandle,
        text: &str,
        controls: &Controls,
    ) -> Result<(), GatewayError> {
        self.record(Call::EditText {
            handle: handle.clone(),
            text: text.to_string(),
            controls: controls.clone(),
        })
        .await
    }

    async fn edit_media_caption(
        &self,
        handle: &MessageHandle,
        caption: &str,
        controls: &Controls,
    ) -> Result<(), GatewayError> {
        self.record(Call::EditCaption {
            handle: handle.clone(),
            caption: caption.to_string(),
            controls: controls.clone(),
        })
        .await
    }

    async fn edit_media(
        &self,
        handle: &MessageHandle,
        content: &Content,
        controls: &Controls,
    ) -> Result<(), GatewayError> {
        self.record(Call::EditMedia {
            handle: handle.clone(),
            content: content.clone(),
            controls: controls.clone(),
        })
        .await
    }

    async fn edit_controls(
        &self,
        handle: &MessageHandle,
        controls: &Controls,
    ) -> Result<(), GatewayError> {
        self.record(Call::EditControls {
            handle: handle.clone(),
            controls: controls.clone(),
        })
        .await
    }
}

/// Word-for-word translator. Unknown input fails.
#[derive(Clone, Default)]
pub struct DictionaryTranslator {
    entries: Arc<HashMap<String, String>>,
    calls: Arc<AtomicUsize>,
}

impl DictionaryTranslator {
    pub fn new(pairs: &[(&str, &str)]) -> Self {
        Self {
            entries: Arc::new(
                pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Translator for DictionaryTranslator {
    async fn translate(&self, text: &str) -> Result<String, TranslationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entries
            .get(text)
            .cloned()
            .ok_or_else(|| TranslationError::Response(format!("no entry for {:?}", text)))
    }

    fn name(&self) -> &str {
        "dictionary"
    }
}

/// Store whose writes always fail.
pub struct FailingStore;

#[async_trait]
impl PostStore for FailingStore {
    async fn insert(&self, _post: &NewPost) -> Result<i64, StoreError> {
        Err(StoreError::Database(sqlx::Error::PoolClosed))
    }

    async fn get(&self, _id: i64) -> Result<Option<Post>, StoreError> {
        Ok(None)
    }

    async fn set_current_lang(&self, _id: i64, _expected: Lang, _new: Lang) -> Result<bool, StoreError> {
        Err(StoreError::Database(sqlx::Error::PoolClosed))
    }
}

pub async fn setup_store() -> Arc<SqlitePostStore> {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    Arc::new(SqlitePostStore::new(pool))
}

pub fn settings() -> ServiceSettings {
    ServiceSettings {
        channel: channel(),
        snippet_len: 1500,
        draft_ttl: Duration::from_secs(3600),
        source_lang: "ru".into(),
        target_lang: "en".into(),
    }
}

pub fn build_service(
    gateway: &RecordingGateway,
    translator: &DictionaryTranslator,
    store: Arc<dyn PostStore>,
) -> BotService {
    BotService::new(
        Arc::new(gateway.clone()),
        Arc::new(translator.clone()),
        store,
        settings(),
    )
}
