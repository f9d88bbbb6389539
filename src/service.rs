//! The bot as one object: owns the collaborators and routes operator actions
//! to the session arena and the toggle service.
use crate::config::{Config, ConfigError};
use crate::db::PostStore;
use crate::error::BotError;
use crate::gateway::{ChannelGateway, Decision};
use crate::model::{ChatRef, Content, Lang, OperatorId};
use crate::presenter::{greeting, PreviewPresenter};
use crate::publish::PublishCoordinator;
use crate::session::{DraftPipeline, DraftState, Outcome, SessionArena};
use crate::toggle::ToggleService;
use crate::translator::{MarkupAwareTranslator, Translator};
use crate::validator::ContentValidator;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, instrument, warn};

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub channel: ChatRef,
    pub snippet_len: usize,
    pub draft_ttl: Duration,
    pub source_lang: String,
    pub target_lang: String,
}

impl ServiceSettings {
    pub fn from_config(cfg: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            channel: cfg.channel()?,
            snippet_len: cfg.app.snippet_len,
            draft_ttl: Duration::from_secs(cfg.app.draft_ttl_seconds),
            source_lang: cfg.translation.source_lang.clone(),
            target_lang: cfg.translation.target_lang.clone(),
        })
    }
}

pub struct BotService {
    pipeline: DraftPipeline,
    sessions: SessionArena,
    toggles: ToggleService,
    settings: ServiceSettings,
}

impl BotService {
    pub fn new(
        gateway: Arc<dyn ChannelGateway>,
        translator: Arc<dyn Translator>,
        store: Arc<dyn PostStore>,
        settings: ServiceSettings,
    ) -> Self {
        let validator = ContentValidator::new(settings.snippet_len);
        let pipeline = DraftPipeline {
            validator,
            translator: MarkupAwareTranslator::new(translator, validator),
            presenter: PreviewPresenter::new(gateway.clone()),
            publisher: PublishCoordinator::new(
                gateway.clone(),
                store.clone(),
                settings.channel.clone(),
            ),
        };
        Self {
            pipeline,
            sessions: SessionArena::new(settings.draft_ttl),
            toggles: ToggleService::new(gateway, store),
            settings,
        }
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// Greet the operator. An existing draft is left alone.
    pub async fn start(&self, chat: &ChatRef) -> Result<(), BotError> {
        let text = greeting(&self.settings.source_lang, &self.settings.target_lang);
        self.pipeline.presenter.notify(chat, &text).await?;
        Ok(())
    }

    #[instrument(skip(self, content))]
    pub async fn submit(
        &self,
        operator: OperatorId,
        chat: ChatRef,
        content: Content,
    ) -> Result<Outcome, BotError> {
        let session = self.sessions.session(operator, chat).await;
        let mut session = session.lock().await;
        session.submit(&self.pipeline, content).await
    }

    #[instrument(skip(self))]
    pub async fn decide(&self, operator: OperatorId, decision: Decision) -> Result<Outcome, BotError> {
        let session = self
            .sessions
            .lookup(operator)
            .await
            .ok_or(BotError::NoActiveDraft)?;
        let mut session = session.lock().await;
        session.decide(&self.pipeline, decision).await
    }

    pub async fn toggle(&self, post_id: i64) -> Result<Lang, BotError> {
        self.toggles.toggle(post_id).await
    }

    pub async fn draft_state(&self, operator: OperatorId) -> DraftState {
        match self.sessions.lookup(operator).await {
            Some(session) => session.lock().await.state(),
            None => DraftState::Idle,
        }
    }

    /// Drop drafts idle past the TTL.
    pub async fn prune_sessions(&self) -> usize {
        self.sessions.prune_expired().await
    }

    pub async fn notify(&self, chat: &ChatRef, html: &str) -> Result<(), BotError> {
        self.pipeline.presenter.notify(chat, html).await?;
        Ok(())
    }

    /// Log `err` at the right level and tell the operator about it.
    pub async fn report(&self, chat: &ChatRef, err: &BotError) {
        if err.is_fatal() {
            error!(?err, "unrecoverable publish failure");
        } else {
            warn!(%err, "operator action failed");
        }
        if let Err(send_err) = self.notify(chat, &err.operator_message()).await {
            warn!(?send_err, "failed to report error to operator");
        }
    }
}
