//! Per-operator draft state machine and the arena holding one session per operator.
//!
//! ```text
//! Idle --submit--> AwaitingDecision --publish/cancel--> Idle
//!                        |      ^
//!                      edit     submit (same media kind)
//!                        v      |
//!                  AwaitingManualTarget
//! ```
use crate::error::{BotError, LengthScope};
use crate::gateway::Decision;
use crate::model::{ChatRef, Content, Draft, MessageHandle, OperatorId};
use crate::presenter::{PreviewPresenter, CANCELLED_NOTICE, EDIT_PROMPT, PUBLISHED_NOTICE};
use crate::publish::{PublishCoordinator, PublishReport};
use crate::translator::MarkupAwareTranslator;
use crate::validator::{snippet, ContentValidator};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftState {
    Idle,
    AwaitingDecision,
    AwaitingManualTarget,
}

#[derive(Debug, Default)]
enum Stage {
    #[default]
    Idle,
    AwaitingDecision(Draft),
    AwaitingManualTarget(Draft),
}

/// What a session step produced.
#[derive(Debug, Clone)]
pub enum Outcome {
    Previewed(MessageHandle),
    AwaitingManualTarget,
    Cancelled,
    Published(PublishReport),
}

/// Collaborators a session step runs against.
#[derive(Clone)]
pub struct DraftPipeline {
    pub validator: ContentValidator,
    pub translator: MarkupAwareTranslator,
    pub presenter: PreviewPresenter,
    pub publisher: PublishCoordinator,
}

#[derive(Debug)]
pub struct DraftSession {
    operator: OperatorId,
    chat: ChatRef,
    stage: Stage,
    touched: Instant,
}

impl DraftSession {
    pub fn new(operator: OperatorId, chat: ChatRef) -> Self {
        Self {
            operator,
            chat,
            stage: Stage::Idle,
            touched: Instant::now(),
        }
    }

    pub fn operator(&self) -> OperatorId {
        self.operator
    }

    pub fn state(&self) -> DraftState {
        match self.stage {
            Stage::Idle => DraftState::Idle,
            Stage::AwaitingDecision(_) => DraftState::AwaitingDecision,
            Stage::AwaitingManualTarget(_) => DraftState::AwaitingManualTarget,
        }
    }

    pub fn draft(&self) -> Option<&Draft> {
        match &self.stage {
            Stage::Idle => None,
            Stage::AwaitingDecision(draft) | Stage::AwaitingManualTarget(draft) => Some(draft),
        }
    }

    fn idle_for(&self) -> Duration {
        self.touched.elapsed()
    }

    /// Feed a content message into the session.
    ///
    /// From `Idle` this starts a new draft; from `AwaitingManualTarget` it
    /// replaces the draft's target variant. Failures leave the stage as it was.
    #[instrument(skip_all, fields(operator = self.operator, kind = %content.kind()))]
    pub async fn submit(
        &mut self,
        pipeline: &DraftPipeline,
        content: Content,
    ) -> Result<Outcome, BotError> {
        self.touched = Instant::now();
        let (source, target) = match &self.stage {
            Stage::Idle => {
                let source = pipeline.validator.validate(content)?;
                let target = pipeline.translator.translate_content(&source).await?;
                (source, target)
            }
            Stage::AwaitingManualTarget(draft) => {
                let expected = draft.media_kind();
                if content.kind() != expected {
                    return Err(BotError::ContentKindMismatch {
                        expected,
                        got: content.kind(),
                    });
                }
                let target = pipeline
                    .validator
                    .validate_as(content, LengthScope::ManualTarget)?;
                (draft.source.clone(), target)
            }
            Stage::AwaitingDecision(_) => return Err(BotError::DecisionPending),
        };

        let preview = pipeline.presenter.render(&self.chat, &target).await?;
        debug!(message_id = preview.message_id, "preview rendered");
        self.stage = Stage::AwaitingDecision(Draft {
            source,
            target,
            preview: preview.clone(),
        });
        Ok(Outcome::Previewed(preview))
    }

    /// Apply a Publish / Edit / Cancel decision to the pending draft.
    #[instrument(skip_all, fields(operator = self.operator, ?decision))]
    pub async fn decide(
        &mut self,
        pipeline: &DraftPipeline,
        decision: Decision,
    ) -> Result<Outcome, BotError> {
        self.touched = Instant::now();
        let draft = match std::mem::take(&mut self.stage) {
            Stage::AwaitingDecision(draft) => draft,
            Stage::Idle => return Err(BotError::NoActiveDraft),
            pending @ Stage::AwaitingManualTarget(_) => {
                self.stage = pending;
                return Err(BotError::ManualTargetPending);
            }
        };
        let kind = draft.media_kind();

        match decision {
            Decision::Cancel => {
                if let Err(err) = pipeline
                    .presenter
                    .update(&draft.preview, kind, CANCELLED_NOTICE)
                    .await
                {
                    warn!(?err, "failed to mark preview as cancelled");
                }
                info!("draft cancelled");
                Ok(Outcome::Cancelled)
            }
            Decision::Edit => {
                if let Err(err) = pipeline
                    .presenter
                    .update(&draft.preview, kind, EDIT_PROMPT)
                    .await
                {
                    warn!(?err, "failed to turn preview into edit prompt");
                    if let Err(err) = pipeline.presenter.notify(&self.chat, EDIT_PROMPT).await {
                        warn!(?err, "failed to send edit prompt");
                    }
                }
                self.stage = Stage::AwaitingManualTarget(draft);
                Ok(Outcome::AwaitingManualTarget)
            }
            Decision::Publish => {
                // The draft is gone whatever happens next.
                let report = match pipeline.publisher.publish(&draft).await {
                    Ok(report) => report,
                    Err(BotError::Gateway(source)) => {
                        let len = pipeline.validator.snippet_len();
                        return Err(BotError::PublishRejected {
                            source,
                            source_snippet: snippet(draft.source.markup(), len),
                            target_snippet: snippet(draft.target.markup(), len),
                        });
                    }
                    Err(err) => return Err(err),
                };
                if let Err(err) = pipeline
                    .presenter
                    .update(&draft.preview, kind, PUBLISHED_NOTICE)
                    .await
                {
                    warn!(?err, "failed to mark preview as published");
                }
                Ok(Outcome::Published(report))
            }
        }
    }
}

/// One session per operator, each behind its own lock.
pub struct SessionArena {
    ttl: Duration,
    sessions: Mutex<HashMap<OperatorId, Arc<Mutex<DraftSession>>>>,
}

impl SessionArena {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// The operator's session, created on first use.
    pub async fn session(&self, operator: OperatorId, chat: ChatRef) -> Arc<Mutex<DraftSession>> {
        let mut sessions = self.sessions.lock().await;
        prune(&mut sessions, self.ttl);
        sessions
            .entry(operator)
            .or_insert_with(|| Arc::new(Mutex::new(DraftSession::new(operator, chat))))
            .clone()
    }

    /// The operator's live session, if any.
    pub async fn lookup(&self, operator: OperatorId) -> Option<Arc<Mutex<DraftSession>>> {
        let mut sessions = self.sessions.lock().await;
        prune(&mut sessions, self.ttl);
        sessions.get(&operator).cloned()
    }

    /// Drop sessions idle for longer than the TTL. Returns how many were dropped.
    pub async fn prune_expired(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        prune(&mut sessions, self.ttl)
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn prune(sessions: &mut HashMap<OperatorId, Arc<Mutex<DraftSession>>>, ttl: Duration) -> usize {
    let before = sessions.len();
    sessions.retain(|operator, session| {
        // Busy sessions are in use right now, so not stale.
        let Ok(session) = session.try_lock() else {
            return true;
        };
        if session.idle_for() < ttl {
            return true;
        }
        if session.draft().is_some() {
            info!(operator = *operator, state = ?session.state(), "discarding stale draft");
        }
        false
    });
    before - sessions.len()
}
