use crate::gateway::telegram::content_from_message;
use crate::gateway::{Callback, Decision};
use crate::model::{ChatRef, OperatorId};
use crate::service::BotService;
use crate::session::Outcome;
use std::collections::HashSet;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, UpdateKind};
use tracing::{debug, info, instrument, warn};

/// Shared state handed to every update handler.
pub struct HandlerContext {
    pub service: Arc<BotService>,
    pub allowed: HashSet<OperatorId>,
}

impl HandlerContext {
    pub fn new(service: Arc<BotService>, allowed: impl IntoIterator<Item = OperatorId>) -> Self {
        Self {
            service,
            allowed: allowed.into_iter().collect(),
        }
    }

    pub fn is_operator(&self, user: OperatorId) -> bool {
        self.allowed.contains(&user)
    }
}

/// Dispatcher worker an update runs on. Updates with the same key run in order,
/// different keys run concurrently.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WorkerKey {
    /// Operator chats and anything else tied to a chat.
    Chat(i64),
    /// Toggle presses, so one slow channel edit holds up only its own post.
    Post(i64),
}

pub fn worker_key(update: &Update) -> Option<WorkerKey> {
    match &update.kind {
        UpdateKind::CallbackQuery(q) => match q.data.as_deref().and_then(Callback::parse) {
            Some(Callback::Toggle(post_id)) => Some(WorkerKey::Post(post_id)),
            // Drafts live in the operator's private chat, whose id is the user id.
            Some(Callback::Draft(_)) => Some(WorkerKey::Chat(q.from.id.0 as i64)),
            None => None,
        },
        _ => update.chat().map(|chat| WorkerKey::Chat(chat.id.0)),
    }
}

const UNBOUND_TOGGLE_NOTICE: &str =
    "⚠️ The post is live, but its language button could not be linked. It will not switch languages.";

#[instrument(skip_all)]
pub async fn on_message(bot: Bot, msg: Message, ctx: Arc<HandlerContext>) -> ResponseResult<()> {
    let user = match msg.from() {
        Some(u) => u,
        None => return Ok(()),
    };
    let operator = user.id.0 as OperatorId;
    if !ctx.is_operator(operator) {
        debug!(operator, "ignoring message from non-operator");
        return Ok(());
    }
    let chat = ChatRef::Id(msg.chat.id.0);
    let service = &ctx.service;

    if let Some(text) = msg.text() {
        if text.trim() == "/start" || text.trim().starts_with("/start ") {
            if let Err(err) = service.start(&chat).await {
                warn!(?err, "failed to send greeting");
            }
            return Ok(());
        }
    }

    let content = match content_from_message(&msg) {
        Ok(content) => content,
        Err(err) => {
            service.report(&chat, &err).await;
            return Ok(());
        }
    };

    let _ = bot.send_chat_action(msg.chat.id, ChatAction::Typing).await;
    match service.submit(operator, chat.clone(), content).await {
        Ok(outcome) => debug!(?outcome, "submission handled"),
        Err(err) => service.report(&chat, &err).await,
    }
    Ok(())
}

#[instrument(skip_all)]
pub async fn on_callback(bot: Bot, q: CallbackQuery, ctx: Arc<HandlerContext>) -> ResponseResult<()> {
    let user = q.from.id.0 as OperatorId;
    let callback = q.data.as_deref().and_then(Callback::parse);

    let alert = match callback {
        None => {
            debug!(data = ?q.data, "unknown callback payload");
            None
        }
        // Anyone reading the channel may switch a post's language.
        Some(Callback::Toggle(post_id)) => match ctx.service.toggle(post_id).await {
            Ok(lang) => {
                debug!(post_id, lang = lang.as_str(), user, "toggled");
                None
            }
            Err(err) => {
                warn!(%err, post_id, "toggle failed");
                Some(err.alert_text())
            }
        },
        Some(Callback::Draft(decision)) => {
            if ctx.is_operator(user) {
                on_decision(&ctx, user, decision).await
            } else {
                None
            }
        }
    };

    let answer = bot.answer_callback_query(q.id.clone());
    let res = match alert {
        Some(text) => answer.text(text).show_alert(true).await,
        None => answer.await,
    };
    if let Err(err) = res {
        warn!(?err, "failed to answer callback query");
    }
    Ok(())
}

/// Returns alert text for the callback answer when the decision failed.
async fn on_decision(ctx: &HandlerContext, operator: OperatorId, decision: Decision) -> Option<String> {
    let service = &ctx.service;
    // Drafts live in the operator's private chat, whose id is the user id.
    let chat = ChatRef::Id(operator);
    match service.decide(operator, decision).await {
        Ok(Outcome::Published(report)) => {
            info!(post_id = report.post.id, "draft published");
            if !report.controls_bound {
                if let Err(err) = service.notify(&chat, UNBOUND_TOGGLE_NOTICE).await {
                    warn!(?err, "failed to send notice");
                }
            }
            None
        }
        Ok(outcome) => {
            debug!(?outcome, "decision handled");
            None
        }
        Err(err) => {
            let alert = err.alert_text();
            service.report(&chat, &err).await;
            Some(alert)
        }
    }
}
