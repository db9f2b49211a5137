//! Conversation flows of the catalog bot.
//!
//! [`handle_update`] is the single entry point: it turns a raw update into an
//! [`event::Event`], serializes it against the sender's session and routes it
//! to the lookup flow, the admin flow or a command.

use std::{path::PathBuf, sync::Arc, time::Duration, time::Instant};

use shared::{
    domain::{ChatId, MessageId, UserId},
    error::ErrorCode,
    protocol::CallbackAction,
};
use storage::{Storage, StoreError};
use telegram::{ChatPlatform, InlineKeyboardMarkup, PlatformError, Update};
use thiserror::Error;
use tracing::{debug, error, warn};

mod admin;
pub mod broadcast;
mod commands;
pub mod event;
pub mod gate;
pub mod keyboards;
mod lookup;
pub mod pagination;
pub mod session;
pub mod state;
pub mod texts;

use event::{Event, Inbound};
use session::{Admission, Session, SessionStore};

#[derive(Debug, Clone)]
pub struct FlowSettings {
    pub admin_ids: Vec<UserId>,
    pub page_size: usize,
    pub broadcast_delay: Duration,
    /// Events per user per minute; zero disables the limit.
    pub rate_limit_per_minute: usize,
    pub backup_dir: PathBuf,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            admin_ids: Vec::new(),
            page_size: pagination::DEFAULT_PAGE_SIZE,
            broadcast_delay: broadcast::BROADCAST_DELAY,
            rate_limit_per_minute: 30,
            backup_dir: PathBuf::from("backups"),
        }
    }
}

#[derive(Clone)]
pub struct BotContext {
    pub storage: Storage,
    pub platform: Arc<dyn ChatPlatform>,
    pub sessions: SessionStore,
    pub settings: Arc<FlowSettings>,
}

impl BotContext {
    pub fn new(storage: Storage, platform: Arc<dyn ChatPlatform>, settings: FlowSettings) -> Self {
        Self {
            storage,
            platform,
            sessions: SessionStore::new(),
            settings: Arc::new(settings),
        }
    }

    pub fn is_admin(&self, user_id: UserId) -> bool {
        self.settings.admin_ids.contains(&user_id)
    }
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

impl FlowError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Store(error) => error.code(),
            Self::Platform(_) => ErrorCode::External,
        }
    }
}

pub type FlowResult<T> = std::result::Result<T, FlowError>;

/// Where a reply goes: a fresh message, or an edit of the message that
/// carried the pressed button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Surface {
    Send(ChatId),
    Edit(ChatId, MessageId),
}

impl Surface {
    pub(crate) fn for_callback(chat_id: ChatId, origin: Option<MessageId>) -> Self {
        match origin {
            Some(message_id) => Self::Edit(chat_id, message_id),
            None => Self::Send(chat_id),
        }
    }

    pub(crate) async fn show(
        self,
        platform: &dyn ChatPlatform,
        text: &str,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> FlowResult<()> {
        match self {
            Self::Send(chat_id) => {
                platform.send_text(chat_id, text, keyboard).await?;
            }
            Self::Edit(chat_id, message_id) => {
                platform.edit_text(chat_id, message_id, text, keyboard).await?
            }
        }
        Ok(())
    }
}

/// Pressed button as seen by the flows.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Press<'a> {
    pub id: &'a str,
    pub surface: Surface,
}

impl Press<'_> {
    pub(crate) async fn answer(&self, ctx: &BotContext, text: Option<&str>, alert: bool) -> FlowResult<()> {
        ctx.platform.answer_callback(self.id, text, alert).await?;
        Ok(())
    }
}

/// Handles one update end to end. Failures never escape: they are logged,
/// the sender's session is reset and the sender gets a short error text.
pub async fn handle_update(ctx: &BotContext, update: &Update) {
    let Some(inbound) = Inbound::from_update(update) else {
        debug!(update_id = update.update_id, "update ignored");
        return;
    };

    let user_id = inbound.user.id;
    let mut session = ctx.sessions.acquire(user_id).await;

    if let Err(failure) = dispatch(ctx, &mut session, &inbound).await {
        error!(
            %user_id,
            update_id = update.update_id,
            code = failure.code().as_str(),
            error = %failure,
            "update handling failed"
        );
        session.reset();

        if let Event::Callback { id, .. } = &inbound.event {
            if let Err(error) = ctx.platform.answer_callback(id, None, false).await {
                debug!(%user_id, %error, "could not answer callback after failure");
            }
        }
        let notice = texts::generic_failure(&failure.to_string());
        if let Err(error) = ctx.platform.send_text(inbound.chat_id, &notice, None).await {
            warn!(%user_id, %error, "could not deliver failure notice");
        }
    }
}

async fn dispatch(ctx: &BotContext, session: &mut Session, inbound: &Inbound) -> FlowResult<()> {
    let user_id = inbound.user.id;
    let stored = ctx.storage.upsert_user(&inbound.user).await?;
    let is_admin = ctx.is_admin(user_id);

    if stored.blocked && !is_admin {
        debug!(%user_id, "ignoring blocked user");
        if let Event::Callback { id, .. } = &inbound.event {
            ctx.platform.answer_callback(id, None, false).await?;
        }
        return Ok(());
    }

    if !is_admin {
        match session.admit(Instant::now(), ctx.settings.rate_limit_per_minute) {
            Admission::Allowed => {}
            Admission::Notify => {
                warn!(%user_id, "rate limit reached");
                match &inbound.event {
                    Event::Callback { id, .. } => {
                        ctx.platform
                            .answer_callback(id, Some(texts::RATE_LIMITED), true)
                            .await?
                    }
                    _ => {
                        ctx.platform
                            .send_text(inbound.chat_id, texts::RATE_LIMITED, None)
                            .await?;
                    }
                }
                return Ok(());
            }
            Admission::Dropped => {
                if let Event::Callback { id, .. } = &inbound.event {
                    ctx.platform.answer_callback(id, None, false).await?;
                }
                return Ok(());
            }
        }
    }

    match &inbound.event {
        Event::Command { name, args } => commands::handle(ctx, session, inbound, name, args).await,
        Event::Callback { id, data, origin } => {
            let press = Press {
                id,
                surface: Surface::for_callback(inbound.chat_id, *origin),
            };
            match data.parse::<CallbackAction>() {
                Ok(CallbackAction::Lookup(action)) => {
                    lookup::on_callback(ctx, session, inbound, press, action).await
                }
                Ok(CallbackAction::Admin(action)) => {
                    admin::on_callback(ctx, session, inbound, press, action).await
                }
                Ok(CallbackAction::Noop) => press.answer(ctx, None, false).await,
                Err(error) => {
                    debug!(%user_id, %error, "unknown callback payload");
                    press.answer(ctx, Some(texts::BUTTON_EXPIRED), false).await
                }
            }
        }
        Event::Text(_) | Event::Media(_) => {
            let admin_input = is_admin
                && session
                    .admin
                    .as_ref()
                    .is_some_and(|state| state.captures_messages());
            if admin_input {
                admin::on_message(ctx, session, inbound).await
            } else {
                lookup::on_message(ctx, session, inbound).await
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
