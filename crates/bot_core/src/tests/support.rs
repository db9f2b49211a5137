//! Recording platform double and update builders shared by the flow tests.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use shared::domain::{ChatId, MessageId, UserId};
use storage::Storage;
use telegram::{
    CallbackQuery, Chat, ChatPlatform, ChatTarget, FileRef, InlineKeyboardMarkup, MemberStatus,
    Message, PhotoSize, PlatformError, Update, User,
};

use crate::{BotContext, FlowSettings};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Text {
        chat_id: ChatId,
        text: String,
        keyboard: Option<InlineKeyboardMarkup>,
    },
    Photo {
        chat_id: ChatId,
        file_id: String,
        caption: Option<String>,
        keyboard: Option<InlineKeyboardMarkup>,
    },
    Video {
        chat_id: ChatId,
        file_id: String,
        caption: Option<String>,
    },
    Document {
        chat_id: ChatId,
        file_id: String,
        caption: Option<String>,
    },
    EditText {
        chat_id: ChatId,
        message_id: MessageId,
        text: String,
        keyboard: Option<InlineKeyboardMarkup>,
    },
    Answer {
        callback_id: String,
        text: Option<String>,
        show_alert: bool,
    },
}

impl Sent {
    /// Visible text of a message or edit, including media captions.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text { text, .. } | Self::EditText { text, .. } => Some(text),
            Self::Photo { caption, .. }
            | Self::Video { caption, .. }
            | Self::Document { caption, .. } => caption.as_deref(),
            _ => None,
        }
    }

    pub fn keyboard(&self) -> Option<&InlineKeyboardMarkup> {
        match self {
            Self::Text { keyboard, .. }
            | Self::Photo { keyboard, .. }
            | Self::EditText { keyboard, .. } => keyboard.as_ref(),
            _ => None,
        }
    }

    /// Callback payloads of every button on the attached keyboard.
    pub fn payloads(&self) -> Vec<String> {
        self.keyboard()
            .map(|k| k.buttons().filter_map(|b| b.callback_data.clone()).collect())
            .unwrap_or_default()
    }
}

fn rejected(method: &'static str) -> PlatformError {
    PlatformError::Api {
        method,
        code: 403,
        description: "Forbidden: bot was blocked by the user".into(),
    }
}

/// In-memory [`ChatPlatform`] that records every outbound call.
///
/// Membership defaults to `left` for every channel until set.
#[derive(Default)]
pub struct MockPlatform {
    sent: Mutex<Vec<Sent>>,
    members: Mutex<HashMap<(String, i64), MemberStatus>>,
    failing_lookups: Mutex<HashSet<String>>,
    failing_chats: Mutex<HashSet<i64>>,
    next_message_id: AtomicI64,
}

fn target_key(target: &ChatTarget) -> String {
    match target {
        ChatTarget::Id(id) => id.to_string(),
        ChatTarget::Username(name) => name.clone(),
    }
}

impl MockPlatform {
    pub fn set_member(&self, chat_ref: &str, user_id: i64, status: MemberStatus) {
        self.members
            .lock()
            .expect("members lock")
            .insert((chat_ref.to_string(), user_id), status);
    }

    pub fn fail_lookups_for(&self, chat_ref: &str) {
        self.failing_lookups
            .lock()
            .expect("lookups lock")
            .insert(chat_ref.to_string());
    }

    pub fn fail_sends_to(&self, chat_id: i64) {
        self.failing_chats
            .lock()
            .expect("chats lock")
            .insert(chat_id);
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().expect("sent lock").clone()
    }

    /// Returns and forgets everything recorded so far.
    pub fn take(&self) -> Vec<Sent> {
        std::mem::take(&mut *self.sent.lock().expect("sent lock"))
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent()
            .iter()
            .filter_map(|s| s.text().map(str::to_string))
            .collect()
    }

    pub fn last_text(&self) -> String {
        self.texts().pop().unwrap_or_default()
    }

    pub fn last_message(&self) -> Option<Sent> {
        self.sent()
            .into_iter()
            .filter(|s| !matches!(s, Sent::Answer { .. }))
            .last()
    }

    pub fn answers(&self) -> Vec<(Option<String>, bool)> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Answer {
                    text, show_alert, ..
                } => Some((text, show_alert)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, chat_id: ChatId, method: &'static str, sent: Sent) -> telegram::Result<MessageId> {
        if self
            .failing_chats
            .lock()
            .expect("chats lock")
            .contains(&chat_id.0)
        {
            return Err(rejected(method));
        }
        self.sent.lock().expect("sent lock").push(sent);
        Ok(MessageId(
            self.next_message_id.fetch_add(1, Ordering::SeqCst) + 100,
        ))
    }
}

#[async_trait]
impl ChatPlatform for MockPlatform {
    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> telegram::Result<MessageId> {
        self.record(
            chat_id,
            "sendMessage",
            Sent::Text {
                chat_id,
                text: text.to_string(),
                keyboard: keyboard.cloned(),
            },
        )
    }

    async fn send_photo(
        &self,
        chat_id: ChatId,
        photo: &str,
        caption: Option<&str>,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> telegram::Result<MessageId> {
        self.record(
            chat_id,
            "sendPhoto",
            Sent::Photo {
                chat_id,
                file_id: photo.to_string(),
                caption: caption.map(str::to_string),
                keyboard: keyboard.cloned(),
            },
        )
    }

    async fn send_video(
        &self,
        chat_id: ChatId,
        video: &str,
        caption: Option<&str>,
    ) -> telegram::Result<MessageId> {
        self.record(
            chat_id,
            "sendVideo",
            Sent::Video {
                chat_id,
                file_id: video.to_string(),
                caption: caption.map(str::to_string),
            },
        )
    }

    async fn send_document(
        &self,
        chat_id: ChatId,
        document: &str,
        caption: Option<&str>,
    ) -> telegram::Result<MessageId> {
        self.record(
            chat_id,
            "sendDocument",
            Sent::Document {
                chat_id,
                file_id: document.to_string(),
                caption: caption.map(str::to_string),
            },
        )
    }

    async fn edit_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> telegram::Result<()> {
        self.record(
            chat_id,
            "editMessageText",
            Sent::EditText {
                chat_id,
                message_id,
                text: text.to_string(),
                keyboard: keyboard.cloned(),
            },
        )
        .map(|_| ())
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> telegram::Result<()> {
        self.sent.lock().expect("sent lock").push(Sent::Answer {
            callback_id: callback_id.to_string(),
            text: text.map(str::to_string),
            show_alert,
        });
        Ok(())
    }

    async fn member_status(
        &self,
        chat: &ChatTarget,
        user_id: UserId,
    ) -> telegram::Result<MemberStatus> {
        let key = target_key(chat);
        if self
            .failing_lookups
            .lock()
            .expect("lookups lock")
            .contains(&key)
        {
            return Err(PlatformError::Api {
                method: "getChatMember",
                code: 400,
                description: "Bad Request: chat not found".into(),
            });
        }
        Ok(self
            .members
            .lock()
            .expect("members lock")
            .get(&(key, user_id.0))
            .copied()
            .unwrap_or(MemberStatus::Left))
    }
}

pub async fn context(admins: &[i64]) -> (BotContext, Arc<MockPlatform>) {
    let storage = Storage::new("sqlite::memory:")
        .await
        .expect("in-memory storage");
    let platform = Arc::new(MockPlatform::default());
    let settings = FlowSettings {
        admin_ids: admins.iter().copied().map(UserId).collect(),
        broadcast_delay: Duration::ZERO,
        ..FlowSettings::default()
    };
    let ctx = BotContext::new(storage, platform.clone(), settings);
    (ctx, platform)
}

fn user(user_id: i64) -> User {
    User {
        id: user_id,
        is_bot: false,
        first_name: format!("User{user_id}"),
        last_name: None,
        username: None,
    }
}

fn private_message(user_id: i64, message_id: i64) -> Message {
    Message {
        message_id,
        from: Some(user(user_id)),
        chat: Chat {
            id: user_id,
            kind: "private".into(),
            title: None,
        },
        text: None,
        caption: None,
        photo: None,
        video: None,
        document: None,
    }
}

fn wrap(message: Message) -> Update {
    Update {
        update_id: message.message_id,
        message: Some(message),
        callback_query: None,
    }
}

pub fn text_update(user_id: i64, text: &str) -> Update {
    let mut message = private_message(user_id, 1);
    message.text = Some(text.to_string());
    wrap(message)
}

pub fn photo_update(user_id: i64, file_id: &str, caption: Option<&str>) -> Update {
    let mut message = private_message(user_id, 2);
    message.caption = caption.map(str::to_string);
    message.photo = Some(vec![PhotoSize {
        file_id: file_id.to_string(),
        width: 800,
        height: 600,
    }]);
    wrap(message)
}

pub fn video_update(user_id: i64, file_id: &str) -> Update {
    let mut message = private_message(user_id, 3);
    message.video = Some(FileRef {
        file_id: file_id.to_string(),
        file_name: None,
    });
    wrap(message)
}

pub fn document_update(user_id: i64, file_id: &str) -> Update {
    let mut message = private_message(user_id, 4);
    message.document = Some(FileRef {
        file_id: file_id.to_string(),
        file_name: Some(format!("{file_id}.mkv")),
    });
    wrap(message)
}

/// Button press on bot message 77 in the user's private chat.
pub fn callback_update(user_id: i64, data: impl ToString) -> Update {
    Update {
        update_id: 5,
        message: None,
        callback_query: Some(CallbackQuery {
            id: format!("cb-{user_id}"),
            from: user(user_id),
            message: Some(private_message(user_id, 77)),
            data: Some(data.to_string()),
        }),
    }
}
