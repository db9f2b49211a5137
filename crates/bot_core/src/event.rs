//! Normalization of raw updates into the events the flows understand.

use shared::domain::{ChatId, MediaKind, MessageId, UserId, UserProfile};
use telegram::{Message, Update, User};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaInput {
    pub kind: MediaKind,
    pub file_id: String,
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Command { name: String, args: String },
    Text(String),
    Media(MediaInput),
    Callback {
        id: String,
        data: String,
        origin: Option<MessageId>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub user: UserProfile,
    pub chat_id: ChatId,
    pub event: Event,
}

fn profile(user: &User) -> UserProfile {
    UserProfile {
        id: UserId(user.id),
        username: user.username.clone(),
        first_name: Some(user.first_name.clone()).filter(|name| !name.is_empty()),
        last_name: user.last_name.clone(),
    }
}

fn command(text: &str) -> Option<Event> {
    let body = text.strip_prefix('/')?;
    let (head, args) = match body.split_once(char::is_whitespace) {
        Some((head, args)) => (head, args.trim()),
        None => (body, ""),
    };
    let name = head.split('@').next().unwrap_or(head).to_lowercase();
    if name.is_empty() {
        return None;
    }
    Some(Event::Command {
        name,
        args: args.to_string(),
    })
}

fn message_event(message: &Message) -> Option<Event> {
    let caption = message.caption.clone();
    if let Some(photo) = message.photo.as_ref().and_then(|sizes| sizes.last()) {
        return Some(Event::Media(MediaInput {
            kind: MediaKind::Photo,
            file_id: photo.file_id.clone(),
            caption,
        }));
    }
    if let Some(video) = &message.video {
        return Some(Event::Media(MediaInput {
            kind: MediaKind::Video,
            file_id: video.file_id.clone(),
            caption,
        }));
    }
    if let Some(document) = &message.document {
        return Some(Event::Media(MediaInput {
            kind: MediaKind::Document,
            file_id: document.file_id.clone(),
            caption,
        }));
    }

    let text = message.text.as_deref()?;
    Some(command(text).unwrap_or_else(|| Event::Text(text.to_string())))
}

impl Inbound {
    /// Returns `None` for updates the bot does not react to, such as
    /// messages from other bots or without a sender.
    pub fn from_update(update: &Update) -> Option<Self> {
        if let Some(query) = &update.callback_query {
            if query.from.is_bot {
                return None;
            }
            let chat_id = query
                .message
                .as_ref()
                .map(|m| ChatId(m.chat.id))
                .unwrap_or(ChatId(query.from.id));
            return Some(Self {
                user: profile(&query.from),
                chat_id,
                event: Event::Callback {
                    id: query.id.clone(),
                    data: query.data.clone().unwrap_or_default(),
                    origin: query.message.as_ref().map(|m| MessageId(m.message_id)),
                },
            });
        }

        // Chatter inside distribution groups is not addressed to the bot.
        let message = update.message.as_ref().filter(|m| m.chat.kind == "private")?;
        let from = message.from.as_ref().filter(|user| !user.is_bot)?;
        Some(Self {
            user: profile(from),
            chat_id: ChatId(message.chat.id),
            event: message_event(message)?,
        })
    }
}
