use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use shared::domain::{ChatId, MessageId, UserId};
use thiserror::Error;
use tracing::debug;

pub mod types;

pub use types::{
    CallbackQuery, Chat, ChatMember, ChatTarget, FileRef, InlineKeyboardButton,
    InlineKeyboardMarkup, MemberStatus, Message, PhotoSize, Update, User,
};

use types::ApiResponse;

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";
const PARSE_MODE: &str = "HTML";
const POLL_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("{method} transport failure: {source}")]
    Transport {
        method: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{method} failed with http status {status}")]
    Status { method: &'static str, status: u16 },
    #[error("{method} rejected ({code}): {description}")]
    Api {
        method: &'static str,
        code: i64,
        description: String,
    },
    #[error("{method} returned no result")]
    EmptyResult { method: &'static str },
}

impl PlatformError {
    fn is_not_modified(&self) -> bool {
        matches!(self, Self::Api { description, .. } if description.contains("message is not modified"))
    }
}

pub type Result<T> = std::result::Result<T, PlatformError>;

/// Outbound operations the bot performs against the chat platform.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> Result<MessageId>;

    async fn send_photo(
        &self,
        chat_id: ChatId,
        photo: &str,
        caption: Option<&str>,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> Result<MessageId>;

    async fn send_video(
        &self,
        chat_id: ChatId,
        video: &str,
        caption: Option<&str>,
    ) -> Result<MessageId>;

    async fn send_document(
        &self,
        chat_id: ChatId,
        document: &str,
        caption: Option<&str>,
    ) -> Result<MessageId>;

    async fn edit_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> Result<()>;

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<()>;

    async fn member_status(&self, chat: &ChatTarget, user_id: UserId) -> Result<MemberStatus>;
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<&'a InlineKeyboardMarkup>,
}

#[derive(Serialize)]
struct SendMediaRequest<'a> {
    chat_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    photo: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    video: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    document: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    caption: Option<&'a str>,
    parse_mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<&'a InlineKeyboardMarkup>,
}

impl<'a> SendMediaRequest<'a> {
    fn new(chat_id: ChatId, caption: Option<&'a str>) -> Self {
        Self {
            chat_id: chat_id.0,
            photo: None,
            video: None,
            document: None,
            caption,
            parse_mode: PARSE_MODE,
            reply_markup: None,
        }
    }
}

#[derive(Serialize)]
struct EditMessageTextRequest<'a> {
    chat_id: i64,
    message_id: i64,
    text: &'a str,
    parse_mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<&'a InlineKeyboardMarkup>,
}

#[derive(Serialize)]
struct AnswerCallbackRequest<'a> {
    callback_query_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    show_alert: bool,
}

#[derive(Serialize)]
struct GetChatMemberRequest<'a> {
    chat_id: &'a ChatTarget,
    user_id: i64,
}

#[derive(Serialize)]
struct GetUpdatesRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: &'a [&'a str],
}

#[derive(Serialize)]
struct Empty {}

/// Bot API client over HTTPS JSON calls.
#[derive(Clone)]
pub struct TelegramClient {
    http: Client,
    endpoint: String,
}

impl TelegramClient {
    pub fn new(api_base_url: &str, token: &str) -> Self {
        Self {
            http: Client::new(),
            endpoint: format!("{}/bot{token}", api_base_url.trim_end_matches('/')),
        }
    }

    pub async fn get_me(&self) -> Result<User> {
        self.call("getMe", &Empty {}, None).await
    }

    /// Long-polls for updates after `offset`.
    pub async fn get_updates(&self, offset: Option<i64>, timeout: Duration) -> Result<Vec<Update>> {
        let request = GetUpdatesRequest {
            offset,
            timeout: timeout.as_secs(),
            allowed_updates: &["message", "callback_query"],
        };
        self.call("getUpdates", &request, Some(timeout + POLL_GRACE))
            .await
    }

    async fn call<P, R>(&self, method: &'static str, payload: &P, timeout: Option<Duration>) -> Result<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let mut request = self
            .http
            .post(format!("{}/{method}", self.endpoint))
            .json(payload);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        // Errors are stripped of their url because it embeds the bot token.
        let transport = |source: reqwest::Error| PlatformError::Transport {
            method,
            source: source.without_url(),
        };
        let response = request.send().await.map_err(transport)?;
        let status = response.status();

        let body: ApiResponse<R> = match response.json().await {
            Ok(body) => body,
            Err(_) if !status.is_success() => {
                return Err(PlatformError::Status {
                    method,
                    status: status.as_u16(),
                })
            }
            Err(source) => return Err(transport(source)),
        };

        if !body.ok {
            return Err(PlatformError::Api {
                method,
                code: body.error_code.unwrap_or_else(|| i64::from(status.as_u16())),
                description: body.description.unwrap_or_default(),
            });
        }
        body.result.ok_or(PlatformError::EmptyResult { method })
    }

    async fn send(&self, method: &'static str, request: &SendMediaRequest<'_>) -> Result<MessageId> {
        let message: Message = self.call(method, request, None).await?;
        Ok(MessageId(message.message_id))
    }

    /// Edits that leave the message unchanged are not failures.
    async fn edit<P: Serialize>(&self, method: &'static str, request: &P) -> Result<()> {
        match self.call::<_, serde_json::Value>(method, request, None).await {
            Ok(_) => Ok(()),
            Err(error) if error.is_not_modified() => {
                debug!(method, "edit skipped; message not modified");
                Ok(())
            }
            Err(error) => Err(error),
        }
    }
}

#[async_trait]
impl ChatPlatform for TelegramClient {
    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> Result<MessageId> {
        let request = SendMessageRequest {
            chat_id: chat_id.0,
            text,
            parse_mode: PARSE_MODE,
            reply_markup: keyboard,
        };
        let message: Message = self.call("sendMessage", &request, None).await?;
        Ok(MessageId(message.message_id))
    }

    async fn send_photo(
        &self,
        chat_id: ChatId,
        photo: &str,
        caption: Option<&str>,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> Result<MessageId> {
        let request = SendMediaRequest {
            photo: Some(photo),
            reply_markup: keyboard,
            ..SendMediaRequest::new(chat_id, caption)
        };
        self.send("sendPhoto", &request).await
    }

    async fn send_video(
        &self,
        chat_id: ChatId,
        video: &str,
        caption: Option<&str>,
    ) -> Result<MessageId> {
        let request = SendMediaRequest {
            video: Some(video),
            ..SendMediaRequest::new(chat_id, caption)
        };
        self.send("sendVideo", &request).await
    }

    async fn send_document(
        &self,
        chat_id: ChatId,
        document: &str,
        caption: Option<&str>,
    ) -> Result<MessageId> {
        let request = SendMediaRequest {
            document: Some(document),
            ..SendMediaRequest::new(chat_id, caption)
        };
        self.send("sendDocument", &request).await
    }

    async fn edit_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> Result<()> {
        let request = EditMessageTextRequest {
            chat_id: chat_id.0,
            message_id: message_id.0,
            text,
            parse_mode: PARSE_MODE,
            reply_markup: keyboard,
        };
        self.edit("editMessageText", &request).await
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<()> {
        let request = AnswerCallbackRequest {
            callback_query_id: callback_id,
            text,
            show_alert,
        };
        let _: bool = self.call("answerCallbackQuery", &request, None).await?;
        Ok(())
    }

    async fn member_status(&self, chat: &ChatTarget, user_id: UserId) -> Result<MemberStatus> {
        let request = GetChatMemberRequest {
            chat_id: chat,
            user_id: user_id.0,
        };
        let member: ChatMember = self.call("getChatMember", &request, None).await?;
        Ok(member.status)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
