//! Sequential fan-out of one message to many chats.

use std::time::Duration;

use shared::domain::{ChatId, GroupId};
use telegram::{ChatPlatform, PlatformError};
use tracing::{info, warn};

/// Pause between two consecutive sends.
pub const BROADCAST_DELAY: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastPayload {
    Text(String),
    Photo {
        file_id: String,
        caption: Option<String>,
    },
    Video {
        file_id: String,
        caption: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    AllUsers,
    AllGroups,
    Group(GroupId),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub sent: usize,
    pub failed: usize,
}

pub async fn broadcast(
    platform: &dyn ChatPlatform,
    recipients: &[ChatId],
    payload: &BroadcastPayload,
    delay: Duration,
) -> BroadcastReport {
    let mut report = BroadcastReport::default();

    for (index, chat_id) in recipients.iter().enumerate() {
        if index > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match deliver(platform, *chat_id, payload).await {
            Ok(()) => report.sent += 1,
            Err(error) => {
                report.failed += 1;
                warn!(%chat_id, %error, "broadcast delivery failed");
            }
        }
    }

    info!(
        recipients = recipients.len(),
        sent = report.sent,
        failed = report.failed,
        "broadcast finished"
    );
    report
}

async fn deliver(
    platform: &dyn ChatPlatform,
    chat_id: ChatId,
    payload: &BroadcastPayload,
) -> Result<(), PlatformError> {
    match payload {
        BroadcastPayload::Text(text) => platform.send_text(chat_id, text, None).await?,
        BroadcastPayload::Photo { file_id, caption } => {
            platform
                .send_photo(chat_id, file_id, caption.as_deref(), None)
                .await?
        }
        BroadcastPayload::Video { file_id, caption } => {
            platform
                .send_video(chat_id, file_id, caption.as_deref())
                .await?
        }
    };
    Ok(())
}

#[cfg(test)]
#[path = "tests/broadcast_tests.rs"]
mod tests;
