//! Mandatory subscription check.

use futures::future::join_all;
use shared::domain::UserId;
use storage::StoredChannel;
use telegram::{ChatPlatform, ChatTarget};
use tracing::{debug, warn};

/// Returns the channels `user_id` has not joined, in input order.
///
/// A failed or impossible lookup counts as not joined.
pub async fn check_all(
    platform: &dyn ChatPlatform,
    user_id: UserId,
    channels: &[StoredChannel],
) -> Vec<StoredChannel> {
    let lookups = channels.iter().map(|channel| async move {
        let Some(target) = ChatTarget::parse(&channel.chat_ref) else {
            warn!(chat_ref = %channel.chat_ref, "mandatory channel has an unusable reference");
            return false;
        };
        match platform.member_status(&target, user_id).await {
            Ok(status) => {
                debug!(%user_id, chat_ref = %channel.chat_ref, ?status, "membership checked");
                status.is_subscribed()
            }
            Err(error) => {
                warn!(%user_id, chat_ref = %channel.chat_ref, %error, "membership lookup failed");
                false
            }
        }
    });
    let satisfied = join_all(lookups).await;

    channels
        .iter()
        .zip(satisfied)
        .filter(|(_, ok)| !ok)
        .map(|(channel, _)| channel.clone())
        .collect()
}

#[cfg(test)]
#[path = "tests/gate_tests.rs"]
mod tests;
