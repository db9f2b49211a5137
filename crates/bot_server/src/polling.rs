use std::{future::Future, time::Duration};

use bot_core::{handle_update, BotContext};
use telegram::{TelegramClient, Update};
use tokio::{task::JoinSet, time::sleep};
use tracing::{debug, info, warn};

pub const RETRY_DELAY: Duration = Duration::from_secs(3);

/// Offset acknowledging every update in `batch`.
fn next_offset(current: Option<i64>, batch: &[Update]) -> Option<i64> {
    batch
        .iter()
        .map(|update| update.update_id + 1)
        .max()
        .max(current)
}

/// Long-polls until `shutdown` resolves, handling each update on its own
/// task. In-flight handlers are awaited before returning.
pub async fn run(
    client: TelegramClient,
    ctx: BotContext,
    poll_timeout: Duration,
    shutdown: impl Future<Output = ()>,
) {
    tokio::pin!(shutdown);
    let mut offset = None;
    let mut handlers = JoinSet::new();

    info!(timeout_secs = poll_timeout.as_secs(), "polling for updates");
    loop {
        let batch = tokio::select! {
            biased;
            _ = &mut shutdown => break,
            batch = client.get_updates(offset, poll_timeout) => batch,
        };

        match batch {
            Ok(updates) => {
                offset = next_offset(offset, &updates);
                for update in updates {
                    let ctx = ctx.clone();
                    handlers.spawn(async move { handle_update(&ctx, &update).await });
                }
            }
            Err(error) => {
                warn!(%error, "getUpdates failed; retrying");
                tokio::select! {
                    biased;
                    _ = &mut shutdown => break,
                    _ = sleep(RETRY_DELAY) => {}
                }
            }
        }

        while let Some(finished) = handlers.try_join_next() {
            if let Err(error) = finished {
                warn!(%error, "update handler panicked");
            }
        }
    }

    info!(in_flight = handlers.len(), "shutdown requested; draining handlers");
    while let Some(finished) = handlers.join_next().await {
        if let Err(error) = finished {
            warn!(%error, "update handler panicked");
        }
    }
    debug!("polling stopped");
}

#[cfg(test)]
#[path = "tests/polling_tests.rs"]
mod tests;
