use shared::domain::UserId;
use tracing::info;

use crate::{admin, event::Inbound, lookup, session::Session, texts, BotContext, FlowResult};

const TOP_LIMIT: i64 = 10;

const ADMIN_COMMANDS: &[&str] = &[
    "stats",
    "top",
    "groups",
    "broadcast",
    "backup",
    "block",
    "unblock",
];

pub(crate) async fn handle(
    ctx: &BotContext,
    session: &mut Session,
    inbound: &Inbound,
    name: &str,
    args: &str,
) -> FlowResult<()> {
    let chat_id = inbound.chat_id;
    let user_id = inbound.user.id;
    let is_admin = ctx.is_admin(user_id);

    if ADMIN_COMMANDS.contains(&name) && !is_admin {
        info!(%user_id, command = name, "admin command refused");
        ctx.platform
            .send_text(chat_id, texts::ADMIN_ONLY, None)
            .await?;
        return Ok(());
    }

    match name {
        "start" => return lookup::start(ctx, session, inbound).await,
        "admin" => return admin::open_menu(ctx, session, inbound).await,
        "broadcast" => return admin::open_broadcast(ctx, session, inbound).await,
        _ => {}
    }

    let reply = match name {
        "help" => texts::help(is_admin),
        "cancel" => {
            session.reset();
            texts::CANCELLED.to_string()
        }
        "search" if args.is_empty() => texts::SEARCH_USAGE.to_string(),
        "search" => {
            let titles = ctx.storage.search_titles(args).await?;
            texts::search_results(args, &titles)
        }
        "stats" => texts::stats(&ctx.storage.stats().await?),
        "top" => texts::top_titles(&ctx.storage.most_viewed(TOP_LIMIT).await?),
        "groups" => texts::groups_list(&ctx.storage.list_groups().await?),
        "backup" => {
            let backup = ctx
                .storage
                .create_full_backup(&ctx.settings.backup_dir)
                .await?;
            info!(
                %user_id,
                database = %backup.database.display(),
                json = %backup.json.display(),
                "backup written on request"
            );
            texts::backup_written(&backup)
        }
        "block" | "unblock" => set_blocked(ctx, user_id, args, name == "block").await?,
        _ => texts::UNKNOWN_COMMAND.to_string(),
    };

    ctx.platform.send_text(chat_id, &reply, None).await?;
    Ok(())
}

async fn set_blocked(
    ctx: &BotContext,
    admin_id: UserId,
    args: &str,
    blocked: bool,
) -> FlowResult<String> {
    let Ok(target) = args.trim().parse::<i64>().map(UserId) else {
        return Ok(texts::BLOCK_USAGE.to_string());
    };
    if ctx.storage.user(target).await?.is_none() {
        return Ok(texts::user_not_found(target));
    }

    ctx.storage.set_user_blocked(target, blocked).await?;
    info!(%admin_id, user_id = %target, blocked, "user block flag changed");
    Ok(texts::user_block_changed(target, blocked))
}

#[cfg(test)]
#[path = "tests/commands_tests.rs"]
mod tests;
