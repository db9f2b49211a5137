//! Public flow: subscription gate, code lookup and part delivery.

use shared::{
    domain::{MediaKind, TitleCode, UserId},
    protocol::LookupAction,
};
use storage::StoredChannel;
use tracing::{debug, info};

use crate::{
    event::{Event, Inbound},
    gate, keyboards,
    pagination::{page_of, paginate},
    session::Session,
    state::LookupState,
    texts, BotContext, FlowResult, Press,
};

const VERIFY: &str = "✅ Check";
const VERIFY_AGAIN: &str = "🔄 Check again";

async fn missing_channels(ctx: &BotContext, user_id: UserId) -> FlowResult<Vec<StoredChannel>> {
    let channels = ctx.storage.list_mandatory_channels().await?;
    Ok(gate::check_all(ctx.platform.as_ref(), user_id, &channels).await)
}

pub(crate) async fn start(ctx: &BotContext, session: &mut Session, inbound: &Inbound) -> FlowResult<()> {
    session.admin = None;
    let missing = missing_channels(ctx, inbound.user.id).await?;

    if missing.is_empty() {
        ctx.platform
            .send_text(inbound.chat_id, &texts::welcome_ready(&inbound.user), None)
            .await?;
        session.lookup = LookupState::AwaitingCode;
    } else {
        let keyboard = keyboards::subscription(&missing, VERIFY);
        ctx.platform
            .send_text(
                inbound.chat_id,
                &texts::welcome_subscribe(&inbound.user, &missing),
                Some(&keyboard),
            )
            .await?;
        session.lookup = LookupState::AwaitingSubscription { pending_code: None };
    }
    Ok(())
}

pub(crate) async fn on_callback(
    ctx: &BotContext,
    session: &mut Session,
    inbound: &Inbound,
    press: Press<'_>,
    action: LookupAction,
) -> FlowResult<()> {
    match action {
        LookupAction::Verify => verify(ctx, session, inbound, press).await,
        LookupAction::View { code } => view_parts(ctx, session, inbound, press, code).await,
        LookupAction::Page { code, page } => change_page(ctx, session, press, code, page).await,
        LookupAction::Part { code, number } => {
            send_part(ctx, session, inbound, press, code, number).await
        }
    }
}

async fn verify(
    ctx: &BotContext,
    session: &mut Session,
    inbound: &Inbound,
    press: Press<'_>,
) -> FlowResult<()> {
    let pending = match session.lookup {
        LookupState::AwaitingSubscription { pending_code } => pending_code,
        _ => None,
    };
    let missing = missing_channels(ctx, inbound.user.id).await?;

    if !missing.is_empty() {
        press
            .answer(ctx, Some(texts::NOT_SUBSCRIBED_ALERT), true)
            .await?;
        let keyboard = keyboards::subscription(&missing, VERIFY_AGAIN);
        press
            .surface
            .show(
                ctx.platform.as_ref(),
                &texts::subscription_missing(&missing),
                Some(&keyboard),
            )
            .await?;
        session.lookup = LookupState::AwaitingSubscription {
            pending_code: pending,
        };
        return Ok(());
    }

    press.answer(ctx, Some(texts::SUBSCRIPTION_OK), false).await?;
    match pending {
        Some(code) => {
            press
                .surface
                .show(ctx.platform.as_ref(), texts::SUBSCRIPTION_OK, None)
                .await?;
            show_title(ctx, session, inbound, code).await
        }
        None => {
            press
                .surface
                .show(
                    ctx.platform.as_ref(),
                    &texts::subscription_ok_enter_code(),
                    None,
                )
                .await?;
            session.lookup = LookupState::AwaitingCode;
            Ok(())
        }
    }
}

/// Plain messages outside an admin step. Digits open a title from any
/// state; other text only matters while a code is expected.
pub(crate) async fn on_message(
    ctx: &BotContext,
    session: &mut Session,
    inbound: &Inbound,
) -> FlowResult<()> {
    let Event::Text(text) = &inbound.event else {
        return Ok(());
    };

    if let Some(code) = TitleCode::parse_digits(text) {
        return resolve_code(ctx, session, inbound, code).await;
    }

    let reply = match session.lookup {
        LookupState::AwaitingCode => texts::INVALID_CODE,
        LookupState::AwaitingSubscription { .. } => texts::SUBSCRIBE_FIRST,
        _ => {
            debug!(user_id = %inbound.user.id, "free text ignored");
            return Ok(());
        }
    };
    ctx.platform.send_text(inbound.chat_id, reply, None).await?;
    Ok(())
}

pub(crate) async fn resolve_code(
    ctx: &BotContext,
    session: &mut Session,
    inbound: &Inbound,
    code: TitleCode,
) -> FlowResult<()> {
    if blocked_by_gate(ctx, session, inbound, code).await? {
        return Ok(());
    }
    show_title(ctx, session, inbound, code).await
}

/// Re-checks mandatory channels before anything from `code` is shown. When
/// some are missing the user gets the subscription prompt and the code is
/// kept for after verification.
async fn blocked_by_gate(
    ctx: &BotContext,
    session: &mut Session,
    inbound: &Inbound,
    code: TitleCode,
) -> FlowResult<bool> {
    let missing = missing_channels(ctx, inbound.user.id).await?;
    if missing.is_empty() {
        return Ok(false);
    }

    let keyboard = keyboards::subscription(&missing, VERIFY);
    ctx.platform
        .send_text(
            inbound.chat_id,
            &texts::subscription_required(&missing),
            Some(&keyboard),
        )
        .await?;
    session.lookup = LookupState::AwaitingSubscription {
        pending_code: Some(code),
    };
    debug!(user_id = %inbound.user.id, %code, missing = missing.len(), "gate blocked title");
    Ok(true)
}

async fn show_title(
    ctx: &BotContext,
    session: &mut Session,
    inbound: &Inbound,
    code: TitleCode,
) -> FlowResult<()> {
    let Some(title) = ctx.storage.title_by_code(code).await? else {
        ctx.platform
            .send_text(inbound.chat_id, &texts::title_not_found(code), None)
            .await?;
        session.lookup = LookupState::AwaitingCode;
        return Ok(());
    };

    let parts = ctx.storage.list_parts(code).await?;
    let card = texts::title_card(&title, parts.len());
    let keyboard = keyboards::view_parts(code);
    match &title.cover_file_id {
        Some(cover) => {
            ctx.platform
                .send_photo(inbound.chat_id, cover, Some(card.as_str()), Some(&keyboard))
                .await?
        }
        None => {
            ctx.platform
                .send_text(inbound.chat_id, &card, Some(&keyboard))
                .await?
        }
    };

    ctx.storage.record_view(inbound.user.id, code, None).await?;
    info!(user_id = %inbound.user.id, %code, "title shown");
    session.lookup = LookupState::ViewingTitle { code };
    Ok(())
}

async fn view_parts(
    ctx: &BotContext,
    session: &mut Session,
    inbound: &Inbound,
    press: Press<'_>,
    code: TitleCode,
) -> FlowResult<()> {
    let parts = ctx.storage.list_parts(code).await?;
    if parts.is_empty() {
        return press.answer(ctx, Some(texts::NO_PARTS), true).await;
    }
    press.answer(ctx, None, false).await?;
    if blocked_by_gate(ctx, session, inbound, code).await? {
        return Ok(());
    }

    let page = paginate(parts.len(), 1, ctx.settings.page_size);
    let keyboard = keyboards::parts_grid(code, &parts, &page);
    ctx.platform
        .send_text(
            inbound.chat_id,
            &texts::parts_page(code, &page, parts.len()),
            Some(&keyboard),
        )
        .await?;
    session.lookup = LookupState::ViewingParts {
        code,
        page: page.page,
    };
    Ok(())
}

async fn change_page(
    ctx: &BotContext,
    session: &mut Session,
    press: Press<'_>,
    code: TitleCode,
    requested: usize,
) -> FlowResult<()> {
    let parts = ctx.storage.list_parts(code).await?;
    if parts.is_empty() {
        return press.answer(ctx, Some(texts::NO_PARTS), true).await;
    }
    press.answer(ctx, None, false).await?;

    let page = paginate(parts.len(), requested, ctx.settings.page_size);
    let keyboard = keyboards::parts_grid(code, &parts, &page);
    press
        .surface
        .show(
            ctx.platform.as_ref(),
            &texts::parts_page(code, &page, parts.len()),
            Some(&keyboard),
        )
        .await?;
    session.lookup = LookupState::ViewingParts {
        code,
        page: page.page,
    };
    Ok(())
}

async fn send_part(
    ctx: &BotContext,
    session: &mut Session,
    inbound: &Inbound,
    press: Press<'_>,
    code: TitleCode,
    number: u32,
) -> FlowResult<()> {
    let Some(part) = ctx.storage.part(code, number).await? else {
        return press.answer(ctx, Some(texts::PART_NOT_FOUND), true).await;
    };
    press.answer(ctx, None, false).await?;
    if blocked_by_gate(ctx, session, inbound, code).await? {
        return Ok(());
    }

    let caption = texts::part_caption(code, number);
    match part.kind {
        MediaKind::Video => {
            ctx.platform
                .send_video(inbound.chat_id, &part.file_id, Some(caption.as_str()))
                .await?
        }
        MediaKind::Document => {
            ctx.platform
                .send_document(inbound.chat_id, &part.file_id, Some(caption.as_str()))
                .await?
        }
        MediaKind::Photo => {
            ctx.platform
                .send_photo(inbound.chat_id, &part.file_id, Some(caption.as_str()), None)
                .await?
        }
    };
    ctx.storage
        .record_view(inbound.user.id, code, Some(number))
        .await?;

    let on_this_title = matches!(session.lookup, LookupState::ViewingParts { code: current, .. } if current == code);
    if !on_this_title {
        let index = usize::try_from(number.saturating_sub(1)).unwrap_or(0);
        session.lookup = LookupState::ViewingParts {
            code,
            page: page_of(index, ctx.settings.page_size),
        };
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/lookup_tests.rs"]
mod tests;
