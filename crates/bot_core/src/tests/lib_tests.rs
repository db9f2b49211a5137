use super::*;
use crate::{
    state::{AdminState, LookupState},
    test_support::{callback_update, context, text_update, Sent},
};
use shared::domain::TitleCode;

#[tokio::test]
async fn internal_failure_resets_both_flows_and_notifies() {
    let (ctx, platform) = context(&[1]).await;
    let mut session = Session::default();
    session.lookup = LookupState::ViewingTitle { code: TitleCode(3) };
    session.admin = Some(AdminState::Menu);
    ctx.sessions.set(UserId(1), session).await;

    ctx.storage.close().await;
    handle_update(&ctx, &text_update(1, "42")).await;

    let session = ctx.sessions.get(UserId(1)).await.expect("session kept");
    assert_eq!(session.lookup, LookupState::Idle);
    assert!(session.admin.is_none());
    assert!(platform.last_text().starts_with("❌ Something went wrong"));
}

#[tokio::test]
async fn failed_callback_is_still_answered() {
    let (ctx, platform) = context(&[]).await;
    ctx.storage.close().await;

    handle_update(&ctx, &callback_update(5, "lk:verify")).await;

    assert_eq!(platform.answers(), vec![(None, false)]);
    assert!(platform.last_text().starts_with("❌ Something went wrong"));
}

#[tokio::test]
async fn failure_notice_is_truncated() {
    let text = texts::generic_failure(&"database is on fire ".repeat(20));
    assert!(text.chars().count() <= "❌ Something went wrong: ".chars().count() + 100);
}

#[tokio::test]
async fn blocked_users_are_ignored() {
    let (ctx, platform) = context(&[]).await;
    handle_update(&ctx, &text_update(4, "/start")).await;
    ctx.storage
        .set_user_blocked(UserId(4), true)
        .await
        .expect("block user");
    platform.take();

    handle_update(&ctx, &text_update(4, "/start")).await;
    handle_update(&ctx, &callback_update(4, "lk:verify")).await;

    assert_eq!(
        platform.sent(),
        vec![Sent::Answer {
            callback_id: "cb-4".into(),
            text: None,
            show_alert: false,
        }]
    );
}

#[tokio::test]
async fn rate_limit_warns_once_and_spares_admins() {
    let (ctx, platform) = context(&[1]).await;
    let ctx = BotContext {
        settings: Arc::new(FlowSettings {
            rate_limit_per_minute: 2,
            ..(*ctx.settings).clone()
        }),
        ..ctx
    };

    for _ in 0..5 {
        handle_update(&ctx, &text_update(2, "hello")).await;
    }
    let notices = platform
        .texts()
        .iter()
        .filter(|t| t.as_str() == texts::RATE_LIMITED)
        .count();
    assert_eq!(notices, 1);

    platform.take();
    for _ in 0..5 {
        handle_update(&ctx, &text_update(1, "/help")).await;
    }
    assert_eq!(platform.texts().len(), 5);
}

#[tokio::test]
async fn unknown_payloads_and_noop_are_acknowledged() {
    let (ctx, platform) = context(&[]).await;

    handle_update(&ctx, &callback_update(6, "legacy_button")).await;
    handle_update(&ctx, &callback_update(6, "noop")).await;

    assert_eq!(
        platform.answers(),
        vec![
            (Some(texts::BUTTON_EXPIRED.to_string()), false),
            (None, false)
        ]
    );
}

#[tokio::test]
async fn every_sender_is_recorded() {
    let (ctx, _platform) = context(&[]).await;
    handle_update(&ctx, &text_update(8, "hi")).await;

    let user = ctx
        .storage
        .user(UserId(8))
        .await
        .expect("query user")
        .expect("user stored");
    assert_eq!(user.profile.first_name.as_deref(), Some("User8"));
}
