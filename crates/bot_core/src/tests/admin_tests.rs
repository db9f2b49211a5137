use shared::domain::{ChatId, GroupId, MediaKind, TitleCode, UserId};
use storage::{NewPart, NewTitle};

use super::valid_link;
use crate::{
    broadcast::Audience,
    handle_update,
    state::AdminState,
    test_support::{
        callback_update, context, document_update, photo_update, text_update, video_update, Sent,
    },
    texts, BotContext,
};

const ADMIN: i64 = 1;

async fn admin_state(ctx: &BotContext) -> Option<AdminState> {
    ctx.sessions
        .get(UserId(ADMIN))
        .await
        .expect("session exists")
        .admin
}

async fn say(ctx: &BotContext, text: &str) {
    handle_update(ctx, &text_update(ADMIN, text)).await;
}

async fn press(ctx: &BotContext, data: &str) {
    handle_update(ctx, &callback_update(ADMIN, data)).await;
}

async fn seed_title(ctx: &BotContext, code: i64, parts: u32) {
    let title = NewTitle {
        code: TitleCode(code),
        description: format!("Title {code}"),
        cover_file_id: None,
        parts: (1..=parts)
            .map(|number| NewPart {
                number,
                file_id: format!("p{number}"),
                kind: MediaKind::Video,
            })
            .collect(),
        group_ids: Vec::new(),
    };
    ctx.storage.create_title(&title).await.expect("seed title");
}

#[tokio::test]
async fn non_admins_never_enter_admin_states() {
    let (ctx, platform) = context(&[ADMIN]).await;

    handle_update(&ctx, &text_update(2, "/admin")).await;
    assert_eq!(platform.last_text(), texts::ADMIN_ONLY);

    handle_update(&ctx, &callback_update(2, "adm:menu:add_title")).await;
    assert_eq!(
        platform.answers().last(),
        Some(&(Some(texts::ADMIN_ONLY.to_string()), true))
    );

    let session = ctx.sessions.get(UserId(2)).await.expect("session exists");
    assert!(session.admin.is_none());
}

#[tokio::test]
async fn add_title_with_parts_and_groups() {
    let (ctx, platform) = context(&[ADMIN]).await;
    let fans = ctx
        .storage
        .create_group(ChatId(-1001), Some("https://t.me/+fans"), "Fans")
        .await
        .expect("group");
    ctx.storage
        .create_group(ChatId(-1002), None, "Other")
        .await
        .expect("group");

    say(&ctx, "/admin").await;
    assert_eq!(admin_state(&ctx).await, Some(AdminState::Menu));

    press(&ctx, "adm:menu:add_title").await;
    assert_eq!(admin_state(&ctx).await, Some(AdminState::TitleDescription));

    handle_update(&ctx, &photo_update(ADMIN, "cover-1", Some("A <great> show"))).await;
    assert!(matches!(admin_state(&ctx).await, Some(AdminState::TitlePart(_))));

    handle_update(&ctx, &text_update(ADMIN, "not a video")).await;
    assert_eq!(platform.last_text(), texts::MEDIA_EXPECTED);

    handle_update(&ctx, &video_update(ADMIN, "video-1")).await;
    assert!(matches!(
        admin_state(&ctx).await,
        Some(AdminState::TitleMoreParts(_))
    ));
    press(&ctx, "adm:more:yes").await;
    handle_update(&ctx, &document_update(ADMIN, "doc-2")).await;
    press(&ctx, "adm:more:no").await;
    assert!(matches!(admin_state(&ctx).await, Some(AdminState::TitleCode(_))));

    for bad in ["abc", "0", "1000000"] {
        say(&ctx, bad).await;
        assert_eq!(platform.last_text(), texts::INVALID_NEW_CODE);
    }
    assert!(matches!(admin_state(&ctx).await, Some(AdminState::TitleCode(_))));

    say(&ctx, "55").await;
    assert!(matches!(
        admin_state(&ctx).await,
        Some(AdminState::TitleGroups { code: TitleCode(55), .. })
    ));

    press(&ctx, &format!("adm:grp:{fans}")).await;
    match admin_state(&ctx).await {
        Some(AdminState::TitleGroups { selected, .. }) => assert_eq!(selected, vec![fans]),
        other => panic!("unexpected state {other:?}"),
    }
    press(&ctx, "adm:grp_done").await;

    assert!(admin_state(&ctx).await.is_none());
    assert!(platform.last_text().contains("Title saved"));

    let title = ctx
        .storage
        .title_by_code(TitleCode(55))
        .await
        .expect("query")
        .expect("title stored");
    assert_eq!(title.description, "A <great> show");
    assert_eq!(title.cover_file_id.as_deref(), Some("cover-1"));

    let parts = ctx.storage.list_parts(TitleCode(55)).await.expect("parts");
    let stored: Vec<(u32, &str, MediaKind)> = parts
        .iter()
        .map(|p| (p.number, p.file_id.as_str(), p.kind))
        .collect();
    assert_eq!(
        stored,
        vec![
            (1, "video-1", MediaKind::Video),
            (2, "doc-2", MediaKind::Document)
        ]
    );

    let linked = ctx.storage.title_groups(TitleCode(55)).await.expect("links");
    assert_eq!(linked.len(), 1);
    assert_eq!(linked[0].id, fans);

    let announced = platform.sent().into_iter().any(|s| {
        matches!(s, Sent::Photo { chat_id: ChatId(-1001), ref file_id, .. } if file_id == "cover-1")
    });
    assert!(announced);
}

#[tokio::test]
async fn taken_code_reprompts_and_no_groups_commits_directly() {
    let (ctx, platform) = context(&[ADMIN]).await;
    seed_title(&ctx, 12, 1).await;

    say(&ctx, "/admin").await;
    press(&ctx, "adm:menu:add_title").await;
    say(&ctx, "Plain description").await;
    handle_update(&ctx, &video_update(ADMIN, "v")).await;
    press(&ctx, "adm:more:no").await;

    say(&ctx, "12").await;
    assert_eq!(platform.last_text(), texts::code_taken(TitleCode(12)));
    assert!(matches!(admin_state(&ctx).await, Some(AdminState::TitleCode(_))));

    say(&ctx, "13").await;
    assert!(admin_state(&ctx).await.is_none());
    assert!(ctx
        .storage
        .title_exists(TitleCode(13))
        .await
        .expect("query"));
}

#[tokio::test]
async fn edit_title_delete_part_renumbers() {
    let (ctx, platform) = context(&[ADMIN]).await;
    seed_title(&ctx, 9, 4).await;

    say(&ctx, "/admin").await;
    press(&ctx, "adm:menu:edit_title").await;
    say(&ctx, "404").await;
    assert_eq!(platform.last_text(), texts::title_not_found(TitleCode(404)));
    say(&ctx, "9").await;
    assert_eq!(
        admin_state(&ctx).await,
        Some(AdminState::EditTitleMenu { code: TitleCode(9) })
    );

    press(&ctx, "adm:edit:delete_part").await;
    assert_eq!(
        admin_state(&ctx).await,
        Some(AdminState::EditDeletePart {
            code: TitleCode(9),
            part_count: 4
        })
    );
    say(&ctx, "7").await;
    assert_eq!(platform.last_text(), texts::invalid_part_number(4));

    say(&ctx, "2").await;
    assert!(admin_state(&ctx).await.is_none());

    let parts = ctx.storage.list_parts(TitleCode(9)).await.expect("parts");
    let layout: Vec<(u32, String)> = parts.into_iter().map(|p| (p.number, p.file_id)).collect();
    assert_eq!(
        layout,
        vec![
            (1, "p1".to_string()),
            (2, "p3".to_string()),
            (3, "p4".to_string())
        ]
    );
}

#[tokio::test]
async fn delete_part_reprompts_when_parts_changed_meanwhile() {
    let (ctx, platform) = context(&[ADMIN]).await;
    seed_title(&ctx, 9, 3).await;

    say(&ctx, "/admin").await;
    press(&ctx, "adm:menu:edit_title").await;
    say(&ctx, "9").await;
    press(&ctx, "adm:edit:delete_part").await;

    ctx.storage
        .delete_part(TitleCode(9), 1)
        .await
        .expect("concurrent delete");
    say(&ctx, "3").await;
    assert_eq!(platform.last_text(), texts::invalid_part_number(2));
    assert_eq!(
        admin_state(&ctx).await,
        Some(AdminState::EditDeletePart {
            code: TitleCode(9),
            part_count: 2
        })
    );

    for number in [2, 1] {
        ctx.storage
            .delete_part(TitleCode(9), number)
            .await
            .expect("concurrent delete");
    }
    say(&ctx, "2").await;
    assert_eq!(platform.last_text(), texts::NO_PARTS);
    assert!(admin_state(&ctx).await.is_none());
    assert!(ctx.storage.title_exists(TitleCode(9)).await.expect("query"));
}

#[tokio::test]
async fn edit_title_append_part_then_description_and_cover() {
    let (ctx, _platform) = context(&[ADMIN]).await;
    seed_title(&ctx, 4, 1).await;

    say(&ctx, "/admin").await;
    press(&ctx, "adm:menu:edit_title").await;
    say(&ctx, "4").await;
    press(&ctx, "adm:edit:add_part").await;
    handle_update(&ctx, &video_update(ADMIN, "p2")).await;
    assert_eq!(
        admin_state(&ctx).await,
        Some(AdminState::EditAfterAppend { code: TitleCode(4) })
    );
    press(&ctx, "adm:edit_desc:yes").await;
    say(&ctx, "Fresh description").await;
    assert!(admin_state(&ctx).await.is_none());

    press(&ctx, "adm:menu:edit_title").await;
    say(&ctx, "4").await;
    press(&ctx, "adm:edit:cover").await;
    say(&ctx, "not a photo").await;
    handle_update(&ctx, &photo_update(ADMIN, "new-cover", None)).await;

    let title = ctx
        .storage
        .title_by_code(TitleCode(4))
        .await
        .expect("query")
        .expect("title");
    assert_eq!(title.description, "Fresh description");
    assert_eq!(title.cover_file_id.as_deref(), Some("new-cover"));
    let numbers: Vec<u32> = ctx
        .storage
        .list_parts(TitleCode(4))
        .await
        .expect("parts")
        .iter()
        .map(|p| p.number)
        .collect();
    assert_eq!(numbers, vec![1, 2]);
}

#[tokio::test]
async fn delete_title_by_code() {
    let (ctx, platform) = context(&[ADMIN]).await;
    seed_title(&ctx, 30, 2).await;

    say(&ctx, "/admin").await;
    press(&ctx, "adm:menu:delete_title").await;
    say(&ctx, "31").await;
    assert_eq!(admin_state(&ctx).await, Some(AdminState::DeleteTitleCode));
    say(&ctx, "30").await;

    assert_eq!(platform.last_text(), texts::title_deleted(TitleCode(30)));
    assert!(!ctx.storage.title_exists(TitleCode(30)).await.expect("query"));
    assert_eq!(ctx.storage.count_parts().await.expect("count"), 0);
}

#[tokio::test]
async fn add_group_validates_and_reports_duplicates() {
    let (ctx, platform) = context(&[ADMIN]).await;

    say(&ctx, "/admin").await;
    press(&ctx, "adm:menu:add_group").await;
    say(&ctx, "fans").await;
    assert_eq!(platform.last_text(), texts::INVALID_CHAT_ID);
    say(&ctx, "-100123").await;
    say(&ctx, "ftp://example.org/join").await;
    assert_eq!(platform.last_text(), texts::INVALID_LINK);
    say(&ctx, "https://t.me/+abc").await;
    say(&ctx, "Fans").await;
    assert!(admin_state(&ctx).await.is_none());

    let group = ctx
        .storage
        .group_by_chat(ChatId(-100123))
        .await
        .expect("query")
        .expect("group stored");
    assert_eq!(group.link.as_deref(), Some("https://t.me/+abc"));
    assert_eq!(group.name, "Fans");

    press(&ctx, "adm:menu:add_group").await;
    say(&ctx, "-100123").await;
    assert_eq!(platform.last_text(), texts::group_exists(ChatId(-100123)));
    assert!(admin_state(&ctx).await.is_none());
}

#[tokio::test]
async fn groups_and_channels_are_removed_from_pickers() {
    let (ctx, platform) = context(&[ADMIN]).await;
    let group = ctx
        .storage
        .create_group(ChatId(-5), None, "Five")
        .await
        .expect("group");

    say(&ctx, "/admin").await;
    press(&ctx, "adm:menu:add_channel").await;
    say(&ctx, "news channel").await;
    assert_eq!(platform.last_text(), texts::INVALID_CHANNEL_REF);
    say(&ctx, "@news").await;
    say(&ctx, "https://t.me/news").await;
    say(&ctx, "News").await;
    let channels = ctx.storage.list_mandatory_channels().await.expect("channels");
    assert_eq!(channels.len(), 1);
    assert_eq!(channels[0].chat_ref, "@news");

    press(&ctx, "adm:menu:delete_channel").await;
    assert_eq!(admin_state(&ctx).await, Some(AdminState::DeleteChannelPick));
    press(&ctx, &format!("adm:delch:{}", channels[0].id)).await;
    assert!(ctx
        .storage
        .list_mandatory_channels()
        .await
        .expect("channels")
        .is_empty());
    assert_eq!(platform.last_text(), texts::NO_CHANNELS);

    press(&ctx, "adm:menu:delete_group").await;
    assert_eq!(admin_state(&ctx).await, Some(AdminState::DeleteGroupPick));
    press(&ctx, &format!("adm:delgrp:{group}")).await;
    assert!(ctx.storage.group(group).await.expect("query").is_none());
    assert_eq!(admin_state(&ctx).await, Some(AdminState::Menu));

    press(&ctx, &format!("adm:delgrp:{group}")).await;
    assert_eq!(
        platform.answers().last(),
        Some(&(Some(texts::BUTTON_EXPIRED.to_string()), false))
    );
}

#[tokio::test]
async fn broadcast_to_all_users_reports_failures() {
    let (ctx, platform) = context(&[ADMIN]).await;
    for user in [2, 3, 4] {
        handle_update(&ctx, &text_update(user, "/help")).await;
    }
    platform.fail_sends_to(3);

    say(&ctx, "/broadcast").await;
    assert_eq!(admin_state(&ctx).await, Some(AdminState::BroadcastAudience));
    press(&ctx, "adm:aud:users").await;
    assert_eq!(
        admin_state(&ctx).await,
        Some(AdminState::BroadcastMessage {
            audience: Audience::AllUsers
        })
    );
    say(&ctx, "Hello <all>").await;
    assert!(platform.last_text().contains("4 recipients"));
    assert!(matches!(
        admin_state(&ctx).await,
        Some(AdminState::BroadcastConfirm { .. })
    ));

    press(&ctx, "adm:bc:yes").await;
    assert!(admin_state(&ctx).await.is_none());
    let summary = platform.last_text();
    assert!(summary.contains("Sent: 3"), "{summary}");
    assert!(summary.contains("Failed: 1"), "{summary}");

    let delivered = platform.sent().into_iter().any(|s| {
        s == Sent::Text {
            chat_id: ChatId(2),
            text: "Hello &lt;all&gt;".into(),
            keyboard: None,
        }
    });
    assert!(delivered);
}

#[tokio::test]
async fn broadcast_to_one_group_can_be_cancelled() {
    let (ctx, platform) = context(&[ADMIN]).await;
    let group = ctx
        .storage
        .create_group(ChatId(-77), None, "Seventy")
        .await
        .expect("group");

    say(&ctx, "/admin").await;
    press(&ctx, "adm:menu:broadcast").await;
    press(&ctx, "adm:aud:group").await;
    assert_eq!(admin_state(&ctx).await, Some(AdminState::BroadcastGroupPick));
    press(&ctx, &format!("adm:audgrp:{group}")).await;
    handle_update(&ctx, &video_update(ADMIN, "clip")).await;
    assert!(platform.last_text().contains("group «Seventy» (1 recipients)"));

    platform.take();
    press(&ctx, "adm:bc:no").await;
    assert!(admin_state(&ctx).await.is_none());
    assert!(!platform
        .sent()
        .iter()
        .any(|s| matches!(s, Sent::Video { chat_id: ChatId(-77), .. })));
    assert_eq!(platform.last_text(), texts::BROADCAST_CANCELLED);
}

#[tokio::test]
async fn stale_buttons_keep_the_current_step() {
    let (ctx, platform) = context(&[ADMIN]).await;

    say(&ctx, "/admin").await;
    press(&ctx, "adm:grp_done").await;

    assert_eq!(
        platform.answers().last(),
        Some(&(Some(texts::BUTTON_EXPIRED.to_string()), true))
    );
    assert_eq!(admin_state(&ctx).await, Some(AdminState::Menu));
}

#[tokio::test]
async fn menu_listing_and_close() {
    let (ctx, platform) = context(&[ADMIN]).await;
    ctx.storage
        .create_group(ChatId(-9), Some("https://t.me/+nine"), "Nine")
        .await
        .expect("group");

    say(&ctx, "/admin").await;
    press(&ctx, "adm:menu:list_groups").await;
    assert!(platform.last_text().contains("Nine"));
    press(&ctx, "adm:menu:stats").await;
    assert!(platform.last_text().contains("Groups: 1"));
    press(&ctx, "adm:menu:close").await;
    assert!(admin_state(&ctx).await.is_none());

    // With no admin step pending, digits fall through to the lookup flow.
    say(&ctx, "5").await;
    assert_eq!(platform.last_text(), texts::title_not_found(TitleCode(5)));
}

#[test]
fn only_web_links_are_accepted() {
    assert!(valid_link("https://t.me/+abc").is_some());
    assert!(valid_link(" http://example.org/x ").is_some());
    assert!(valid_link("ftp://example.org").is_none());
    assert!(valid_link("t.me/joinchat").is_none());
    assert!(valid_link("https://").is_none());
}

#[test]
fn group_ids_format_as_payloads() {
    assert_eq!(GroupId(3).to_string(), "3");
}
