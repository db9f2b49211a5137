use super::*;
use crate::test_support::MockPlatform;
use shared::domain::ChannelId;
use telegram::MemberStatus;

fn channel(id: i64, chat_ref: &str) -> StoredChannel {
    StoredChannel {
        id: ChannelId(id),
        chat_ref: chat_ref.to_string(),
        link: Some(format!("https://t.me/{}", chat_ref.trim_start_matches('@'))),
        name: format!("Channel {id}"),
    }
}

#[tokio::test]
async fn no_channels_means_satisfied() {
    let platform = MockPlatform::default();
    let missing = check_all(&platform, UserId(1), &[]).await;
    assert!(missing.is_empty());
}

#[tokio::test]
async fn lookup_errors_fail_closed() {
    let platform = MockPlatform::default();
    platform.set_member("@open", 1, MemberStatus::Member);
    platform.fail_lookups_for("@broken");

    let channels = vec![channel(1, "@broken"), channel(2, "@open")];
    let missing = check_all(&platform, UserId(1), &channels).await;

    assert_eq!(missing, vec![channel(1, "@broken")]);
}

#[tokio::test]
async fn only_member_like_statuses_count() {
    let platform = MockPlatform::default();
    platform.set_member("-1001", 7, MemberStatus::Administrator);
    platform.set_member("-1002", 7, MemberStatus::Restricted);
    platform.set_member("-1003", 7, MemberStatus::Kicked);
    platform.set_member("-1004", 7, MemberStatus::Creator);

    let channels = vec![
        channel(1, "-1001"),
        channel(2, "-1002"),
        channel(3, "-1003"),
        channel(4, "-1004"),
    ];
    let missing: Vec<ChannelId> = check_all(&platform, UserId(7), &channels)
        .await
        .into_iter()
        .map(|c| c.id)
        .collect();

    assert_eq!(missing, vec![ChannelId(2), ChannelId(3)]);
}

#[tokio::test]
async fn unusable_reference_is_unsatisfied() {
    let platform = MockPlatform::default();
    let channels = vec![channel(1, "not a chat")];
    let missing = check_all(&platform, UserId(1), &channels).await;
    assert_eq!(missing.len(), 1);
}
