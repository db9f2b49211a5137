//! User-facing message templates. All output is HTML; user data is escaped.

use shared::domain::{CatalogStats, ChatId, TitleCode, UserId, UserProfile};
use storage::{
    backup::FullBackup, StoredChannel, StoredGroup, StoredTitle, TitleViews,
};

use crate::{
    broadcast::{Audience, BroadcastPayload, BroadcastReport},
    pagination::Page,
};

const CAPTION_LIMIT: usize = 1024;
const ERROR_DETAIL_LIMIT: usize = 100;
const SNIPPET_LIMIT: usize = 60;

pub const ENTER_CODE: &str = "📝 Send a title code (for example: 12, 45, 100).";
pub const INVALID_CODE: &str = "❌ The code must contain digits only.";
pub const SUBSCRIBE_FIRST: &str =
    "📢 Join the channels above first, then press «✅ Check».";
pub const NOT_SUBSCRIBED_ALERT: &str = "You have not joined every channel yet.";
pub const SUBSCRIPTION_OK: &str = "✅ Subscription confirmed!";
pub const NO_PARTS: &str = "This title has no parts yet.";
pub const PART_NOT_FOUND: &str = "Part not found.";
pub const RATE_LIMITED: &str = "⏳ Too many requests. Please wait a minute.";
pub const UNKNOWN_COMMAND: &str = "🤔 Unknown command. See /help.";
pub const SEARCH_USAGE: &str = "🔎 Usage: /search &lt;text&gt;";
pub const CANCELLED: &str = "✖️ Cancelled.";
pub const ADMIN_ONLY: &str = "❌ You are not an admin!";
pub const BUTTON_EXPIRED: &str = "This button has expired. Open /admin again.";
pub const USE_BUTTONS: &str = "👆 Please use the buttons above.";

pub const ADMIN_MENU: &str = "🛠 <b>Admin panel</b>\n\nChoose an action:";
pub const ASK_DESCRIPTION: &str =
    "📝 Send the title description, or a photo with the description as its caption.";
pub const ASK_NEW_CODE: &str = "🔢 Send a unique numeric code for this title (1-999999).";
pub const INVALID_NEW_CODE: &str = "❌ Send a whole number between 1 and 999999.";
pub const CHOOSE_GROUPS: &str = "📣 Select the groups to link, then press «Done».";
pub const MEDIA_EXPECTED: &str = "❌ Send a video or a file.";
pub const TEXT_EXPECTED: &str = "❌ Send the text as a plain message.";
pub const PHOTO_EXPECTED: &str = "❌ Send a photo.";
pub const ASK_DELETE_CODE: &str = "🗑 Send the code of the title to delete.";
pub const ASK_EDIT_CODE: &str = "✏️ Send the code of the title to edit.";
pub const ASK_COVER: &str = "🖼 Send the new cover photo.";
pub const DESCRIPTION_UPDATED: &str = "✅ Description updated.";
pub const COVER_UPDATED: &str = "✅ Cover updated.";
pub const EDIT_DONE: &str = "✅ Done.";
pub const ASK_GROUP_ID: &str = "👥 Send the group chat id (for example -1001234567890).";
pub const INVALID_CHAT_ID: &str = "❌ The id must be a whole number such as -1001234567890.";
pub const ASK_LINK: &str = "🔗 Send the invite link (https://...).";
pub const INVALID_LINK: &str = "❌ Send a valid http(s) link.";
pub const ASK_NAME: &str = "🏷 Send the display name.";
pub const NO_GROUPS: &str = "📭 No groups yet.";
pub const CHOOSE_GROUP_TO_DELETE: &str = "🗑 Choose a group to delete:";
pub const ASK_CHANNEL_REF: &str = "📢 Send the channel id (-100...) or its @username.";
pub const INVALID_CHANNEL_REF: &str = "❌ Send a numeric id or an @username.";
pub const NO_CHANNELS: &str = "📭 No mandatory channels yet.";
pub const CHOOSE_CHANNEL_TO_DELETE: &str = "🗑 Choose a mandatory channel to delete:";
pub const CHOOSE_AUDIENCE: &str = "📨 Who should receive the broadcast?";
pub const CHOOSE_AUDIENCE_GROUP: &str = "👥 Choose the group:";
pub const ASK_BROADCAST_MESSAGE: &str = "✍️ Send the message to broadcast (text, photo or video).";
pub const BROADCAST_CANCELLED: &str = "✖️ Broadcast cancelled.";
pub const PANEL_CLOSED: &str = "🛠 Admin panel closed.";
pub const BLOCK_USAGE: &str = "Usage: /block &lt;user id&gt; or /unblock &lt;user id&gt;";
pub const NO_VIEWS: &str = "📭 Nothing has been viewed yet.";

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Cuts `raw` to at most `limit` characters, marking the cut with an ellipsis.
pub fn truncate(raw: &str, limit: usize) -> String {
    if raw.chars().count() <= limit {
        return raw.to_string();
    }
    let mut cut: String = raw.chars().take(limit.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

pub fn generic_failure(detail: &str) -> String {
    format!(
        "❌ Something went wrong: {}",
        escape_html(&truncate(detail, ERROR_DETAIL_LIMIT))
    )
}

fn channel_lines(channels: &[StoredChannel]) -> String {
    channels
        .iter()
        .map(|c| format!("• {}", escape_html(&c.name)))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn welcome_ready(user: &UserProfile) -> String {
    format!(
        "👋 Hello, {}! Welcome to the catalog bot.\n\n{ENTER_CODE}",
        escape_html(&user.display_name())
    )
}

pub fn welcome_subscribe(user: &UserProfile, missing: &[StoredChannel]) -> String {
    format!(
        "👋 Hello, {}! Welcome to the catalog bot.\n\n📢 To continue, join these channels:\n{}\n\nThen press «✅ Check».",
        escape_html(&user.display_name()),
        channel_lines(missing)
    )
}

pub fn subscription_missing(missing: &[StoredChannel]) -> String {
    format!(
        "❌ You have not joined these channels yet:\n{}\n\nJoin them and press «🔄 Check again».",
        channel_lines(missing)
    )
}

pub fn subscription_required(missing: &[StoredChannel]) -> String {
    format!(
        "📢 Before viewing titles, join these channels:\n{}\n\nThen press «✅ Check».",
        channel_lines(missing)
    )
}

pub fn subscription_ok_enter_code() -> String {
    format!("{SUBSCRIPTION_OK}\n\n{ENTER_CODE}")
}

pub fn title_not_found(code: TitleCode) -> String {
    format!("❌ No title found for code {code}.")
}

pub fn title_card(title: &StoredTitle, part_count: usize) -> String {
    let header = format!("🎬 <b>Code {}</b>\n\n", title.code);
    let footer = format!("\n\n📦 Parts: {part_count}");
    let room = CAPTION_LIMIT.saturating_sub(header.chars().count() + footer.chars().count());
    format!(
        "{header}{}{footer}",
        escape_html(&truncate(&title.description, room / 2))
    )
}

pub fn parts_page(code: TitleCode, page: &Page, total: usize) -> String {
    format!(
        "🎬 <b>Code {code}</b>: choose a part\n📄 Page {}/{} · parts {}-{} of {total}",
        page.page,
        page.total_pages,
        page.start + 1,
        page.end
    )
}

pub fn part_caption(code: TitleCode, number: u32) -> String {
    format!("🎬 Code {code} · part {number}")
}

pub fn help(is_admin: bool) -> String {
    let mut text = String::from(
        "ℹ️ <b>How to use the bot</b>\n\n\
         /start - check subscriptions and begin\n\
         /search &lt;text&gt; - find titles by description\n\
         /cancel - abort the current step\n\n\
         Send a numeric code at any time to open a title.",
    );
    if is_admin {
        text.push_str(
            "\n\n🛠 <b>Admin</b>\n\
             /admin - open the admin panel\n\
             /stats - catalog statistics\n\
             /top - most viewed titles\n\
             /groups - linked groups\n\
             /broadcast - send a message to users or groups\n\
             /backup - write a full backup\n\
             /block &lt;id&gt;, /unblock &lt;id&gt; - manage users",
        );
    }
    text
}

pub fn search_results(query: &str, titles: &[StoredTitle]) -> String {
    if titles.is_empty() {
        return format!("🔎 Nothing matches «{}».", escape_html(query));
    }
    let lines = titles
        .iter()
        .map(|t| {
            format!(
                "<code>{}</code> {}",
                t.code,
                escape_html(&truncate(&t.description, SNIPPET_LIMIT))
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "🔎 Results for «{}»:\n\n{lines}\n\nSend a code to open the title.",
        escape_html(query)
    )
}

pub fn ask_part(number: usize) -> String {
    format!("🎞 Send the video (or file) for part {number}.")
}

pub fn part_saved(number: usize) -> String {
    format!("✅ Part {number} saved. Add another part?")
}

pub fn code_taken(code: TitleCode) -> String {
    format!("❌ Code {code} is already used. Send another code.")
}

pub fn title_created(
    code: TitleCode,
    parts: usize,
    groups: usize,
    announced: Option<BroadcastReport>,
) -> String {
    let mut text = format!(
        "✅ Title saved!\n\n🔢 Code: <code>{code}</code>\n📦 Parts: {parts}\n👥 Groups: {groups}"
    );
    if let Some(report) = announced {
        text.push_str(&format!(
            "\n📣 Announced: {} sent, {} failed",
            report.sent, report.failed
        ));
    }
    text
}

pub fn announcement(title: &StoredTitle) -> String {
    format!(
        "🆕 <b>New title</b>\n\n{}\n\n🔢 Code: <code>{}</code>",
        escape_html(&truncate(&title.description, CAPTION_LIMIT / 2)),
        title.code
    )
}

pub fn title_deleted(code: TitleCode) -> String {
    format!("✅ Title {code} and its parts were deleted.")
}

pub fn edit_menu(title: &StoredTitle, part_count: usize) -> String {
    format!(
        "✏️ <b>Editing code {}</b>\n\n{}\n\n📦 Parts: {part_count}",
        title.code,
        escape_html(&truncate(&title.description, SNIPPET_LIMIT * 4))
    )
}

pub fn ask_delete_part(part_count: usize) -> String {
    format!("🗑 Send the part number to delete (1-{part_count}).")
}

pub fn invalid_part_number(part_count: usize) -> String {
    format!("❌ Send a number between 1 and {part_count}.")
}

pub fn part_deleted(number: u32) -> String {
    format!("✅ Part {number} deleted; later parts moved up.")
}

pub fn part_appended(number: u32) -> String {
    format!("✅ Part {number} added. Update the description too?")
}

pub fn ask_new_description(current: &str) -> String {
    format!(
        "📝 Current description:\n\n{}\n\nSend the new description.",
        escape_html(current)
    )
}

pub fn group_exists(chat_id: ChatId) -> String {
    format!("⚠️ Group {chat_id} already exists.")
}

pub fn group_created(name: &str) -> String {
    format!("✅ Group «{}» added.", escape_html(name))
}

pub fn groups_list(groups: &[StoredGroup]) -> String {
    if groups.is_empty() {
        return NO_GROUPS.to_string();
    }
    let lines = groups
        .iter()
        .map(|g| {
            let link = g.link.as_deref().map(escape_html).unwrap_or_default();
            format!(
                "• <b>{}</b> (<code>{}</code>) {link}",
                escape_html(&g.name),
                g.chat_id
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("👥 <b>Groups</b> ({})\n\n{lines}", groups.len())
}

pub fn channel_saved(name: &str) -> String {
    format!("✅ Mandatory channel «{}» saved.", escape_html(name))
}

pub fn deleted_alert(name: &str) -> String {
    format!("Deleted {name}")
}

pub fn audience_label(audience: Audience, group: Option<&StoredGroup>) -> String {
    match (audience, group) {
        (Audience::AllUsers, _) => "all users".to_string(),
        (Audience::AllGroups, _) => "all groups".to_string(),
        (Audience::Group(_), Some(group)) => format!("group «{}»", escape_html(&group.name)),
        (Audience::Group(id), None) => format!("group #{id}"),
    }
}

pub fn broadcast_preview(label: &str, recipients: usize, payload: &BroadcastPayload) -> String {
    let kind = match payload {
        BroadcastPayload::Text(_) => "text",
        BroadcastPayload::Photo { .. } => "photo",
        BroadcastPayload::Video { .. } => "video",
    };
    format!("📨 Send this {kind} to {label} ({recipients} recipients)?")
}

pub fn broadcast_started(recipients: usize) -> String {
    format!("⏳ Broadcasting to {recipients} recipients...")
}

pub fn broadcast_finished(report: BroadcastReport) -> String {
    format!(
        "✅ Broadcast finished.\n\n📤 Sent: {}\n⚠️ Failed: {}",
        report.sent, report.failed
    )
}

pub fn stats(stats: &CatalogStats) -> String {
    format!(
        "📊 <b>Statistics</b>\n\n\
         👤 Users: {}\n\
         🟢 Active in 7 days: {}\n\
         🎬 Titles: {}\n\
         🎞 Parts: {}\n\
         👥 Groups: {}\n\
         📢 Mandatory channels: {}",
        stats.users,
        stats.active_users_7d,
        stats.titles,
        stats.parts,
        stats.groups,
        stats.mandatory_channels
    )
}

pub fn top_titles(views: &[TitleViews]) -> String {
    if views.is_empty() {
        return NO_VIEWS.to_string();
    }
    let lines = views
        .iter()
        .enumerate()
        .map(|(index, v)| {
            format!(
                "{}. <code>{}</code> {} ({} views)",
                index + 1,
                v.code,
                escape_html(&truncate(&v.description, SNIPPET_LIMIT)),
                v.views
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("🔥 <b>Most viewed</b>\n\n{lines}")
}

pub fn backup_written(backup: &FullBackup) -> String {
    format!(
        "💾 Backup written:\n<code>{}</code>\n<code>{}</code>",
        escape_html(&backup.database.display().to_string()),
        escape_html(&backup.json.display().to_string())
    )
}

pub fn user_block_changed(user_id: UserId, blocked: bool) -> String {
    if blocked {
        format!("🚫 User {user_id} blocked.")
    } else {
        format!("✅ User {user_id} unblocked.")
    }
}

pub fn user_not_found(user_id: UserId) -> String {
    format!("❌ User {user_id} has never used the bot.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(
            escape_html("<b>Tom & \"Jerry\"</b>"),
            "&lt;b&gt;Tom &amp; &quot;Jerry&quot;&lt;/b&gt;"
        );
    }

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ёёёёё", 3), "ёё…");
    }

    #[test]
    fn failure_detail_is_bounded() {
        let text = generic_failure(&"x".repeat(500));
        assert!(text.chars().count() < 140);
        assert!(text.ends_with('…'));
    }
}
