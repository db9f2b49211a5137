//! Inline keyboards for both flows.

use shared::{
    domain::{GroupId, TitleCode},
    protocol::{
        AdminAction, AudienceChoice, CallbackAction, EditChoice, LookupAction, MenuChoice,
    },
};
use storage::{StoredChannel, StoredGroup, StoredPart};
use telegram::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::pagination::{Page, PARTS_PER_ROW};

fn lookup(text: impl Into<String>, action: LookupAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text, CallbackAction::Lookup(action))
}

fn admin(text: impl Into<String>, action: AdminAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text, CallbackAction::Admin(action))
}

/// One join button per channel with a link, followed by the verify button.
pub fn subscription(missing: &[StoredChannel], verify_label: &str) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = missing
        .iter()
        .filter_map(|channel| {
            channel
                .link
                .as_ref()
                .map(|link| vec![InlineKeyboardButton::link(format!("📢 {}", channel.name), link)])
        })
        .collect();
    rows.push(vec![lookup(verify_label, LookupAction::Verify)]);
    InlineKeyboardMarkup::new(rows)
}

pub fn view_parts(code: TitleCode) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::single_column(vec![lookup(
        "📺 View parts",
        LookupAction::View { code },
    )])
}

pub fn parts_grid(code: TitleCode, parts: &[StoredPart], page: &Page) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = parts[page.start..page.end]
        .chunks(PARTS_PER_ROW)
        .map(|chunk| {
            chunk
                .iter()
                .map(|part| {
                    lookup(
                        part.number.to_string(),
                        LookupAction::Part {
                            code,
                            number: part.number,
                        },
                    )
                })
                .collect()
        })
        .collect();

    if page.total_pages > 1 {
        let mut nav = Vec::with_capacity(3);
        if page.has_prev {
            nav.push(lookup(
                "⬅️",
                LookupAction::Page {
                    code,
                    page: page.page - 1,
                },
            ));
        }
        nav.push(InlineKeyboardButton::callback(
            format!("{}/{}", page.page, page.total_pages),
            CallbackAction::Noop,
        ));
        if page.has_next {
            nav.push(lookup(
                "➡️",
                LookupAction::Page {
                    code,
                    page: page.page + 1,
                },
            ));
        }
        rows.push(nav);
    }
    InlineKeyboardMarkup::new(rows)
}

pub fn admin_menu() -> InlineKeyboardMarkup {
    let menu = |text: &str, choice| admin(text, AdminAction::Menu(choice));
    InlineKeyboardMarkup::new(vec![
        vec![
            menu("➕ Add title", MenuChoice::AddTitle),
            menu("✏️ Edit title", MenuChoice::EditTitle),
        ],
        vec![menu("🗑 Delete title", MenuChoice::DeleteTitle)],
        vec![
            menu("👥 Add group", MenuChoice::AddGroup),
            menu("📋 Groups", MenuChoice::ListGroups),
        ],
        vec![menu("🗑 Delete group", MenuChoice::DeleteGroup)],
        vec![
            menu("📢 Add channel", MenuChoice::AddChannel),
            menu("🗑 Delete channel", MenuChoice::DeleteChannel),
        ],
        vec![
            menu("📨 Broadcast", MenuChoice::Broadcast),
            menu("📊 Stats", MenuChoice::Stats),
        ],
        vec![menu("✖️ Close", MenuChoice::Close)],
    ])
}

pub fn back() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::single_column(vec![admin("⬅️ Back to menu", AdminAction::Back)])
}

pub fn more_parts() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        admin("➕ Add another part", AdminAction::MoreParts(true)),
        admin("✅ That's all", AdminAction::MoreParts(false)),
    ]])
}

pub fn edit_description_after_part() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        admin("📝 Yes", AdminAction::EditDescriptionAfterPart(true)),
        admin("✅ No", AdminAction::EditDescriptionAfterPart(false)),
    ]])
}

pub fn group_picker(groups: &[StoredGroup], selected: &[GroupId]) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = groups
        .iter()
        .map(|group| {
            let mark = if selected.contains(&group.id) { "✅" } else { "⬜" };
            vec![admin(
                format!("{mark} {}", group.name),
                AdminAction::ToggleGroup(group.id),
            )]
        })
        .collect();
    rows.push(vec![admin("💾 Done", AdminAction::GroupsDone)]);
    InlineKeyboardMarkup::new(rows)
}

pub fn edit_menu() -> InlineKeyboardMarkup {
    let edit = |text: &str, choice| admin(text, AdminAction::Edit(choice));
    InlineKeyboardMarkup::new(vec![
        vec![
            edit("➕ Add part", EditChoice::AddPart),
            edit("➖ Delete part", EditChoice::DeletePart),
        ],
        vec![
            edit("📝 Description", EditChoice::Description),
            edit("🖼 Cover", EditChoice::Cover),
        ],
        vec![edit("🗑 Delete title", EditChoice::DeleteTitle)],
        vec![admin("⬅️ Back to menu", AdminAction::Back)],
    ])
}

pub fn delete_groups(groups: &[StoredGroup]) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = groups
        .iter()
        .map(|group| {
            vec![admin(
                format!("🗑 {} ({})", group.name, group.chat_id),
                AdminAction::DeleteGroup(group.id),
            )]
        })
        .collect();
    rows.push(vec![admin("⬅️ Back to menu", AdminAction::Back)]);
    InlineKeyboardMarkup::new(rows)
}

pub fn delete_channels(channels: &[StoredChannel]) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = channels
        .iter()
        .map(|channel| {
            vec![admin(
                format!("🗑 {} ({})", channel.name, channel.chat_ref),
                AdminAction::DeleteChannel(channel.id),
            )]
        })
        .collect();
    rows.push(vec![admin("⬅️ Back to menu", AdminAction::Back)]);
    InlineKeyboardMarkup::new(rows)
}

pub fn audience() -> InlineKeyboardMarkup {
    let choice = |text: &str, choice| admin(text, AdminAction::Audience(choice));
    InlineKeyboardMarkup::new(vec![
        vec![choice("👤 All users", AudienceChoice::AllUsers)],
        vec![choice("👥 All groups", AudienceChoice::AllGroups)],
        vec![choice("🎯 One group", AudienceChoice::OneGroup)],
        vec![admin("⬅️ Back to menu", AdminAction::Back)],
    ])
}

pub fn audience_groups(groups: &[StoredGroup]) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = groups
        .iter()
        .map(|group| vec![admin(group.name.clone(), AdminAction::AudienceGroup(group.id))])
        .collect();
    rows.push(vec![admin("⬅️ Back to menu", AdminAction::Back)]);
    InlineKeyboardMarkup::new(rows)
}

pub fn confirm_broadcast() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        admin("✅ Send", AdminAction::ConfirmBroadcast(true)),
        admin("✖️ Cancel", AdminAction::ConfirmBroadcast(false)),
    ]])
}
