//! Callback payloads attached to inline keyboard buttons.
//!
//! Payloads are short `:`-separated strings so they stay well below the
//! 64 byte limit the platform puts on callback data.

use std::{fmt, str::FromStr};

use thiserror::Error;

use crate::domain::{ChannelId, GroupId, TitleCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    Lookup(LookupAction),
    Admin(AdminAction),
    Noop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupAction {
    Verify,
    View { code: TitleCode },
    Page { code: TitleCode, page: usize },
    Part { code: TitleCode, number: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    Menu(MenuChoice),
    Back,
    MoreParts(bool),
    ToggleGroup(GroupId),
    GroupsDone,
    Edit(EditChoice),
    EditDescriptionAfterPart(bool),
    DeleteGroup(GroupId),
    DeleteChannel(ChannelId),
    Audience(AudienceChoice),
    AudienceGroup(GroupId),
    ConfirmBroadcast(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    AddTitle,
    DeleteTitle,
    EditTitle,
    AddGroup,
    ListGroups,
    DeleteGroup,
    AddChannel,
    DeleteChannel,
    Broadcast,
    Stats,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditChoice {
    AddPart,
    DeletePart,
    DeleteTitle,
    Description,
    Cover,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudienceChoice {
    AllUsers,
    AllGroups,
    OneGroup,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized callback payload '{0}'")]
pub struct UnknownPayload(pub String);

macro_rules! slug_enum {
    ($ty:ident { $($variant:ident => $slug:literal),+ $(,)? }) => {
        impl $ty {
            pub fn slug(self) -> &'static str {
                match self {
                    $(Self::$variant => $slug),+
                }
            }

            fn from_slug(slug: &str) -> Option<Self> {
                match slug {
                    $($slug => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

slug_enum!(MenuChoice {
    AddTitle => "add_title",
    DeleteTitle => "delete_title",
    EditTitle => "edit_title",
    AddGroup => "add_group",
    ListGroups => "list_groups",
    DeleteGroup => "delete_group",
    AddChannel => "add_channel",
    DeleteChannel => "delete_channel",
    Broadcast => "broadcast",
    Stats => "stats",
    Close => "close",
});

slug_enum!(EditChoice {
    AddPart => "add_part",
    DeletePart => "delete_part",
    DeleteTitle => "delete_title",
    Description => "description",
    Cover => "cover",
});

slug_enum!(AudienceChoice {
    AllUsers => "users",
    AllGroups => "groups",
    OneGroup => "group",
});

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

fn parse_yes_no(raw: &str) -> Option<bool> {
    match raw {
        "yes" => Some(true),
        "no" => Some(false),
        _ => None,
    }
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Noop => f.write_str("noop"),
            Self::Lookup(action) => match action {
                LookupAction::Verify => f.write_str("lk:verify"),
                LookupAction::View { code } => write!(f, "lk:view:{code}"),
                LookupAction::Page { code, page } => write!(f, "lk:page:{code}:{page}"),
                LookupAction::Part { code, number } => write!(f, "lk:part:{code}:{number}"),
            },
            Self::Admin(action) => match action {
                AdminAction::Menu(choice) => write!(f, "adm:menu:{}", choice.slug()),
                AdminAction::Back => f.write_str("adm:back"),
                AdminAction::MoreParts(more) => write!(f, "adm:more:{}", yes_no(*more)),
                AdminAction::ToggleGroup(id) => write!(f, "adm:grp:{id}"),
                AdminAction::GroupsDone => f.write_str("adm:grp_done"),
                AdminAction::Edit(choice) => write!(f, "adm:edit:{}", choice.slug()),
                AdminAction::EditDescriptionAfterPart(yes) => {
                    write!(f, "adm:edit_desc:{}", yes_no(*yes))
                }
                AdminAction::DeleteGroup(id) => write!(f, "adm:delgrp:{id}"),
                AdminAction::DeleteChannel(id) => write!(f, "adm:delch:{id}"),
                AdminAction::Audience(choice) => write!(f, "adm:aud:{}", choice.slug()),
                AdminAction::AudienceGroup(id) => write!(f, "adm:audgrp:{id}"),
                AdminAction::ConfirmBroadcast(yes) => write!(f, "adm:bc:{}", yes_no(*yes)),
            },
        }
    }
}

impl FromStr for CallbackAction {
    type Err = UnknownPayload;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let unknown = || UnknownPayload(raw.to_string());
        let parts: Vec<&str> = raw.split(':').collect();

        let action = match parts.as_slice() {
            ["noop"] => Some(Self::Noop),
            ["lk", rest @ ..] => parse_lookup(rest).map(Self::Lookup),
            ["adm", rest @ ..] => parse_admin(rest).map(Self::Admin),
            _ => None,
        };
        action.ok_or_else(unknown)
    }
}

fn parse_code(raw: &str) -> Option<TitleCode> {
    raw.parse::<i64>().ok().map(TitleCode)
}

fn parse_lookup(parts: &[&str]) -> Option<LookupAction> {
    match parts {
        ["verify"] => Some(LookupAction::Verify),
        ["view", code] => Some(LookupAction::View {
            code: parse_code(code)?,
        }),
        ["page", code, page] => Some(LookupAction::Page {
            code: parse_code(code)?,
            page: page.parse().ok()?,
        }),
        ["part", code, number] => Some(LookupAction::Part {
            code: parse_code(code)?,
            number: number.parse().ok()?,
        }),
        _ => None,
    }
}

fn parse_admin(parts: &[&str]) -> Option<AdminAction> {
    let id = |raw: &str| raw.parse::<i64>().ok();
    match parts {
        ["menu", slug] => MenuChoice::from_slug(slug).map(AdminAction::Menu),
        ["back"] => Some(AdminAction::Back),
        ["more", flag] => parse_yes_no(flag).map(AdminAction::MoreParts),
        ["grp", raw] => id(raw).map(|v| AdminAction::ToggleGroup(GroupId(v))),
        ["grp_done"] => Some(AdminAction::GroupsDone),
        ["edit", slug] => EditChoice::from_slug(slug).map(AdminAction::Edit),
        ["edit_desc", flag] => parse_yes_no(flag).map(AdminAction::EditDescriptionAfterPart),
        ["delgrp", raw] => id(raw).map(|v| AdminAction::DeleteGroup(GroupId(v))),
        ["delch", raw] => id(raw).map(|v| AdminAction::DeleteChannel(ChannelId(v))),
        ["aud", slug] => AudienceChoice::from_slug(slug).map(AdminAction::Audience),
        ["audgrp", raw] => id(raw).map(|v| AdminAction::AudienceGroup(GroupId(v))),
        ["bc", flag] => parse_yes_no(flag).map(AdminAction::ConfirmBroadcast),
        _ => None,
    }
}
