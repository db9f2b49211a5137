//! Conversation states for the lookup and admin flows.

use shared::domain::{ChatId, GroupId, MediaKind, TitleCode};

use crate::broadcast::{Audience, BroadcastPayload};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LookupState {
    #[default]
    Idle,
    AwaitingSubscription {
        pending_code: Option<TitleCode>,
    },
    AwaitingCode,
    ViewingTitle {
        code: TitleCode,
    },
    ViewingParts {
        code: TitleCode,
        page: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartUpload {
    pub file_id: String,
    pub kind: MediaKind,
}

/// Title collected across the add-title steps before it is committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleDraft {
    pub description: String,
    pub cover_file_id: Option<String>,
    pub parts: Vec<PartUpload>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminState {
    Menu,

    TitleDescription,
    TitlePart(TitleDraft),
    TitleMoreParts(TitleDraft),
    TitleCode(TitleDraft),
    TitleGroups {
        draft: TitleDraft,
        code: TitleCode,
        selected: Vec<GroupId>,
    },

    DeleteTitleCode,

    EditTitleCode,
    EditTitleMenu {
        code: TitleCode,
    },
    EditAppendPart {
        code: TitleCode,
    },
    EditAfterAppend {
        code: TitleCode,
    },
    EditDeletePart {
        code: TitleCode,
        part_count: usize,
    },
    EditDescription {
        code: TitleCode,
    },
    EditCover {
        code: TitleCode,
    },

    GroupChatId,
    GroupLink {
        chat_id: ChatId,
    },
    GroupName {
        chat_id: ChatId,
        link: String,
    },
    DeleteGroupPick,

    ChannelRef,
    ChannelLink {
        chat_ref: String,
    },
    ChannelName {
        chat_ref: String,
        link: String,
    },
    DeleteChannelPick,

    BroadcastAudience,
    BroadcastGroupPick,
    BroadcastMessage {
        audience: Audience,
    },
    BroadcastConfirm {
        audience: Audience,
        payload: BroadcastPayload,
    },
}

impl AdminState {
    /// Whether plain messages belong to this state rather than to the lookup flow.
    pub fn captures_messages(&self) -> bool {
        !matches!(
            self,
            Self::Menu | Self::DeleteGroupPick | Self::DeleteChannelPick
        )
    }
}
