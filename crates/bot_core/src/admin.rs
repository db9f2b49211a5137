//! Admin panel: catalog editing, groups, mandatory channels and broadcasts.
//!
//! Every entry point re-checks the sender against the configured admin list.
//! Handlers take the current [`AdminState`] out of the session and return the
//! next one; invalid input hands the same state back.

use shared::{
    domain::{ChatId, GroupId, MediaKind, TitleCode, UserId},
    protocol::{AdminAction, AudienceChoice, EditChoice, MenuChoice},
};
use storage::{NewPart, NewTitle, StoreError};
use telegram::ChatTarget;
use tracing::info;
use url::Url;

use crate::{
    broadcast::{self, Audience, BroadcastPayload, BroadcastReport},
    event::{Event, Inbound, MediaInput},
    keyboards,
    session::Session,
    state::{AdminState, PartUpload, TitleDraft},
    texts, BotContext, FlowResult, Press, Surface,
};

type Next = Option<AdminState>;

pub(crate) async fn open_menu(ctx: &BotContext, session: &mut Session, inbound: &Inbound) -> FlowResult<()> {
    if !ctx.is_admin(inbound.user.id) {
        info!(user_id = %inbound.user.id, "admin panel refused");
        ctx.platform
            .send_text(inbound.chat_id, texts::ADMIN_ONLY, None)
            .await?;
        return Ok(());
    }

    ctx.platform
        .send_text(inbound.chat_id, texts::ADMIN_MENU, Some(&keyboards::admin_menu()))
        .await?;
    session.admin = Some(AdminState::Menu);
    Ok(())
}

/// Starts the broadcast wizard outside the menu.
pub(crate) async fn open_broadcast(
    ctx: &BotContext,
    session: &mut Session,
    inbound: &Inbound,
) -> FlowResult<()> {
    ctx.platform
        .send_text(inbound.chat_id, texts::CHOOSE_AUDIENCE, Some(&keyboards::audience()))
        .await?;
    session.admin = Some(AdminState::BroadcastAudience);
    Ok(())
}

pub(crate) async fn on_callback(
    ctx: &BotContext,
    session: &mut Session,
    inbound: &Inbound,
    press: Press<'_>,
    action: AdminAction,
) -> FlowResult<()> {
    if !ctx.is_admin(inbound.user.id) {
        info!(user_id = %inbound.user.id, ?action, "admin action refused");
        return press.answer(ctx, Some(texts::ADMIN_ONLY), true).await;
    }

    let admin_id = inbound.user.id;
    let surface = press.surface;
    let platform = ctx.platform.as_ref();

    let next = match (action, session.admin.take()) {
        (AdminAction::Menu(choice), _) => {
            press.answer(ctx, None, false).await?;
            menu_choice(ctx, surface, choice).await?
        }
        (AdminAction::Back, _) => {
            press.answer(ctx, None, false).await?;
            surface
                .show(platform, texts::ADMIN_MENU, Some(&keyboards::admin_menu()))
                .await?;
            Some(AdminState::Menu)
        }
        (AdminAction::DeleteGroup(group_id), _) => {
            remove_group(ctx, admin_id, press, group_id).await?
        }
        (AdminAction::DeleteChannel(channel_id), _) => {
            let alert = match ctx.storage.delete_mandatory_channel(channel_id).await {
                Ok(()) => {
                    info!(%admin_id, %channel_id, "mandatory channel deleted");
                    texts::deleted_alert("channel")
                }
                Err(StoreError::NotFound { .. }) => texts::BUTTON_EXPIRED.to_string(),
                Err(error) => return Err(error.into()),
            };
            press.answer(ctx, Some(alert.as_str()), false).await?;
            show_channel_picker(ctx, surface).await?
        }

        (AdminAction::MoreParts(true), Some(AdminState::TitleMoreParts(draft))) => {
            press.answer(ctx, None, false).await?;
            surface
                .show(platform, &texts::ask_part(draft.parts.len() + 1), None)
                .await?;
            Some(AdminState::TitlePart(draft))
        }
        (AdminAction::MoreParts(false), Some(AdminState::TitleMoreParts(draft))) => {
            press.answer(ctx, None, false).await?;
            surface.show(platform, texts::ASK_NEW_CODE, None).await?;
            Some(AdminState::TitleCode(draft))
        }
        (
            AdminAction::ToggleGroup(group_id),
            Some(AdminState::TitleGroups {
                draft,
                code,
                mut selected,
            }),
        ) => {
            press.answer(ctx, None, false).await?;
            match selected.iter().position(|id| *id == group_id) {
                Some(index) => {
                    selected.remove(index);
                }
                None => selected.push(group_id),
            }
            let groups = ctx.storage.list_groups().await?;
            surface
                .show(
                    platform,
                    texts::CHOOSE_GROUPS,
                    Some(&keyboards::group_picker(&groups, &selected)),
                )
                .await?;
            Some(AdminState::TitleGroups {
                draft,
                code,
                selected,
            })
        }
        (
            AdminAction::GroupsDone,
            Some(AdminState::TitleGroups {
                draft,
                code,
                selected,
            }),
        ) => {
            press.answer(ctx, None, false).await?;
            commit_title(ctx, admin_id, surface, draft, code, selected).await?
        }

        (AdminAction::Edit(choice), Some(AdminState::EditTitleMenu { code })) => {
            press.answer(ctx, None, false).await?;
            edit_choice(ctx, admin_id, surface, code, choice).await?
        }
        (AdminAction::EditDescriptionAfterPart(true), Some(AdminState::EditAfterAppend { code })) => {
            press.answer(ctx, None, false).await?;
            match ctx.storage.title_by_code(code).await? {
                Some(title) => {
                    surface
                        .show(platform, &texts::ask_new_description(&title.description), None)
                        .await?;
                    Some(AdminState::EditDescription { code })
                }
                None => {
                    surface
                        .show(platform, &texts::title_not_found(code), Some(&keyboards::back()))
                        .await?;
                    None
                }
            }
        }
        (AdminAction::EditDescriptionAfterPart(false), Some(AdminState::EditAfterAppend { .. })) => {
            press.answer(ctx, None, false).await?;
            surface
                .show(platform, texts::EDIT_DONE, Some(&keyboards::back()))
                .await?;
            None
        }

        (AdminAction::Audience(choice), Some(AdminState::BroadcastAudience)) => {
            press.answer(ctx, None, false).await?;
            match choice {
                AudienceChoice::AllUsers => ask_broadcast_message(ctx, surface, Audience::AllUsers).await?,
                AudienceChoice::AllGroups => ask_broadcast_message(ctx, surface, Audience::AllGroups).await?,
                AudienceChoice::OneGroup => {
                    let groups = ctx.storage.list_groups().await?;
                    if groups.is_empty() {
                        surface
                            .show(platform, texts::NO_GROUPS, Some(&keyboards::back()))
                            .await?;
                        Some(AdminState::Menu)
                    } else {
                        surface
                            .show(
                                platform,
                                texts::CHOOSE_AUDIENCE_GROUP,
                                Some(&keyboards::audience_groups(&groups)),
                            )
                            .await?;
                        Some(AdminState::BroadcastGroupPick)
                    }
                }
            }
        }
        (AdminAction::AudienceGroup(group_id), Some(AdminState::BroadcastGroupPick)) => {
            press.answer(ctx, None, false).await?;
            ask_broadcast_message(ctx, surface, Audience::Group(group_id)).await?
        }
        (AdminAction::ConfirmBroadcast(false), Some(AdminState::BroadcastConfirm { .. })) => {
            press.answer(ctx, None, false).await?;
            surface
                .show(platform, texts::BROADCAST_CANCELLED, Some(&keyboards::back()))
                .await?;
            None
        }
        (
            AdminAction::ConfirmBroadcast(true),
            Some(AdminState::BroadcastConfirm { audience, payload }),
        ) => {
            press.answer(ctx, None, false).await?;
            run_broadcast(ctx, admin_id, surface, audience, &payload).await?;
            None
        }

        (action, state) => {
            info!(%admin_id, ?action, "stale admin button");
            press.answer(ctx, Some(texts::BUTTON_EXPIRED), true).await?;
            state
        }
    };

    session.admin = next;
    Ok(())
}

async fn menu_choice(ctx: &BotContext, surface: Surface, choice: MenuChoice) -> FlowResult<Next> {
    let platform = ctx.platform.as_ref();
    let back = keyboards::back();

    let next = match choice {
        MenuChoice::AddTitle => {
            surface.show(platform, texts::ASK_DESCRIPTION, Some(&back)).await?;
            Some(AdminState::TitleDescription)
        }
        MenuChoice::DeleteTitle => {
            surface.show(platform, texts::ASK_DELETE_CODE, Some(&back)).await?;
            Some(AdminState::DeleteTitleCode)
        }
        MenuChoice::EditTitle => {
            surface.show(platform, texts::ASK_EDIT_CODE, Some(&back)).await?;
            Some(AdminState::EditTitleCode)
        }
        MenuChoice::AddGroup => {
            surface.show(platform, texts::ASK_GROUP_ID, Some(&back)).await?;
            Some(AdminState::GroupChatId)
        }
        MenuChoice::ListGroups => {
            let groups = ctx.storage.list_groups().await?;
            surface
                .show(platform, &texts::groups_list(&groups), Some(&back))
                .await?;
            Some(AdminState::Menu)
        }
        MenuChoice::DeleteGroup => show_group_picker(ctx, surface).await?,
        MenuChoice::AddChannel => {
            surface.show(platform, texts::ASK_CHANNEL_REF, Some(&back)).await?;
            Some(AdminState::ChannelRef)
        }
        MenuChoice::DeleteChannel => show_channel_picker(ctx, surface).await?,
        MenuChoice::Broadcast => {
            surface
                .show(platform, texts::CHOOSE_AUDIENCE, Some(&keyboards::audience()))
                .await?;
            Some(AdminState::BroadcastAudience)
        }
        MenuChoice::Stats => {
            let stats = ctx.storage.stats().await?;
            surface.show(platform, &texts::stats(&stats), Some(&back)).await?;
            Some(AdminState::Menu)
        }
        MenuChoice::Close => {
            surface.show(platform, texts::PANEL_CLOSED, None).await?;
            None
        }
    };
    Ok(next)
}

async fn show_group_picker(ctx: &BotContext, surface: Surface) -> FlowResult<Next> {
    let groups = ctx.storage.list_groups().await?;
    if groups.is_empty() {
        surface
            .show(ctx.platform.as_ref(), texts::NO_GROUPS, Some(&keyboards::back()))
            .await?;
        return Ok(Some(AdminState::Menu));
    }
    surface
        .show(
            ctx.platform.as_ref(),
            texts::CHOOSE_GROUP_TO_DELETE,
            Some(&keyboards::delete_groups(&groups)),
        )
        .await?;
    Ok(Some(AdminState::DeleteGroupPick))
}

async fn show_channel_picker(ctx: &BotContext, surface: Surface) -> FlowResult<Next> {
    let channels = ctx.storage.list_mandatory_channels().await?;
    if channels.is_empty() {
        surface
            .show(ctx.platform.as_ref(), texts::NO_CHANNELS, Some(&keyboards::back()))
            .await?;
        return Ok(Some(AdminState::Menu));
    }
    surface
        .show(
            ctx.platform.as_ref(),
            texts::CHOOSE_CHANNEL_TO_DELETE,
            Some(&keyboards::delete_channels(&channels)),
        )
        .await?;
    Ok(Some(AdminState::DeleteChannelPick))
}

async fn remove_group(
    ctx: &BotContext,
    admin_id: UserId,
    press: Press<'_>,
    group_id: GroupId,
) -> FlowResult<Next> {
    let alert = match ctx.storage.group(group_id).await? {
        Some(group) => {
            ctx.storage.delete_group(group_id).await?;
            info!(%admin_id, %group_id, chat_id = %group.chat_id, "group deleted");
            texts::deleted_alert(&group.name)
        }
        None => texts::BUTTON_EXPIRED.to_string(),
    };
    press.answer(ctx, Some(alert.as_str()), false).await?;
    show_group_picker(ctx, press.surface).await
}

/// Persists the draft in one transaction and announces it to the linked
/// groups. Losing a race on the code sends the admin back to the code step.
async fn commit_title(
    ctx: &BotContext,
    admin_id: UserId,
    surface: Surface,
    draft: TitleDraft,
    code: TitleCode,
    selected: Vec<GroupId>,
) -> FlowResult<Next> {
    let platform = ctx.platform.as_ref();
    let title = NewTitle {
        code,
        description: draft.description.clone(),
        cover_file_id: draft.cover_file_id.clone(),
        parts: draft
            .parts
            .iter()
            .zip(1u32..)
            .map(|(part, number)| NewPart {
                number,
                file_id: part.file_id.clone(),
                kind: part.kind,
            })
            .collect(),
        group_ids: selected,
    };

    match ctx.storage.create_title(&title).await {
        Ok(()) => {}
        Err(StoreError::DuplicateKey { .. }) => {
            surface.show(platform, &texts::code_taken(code), None).await?;
            return Ok(Some(AdminState::TitleCode(draft)));
        }
        Err(error) => return Err(error.into()),
    }
    info!(
        %admin_id,
        %code,
        parts = title.parts.len(),
        groups = title.group_ids.len(),
        "title created"
    );

    let announced = if title.group_ids.is_empty() {
        None
    } else {
        Some(announce(ctx, code).await?)
    };
    surface
        .show(
            platform,
            &texts::title_created(code, title.parts.len(), title.group_ids.len(), announced),
            Some(&keyboards::back()),
        )
        .await?;
    Ok(None)
}

async fn announce(ctx: &BotContext, code: TitleCode) -> FlowResult<BroadcastReport> {
    let Some(title) = ctx.storage.title_by_code(code).await? else {
        return Ok(BroadcastReport::default());
    };
    let chats: Vec<ChatId> = ctx
        .storage
        .title_groups(code)
        .await?
        .into_iter()
        .map(|group| group.chat_id)
        .collect();

    let text = texts::announcement(&title);
    let payload = match title.cover_file_id {
        Some(file_id) => BroadcastPayload::Photo {
            file_id,
            caption: Some(text),
        },
        None => BroadcastPayload::Text(text),
    };
    Ok(broadcast::broadcast(
        ctx.platform.as_ref(),
        &chats,
        &payload,
        ctx.settings.broadcast_delay,
    )
    .await)
}

async fn edit_choice(
    ctx: &BotContext,
    admin_id: UserId,
    surface: Surface,
    code: TitleCode,
    choice: EditChoice,
) -> FlowResult<Next> {
    let platform = ctx.platform.as_ref();

    let next = match choice {
        EditChoice::AddPart => {
            let count = ctx.storage.list_parts(code).await?.len();
            surface.show(platform, &texts::ask_part(count + 1), None).await?;
            Some(AdminState::EditAppendPart { code })
        }
        EditChoice::DeletePart => {
            let part_count = ctx.storage.list_parts(code).await?.len();
            if part_count == 0 {
                surface
                    .show(platform, texts::NO_PARTS, Some(&keyboards::edit_menu()))
                    .await?;
                Some(AdminState::EditTitleMenu { code })
            } else {
                surface
                    .show(platform, &texts::ask_delete_part(part_count), None)
                    .await?;
                Some(AdminState::EditDeletePart { code, part_count })
            }
        }
        EditChoice::DeleteTitle => {
            let text = match ctx.storage.delete_title(code).await {
                Ok(()) => {
                    info!(%admin_id, %code, "title deleted");
                    texts::title_deleted(code)
                }
                Err(StoreError::NotFound { .. }) => texts::title_not_found(code),
                Err(error) => return Err(error.into()),
            };
            surface.show(platform, &text, Some(&keyboards::back())).await?;
            None
        }
        EditChoice::Description => match ctx.storage.title_by_code(code).await? {
            Some(title) => {
                surface
                    .show(platform, &texts::ask_new_description(&title.description), None)
                    .await?;
                Some(AdminState::EditDescription { code })
            }
            None => {
                surface
                    .show(platform, &texts::title_not_found(code), Some(&keyboards::back()))
                    .await?;
                None
            }
        },
        EditChoice::Cover => {
            surface.show(platform, texts::ASK_COVER, None).await?;
            Some(AdminState::EditCover { code })
        }
    };
    Ok(next)
}

async fn ask_broadcast_message(ctx: &BotContext, surface: Surface, audience: Audience) -> FlowResult<Next> {
    surface
        .show(ctx.platform.as_ref(), texts::ASK_BROADCAST_MESSAGE, Some(&keyboards::back()))
        .await?;
    Ok(Some(AdminState::BroadcastMessage { audience }))
}

async fn recipients(ctx: &BotContext, audience: Audience) -> FlowResult<Vec<ChatId>> {
    let chats = match audience {
        Audience::AllUsers => ctx
            .storage
            .broadcast_recipients()
            .await?
            .into_iter()
            .map(ChatId::from)
            .collect(),
        Audience::AllGroups => ctx
            .storage
            .list_groups()
            .await?
            .into_iter()
            .map(|group| group.chat_id)
            .collect(),
        Audience::Group(group_id) => ctx
            .storage
            .group(group_id)
            .await?
            .map(|group| vec![group.chat_id])
            .unwrap_or_default(),
    };
    Ok(chats)
}

async fn run_broadcast(
    ctx: &BotContext,
    admin_id: UserId,
    surface: Surface,
    audience: Audience,
    payload: &BroadcastPayload,
) -> FlowResult<()> {
    let platform = ctx.platform.as_ref();
    let chats = recipients(ctx, audience).await?;
    info!(%admin_id, ?audience, recipients = chats.len(), "broadcast started");

    surface
        .show(platform, &texts::broadcast_started(chats.len()), None)
        .await?;
    let report = broadcast::broadcast(platform, &chats, payload, ctx.settings.broadcast_delay).await;
    surface
        .show(platform, &texts::broadcast_finished(report), Some(&keyboards::back()))
        .await?;
    Ok(())
}

fn text_of(event: &Event) -> Option<&str> {
    match event {
        Event::Text(text) => Some(text.trim()).filter(|text| !text.is_empty()),
        _ => None,
    }
}

fn part_media(event: &Event) -> Option<PartUpload> {
    match event {
        Event::Media(MediaInput { kind, file_id, .. }) if kind.is_part_media() => Some(PartUpload {
            file_id: file_id.clone(),
            kind: *kind,
        }),
        _ => None,
    }
}

fn photo_of(event: &Event) -> Option<&MediaInput> {
    match event {
        Event::Media(media) if media.kind == MediaKind::Photo => Some(media),
        _ => None,
    }
}

/// Accepts absolute http(s) links with a host.
pub(crate) fn valid_link(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw.trim()).ok()?;
    let web = matches!(parsed.scheme(), "http" | "https");
    (web && parsed.host_str().is_some()).then(|| raw.trim().to_string())
}

/// Text, photo or video messages an admin sends while a step awaits input.
pub(crate) async fn on_message(
    ctx: &BotContext,
    session: &mut Session,
    inbound: &Inbound,
) -> FlowResult<()> {
    let Some(state) = session.admin.take() else {
        return Ok(());
    };
    let next = step(ctx, inbound, state).await?;
    session.admin = next;
    Ok(())
}

async fn step(ctx: &BotContext, inbound: &Inbound, state: AdminState) -> FlowResult<Next> {
    let platform = ctx.platform.as_ref();
    let chat_id = inbound.chat_id;
    let admin_id = inbound.user.id;
    let event = &inbound.event;
    let back = keyboards::back();

    // Replies with `$text` and keeps the current state.
    macro_rules! reprompt {
        ($text:expr, $state:expr) => {{
            platform.send_text(chat_id, $text, None).await?;
            return Ok(Some($state));
        }};
    }

    let next = match state {
        AdminState::TitleDescription => {
            let (description, cover_file_id) = match (text_of(event), photo_of(event)) {
                (Some(text), _) => (text.to_string(), None),
                (None, Some(MediaInput { file_id, caption: Some(caption), .. }))
                    if !caption.trim().is_empty() =>
                {
                    (caption.trim().to_string(), Some(file_id.clone()))
                }
                _ => reprompt!(texts::ASK_DESCRIPTION, AdminState::TitleDescription),
            };
            platform.send_text(chat_id, &texts::ask_part(1), None).await?;
            Some(AdminState::TitlePart(TitleDraft {
                description,
                cover_file_id,
                parts: Vec::new(),
            }))
        }
        AdminState::TitlePart(mut draft) => {
            let Some(upload) = part_media(event) else {
                reprompt!(texts::MEDIA_EXPECTED, AdminState::TitlePart(draft));
            };
            draft.parts.push(upload);
            platform
                .send_text(
                    chat_id,
                    &texts::part_saved(draft.parts.len()),
                    Some(&keyboards::more_parts()),
                )
                .await?;
            Some(AdminState::TitleMoreParts(draft))
        }
        AdminState::TitleCode(draft) => {
            let code = text_of(event)
                .and_then(TitleCode::parse_digits)
                .filter(|code| code.is_assignable());
            let Some(code) = code else {
                reprompt!(texts::INVALID_NEW_CODE, AdminState::TitleCode(draft));
            };
            if ctx.storage.title_exists(code).await? {
                reprompt!(&texts::code_taken(code), AdminState::TitleCode(draft));
            }

            let groups = ctx.storage.list_groups().await?;
            if groups.is_empty() {
                commit_title(ctx, admin_id, Surface::Send(chat_id), draft, code, Vec::new()).await?
            } else {
                platform
                    .send_text(
                        chat_id,
                        texts::CHOOSE_GROUPS,
                        Some(&keyboards::group_picker(&groups, &[])),
                    )
                    .await?;
                Some(AdminState::TitleGroups {
                    draft,
                    code,
                    selected: Vec::new(),
                })
            }
        }

        AdminState::DeleteTitleCode => {
            let Some(code) = text_of(event).and_then(TitleCode::parse_digits) else {
                reprompt!(texts::INVALID_CODE, AdminState::DeleteTitleCode);
            };
            match ctx.storage.delete_title(code).await {
                Ok(()) => {
                    info!(%admin_id, %code, "title deleted");
                    platform
                        .send_text(chat_id, &texts::title_deleted(code), Some(&back))
                        .await?;
                    None
                }
                Err(StoreError::NotFound { .. }) => {
                    reprompt!(&texts::title_not_found(code), AdminState::DeleteTitleCode)
                }
                Err(error) => return Err(error.into()),
            }
        }

        AdminState::EditTitleCode => {
            let Some(code) = text_of(event).and_then(TitleCode::parse_digits) else {
                reprompt!(texts::INVALID_CODE, AdminState::EditTitleCode);
            };
            let Some(title) = ctx.storage.title_by_code(code).await? else {
                reprompt!(&texts::title_not_found(code), AdminState::EditTitleCode);
            };
            let part_count = ctx.storage.list_parts(code).await?.len();
            platform
                .send_text(
                    chat_id,
                    &texts::edit_menu(&title, part_count),
                    Some(&keyboards::edit_menu()),
                )
                .await?;
            Some(AdminState::EditTitleMenu { code })
        }
        AdminState::EditAppendPart { code } => {
            let Some(upload) = part_media(event) else {
                reprompt!(texts::MEDIA_EXPECTED, AdminState::EditAppendPart { code });
            };
            let number = ctx
                .storage
                .append_part(code, &upload.file_id, upload.kind)
                .await?;
            info!(%admin_id, %code, part = number, "part appended");
            platform
                .send_text(
                    chat_id,
                    &texts::part_appended(number),
                    Some(&keyboards::edit_description_after_part()),
                )
                .await?;
            Some(AdminState::EditAfterAppend { code })
        }
        AdminState::EditDeletePart { code, part_count } => {
            let number = text_of(event)
                .and_then(|text| text.parse::<u32>().ok())
                .filter(|n| (1..=part_count).contains(&(*n as usize)));
            let Some(number) = number else {
                reprompt!(
                    &texts::invalid_part_number(part_count),
                    AdminState::EditDeletePart { code, part_count }
                );
            };
            match ctx.storage.delete_part(code, number).await {
                Ok(()) => {
                    info!(%admin_id, %code, part = number, "part deleted");
                    platform
                        .send_text(chat_id, &texts::part_deleted(number), Some(&back))
                        .await?;
                    None
                }
                // Parts changed since the prompt; re-read the count before asking again.
                Err(StoreError::NotFound { .. }) => {
                    let part_count = ctx.storage.list_parts(code).await?.len();
                    if part_count == 0 {
                        platform
                            .send_text(chat_id, texts::NO_PARTS, Some(&back))
                            .await?;
                        None
                    } else {
                        reprompt!(
                            &texts::invalid_part_number(part_count),
                            AdminState::EditDeletePart { code, part_count }
                        )
                    }
                }
                Err(error) => return Err(error.into()),
            }
        }
        AdminState::EditDescription { code } => {
            let Some(description) = text_of(event) else {
                reprompt!(texts::TEXT_EXPECTED, AdminState::EditDescription { code });
            };
            ctx.storage
                .update_title_description(code, description)
                .await?;
            info!(%admin_id, %code, "description updated");
            platform
                .send_text(chat_id, texts::DESCRIPTION_UPDATED, Some(&back))
                .await?;
            None
        }
        AdminState::EditCover { code } => {
            let Some(photo) = photo_of(event) else {
                reprompt!(texts::PHOTO_EXPECTED, AdminState::EditCover { code });
            };
            ctx.storage.update_title_cover(code, &photo.file_id).await?;
            info!(%admin_id, %code, "cover updated");
            platform
                .send_text(chat_id, texts::COVER_UPDATED, Some(&back))
                .await?;
            None
        }

        AdminState::GroupChatId => {
            let Some(chat) = text_of(event).and_then(|text| text.parse::<i64>().ok()) else {
                reprompt!(texts::INVALID_CHAT_ID, AdminState::GroupChatId);
            };
            let chat_id_value = ChatId(chat);
            if ctx.storage.group_by_chat(chat_id_value).await?.is_some() {
                platform
                    .send_text(chat_id, &texts::group_exists(chat_id_value), Some(&back))
                    .await?;
                None
            } else {
                platform.send_text(chat_id, texts::ASK_LINK, None).await?;
                Some(AdminState::GroupLink {
                    chat_id: chat_id_value,
                })
            }
        }
        AdminState::GroupLink { chat_id: group_chat } => {
            let Some(link) = text_of(event).and_then(valid_link) else {
                reprompt!(texts::INVALID_LINK, AdminState::GroupLink { chat_id: group_chat });
            };
            platform.send_text(chat_id, texts::ASK_NAME, None).await?;
            Some(AdminState::GroupName {
                chat_id: group_chat,
                link,
            })
        }
        AdminState::GroupName {
            chat_id: group_chat,
            link,
        } => {
            let Some(name) = text_of(event) else {
                reprompt!(
                    texts::ASK_NAME,
                    AdminState::GroupName {
                        chat_id: group_chat,
                        link
                    }
                );
            };
            let reply = match ctx.storage.create_group(group_chat, Some(link.as_str()), name).await {
                Ok(group_id) => {
                    info!(%admin_id, %group_id, chat_id = %group_chat, "group created");
                    texts::group_created(name)
                }
                Err(StoreError::DuplicateKey { .. }) => texts::group_exists(group_chat),
                Err(error) => return Err(error.into()),
            };
            platform.send_text(chat_id, &reply, Some(&back)).await?;
            None
        }

        AdminState::ChannelRef => {
            let chat_ref = text_of(event).filter(|text| ChatTarget::parse(text).is_some());
            let Some(chat_ref) = chat_ref else {
                reprompt!(texts::INVALID_CHANNEL_REF, AdminState::ChannelRef);
            };
            platform.send_text(chat_id, texts::ASK_LINK, None).await?;
            Some(AdminState::ChannelLink {
                chat_ref: chat_ref.to_string(),
            })
        }
        AdminState::ChannelLink { chat_ref } => {
            let Some(link) = text_of(event).and_then(valid_link) else {
                reprompt!(texts::INVALID_LINK, AdminState::ChannelLink { chat_ref });
            };
            platform.send_text(chat_id, texts::ASK_NAME, None).await?;
            Some(AdminState::ChannelName { chat_ref, link })
        }
        AdminState::ChannelName { chat_ref, link } => {
            let Some(name) = text_of(event) else {
                reprompt!(texts::ASK_NAME, AdminState::ChannelName { chat_ref, link });
            };
            let channel_id = ctx
                .storage
                .upsert_mandatory_channel(&chat_ref, Some(link.as_str()), name)
                .await?;
            info!(%admin_id, %channel_id, %chat_ref, "mandatory channel saved");
            platform
                .send_text(chat_id, &texts::channel_saved(name), Some(&back))
                .await?;
            None
        }

        AdminState::BroadcastMessage { audience } => {
            let payload = match event {
                Event::Text(text) if !text.trim().is_empty() => {
                    BroadcastPayload::Text(texts::escape_html(text))
                }
                Event::Media(MediaInput {
                    kind: MediaKind::Photo,
                    file_id,
                    caption,
                }) => BroadcastPayload::Photo {
                    file_id: file_id.clone(),
                    caption: caption.as_deref().map(texts::escape_html),
                },
                Event::Media(MediaInput {
                    kind: MediaKind::Video,
                    file_id,
                    caption,
                }) => BroadcastPayload::Video {
                    file_id: file_id.clone(),
                    caption: caption.as_deref().map(texts::escape_html),
                },
                _ => reprompt!(
                    texts::ASK_BROADCAST_MESSAGE,
                    AdminState::BroadcastMessage { audience }
                ),
            };

            let count = recipients(ctx, audience).await?.len();
            let group = match audience {
                Audience::Group(group_id) => ctx.storage.group(group_id).await?,
                _ => None,
            };
            let label = texts::audience_label(audience, group.as_ref());
            platform
                .send_text(
                    chat_id,
                    &texts::broadcast_preview(&label, count, &payload),
                    Some(&keyboards::confirm_broadcast()),
                )
                .await?;
            Some(AdminState::BroadcastConfirm { audience, payload })
        }

        state @ (AdminState::Menu
        | AdminState::TitleMoreParts(_)
        | AdminState::TitleGroups { .. }
        | AdminState::EditTitleMenu { .. }
        | AdminState::EditAfterAppend { .. }
        | AdminState::DeleteGroupPick
        | AdminState::DeleteChannelPick
        | AdminState::BroadcastAudience
        | AdminState::BroadcastGroupPick
        | AdminState::BroadcastConfirm { .. }) => reprompt!(texts::USE_BUTTONS, state),
    };
    Ok(next)
}

#[cfg(test)]
#[path = "tests/admin_tests.rs"]
mod tests;
