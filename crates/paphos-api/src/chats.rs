use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use paphos_db::models::{ChatParticipantRow, ChatRow};
use paphos_types::api::{ChatResponse, Claims, CreateChatRequest, ParticipantResponse, UpdateChatRequest};
use paphos_types::models::ParticipantRef;

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, PageQuery, parse_id};
use crate::state::AppState;
use crate::validation::FieldErrors;

const CHAT: &str = "Chat";

/// Group chats are not supported yet: a chat pairs its owner with one character.
pub const ONE_CHARACTER_PER_CHAT: &str = "Chats must have exactly one character for now.";

pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<CreateChatRequest>,
) -> ApiResult<impl IntoResponse> {
    let actor = claims.user.id;
    let &[character_id] = req.character_ids.as_slice() else {
        return Err(FieldErrors::single("character_ids", ONE_CHARACTER_PER_CHAT));
    };
    let name = normalize_name(req.name);

    let chat = state
        .transact(move |uow| {
            let chat = uow.insert_chat(actor, name.as_deref())?;
            let owner = uow.insert_participant(chat.id, ParticipantRef::User(actor))?;

            // A miss here rolls back the chat and owner rows above.
            let character = uow
                .find_accessible_character(actor, character_id)?
                .ok_or(ApiError::NotFound("Character"))?;
            let partner = uow.insert_participant(chat.id, ParticipantRef::Character(character.id))?;

            Ok(response(chat, vec![owner, partner]))
        })
        .await?;

    info!(chat_id = %chat.id, owner_id = %actor, "Chat created");
    Ok((StatusCode::CREATED, Json(chat)))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    query: PageQuery,
) -> ApiResult<Json<Vec<ChatResponse>>> {
    let actor = claims.user.id;
    let page = query.page();

    let chats = state
        .transact(move |uow| {
            let chats = uow.list_accessible_chats(actor, page)?;
            let ids: Vec<Uuid> = chats.iter().map(|c| c.id).collect();
            let participants = uow.participants_for_chats(&ids)?;

            let mut by_chat: HashMap<Uuid, Vec<ChatParticipantRow>> = HashMap::new();
            for participant in participants {
                by_chat.entry(participant.chat_id).or_default().push(participant);
            }

            Ok(chats
                .into_iter()
                .map(|chat| {
                    let participants = by_chat.remove(&chat.id).unwrap_or_default();
                    response(chat, participants)
                })
                .collect::<Vec<_>>())
        })
        .await?;

    Ok(Json(chats))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateChatRequest>,
) -> ApiResult<Json<ChatResponse>> {
    let actor = claims.user.id;
    let id = parse_id(&id, CHAT)?;
    let name = normalize_name(req.name);

    let chat = state
        .transact(move |uow| {
            let mut chat = uow
                .find_accessible_chat(actor, id)?
                .ok_or(ApiError::NotFound(CHAT))?;

            chat.updated_at = uow.rename_chat(id, name.as_deref())?;
            chat.name = name;

            let participants = uow.participants_for_chats(&[id])?;
            Ok(response(chat, participants))
        })
        .await?;

    info!(chat_id = %chat.id, "Chat updated");
    Ok(Json(chat))
}

fn normalize_name(name: Option<String>) -> Option<String> {
    name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

fn response(chat: ChatRow, participants: Vec<ChatParticipantRow>) -> ChatResponse {
    ChatResponse {
        id: chat.id,
        owner_id: chat.owner_id,
        name: chat.name,
        participants: participants
            .into_iter()
            .map(|p| ParticipantResponse::from(p.participant))
            .collect(),
        created_at: chat.created_at,
        updated_at: chat.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_names_are_dropped() {
        assert_eq!(normalize_name(Some("  ".into())), None);
        assert_eq!(normalize_name(Some(" Tea time ".into())), Some("Tea time".into()));
        assert_eq!(normalize_name(None), None);
    }
}
