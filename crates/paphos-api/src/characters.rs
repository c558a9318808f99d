use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use paphos_db::UnitOfWork;
use paphos_db::models::CharacterRow;
use paphos_db::policy::character_owned_by;
use paphos_types::api::{CharacterResponse, Claims, CreateCharacterRequest, UpdateCharacterRequest};

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, PageQuery, parse_id};
use crate::state::AppState;
use crate::validation::{CharacterDraft, validate_character};

const CHARACTER: &str = "Character";

pub async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    query: PageQuery,
) -> ApiResult<Json<Vec<CharacterResponse>>> {
    let actor = claims.user.id;
    let page = query.page();

    let rows = state
        .transact(move |uow| Ok(uow.list_visible_characters(actor, page)?))
        .await?;

    Ok(Json(rows.into_iter().map(response).collect()))
}

pub async fn show(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> ApiResult<Json<CharacterResponse>> {
    let actor = claims.user.id;
    let id = parse_id(&id, CHARACTER)?;

    let row = state
        .transact(move |uow| {
            uow.find_visible_character(actor, id)?
                .ok_or(ApiError::NotFound(CHARACTER))
        })
        .await?;

    Ok(Json(response(row)))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<CreateCharacterRequest>,
) -> ApiResult<impl IntoResponse> {
    let actor = claims.user.id;
    let fields = validate_character(CharacterDraft {
        name: req.name,
        description: req.description,
        avatar_id: req.avatar_id,
        greeting: req.greeting,
        persona: req.persona,
        world_scenario: req.world_scenario,
        example_chats: req.example_chats,
        visibility: req.visibility,
    })?;

    let row = state
        .transact(move |uow| Ok(uow.insert_character(actor, &fields)?))
        .await?;

    info!(character_id = %row.id, creator_id = %actor, "Character created");
    Ok((StatusCode::CREATED, Json(response(row))))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateCharacterRequest>,
) -> ApiResult<Json<CharacterResponse>> {
    let actor = claims.user.id;
    let id = parse_id(&id, CHARACTER)?;

    let row = state
        .transact(move |uow| {
            let existing = authorize_owner(uow, actor, id)?;

            let mut draft = CharacterDraft::from(existing.fields());
            if let Some(name) = req.name {
                draft.name = name;
            }
            if let Some(description) = req.description {
                draft.description = description;
            }
            if let Some(avatar_id) = req.avatar_id {
                draft.avatar_id = Some(avatar_id);
            }
            if let Some(greeting) = req.greeting {
                draft.greeting = greeting;
            }
            if let Some(persona) = req.persona {
                draft.persona = persona;
            }
            if let Some(world_scenario) = req.world_scenario {
                draft.world_scenario = Some(world_scenario);
            }
            if let Some(example_chats) = req.example_chats {
                draft.example_chats = Some(example_chats);
            }
            if let Some(visibility) = req.visibility {
                draft.visibility = visibility;
            }

            let fields = validate_character(draft)?;
            uow.update_character(id, &fields)?
                .ok_or(ApiError::NotFound(CHARACTER))
        })
        .await?;

    info!(character_id = %row.id, "Character updated");
    Ok(Json(response(row)))
}

pub async fn destroy(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> ApiResult<Json<CharacterResponse>> {
    let actor = claims.user.id;
    let id = parse_id(&id, CHARACTER)?;

    let row = state
        .transact(move |uow| {
            let existing = authorize_owner(uow, actor, id)?;
            uow.delete_character(id)?;
            Ok(existing)
        })
        .await?;

    info!(character_id = %row.id, "Character deleted");
    Ok(Json(response(row)))
}

/// Only the creator may modify a character. Others get 403 when they can see
/// it exists and 404 when they can't.
fn authorize_owner(uow: &UnitOfWork<'_>, actor: Uuid, id: Uuid) -> ApiResult<CharacterRow> {
    let character = uow
        .find_accessible_character(actor, id)?
        .ok_or(ApiError::NotFound(CHARACTER))?;

    if !character_owned_by(actor, &character) {
        return Err(ApiError::Forbidden);
    }
    Ok(character)
}

fn response(row: CharacterRow) -> CharacterResponse {
    CharacterResponse {
        id: row.id,
        name: row.name,
        description: row.description,
        avatar_id: row.avatar_id,
        greeting: row.greeting,
        persona: row.persona,
        world_scenario: row.world_scenario,
        example_chats: row.example_chats,
        visibility: row.visibility,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}
