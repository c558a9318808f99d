use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ParticipantRef, Visibility};

// -- JWT Claims --

/// Identity embedded in a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUser {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
}

/// JWT claims. `iat` and `exp` are seconds since the Unix epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user: TokenUser,
    pub iat: i64,
    pub exp: i64,
}

// -- Users --

/// Missing fields default to empty strings so they come back as field errors
/// instead of a body rejection.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirmation: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Public view of a user. Never carries credentials or tokens.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub jwt: String,
}

// -- Characters --

#[derive(Debug, Default, Deserialize)]
pub struct CreateCharacterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub avatar_id: Option<String>,
    #[serde(default)]
    pub greeting: String,
    #[serde(default)]
    pub persona: String,
    pub world_scenario: Option<String>,
    pub example_chats: Option<String>,
    #[serde(default)]
    pub visibility: String,
}

/// Partial update: absent fields keep their stored value. Unknown fields such
/// as `id` or `created_at` are ignored so clients can send back what they fetched.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateCharacterRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub avatar_id: Option<String>,
    pub greeting: Option<String>,
    pub persona: Option<String>,
    pub world_scenario: Option<String>,
    pub example_chats: Option<String>,
    pub visibility: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CharacterResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub avatar_id: Option<String>,
    pub greeting: String,
    pub persona: String,
    pub world_scenario: Option<String>,
    pub example_chats: Option<String>,
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// -- Chats --

#[derive(Debug, Deserialize)]
pub struct CreateChatRequest {
    #[serde(default)]
    pub character_ids: Vec<Uuid>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateChatRequest {
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipantResponse {
    pub user_id: Option<Uuid>,
    pub character_id: Option<Uuid>,
}

impl From<ParticipantRef> for ParticipantResponse {
    fn from(participant: ParticipantRef) -> Self {
        Self {
            user_id: participant.user_id(),
            character_id: participant.character_id(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: Option<String>,
    pub participants: Vec<ParticipantResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
