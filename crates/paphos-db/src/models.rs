//! Database row types. Ids and timestamps are stored as TEXT and parsed back
//! into typed values when a row is read.

use chrono::{DateTime, Utc};
use paphos_types::models::{ParticipantRef, Role, Visibility};
use uuid::Uuid;

pub const DEFAULT_PER_PAGE: u32 = 20;
pub const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub hashed_password: String,
    pub display_name: String,
    pub role: Role,
    pub verification_token: Option<String>,
    pub password_reset_token: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct NewUser<'a> {
    pub email: &'a str,
    pub hashed_password: &'a str,
    pub display_name: &'a str,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct CharacterRow {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub avatar_id: Option<String>,
    pub greeting: String,
    pub persona: String,
    pub world_scenario: Option<String>,
    pub example_chats: Option<String>,
    pub visibility: Visibility,
    pub creator_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Character fields a client can set. `creator_id` is supplied separately on
/// insert and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterFields {
    pub name: String,
    pub description: String,
    pub avatar_id: Option<String>,
    pub greeting: String,
    pub persona: String,
    pub world_scenario: Option<String>,
    pub example_chats: Option<String>,
    pub visibility: Visibility,
}

impl CharacterRow {
    pub fn fields(&self) -> CharacterFields {
        CharacterFields {
            name: self.name.clone(),
            description: self.description.clone(),
            avatar_id: self.avatar_id.clone(),
            greeting: self.greeting.clone(),
            persona: self.persona.clone(),
            world_scenario: self.world_scenario.clone(),
            example_chats: self.example_chats.clone(),
            visibility: self.visibility,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ChatParticipantRow {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub participant: ParticipantRef,
}

/// A page of results. `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub per_page: u32,
}

impl Page {
    /// Clamps out-of-range values instead of rejecting them.
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.per_page)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}
