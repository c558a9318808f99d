use std::str::FromStr;

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use paphos_types::models::ParticipantRef;
use rusqlite::Row;
use rusqlite::types::Type;
use uuid::Uuid;

use crate::UnitOfWork;
use crate::models::{
    CharacterFields, CharacterRow, ChatParticipantRow, ChatRow, NewUser, Page, UserRow,
};
use crate::policy::{CHARACTER_ACCESSIBLE_SQL, CHARACTER_VISIBLE_SQL, CHAT_ACCESSIBLE_SQL};

const USER_COLUMNS: &str = "id, email, hashed_password, display_name, role, \
     verification_token, password_reset_token, last_login, created_at, updated_at";

const CHARACTER_COLUMNS: &str = "id, name, description, avatar_id, greeting, persona, \
     world_scenario, example_chats, visibility, creator_id, created_at, updated_at";

const CHAT_COLUMNS: &str = "id, owner_id, name, created_at, updated_at";

impl UnitOfWork<'_> {
    // -- Users --

    pub fn email_taken(&self, email: &str) -> Result<bool> {
        let taken = self.conn().query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)",
            [email],
            |row| row.get(0),
        )?;
        Ok(taken)
    }

    pub fn insert_user(&self, new: &NewUser<'_>) -> Result<UserRow> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        self.conn().execute(
            "INSERT INTO users (id, email, hashed_password, display_name, role, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            rusqlite::params![
                id.to_string(),
                new.email,
                new.hashed_password,
                new.display_name,
                new.role.as_str(),
                timestamp(now),
            ],
        )?;

        Ok(UserRow {
            id,
            email: new.email.to_string(),
            hashed_password: new.hashed_password.to_string(),
            display_name: new.display_name.to_string(),
            role: new.role,
            verification_token: None,
            password_reset_token: None,
            last_login: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Email comparison is case-insensitive (the column is `COLLATE NOCASE`).
    pub fn find_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
        self.conn()
            .query_row(&sql, [email], user_from_row)
            .optional()
    }

    pub fn record_login(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        self.conn().execute(
            "UPDATE users SET last_login = ?2, updated_at = ?2 WHERE id = ?1",
            rusqlite::params![user_id.to_string(), timestamp(at)],
        )?;
        Ok(())
    }

    // -- Characters --

    pub fn list_visible_characters(&self, actor: Uuid, page: Page) -> Result<Vec<CharacterRow>> {
        let sql = format!(
            "SELECT {CHARACTER_COLUMNS} FROM characters
             WHERE {CHARACTER_VISIBLE_SQL}
             ORDER BY created_at, rowid
             LIMIT ?2 OFFSET ?3"
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt
            .query_map(
                rusqlite::params![actor.to_string(), page.limit(), page.offset()],
                character_from_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn find_visible_character(&self, actor: Uuid, id: Uuid) -> Result<Option<CharacterRow>> {
        self.find_scoped_character(CHARACTER_VISIBLE_SQL, actor, id)
    }

    pub fn find_accessible_character(
        &self,
        actor: Uuid,
        id: Uuid,
    ) -> Result<Option<CharacterRow>> {
        self.find_scoped_character(CHARACTER_ACCESSIBLE_SQL, actor, id)
    }

    fn find_scoped_character(
        &self,
        scope: &str,
        actor: Uuid,
        id: Uuid,
    ) -> Result<Option<CharacterRow>> {
        let sql = format!("SELECT {CHARACTER_COLUMNS} FROM characters WHERE {scope} AND id = ?2");
        self.conn()
            .query_row(
                &sql,
                rusqlite::params![actor.to_string(), id.to_string()],
                character_from_row,
            )
            .optional()
    }

    /// Unscoped lookup. Callers must apply the policy themselves.
    pub fn find_character(&self, id: Uuid) -> Result<Option<CharacterRow>> {
        let sql = format!("SELECT {CHARACTER_COLUMNS} FROM characters WHERE id = ?1");
        self.conn()
            .query_row(&sql, [id.to_string()], character_from_row)
            .optional()
    }

    pub fn insert_character(&self, creator_id: Uuid, fields: &CharacterFields) -> Result<CharacterRow> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        self.conn().execute(
            "INSERT INTO characters (id, name, description, avatar_id, greeting, persona,
                                     world_scenario, example_chats, visibility, creator_id,
                                     created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
            rusqlite::params![
                id.to_string(),
                fields.name,
                fields.description,
                fields.avatar_id,
                fields.greeting,
                fields.persona,
                fields.world_scenario,
                fields.example_chats,
                fields.visibility.as_str(),
                creator_id.to_string(),
                timestamp(now),
            ],
        )?;

        Ok(CharacterRow {
            id,
            name: fields.name.clone(),
            description: fields.description.clone(),
            avatar_id: fields.avatar_id.clone(),
            greeting: fields.greeting.clone(),
            persona: fields.persona.clone(),
            world_scenario: fields.world_scenario.clone(),
            example_chats: fields.example_chats.clone(),
            visibility: fields.visibility,
            creator_id,
            created_at: now,
            updated_at: now,
        })
    }

    /// Overwrites the client-settable fields. `creator_id` is never touched.
    pub fn update_character(&self, id: Uuid, fields: &CharacterFields) -> Result<Option<CharacterRow>> {
        let changed = self.conn().execute(
            "UPDATE characters
             SET name = ?2, description = ?3, avatar_id = ?4, greeting = ?5, persona = ?6,
                 world_scenario = ?7, example_chats = ?8, visibility = ?9, updated_at = ?10
             WHERE id = ?1",
            rusqlite::params![
                id.to_string(),
                fields.name,
                fields.description,
                fields.avatar_id,
                fields.greeting,
                fields.persona,
                fields.world_scenario,
                fields.example_chats,
                fields.visibility.as_str(),
                timestamp(Utc::now()),
            ],
        )?;

        if changed == 0 {
            return Ok(None);
        }
        self.find_character(id)
    }

    pub fn delete_character(&self, id: Uuid) -> Result<bool> {
        let deleted = self
            .conn()
            .execute("DELETE FROM characters WHERE id = ?1", [id.to_string()])?;
        Ok(deleted > 0)
    }

    // -- Chats --

    pub fn insert_chat(&self, owner_id: Uuid, name: Option<&str>) -> Result<ChatRow> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        self.conn().execute(
            "INSERT INTO chats (id, owner_id, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)",
            rusqlite::params![id.to_string(), owner_id.to_string(), name, timestamp(now)],
        )?;

        Ok(ChatRow {
            id,
            owner_id,
            name: name.map(str::to_string),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn insert_participant(
        &self,
        chat_id: Uuid,
        participant: ParticipantRef,
    ) -> Result<ChatParticipantRow> {
        let id = Uuid::new_v4();
        self.conn().execute(
            "INSERT INTO chat_participants (id, chat_id, user_id, character_id) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                id.to_string(),
                chat_id.to_string(),
                participant.user_id().map(|u| u.to_string()),
                participant.character_id().map(|c| c.to_string()),
            ],
        )?;

        Ok(ChatParticipantRow {
            id,
            chat_id,
            participant,
        })
    }

    pub fn list_accessible_chats(&self, actor: Uuid, page: Page) -> Result<Vec<ChatRow>> {
        let sql = format!(
            "SELECT {CHAT_COLUMNS} FROM chats
             WHERE {CHAT_ACCESSIBLE_SQL}
             ORDER BY created_at, rowid
             LIMIT ?2 OFFSET ?3"
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt
            .query_map(
                rusqlite::params![actor.to_string(), page.limit(), page.offset()],
                chat_from_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn find_accessible_chat(&self, actor: Uuid, id: Uuid) -> Result<Option<ChatRow>> {
        let sql = format!("SELECT {CHAT_COLUMNS} FROM chats WHERE {CHAT_ACCESSIBLE_SQL} AND id = ?2");
        self.conn()
            .query_row(
                &sql,
                rusqlite::params![actor.to_string(), id.to_string()],
                chat_from_row,
            )
            .optional()
    }

    pub fn rename_chat(&self, id: Uuid, name: Option<&str>) -> Result<DateTime<Utc>> {
        let now = Utc::now();
        self.conn().execute(
            "UPDATE chats SET name = ?2, updated_at = ?3 WHERE id = ?1",
            rusqlite::params![id.to_string(), name, timestamp(now)],
        )?;
        Ok(now)
    }

    /// Batch-fetch participants for a set of chats, in insertion order.
    pub fn participants_for_chats(&self, chat_ids: &[Uuid]) -> Result<Vec<ChatParticipantRow>> {
        if chat_ids.is_empty() {
            return Ok(vec![]);
        }

        let placeholders: Vec<String> = (1..=chat_ids.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "SELECT id, chat_id, user_id, character_id FROM chat_participants
             WHERE chat_id IN ({})
             ORDER BY rowid",
            placeholders.join(", ")
        );

        let ids: Vec<String> = chat_ids.iter().map(Uuid::to_string).collect();
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(ids.iter()), participant_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

/// Fixed-width RFC 3339 so TEXT ordering matches chronological ordering.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn parsed<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion_error(idx, e))
}

fn parsed_opt<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| s.parse().map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: parsed(row, 0)?,
        email: row.get(1)?,
        hashed_password: row.get(2)?,
        display_name: row.get(3)?,
        role: parsed(row, 4)?,
        verification_token: row.get(5)?,
        password_reset_token: row.get(6)?,
        last_login: parsed_opt(row, 7)?,
        created_at: parsed(row, 8)?,
        updated_at: parsed(row, 9)?,
    })
}

fn character_from_row(row: &Row<'_>) -> rusqlite::Result<CharacterRow> {
    Ok(CharacterRow {
        id: parsed(row, 0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        avatar_id: row.get(3)?,
        greeting: row.get(4)?,
        persona: row.get(5)?,
        world_scenario: row.get(6)?,
        example_chats: row.get(7)?,
        visibility: parsed(row, 8)?,
        creator_id: parsed(row, 9)?,
        created_at: parsed(row, 10)?,
        updated_at: parsed(row, 11)?,
    })
}

fn chat_from_row(row: &Row<'_>) -> rusqlite::Result<ChatRow> {
    Ok(ChatRow {
        id: parsed(row, 0)?,
        owner_id: parsed(row, 1)?,
        name: row.get(2)?,
        created_at: parsed(row, 3)?,
        updated_at: parsed(row, 4)?,
    })
}

fn participant_from_row(row: &Row<'_>) -> rusqlite::Result<ChatParticipantRow> {
    let user_id: Option<Uuid> = parsed_opt(row, 2)?;
    let character_id: Option<Uuid> = parsed_opt(row, 3)?;
    let participant = match (user_id, character_id) {
        (Some(user), None) => ParticipantRef::User(user),
        (None, Some(character)) => ParticipantRef::Character(character),
        _ => {
            return Err(rusqlite::Error::InvalidColumnType(
                2,
                "user_id/character_id".into(),
                Type::Null,
            ));
        }
    };

    Ok(ChatParticipantRow {
        id: parsed(row, 0)?,
        chat_id: parsed(row, 1)?,
        participant,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
