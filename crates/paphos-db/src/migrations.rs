use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (users, characters, chats)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE users (
                id                    TEXT PRIMARY KEY,
                email                 TEXT NOT NULL UNIQUE COLLATE NOCASE,
                hashed_password       TEXT NOT NULL,
                display_name          TEXT NOT NULL,
                role                  TEXT NOT NULL DEFAULT 'user'
                                      CHECK (role IN ('admin', 'user')),
                verification_token    TEXT,
                password_reset_token  TEXT,
                last_login            TEXT,
                created_at            TEXT NOT NULL,
                updated_at            TEXT NOT NULL
            );

            CREATE TABLE characters (
                id              TEXT PRIMARY KEY,
                name            TEXT NOT NULL,
                description     TEXT NOT NULL,
                avatar_id       TEXT,
                greeting        TEXT NOT NULL,
                persona         TEXT NOT NULL,
                world_scenario  TEXT,
                example_chats   TEXT,
                visibility      TEXT NOT NULL
                                CHECK (visibility IN ('public', 'unlisted', 'private')),
                creator_id      TEXT NOT NULL REFERENCES users(id),
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            );

            CREATE INDEX idx_characters_creator ON characters(creator_id);
            CREATE INDEX idx_characters_created ON characters(created_at);

            CREATE TABLE chats (
                id          TEXT PRIMARY KEY,
                owner_id    TEXT NOT NULL REFERENCES users(id),
                name        TEXT,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE INDEX idx_chats_owner ON chats(owner_id, created_at);

            CREATE TABLE chat_participants (
                id            TEXT PRIMARY KEY,
                chat_id       TEXT NOT NULL REFERENCES chats(id) ON DELETE CASCADE,
                user_id       TEXT REFERENCES users(id),
                character_id  TEXT REFERENCES characters(id) ON DELETE CASCADE,
                CHECK ((user_id IS NULL) <> (character_id IS NULL))
            );

            CREATE INDEX idx_chat_participants_chat ON chat_participants(chat_id);

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
