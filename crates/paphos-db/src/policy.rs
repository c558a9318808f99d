//! Who may read or use which records.
//!
//! "Visible" means a character shows up in listings and detail fetches.
//! "Accessible" is broader: unlisted characters can be attached to a chat by
//! anyone who has their id, even though they are never listed.
//!
//! Each predicate has a SQL twin used when building scoped queries. The SQL
//! fragments bind the acting user's id as `?1`, so every scoped statement
//! must pass the actor as its first parameter.

use paphos_types::models::Visibility;
use uuid::Uuid;

use crate::models::{CharacterRow, ChatRow};

pub const CHARACTER_VISIBLE_SQL: &str = "(visibility = 'public' OR creator_id = ?1)";

pub const CHARACTER_ACCESSIBLE_SQL: &str =
    "(visibility IN ('public', 'unlisted') OR creator_id = ?1)";

pub const CHAT_ACCESSIBLE_SQL: &str = "(owner_id = ?1)";

pub fn character_visible_to(actor: Uuid, character: &CharacterRow) -> bool {
    character.visibility == Visibility::Public || character.creator_id == actor
}

pub fn character_accessible_to(actor: Uuid, character: &CharacterRow) -> bool {
    matches!(character.visibility, Visibility::Public | Visibility::Unlisted)
        || character.creator_id == actor
}

pub fn character_owned_by(actor: Uuid, character: &CharacterRow) -> bool {
    character.creator_id == actor
}

/// Chats are single-user for now: only the owner can access one.
pub fn chat_accessible_to(actor: Uuid, chat: &ChatRow) -> bool {
    chat.owner_id == actor
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn character(creator_id: Uuid, visibility: Visibility) -> CharacterRow {
        CharacterRow {
            id: Uuid::new_v4(),
            name: "Test".into(),
            description: "A test character".into(),
            avatar_id: None,
            greeting: "Hello".into(),
            persona: "A test persona".into(),
            world_scenario: None,
            example_chats: None,
            visibility,
            creator_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn creator_sees_and_uses_everything() {
        let creator = Uuid::new_v4();
        for visibility in Visibility::ALL {
            let c = character(creator, visibility);
            assert!(character_visible_to(creator, &c));
            assert!(character_accessible_to(creator, &c));
        }
    }

    #[test]
    fn others_see_public_only() {
        let creator = Uuid::new_v4();
        let other = Uuid::new_v4();
        assert!(character_visible_to(other, &character(creator, Visibility::Public)));
        assert!(!character_visible_to(other, &character(creator, Visibility::Unlisted)));
        assert!(!character_visible_to(other, &character(creator, Visibility::Private)));
    }

    #[test]
    fn others_can_use_public_and_unlisted() {
        let creator = Uuid::new_v4();
        let other = Uuid::new_v4();
        assert!(character_accessible_to(other, &character(creator, Visibility::Public)));
        assert!(character_accessible_to(other, &character(creator, Visibility::Unlisted)));
        assert!(!character_accessible_to(other, &character(creator, Visibility::Private)));
    }

    #[test]
    fn accessible_is_a_superset_of_visible() {
        let creator = Uuid::new_v4();
        let actors = [creator, Uuid::new_v4()];
        for visibility in Visibility::ALL {
            let c = character(creator, visibility);
            for actor in actors {
                if character_visible_to(actor, &c) {
                    assert!(character_accessible_to(actor, &c));
                }
            }
        }
    }

    #[test]
    fn chat_is_owner_only() {
        let owner = Uuid::new_v4();
        let chat = ChatRow {
            id: Uuid::new_v4(),
            owner_id: owner,
            name: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(chat_accessible_to(owner, &chat));
        assert!(!chat_accessible_to(Uuid::new_v4(), &chat));
    }
}
