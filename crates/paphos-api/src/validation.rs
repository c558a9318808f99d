//! Field validation for request bodies.
//!
//! Validators collect every problem into [`FieldErrors`] instead of stopping
//! at the first one, so clients can show all messages next to their inputs.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use paphos_db::models::CharacterFields;
use paphos_types::api::RegisterRequest;
use paphos_types::models::Visibility;

use crate::error::ApiError;

static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

pub const EMAIL_TAKEN: &str = "An account with this email already exists.";
pub const PASSWORDS_DO_NOT_MATCH: &str = "Passwords do not match.";

/// Messages keyed by field name, serialized as `{"field": ["msg", ...]}`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn into_result(self) -> Result<(), ApiError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self))
        }
    }

    /// A single-field error, already wrapped for returning from a handler.
    pub fn single(field: &str, message: impl Into<String>) -> ApiError {
        let mut errors = Self::default();
        errors.add(field, message);
        ApiError::Validation(errors)
    }
}

/// Presence plus length in characters. Blank values only get the blank message.
fn check_length(errors: &mut FieldErrors, field: &str, label: &str, value: &str, min: usize, max: usize) {
    let len = value.chars().count();
    if min > 0 && value.trim().is_empty() {
        errors.add(field, format!("{label} can not be blank."));
    } else if len < min || len > max {
        errors.add(
            field,
            format!("{label} must be between {min} and {max} characters."),
        );
    }
}

/// Canonical form used for storage and lookups.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Field checks for a registration. `email` must already be normalized.
///
/// Returned unwrapped so the caller can add the email uniqueness check to
/// the same set of messages.
pub fn validate_registration(email: &str, req: &RegisterRequest) -> FieldErrors {
    let mut errors = FieldErrors::default();

    if email.is_empty() {
        errors.add("email", "Email can not be blank.");
    } else {
        if !EMAIL_REGEX.is_match(email) {
            errors.add("email", "Email does not match the email format.");
        }
        check_length(&mut errors, "email", "Email", email, 8, 96);
    }

    check_length(&mut errors, "display_name", "Display name", &req.display_name, 2, 64);

    if req.password.is_empty() {
        errors.add("password", "Password can not be blank.");
    }
    if req.password_confirmation.is_empty() {
        errors.add("password_confirmation", "Password confirmation can not be blank.");
    }
    if req.password != req.password_confirmation {
        errors.add("password_confirmation", PASSWORDS_DO_NOT_MATCH);
    }

    errors
}

/// A character as the client wants it stored, before validation. For updates
/// this is the stored record with the request's fields laid over it.
#[derive(Debug, Default, Clone)]
pub struct CharacterDraft {
    pub name: String,
    pub description: String,
    pub avatar_id: Option<String>,
    pub greeting: String,
    pub persona: String,
    pub world_scenario: Option<String>,
    pub example_chats: Option<String>,
    pub visibility: String,
}

impl From<CharacterFields> for CharacterDraft {
    fn from(fields: CharacterFields) -> Self {
        Self {
            name: fields.name,
            description: fields.description,
            avatar_id: fields.avatar_id,
            greeting: fields.greeting,
            persona: fields.persona,
            world_scenario: fields.world_scenario,
            example_chats: fields.example_chats,
            visibility: fields.visibility.as_str().to_string(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

pub fn validate_character(draft: CharacterDraft) -> Result<CharacterFields, ApiError> {
    let mut errors = FieldErrors::default();

    check_length(&mut errors, "name", "Name", &draft.name, 1, 32);
    check_length(&mut errors, "description", "Description", &draft.description, 12, 64);
    check_length(&mut errors, "greeting", "Greeting", &draft.greeting, 2, 1024);
    check_length(&mut errors, "persona", "Persona", &draft.persona, 12, 1024);
    if let Some(scenario) = &draft.world_scenario {
        check_length(&mut errors, "world_scenario", "World scenario", scenario, 0, 1024);
    }
    if let Some(examples) = &draft.example_chats {
        check_length(&mut errors, "example_chats", "Example chats", examples, 0, 1024);
    }

    let visibility = match draft.visibility.parse::<Visibility>() {
        Ok(visibility) if errors.is_empty() => visibility,
        parsed => {
            if parsed.is_err() {
                let allowed: Vec<&str> = Visibility::ALL.iter().map(|v| v.as_str()).collect();
                errors.add(
                    "visibility",
                    format!("Visibility must be one of: {}.", allowed.join(", ")),
                );
            }
            return Err(ApiError::Validation(errors));
        }
    };

    Ok(CharacterFields {
        name: draft.name,
        description: draft.description,
        avatar_id: non_empty(draft.avatar_id),
        greeting: draft.greeting,
        persona: draft.persona,
        world_scenario: non_empty(draft.world_scenario),
        example_chats: non_empty(draft.example_chats),
        visibility,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(email: &str, name: &str, pw: &str, confirm: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.into(),
            display_name: name.into(),
            password: pw.into(),
            password_confirmation: confirm.into(),
        }
    }

    fn field_errors(result: Result<impl std::fmt::Debug, ApiError>) -> FieldErrors {
        match result {
            Err(ApiError::Validation(errors)) => errors,
            other => panic!("expected validation errors, got {other:?}"),
        }
    }

    fn draft() -> CharacterDraft {
        CharacterDraft {
            name: "Aphrodite".into(),
            description: "Goddess of love and beauty".into(),
            avatar_id: None,
            greeting: "Hello, mortal.".into(),
            persona: "Vain, warm, easily flattered.".into(),
            world_scenario: None,
            example_chats: None,
            visibility: "public".into(),
        }
    }

    #[test]
    fn email_is_normalized() {
        assert_eq!(normalize_email("  User@Example.COM "), "user@example.com");
    }

    #[test]
    fn valid_registration_passes() {
        let req = registration("user@example.com", "Normal User", "hunter22", "hunter22");
        assert!(validate_registration("user@example.com", &req).is_empty());
    }

    #[test]
    fn mismatched_passwords_are_a_field_error() {
        let req = registration("user@example.com", "Normal User", "hunter22", "hunter23");
        let errors = validate_registration("user@example.com", &req);
        assert_eq!(
            errors.get("password_confirmation"),
            Some(&[PASSWORDS_DO_NOT_MATCH.to_string()][..])
        );
    }

    #[test]
    fn registration_reports_every_bad_field() {
        let req = registration("", "x", "", "");
        let errors = validate_registration("", &req);
        assert!(errors.get("email").is_some());
        assert!(errors.get("display_name").is_some());
        assert!(errors.get("password").is_some());
        assert!(errors.get("password_confirmation").is_some());
    }

    #[test]
    fn email_format_and_length() {
        let req = registration("", "Normal User", "pw", "pw");
        let errors = validate_registration("not-an-email", &req);
        assert!(errors.get("email").is_some());

        let errors = validate_registration("a@b.io", &req);
        assert_eq!(
            errors.get("email"),
            Some(&["Email must be between 8 and 96 characters.".to_string()][..])
        );
    }

    #[test]
    fn valid_character_passes_and_normalizes_optionals() {
        let mut d = draft();
        d.world_scenario = Some(String::new());
        d.avatar_id = Some("avatar-1".into());

        let fields = validate_character(d).unwrap();
        assert_eq!(fields.visibility, Visibility::Public);
        assert_eq!(fields.world_scenario, None);
        assert_eq!(fields.avatar_id.as_deref(), Some("avatar-1"));
    }

    #[test]
    fn character_lengths_count_characters_not_bytes() {
        let mut d = draft();
        d.name = "é".repeat(32);
        assert!(validate_character(d).is_ok());

        let mut d = draft();
        d.name = "é".repeat(33);
        let errors = field_errors(validate_character(d));
        assert!(errors.get("name").is_some());
    }

    #[test]
    fn character_errors_cover_each_field() {
        let d = CharacterDraft {
            description: "too short".into(),
            greeting: "x".into(),
            example_chats: Some("x".repeat(1025)),
            visibility: "secret".into(),
            ..CharacterDraft::default()
        };
        let errors = field_errors(validate_character(d));

        assert_eq!(errors.get("name"), Some(&["Name can not be blank.".to_string()][..]));
        assert!(errors.get("description").is_some());
        assert!(errors.get("greeting").is_some());
        assert!(errors.get("persona").is_some());
        assert!(errors.get("example_chats").is_some());
        assert_eq!(
            errors.get("visibility"),
            Some(&["Visibility must be one of: public, unlisted, private.".to_string()][..])
        );
    }

    #[test]
    fn field_errors_serialize_as_a_plain_map() {
        let mut errors = FieldErrors::default();
        errors.add("email", "one");
        errors.add("email", "two");
        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            serde_json::json!({ "email": ["one", "two"] })
        );
    }
}
