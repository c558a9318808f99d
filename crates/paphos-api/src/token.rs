//! Session token issuance and verification (HS256 JWT).

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use paphos_types::api::{Claims, TokenUser};

pub const TOKEN_LIFETIME_HOURS: i64 = 24;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token signing secret is not configured")]
    MissingSecret,

    #[error("malformed Authorization header")]
    MalformedHeader,

    #[error(transparent)]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenService {
    pub fn new(secret: &str) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }

        // Pin the algorithm so tokens claiming `none` or an asymmetric
        // algorithm never reach signature verification.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    pub fn issue(&self, user: TokenUser) -> Result<String, TokenError> {
        self.issue_at(user, Utc::now())
    }

    pub fn issue_at(&self, user: TokenUser, issued_at: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = Claims {
            user,
            iat: issued_at.timestamp(),
            exp: (issued_at + Duration::hours(TOKEN_LIFETIME_HOURS)).timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)?;
        Ok(data.claims)
    }
}

/// Extract the token from an `Authorization` header value.
///
/// The value must be exactly two space-separated parts, `Bearer <token>`.
pub fn bearer_token(header: &str) -> Result<&str, TokenError> {
    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None)
            if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() =>
        {
            Ok(token)
        }
        _ => Err(TokenError::MalformedHeader),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64URL;
    use jsonwebtoken::errors::ErrorKind;
    use uuid::Uuid;

    const SECRET: &str = "test-secret";

    fn user() -> TokenUser {
        TokenUser {
            id: Uuid::new_v4(),
            email: "user@example.com".into(),
            display_name: "Normal User".into(),
        }
    }

    fn jwt_kind(err: TokenError) -> ErrorKind {
        match err {
            TokenError::Jwt(e) => e.into_kind(),
            other => panic!("expected a JWT error, got {other:?}"),
        }
    }

    fn unsigned_token(alg: &str, claims: &Claims) -> String {
        let header = B64URL.encode(format!(r#"{{"alg":"{alg}","typ":"JWT"}}"#));
        let payload = B64URL.encode(serde_json::to_vec(claims).unwrap());
        format!("{header}.{payload}.")
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert!(matches!(TokenService::new(""), Err(TokenError::MissingSecret)));
    }

    #[test]
    fn issued_token_carries_identity() {
        let service = TokenService::new(SECRET).unwrap();
        let user = user();
        let token = service.issue(user.clone()).unwrap();

        let claims = service.verify(&token).unwrap();
        assert_eq!(claims.user, user);
        assert_eq!(claims.exp - claims.iat, TOKEN_LIFETIME_HOURS * 3600);
    }

    #[test]
    fn expired_token_is_rejected() {
        let service = TokenService::new(SECRET).unwrap();
        let issued_at = Utc::now() - Duration::hours(TOKEN_LIFETIME_HOURS) - Duration::minutes(1);
        let token = service.issue_at(user(), issued_at).unwrap();

        let err = service.verify(&token).unwrap_err();
        assert!(matches!(jwt_kind(err), ErrorKind::ExpiredSignature));
    }

    #[test]
    fn token_just_inside_lifetime_is_accepted() {
        let service = TokenService::new(SECRET).unwrap();
        let issued_at = Utc::now() - Duration::hours(TOKEN_LIFETIME_HOURS) + Duration::minutes(1);
        let token = service.issue_at(user(), issued_at).unwrap();
        assert!(service.verify(&token).is_ok());
    }

    #[test]
    fn token_from_another_secret_is_rejected() {
        let ours = TokenService::new(SECRET).unwrap();
        let theirs = TokenService::new("some-other-secret").unwrap();
        let token = theirs.issue(user()).unwrap();

        let err = ours.verify(&token).unwrap_err();
        assert!(matches!(jwt_kind(err), ErrorKind::InvalidSignature));
    }

    #[test]
    fn other_hmac_algorithm_is_rejected() {
        let service = TokenService::new(SECRET).unwrap();
        let claims = Claims {
            user: user(),
            iat: Utc::now().timestamp(),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        let err = service.verify(&token).unwrap_err();
        assert!(matches!(jwt_kind(err), ErrorKind::InvalidAlgorithm));
    }

    #[test]
    fn alg_none_and_asymmetric_headers_are_rejected() {
        let service = TokenService::new(SECRET).unwrap();
        let claims = Claims {
            user: user(),
            iat: Utc::now().timestamp(),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
        };

        assert!(service.verify(&unsigned_token("none", &claims)).is_err());
        assert!(service.verify(&unsigned_token("RS256", &claims)).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        let service = TokenService::new(SECRET).unwrap();
        assert!(service.verify("not.a.jwt").is_err());
        assert!(service.verify("").is_err());
    }

    #[test]
    fn bearer_header_must_have_exactly_two_parts() {
        assert_eq!(bearer_token("Bearer abc.def.ghi").unwrap(), "abc.def.ghi");
        assert_eq!(bearer_token("bearer abc").unwrap(), "abc");

        for bad in ["", "Bearer", "Bearer ", "abc.def.ghi", "Bearer a b", "Bearer  abc", "Basic abc"] {
            assert!(
                matches!(bearer_token(bad), Err(TokenError::MalformedHeader)),
                "accepted {bad:?}"
            );
        }
    }
}
