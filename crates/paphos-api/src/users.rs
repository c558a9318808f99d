use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use tracing::info;

use paphos_db::is_unique_violation;
use paphos_db::models::NewUser;
use paphos_types::api::{LoginRequest, LoginResponse, RegisterRequest, TokenUser, UserResponse};
use paphos_types::models::Role;

use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::state::{AppState, blocking};
use crate::validation::{EMAIL_TAKEN, normalize_email, validate_registration};

pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = normalize_email(&req.email);
    let mut errors = validate_registration(&email, &req);

    // Checked before hashing so a taken email doesn't cost a bcrypt round.
    if !email.is_empty() {
        let lookup = email.clone();
        if state.transact(move |uow| Ok(uow.email_taken(&lookup)?)).await? {
            errors.add("email", EMAIL_TAKEN);
        }
    }
    errors.into_result()?;

    let credentials = state.credentials.clone();
    let password = req.password;
    let hashed_password = blocking(move || Ok(credentials.hash(&password)?)).await?;

    let display_name = req.display_name;
    let user = state
        .transact(move |uow| {
            uow.insert_user(&NewUser {
                email: &email,
                hashed_password: &hashed_password,
                display_name: &display_name,
                role: Role::User,
            })
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ApiError::Conflict(EMAIL_TAKEN.to_string())
                } else {
                    e.into()
                }
            })
        })
        .await?;

    info!(user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            id: user.id,
            email: user.email,
            display_name: user.display_name,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = normalize_email(&req.email);
    let credentials = state.credentials.clone();

    // Unknown email and wrong password are indistinguishable to the caller,
    // in body and in time spent.
    let user = state
        .transact(move |uow| {
            let user = uow.find_user_by_email(&email)?;
            let stored_hash = user.as_ref().map(|u| u.hashed_password.as_str());
            if !credentials.verify_account(&req.password, stored_hash)? {
                return Err(ApiError::InvalidCredentials);
            }
            let user = user.ok_or(ApiError::InvalidCredentials)?;
            uow.record_login(user.id, Utc::now())?;
            Ok(user)
        })
        .await?;

    let jwt = state.tokens.issue(TokenUser {
        id: user.id,
        email: user.email.clone(),
        display_name: user.display_name.clone(),
    })?;

    info!(user_id = %user.id, "User logged in");

    Ok((
        StatusCode::CREATED,
        Json(LoginResponse {
            id: user.id,
            email: user.email,
            display_name: user.display_name,
            jwt,
        }),
    ))
}
