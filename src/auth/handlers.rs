use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, routing::post, Json, Router};
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{MessageResponse, RegisterRequest, ResendRequest, VerifyRequest},
        password::is_strong_password,
        repo::RepoError,
        repo_types::NewUser,
        services::{code_expiry, codes_match, generate_code, hash_password_blocking},
    },
    error::ApiError,
    mail::verification_email,
    state::AppState,
};

pub const ALL_FIELDS_REQUIRED: &str = "all fields required";
pub const WEAK_PASSWORD: &str = "password must be at least 8 characters including letters and numbers";
pub const ALREADY_EXISTS: &str = "user or email already exists";
pub const INCORRECT_CODE: &str = "incorrect code or email";
pub const CODE_EXPIRED: &str = "verification code expired, request a new one";

pub fn register_routes() -> Router<AppState> {
    Router::new().route("/register", post(register))
}

pub fn verification_routes() -> Router<AppState> {
    Router::new()
        .route("/verificar", post(verify))
        .route("/reenviar", post(resend_code))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let Json(payload) = payload?;

    let (Some(username), Some(email), Some(password)) = (
        non_empty(payload.username),
        non_empty(payload.email),
        non_empty(payload.password),
    ) else {
        warn!("registration with missing fields");
        return Err(ApiError::BadRequest(ALL_FIELDS_REQUIRED));
    };

    if !is_strong_password(&password) {
        warn!("weak password");
        return Err(ApiError::BadRequest(WEAK_PASSWORD));
    }

    let password_hash = hash_password_blocking(password, state.config.password_iterations).await?;

    let verification = &state.config.verification;
    let code = verification.enabled.then(generate_code);
    let code_expires_at = code
        .as_ref()
        .map(|_| code_expiry(OffsetDateTime::now_utc(), verification.code_ttl_minutes));

    let user = match state
        .users
        .insert(NewUser {
            username,
            email,
            password_hash,
            verification_code: code.clone(),
            code_expires_at,
        })
        .await
    {
        Ok(u) => u,
        Err(RepoError::Duplicate) => {
            warn!("username or email already registered");
            return Err(ApiError::BadRequest(ALREADY_EXISTS));
        }
        Err(e) => {
            error!(error = %e, "create user failed");
            return Err(e.into());
        }
    };
    info!(user_id = %user.id, username = %user.username, "user registered");

    let Some(code) = code else {
        return Ok((StatusCode::CREATED, Json(MessageResponse { message: "registered" })));
    };

    // The row stays committed; the account can recover through /reenviar.
    let (subject, html) = verification_email(&user.username, &code);
    state
        .mailer
        .send(&user.email, &subject, &html)
        .await
        .map_err(|e| ApiError::Internal(anyhow::Error::new(e).context("send verification mail")))?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "registered, verification code sent",
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn verify(
    State(state): State<AppState>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(payload) = payload?;
    let (Some(email), Some(code)) = (non_empty(payload.email), non_empty(payload.code)) else {
        return Err(ApiError::BadRequest(INCORRECT_CODE));
    };

    let user = match state.users.find_by_email(&email).await? {
        Some(u) => u,
        None => {
            warn!(%email, "verification for unknown email");
            return Err(ApiError::BadRequest(INCORRECT_CODE));
        }
    };
    if user.verified || user.verification_code.is_none() {
        warn!(user_id = %user.id, "verification without pending code");
        return Err(ApiError::BadRequest(INCORRECT_CODE));
    }

    // Limit and expiry are enforced by the store while the guess is counted.
    let Some(stored) = state
        .users
        .claim_attempt(user.id, state.config.verification.max_attempts)
        .await?
    else {
        warn!(user_id = %user.id, "verification code exhausted or expired");
        return Err(ApiError::BadRequest(CODE_EXPIRED));
    };

    if !codes_match(&code, &stored) {
        warn!(user_id = %user.id, "wrong verification code");
        return Err(ApiError::BadRequest(INCORRECT_CODE));
    }

    if !state.users.mark_verified(user.id, &code).await? {
        warn!(user_id = %user.id, "verification raced with another request");
        return Err(ApiError::BadRequest(INCORRECT_CODE));
    }

    info!(user_id = %user.id, "account verified");
    Ok(Json(MessageResponse {
        message: "account verified",
    }))
}

#[instrument(skip(state, payload))]
pub async fn resend_code(
    State(state): State<AppState>,
    payload: Result<Json<ResendRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    const SENT: MessageResponse = MessageResponse {
        message: "if the account exists and is unverified, a new code was sent",
    };

    let Json(payload) = payload?;
    let Some(email) = non_empty(payload.email) else {
        return Err(ApiError::BadRequest(ALL_FIELDS_REQUIRED));
    };

    let user = match state.users.find_by_email(&email).await? {
        Some(u) if !u.verified => u,
        _ => {
            warn!(%email, "code resend for unknown or verified account");
            return Ok(Json(SENT));
        }
    };

    let code = generate_code();
    let expires_at = code_expiry(
        OffsetDateTime::now_utc(),
        state.config.verification.code_ttl_minutes,
    );
    if !state.users.replace_code(user.id, &code, expires_at).await? {
        return Ok(Json(SENT));
    }

    let (subject, html) = verification_email(&user.username, &code);
    state
        .mailer
        .send(&user.email, &subject, &html)
        .await
        .map_err(|e| ApiError::Internal(anyhow::Error::new(e).context("resend verification mail")))?;

    info!(user_id = %user.id, "verification code reissued");
    Ok(Json(SENT))
}
