use subtle::ConstantTimeEq;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        tokens::{generate_token, RESET_TOKEN_LEN, VERIFY_TOKEN_LEN},
    },
    error::{AppError, AppResult},
    riders::documents::{self, RiderSignup},
    state::AppState,
    users::{UserKind, UserRecord},
};

pub const RESET_TOKEN_TTL: TimeDuration = TimeDuration::hours(24);

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Everything needed to open an account of either kind.
#[derive(Debug, Clone)]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    /// Required for riders, ignored for customers.
    pub rider: Option<RiderSignup>,
}

pub async fn register(state: &AppState, kind: UserKind, reg: Registration) -> AppResult<UserRecord> {
    state
        .password_policy()
        .check(&reg.password)
        .map_err(AppError::validation)?;

    let email = normalize_email(&reg.email);
    if state
        .users
        .find_by_email_or_phone(kind, &email, &reg.phone)
        .await?
        .is_some()
    {
        warn!(%email, kind = kind.label(), "account already exists");
        return Err(AppError::Conflict("This account already exists".into()));
    }

    let id = Uuid::new_v4();
    let password_hash = hash_password(&reg.password)?;

    let rider = match (kind, &reg.rider) {
        (UserKind::Rider, Some(signup)) => Some(documents::store(state, id, signup).await?),
        (UserKind::Rider, None) => {
            return Err(AppError::validation("Rider registration requires city and documents"))
        }
        (UserKind::Customer, _) => None,
    };

    let token = generate_token(VERIFY_TOKEN_LEN);
    let now = OffsetDateTime::now_utc();
    let user = UserRecord {
        id,
        first_name: reg.first_name,
        last_name: reg.last_name,
        email,
        phone: reg.phone,
        password_hash,
        role: kind.role(),
        is_verified: false,
        verify_email_token: token.clone(),
        reset_token: None,
        reset_token_expiry: None,
        rider,
        created_at: now,
        updated_at: now,
    };

    if let Err(e) = state.users.insert(&user).await {
        if let Some(details) = &user.rider {
            documents::discard(state, details).await;
        }
        return Err(e.into());
    }
    info!(user_id = %user.id, kind = kind.label(), "user registered");

    // The account exists either way; a lost email can be re-requested.
    if state.notifier.send_registration(&user, &token).await.is_err() {
        warn!(user_id = %user.id, "registration email not delivered");
    }

    Ok(user)
}

/// Checks credentials and issues a session token.
pub async fn login(
    state: &AppState,
    kind: UserKind,
    email: &str,
    password: &str,
) -> AppResult<(UserRecord, String)> {
    let email = email.trim();
    let user = state
        .users
        .find_by_email(kind, email)
        .await?
        .ok_or_else(|| {
            warn!(%email, kind = kind.label(), "login unknown email");
            AppError::NotFound(format!("{} not found.", kind.label()))
        })?;

    if state.config.login.requires_verification(kind) && !user.is_verified {
        warn!(user_id = %user.id, "login before email verification");
        return Err(AppError::Unauthorized(
            "You are not verified. Please verify your email address.".into(),
        ));
    }

    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthorized("Incorrect password.".into()));
    }

    let token = JwtKeys::from(&state.config.jwt).sign(&user)?;
    info!(user_id = %user.id, kind = kind.label(), "user logged in");
    Ok((user, token))
}

/// Marks the email verified. With `user_id` the token is checked against that
/// account; without it the token alone identifies the account.
pub async fn verify_email(
    state: &AppState,
    kind: UserKind,
    token: &str,
    user_id: Option<Uuid>,
) -> AppResult<UserRecord> {
    if token.is_empty() {
        return Err(AppError::validation("token is required"));
    }

    let mut user = match user_id {
        Some(id) => {
            let user = state
                .users
                .find_by_id(kind, id)
                .await?
                .ok_or_else(|| AppError::NotFound("User not found or token is invalid.".into()))?;
            let matches = !user.verify_email_token.is_empty()
                && bool::from(user.verify_email_token.as_bytes().ct_eq(token.as_bytes()));
            if !matches {
                warn!(user_id = %id, "verification token mismatch");
                return Err(AppError::Unauthorized("Token is invalid".into()));
            }
            user
        }
        None => state
            .users
            .find_by_verify_token(kind, token)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found or token is invalid.".into()))?,
    };

    user.is_verified = true;
    user.verify_email_token = String::new();
    user.updated_at = OffsetDateTime::now_utc();
    state.users.save(&user).await?;
    info!(user_id = %user.id, kind = kind.label(), "email verified");
    Ok(user)
}

/// Issues a fresh reset token valid for 24 hours and mails the link.
pub async fn forgot_password(
    state: &AppState,
    kind: UserKind,
    email: &str,
    now: OffsetDateTime,
) -> AppResult<()> {
    let email = email.trim();
    let mut user = state
        .users
        .find_by_email(kind, email)
        .await?
        .ok_or_else(|| {
            AppError::NotFound("No valid user found with the provided email address.".into())
        })?;

    let token = generate_token(RESET_TOKEN_LEN);
    user.reset_token = Some(token.clone());
    user.reset_token_expiry = Some(now + RESET_TOKEN_TTL);
    user.updated_at = now;
    state.users.save(&user).await?;

    state
        .notifier
        .send_password_reset(&user, &token)
        .await
        .map_err(|e| {
            AppError::Internal(
                e.context("Failed to send reset password email. Please try again later."),
            )
        })?;
    info!(user_id = %user.id, kind = kind.label(), "password reset issued");
    Ok(())
}

/// Replaces the password if `token` is a live reset token. A rejected new
/// password leaves the token usable until it expires.
pub async fn reset_password(
    state: &AppState,
    kind: UserKind,
    token: &str,
    new_password: &str,
    now: OffsetDateTime,
) -> AppResult<()> {
    let mut user = state
        .users
        .find_by_reset_token(kind, token, now)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(
                "No reset token found for this user or the token has expired.".into(),
            )
        })?;

    state
        .password_policy()
        .check(new_password)
        .map_err(AppError::validation)?;

    user.password_hash = hash_password(new_password)?;
    user.reset_token = Some(String::new());
    user.reset_token_expiry = Some(OffsetDateTime::UNIX_EPOCH);
    user.updated_at = now;
    state.users.save(&user).await?;
    info!(user_id = %user.id, kind = kind.label(), "password reset");
    Ok(())
}
