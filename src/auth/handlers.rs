use axum::{
    body::Bytes,
    extract::State,
    http::header,
    response::IntoResponse,
    routing::post,
    Extension, Json, Router,
};
use time::OffsetDateTime;
use tracing::instrument;

use crate::{
    auth::{
        dto::{
            ForgotPasswordRequest, LoginRequest, LoginResponse, MessageResponse, RegisterRequest,
            RegisterResponse, ResetPasswordRequest, SessionProfile, TokenQuery, VerifyEmailRequest,
            VerifyEmailResponse,
        },
        jwt::JwtKeys,
        services::{self, Registration},
    },
    error::{AppError, AppResult, Issue},
    extract::{ValidQuery, ValidatedJson},
    state::AppState,
    users::{PublicUser, UserKind},
};

pub fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/register-customer", post(register_customer))
        .route("/customer-login", post(login))
        .merge(account_routes())
        .layer(Extension(UserKind::Customer))
}

/// Routes that behave the same for both kinds; the kind comes from the
/// `Extension` layered on by the enclosing router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
        .route("/verify-email", post(verify_email))
}

#[instrument(skip(state, payload))]
pub async fn register_customer(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> AppResult<Json<RegisterResponse>> {
    let registration = Registration {
        first_name: payload.first_name,
        last_name: payload.last_name,
        email: payload.email,
        phone: payload.phone,
        password: payload.password,
        rider: None,
    };
    let user = services::register(&state, UserKind::Customer, registration).await?;
    Ok(Json(RegisterResponse {
        message: "Registration Successful",
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Extension(kind): Extension<UserKind>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let (user, token) = services::login(&state, kind, &payload.email, &payload.password).await?;
    let cookie = JwtKeys::from(&state.config.jwt).session_cookie(&token)?;

    let body = LoginResponse {
        message: "Login successful",
        user: SessionProfile {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            role: user.role,
        },
        role: user.role,
        token,
    };
    Ok(([(header::SET_COOKIE, cookie)], Json(body)))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Extension(kind): Extension<UserKind>,
    ValidatedJson(payload): ValidatedJson<ForgotPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    services::forgot_password(&state, kind, &payload.email, OffsetDateTime::now_utc()).await?;
    Ok(Json(MessageResponse {
        message: "Password reset link has been sent to your email if you have an account with us.",
    }))
}

#[instrument(skip(state, query, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Extension(kind): Extension<UserKind>,
    ValidQuery(query): ValidQuery<TokenQuery>,
    ValidatedJson(payload): ValidatedJson<ResetPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    services::reset_password(
        &state,
        kind,
        &query.token,
        &payload.new_password,
        OffsetDateTime::now_utc(),
    )
    .await?;
    Ok(Json(MessageResponse {
        message: "Password has been successfully reset. You can now login with your new password.",
    }))
}

#[instrument(skip(state, query, body))]
pub async fn verify_email(
    State(state): State<AppState>,
    Extension(kind): Extension<UserKind>,
    ValidQuery(query): ValidQuery<TokenQuery>,
    body: Bytes,
) -> AppResult<Json<VerifyEmailResponse>> {
    let request = parse_verify_body(&body)?;
    let user = services::verify_email(&state, kind, &query.token, request.user_id).await?;
    Ok(Json(VerifyEmailResponse {
        message: "User successfully verified",
        username: user.display_name(),
    }))
}

/// The body is optional; an empty one means "look the token up on its own".
fn parse_verify_body(body: &[u8]) -> AppResult<VerifyEmailRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(VerifyEmailRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| AppError::Validation {
        message: "Invalid request body".into(),
        issues: vec![Issue::new("body", "json", e.to_string())],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn verify_body_is_optional() {
        assert!(parse_verify_body(b"").unwrap().user_id.is_none());
        assert!(parse_verify_body(b"  \n").unwrap().user_id.is_none());
        assert!(parse_verify_body(b"{}").unwrap().user_id.is_none());

        let id = Uuid::new_v4();
        let body = format!(r#"{{"userId":"{id}"}}"#);
        assert_eq!(parse_verify_body(body.as_bytes()).unwrap().user_id, Some(id));
    }

    #[test]
    fn verify_body_rejects_garbage_and_unknown_fields() {
        assert!(parse_verify_body(b"not json").is_err());
        assert!(parse_verify_body(br#"{"userId":"x"}"#).is_err());
        assert!(parse_verify_body(br#"{"isVerified":true}"#).is_err());
    }
}
