use std::time::Duration;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderValue},
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    config::JwtConfig,
    error::AppError,
    state::AppState,
    users::{Role, UserRecord},
};

pub const SESSION_COOKIE: &str = "token";

/// Session claims: identity and role of the logged-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
}

#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
}

impl From<&JwtConfig> for JwtKeys {
    fn from(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::from_secs((cfg.ttl_minutes.max(0) as u64) * 60),
        }
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        JwtKeys::from(&state.config.jwt)
    }
}

impl JwtKeys {
    pub fn sign(&self, user: &UserRecord) -> anyhow::Result<String> {
        self.sign_at(user, OffsetDateTime::now_utc())
    }

    fn sign_at(&self, user: &UserRecord, now: OffsetDateTime) -> anyhow::Result<String> {
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            user_id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            role: user.role,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user.id, role = ?user.role, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.user_id, "jwt verified");
        Ok(data.claims)
    }

    /// `Set-Cookie` value carrying the session token.
    pub fn session_cookie(&self, token: &str) -> anyhow::Result<HeaderValue> {
        let cookie = format!(
            "{SESSION_COOKIE}={token}; HttpOnly; Secure; SameSite=Strict; Path=/; Max-Age={}",
            self.ttl.as_secs()
        );
        Ok(HeaderValue::from_str(&cookie)?)
    }
}

fn cookie_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

/// Verified session, taken from `Authorization: Bearer` or the session cookie.
pub struct SessionUser(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);

        let token = match parts.headers.get(header::AUTHORIZATION) {
            Some(value) => {
                let value = value.to_str().unwrap_or_default();
                // "Bearer <token>"; anything after the first space is the token
                let pin = value.split_once(' ').map(|(_, t)| t.trim()).unwrap_or_default();
                if pin.is_empty() {
                    return Err(AppError::Forbidden("The pin can't be used".into()));
                }
                pin.to_string()
            }
            None => cookie_token(parts)
                .filter(|t| !t.is_empty())
                .ok_or_else(|| AppError::Unauthorized("Ensure that you are logged in".into()))?,
        };

        match keys.verify(&token) {
            Ok(claims) => Ok(SessionUser(claims)),
            Err(e) => {
                warn!(error = %e, "invalid or expired token");
                Err(AppError::Unauthorized("Invalid or expired token".into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::UserKind;
    use axum::http::{Request, StatusCode};

    fn keys(secret: &str, issuer: &str, audience: &str) -> JwtKeys {
        JwtKeys::from(&JwtConfig {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            ttl_minutes: 60 * 24,
        })
    }

    fn user() -> UserRecord {
        let now = OffsetDateTime::now_utc();
        UserRecord {
            id: Uuid::new_v4(),
            first_name: "Tolu".into(),
            last_name: "Ade".into(),
            email: "tolu@x.com".into(),
            phone: "+234800".into(),
            password_hash: String::new(),
            role: UserKind::Rider.role(),
            is_verified: true,
            verify_email_token: String::new(),
            reset_token: None,
            reset_token_expiry: None,
            rider: None,
            created_at: now,
            updated_at: now,
        }
    }

    async fn extract(keys: &JwtKeys, req: Request<()>) -> Result<SessionUser, AppError> {
        let (mut parts, _) = req.into_parts();
        SessionUser::from_request_parts(&mut parts, keys).await
    }

    #[test]
    fn sign_and_verify_carries_identity_claims() {
        let keys = keys("dev-secret", "test-issuer", "test-aud");
        let u = user();
        let token = keys.sign(&u).expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.user_id, u.id);
        assert_eq!(claims.first_name, "Tolu");
        assert_eq!(claims.phone, "+234800");
        assert_eq!(claims.role, Role::Ryder);
        assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
    }

    #[test]
    fn verify_rejects_wrong_issuer_or_audience() {
        let good = keys("same-secret", "good-iss", "good-aud");
        let bad = keys("same-secret", "bad-iss", "bad-aud");
        let token = good.sign(&user()).unwrap();
        assert!(bad.verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_expired_token() {
        let keys = keys("s", "i", "a");
        let two_days_ago = OffsetDateTime::now_utc() - TimeDuration::days(2);
        let token = keys.sign_at(&user(), two_days_ago).unwrap();
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn session_cookie_is_locked_down() {
        let keys = keys("s", "i", "a");
        let cookie = keys.session_cookie("abc").unwrap();
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.starts_with("token=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Max-Age=86400"));
    }

    #[tokio::test]
    async fn extractor_accepts_bearer_header_and_cookie() {
        let keys = keys("s", "i", "a");
        let token = keys.sign(&user()).unwrap();

        let req = Request::builder()
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(())
            .unwrap();
        assert!(extract(&keys, req).await.is_ok());

        let req = Request::builder()
            .header(header::COOKIE, format!("theme=dark; token={token}"))
            .body(())
            .unwrap();
        let SessionUser(claims) = extract(&keys, req).await.unwrap();
        assert_eq!(claims.email, "tolu@x.com");
    }

    #[tokio::test]
    async fn extractor_statuses() {
        let keys = keys("s", "i", "a");

        let missing = extract(&keys, Request::builder().body(()).unwrap()).await;
        assert_eq!(missing.err().unwrap().status(), StatusCode::UNAUTHORIZED);

        let req = Request::builder()
            .header(header::AUTHORIZATION, "Bearer ")
            .body(())
            .unwrap();
        assert_eq!(extract(&keys, req).await.err().unwrap().status(), StatusCode::FORBIDDEN);

        let req = Request::builder()
            .header(header::AUTHORIZATION, "Bearer not.a.jwt")
            .body(())
            .unwrap();
        assert_eq!(extract(&keys, req).await.err().unwrap().status(), StatusCode::UNAUTHORIZED);
    }
}
