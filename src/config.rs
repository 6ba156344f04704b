use serde::Deserialize;

use crate::users::UserKind;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

/// S3/MinIO settings; absent means documents are written to `upload_dir`.
#[derive(Debug, Clone, Deserialize)]
pub struct MinioConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
}

/// Whether login is refused until the email address has been verified.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LoginPolicy {
    pub customer_requires_verification: bool,
    pub rider_requires_verification: bool,
}

impl LoginPolicy {
    pub fn requires_verification(&self, kind: UserKind) -> bool {
        match kind {
            UserKind::Customer => self.customer_requires_verification,
            UserKind::Rider => self.rider_requires_verification,
        }
    }
}

impl Default for LoginPolicy {
    fn default() -> Self {
        Self {
            customer_requires_verification: true,
            rider_requires_verification: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub production: bool,
    pub port: u16,
    pub frontend_base_url: String,
    pub jwt: JwtConfig,
    pub smtp: SmtpConfig,
    pub upload_dir: String,
    pub minio: Option<MinioConfig>,
    pub login: LoginPolicy,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let production = std::env::var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);
        let port = std::env::var("APP_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(8080);
        let frontend_base_url = std::env::var("FE_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".into())
            .trim_end_matches('/')
            .to_string();

        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "ryder".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "ryder-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24),
        };

        let smtp_username = std::env::var("SMTP_USERNAME")?;
        let smtp = SmtpConfig {
            host: std::env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".into()),
            port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(465),
            password: std::env::var("SMTP_PASSWORD")?,
            from: std::env::var("MAIL_FROM").unwrap_or_else(|_| smtp_username.clone()),
            username: smtp_username,
        };

        let minio = match std::env::var("MINIO_ENDPOINT") {
            Ok(endpoint) => Some(MinioConfig {
                endpoint,
                bucket: std::env::var("MINIO_BUCKET")?,
                access_key: std::env::var("MINIO_ACCESS_KEY")?,
                secret_key: std::env::var("MINIO_SECRET_KEY")?,
            }),
            Err(_) => None,
        };

        let defaults = LoginPolicy::default();
        let login = LoginPolicy {
            customer_requires_verification: env_flag(
                "CUSTOMER_LOGIN_REQUIRES_VERIFICATION",
                defaults.customer_requires_verification,
            ),
            rider_requires_verification: env_flag(
                "RIDER_LOGIN_REQUIRES_VERIFICATION",
                defaults.rider_requires_verification,
            ),
        };

        Ok(Self {
            database_url,
            production,
            port,
            frontend_base_url,
            jwt,
            smtp,
            upload_dir: std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".into()),
            minio,
            login,
        })
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(v) => matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_login_policy_gates_customers_only() {
        let policy = LoginPolicy::default();
        assert!(policy.requires_verification(UserKind::Customer));
        assert!(!policy.requires_verification(UserKind::Rider));
    }

    #[test]
    fn env_flag_falls_back_to_default_when_unset() {
        assert!(env_flag("RYDER_TEST_FLAG_THAT_IS_NEVER_SET", true));
        assert!(!env_flag("RYDER_TEST_FLAG_THAT_IS_NEVER_SET", false));
    }
}
