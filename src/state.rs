use std::sync::Arc;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

use crate::auth::password::PasswordPolicy;
use crate::config::AppConfig;
use crate::mail::{Notifier, SmtpMailer};
use crate::storage::{LocalStorage, Storage, StorageClient};
use crate::users::{PgUserStore, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn StorageClient>,
    pub notifier: Notifier,
}

impl AppState {
    /// Connects to Postgres and builds every collaborator from the environment.
    /// Returns the pool too so the caller can run migrations.
    pub async fn init() -> anyhow::Result<(Self, PgPool)> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        let storage = match &config.minio {
            Some(minio) => {
                info!(endpoint = %minio.endpoint, bucket = %minio.bucket, "documents stored in S3");
                Arc::new(Storage::new(minio, "us-east-1").await?) as Arc<dyn StorageClient>
            }
            None => {
                info!(dir = %config.upload_dir, "documents stored on local disk");
                Arc::new(LocalStorage::new(&config.upload_dir)) as Arc<dyn StorageClient>
            }
        };

        let mailer = Arc::new(SmtpMailer::new(&config.smtp)?);
        let notifier = Notifier::new(mailer, config.frontend_base_url.clone());

        let users = Arc::new(PgUserStore::new(db.clone())) as Arc<dyn UserStore>;

        Ok((
            Self {
                users,
                config,
                storage,
                notifier,
            },
            db,
        ))
    }

    pub fn password_policy(&self) -> PasswordPolicy {
        PasswordPolicy::for_mode(self.config.production)
    }
}
