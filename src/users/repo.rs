use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::model::{UserKind, UserRecord, UserRow};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("a record with the same email or phone already exists")]
    Duplicate,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return StoreError::Duplicate;
            }
        }
        StoreError::Other(e.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence for both user kinds.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, kind: UserKind, id: Uuid) -> StoreResult<Option<UserRecord>>;
    /// Case-insensitive; an exact match wins if several rows differ only by case.
    async fn find_by_email(&self, kind: UserKind, email: &str) -> StoreResult<Option<UserRecord>>;
    async fn find_by_email_or_phone(
        &self,
        kind: UserKind,
        email: &str,
        phone: &str,
    ) -> StoreResult<Option<UserRecord>>;
    /// Never matches an empty token.
    async fn find_by_verify_token(
        &self,
        kind: UserKind,
        token: &str,
    ) -> StoreResult<Option<UserRecord>>;
    /// Only returns a record whose reset expiry is strictly after `now`.
    async fn find_by_reset_token(
        &self,
        kind: UserKind,
        token: &str,
        now: OffsetDateTime,
    ) -> StoreResult<Option<UserRecord>>;
    async fn insert(&self, user: &UserRecord) -> StoreResult<()>;
    /// Overwrites every mutable column of an existing record.
    async fn save(&self, user: &UserRecord) -> StoreResult<()>;
    async fn list(&self, kind: UserKind) -> StoreResult<Vec<UserRecord>>;
}

const BASE_COLUMNS: &str = "id, first_name, last_name, email, phone, password_hash, role, \
     is_verified, verify_email_token, reset_token, reset_token_expiry, created_at, updated_at";

fn select_columns(kind: UserKind) -> String {
    match kind {
        UserKind::Rider => format!("{BASE_COLUMNS}, city, bike_doc, valid_id_card, passport_photo"),
        UserKind::Customer => format!(
            "{BASE_COLUMNS}, NULL::text AS city, NULL::text AS bike_doc, \
             NULL::text AS valid_id_card, NULL::text AS passport_photo"
        ),
    }
}

fn into_record(row: Option<UserRow>) -> StoreResult<Option<UserRecord>> {
    Ok(row.map(UserRecord::try_from).transpose()?)
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn fetch_one_where(
        &self,
        kind: UserKind,
        predicate: &str,
        bind: &str,
    ) -> StoreResult<Option<UserRecord>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {}",
            select_columns(kind),
            kind.table(),
            predicate
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(bind)
            .fetch_optional(&self.db)
            .await?;
        into_record(row)
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, kind: UserKind, id: Uuid) -> StoreResult<Option<UserRecord>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = $1",
            select_columns(kind),
            kind.table()
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        into_record(row)
    }

    async fn find_by_email(&self, kind: UserKind, email: &str) -> StoreResult<Option<UserRecord>> {
        self.fetch_one_where(
            kind,
            "lower(email) = lower($1) ORDER BY (email = $1) DESC LIMIT 1",
            email,
        )
        .await
    }

    async fn find_by_email_or_phone(
        &self,
        kind: UserKind,
        email: &str,
        phone: &str,
    ) -> StoreResult<Option<UserRecord>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE email = $1 OR phone = $2 LIMIT 1",
            select_columns(kind),
            kind.table()
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .bind(phone)
            .fetch_optional(&self.db)
            .await?;
        into_record(row)
    }

    async fn find_by_verify_token(
        &self,
        kind: UserKind,
        token: &str,
    ) -> StoreResult<Option<UserRecord>> {
        if token.is_empty() {
            return Ok(None);
        }
        self.fetch_one_where(kind, "verify_email_token = $1", token)
            .await
    }

    async fn find_by_reset_token(
        &self,
        kind: UserKind,
        token: &str,
        now: OffsetDateTime,
    ) -> StoreResult<Option<UserRecord>> {
        if token.is_empty() {
            return Ok(None);
        }
        let sql = format!(
            "SELECT {} FROM {} WHERE reset_token = $1 AND reset_token_expiry > $2",
            select_columns(kind),
            kind.table()
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(token)
            .bind(now)
            .fetch_optional(&self.db)
            .await?;
        into_record(row)
    }

    async fn insert(&self, user: &UserRecord) -> StoreResult<()> {
        let kind = user.kind();
        let (extra_cols, extra_params) = match kind {
            UserKind::Rider => (", city, bike_doc, valid_id_card, passport_photo", ", $14, $15, $16, $17"),
            UserKind::Customer => ("", ""),
        };
        let sql = format!(
            r#"
            INSERT INTO {} (id, first_name, last_name, email, phone, password_hash, role,
                            is_verified, verify_email_token, reset_token, reset_token_expiry,
                            created_at, updated_at{})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13{})
            "#,
            kind.table(),
            extra_cols,
            extra_params
        );
        let mut query = sqlx::query(&sql)
            .bind(user.id)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.email)
            .bind(&user.phone)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .bind(user.is_verified)
            .bind(&user.verify_email_token)
            .bind(&user.reset_token)
            .bind(user.reset_token_expiry)
            .bind(user.created_at)
            .bind(user.updated_at);
        if let Some(rider) = &user.rider {
            query = query
                .bind(&rider.city)
                .bind(&rider.bike_doc)
                .bind(&rider.valid_id_card)
                .bind(&rider.passport_photo);
        }
        query.execute(&self.db).await?;
        Ok(())
    }

    async fn save(&self, user: &UserRecord) -> StoreResult<()> {
        let sql = format!(
            r#"
            UPDATE {}
               SET first_name = $2, last_name = $3, email = $4, phone = $5,
                   password_hash = $6, is_verified = $7, verify_email_token = $8,
                   reset_token = $9, reset_token_expiry = $10, updated_at = $11
             WHERE id = $1
            "#,
            user.kind().table()
        );
        let res = sqlx::query(&sql)
            .bind(user.id)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.email)
            .bind(&user.phone)
            .bind(&user.password_hash)
            .bind(user.is_verified)
            .bind(&user.verify_email_token)
            .bind(&user.reset_token)
            .bind(user.reset_token_expiry)
            .bind(user.updated_at)
            .execute(&self.db)
            .await?;
        if res.rows_affected() == 0 {
            return Err(anyhow::anyhow!("save: no {} with id {}", user.kind().table(), user.id).into());
        }
        Ok(())
    }

    async fn list(&self, kind: UserKind) -> StoreResult<Vec<UserRecord>> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY created_at ASC",
            select_columns(kind),
            kind.table()
        );
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(&self.db)
            .await
            .context("list users")?;
        rows.into_iter()
            .map(|r| UserRecord::try_from(r).map_err(StoreError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customer_select_pads_rider_columns() {
        let cols = select_columns(UserKind::Customer);
        assert!(cols.contains("NULL::text AS city"));
        assert!(cols.contains("NULL::text AS passport_photo"));
        let rider_cols = select_columns(UserKind::Rider);
        assert!(rider_cols.ends_with("passport_photo"));
        assert!(!rider_cols.contains("NULL"));
    }

    #[test]
    fn non_database_errors_are_not_duplicates() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Other(_)));
    }
}
