use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::model::{UserKind, UserRecord};
use super::repo::{StoreError, StoreResult, UserStore};

/// In-process store with the same uniqueness rules as the Postgres schema.
#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<UserRecord>>,
}

impl MemoryUserStore {
    fn find<F>(&self, kind: UserKind, pred: F) -> StoreResult<Option<UserRecord>>
    where
        F: Fn(&UserRecord) -> bool,
    {
        let users = self.users.lock().map_err(|_| anyhow::anyhow!("store poisoned"))?;
        Ok(users
            .iter()
            .find(|u| u.kind() == kind && pred(u))
            .cloned())
    }

    fn clashes(users: &[UserRecord], candidate: &UserRecord) -> bool {
        users.iter().any(|u| {
            u.kind() == candidate.kind()
                && u.id != candidate.id
                && (u.email == candidate.email || u.phone == candidate.phone)
        })
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, kind: UserKind, id: Uuid) -> StoreResult<Option<UserRecord>> {
        self.find(kind, |u| u.id == id)
    }

    async fn find_by_email(&self, kind: UserKind, email: &str) -> StoreResult<Option<UserRecord>> {
        match self.find(kind, |u| u.email == email)? {
            Some(exact) => Ok(Some(exact)),
            None => self.find(kind, |u| u.email.to_lowercase() == email.to_lowercase()),
        }
    }

    async fn find_by_email_or_phone(
        &self,
        kind: UserKind,
        email: &str,
        phone: &str,
    ) -> StoreResult<Option<UserRecord>> {
        self.find(kind, |u| u.email == email || u.phone == phone)
    }

    async fn find_by_verify_token(
        &self,
        kind: UserKind,
        token: &str,
    ) -> StoreResult<Option<UserRecord>> {
        if token.is_empty() {
            return Ok(None);
        }
        self.find(kind, |u| u.verify_email_token == token)
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
        self.find(kind, |u| {
            u.reset_token.as_deref() == Some(token)
                && u.reset_token_expiry.map(|exp| exp > now).unwrap_or(false)
        })
    }

    async fn insert(&self, user: &UserRecord) -> StoreResult<()> {
        let mut users = self.users.lock().map_err(|_| anyhow::anyhow!("store poisoned"))?;
        if Self::clashes(&users, user) {
            return Err(StoreError::Duplicate);
        }
        users.push(user.clone());
        Ok(())
    }

    async fn save(&self, user: &UserRecord) -> StoreResult<()> {
        let mut users = self.users.lock().map_err(|_| anyhow::anyhow!("store poisoned"))?;
        if Self::clashes(&users, user) {
            return Err(StoreError::Duplicate);
        }
        let slot = users
            .iter_mut()
            .find(|u| u.kind() == user.kind() && u.id == user.id)
            .ok_or_else(|| anyhow::anyhow!("save: no user with id {}", user.id))?;
        *slot = user.clone();
        Ok(())
    }

    async fn list(&self, kind: UserKind) -> StoreResult<Vec<UserRecord>> {
        let users = self.users.lock().map_err(|_| anyhow::anyhow!("store poisoned"))?;
        Ok(users.iter().filter(|u| u.kind() == kind).cloned().collect())
    }
}
