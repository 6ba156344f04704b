use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// The two populations of accounts. Each lives in its own table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserKind {
    Customer,
    Rider,
}

impl UserKind {
    pub fn table(self) -> &'static str {
        match self {
            UserKind::Customer => "customers",
            UserKind::Rider => "riders",
        }
    }

    pub fn role(self) -> Role {
        match self {
            UserKind::Customer => Role::Customer,
            UserKind::Rider => Role::Ryder,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            UserKind::Customer => "Customer",
            UserKind::Rider => "Rider",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Customer,
    Ryder,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Customer => "CUSTOMER",
            Role::Ryder => "RYDER",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CUSTOMER" => Ok(Role::Customer),
            "RYDER" => Ok(Role::Ryder),
            other => anyhow::bail!("unknown role {other}"),
        }
    }
}

/// City and uploaded document locations; only riders carry these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiderDetails {
    pub city: String,
    pub bike_doc: String,
    pub valid_id_card: String,
    pub passport_photo: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub is_verified: bool,
    #[serde(skip_serializing)]
    pub verify_email_token: String,
    #[serde(skip_serializing)]
    pub reset_token: Option<String>,
    pub reset_token_expiry: Option<OffsetDateTime>,
    pub rider: Option<RiderDetails>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl UserRecord {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn kind(&self) -> UserKind {
        match self.role {
            Role::Customer => UserKind::Customer,
            Role::Ryder => UserKind::Rider,
        }
    }
}

/// Row shape shared by both tables; customers select NULL for the rider columns.
#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub password_hash: String,
    pub role: String,
    pub is_verified: bool,
    pub verify_email_token: String,
    pub reset_token: Option<String>,
    pub reset_token_expiry: Option<OffsetDateTime>,
    pub city: Option<String>,
    pub bike_doc: Option<String>,
    pub valid_id_card: Option<String>,
    pub passport_photo: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<UserRow> for UserRecord {
    type Error = anyhow::Error;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        let role: Role = r.role.parse()?;
        let rider = match role {
            Role::Ryder => Some(RiderDetails {
                city: r.city.unwrap_or_default(),
                bike_doc: r.bike_doc.unwrap_or_default(),
                valid_id_card: r.valid_id_card.unwrap_or_default(),
                passport_photo: r.passport_photo.unwrap_or_default(),
            }),
            Role::Customer => None,
        };
        Ok(Self {
            id: r.id,
            first_name: r.first_name,
            last_name: r.last_name,
            email: r.email,
            phone: r.phone,
            password_hash: r.password_hash,
            role,
            is_verified: r.is_verified,
            verify_email_token: r.verify_email_token,
            reset_token: r.reset_token,
            reset_token_expiry: r.reset_token_expiry,
            rider,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl From<&UserRecord> for PublicUser {
    fn from(u: &UserRecord) -> Self {
        Self {
            id: u.id,
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            email: u.email.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_its_column_text() {
        for role in [Role::Customer, Role::Ryder] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("ADMIN".parse::<Role>().is_err());
    }

    #[test]
    fn customer_row_has_no_rider_details() {
        let now = OffsetDateTime::now_utc();
        let row = UserRow {
            id: Uuid::new_v4(),
            first_name: "Ada".into(),
            last_name: "Obi".into(),
            email: "ada@x.com".into(),
            phone: "+234".into(),
            password_hash: "h".into(),
            role: "CUSTOMER".into(),
            is_verified: false,
            verify_email_token: "t".into(),
            reset_token: None,
            reset_token_expiry: None,
            city: None,
            bike_doc: None,
            valid_id_card: None,
            passport_photo: None,
            created_at: now,
            updated_at: now,
        };
        let user = UserRecord::try_from(row).unwrap();
        assert_eq!(user.kind(), UserKind::Customer);
        assert!(user.rider.is_none());
        assert_eq!(user.display_name(), "Ada Obi");
    }

    #[test]
    fn serialized_record_hides_secrets() {
        let now = OffsetDateTime::now_utc();
        let user = UserRecord {
            id: Uuid::new_v4(),
            first_name: "A".into(),
            last_name: "B".into(),
            email: "a@x.com".into(),
            phone: "+1".into(),
            password_hash: "argon-digest".into(),
            role: Role::Customer,
            is_verified: false,
            verify_email_token: "verify-secret".into(),
            reset_token: Some("reset-secret".into()),
            reset_token_expiry: None,
            rider: None,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon-digest"));
        assert!(!json.contains("verify-secret"));
        assert!(!json.contains("reset-secret"));
    }
}
