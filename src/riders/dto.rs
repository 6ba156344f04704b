use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::users::UserRecord;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EditProfileRequest {
    #[validate(length(min = 1, message = "firstName is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "lastName is required"))]
    pub last_name: String,
    #[validate(length(min = 1, message = "phone is required"))]
    pub phone: String,
    #[validate(email(message = "email must be a valid email address"))]
    pub email: String,
}

/// A rider as shown in the listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiderSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub city: String,
    pub is_verified: bool,
}

impl From<UserRecord> for RiderSummary {
    fn from(u: UserRecord) -> Self {
        Self {
            id: u.id,
            city: u.rider.map(|r| r.city).unwrap_or_default(),
            first_name: u.first_name,
            last_name: u.last_name,
            email: u.email,
            phone: u.phone,
            is_verified: u.is_verified,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RiderListResponse {
    pub message: &'static str,
    pub riders: Vec<RiderSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditedProfile {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub user_id: Uuid,
}

impl From<UserRecord> for EditedProfile {
    fn from(u: UserRecord) -> Self {
        Self {
            first_name: u.first_name,
            last_name: u.last_name,
            email: u.email,
            phone: u.phone,
            user_id: u.id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EditProfileResponse {
    pub message: &'static str,
    pub user: EditedProfile,
}
