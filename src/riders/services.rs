use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    state::AppState,
    users::{UserKind, UserRecord},
};

use super::dto::{EditProfileRequest, RiderSummary};

pub async fn list_riders(state: &AppState) -> AppResult<Vec<RiderSummary>> {
    let riders = state.users.list(UserKind::Rider).await?;
    Ok(riders.into_iter().map(RiderSummary::from).collect())
}

/// Overwrites the contact fields exactly as given. Verification state,
/// role and password are left alone.
pub async fn edit_profile(
    state: &AppState,
    user_id: Uuid,
    edit: EditProfileRequest,
) -> AppResult<UserRecord> {
    let mut user = state
        .users
        .find_by_id(UserKind::Rider, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    user.first_name = edit.first_name;
    user.last_name = edit.last_name;
    user.phone = edit.phone;
    user.email = edit.email;
    user.updated_at = OffsetDateTime::now_utc();
    state.users.save(&user).await?;
    info!(%user_id, "rider profile updated");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::services::{login, register, Registration};
    use crate::riders::documents::{RiderSignup, UploadedFile, DOCUMENT_FIELDS};
    use crate::state::testing::fixture;
    use crate::users::UserStore;
    use bytes::Bytes;

    fn signup(email: &str, phone: &str) -> Registration {
        Registration {
            first_name: "Musa".into(),
            last_name: "Bello".into(),
            email: email.into(),
            phone: phone.into(),
            password: "abcd1".into(),
            rider: Some(RiderSignup {
                city: "Kano".into(),
                files: DOCUMENT_FIELDS
                    .iter()
                    .map(|f| UploadedFile {
                        field: f.to_string(),
                        file_name: Some(format!("{f}.png")),
                        content_type: None,
                        body: Bytes::from_static(b"png"),
                    })
                    .collect(),
            }),
        }
    }

    fn edit(email: &str, phone: &str) -> EditProfileRequest {
        EditProfileRequest {
            first_name: "Musa".into(),
            last_name: "Sani".into(),
            phone: phone.into(),
            email: email.into(),
        }
    }

    #[tokio::test]
    async fn lists_only_riders() {
        let fx = fixture();
        register(&fx.state, UserKind::Rider, signup("m@x.com", "+1"))
            .await
            .unwrap();
        let mut customer = signup("c@x.com", "+2");
        customer.rider = None;
        register(&fx.state, UserKind::Customer, customer).await.unwrap();

        let riders = list_riders(&fx.state).await.unwrap();
        assert_eq!(riders.len(), 1);
        assert_eq!(riders[0].city, "Kano");
        assert!(!riders[0].is_verified);
    }

    #[tokio::test]
    async fn edit_overwrites_contact_fields_only() {
        let fx = fixture();
        let user = register(&fx.state, UserKind::Rider, signup("m@x.com", "+1"))
            .await
            .unwrap();

        // stored as submitted, no normalization
        let updated = edit_profile(&fx.state, user.id, edit("M@New.com", "+9"))
            .await
            .unwrap();
        assert_eq!(updated.email, "M@New.com");
        assert_eq!(updated.last_name, "Sani");

        let stored = fx
            .users
            .find_by_id(UserKind::Rider, user.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.phone, "+9");
        assert_eq!(stored.role, user.role);
        assert_eq!(stored.password_hash, user.password_hash);
        assert!(!stored.is_verified);
        assert_eq!(stored.rider, user.rider);
    }

    #[tokio::test]
    async fn rider_can_log_in_after_changing_email_case() {
        let fx = fixture();
        let user = register(&fx.state, UserKind::Rider, signup("m@x.com", "+1"))
            .await
            .unwrap();
        edit_profile(&fx.state, user.id, edit("Musa@New.com", "+1"))
            .await
            .unwrap();

        for typed in ["Musa@New.com", "musa@new.com", " MUSA@NEW.COM "] {
            let (logged_in, _) = login(&fx.state, UserKind::Rider, typed, "abcd1")
                .await
                .unwrap();
            assert_eq!(logged_in.id, user.id);
        }
        let old = login(&fx.state, UserKind::Rider, "m@x.com", "abcd1").await;
        assert!(matches!(old, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn edit_unknown_rider_is_not_found() {
        let fx = fixture();
        let err = edit_profile(&fx.state, Uuid::new_v4(), edit("a@x.com", "+1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn edit_colliding_with_another_rider_conflicts() {
        let fx = fixture();
        register(&fx.state, UserKind::Rider, signup("a@x.com", "+1"))
            .await
            .unwrap();
        let second = register(&fx.state, UserKind::Rider, signup("b@x.com", "+2"))
            .await
            .unwrap();
        let err = edit_profile(&fx.state, second.id, edit("a@x.com", "+2"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
