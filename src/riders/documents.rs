use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    state::AppState,
    storage::document_extension,
    users::RiderDetails,
};

pub const BIKE_DOC: &str = "bikeDoc";
pub const VALID_ID_CARD: &str = "validIdCard";
pub const PASSPORT_PHOTO: &str = "passportPhoto";
pub const DOCUMENT_FIELDS: [&str; 3] = [BIKE_DOC, VALID_ID_CARD, PASSPORT_PHOTO];

/// One file part of a multipart upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// What a rider submits beyond the common registration fields.
#[derive(Debug, Clone, Default)]
pub struct RiderSignup {
    pub city: String,
    pub files: Vec<UploadedFile>,
}

fn pick<'a>(files: &'a [UploadedFile], field: &str) -> AppResult<&'a UploadedFile> {
    files
        .iter()
        .find(|f| f.field == field && !f.body.is_empty())
        .ok_or_else(|| AppError::validation(format!("File '{field}' is missing")))
}

/// Checks that every required document is present and acceptable, then stores them.
/// Nothing is written unless all three pass.
pub async fn store(state: &AppState, user_id: Uuid, signup: &RiderSignup) -> AppResult<RiderDetails> {
    let mut planned = Vec::with_capacity(DOCUMENT_FIELDS.len());
    for field in DOCUMENT_FIELDS {
        let file = pick(&signup.files, field)?;
        let ext = document_extension(file.file_name.as_deref(), file.content_type.as_deref())
            .ok_or_else(|| {
                AppError::validation(format!(
                    "File '{field}' must be a pdf, png, svg, jpg or jpeg document"
                ))
            })?;
        let key = format!("riders/{}/{}-{}.{}", user_id, field, Uuid::new_v4(), ext);
        planned.push((file, key));
    }

    let mut stored: Vec<String> = Vec::with_capacity(planned.len());
    for (file, key) in planned {
        let content_type = file
            .content_type
            .as_deref()
            .unwrap_or("application/octet-stream");
        if let Err(e) = state
            .storage
            .put_object(&key, file.body.clone(), content_type)
            .await
        {
            discard_keys(state, &stored).await;
            return Err(AppError::Internal(e.context(format!("store {}", file.field))));
        }
        stored.push(key);
    }
    info!(%user_id, count = stored.len(), "rider documents stored");

    let [bike_doc, valid_id_card, passport_photo]: [String; 3] = stored
        .try_into()
        .map_err(|_| AppError::Internal(anyhow::anyhow!("unexpected document count")))?;
    Ok(RiderDetails {
        city: signup.city.clone(),
        bike_doc,
        valid_id_card,
        passport_photo,
    })
}

/// Best-effort removal after a failed registration.
pub async fn discard(state: &AppState, details: &RiderDetails) {
    let keys = [
        details.bike_doc.clone(),
        details.valid_id_card.clone(),
        details.passport_photo.clone(),
    ];
    discard_keys(state, &keys).await;
}

async fn discard_keys(state: &AppState, keys: &[String]) {
    for key in keys {
        if let Err(e) = state.storage.delete_object(key).await {
            warn!(%key, error = %e, "failed to remove orphaned document");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::fixture;

    fn file(field: &str, name: &str) -> UploadedFile {
        UploadedFile {
            field: field.into(),
            file_name: Some(name.into()),
            content_type: None,
            body: Bytes::from_static(b"doc"),
        }
    }

    fn full_signup() -> RiderSignup {
        RiderSignup {
            city: "Lagos".into(),
            files: vec![
                file(BIKE_DOC, "bike.pdf"),
                file(VALID_ID_CARD, "id.png"),
                file(PASSPORT_PHOTO, "me.jpg"),
            ],
        }
    }

    #[tokio::test]
    async fn stores_all_three_documents_under_the_rider() {
        let fx = fixture();
        let id = Uuid::new_v4();
        let details = store(&fx.state, id, &full_signup()).await.unwrap();

        assert_eq!(details.city, "Lagos");
        assert!(details.bike_doc.starts_with(&format!("riders/{id}/bikeDoc-")));
        assert!(details.bike_doc.ends_with(".pdf"));
        assert!(details.valid_id_card.ends_with(".png"));
        assert!(details.passport_photo.ends_with(".jpg"));
        assert_eq!(fx.storage.keys().len(), 3);

        discard(&fx.state, &details).await;
        assert!(fx.storage.keys().is_empty());
    }

    #[tokio::test]
    async fn missing_document_is_rejected_before_anything_is_written() {
        let fx = fixture();
        let mut signup = full_signup();
        signup.files.retain(|f| f.field != PASSPORT_PHOTO);

        let err = store(&fx.state, Uuid::new_v4(), &signup).await.unwrap_err();
        assert_eq!(err.to_string(), "File 'passportPhoto' is missing");
        assert!(fx.storage.keys().is_empty());
    }

    #[tokio::test]
    async fn unsupported_extension_is_rejected() {
        let fx = fixture();
        let mut signup = full_signup();
        signup.files[0] = file(BIKE_DOC, "bike.exe");
        let err = store(&fx.state, Uuid::new_v4(), &signup).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }
}
