use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, State,
    },
    routing::{get, post, put},
    Extension, Json, Router,
};
use tracing::{instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{
        dto::{RegisterResponse, RiderRegisterRequest},
        handlers::{account_routes, login},
        jwt::SessionUser,
        services::{self, Registration},
    },
    error::{AppError, AppResult, Issue},
    extract::{ValidPath, ValidatedJson},
    state::AppState,
    users::{PublicUser, UserKind},
};

use super::{
    documents::{RiderSignup, UploadedFile, DOCUMENT_FIELDS},
    dto::{EditProfileRequest, EditProfileResponse, RiderListResponse},
    services::{edit_profile, list_riders},
};

const UPLOAD_LIMIT: usize = 20 * 1024 * 1024;

pub fn rider_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/register-rider",
            post(register_rider).layer(DefaultBodyLimit::max(UPLOAD_LIMIT)),
        )
        .route("/rider-login", post(login))
        .route("/get-riders", get(get_riders))
        .route("/edit-rider-profile/:userId", put(edit_rider_profile))
        .merge(account_routes())
        .layer(Extension(UserKind::Rider))
}

fn bad_multipart(e: MultipartError) -> AppError {
    AppError::Validation {
        message: "Invalid request body".into(),
        issues: vec![Issue::new("body", "multipart", e.body_text())],
    }
}

/// Splits the multipart form into text fields and document parts.
async fn read_form(mut mp: Multipart) -> AppResult<(RiderRegisterRequest, Vec<UploadedFile>)> {
    let mut form = RiderRegisterRequest::default();
    let mut files = Vec::new();

    while let Some(field) = mp.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_string();

        if DOCUMENT_FIELDS.contains(&name.as_str()) {
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let body = field.bytes().await.map_err(bad_multipart)?;
            files.push(UploadedFile {
                field: name,
                file_name,
                content_type,
                body,
            });
            continue;
        }

        let value = field.text().await.map_err(bad_multipart)?;
        match name.as_str() {
            "firstName" => form.first_name = value,
            "lastName" => form.last_name = value,
            "email" => form.email = value,
            "phone" => form.phone = value,
            "city" => form.city = value,
            "password" => form.password = value,
            other => {
                warn!(field = %other, "unknown multipart field");
                return Err(AppError::Validation {
                    message: "Invalid request body".into(),
                    issues: vec![Issue::new(
                        other,
                        "unknown_field",
                        format!("unknown field `{other}`"),
                    )],
                });
            }
        }
    }

    form.validate()
        .map_err(|e| AppError::invalid_fields("Invalid request body", &e))?;
    Ok((form, files))
}

#[instrument(skip(state, mp))]
pub async fn register_rider(
    State(state): State<AppState>,
    mp: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<RegisterResponse>> {
    let mp = mp.map_err(|e| AppError::validation(e.body_text()))?;
    let (form, files) = read_form(mp).await?;

    let registration = Registration {
        first_name: form.first_name,
        last_name: form.last_name,
        email: form.email,
        phone: form.phone,
        password: form.password,
        rider: Some(RiderSignup {
            city: form.city,
            files,
        }),
    };
    let user = services::register(&state, UserKind::Rider, registration).await?;
    Ok(Json(RegisterResponse {
        message: "Registration Successful",
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state, session), fields(by = %session.0.user_id))]
pub async fn get_riders(
    State(state): State<AppState>,
    session: SessionUser,
) -> AppResult<Json<RiderListResponse>> {
    let riders = list_riders(&state).await?;
    Ok(Json(RiderListResponse {
        message: "List of Riders",
        riders,
    }))
}

#[instrument(skip(state, session, payload), fields(by = %session.0.user_id))]
pub async fn edit_rider_profile(
    State(state): State<AppState>,
    session: SessionUser,
    ValidPath(user_id): ValidPath<Uuid>,
    payload: Result<ValidatedJson<EditProfileRequest>, AppError>,
) -> AppResult<Json<EditProfileResponse>> {
    let ValidatedJson(edit) = payload.map_err(invalid_user_data)?;
    let user = edit_profile(&state, user_id, edit).await?;
    Ok(Json(EditProfileResponse {
        message: "Profile updated successfully",
        user: user.into(),
    }))
}

fn invalid_user_data(e: AppError) -> AppError {
    match e {
        AppError::Validation { issues, .. } => AppError::Validation {
            message: "Invalid user data".into(),
            issues,
        },
        other => other,
    }
}
