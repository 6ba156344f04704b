use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};
use validator::ValidationErrors;

use crate::config::AppConfig;
use crate::users::StoreError;

/// One entry of a schema validation failure.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Issue {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl Issue {
    pub fn new(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Validation { message: String, issues: Vec<Issue> },
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            issues: Vec::new(),
        }
    }

    pub fn invalid_fields(message: impl Into<String>, errors: &ValidationErrors) -> Self {
        AppError::Validation {
            message: message.into(),
            issues: issues_from(errors),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate => AppError::Conflict("This account already exists".into()),
            StoreError::Other(e) => AppError::Internal(e),
        }
    }
}

/// Flattens validator output into a stable, ordered list.
pub fn issues_from(errors: &ValidationErrors) -> Vec<Issue> {
    let mut issues: Vec<Issue> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            let field = camel_case(&field);
            errs.iter().map(move |e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{field} is invalid"));
                Issue::new(field.clone(), e.code.to_string(), message)
            })
        })
        .collect();
    issues.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.code.cmp(&b.code)));
    issues
}

/// Field names are reported the way clients spell them (`first_name` -> `firstName`).
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    issues: Vec<Issue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            AppError::Validation { message, issues } => {
                warn!(%message, issues = issues.len(), "validation failed");
                ErrorBody {
                    message,
                    issues,
                    detail: None,
                }
            }
            AppError::Internal(e) => {
                error!(error = %format!("{e:#}"), "internal error");
                let mut res = (
                    status,
                    Json(ErrorBody {
                        message: e.to_string(),
                        issues: Vec::new(),
                        detail: None,
                    }),
                )
                    .into_response();
                res.extensions_mut().insert(InternalDetail {
                    message: e.to_string(),
                    chain: format!("{e:?}"),
                });
                return res;
            }
            other => ErrorBody {
                message: other.to_string(),
                issues: Vec::new(),
                detail: None,
            },
        };
        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Error chain of a 500, carried on the response until
/// [`attach_internal_detail`] decides whether the client may see it.
#[derive(Debug, Clone)]
pub struct InternalDetail {
    message: String,
    chain: String,
}

/// Response mapper: outside production, internal errors get their chain in `detail`.
pub async fn attach_internal_detail(
    State(config): State<Arc<AppConfig>>,
    mut res: Response,
) -> Response {
    let Some(internal) = res.extensions_mut().remove::<InternalDetail>() else {
        return res;
    };
    if config.production {
        return res;
    }
    let body = ErrorBody {
        message: internal.message,
        issues: Vec::new(),
        detail: Some(internal.chain),
    };
    (res.status(), Json(body)).into_response()
}
