use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Failure taxonomy of the authentication core.
///
/// Unknown email and wrong password are deliberately collapsed into a single
/// `InvalidCredentials` response so the login endpoint cannot be used to
/// enumerate registered addresses.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Email is already registered")]
    DuplicateEmail,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Current password is incorrect")]
    WrongPassword,
    #[error("Not authenticated")]
    NotAuthenticated,
    #[error("Invalid or expired token")]
    TokenInvalid,
    #[error("External authentication failed")]
    ExternalAuthFailed(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("Validation failed")]
    Validation(Vec<String>),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, code, details) = match self {
            AppError::DuplicateEmail => (
                StatusCode::CONFLICT,
                self.to_string(),
                "DUPLICATE_EMAIL".to_string(),
                None,
            ),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                self.to_string(),
                "INVALID_CREDENTIALS".to_string(),
                None,
            ),
            AppError::WrongPassword => (
                StatusCode::UNAUTHORIZED,
                self.to_string(),
                "WRONG_PASSWORD".to_string(),
                None,
            ),
            AppError::NotAuthenticated => (
                StatusCode::UNAUTHORIZED,
                self.to_string(),
                "NOT_AUTHENTICATED".to_string(),
                None,
            ),
            AppError::TokenInvalid => (
                StatusCode::UNAUTHORIZED,
                self.to_string(),
                "TOKEN_INVALID".to_string(),
                None,
            ),
            AppError::ExternalAuthFailed(detail) => {
                tracing::warn!("External identity provider failure: {}", detail);
                (
                    StatusCode::BAD_GATEWAY,
                    "External authentication failed".to_string(),
                    "EXTERNAL_AUTH_FAILED".to_string(),
                    None,
                )
            }
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                msg,
                "BAD_REQUEST".to_string(),
                None,
            ),
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                "Validation failed".to_string(),
                "VALIDATION_ERROR".to_string(),
                Some(serde_json::json!({ "errors": errors })),
            ),
            AppError::Internal(err) => {
                tracing::error!("Internal server error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    "INTERNAL_SERVER_ERROR".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_message,
            code,
            details,
        });

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(err.into())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    let code = e.code.as_ref();
                    format!("{}: {}", field, code)
                })
            })
            .collect();
        AppError::Validation(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn response_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json")
    }

    #[tokio::test]
    async fn app_error_into_response_maps_status_and_body() {
        let response = AppError::DuplicateEmail.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let json = response_json(response).await;
        assert_eq!(json["error"], "Email is already registered");
        assert_eq!(json["code"], "DUPLICATE_EMAIL");

        let response = AppError::InvalidCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = response_json(response).await;
        assert_eq!(json["error"], "Invalid email or password");
        assert_eq!(json["code"], "INVALID_CREDENTIALS");

        let response = AppError::NotAuthenticated.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = response_json(response).await;
        assert_eq!(json["code"], "NOT_AUTHENTICATED");

        let response = AppError::TokenInvalid.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = response_json(response).await;
        assert_eq!(json["code"], "TOKEN_INVALID");

        let response = AppError::BadRequest("bad".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert_eq!(json["error"], "bad");
        assert_eq!(json["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn unknown_email_and_wrong_password_share_one_message() {
        let unknown = AppError::InvalidCredentials.into_response();
        let wrong = AppError::InvalidCredentials.into_response();
        assert_eq!(unknown.status(), wrong.status());
        let unknown = response_json(unknown).await;
        let wrong = response_json(wrong).await;
        assert_eq!(unknown["error"], wrong["error"]);
    }

    #[tokio::test]
    async fn external_auth_failure_hides_provider_detail() {
        let response =
            AppError::ExternalAuthFailed("token endpoint returned 500".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let json = response_json(response).await;
        assert_eq!(json["error"], "External authentication failed");
        assert!(!json["error"]
            .as_str()
            .unwrap_or_default()
            .contains("token endpoint"));
    }

    #[tokio::test]
    async fn app_error_validation_includes_details() {
        let response = AppError::Validation(vec!["email: email".to_string()]).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert_eq!(json["error"], "Validation failed");
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert_eq!(json["details"]["errors"][0], "email: email");
    }

    #[tokio::test]
    async fn app_error_internal_maps_to_generic_message() {
        let response = AppError::Internal(anyhow::anyhow!("connection refused")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = response_json(response).await;
        assert_eq!(json["error"], "Internal server error");
        assert_eq!(json["code"], "INTERNAL_SERVER_ERROR");
        assert!(json["details"].is_null());
    }
}
