use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Machine-readable reasons a caller was refused.
///
/// The code is what the client sees. The private reason behind a privacy
/// denial is only ever logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    DmNotAllowed,
    Blocked,
    NotMember,
    RoomLocked,
    AccessRevoked,
    InvalidCode,
    WrongRoomType,
    NotOwner,
}

impl Denial {
    pub fn code(&self) -> &'static str {
        match self {
            Self::DmNotAllowed => "dm_not_allowed",
            Self::Blocked => "blocked",
            Self::NotMember => "not_member",
            Self::RoomLocked => "room_locked",
            Self::AccessRevoked => "access_revoked",
            Self::InvalidCode => "invalid_code",
            Self::WrongRoomType => "wrong_room_type",
            Self::NotOwner => "not_owner",
        }
    }

    fn message(&self) -> &'static str {
        match self {
            Self::DmNotAllowed => "This user does not accept messages from you",
            Self::Blocked => "You cannot message this user",
            Self::NotMember => "Not a member of this room",
            Self::RoomLocked => "This room is locked",
            Self::AccessRevoked => "Your access to this event was revoked",
            Self::InvalidCode => "Invalid access code",
            Self::WrongRoomType => "Operation not supported for this room",
            Self::NotOwner => "Only the room owner can do that",
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Unauthenticated(&'static str),

    #[error("Validation error: {0}")]
    InvalidInput(String),

    #[error("Forbidden: {}", .0.code())]
    Forbidden(Denial),

    #[error("Resource not found: {0}")]
    NotFound(&'static str),

    #[error("Resource conflict: {0}")]
    Conflict(&'static str),

    #[error("Room closed: {0}")]
    WindowClosed(&'static str),

    #[error("Rate limit exceeded for {class} on {scope}")]
    RateLimited {
        class: &'static str,
        scope: String,
        retry_after_secs: u64,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) | AppError::WindowClosed(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthenticated(_) => "unauthenticated",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::Forbidden(denial) => denial.code(),
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::WindowClosed(_) => "room_closed",
            AppError::RateLimited { .. } => "rate_limited",
            AppError::Database(_) | AppError::Internal(_) => "internal",
        }
    }

    /// Message safe to show to the client.
    fn user_message(&self) -> String {
        match self {
            AppError::Unauthenticated(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::WindowClosed(msg) => (*msg).to_string(),
            AppError::InvalidInput(msg) => msg.clone(),
            AppError::Forbidden(denial) => denial.message().to_string(),
            AppError::RateLimited { .. } => "Too many requests".to_string(),
            AppError::Database(_) | AppError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            AppError::Database(e) => tracing::error!(error = %e, "database failure"),
            AppError::Internal(e) => tracing::error!(error = %e, "internal failure"),
            _ => {}
        }

        let mut body = json!({
            "error": self.user_message(),
            "code": self.code(),
        });

        if let AppError::RateLimited {
            class,
            scope,
            retry_after_secs,
        } = &self
        {
            body["class"] = json!(class);
            body["scope"] = json!(scope);
            body["retryAfter"] = json!(retry_after_secs);

            let mut response = (status, Json(body)).into_response();
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
            return response;
        }

        (status, Json(body)).into_response()
    }
}
