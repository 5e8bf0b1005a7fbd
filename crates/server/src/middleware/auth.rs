use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    extract::CookieJar,
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use std::sync::Arc;

use crate::error::AppError;
use crate::models::AuthUser;
use crate::{db, AppState};

pub const SESSION_COOKIE: &str = "gather.session_token";

/// Resolves the caller from a bearer token, falling back to the session cookie.
/// Token issuance lives in the identity service; this only looks sessions up.
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let bearer = TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .ok()
            .map(|TypedHeader(Authorization(bearer))| bearer.token().to_string());

        let token = match bearer {
            Some(t) => Some(t),
            None => {
                let jar = CookieJar::from_request_parts(parts, state)
                    .await
                    .map_err(|_| AppError::Unauthenticated("Not authenticated"))?;
                jar.get(SESSION_COOKIE).map(|c| c.value().to_string())
            }
        };

        let token = match token {
            Some(t) if !t.is_empty() => t,
            _ => return Err(AppError::Unauthenticated("Not authenticated")),
        };

        let row = sqlx::query_as::<_, (String, String)>(
            r#"SELECT s.user_id, s.expires_at FROM "session" s WHERE s.token = ?"#,
        )
        .bind(&token)
        .fetch_optional(&state.db)
        .await?;

        let (user_id, expires_at) =
            row.ok_or(AppError::Unauthenticated("Invalid session"))?;

        if expires_at < db::now() {
            return Err(AppError::Unauthenticated("Session expired"));
        }

        Ok(AuthUser { id: user_id })
    }
}
