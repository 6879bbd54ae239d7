//! Admin gate for protected endpoints.
//!
//! Callers present a bearer token issued by the auth backend. The gate
//! resolves the token to an account and checks the `admin` role grant in
//! the roles table, on every request; neither the token verdict nor the
//! role check is cached, so a revoked grant takes effect immediately.

use axum::Json;
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION, request::Parts};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::auth::{Account, AuthError};
use crate::db::RoleRepository;
use crate::db::roles::Role;
use crate::state::AppState;

/// Extractor that requires an authenticated admin account.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAdmin(account): RequireAdmin,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", account.email)
/// }
/// ```
pub struct RequireAdmin(pub Account);

/// Why the gate refused a request.
#[derive(Debug)]
pub enum AdminGateRejection {
    /// No bearer token on the request.
    MissingToken,
    /// The auth backend rejected the token.
    InvalidToken,
    /// The account exists but holds no `admin` grant.
    NotAdmin,
    /// The auth backend or the roles table could not be consulted.
    Unavailable,
}

impl AdminGateRejection {
    const fn status(&self) -> StatusCode {
        match self {
            Self::MissingToken | Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::NotAdmin => StatusCode::FORBIDDEN,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    const fn reason(&self) -> &'static str {
        match self {
            Self::MissingToken => "authentication required",
            Self::InvalidToken => "invalid or expired credentials",
            Self::NotAdmin => "admin role required",
            Self::Unavailable => "could not verify credentials",
        }
    }
}

impl IntoResponse for AdminGateRejection {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.reason() }))).into_response()
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AdminGateRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(AdminGateRejection::MissingToken)?;

        let account = state.auth().verify_token(token).await.map_err(|e| match e {
            AuthError::InvalidToken => AdminGateRejection::InvalidToken,
            AuthError::Http(_) | AuthError::Backend(_) => {
                tracing::error!(error = %e, "auth backend unavailable");
                AdminGateRejection::Unavailable
            }
        })?;

        let is_admin = RoleRepository::new(state.pool())
            .has_role(account.id, Role::Admin)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "role check failed");
                AdminGateRejection::Unavailable
            })?;

        if !is_admin {
            tracing::info!(account_id = %account.id, "non-admin denied");
            return Err(AdminGateRejection::NotAdmin);
        }

        Ok(Self(account))
    }
}

/// Token from an `Authorization: Bearer ...` header, if present.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
