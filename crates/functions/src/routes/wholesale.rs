//! Wholesale route handlers.
//!
//! Applications come in from the public site; approval happens offline
//! (CLI) and the sync endpoint pushes approved applications into the
//! customer table the storefront checks.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;
use wildcurrant_core::Email;

use crate::db::{NewApplication, WholesaleRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

const MAX_NAME_CHARS: usize = 200;
const MAX_PHONE_CHARS: usize = 50;
const MAX_MESSAGE_CHARS: usize = 2000;

/// Request body for a wholesale application.
#[derive(Debug, Deserialize)]
pub struct ApplicationRequest {
    pub business_name: String,
    pub contact_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: Option<String>,
}

/// Query parameters for the status check.
#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub email: String,
}

/// Submit a wholesale application.
///
/// POST /api/wholesale/applications
///
/// One application per email; a duplicate is a 409.
#[instrument(skip(state, request), fields(business_name = %request.business_name))]
pub async fn apply(
    State(state): State<AppState>,
    Json(request): Json<ApplicationRequest>,
) -> Result<impl IntoResponse> {
    let email = Email::parse(&request.email).map_err(|error| AppError::Validation {
        field: "email",
        message: error.to_string(),
    })?;

    let business_name = required_name(&request.business_name, "business_name")?;
    let contact_name = required_name(&request.contact_name, "contact_name")?;

    let phone = optional_trimmed(request.phone.as_deref());
    if let Some(phone) = &phone
        && phone.chars().count() > MAX_PHONE_CHARS
    {
        return Err(AppError::Validation {
            field: "phone",
            message: format!("Phone must be at most {MAX_PHONE_CHARS} characters."),
        });
    }

    let message = optional_trimmed(request.message.as_deref());
    if let Some(message) = &message
        && message.chars().count() > MAX_MESSAGE_CHARS
    {
        return Err(AppError::Validation {
            field: "message",
            message: format!("Message must be at most {MAX_MESSAGE_CHARS} characters."),
        });
    }

    let application = WholesaleRepository::new(state.pool())
        .create_application(&NewApplication {
            business_name,
            contact_name,
            email: email.as_str().to_string(),
            phone,
            message,
        })
        .await?;

    tracing::info!(application_id = %application.id, "wholesale application received");

    Ok((StatusCode::CREATED, Json(application)))
}

/// Whether an email belongs to an active wholesale customer.
///
/// GET /api/wholesale/status?email=
#[instrument(skip(state, query))]
pub async fn status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<impl IntoResponse> {
    let email = Email::parse(&query.email).map_err(|error| AppError::Validation {
        field: "email",
        message: error.to_string(),
    })?;

    let active = WholesaleRepository::new(state.pool())
        .is_active_customer(email.as_str())
        .await?;

    Ok(Json(json!({ "active": active })))
}

/// Sync approved applications into the customer table.
///
/// POST /api/wholesale/sync (admin)
#[instrument(skip(state, admin))]
pub async fn sync(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<impl IntoResponse> {
    let synced = WholesaleRepository::new(state.pool()).sync_approved().await?;
    tracing::info!(admin = %admin.email, synced, "wholesale sync finished");
    Ok(Json(json!({ "synced": synced })))
}

/// Validate a required free-text name field.
fn required_name(value: &str, field: &'static str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation {
            field,
            message: "This field is required.".to_string(),
        });
    }
    if trimmed.chars().count() > MAX_NAME_CHARS {
        return Err(AppError::Validation {
            field,
            message: format!("Must be at most {MAX_NAME_CHARS} characters."),
        });
    }
    Ok(trimmed.to_string())
}

/// Trim an optional field, collapsing empty strings to `None`.
fn optional_trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_required_name_trims_and_caps() {
        assert_eq!(
            required_name("  Curious Cellars  ", "business_name").unwrap(),
            "Curious Cellars"
        );
        assert!(required_name("   ", "business_name").is_err());
        assert!(required_name(&"x".repeat(MAX_NAME_CHARS + 1), "business_name").is_err());
    }

    #[test]
    fn test_optional_fields_collapse_to_none() {
        assert_eq!(optional_trimmed(None), None);
        assert_eq!(optional_trimmed(Some("   ")), None);
        assert_eq!(
            optional_trimmed(Some(" +44 20 7946 0000 ")),
            Some("+44 20 7946 0000".to_string())
        );
    }
}
