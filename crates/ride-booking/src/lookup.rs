//! Public availability checks used by the registration form.

use crate::{error::AppError, AppState};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use ride_db::{AccountRole, IdentityField};

#[derive(Debug, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct Availability {
    pub available: bool,
}

/// `?role=admin` checks against the administrator namespace, which only
/// differs from the standard one under per-role phone uniqueness.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct Scope {
    role: Option<String>,
}

impl Scope {
    fn role(&self) -> AccountRole {
        match self.role.as_deref() {
            Some("admin") => AccountRole::Administrator,
            _ => AccountRole::Standard,
        }
    }
}

async fn availability(
    app_state: &AppState,
    field: IdentityField,
    value: &str,
    scope: &Scope,
) -> Result<Json<Availability>, AppError> {
    let available = app_state
        .registry
        .is_available(field, value, scope.role())
        .await?;
    Ok(Json(Availability { available }))
}

pub async fn username(
    State(app_state): State<AppState>,
    Path(username): Path<String>,
    Query(scope): Query<Scope>,
) -> Result<Json<Availability>, AppError> {
    availability(&app_state, IdentityField::Username, &username, &scope).await
}

pub async fn phone(
    State(app_state): State<AppState>,
    Path(phone): Path<String>,
    Query(scope): Query<Scope>,
) -> Result<Json<Availability>, AppError> {
    availability(&app_state, IdentityField::Phone, &phone, &scope).await
}

pub async fn email(
    State(app_state): State<AppState>,
    Path(email): Path<String>,
    Query(scope): Query<Scope>,
) -> Result<Json<Availability>, AppError> {
    availability(&app_state, IdentityField::Email, &email, &scope).await
}
