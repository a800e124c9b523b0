//! Dashboard statistics endpoint

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppResult;

use super::AuthenticatedUser;

/// Dashboard counters
#[derive(Serialize, ToSchema)]
pub struct StatsResponse {
    /// Number of distinct titles in the catalog
    pub total_books: i64,
    /// Copies currently out on loan
    pub copies_out: i64,
    /// Registered members
    pub total_members: i64,
    /// Loans not yet returned
    pub outstanding_loans: i64,
    /// Loans past their due date
    pub overdue_loans: i64,
    /// Reservations waiting for a copy
    pub pending_reservations: i64,
}

/// Get dashboard statistics
#[utoipa::path(
    get,
    path = "/stats",
    tag = "stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Library statistics", body = StatsResponse),
        (status = 403, description = "Staff privileges required")
    )
)]
pub async fn get_stats(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<StatsResponse>> {
    claims.require_staff()?;

    let stats = state.services.stats.get_stats().await?;
    Ok(Json(stats))
}
