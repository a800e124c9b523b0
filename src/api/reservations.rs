//! Reservation endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::reservation::{
        CreateReservation, Reservation, ReservationDetails, ReservationQuery,
    },
};

use super::{AuthenticatedUser, PaginatedResponse};

/// List reservations with filters and pagination
#[utoipa::path(
    get,
    path = "/reservations",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(
        ("status" = Option<String>, Query, description = "Filter by status (pending, fulfilled, cancelled)"),
        ("book_id" = Option<i32>, Query, description = "Filter by book"),
        ("member_id" = Option<i32>, Query, description = "Filter by member"),
        ("page" = Option<i64>, Query, description = "Page number"),
        ("per_page" = Option<i64>, Query, description = "Items per page")
    ),
    responses(
        (status = 200, description = "List of reservations", body = PaginatedResponse<ReservationDetails>),
        (status = 403, description = "Staff privileges required")
    )
)]
pub async fn list_reservations(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<ReservationQuery>,
) -> AppResult<Json<PaginatedResponse<ReservationDetails>>> {
    claims.require_staff()?;

    let (reservations, total) = state.services.reservations.search(&query).await?;

    Ok(Json(PaginatedResponse {
        items: reservations,
        total,
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(20),
    }))
}

/// Place a reservation for an unavailable book
#[utoipa::path(
    post,
    path = "/reservations",
    tag = "reservations",
    security(("bearer_auth" = [])),
    request_body = CreateReservation,
    responses(
        (status = 201, description = "Reservation placed", body = Reservation),
        (status = 404, description = "Book or member not found"),
        (status = 409, description = "Duplicate pending reservation"),
        (status = 422, description = "Copies are available")
    )
)]
pub async fn create_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateReservation>,
) -> AppResult<(StatusCode, Json<Reservation>)> {
    claims.require_staff()?;

    let reservation = state.services.reservations.create(&request).await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

/// Cancel a pending reservation
#[utoipa::path(
    post,
    path = "/reservations/{id}/cancel",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Reservation ID")
    ),
    responses(
        (status = 200, description = "Reservation cancelled", body = Reservation),
        (status = 404, description = "Reservation not found"),
        (status = 409, description = "Already resolved")
    )
)]
pub async fn cancel_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Reservation>> {
    claims.require_staff()?;

    let reservation = state.services.reservations.cancel(id).await?;
    Ok(Json(reservation))
}

/// Fulfill a pending reservation by creating the loan
#[utoipa::path(
    post,
    path = "/reservations/{id}/fulfill",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Reservation ID")
    ),
    responses(
        (status = 200, description = "Reservation fulfilled", body = Reservation),
        (status = 404, description = "Reservation not found"),
        (status = 409, description = "No copy available or already resolved")
    )
)]
pub async fn fulfill_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Reservation>> {
    claims.require_staff()?;

    let reservation = state.services.reservations.fulfill(id).await?;
    Ok(Json(reservation))
}
