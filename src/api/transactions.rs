//! Circulation (borrow/return) endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{
        reservation::ReservationDetails,
        transaction::{CreateTransaction, TransactionDetails, TransactionQuery},
    },
};

use super::{AuthenticatedUser, PaginatedResponse};

/// Borrow request
#[derive(Deserialize, ToSchema)]
pub struct BorrowRequest {
    /// Book ID
    pub book_id: i32,
    /// Member ID
    pub member_id: i32,
    /// Free-form note on the loan
    pub notes: Option<String>,
}

/// Borrow response with the due date
#[derive(Serialize, ToSchema)]
pub struct BorrowResponse {
    /// Transaction ID
    pub id: i32,
    /// Due date (ISO 8601 format)
    pub due_date: DateTime<Utc>,
    /// Status message
    pub message: String,
}

/// Return response with transaction details
#[derive(Serialize, ToSchema)]
pub struct ReturnResponse {
    /// Return status
    pub status: String,
    /// Transaction details
    pub transaction: TransactionDetails,
    /// Oldest pending reservation for the returned book, if any
    pub next_reservation: Option<ReservationDetails>,
}

/// List transactions with filters and pagination
#[utoipa::path(
    get,
    path = "/transactions",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(
        ("member_id" = Option<i32>, Query, description = "Filter by member"),
        ("book_id" = Option<i32>, Query, description = "Filter by book"),
        ("outstanding" = Option<bool>, Query, description = "Only loans not yet returned"),
        ("overdue" = Option<bool>, Query, description = "Only loans past their due date"),
        ("page" = Option<i64>, Query, description = "Page number"),
        ("per_page" = Option<i64>, Query, description = "Items per page")
    ),
    responses(
        (status = 200, description = "List of transactions", body = PaginatedResponse<TransactionDetails>),
        (status = 403, description = "Staff privileges required")
    )
)]
pub async fn list_transactions(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<TransactionQuery>,
) -> AppResult<Json<PaginatedResponse<TransactionDetails>>> {
    claims.require_staff()?;

    let (transactions, total) = state.services.loans.search(&query).await?;

    Ok(Json(PaginatedResponse {
        items: transactions,
        total,
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(20),
    }))
}

/// Get transaction details by ID
#[utoipa::path(
    get,
    path = "/transactions/{id}",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Transaction ID")
    ),
    responses(
        (status = 200, description = "Transaction details", body = TransactionDetails),
        (status = 404, description = "Transaction not found")
    )
)]
pub async fn get_transaction(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<TransactionDetails>> {
    claims.require_staff()?;

    let transaction = state.services.loans.get_details(id).await?;
    Ok(Json(transaction))
}

/// Borrow a book for a member
#[utoipa::path(
    post,
    path = "/transactions",
    tag = "transactions",
    security(("bearer_auth" = [])),
    request_body = BorrowRequest,
    responses(
        (status = 201, description = "Book borrowed", body = BorrowResponse),
        (status = 404, description = "Book or member not found"),
        (status = 409, description = "No available copies or duplicate loan"),
        (status = 422, description = "Circulation rule violated")
    )
)]
pub async fn create_transaction(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<BorrowRequest>,
) -> AppResult<(StatusCode, Json<BorrowResponse>)> {
    claims.require_staff()?;

    let transaction = state
        .services
        .loans
        .borrow(&CreateTransaction {
            book_id: request.book_id,
            member_id: request.member_id,
            notes: request.notes,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(BorrowResponse {
            id: transaction.id,
            due_date: transaction.due_date,
            message: "Book borrowed successfully".to_string(),
        }),
    ))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/transactions/{id}/return",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Transaction ID")
    ),
    responses(
        (status = 200, description = "Book returned", body = ReturnResponse),
        (status = 404, description = "Transaction not found"),
        (status = 409, description = "Already returned")
    )
)]
pub async fn return_transaction(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ReturnResponse>> {
    claims.require_staff()?;

    let (transaction, next_reservation) = state.services.loans.return_loan(id).await?;

    Ok(Json(ReturnResponse {
        status: "returned".to_string(),
        transaction,
        next_reservation,
    }))
}
