//! CSV and PDF export endpoints

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};

use crate::error::AppResult;

use super::AuthenticatedUser;

fn download(bytes: Vec<u8>, content_type: &'static str, filename: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response()
}

/// Export the book catalog as CSV
#[utoipa::path(
    get,
    path = "/export/books.csv",
    tag = "export",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "CSV download", content_type = "text/csv"),
        (status = 403, description = "Staff privileges required")
    )
)]
pub async fn books_csv(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Response> {
    claims.require_staff()?;

    let bytes = state.services.export.books_csv().await?;
    Ok(download(bytes, "text/csv", "books.csv"))
}

/// Export the member list as CSV
#[utoipa::path(
    get,
    path = "/export/members.csv",
    tag = "export",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "CSV download", content_type = "text/csv"),
        (status = 403, description = "Staff privileges required")
    )
)]
pub async fn members_csv(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Response> {
    claims.require_staff()?;

    let bytes = state.services.export.members_csv().await?;
    Ok(download(bytes, "text/csv", "members.csv"))
}

/// Export the transaction history as CSV
#[utoipa::path(
    get,
    path = "/export/transactions.csv",
    tag = "export",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "CSV download", content_type = "text/csv"),
        (status = 403, description = "Staff privileges required")
    )
)]
pub async fn transactions_csv(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Response> {
    claims.require_staff()?;

    let bytes = state.services.export.transactions_csv().await?;
    Ok(download(bytes, "text/csv", "transactions.csv"))
}

/// Export the book catalog as PDF
#[utoipa::path(
    get,
    path = "/export/books.pdf",
    tag = "export",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "PDF download", content_type = "application/pdf"),
        (status = 403, description = "Staff privileges required")
    )
)]
pub async fn books_pdf(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Response> {
    claims.require_staff()?;

    let bytes = state.services.export.books_pdf().await?;
    Ok(download(bytes, "application/pdf", "books.pdf"))
}

/// Export the transaction history as PDF
#[utoipa::path(
    get,
    path = "/export/transactions.pdf",
    tag = "export",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "PDF download", content_type = "application/pdf"),
        (status = 403, description = "Staff privileges required")
    )
)]
pub async fn transactions_pdf(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Response> {
    claims.require_staff()?;

    let bytes = state.services.export.transactions_pdf().await?;
    Ok(download(bytes, "application/pdf", "transactions.pdf"))
}
