//! Borrow/return transaction model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

/// Transaction model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Transaction {
    pub id: i32,
    pub book_id: i32,
    pub member_id: i32,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub returned_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Transaction with book and member details for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionDetails {
    pub id: i32,
    pub book_id: i32,
    pub book_title: String,
    pub book_isbn: String,
    pub member_id: i32,
    pub member_name: String,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub returned_date: Option<DateTime<Utc>>,
    pub is_overdue: bool,
    pub notes: Option<String>,
}

/// Create transaction (borrow) request
#[derive(Debug, Deserialize)]
pub struct CreateTransaction {
    pub book_id: i32,
    pub member_id: i32,
    pub notes: Option<String>,
}

/// Transaction query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct TransactionQuery {
    pub member_id: Option<i32>,
    pub book_id: Option<i32>,
    /// Only loans not yet returned
    pub outstanding: Option<bool>,
    /// Only loans past their due date
    pub overdue: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}
