//! Transactions (circulation) repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::transaction::{Transaction, TransactionDetails, TransactionQuery},
};

const DETAILS_SELECT: &str = r#"
    SELECT t.id, t.book_id, t.member_id, t.borrow_date, t.due_date,
           t.returned_date, t.notes,
           b.title as book_title, b.isbn as book_isbn,
           m.name as member_name
    FROM transactions t
    JOIN books b ON t.book_id = b.id
    JOIN members m ON t.member_id = m.id
"#;

fn row_to_details(row: &PgRow, now: DateTime<Utc>) -> TransactionDetails {
    let due_date: DateTime<Utc> = row.get("due_date");
    let returned_date: Option<DateTime<Utc>> = row.get("returned_date");

    TransactionDetails {
        id: row.get("id"),
        book_id: row.get("book_id"),
        book_title: row.get("book_title"),
        book_isbn: row.get("book_isbn"),
        member_id: row.get("member_id"),
        member_name: row.get("member_name"),
        borrow_date: row.get("borrow_date"),
        due_date,
        returned_date,
        is_overdue: returned_date.is_none() && due_date < now,
        notes: row.get("notes"),
    }
}

#[derive(Clone)]
pub struct TransactionsRepository {
    pool: Pool<Postgres>,
}

impl TransactionsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get transaction by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Transaction> {
        sqlx::query_as::<_, Transaction>("SELECT * FROM transactions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Transaction with id {} not found", id)))
    }

    /// Get transaction with book and member details
    pub async fn get_details(&self, id: i32) -> AppResult<TransactionDetails> {
        let query = format!("{} WHERE t.id = $1", DETAILS_SELECT);
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Transaction with id {} not found", id)))?;

        Ok(row_to_details(&row, Utc::now()))
    }

    /// Search transactions with pagination
    pub async fn search(
        &self,
        query: &TransactionQuery,
    ) -> AppResult<(Vec<TransactionDetails>, i64)> {
        let (per_page, offset) = super::page_bounds(query.page, query.per_page);

        let mut conditions = Vec::new();
        let mut params: Vec<i32> = Vec::new();

        if let Some(member_id) = query.member_id {
            params.push(member_id);
            conditions.push(format!("t.member_id = ${}", params.len()));
        }

        if let Some(book_id) = query.book_id {
            params.push(book_id);
            conditions.push(format!("t.book_id = ${}", params.len()));
        }

        if query.outstanding == Some(true) || query.overdue == Some(true) {
            conditions.push("t.returned_date IS NULL".to_string());
        }

        if query.overdue == Some(true) {
            conditions.push("t.due_date < NOW()".to_string());
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_query = format!(
            "SELECT COUNT(*) FROM transactions t {}",
            where_clause
        );
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_query);
        for param in &params {
            count_builder = count_builder.bind(param);
        }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_query = format!(
            "{} {} ORDER BY t.borrow_date DESC LIMIT {} OFFSET {}",
            DETAILS_SELECT, where_clause, per_page, offset
        );
        let mut select_builder = sqlx::query(&select_query);
        for param in &params {
            select_builder = select_builder.bind(param);
        }
        let rows = select_builder.fetch_all(&self.pool).await?;

        let now = Utc::now();
        let transactions = rows.iter().map(|r| row_to_details(r, now)).collect();

        Ok((transactions, total))
    }

    /// Get all transactions of a member, most recent first
    pub async fn get_member_transactions(
        &self,
        member_id: i32,
    ) -> AppResult<Vec<TransactionDetails>> {
        let query = format!(
            "{} WHERE t.member_id = $1 ORDER BY t.borrow_date DESC",
            DETAILS_SELECT
        );
        let rows = sqlx::query(&query)
            .bind(member_id)
            .fetch_all(&self.pool)
            .await?;

        let now = Utc::now();
        Ok(rows.iter().map(|r| row_to_details(r, now)).collect())
    }

    /// Fetch all transactions (for exports), most recent first
    pub async fn list_all(&self) -> AppResult<Vec<TransactionDetails>> {
        let query = format!("{} ORDER BY t.borrow_date DESC", DETAILS_SELECT);
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        let now = Utc::now();
        Ok(rows.iter().map(|r| row_to_details(r, now)).collect())
    }

    /// Count outstanding loans for a member
    pub async fn count_outstanding_for_member(&self, member_id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM transactions WHERE member_id = $1 AND returned_date IS NULL",
        )
        .bind(member_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Check whether a member already has this book out
    pub async fn has_outstanding(&self, member_id: i32, book_id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM transactions
                WHERE member_id = $1 AND book_id = $2 AND returned_date IS NULL
            )
            "#,
        )
        .bind(member_id)
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Create a borrow transaction, taking one copy off the shelf.
    /// The guarded UPDATE keeps available_copies from going negative under
    /// concurrent borrows.
    pub async fn create(
        &self,
        book_id: i32,
        member_id: i32,
        due_date: DateTime<Utc>,
        notes: Option<&str>,
    ) -> AppResult<Transaction> {
        let mut tx = self.pool.begin().await?;

        let taken = sqlx::query(
            "UPDATE books SET available_copies = available_copies - 1, updated_at = NOW() \
             WHERE id = $1 AND available_copies > 0",
        )
        .bind(book_id)
        .execute(&mut *tx)
        .await?;

        if taken.rows_affected() == 0 {
            return Err(AppError::Conflict(
                "No available copies of this book".to_string(),
            ));
        }

        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO transactions (book_id, member_id, due_date, notes)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(book_id)
        .bind(member_id)
        .bind(due_date)
        .bind(notes)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_by_id(id).await
    }

    /// Return a borrowed book, putting the copy back on the shelf
    pub async fn return_loan(&self, id: i32) -> AppResult<TransactionDetails> {
        let mut tx = self.pool.begin().await?;

        let loan = sqlx::query_as::<_, Transaction>(
            "SELECT * FROM transactions WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Transaction with id {} not found", id)))?;

        if loan.returned_date.is_some() {
            return Err(AppError::Conflict("Book already returned".to_string()));
        }

        sqlx::query("UPDATE transactions SET returned_date = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE books SET available_copies = LEAST(total_copies, available_copies + 1), \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(loan.book_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_details(id).await
    }

    /// Count outstanding loans
    pub async fn count_outstanding(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM transactions WHERE returned_date IS NULL",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Count overdue loans
    pub async fn count_overdue(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM transactions WHERE returned_date IS NULL AND due_date < NOW()",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
