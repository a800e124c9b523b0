//! Reservations repository for database operations

use sqlx::{postgres::PgRow, Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::reservation::{
        Reservation, ReservationDetails, ReservationQuery, ReservationStatus,
    },
};

const DETAILS_SELECT: &str = r#"
    SELECT r.id, r.book_id, r.member_id, r.status, r.created_at, r.resolved_at,
           b.title as book_title, m.name as member_name
    FROM reservations r
    JOIN books b ON r.book_id = b.id
    JOIN members m ON r.member_id = m.id
"#;

fn row_to_details(row: &PgRow) -> ReservationDetails {
    ReservationDetails {
        id: row.get("id"),
        book_id: row.get("book_id"),
        book_title: row.get("book_title"),
        member_id: row.get("member_id"),
        member_name: row.get("member_name"),
        status: row.get("status"),
        created_at: row.get("created_at"),
        resolved_at: row.get("resolved_at"),
    }
}

#[derive(Clone)]
pub struct ReservationsRepository {
    pool: Pool<Postgres>,
}

impl ReservationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get reservation by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Reservation> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reservation with id {} not found", id)))
    }

    /// Check whether a member already has a pending reservation for a book
    pub async fn has_pending(&self, member_id: i32, book_id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM reservations
                WHERE member_id = $1 AND book_id = $2 AND status = 'pending'
            )
            "#,
        )
        .bind(member_id)
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Oldest pending reservation for a book, if any
    pub async fn oldest_pending_for_book(
        &self,
        book_id: i32,
    ) -> AppResult<Option<ReservationDetails>> {
        let query = format!(
            "{} WHERE r.book_id = $1 AND r.status = 'pending' ORDER BY r.created_at LIMIT 1",
            DETAILS_SELECT
        );
        let row = sqlx::query(&query)
            .bind(book_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(row_to_details))
    }

    /// Search reservations with pagination
    pub async fn search(
        &self,
        query: &ReservationQuery,
    ) -> AppResult<(Vec<ReservationDetails>, i64)> {
        let (per_page, offset) = super::page_bounds(query.page, query.per_page);

        let mut conditions = Vec::new();
        let mut params: Vec<String> = Vec::new();

        if let Some(status) = query.status {
            params.push(status.as_str().to_string());
            conditions.push(format!("r.status = ${}", params.len()));
        }

        if let Some(book_id) = query.book_id {
            params.push(book_id.to_string());
            conditions.push(format!("r.book_id = ${}::int", params.len()));
        }

        if let Some(member_id) = query.member_id {
            params.push(member_id.to_string());
            conditions.push(format!("r.member_id = ${}::int", params.len()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_query = format!("SELECT COUNT(*) FROM reservations r {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_query);
        for param in &params {
            count_builder = count_builder.bind(param);
        }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_query = format!(
            "{} {} ORDER BY r.created_at DESC LIMIT {} OFFSET {}",
            DETAILS_SELECT, where_clause, per_page, offset
        );
        let mut select_builder = sqlx::query(&select_query);
        for param in &params {
            select_builder = select_builder.bind(param);
        }
        let rows = select_builder.fetch_all(&self.pool).await?;

        let reservations = rows.iter().map(row_to_details).collect();

        Ok((reservations, total))
    }

    /// Create a pending reservation
    pub async fn create(&self, book_id: i32, member_id: i32) -> AppResult<Reservation> {
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO reservations (book_id, member_id, status)
            VALUES ($1, $2, 'pending')
            RETURNING id
            "#,
        )
        .bind(book_id)
        .bind(member_id)
        .fetch_one(&self.pool)
        .await?;

        self.get_by_id(id).await
    }

    /// Move a pending reservation to a terminal status
    pub async fn resolve(&self, id: i32, status: ReservationStatus) -> AppResult<Reservation> {
        let result = sqlx::query(
            "UPDATE reservations SET status = $1, resolved_at = NOW() \
             WHERE id = $2 AND status = 'pending'",
        )
        .bind(status)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Either missing or already resolved; disambiguate for the caller
            let existing = self.get_by_id(id).await?;
            return Err(AppError::Conflict(format!(
                "Reservation is already {}",
                existing.status
            )));
        }

        self.get_by_id(id).await
    }

    /// Put a fulfilled reservation back in the pending queue. Used when the
    /// loan backing a fulfillment is refused.
    pub async fn reopen(&self, id: i32) -> AppResult<()> {
        sqlx::query(
            "UPDATE reservations SET status = 'pending', resolved_at = NULL \
             WHERE id = $1 AND status = 'fulfilled'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Count pending reservations
    pub async fn count_pending(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reservations WHERE status = 'pending'",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
