//! Repository layer for database operations

pub mod books;
pub mod members;
pub mod reservations;
pub mod transactions;
pub mod users;

use sqlx::{Pool, Postgres};

/// Maximum rows a single page may request
const MAX_PER_PAGE: i64 = 100;

/// Clamp pagination parameters and compute the row offset. Out-of-range
/// values (page 0, negative or oversized per_page) would otherwise reach
/// LIMIT/OFFSET and fail the query.
pub(crate) fn page_bounds(page: Option<i64>, per_page: Option<i64>) -> (i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(20).clamp(1, MAX_PER_PAGE);
    (per_page, (page - 1) * per_page)
}

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub books: books::BooksRepository,
    pub members: members::MembersRepository,
    pub transactions: transactions::TransactionsRepository,
    pub reservations: reservations::ReservationsRepository,
    pub users: users::UsersRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: books::BooksRepository::new(pool.clone()),
            members: members::MembersRepository::new(pool.clone()),
            transactions: transactions::TransactionsRepository::new(pool.clone()),
            reservations: reservations::ReservationsRepository::new(pool.clone()),
            users: users::UsersRepository::new(pool.clone()),
            pool,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_bounds_defaults() {
        assert_eq!(page_bounds(None, None), (20, 0));
        assert_eq!(page_bounds(Some(3), Some(10)), (10, 20));
    }

    #[test]
    fn page_bounds_clamps_out_of_range_values() {
        // page 0 and negatives land on the first page
        assert_eq!(page_bounds(Some(0), Some(20)), (20, 0));
        assert_eq!(page_bounds(Some(-5), Some(20)), (20, 0));
        // per_page is forced into 1..=100
        assert_eq!(page_bounds(Some(1), Some(-1)), (1, 0));
        assert_eq!(page_bounds(Some(1), Some(0)), (1, 0));
        assert_eq!(page_bounds(Some(2), Some(10_000)), (100, 100));
    }
}
