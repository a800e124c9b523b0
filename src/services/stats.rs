//! Dashboard statistics service

use crate::{
    api::stats::StatsResponse,
    error::AppResult,
    repository::Repository,
};

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
}

impl StatsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Database pool accessor for readiness probes
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.repository.pool
    }

    /// Collect dashboard counters
    pub async fn get_stats(&self) -> AppResult<StatsResponse> {
        let (total_books, copies_out) = self.repository.books.counts().await?;
        let total_members = self.repository.members.count().await?;
        let outstanding_loans = self.repository.transactions.count_outstanding().await?;
        let overdue_loans = self.repository.transactions.count_overdue().await?;
        let pending_reservations = self.repository.reservations.count_pending().await?;

        Ok(StatsResponse {
            total_books,
            copies_out,
            total_members,
            outstanding_loans,
            overdue_loans,
            pending_reservations,
        })
    }
}
