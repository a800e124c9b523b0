//! Circulation (borrow/return) service

use chrono::{Duration, Utc};

use crate::{
    config::LoansConfig,
    error::{AppError, AppResult},
    models::{
        reservation::ReservationDetails,
        transaction::{CreateTransaction, Transaction, TransactionDetails, TransactionQuery},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    config: LoansConfig,
}

impl LoansService {
    pub fn new(repository: Repository, config: LoansConfig) -> Self {
        Self { repository, config }
    }

    /// Get transaction with details by ID
    pub async fn get_details(&self, id: i32) -> AppResult<TransactionDetails> {
        self.repository.transactions.get_details(id).await
    }

    /// Search transactions with pagination
    pub async fn search(
        &self,
        query: &TransactionQuery,
    ) -> AppResult<(Vec<TransactionDetails>, i64)> {
        self.repository.transactions.search(query).await
    }

    /// Get all transactions of a member
    pub async fn get_member_transactions(
        &self,
        member_id: i32,
    ) -> AppResult<Vec<TransactionDetails>> {
        self.repository.members.get_by_id(member_id).await?;
        self.repository
            .transactions
            .get_member_transactions(member_id)
            .await
    }

    /// Borrow a book for a member, enforcing circulation rules
    pub async fn borrow(&self, request: &CreateTransaction) -> AppResult<Transaction> {
        let member = self.repository.members.get_by_id(request.member_id).await?;
        if !member.is_active {
            return Err(AppError::BusinessRule(
                "Member account is inactive".to_string(),
            ));
        }

        // NotFound before any copy check
        self.repository.books.get_by_id(request.book_id).await?;

        if self
            .repository
            .transactions
            .has_outstanding(request.member_id, request.book_id)
            .await?
        {
            return Err(AppError::Conflict(
                "Member already has this book on loan".to_string(),
            ));
        }

        let outstanding = self
            .repository
            .transactions
            .count_outstanding_for_member(request.member_id)
            .await?;
        if outstanding >= self.config.max_loans_per_member {
            return Err(AppError::BusinessRule(format!(
                "Member has reached the maximum of {} outstanding loans",
                self.config.max_loans_per_member
            )));
        }

        let due_date = Utc::now() + Duration::days(self.config.period_days);

        let transaction = self
            .repository
            .transactions
            .create(
                request.book_id,
                request.member_id,
                due_date,
                request.notes.as_deref(),
            )
            .await?;

        tracing::info!(
            "Book {} borrowed by member {} (transaction {})",
            request.book_id,
            request.member_id,
            transaction.id
        );

        Ok(transaction)
    }

    /// Return a borrowed book. If a pending reservation exists for the book,
    /// the oldest one is surfaced so staff can notify the member.
    pub async fn return_loan(
        &self,
        id: i32,
    ) -> AppResult<(TransactionDetails, Option<ReservationDetails>)> {
        let details = self.repository.transactions.return_loan(id).await?;

        let next_reservation = self
            .repository
            .reservations
            .oldest_pending_for_book(details.book_id)
            .await?;

        tracing::info!("Transaction {} returned", id);

        Ok((details, next_reservation))
    }
}
