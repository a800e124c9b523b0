//! Reservation management service

use crate::{
    error::{AppError, AppResult},
    models::{
        reservation::{
            CreateReservation, Reservation, ReservationDetails, ReservationQuery,
            ReservationStatus,
        },
        transaction::CreateTransaction,
    },
    repository::Repository,
    services::loans::LoansService,
};

#[derive(Clone)]
pub struct ReservationsService {
    repository: Repository,
    loans: LoansService,
}

impl ReservationsService {
    pub fn new(repository: Repository, loans: LoansService) -> Self {
        Self { repository, loans }
    }

    /// Search reservations with pagination
    pub async fn search(
        &self,
        query: &ReservationQuery,
    ) -> AppResult<(Vec<ReservationDetails>, i64)> {
        self.repository.reservations.search(query).await
    }

    /// Place a reservation. Only allowed while no copy is available.
    pub async fn create(&self, request: &CreateReservation) -> AppResult<Reservation> {
        let member = self.repository.members.get_by_id(request.member_id).await?;
        if !member.is_active {
            return Err(AppError::BusinessRule(
                "Member account is inactive".to_string(),
            ));
        }

        let book = self.repository.books.get_by_id(request.book_id).await?;
        if book.available_copies > 0 {
            return Err(AppError::BusinessRule(
                "Copies are available; borrow the book instead of reserving it".to_string(),
            ));
        }

        if self
            .repository
            .reservations
            .has_pending(request.member_id, request.book_id)
            .await?
        {
            return Err(AppError::Conflict(
                "Member already has a pending reservation for this book".to_string(),
            ));
        }

        let reservation = self
            .repository
            .reservations
            .create(request.book_id, request.member_id)
            .await?;

        tracing::info!(
            "Reservation {} placed for book {} by member {}",
            reservation.id,
            request.book_id,
            request.member_id
        );

        Ok(reservation)
    }

    /// Cancel a pending reservation
    pub async fn cancel(&self, id: i32) -> AppResult<Reservation> {
        self.repository
            .reservations
            .resolve(id, ReservationStatus::Cancelled)
            .await
    }

    /// Fulfill a pending reservation by borrowing the book for the member.
    /// Requires a copy to be back on the shelf.
    pub async fn fulfill(&self, id: i32) -> AppResult<Reservation> {
        // Guarded update: a concurrent cancel or double fulfill gets the
        // conflict here, before any loan exists
        let reservation = self
            .repository
            .reservations
            .resolve(id, ReservationStatus::Fulfilled)
            .await?;

        let request = CreateTransaction {
            book_id: reservation.book_id,
            member_id: reservation.member_id,
            notes: Some(format!("Fulfills reservation {}", reservation.id)),
        };

        // Same circulation rules as a direct borrow; a refused loan puts the
        // reservation back in the queue
        if let Err(err) = self.loans.borrow(&request).await {
            self.repository.reservations.reopen(id).await?;
            return Err(err);
        }

        tracing::info!(
            "Reservation {} fulfilled for member {}",
            reservation.id,
            reservation.member_id
        );

        Ok(reservation)
    }
}
