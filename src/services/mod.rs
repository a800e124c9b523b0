//! Business logic services

pub mod auth;
pub mod books;
pub mod export;
pub mod loans;
pub mod members;
pub mod rate_limit;
pub mod reservations;
pub mod stats;

use crate::{config::AppConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub books: books::BooksService,
    pub members: members::MembersService,
    pub loans: loans::LoansService,
    pub reservations: reservations::ReservationsService,
    pub stats: stats::StatsService,
    pub export: export::ExportService,
    pub rate_limit: rate_limit::RateLimitService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> Self {
        let loans = loans::LoansService::new(repository.clone(), config.loans.clone());
        Self {
            auth: auth::AuthService::new(repository.clone(), config.auth.clone()),
            books: books::BooksService::new(repository.clone()),
            members: members::MembersService::new(repository.clone()),
            // Fulfillment borrows through the same circulation rules
            reservations: reservations::ReservationsService::new(
                repository.clone(),
                loans.clone(),
            ),
            loans,
            stats: stats::StatsService::new(repository.clone()),
            export: export::ExportService::new(repository),
            rate_limit: rate_limit::RateLimitService::new(config.rate_limit.clone()),
        }
    }
}
