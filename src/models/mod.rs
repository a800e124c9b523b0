//! Data models for Libris

pub mod book;
pub mod member;
pub mod reservation;
pub mod transaction;
pub mod user;

// Re-export commonly used types
pub use book::Book;
pub use member::Member;
pub use reservation::{Reservation, ReservationStatus};
pub use transaction::{Transaction, TransactionDetails};
pub use user::{Role, User, UserClaims};
