//! # Gatepass Repository
//!
//! Data access for attendee records.
//!
//! ```text
//! Service
//!   ↓  Arc<dyn UserRepository>        (domain interface)
//! PgUserRepository                    (SQLx / PostgreSQL)
//!   ↓  Arc<dyn DatabasePoolInterface>
//! PostgreSQL
//! ```
//!
//! The check-in write is a single conditional `UPDATE`, so two concurrent
//! scans on the same day cannot both succeed.

pub mod pool;
pub mod postgres;
pub mod traits;

pub use pool::*;
pub use postgres::*;
pub use traits::*;
