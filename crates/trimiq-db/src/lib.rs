//! SQLite-backed user accounts and minutes-used billing ledger.

pub mod error;
pub mod store;

pub use error::{DbError, DbResult};
pub use store::Database;
