//! API request handlers.

pub mod account;
pub mod auth;
pub mod health;
pub mod jobs;
pub mod process;

pub use health::{health, ready};
