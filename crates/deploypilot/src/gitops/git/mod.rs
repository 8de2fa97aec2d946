//! Git operations for fetching the monitored repository.

pub mod auth;
pub mod checkout;

pub use checkout::{Checkout, GitCheckout, DEFAULT_CLONE_BASE_URL};
