//! Shared test utilities for deploypilot integration tests.
//!
//! This module provides:
//! - In-memory fakes for the revision source, checkout, decryptor and handler
//! - `TestHarness` for running the reconciler inside a temp directory

pub mod fakes;
pub mod harness;

pub use fakes::*;
pub use harness::TestHarness;
