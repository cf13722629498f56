//! Core types and error handling.
//!
//! This module hosts the strongly-typed error enum used across the crate and
//! the user-facing error presentation helpers consumed by the CLI entry
//! point.

pub mod error;

pub use error::{CartwheelError, ErrorContext, user_friendly_error};
