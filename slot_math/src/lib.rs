//! # Slot Math
//!
//! Rolling statistics over weekly-periodic time series.
//! Observations are grouped by their slot key (day of week and time of day)
//! so that "same slot last week" semantics survive gaps of several weeks.

use thiserror::Error;

pub mod slot;
pub mod window;

pub use slot::SlotKey;
pub use window::{SlotBuffer, SlotWindower};

/// Errors that can occur in slot-keyed calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for slot math operations
pub type Result<T> = std::result::Result<T, MathError>;
