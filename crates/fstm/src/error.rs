//! Error Module - FSTM Error Types
//!
//! Defines all error types used in FSTM.
//!
//! The barrier layer has no recoverable failure of its own. Everything it
//! returns as `Err` either came from the transaction engine (an abort that
//! must reach the enclosing transaction unchanged) or from configuration.
//!
//! # Error Categories
//!
//! ## Engine Errors
//! - `Aborted` - The engine abandoned the transaction during a word access
//! - `Cancelled` - The user cancelled the current scope
//!
//! ## Configuration Errors
//! - `Configuration` - Invalid barrier configuration
//!
//! ## Internal Errors
//! - `Internal` - Invariant violation inside an engine adapter

use crate::config::ConfigError;
use std::fmt;
use thiserror::Error;

/// Why the transaction engine aborted a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbortReason {
    /// Another transaction wrote a location this one depends on
    Conflict,
    /// Read set validation failed
    Validation,
    /// An engine resource (log, lock table) is exhausted
    Capacity,
    /// The program requested the abort
    Explicit,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AbortReason::Conflict => "conflict",
            AbortReason::Validation => "validation failed",
            AbortReason::Capacity => "capacity exceeded",
            AbortReason::Explicit => "explicit abort",
        };
        f.write_str(name)
    }
}

/// Main error type for all FSTM operations
///
/// # Examples
///
/// ```rust
/// use fstm::error::{AbortReason, StmError};
///
/// fn handle_error(err: StmError) {
///     match err {
///         StmError::Aborted { address, reason } => {
///             eprintln!("aborted at {:#x}: {}", address, reason);
///         }
///         _ => {
///             eprintln!("Other error: {}", err);
///         }
///     }
/// }
///
/// handle_error(StmError::aborted(0x1000, AbortReason::Conflict));
/// ```
#[derive(Debug, Error)]
pub enum StmError {
    /// Transaction aborted by the engine
    ///
    /// **When returned:** A word-level read or write reached a conflict.
    ///
    /// **Recovery strategy:** None at this layer. The enclosing transaction
    /// unwinds and the engine decides whether to retry.
    #[error("Transaction aborted at {address:#x}: {reason}")]
    Aborted { address: usize, reason: AbortReason },

    /// Scope cancelled
    ///
    /// **When returned:** The program cancelled the innermost scope while
    /// an access was in flight.
    #[error("Transaction scope cancelled")]
    Cancelled,

    /// Configuration error
    ///
    /// **When returned:** A barrier was built from an invalid `StmConfig`.
    ///
    /// **Recovery strategy:** Use default configuration or fail fast
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Internal error - indicates a bug in an engine adapter
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StmError {
    /// Build an abort error for `address`
    pub fn aborted(address: usize, reason: AbortReason) -> Self {
        StmError::Aborted { address, reason }
    }

    /// Check if this error unwinds the enclosing transaction
    pub fn is_abort(&self) -> bool {
        matches!(self, StmError::Aborted { .. } | StmError::Cancelled)
    }

    /// Check if the engine may retry the transaction after this error
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StmError::Aborted {
                reason: AbortReason::Conflict | AbortReason::Validation | AbortReason::Capacity,
                ..
            }
        )
    }

    /// Check if this error indicates a bug in the code
    pub fn is_bug(&self) -> bool {
        matches!(self, StmError::Internal(_))
    }
}

/// Result type alias for FSTM operations
pub type Result<T> = std::result::Result<T, StmError>;
