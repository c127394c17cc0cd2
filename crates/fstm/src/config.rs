//! Configuration Module - Barrier Tuning Parameters
//!
//! Manages the parameters fixed once per barrier instance. Policies that
//! shape the hot path (write sink, read-after-write lookup, stack filter)
//! are type parameters of [`Barrier`](crate::barrier::Barrier); this struct
//! only carries what may differ between instances of the same type.

use crate::util::constants::{DEFAULT_WRITE_SET_CAPACITY, MAX_WRITE_SET_CAPACITY};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the transaction engine versions memory
///
/// Eager engines update memory in place at `tmwrite` time and undo on
/// abort. Lazy engines buffer writes in a redo log until commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Versioning {
    /// In-place writes through `tm_write`
    Eager,
    /// Buffered writes in the transaction's write set
    Lazy,
}

impl fmt::Display for Versioning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Versioning::Eager => f.write_str("eager"),
            Versioning::Lazy => f.write_str("lazy"),
        }
    }
}

impl FromStr for Versioning {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "eager" | "undo" => Ok(Versioning::Eager),
            "lazy" | "redo" => Ok(Versioning::Lazy),
            _ => Err(ConfigError::InvalidValue {
                key: "versioning".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Main configuration for the barrier layer
///
/// # Examples
///
/// ```rust
/// use fstm::{StmConfig, Versioning};
///
/// // Use default configuration
/// let config = StmConfig::default();
/// assert_eq!(config.versioning, Versioning::Eager);
///
/// // Lazy engine with a larger redo log
/// let config = StmConfig {
///     write_set_capacity: 1024,
///     ..StmConfig::lazy()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StmConfig {
    /// Versioning of the engine the barrier feeds
    ///
    /// Must match the barrier's write sink.
    /// Default: Eager
    pub versioning: Versioning,

    /// Treat every multi-word type as statically aligned
    ///
    /// Library entry points that only ever see aligned data set this to skip
    /// the runtime alignment check. Unaligned addresses are then a caller bug.
    ///
    /// Default: false
    pub force_aligned: bool,

    /// Enable barrier statistics collection
    ///
    /// Default: true
    pub stats_enabled: bool,

    /// Log the configuration at info level when a barrier is built
    ///
    /// Default: false
    pub verbose: bool,

    /// Initial capacity of a lazy transaction's write set (entries)
    ///
    /// Default: 64
    pub write_set_capacity: usize,
}

impl Default for StmConfig {
    fn default() -> Self {
        StmConfig {
            versioning: Versioning::Eager,
            force_aligned: false,
            stats_enabled: true,
            verbose: false,
            write_set_capacity: DEFAULT_WRITE_SET_CAPACITY,
        }
    }
}

impl StmConfig {
    /// Default configuration for an eager (undo log) engine
    pub fn eager() -> Self {
        Self::default()
    }

    /// Default configuration for a lazy (redo log) engine
    pub fn lazy() -> Self {
        StmConfig {
            versioning: Versioning::Lazy,
            ..Self::default()
        }
    }

    /// Validate configuration
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fstm::StmConfig;
    ///
    /// let config = StmConfig {
    ///     write_set_capacity: 0,  // Invalid!
    ///     ..Default::default()
    /// };
    ///
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.write_set_capacity == 0 {
            return Err(ConfigError::InvalidWriteSetCapacity(
                "write_set_capacity must be > 0".to_string(),
            ));
        }

        if self.write_set_capacity > MAX_WRITE_SET_CAPACITY {
            return Err(ConfigError::InvalidWriteSetCapacity(format!(
                "write_set_capacity must be <= {}",
                MAX_WRITE_SET_CAPACITY
            )));
        }

        Ok(())
    }

    /// Check that this configuration fits a barrier whose sink implements
    /// `required` versioning
    pub fn check_versioning(&self, required: Versioning) -> Result<(), ConfigError> {
        if self.versioning != required {
            return Err(ConfigError::VersioningMismatch {
                configured: self.versioning,
                required,
            });
        }
        Ok(())
    }

    /// Build configuration from environment variables
    ///
    /// Overrides defaults with environment variables:
    /// - FSTM_VERSIONING (`eager` | `lazy`)
    /// - FSTM_FORCE_ALIGNED
    /// - FSTM_STATS
    /// - FSTM_VERBOSE
    /// - FSTM_WRITE_SET_CAPACITY
    ///
    /// Unparsable values are ignored with a warning.
    ///
    /// ```bash
    /// export FSTM_VERSIONING=lazy
    /// export FSTM_WRITE_SET_CAPACITY=4096
    /// ```
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Build configuration from `(key, value)` pairs using the
    /// `FSTM_*` names of [`StmConfig::from_env`]
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();

        for (key, value) in vars {
            let (key, value) = (key.as_ref(), value.as_ref());
            if let Err(e) = config.apply_var(key, value) {
                log::warn!("ignoring {}={:?}: {}", key, value, e);
            }
        }

        config
    }

    fn apply_var(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "FSTM_VERSIONING" => self.versioning = value.parse()?,
            "FSTM_FORCE_ALIGNED" => self.force_aligned = parse_flag(key, value)?,
            "FSTM_STATS" => self.stats_enabled = parse_flag(key, value)?,
            "FSTM_VERBOSE" => self.verbose = parse_flag(key, value)?,
            "FSTM_WRITE_SET_CAPACITY" => {
                self.write_set_capacity =
                    value.parse::<usize>().map_err(|_| ConfigError::InvalidValue {
                        key: key.to_string(),
                        value: value.to_string(),
                    })?;
            }
            _ => {}
        }
        Ok(())
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Error types for configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid write set capacity: {0}")]
    InvalidWriteSetCapacity(String),

    #[error("Versioning mismatch: configured {configured}, barrier requires {required}")]
    VersioningMismatch {
        configured: Versioning,
        required: Versioning,
    },

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}
