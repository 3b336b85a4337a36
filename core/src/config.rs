//! Compiler and executor settings.
//!
//! # Example YAML
//!
//! ```yaml
//! max_name_len: 48
//! eof: true
//! ```

use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default upper bound on Value and state name length.
pub const DEFAULT_MAX_NAME_LEN: usize = 48;

/// Settings shared by the compiler and the executor.
///
/// Missing keys fall back to their defaults when deserialised.
///
/// # Examples
///
/// ```
/// # use textfsm_core::FsmConfig;
/// let config = FsmConfig::default();
/// assert_eq!(config.max_name_len, 48);
/// assert!(config.eof);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsmConfig {
    /// Maximum length of Value and state names.
    pub max_name_len: usize,
    /// Run end-of-input processing (the `EOF` state or the implicit final
    /// record) after the last input line.
    pub eof: bool,
}

impl Default for FsmConfig {
    fn default() -> Self {
        Self {
            max_name_len: DEFAULT_MAX_NAME_LEN,
            eof: true,
        }
    }
}

impl FsmConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::Error::IoError) if the file cannot be
    /// read, or [`YamlError`](crate::Error::YamlError) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }
}
