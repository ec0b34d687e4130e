//! Configuration for search translation and batch parsing
//!
//! Both sections deserialize from JSON (or, with the `python` feature, from a
//! Python dict) and fall back to built-in defaults for missing keys.

use crate::batch::Charset;
use crate::error::{CoreError, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Built-in fields matched with an any-field condition instead of a schema attribute
pub const DEFAULT_ANY_FIELDS: [&str; 20] = [
    "key",
    "username",
    "name",
    "realm",
    "status",
    "token",
    "creationDate",
    "creator",
    "lastChangeDate",
    "lastModifier",
    "changePwdDate",
    "failedLogins",
    "lastLoginDate",
    "suspended",
    "mustChangePassword",
    "securityQuestion",
    "cipherAlgorithm",
    "type",
    "userOwner",
    "groupOwner",
];

/// Default read chunk size for batch payloads
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Default charset for batch headers and bodies
pub const DEFAULT_CHARSET: &str = "UTF-8";

/// Shared default search configuration
pub static DEFAULT_SEARCH_CONFIG: Lazy<SearchConfig> = Lazy::new(SearchConfig::default);

/// Search translation settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SearchConfig {
    #[serde(default = "default_any_fields")]
    pub any_fields: Vec<String>,
}

fn default_any_fields() -> Vec<String> {
    DEFAULT_ANY_FIELDS.iter().map(|f| f.to_string()).collect()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            any_fields: default_any_fields(),
        }
    }
}

impl SearchConfig {
    /// Whether `name` is a built-in field (exact match)
    pub fn is_any_field(&self, name: &str) -> bool {
        self.any_fields.iter().any(|f| f == name)
    }
}

/// Batch payload settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BatchConfig {
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    #[serde(default = "default_charset")]
    pub default_charset: String,
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

fn default_charset() -> String {
    DEFAULT_CHARSET.to_string()
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            default_charset: default_charset(),
        }
    }
}

impl BatchConfig {
    /// Charset used for header lines and bodies without a declared charset
    pub fn charset(&self) -> Result<Charset> {
        Charset::for_label(&self.default_charset)
    }

    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(CoreError::InvalidConfig(
                "buffer_size must be greater than zero".to_string(),
            ));
        }
        self.charset().map(|_| ())
    }
}

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CoreConfig {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub batch: BatchConfig,
}

impl CoreConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self> {
        let config: CoreConfig =
            serde_json::from_str(json).map_err(|e| CoreError::InvalidConfig(e.to_string()))?;
        config.batch.validate()?;
        Ok(config)
    }
}

#[cfg(feature = "python")]
mod python {
    use super::{BatchConfig, CoreConfig, SearchConfig};
    use pyo3::types::{PyAnyMethods, PyDict, PyDictMethods};
    use pyo3::Bound;

    /// Helper to get optional attribute from either dict or object
    fn get_attr_opt<'py>(
        obj: &Bound<'py, pyo3::PyAny>,
        name: &str,
    ) -> Option<Bound<'py, pyo3::PyAny>> {
        if let Ok(dict) = obj.downcast::<PyDict>() {
            dict.get_item(name).ok().flatten()
        } else {
            obj.getattr(name).ok()
        }
    }

    /// Deserialize configuration from a Python dict
    /// Expected format: {"search": {"any_fields": [...]}, "batch": {"buffer_size": int, "default_charset": str}}
    pub fn deserialize_config(config: &Bound<'_, PyDict>) -> pyo3::PyResult<CoreConfig> {
        let mut result = CoreConfig::default();

        if let Some(search) = get_attr_opt(config.as_any(), "search").filter(|s| !s.is_none()) {
            if let Some(fields) = get_attr_opt(&search, "any_fields").filter(|f| !f.is_none()) {
                result.search = SearchConfig {
                    any_fields: fields.extract()?,
                };
            }
        }

        if let Some(batch) = get_attr_opt(config.as_any(), "batch").filter(|b| !b.is_none()) {
            let defaults = BatchConfig::default();
            result.batch = BatchConfig {
                buffer_size: get_attr_opt(&batch, "buffer_size")
                    .and_then(|v| v.extract().ok())
                    .unwrap_or(defaults.buffer_size),
                default_charset: get_attr_opt(&batch, "default_charset")
                    .and_then(|v| v.extract().ok())
                    .unwrap_or(defaults.default_charset),
            };
        }

        result.batch.validate()?;
        Ok(result)
    }
}

#[cfg(feature = "python")]
pub use python::deserialize_config;
