//! Search Batch Core - FIQL search translation and multipart batch payloads
//!
//! This crate translates FIQL expressions into connector filters and
//! persistence search conditions, and reads and writes `multipart/mixed`
//! batch payloads of embedded HTTP requests and responses. Python bindings
//! via PyO3 are available with the `python` feature.
//!
//! ```
//! use search_batch_core::search::{convert_to_filter, Attribute, Filter};
//!
//! let filter = convert_to_filter("username==rossini").unwrap();
//! assert_eq!(filter, Filter::Equals(Attribute::new("username", "rossini")));
//! ```

pub mod batch;
pub mod config;
pub mod error;
pub mod fiql;
pub mod search;

#[cfg(feature = "python")]
mod python;

pub use error::{CoreError, Result};
