//! Batch multipart payloads
//!
//! This module reads and writes `multipart/mixed` bodies whose parts each
//! embed one HTTP request or response.

pub mod generator;
pub mod item;
pub mod media;
pub mod parser;
pub mod reader;


pub use generator::generate_batch;
pub use item::{BatchItem, BatchRequestItem, BatchResponseItem, Headers};
pub use media::{Charset, MultipartMixed};
pub use parser::{parse_batch, parse_batch_with_config};
pub use reader::{BatchPayloadLine, BatchPayloadLineReader, ReadState};
