//! FIQL parsing
//!
//! This module turns FIQL strings like "username==rossini;fullname==*o*"
//! into a generic condition tree consumed by the search visitors.

mod ast;
pub mod builder;
pub mod cache;
pub mod parser;


pub use ast::*;
pub use cache::{
    cache_size, clear_cache, get_or_parse, is_cached, ExpressionCache, MAX_CACHED_EXPRESSIONS,
};
pub use parser::{parse, FiqlParser};
