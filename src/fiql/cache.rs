//! Parsed expression cache - avoids re-parsing repeated FIQL queries
//!
//! Opt-in: the plain converters parse on every call. A cache holds a bounded
//! number of trees; inserting past the bound evicts an arbitrary entry.

use crate::error::Result;
use crate::fiql::ast::Condition;
use crate::fiql::parser::FiqlParser;
use ahash::AHashMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;

/// Bound of the process-wide cache
pub const MAX_CACHED_EXPRESSIONS: usize = 1024;

/// Global expression cache
static EXPRESSION_CACHE: Lazy<ExpressionCache> =
    Lazy::new(|| ExpressionCache::with_capacity(MAX_CACHED_EXPRESSIONS));

/// Parsed trees keyed by (expression, value decoding)
#[derive(Debug)]
pub struct ExpressionCache {
    entries: RwLock<AHashMap<(String, bool), Condition>>,
    capacity: usize,
}

impl ExpressionCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(AHashMap::with_capacity(capacity)),
            capacity: capacity.max(1),
        }
    }

    /// Get or parse an expression; failed parses are not cached
    pub fn get_or_parse(&self, parser: &FiqlParser, expression: &str) -> Result<Condition> {
        let key = (expression.to_string(), parser.decodes_values());

        // Fast path: check read lock first
        {
            let entries = self.entries.read();
            if let Some(ast) = entries.get(&key) {
                return Ok(ast.clone());
            }
        }

        let ast = parser.parse(expression)?;

        {
            let mut entries = self.entries.write();
            if entries.len() >= self.capacity && !entries.contains_key(&key) {
                if let Some(evicted) = entries.keys().next().cloned() {
                    entries.remove(&evicted);
                }
            }
            entries.insert(key, ast.clone());
        }

        Ok(ast)
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether `expression` is cached for the given parser
    pub fn contains(&self, parser: &FiqlParser, expression: &str) -> bool {
        self.entries
            .read()
            .contains_key(&(expression.to_string(), parser.decodes_values()))
    }
}

/// Get or parse through the process-wide cache
#[inline]
pub fn get_or_parse(parser: &FiqlParser, expression: &str) -> Result<Condition> {
    EXPRESSION_CACHE.get_or_parse(parser, expression)
}

/// Clear the process-wide cache
pub fn clear_cache() {
    EXPRESSION_CACHE.clear();
}

/// Number of expressions in the process-wide cache
pub fn cache_size() -> usize {
    EXPRESSION_CACHE.len()
}

/// Whether `expression` is in the process-wide cache for the given parser
pub fn is_cached(parser: &FiqlParser, expression: &str) -> bool {
    EXPRESSION_CACHE.contains(parser, expression)
}
