//! Entry points turning FIQL strings into filters and search conditions
//!
//! Every failure is reported as [`CoreError::InvalidSearchParameters`],
//! carrying the original expression and the root cause.

use std::collections::BTreeSet;

use tracing::debug;

use crate::config::{SearchConfig, DEFAULT_SEARCH_CONFIG};
use crate::error::{CoreError, Result};
use crate::fiql::{get_or_parse, Condition, FiqlParser};
use crate::search::cond::SearchCond;
use crate::search::cond_visitor::SearchCondVisitor;
use crate::search::filter::Filter;
use crate::search::filter_visitor::FilterVisitor;
use crate::search::visitor::walk;

/// Translate an already-decoded FIQL expression into a connector filter
pub fn convert_to_filter(fiql: &str) -> Result<Filter> {
    convert_to_filter_with_attributes(fiql).map(|(filter, _)| filter)
}

/// Translate into a connector filter, also returning the attribute names it references
pub fn convert_to_filter_with_attributes(fiql: &str) -> Result<(Filter, BTreeSet<String>)> {
    to_filter(fiql, |parser| parser.parse(fiql))
}

/// Like [`convert_to_filter_with_attributes`], reusing trees from the process-wide cache
pub fn convert_to_filter_cached(fiql: &str) -> Result<(Filter, BTreeSet<String>)> {
    to_filter(fiql, |parser| get_or_parse(parser, fiql))
}

/// Translate a raw FIQL expression into a search condition with the default configuration
///
/// `realm` is the full path consumed by `$assignable`.
pub fn convert_to_search_cond(fiql: &str, realm: Option<&str>) -> Result<SearchCond> {
    convert_to_search_cond_with(fiql, realm, &DEFAULT_SEARCH_CONFIG)
}

/// Translate a raw FIQL expression into a search condition
pub fn convert_to_search_cond_with(
    fiql: &str,
    realm: Option<&str>,
    config: &SearchConfig,
) -> Result<SearchCond> {
    to_search_cond(fiql, realm, config, |parser| parser.parse(fiql))
}

/// Like [`convert_to_search_cond_with`], reusing trees from the process-wide cache
pub fn convert_to_search_cond_cached(
    fiql: &str,
    realm: Option<&str>,
    config: &SearchConfig,
) -> Result<SearchCond> {
    to_search_cond(fiql, realm, config, |parser| get_or_parse(parser, fiql))
}

fn to_filter<F>(fiql: &str, parse: F) -> Result<(Filter, BTreeSet<String>)>
where
    F: FnOnce(&FiqlParser) -> Result<Condition>,
{
    debug!(fiql, "converting to filter");

    let translate = || -> Result<(Filter, BTreeSet<String>)> {
        let condition = parse(&FiqlParser::new())?;
        let mut visitor = FilterVisitor::new();
        let filter = walk(&condition, &mut visitor)?;
        Ok((filter, visitor.into_attributes()))
    };

    translate().map_err(|e| CoreError::invalid_search_parameters(fiql, e))
}

fn to_search_cond<F>(
    fiql: &str,
    realm: Option<&str>,
    config: &SearchConfig,
    parse: F,
) -> Result<SearchCond>
where
    F: FnOnce(&FiqlParser) -> Result<Condition>,
{
    debug!(fiql, realm, "converting to search condition");

    let translate = || -> Result<SearchCond> {
        let condition = parse(&FiqlParser::decoding())?;
        walk(&condition, &mut SearchCondVisitor::new(config).with_realm(realm))
    };

    translate().map_err(|e| CoreError::invalid_search_parameters(fiql, e))
}
