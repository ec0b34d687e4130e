//! Connector filter tree

use serde::Serialize;

/// Attribute name/value pair carried by filter leaves
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

/// Filter evaluated by an external system's attribute matching engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Filter {
    Equals(Attribute),
    EqualsIgnoreCase(Attribute),
    StartsWith(Attribute),
    EndsWith(Attribute),
    /// Substring match; the value carries no wildcard markers
    Contains(Attribute),
    GreaterThan(Attribute),
    GreaterThanOrEqual(Attribute),
    LessThan(Attribute),
    LessThanOrEqual(Attribute),
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    pub fn not(filter: Filter) -> Self {
        Filter::Not(Box::new(filter))
    }

    /// Attribute of a leaf filter
    pub fn attribute(&self) -> Option<&Attribute> {
        match self {
            Filter::Equals(a)
            | Filter::EqualsIgnoreCase(a)
            | Filter::StartsWith(a)
            | Filter::EndsWith(a)
            | Filter::Contains(a)
            | Filter::GreaterThan(a)
            | Filter::GreaterThanOrEqual(a)
            | Filter::LessThan(a)
            | Filter::LessThanOrEqual(a) => Some(a),
            Filter::And(_) | Filter::Or(_) | Filter::Not(_) => None,
        }
    }

    /// Number of leaf filters in the tree
    pub fn leaf_count(&self) -> usize {
        match self {
            Filter::And(children) | Filter::Or(children) => {
                children.iter().map(Filter::leaf_count).sum()
            }
            Filter::Not(inner) => inner.leaf_count(),
            _ => 1,
        }
    }
}
