//! Search condition tree consumed by the persistence query layer

use serde::Serialize;

/// Attribute condition type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AttrCondType {
    #[serde(rename = "EQ")]
    Eq,
    /// Case-insensitive equals
    #[serde(rename = "IEQ")]
    Ieq,
    #[serde(rename = "LIKE")]
    Like,
    /// Case-insensitive like
    #[serde(rename = "ILIKE")]
    Ilike,
    #[serde(rename = "ISNULL")]
    IsNull,
    #[serde(rename = "ISNOTNULL")]
    IsNotNull,
    #[serde(rename = "GE")]
    Ge,
    #[serde(rename = "GT")]
    Gt,
    #[serde(rename = "LE")]
    Le,
    #[serde(rename = "LT")]
    Lt,
}

/// Match on a schema (plain attribute) or on a built-in field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttrCond {
    pub schema: String,
    #[serde(rename = "type")]
    pub cond_type: AttrCondType,
    /// `None` for null tests
    pub expression: Option<String>,
}

impl AttrCond {
    pub fn new(schema: &str, cond_type: AttrCondType, expression: &str) -> Self {
        Self {
            schema: schema.to_string(),
            cond_type,
            expression: Some(expression.to_string()),
        }
    }

    pub fn is_null(schema: &str) -> Self {
        Self {
            schema: schema.to_string(),
            cond_type: AttrCondType::IsNull,
            expression: None,
        }
    }
}

/// Leaf condition kinds
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Leaf {
    /// Attribute defined by a schema
    Attribute(AttrCond),
    /// Built-in field of the entity itself (username, key, ...)
    Any(AttrCond),
    AnyType { any_type_key: String },
    AuxClass { aux_class: String },
    Resource { resource: String },
    Membership { group: String },
    Relationship { any_object: String },
    RelationshipType { relationship_type_key: String },
    Role { role: String },
    Privilege { privilege: String },
    DynRealm { dyn_realm: String },
    Assignable { realm_full_path: Option<String> },
    Member { member: String },
}

/// Search condition tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SearchCond {
    Leaf(Leaf),
    Not(Box<SearchCond>),
    And(Vec<SearchCond>),
    Or(Vec<SearchCond>),
}

impl SearchCond {
    pub fn leaf(leaf: Leaf) -> Self {
        SearchCond::Leaf(leaf)
    }

    pub fn negate(self) -> Self {
        SearchCond::Not(Box::new(self))
    }

    /// Attribute condition of an attribute or any-field leaf
    pub fn attr_cond(&self) -> Option<&AttrCond> {
        match self {
            SearchCond::Leaf(Leaf::Attribute(cond)) | SearchCond::Leaf(Leaf::Any(cond)) => Some(cond),
            _ => None,
        }
    }

    pub fn attr_cond_mut(&mut self) -> Option<&mut AttrCond> {
        match self {
            SearchCond::Leaf(Leaf::Attribute(cond)) | SearchCond::Leaf(Leaf::Any(cond)) => Some(cond),
            _ => None,
        }
    }

    /// All leaves, depth-first in tree order
    pub fn leaves(&self) -> Vec<&Leaf> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut leaves);
        leaves
    }

    fn collect_leaves<'a>(&'a self, leaves: &mut Vec<&'a Leaf>) {
        match self {
            SearchCond::Leaf(leaf) => leaves.push(leaf),
            SearchCond::Not(inner) => inner.collect_leaves(leaves),
            SearchCond::And(children) | SearchCond::Or(children) => {
                for child in children {
                    child.collect_leaves(leaves);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaves_in_order() {
        let cond = SearchCond::And(vec![
            SearchCond::leaf(Leaf::Role {
                role: "Other".to_string(),
            }),
            SearchCond::leaf(Leaf::Attribute(AttrCond::is_null("loginDate"))).negate(),
        ]);
        let leaves = cond.leaves();
        assert_eq!(leaves.len(), 2);
        assert!(matches!(leaves[0], Leaf::Role { .. }));
        assert!(matches!(leaves[1], Leaf::Attribute(_)));
    }

    #[test]
    fn test_serialize_null_test() {
        let cond = SearchCond::leaf(Leaf::Attribute(AttrCond::is_null("loginDate")));
        let json = serde_json::to_value(&cond).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "Leaf": {"Attribute": {"schema": "loginDate", "type": "ISNULL", "expression": null}}
            })
        );
    }
}
