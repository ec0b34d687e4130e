//! Fluent builder for FIQL search expressions
//!
//! ```
//! use search_batch_core::fiql::builder::{in_groups, is};
//!
//! let fiql = is("fullname").equal_to("*o*").and(in_groups(&["root"])).query();
//! assert_eq!(fiql, "fullname==*o*;$groups==root");
//! ```
//!
//! Separators inside values (`;`, `,`, `(`, `)`) are percent-encoded in the
//! rendered query, so it re-parses with a decoding parser (the search
//! condition path). The filter path takes values verbatim.

use crate::fiql::ast::{Condition, Connective, Operator, IEQ, NIEQ};
use crate::fiql::parser::normalize_wildcards;
use crate::search::SpecialAttr;

/// Property awaiting a comparison
#[derive(Debug, Clone)]
pub struct Property {
    name: String,
}

/// Built condition, renderable as FIQL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fiql {
    condition: Condition,
}

/// Start a comparison on `property`
pub fn is(property: &str) -> Property {
    Property {
        name: property.to_string(),
    }
}

impl Property {
    fn compare(self, operator: Operator, value: &str) -> Fiql {
        Fiql {
            condition: Condition::statement(&self.name, operator, &normalize_wildcards(value)),
        }
    }

    fn compare_custom(self, custom: &str, value: &str) -> Fiql {
        Fiql {
            condition: Condition::custom(&self.name, custom, &normalize_wildcards(value)),
        }
    }

    /// `==`; `*` in `value` is a wildcard
    pub fn equal_to(self, value: &str) -> Fiql {
        self.compare(Operator::Equals, value)
    }

    pub fn not_equal_to(self, value: &str) -> Fiql {
        self.compare(Operator::NotEquals, value)
    }

    /// `=~`
    pub fn equal_to_ignore_case(self, value: &str) -> Fiql {
        self.compare_custom(IEQ, value)
    }

    /// `!~`
    pub fn not_equal_to_ignore_case(self, value: &str) -> Fiql {
        self.compare_custom(NIEQ, value)
    }

    pub fn null_value(self) -> Fiql {
        self.compare(Operator::Equals, SpecialAttr::Null.literal())
    }

    pub fn not_null_value(self) -> Fiql {
        self.compare(Operator::NotEquals, SpecialAttr::Null.literal())
    }

    pub fn greater_than(self, value: &str) -> Fiql {
        self.compare(Operator::Greater, value)
    }

    pub fn greater_or_equal_to(self, value: &str) -> Fiql {
        self.compare(Operator::GreaterEquals, value)
    }

    pub fn less_than(self, value: &str) -> Fiql {
        self.compare(Operator::Less, value)
    }

    pub fn less_or_equal_to(self, value: &str) -> Fiql {
        self.compare(Operator::LessEquals, value)
    }
}

impl Fiql {
    fn combine(self, connective: Connective, other: Fiql) -> Fiql {
        let mut children = match self.condition {
            Condition::Compound {
                connective: c,
                children,
            } if c == connective => children,
            condition => vec![condition],
        };
        children.push(other.condition);
        Fiql {
            condition: Condition::Compound {
                connective,
                children,
            },
        }
    }

    pub fn and(self, other: Fiql) -> Fiql {
        self.combine(Connective::And, other)
    }

    pub fn or(self, other: Fiql) -> Fiql {
        self.combine(Connective::Or, other)
    }

    /// Render as a FIQL string
    pub fn query(&self) -> String {
        let mut out = String::new();
        render(&self.condition, &mut out);
        out
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    pub fn into_condition(self) -> Condition {
        self.condition
    }
}

fn render(condition: &Condition, out: &mut String) {
    match condition {
        Condition::Statement(statement) => {
            out.push_str(&statement.property);
            out.push_str(statement.comparator());
            out.push_str(&escape_value(&statement.fiql_value()));
        }
        Condition::Compound {
            connective,
            children,
        } => {
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    out.push(connective.as_fiql());
                }
                if let Condition::Compound { .. } = child {
                    out.push('(');
                    render(child, out);
                    out.push(')');
                } else {
                    render(child, out);
                }
            }
        }
    }
}

fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            ';' => escaped.push_str("%3B"),
            ',' => escaped.push_str("%2C"),
            '(' => escaped.push_str("%28"),
            ')' => escaped.push_str("%29"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// `attr==v1,attr==v2,...`
fn any_of(attr: SpecialAttr, values: &[&str]) -> Fiql {
    let mut iter = values.iter();
    let first = iter
        .next()
        .map(|v| is(attr.literal()).equal_to(v))
        .unwrap_or_else(|| is(attr.literal()).null_value());
    iter.fold(first, |acc, v| acc.or(is(attr.literal()).equal_to(v)))
}

/// `attr!=v1;attr!=v2;...`
fn none_of(attr: SpecialAttr, values: &[&str]) -> Fiql {
    let mut iter = values.iter();
    let first = iter
        .next()
        .map(|v| is(attr.literal()).not_equal_to(v))
        .unwrap_or_else(|| is(attr.literal()).not_null_value());
    iter.fold(first, |acc, v| acc.and(is(attr.literal()).not_equal_to(v)))
}

pub fn of_type(any_type: &str) -> Fiql {
    is(SpecialAttr::Type.literal()).equal_to(any_type)
}

pub fn in_groups(groups: &[&str]) -> Fiql {
    any_of(SpecialAttr::Groups, groups)
}

pub fn not_in_groups(groups: &[&str]) -> Fiql {
    none_of(SpecialAttr::Groups, groups)
}

pub fn has_resources(resources: &[&str]) -> Fiql {
    any_of(SpecialAttr::Resources, resources)
}

pub fn has_not_resources(resources: &[&str]) -> Fiql {
    none_of(SpecialAttr::Resources, resources)
}

pub fn in_roles(roles: &[&str]) -> Fiql {
    any_of(SpecialAttr::Roles, roles)
}

pub fn not_in_roles(roles: &[&str]) -> Fiql {
    none_of(SpecialAttr::Roles, roles)
}

pub fn has_aux_classes(aux_classes: &[&str]) -> Fiql {
    any_of(SpecialAttr::AuxClasses, aux_classes)
}

pub fn in_relationships(any_objects: &[&str]) -> Fiql {
    any_of(SpecialAttr::Relationships, any_objects)
}

pub fn in_relationship_types(types: &[&str]) -> Fiql {
    any_of(SpecialAttr::RelationshipTypes, types)
}

pub fn with_privileges(privileges: &[&str]) -> Fiql {
    any_of(SpecialAttr::Privileges, privileges)
}

pub fn in_dyn_realms(dyn_realms: &[&str]) -> Fiql {
    any_of(SpecialAttr::DynRealms, dyn_realms)
}

pub fn with_members(members: &[&str]) -> Fiql {
    any_of(SpecialAttr::Member, members)
}

/// Assignable to the realm supplied at conversion time
pub fn is_assignable() -> Fiql {
    is(SpecialAttr::Assignable.literal()).equal_to("true")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fiql::parser::{parse, FiqlParser};

    #[test]
    fn test_null_values() {
        assert_eq!(is("loginDate").null_value().query(), "loginDate==$null");
        assert_eq!(is("loginDate").not_null_value().query(), "loginDate!=$null");
    }

    #[test]
    fn test_chained_and_stays_flat() {
        let fiql = is("a")
            .equal_to("1")
            .and(is("b").equal_to("2"))
            .and(is("c").equal_to("3"));
        assert_eq!(fiql.query(), "a==1;b==2;c==3");
        assert_eq!(parse(&fiql.query()).unwrap(), fiql.into_condition());
    }

    #[test]
    fn test_or_inside_and_is_grouped() {
        let fiql = is("username")
            .equal_to("ros*")
            .and(in_groups(&["root", "otherchild"]));
        assert_eq!(fiql.query(), "username==ros*;($groups==root,$groups==otherchild)");
        assert_eq!(parse(&fiql.query()).unwrap(), fiql.into_condition());
    }

    #[test]
    fn test_separators_in_values_are_escaped() {
        let fiql = is("fullname").equal_to("Rossini, Gioacchino (x;y)");
        assert_eq!(fiql.query(), "fullname==Rossini%2C Gioacchino %28x%3By%29");

        let reparsed = FiqlParser::decoding().parse(&fiql.query()).unwrap();
        assert_eq!(reparsed, fiql.into_condition());
    }

    #[test]
    fn test_special_attribute_helpers() {
        assert_eq!(of_type("PRINTER").query(), "$type==PRINTER");
        assert_eq!(not_in_roles(&["a", "b"]).query(), "$roles!=a;$roles!=b");
        assert_eq!(is_assignable().query(), "$assignable==true");
        assert_eq!(with_members(&["rossini"]).query(), "$member==rossini");
        assert_eq!(
            is("fullname").equal_to_ignore_case("*oSsINi").query(),
            "fullname=~*oSsINi"
        );
    }
}
