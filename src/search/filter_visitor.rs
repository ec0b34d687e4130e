//! Condition visitor producing connector filters

use std::collections::BTreeSet;

use crate::error::{CoreError, Result};
use crate::fiql::{Connective, Operator, Statement};
use crate::search::filter::{Attribute, Filter};
use crate::search::special_attr::SpecialAttr;
use crate::search::visitor::{effective_operator, ConditionVisitor, Wildcard};

/// Builds a [`Filter`] and records the attribute names it references
///
/// Special attributes are not supported on the name side. Null tests are
/// encoded with an empty-prefix match: "is not null" is `STARTS_WITH(name, "")`
/// and "is null" its negation.
#[derive(Debug, Default)]
pub struct FilterVisitor {
    attributes: BTreeSet<String>,
}

impl FilterVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attribute names referenced by the filter, except those only tested for null
    pub fn attributes(&self) -> &BTreeSet<String> {
        &self.attributes
    }

    pub fn into_attributes(self) -> BTreeSet<String> {
        self.attributes
    }

    fn equality(&mut self, statement: &Statement, negated: bool, ignore_case: bool) -> Result<Filter> {
        let name = statement.property.as_str();
        let value = statement.value.as_str();

        if let Some(special) = SpecialAttr::from_literal(name) {
            return Err(CoreError::UnsupportedSpecialAttr(special.name().to_string()));
        }

        if SpecialAttr::from_literal(value) == Some(SpecialAttr::Null) {
            let not_null = Filter::StartsWith(Attribute::new(name, ""));
            if negated {
                self.attributes.insert(name.to_string());
                return Ok(not_null);
            }
            return Ok(Filter::not(not_null));
        }

        let leaf = match (Wildcard::classify(value), ignore_case) {
            (Wildcard::Exact, false) => Filter::Equals(Attribute::new(name, value)),
            (Wildcard::Exact, true) => Filter::EqualsIgnoreCase(Attribute::new(name, value)),
            (Wildcard::Leading(rest), false) => Filter::EndsWith(Attribute::new(name, rest)),
            (Wildcard::Trailing(rest), false) => Filter::StartsWith(Attribute::new(name, rest)),
            (Wildcard::Both(inner), false) => Filter::Contains(Attribute::new(name, inner)),
            _ => return Err(CoreError::UnsupportedValue(value.to_string())),
        };
        self.attributes.insert(name.to_string());

        Ok(if negated { Filter::not(leaf) } else { leaf })
    }
}

impl ConditionVisitor for FilterVisitor {
    type Output = Filter;

    fn visit_statement(&mut self, statement: &Statement) -> Result<Filter> {
        let (operator, ignore_case) = effective_operator(statement)?;
        let attribute = || Attribute::new(&statement.property, &statement.value);

        let leaf = match operator {
            Operator::Equals => return self.equality(statement, false, ignore_case),
            Operator::NotEquals => return self.equality(statement, true, ignore_case),
            Operator::Greater => Filter::GreaterThan(attribute()),
            Operator::GreaterEquals => Filter::GreaterThanOrEqual(attribute()),
            Operator::Less => Filter::LessThan(attribute()),
            Operator::LessEquals => Filter::LessThanOrEqual(attribute()),
            Operator::Custom => {
                return Err(CoreError::UnsupportedCondition(
                    Operator::Custom.name().to_string(),
                ))
            }
        };
        self.attributes.insert(statement.property.clone());

        Ok(leaf)
    }

    fn visit_compound(&mut self, connective: Connective, children: Vec<Filter>) -> Result<Filter> {
        Ok(match connective {
            Connective::And => Filter::And(children),
            Connective::Or => Filter::Or(children),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fiql::parse;
    use crate::search::visitor::walk;

    fn to_filter(fiql: &str) -> Result<Filter> {
        let ast = parse(fiql).unwrap();
        walk(&ast, &mut FilterVisitor::new())
    }

    fn attr(name: &str, value: &str) -> Attribute {
        Attribute::new(name, value)
    }

    #[test]
    fn test_equals() {
        assert_eq!(
            to_filter("username==rossini").unwrap(),
            Filter::Equals(attr("username", "rossini"))
        );
        assert_eq!(
            to_filter("username!=rossini").unwrap(),
            Filter::not(Filter::Equals(attr("username", "rossini")))
        );
    }

    #[test]
    fn test_ignore_case() {
        assert_eq!(
            to_filter("username=~Rossini").unwrap(),
            Filter::EqualsIgnoreCase(attr("username", "Rossini"))
        );
        assert_eq!(
            to_filter("username!~Rossini").unwrap(),
            Filter::not(Filter::EqualsIgnoreCase(attr("username", "Rossini")))
        );
        assert!(matches!(
            to_filter("username=~ros*").unwrap_err(),
            CoreError::UnsupportedValue(_)
        ));
    }

    #[test]
    fn test_wildcards() {
        assert_eq!(
            to_filter("name==abc*").unwrap(),
            Filter::StartsWith(attr("name", "abc"))
        );
        assert_eq!(
            to_filter("name==*abc").unwrap(),
            Filter::EndsWith(attr("name", "abc"))
        );
        assert_eq!(
            to_filter("name==*abc*").unwrap(),
            Filter::Contains(attr("name", "abc"))
        );
        let err = to_filter("name==ab*cd").unwrap_err();
        assert_eq!(err.to_string(), "Unsupported search value ab%cd");
    }

    #[test]
    fn test_null_values() {
        assert_eq!(
            to_filter("loginDate==$null").unwrap(),
            Filter::not(Filter::StartsWith(attr("loginDate", "")))
        );
        assert_eq!(
            to_filter("loginDate!=$null").unwrap(),
            Filter::StartsWith(attr("loginDate", ""))
        );
    }

    #[test]
    fn test_ordering() {
        assert_eq!(
            to_filter("age=gt=5").unwrap(),
            Filter::GreaterThan(attr("age", "5"))
        );
        assert_eq!(
            to_filter("age>=5").unwrap(),
            Filter::GreaterThanOrEqual(attr("age", "5"))
        );
        assert_eq!(to_filter("age<5").unwrap(), Filter::LessThan(attr("age", "5")));
        assert_eq!(
            to_filter("age=le=5").unwrap(),
            Filter::LessThanOrEqual(attr("age", "5"))
        );
        // special attributes are not consulted for ordering
        assert_eq!(
            to_filter("$type=gt=A").unwrap(),
            Filter::GreaterThan(attr("$type", "A"))
        );
    }

    #[test]
    fn test_special_attr_rejected() {
        let err = to_filter("$type==PRINTER").unwrap_err();
        assert_eq!(err.to_string(), "Special attr name TYPE is not supported");

        let err = to_filter("$assignable==true").unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedSpecialAttr(_)));
    }

    #[test]
    fn test_compound_and_attributes() {
        let ast = parse("(fullname==*o*,fullname==*i*);loginDate==$null;email!=$null").unwrap();
        let mut visitor = FilterVisitor::new();
        let filter = walk(&ast, &mut visitor).unwrap();

        assert_eq!(
            filter,
            Filter::And(vec![
                Filter::Or(vec![
                    Filter::Contains(attr("fullname", "o")),
                    Filter::Contains(attr("fullname", "i")),
                ]),
                Filter::not(Filter::StartsWith(attr("loginDate", ""))),
                Filter::StartsWith(attr("email", "")),
            ])
        );
        let attributes: Vec<&str> = visitor.attributes().iter().map(String::as_str).collect();
        assert_eq!(attributes, vec!["email", "fullname"]);
    }
}
