//! Shared depth-first walk over condition trees

use crate::error::{CoreError, Result};
use crate::fiql::{Condition, Connective, Operator, Statement, IEQ, NIEQ};

/// Builds one target node per condition node
pub trait ConditionVisitor {
    type Output;

    /// Build the leaf for a statement
    fn visit_statement(&mut self, statement: &Statement) -> Result<Self::Output>;

    /// Wrap already-built children, in original order
    fn visit_compound(
        &mut self,
        connective: Connective,
        children: Vec<Self::Output>,
    ) -> Result<Self::Output>;
}

/// Walk `condition` depth-first, visiting every node exactly once
pub fn walk<V: ConditionVisitor + ?Sized>(condition: &Condition, visitor: &mut V) -> Result<V::Output> {
    match condition {
        Condition::Statement(statement) => visitor.visit_statement(statement),
        Condition::Compound {
            connective,
            children,
        } => {
            let outputs = children
                .iter()
                .map(|child| walk(child, visitor))
                .collect::<Result<Vec<_>>>()?;
            visitor.visit_compound(*connective, outputs)
        }
    }
}

/// Resolve extension operators: `=~` acts as EQUALS and `!~` as NOT_EQUALS,
/// both case-insensitive. Returns (operator, ignore case).
pub fn effective_operator(statement: &Statement) -> Result<(Operator, bool)> {
    match (statement.operator, statement.custom_operator.as_deref()) {
        (Operator::Custom, Some(IEQ)) => Ok((Operator::Equals, true)),
        (Operator::Custom, Some(NIEQ)) => Ok((Operator::NotEquals, true)),
        (Operator::Custom, other) => Err(CoreError::UnsupportedCondition(
            other.unwrap_or(Operator::Custom.name()).to_string(),
        )),
        (operator, _) => Ok((operator, false)),
    }
}

/// Where the `%` wildcards sit in a value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Wildcard<'a> {
    /// No wildcard at all
    Exact,
    /// `%abc`: the stripped value
    Leading(&'a str),
    /// `abc%`
    Trailing(&'a str),
    /// `%abc%`
    Both(&'a str),
    /// Anything else, e.g. `ab%cd`
    Interior,
}

impl<'a> Wildcard<'a> {
    pub fn classify(value: &'a str) -> Self {
        if !value.contains('%') {
            return Wildcard::Exact;
        }

        let leading = value.strip_prefix('%');
        let trailing = value.strip_suffix('%');
        match (leading, trailing) {
            (Some(rest), _) if !rest.contains('%') => Wildcard::Leading(rest),
            (_, Some(rest)) if !rest.contains('%') => Wildcard::Trailing(rest),
            (Some(rest), Some(_)) => match rest.strip_suffix('%') {
                Some(inner) if !inner.contains('%') => Wildcard::Both(inner),
                _ => Wildcard::Interior,
            },
            _ => Wildcard::Interior,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fiql::parse;

    /// Renders statements as "p op v" and compounds as "AND[..]"
    struct Printer {
        visited: usize,
    }

    impl ConditionVisitor for Printer {
        type Output = String;

        fn visit_statement(&mut self, statement: &Statement) -> Result<String> {
            self.visited += 1;
            Ok(statement.to_string())
        }

        fn visit_compound(&mut self, connective: Connective, children: Vec<String>) -> Result<String> {
            self.visited += 1;
            Ok(format!("{:?}[{}]", connective, children.join(" ")))
        }
    }

    #[test]
    fn test_walk_preserves_shape_and_order() {
        let ast = parse("a==1;b==2,c==3").unwrap();
        let mut printer = Printer { visited: 0 };
        let out = walk(&ast, &mut printer).unwrap();
        assert_eq!(out, "Or[And[a==1 b==2] c==3]");
        assert_eq!(printer.visited, 5);
    }

    #[test]
    fn test_effective_operator() {
        let ast = parse("a=~b").unwrap();
        let Condition::Statement(s) = ast else {
            panic!("Expected statement")
        };
        assert_eq!(effective_operator(&s).unwrap(), (Operator::Equals, true));

        let s = Statement {
            property: "a".to_string(),
            operator: Operator::Custom,
            value: "b".to_string(),
            custom_operator: Some("=re=".to_string()),
        };
        let err = effective_operator(&s).unwrap_err();
        assert_eq!(err.to_string(), "Condition type =re= is not supported");
    }

    #[test]
    fn test_classify_wildcards() {
        assert_eq!(Wildcard::classify("abc"), Wildcard::Exact);
        assert_eq!(Wildcard::classify("%abc"), Wildcard::Leading("abc"));
        assert_eq!(Wildcard::classify("abc%"), Wildcard::Trailing("abc"));
        assert_eq!(Wildcard::classify("%abc%"), Wildcard::Both("abc"));
        assert_eq!(Wildcard::classify("ab%cd"), Wildcard::Interior);
        assert_eq!(Wildcard::classify("%a%b"), Wildcard::Interior);
        assert_eq!(Wildcard::classify("%"), Wildcard::Leading(""));
    }
}
