//! Generic condition tree produced by the FIQL parser

use std::fmt;

/// Custom operator for case-insensitive equality (`=~`)
pub const IEQ: &str = "=~";
/// Custom operator for case-insensitive inequality (`!~`)
pub const NIEQ: &str = "!~";

/// Condition tree node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Single comparison like "username==rossini"
    Statement(Statement),
    /// AND/OR over ordered children
    Compound {
        connective: Connective,
        children: Vec<Condition>,
    },
}

/// Logical connective of a compound node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Connective {
    /// `;`
    And,
    /// `,`
    Or,
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `==`
    Equals,
    /// `!=`
    NotEquals,
    /// `=gt=` or `>`
    Greater,
    /// `=ge=` or `>=`
    GreaterEquals,
    /// `=lt=` or `<`
    Less,
    /// `=le=` or `<=`
    LessEquals,
    /// Extension operator, see [`Statement::custom_operator`]
    Custom,
}

/// Single comparison statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub property: String,
    pub operator: Operator,
    /// Wildcard-normalized value: `*` already turned into `%`
    pub value: String,
    /// Literal operator when `operator` is [`Operator::Custom`]
    pub custom_operator: Option<String>,
}

impl Condition {
    /// Build a statement leaf
    pub fn statement(property: &str, operator: Operator, value: &str) -> Self {
        Condition::Statement(Statement {
            property: property.to_string(),
            operator,
            value: value.to_string(),
            custom_operator: None,
        })
    }

    /// Build a statement leaf for an extension operator
    pub fn custom(property: &str, custom_operator: &str, value: &str) -> Self {
        Condition::Statement(Statement {
            property: property.to_string(),
            operator: Operator::Custom,
            value: value.to_string(),
            custom_operator: Some(custom_operator.to_string()),
        })
    }

    pub fn and(children: Vec<Condition>) -> Self {
        Condition::Compound {
            connective: Connective::And,
            children,
        }
    }

    pub fn or(children: Vec<Condition>) -> Self {
        Condition::Compound {
            connective: Connective::Or,
            children,
        }
    }

    /// Number of statement leaves in the tree
    pub fn statement_count(&self) -> usize {
        match self {
            Condition::Statement(_) => 1,
            Condition::Compound { children, .. } => {
                children.iter().map(Condition::statement_count).sum()
            }
        }
    }
}

impl Operator {
    /// FIQL literal for the operator; `None` for custom operators
    pub fn as_fiql(&self) -> Option<&'static str> {
        match self {
            Operator::Equals => Some("=="),
            Operator::NotEquals => Some("!="),
            Operator::Greater => Some("=gt="),
            Operator::GreaterEquals => Some("=ge="),
            Operator::Less => Some("=lt="),
            Operator::LessEquals => Some("=le="),
            Operator::Custom => None,
        }
    }

    /// Name used in "not supported" errors
    pub fn name(&self) -> &'static str {
        match self {
            Operator::Equals => "EQUALS",
            Operator::NotEquals => "NOT_EQUALS",
            Operator::Greater => "GREATER_THAN",
            Operator::GreaterEquals => "GREATER_OR_EQUALS",
            Operator::Less => "LESS_THAN",
            Operator::LessEquals => "LESS_OR_EQUALS",
            Operator::Custom => "CUSTOM",
        }
    }
}

impl Connective {
    pub fn as_fiql(&self) -> char {
        match self {
            Connective::And => ';',
            Connective::Or => ',',
        }
    }
}

impl Statement {
    /// Comparator as written in FIQL
    pub fn comparator(&self) -> &str {
        match (self.operator, &self.custom_operator) {
            (Operator::Custom, Some(custom)) => custom.as_str(),
            (op, _) => op.as_fiql().unwrap_or("=="),
        }
    }

    /// Value as written in FIQL, `%` wildcards turned back into `*`
    pub fn fiql_value(&self) -> String {
        self.value.replace('%', "*")
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.property, self.comparator(), self.fiql_value())
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Statement(statement) => write!(f, "{}", statement),
            Condition::Compound {
                connective,
                children,
            } => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, "{}", connective.as_fiql())?;
                    }
                    match child {
                        Condition::Compound { .. } => write!(f, "({})", child)?,
                        Condition::Statement(_) => write!(f, "{}", child)?,
                    }
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_nested() {
        let cond = Condition::or(vec![
            Condition::and(vec![
                Condition::statement("a", Operator::Equals, "1"),
                Condition::statement("b", Operator::Greater, "2"),
            ]),
            Condition::custom("c", IEQ, "x%"),
        ]);
        assert_eq!(cond.to_string(), "(a==1;b=gt=2),c=~x*");
        assert_eq!(cond.statement_count(), 3);
    }
}
