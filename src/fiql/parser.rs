//! FIQL expression parser

use url::form_urlencoded;

use crate::error::{CoreError, Result};
use crate::fiql::ast::{Condition, Connective, Operator, Statement, IEQ, NIEQ};

/// Comparators, tried in order at each position; longer literals come first
const COMPARATORS: [(&str, Operator); 12] = [
    ("==", Operator::Equals),
    ("!=", Operator::NotEquals),
    (IEQ, Operator::Custom),
    (NIEQ, Operator::Custom),
    ("=gt=", Operator::Greater),
    ("=ge=", Operator::GreaterEquals),
    ("=lt=", Operator::Less),
    ("=le=", Operator::LessEquals),
    (">=", Operator::GreaterEquals),
    ("<=", Operator::LessEquals),
    (">", Operator::Greater),
    ("<", Operator::Less),
];

/// FIQL parser
///
/// `;` (AND) binds tighter than `,` (OR); parentheses group. Values are
/// wildcard-normalized (`\_` becomes `_`, `*` becomes `%`) and, when
/// `decode_values` is set, form-decoded first.
#[derive(Debug, Clone, Copy, Default)]
pub struct FiqlParser {
    decode_values: bool,
}

impl FiqlParser {
    /// Parser for expressions whose values are already decoded
    pub fn new() -> Self {
        Self::default()
    }

    /// Parser that percent-decodes each value before normalizing wildcards
    pub fn decoding() -> Self {
        Self {
            decode_values: true,
        }
    }

    pub fn decodes_values(&self) -> bool {
        self.decode_values
    }

    /// Parse a FIQL expression into a condition tree
    pub fn parse(&self, expression: &str) -> Result<Condition> {
        if expression.trim().is_empty() {
            return Err(CoreError::InvalidExpression(
                "Empty expression".to_string(),
            ));
        }

        self.parse_ands_ors_brackets(expression)
    }

    fn parse_ands_ors_brackets(&self, expr: &str) -> Result<Condition> {
        let segments = split_top_level(expr)?;

        let mut ors = Vec::new();
        let mut ands = Vec::new();
        for (segment, connective) in segments {
            ands.push(self.parse_operand(segment)?);
            if connective != Some(Connective::And) {
                ors.push(collapse(Connective::And, std::mem::take(&mut ands)));
            }
        }

        Ok(collapse(Connective::Or, ors))
    }

    fn parse_operand(&self, segment: &str) -> Result<Condition> {
        if let Some(inner) = segment.strip_prefix('(') {
            let inner = inner.strip_suffix(')').ok_or_else(|| {
                CoreError::InvalidExpression(format!(
                    "Unexpected content after closing bracket: {}",
                    segment
                ))
            })?;
            if inner.is_empty() {
                return Err(CoreError::InvalidExpression(
                    "Empty brackets".to_string(),
                ));
            }
            return self.parse_ands_ors_brackets(inner);
        }

        self.parse_comparison(segment)
    }

    fn parse_comparison(&self, expr: &str) -> Result<Condition> {
        let (pos, literal, operator) = find_comparator(expr).ok_or_else(|| {
            CoreError::InvalidExpression(format!("Not a comparison expression: {}", expr))
        })?;

        let property = &expr[..pos];
        let raw_value = &expr[pos + literal.len()..];
        if property.is_empty() {
            return Err(CoreError::InvalidExpression(format!(
                "Missing property name: {}",
                expr
            )));
        }
        if raw_value.is_empty() {
            return Err(CoreError::InvalidExpression(format!(
                "Not a comparison expression: {}",
                expr
            )));
        }

        let value = if self.decode_values {
            normalize_wildcards(&decode_value(raw_value)?)
        } else {
            normalize_wildcards(raw_value)
        };

        Ok(Condition::Statement(Statement {
            property: property.to_string(),
            operator,
            value,
            custom_operator: (operator == Operator::Custom).then(|| literal.to_string()),
        }))
    }
}

/// Parse with a non-decoding parser
pub fn parse(expression: &str) -> Result<Condition> {
    FiqlParser::new().parse(expression)
}

/// Split on top-level `;` and `,`, pairing each segment with the connective that follows it
fn split_top_level(expr: &str) -> Result<Vec<(&str, Option<Connective>)>> {
    let mut segments = Vec::new();
    let mut level: i32 = 0;
    let mut last = 0;

    for (idx, c) in expr.char_indices() {
        match c {
            '(' => level += 1,
            ')' => {
                level -= 1;
                if level < 0 {
                    return Err(CoreError::InvalidExpression(format!(
                        "Unexpected closing bracket at position {}",
                        idx
                    )));
                }
            }
            ';' | ',' if level == 0 => {
                let connective = if c == ';' {
                    Connective::And
                } else {
                    Connective::Or
                };
                segments.push((&expr[last..idx], Some(connective)));
                last = idx + 1;
            }
            _ => {}
        }
    }

    if level != 0 {
        return Err(CoreError::InvalidExpression(format!(
            "Unmatched opening and closing brackets in expression: {}",
            expr
        )));
    }

    let tail = &expr[last..];
    if tail.is_empty() {
        if let Some((segment, Some(connective))) = segments.last() {
            return Err(CoreError::InvalidExpression(format!(
                "Dangling operator at the end of expression: ...{}{}",
                segment,
                connective.as_fiql()
            )));
        }
    }
    segments.push((tail, None));

    Ok(segments)
}

/// Leftmost comparator in `expr`: (byte position, literal, operator)
fn find_comparator(expr: &str) -> Option<(usize, &'static str, Operator)> {
    expr.char_indices().find_map(|(pos, _)| {
        let rest = &expr[pos..];
        COMPARATORS
            .iter()
            .find(|(literal, _)| rest.starts_with(literal))
            .map(|(literal, operator)| (pos, *literal, *operator))
    })
}

fn collapse(connective: Connective, mut children: Vec<Condition>) -> Condition {
    if children.len() == 1 {
        children.remove(0)
    } else {
        Condition::Compound {
            connective,
            children,
        }
    }
}

/// Reverse SQL-style `_` escaping and turn FIQL `*` wildcards into `%`
pub fn normalize_wildcards(value: &str) -> String {
    value.replace("\\_", "_").replace('*', "%")
}

/// Form-decode a value: `+` is a space, `%XX` a byte; bytes are read as UTF-8
///
/// Every `%` must start a two-digit hex escape.
pub fn decode_value(value: &str) -> Result<String> {
    let bytes = value.as_bytes();
    for (position, _) in value.match_indices('%') {
        let valid = bytes
            .get(position + 1..position + 3)
            .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
        if !valid {
            return Err(CoreError::InvalidEncoding(format!(
                "Illegal hex characters in escape (%) pattern at position {} of {}",
                position, value
            )));
        }
    }

    // pair separators escaped, so the whole value comes back as a single key
    let escaped = value.replace('&', "%26").replace('=', "%3D");
    Ok(form_urlencoded::parse(escaped.as_bytes())
        .next()
        .map(|(key, _)| key.into_owned())
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statement(cond: &Condition) -> &Statement {
        match cond {
            Condition::Statement(s) => s,
            _ => panic!("Expected statement, got {:?}", cond),
        }
    }

    #[test]
    fn test_parse_simple_statement() {
        let ast = parse("username==rossini").unwrap();
        let s = statement(&ast);
        assert_eq!(s.property, "username");
        assert_eq!(s.operator, Operator::Equals);
        assert_eq!(s.value, "rossini");
        assert_eq!(s.custom_operator, None);
    }

    #[test]
    fn test_parse_all_operators() {
        let operators = [
            ("a==1", Operator::Equals),
            ("a!=1", Operator::NotEquals),
            ("a=gt=1", Operator::Greater),
            ("a>1", Operator::Greater),
            ("a=ge=1", Operator::GreaterEquals),
            ("a>=1", Operator::GreaterEquals),
            ("a=lt=1", Operator::Less),
            ("a<1", Operator::Less),
            ("a=le=1", Operator::LessEquals),
            ("a<=1", Operator::LessEquals),
            ("a=~1", Operator::Custom),
            ("a!~1", Operator::Custom),
        ];

        for (expr, expected) in operators {
            let ast = parse(expr).unwrap();
            let s = statement(&ast);
            assert_eq!(s.operator, expected, "Failed for: {}", expr);
            assert_eq!(s.property, "a", "Failed for: {}", expr);
            assert_eq!(s.value, "1", "Failed for: {}", expr);
        }
    }

    #[test]
    fn test_parse_custom_operator_literal() {
        let ast = parse("fullname=~Rossini").unwrap();
        assert_eq!(statement(&ast).custom_operator.as_deref(), Some(IEQ));

        let ast = parse("fullname!~Rossini").unwrap();
        assert_eq!(statement(&ast).custom_operator.as_deref(), Some(NIEQ));
    }

    #[test]
    fn test_parse_and_binds_tighter_than_or() {
        let ast = parse("a==1;b==2,c==3").unwrap();
        assert_eq!(
            ast,
            Condition::or(vec![
                Condition::and(vec![
                    Condition::statement("a", Operator::Equals, "1"),
                    Condition::statement("b", Operator::Equals, "2"),
                ]),
                Condition::statement("c", Operator::Equals, "3"),
            ])
        );
    }

    #[test]
    fn test_parse_chains_are_flat() {
        let ast = parse("a==1;b==2;c==3").unwrap();
        match ast {
            Condition::Compound {
                connective: Connective::And,
                children,
            } => assert_eq!(children.len(), 3),
            _ => panic!("Expected AND condition"),
        }
    }

    #[test]
    fn test_parse_parentheses_override_precedence() {
        let ast = parse("a==1;(b==2,c==3)").unwrap();
        assert_eq!(
            ast,
            Condition::and(vec![
                Condition::statement("a", Operator::Equals, "1"),
                Condition::or(vec![
                    Condition::statement("b", Operator::Equals, "2"),
                    Condition::statement("c", Operator::Equals, "3"),
                ]),
            ])
        );
    }

    #[test]
    fn test_parse_single_group_collapses() {
        let ast = parse("((a==1))").unwrap();
        assert_eq!(ast, Condition::statement("a", Operator::Equals, "1"));
    }

    #[test]
    fn test_parse_wildcards_normalized() {
        let ast = parse("fullname==*o*").unwrap();
        assert_eq!(statement(&ast).value, "%o%");

        let ast = parse("userId==a\\_b").unwrap();
        assert_eq!(statement(&ast).value, "a_b");
    }

    #[test]
    fn test_parse_leftmost_comparator_wins() {
        let ast = parse("key==a=b").unwrap();
        let s = statement(&ast);
        assert_eq!(s.property, "key");
        assert_eq!(s.value, "a=b");
    }

    #[test]
    fn test_parse_decoding() {
        let parser = FiqlParser::decoding();
        let ast = parser.parse("fullname==Gioacchino%20Rossini").unwrap();
        assert_eq!(statement(&ast).value, "Gioacchino Rossini");

        let ast = parser.parse("fullname==a+b").unwrap();
        assert_eq!(statement(&ast).value, "a b");

        // no decoding by default
        let ast = parse("fullname==a+b").unwrap();
        assert_eq!(statement(&ast).value, "a+b");
    }

    #[test]
    fn test_parse_bad_encoding() {
        let err = FiqlParser::decoding().parse("name==a%zz").unwrap_err();
        assert!(matches!(err, CoreError::InvalidEncoding(_)));

        let err = FiqlParser::decoding().parse("name==a%2").unwrap_err();
        assert!(matches!(err, CoreError::InvalidEncoding(_)));
    }

    #[test]
    fn test_parse_errors() {
        let invalid = [
            "",
            "   ",
            "(a==1",
            "a==1)",
            "a==1;",
            "a==1,",
            "a==1;;b==2",
            "username",
            "==value",
            "name==",
            "()",
            "(a==1)b==2",
        ];

        for expr in invalid {
            let err = parse(expr).unwrap_err();
            assert!(
                matches!(err, CoreError::InvalidExpression(_)),
                "Expected grammar error for: {:?}, got {:?}",
                expr,
                err
            );
        }
    }

    #[test]
    fn test_parse_dangling_operator_message() {
        let err = parse("a==1;b==2,").unwrap_err();
        assert!(err.to_string().contains("Dangling operator"));
    }

    #[test]
    fn test_decode_value_utf8() {
        assert_eq!(decode_value("caf%C3%A9").unwrap(), "café");
        assert_eq!(decode_value("100%25").unwrap(), "100%");
    }

    #[test]
    fn test_decode_value_form_rules() {
        assert_eq!(decode_value("a+b%20c").unwrap(), "a b c");
        assert_eq!(decode_value("a%2Bb").unwrap(), "a+b");
        assert_eq!(decode_value("k=v&x").unwrap(), "k=v&x");
        assert_eq!(decode_value("").unwrap(), "");

        for malformed in ["%", "50%", "%zz", "%4", "ab%g1"] {
            assert!(
                matches!(decode_value(malformed), Err(CoreError::InvalidEncoding(_))),
                "{}",
                malformed
            );
        }
    }
}
