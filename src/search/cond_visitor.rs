//! Condition visitor producing search conditions for the persistence layer

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::SearchConfig;
use crate::error::{CoreError, Result};
use crate::fiql::{Connective, Operator, Statement};
use crate::search::cond::{AttrCond, AttrCondType, Leaf, SearchCond};
use crate::search::special_attr::SpecialAttr;
use crate::search::visitor::{effective_operator, ConditionVisitor};

/// A timestamp whose `+hhmm` offset lost its `+` to form decoding
static TIMEZONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^.* [0-9]{4}$").unwrap());

/// Builds a [`SearchCond`] tree
///
/// Special attributes on the name side become structural leaves. Built-in
/// fields listed in [`SearchConfig::any_fields`] become any-field leaves,
/// everything else an attribute leaf.
#[derive(Debug)]
pub struct SearchCondVisitor<'a> {
    realm: Option<String>,
    config: &'a SearchConfig,
}

impl<'a> SearchCondVisitor<'a> {
    pub fn new(config: &'a SearchConfig) -> Self {
        Self { realm: None, config }
    }

    /// Realm full path used by `$assignable`
    pub fn with_realm(mut self, realm: Option<&str>) -> Self {
        self.realm = realm.map(str::to_string);
        self
    }

    fn attr_leaf(&self, cond: AttrCond) -> SearchCond {
        if self.config.is_any_field(&cond.schema) {
            SearchCond::leaf(Leaf::Any(cond))
        } else {
            SearchCond::leaf(Leaf::Attribute(cond))
        }
    }

    fn special_leaf(&self, special: SpecialAttr, value: &str) -> Result<Leaf> {
        let value = value.to_string();
        Ok(match special {
            SpecialAttr::Type => Leaf::AnyType {
                any_type_key: value,
            },
            SpecialAttr::AuxClasses => Leaf::AuxClass { aux_class: value },
            SpecialAttr::Resources => Leaf::Resource { resource: value },
            SpecialAttr::Groups => Leaf::Membership { group: value },
            SpecialAttr::Relationships => Leaf::Relationship { any_object: value },
            SpecialAttr::RelationshipTypes => Leaf::RelationshipType {
                relationship_type_key: value,
            },
            SpecialAttr::Roles => Leaf::Role { role: value },
            SpecialAttr::Privileges => Leaf::Privilege { privilege: value },
            SpecialAttr::DynRealms => Leaf::DynRealm { dyn_realm: value },
            SpecialAttr::Assignable => Leaf::Assignable {
                realm_full_path: self.realm.clone(),
            },
            SpecialAttr::Member => Leaf::Member { member: value },
            SpecialAttr::Null => {
                return Err(CoreError::UnsupportedSpecialAttr(special.name().to_string()))
            }
        })
    }

    fn equality(&self, statement: &Statement, negated: bool, ignore_case: bool) -> Result<SearchCond> {
        let name = statement.property.as_str();
        let value = restore_timezone(&statement.value);

        if let Some(special) = SpecialAttr::from_literal(name) {
            let leaf = SearchCond::leaf(self.special_leaf(special, &value)?);
            return Ok(if negated { leaf.negate() } else { leaf });
        }

        if SpecialAttr::from_literal(&value) == Some(SpecialAttr::Null) {
            let cond_type = if negated {
                AttrCondType::IsNotNull
            } else {
                AttrCondType::IsNull
            };
            // the null test carries the negation itself
            return Ok(self.attr_leaf(AttrCond {
                cond_type,
                ..AttrCond::is_null(name)
            }));
        }

        let cond_type = match (value.contains('%'), ignore_case) {
            (false, false) => AttrCondType::Eq,
            (false, true) => AttrCondType::Ieq,
            (true, false) => AttrCondType::Like,
            (true, true) => AttrCondType::Ilike,
        };
        let cond = AttrCond::new(name, cond_type, &value);

        let leaf = self.attr_leaf(cond);
        Ok(if negated { leaf.negate() } else { leaf })
    }
}

impl ConditionVisitor for SearchCondVisitor<'_> {
    type Output = SearchCond;

    fn visit_statement(&mut self, statement: &Statement) -> Result<SearchCond> {
        let (operator, ignore_case) = effective_operator(statement)?;

        let cond_type = match operator {
            Operator::Equals => return self.equality(statement, false, ignore_case),
            Operator::NotEquals => return self.equality(statement, true, ignore_case),
            Operator::Greater => AttrCondType::Gt,
            Operator::GreaterEquals => AttrCondType::Ge,
            Operator::Less => AttrCondType::Lt,
            Operator::LessEquals => AttrCondType::Le,
            Operator::Custom => {
                return Err(CoreError::UnsupportedCondition(
                    Operator::Custom.name().to_string(),
                ))
            }
        };

        let value = restore_timezone(&statement.value);
        Ok(self.attr_leaf(AttrCond::new(&statement.property, cond_type, &value)))
    }

    fn visit_compound(
        &mut self,
        connective: Connective,
        children: Vec<SearchCond>,
    ) -> Result<SearchCond> {
        Ok(match connective {
            Connective::And => SearchCond::And(children),
            Connective::Or => SearchCond::Or(children),
        })
    }
}

/// Put back the `+` of a trailing ` hhmm` timezone offset
pub fn restore_timezone(value: &str) -> String {
    if TIMEZONE.is_match(value) {
        let split = value.len() - 5;
        format!("{}+{}", &value[..split], &value[split + 1..])
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fiql::{parse, FiqlParser};
    use crate::search::visitor::walk;

    fn to_cond(fiql: &str) -> Result<SearchCond> {
        to_cond_in(fiql, None)
    }

    fn to_cond_in(fiql: &str, realm: Option<&str>) -> Result<SearchCond> {
        let config = SearchConfig::default();
        let ast = FiqlParser::decoding().parse(fiql).unwrap();
        walk(&ast, &mut SearchCondVisitor::new(&config).with_realm(realm))
    }

    fn attribute(schema: &str, cond_type: AttrCondType, expression: &str) -> SearchCond {
        SearchCond::leaf(Leaf::Attribute(AttrCond::new(schema, cond_type, expression)))
    }

    #[test]
    fn test_equals_and_like() {
        assert_eq!(
            to_cond("fullname==rossini").unwrap(),
            attribute("fullname", AttrCondType::Eq, "rossini")
        );
        assert_eq!(
            to_cond("fullname==*o*").unwrap(),
            attribute("fullname", AttrCondType::Like, "%o%")
        );
        // interior wildcards pass through as LIKE
        assert_eq!(
            to_cond("fullname==ab*cd").unwrap(),
            attribute("fullname", AttrCondType::Like, "ab%cd")
        );
        assert_eq!(
            to_cond("fullname!=rossini").unwrap(),
            attribute("fullname", AttrCondType::Eq, "rossini").negate()
        );
    }

    #[test]
    fn test_ignore_case() {
        assert_eq!(
            to_cond("fullname=~Rossini").unwrap(),
            attribute("fullname", AttrCondType::Ieq, "Rossini")
        );
        assert_eq!(
            to_cond("fullname=~ros*").unwrap(),
            attribute("fullname", AttrCondType::Ilike, "ros%")
        );
        assert_eq!(
            to_cond("fullname!~Rossini").unwrap(),
            attribute("fullname", AttrCondType::Ieq, "Rossini").negate()
        );
    }

    #[test]
    fn test_null_flips_instead_of_negating() {
        let is_null = to_cond("loginDate==$null").unwrap();
        let cond = is_null.attr_cond().unwrap();
        assert_eq!(cond.cond_type, AttrCondType::IsNull);
        assert_eq!(cond.expression, None);

        let not_null = to_cond("loginDate!=$null").unwrap();
        assert!(matches!(not_null, SearchCond::Leaf(_)));
        assert_eq!(
            not_null.attr_cond().unwrap().cond_type,
            AttrCondType::IsNotNull
        );
    }

    #[test]
    fn test_any_fields() {
        assert_eq!(
            to_cond("username==rossini").unwrap(),
            SearchCond::leaf(Leaf::Any(AttrCond::new(
                "username",
                AttrCondType::Eq,
                "rossini"
            )))
        );

        let config = SearchConfig {
            any_fields: vec!["email".to_string()],
        };
        let ast = parse("username==rossini").unwrap();
        let cond = walk(&ast, &mut SearchCondVisitor::new(&config)).unwrap();
        assert!(matches!(cond, SearchCond::Leaf(Leaf::Attribute(_))));
    }

    #[test]
    fn test_special_attrs() {
        assert_eq!(
            to_cond("$type==PRINTER").unwrap(),
            SearchCond::leaf(Leaf::AnyType {
                any_type_key: "PRINTER".to_string()
            })
        );
        assert_eq!(
            to_cond("$groups!=root").unwrap(),
            SearchCond::leaf(Leaf::Membership {
                group: "root".to_string()
            })
            .negate()
        );
        assert_eq!(
            to_cond("$auxClasses==csv").unwrap(),
            SearchCond::leaf(Leaf::AuxClass {
                aux_class: "csv".to_string()
            })
        );
        assert_eq!(
            to_cond("$relationshipTypes==neighborhood").unwrap(),
            SearchCond::leaf(Leaf::RelationshipType {
                relationship_type_key: "neighborhood".to_string()
            })
        );
        assert_eq!(
            to_cond("$member==c9b2dec2").unwrap(),
            SearchCond::leaf(Leaf::Member {
                member: "c9b2dec2".to_string()
            })
        );
    }

    #[test]
    fn test_assignable_uses_realm() {
        assert_eq!(
            to_cond_in("$assignable==true", Some("/even/two")).unwrap(),
            SearchCond::leaf(Leaf::Assignable {
                realm_full_path: Some("/even/two".to_string())
            })
        );
        assert_eq!(
            to_cond("$assignable==true").unwrap(),
            SearchCond::leaf(Leaf::Assignable {
                realm_full_path: None
            })
        );
    }

    #[test]
    fn test_null_as_name_rejected() {
        let err = to_cond("$null==a").unwrap_err();
        assert_eq!(err.to_string(), "Special attr name NULL is not supported");
    }

    #[test]
    fn test_ordering() {
        assert_eq!(
            to_cond("age=gt=5").unwrap(),
            attribute("age", AttrCondType::Gt, "5")
        );
        assert_eq!(
            to_cond("age<=5").unwrap(),
            attribute("age", AttrCondType::Le, "5")
        );
        assert_eq!(
            to_cond("lastChangeDate=ge=2016-03-02 15:21:22 +0300").unwrap(),
            SearchCond::leaf(Leaf::Any(AttrCond::new(
                "lastChangeDate",
                AttrCondType::Ge,
                "2016-03-02 15:21:22 +0300"
            )))
        );
    }

    #[test]
    fn test_compound() {
        let cond = to_cond("$type==PRINTER;(fullname==a,fullname==b)").unwrap();
        let SearchCond::And(children) = cond else {
            panic!("Expected AND")
        };
        assert_eq!(children.len(), 2);
        assert!(matches!(&children[1], SearchCond::Or(or) if or.len() == 2));
    }

    #[test]
    fn test_restore_timezone() {
        assert_eq!(
            restore_timezone("2016-03-02 15:21:22 0300"),
            "2016-03-02 15:21:22+0300"
        );
        assert_eq!(restore_timezone("rossini"), "rossini");
        assert_eq!(restore_timezone(" 1234"), "+1234");
    }
}
