//! Reserved property names and values

use std::fmt;

/// Reserved token routed to a structural condition instead of a plain attribute match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialAttr {
    /// Value-side marker for null tests
    Null,
    Type,
    AuxClasses,
    Resources,
    Groups,
    Relationships,
    RelationshipTypes,
    Roles,
    Privileges,
    DynRealms,
    Assignable,
    Member,
}

impl SpecialAttr {
    pub const ALL: [SpecialAttr; 12] = [
        SpecialAttr::Null,
        SpecialAttr::Type,
        SpecialAttr::AuxClasses,
        SpecialAttr::Resources,
        SpecialAttr::Groups,
        SpecialAttr::Relationships,
        SpecialAttr::RelationshipTypes,
        SpecialAttr::Roles,
        SpecialAttr::Privileges,
        SpecialAttr::DynRealms,
        SpecialAttr::Assignable,
        SpecialAttr::Member,
    ];

    /// Literal token as it appears in FIQL
    pub fn literal(&self) -> &'static str {
        match self {
            SpecialAttr::Null => "$null",
            SpecialAttr::Type => "$type",
            SpecialAttr::AuxClasses => "$auxClasses",
            SpecialAttr::Resources => "$resources",
            SpecialAttr::Groups => "$groups",
            SpecialAttr::Relationships => "$relationships",
            SpecialAttr::RelationshipTypes => "$relationshipTypes",
            SpecialAttr::Roles => "$roles",
            SpecialAttr::Privileges => "$privileges",
            SpecialAttr::DynRealms => "$dynRealms",
            SpecialAttr::Assignable => "$assignable",
            SpecialAttr::Member => "$member",
        }
    }

    /// Case-sensitive match against a literal
    ///
    /// `@type` and a closing `$` (`$null$`) are accepted as alternate spellings.
    pub fn from_literal(token: &str) -> Option<SpecialAttr> {
        let body = token.strip_prefix('$').or_else(|| token.strip_prefix('@'))?;
        let body = body.strip_suffix('$').unwrap_or(body);
        Self::ALL.into_iter().find(|attr| &attr.literal()[1..] == body)
    }

    pub fn name(&self) -> &'static str {
        match self {
            SpecialAttr::Null => "NULL",
            SpecialAttr::Type => "TYPE",
            SpecialAttr::AuxClasses => "AUX_CLASSES",
            SpecialAttr::Resources => "RESOURCES",
            SpecialAttr::Groups => "GROUPS",
            SpecialAttr::Relationships => "RELATIONSHIPS",
            SpecialAttr::RelationshipTypes => "RELATIONSHIP_TYPES",
            SpecialAttr::Roles => "ROLES",
            SpecialAttr::Privileges => "PRIVILEGES",
            SpecialAttr::DynRealms => "DYNREALMS",
            SpecialAttr::Assignable => "ASSIGNABLE",
            SpecialAttr::Member => "MEMBER",
        }
    }
}

impl fmt::Display for SpecialAttr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.literal())
    }
}
