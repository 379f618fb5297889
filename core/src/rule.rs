//! SecurityRule - Typed Security Metadata
//!
//! A rule names the permissions a caller needs and how they combine.
//! Rules are attached while a flow is defined and never change afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved key under which a rule is declared on a flow element.
pub const SECURITY_ATTRIBUTE_NAME: &str = "secured";

/// How the permissions of a rule combine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Comparison {
    /// At least one permission must be held.
    #[default]
    Any,
    /// Every permission must be held.
    All,
    /// Unrecognized mode, kept verbatim so it can be reported when evaluated.
    Unknown(String),
}

impl Comparison {
    /// Parse a match mode, case-insensitively. Unrecognized text is not an
    /// error here; it becomes `Unknown`.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("any") {
            Comparison::Any
        } else if trimmed.eq_ignore_ascii_case("all") {
            Comparison::All
        } else {
            Comparison::Unknown(trimmed.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Comparison::Any => "any",
            Comparison::All => "all",
            Comparison::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Comparison {
    fn from(raw: String) -> Self {
        Comparison::parse(&raw)
    }
}

impl From<Comparison> for String {
    fn from(comparison: Comparison) -> Self {
        comparison.as_str().to_string()
    }
}

/// Required permissions plus their match policy.
///
/// Attributes keep declaration order; duplicates are dropped on construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawSecurityRule", into = "RawSecurityRule")]
pub struct SecurityRule {
    attributes: Vec<String>,
    comparison: Comparison,
}

impl SecurityRule {
    pub fn new<I, S>(attributes: I, comparison: Comparison) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for attribute in attributes {
            let attribute = attribute.into();
            if !unique.contains(&attribute) {
                unique.push(attribute);
            }
        }
        Self {
            attributes: unique,
            comparison,
        }
    }

    pub fn any<I, S>(attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(attributes, Comparison::Any)
    }

    pub fn all<I, S>(attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(attributes, Comparison::All)
    }

    /// Build a rule from a comma-delimited list such as `"ROLE_A, ROLE_B"`.
    pub fn from_delimited(list: &str, comparison: Comparison) -> Self {
        Self::new(split_delimited(list), comparison)
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    pub fn comparison(&self) -> &Comparison {
        &self.comparison
    }

    /// Render the attributes back to a comma-delimited list.
    pub fn to_delimited(&self) -> String {
        self.attributes.join(", ")
    }
}

impl fmt::Display for SecurityRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}: {})", SECURITY_ATTRIBUTE_NAME, self.comparison, self.to_delimited())
    }
}

fn split_delimited(list: &str) -> impl Iterator<Item = String> + '_ {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Declaration form: `{ attributes = "ROLE_A, ROLE_B", match = "all" }`.
/// `attributes` may also be an array; array items are taken verbatim and
/// rules always serialize that way.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSecurityRule {
    attributes: AttributeList,
    #[serde(rename = "match", default, skip_serializing_if = "Option::is_none")]
    comparison: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum AttributeList {
    Delimited(String),
    List(Vec<String>),
}

impl From<RawSecurityRule> for SecurityRule {
    fn from(raw: RawSecurityRule) -> Self {
        let comparison = raw
            .comparison
            .as_deref()
            .map(Comparison::parse)
            .unwrap_or_default();
        match raw.attributes {
            AttributeList::Delimited(list) => SecurityRule::from_delimited(&list, comparison),
            AttributeList::List(items) => SecurityRule::new(items, comparison),
        }
    }
}

impl From<SecurityRule> for RawSecurityRule {
    fn from(rule: SecurityRule) -> Self {
        RawSecurityRule {
            attributes: AttributeList::List(rule.attributes),
            comparison: Some(rule.comparison.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparison_parse() {
        assert_eq!(Comparison::parse("any"), Comparison::Any);
        assert_eq!(Comparison::parse(" ALL "), Comparison::All);
        assert_eq!(
            Comparison::parse("most"),
            Comparison::Unknown("most".to_string())
        );
    }

    #[test]
    fn test_delimited_attributes() {
        let rule = SecurityRule::from_delimited(" ROLE_A, ROLE_B,,ROLE_A ", Comparison::All);
        assert_eq!(rule.attributes(), &["ROLE_A", "ROLE_B"]);
        assert_eq!(rule.to_delimited(), "ROLE_A, ROLE_B");
        assert_eq!(rule.to_string(), "secured(all: ROLE_A, ROLE_B)");
    }

    #[test]
    fn test_deserialize_defaults_to_any() {
        #[derive(Deserialize)]
        struct Holder {
            secured: SecurityRule,
        }

        let holder: Holder = toml::from_str(r#"secured = { attributes = "ROLE_USER" }"#).unwrap();
        assert_eq!(holder.secured.comparison(), &Comparison::Any);

        let holder: Holder =
            toml::from_str(r#"secured = { attributes = ["ROLE_A", "ROLE_B"], match = "sometimes" }"#)
                .unwrap();
        assert_eq!(holder.secured.attributes(), &["ROLE_A", "ROLE_B"]);
        assert_eq!(
            holder.secured.comparison(),
            &Comparison::Unknown("sometimes".to_string())
        );
    }

    #[test]
    fn test_serialized_rule_reads_back_unchanged() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Holder {
            secured: SecurityRule,
        }

        let original = Holder {
            secured: SecurityRule::all(["ROLE_A, ROLE_B", "ROLE_C"]),
        };

        let text = toml::to_string(&original).unwrap();
        let restored: Holder = toml::from_str(&text).unwrap();

        assert_eq!(restored, original);
        assert_eq!(restored.secured.attributes(), &["ROLE_A, ROLE_B", "ROLE_C"]);
    }
}
