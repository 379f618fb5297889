use serde::{Deserialize, Serialize};
use std::fmt;
use waypost_core::SecurityRule;

/// A single requirement as understood by voters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigAttribute(String);

impl ConfigAttribute {
    pub fn new(attribute: impl Into<String>) -> Self {
        Self(attribute.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConfigAttribute {
    fn from(attribute: &str) -> Self {
        Self::new(attribute)
    }
}

/// One attribute per rule permission, in rule order.
pub fn config_attributes(rule: &SecurityRule) -> Vec<ConfigAttribute> {
    rule.attributes()
        .iter()
        .map(|attribute| ConfigAttribute::new(attribute.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_attribute_per_permission_in_order() {
        let rule = SecurityRule::all(["ROLE_C", "ROLE_A", "ROLE_B"]);

        let attributes = config_attributes(&rule);

        assert_eq!(attributes.len(), rule.attributes().len());
        assert_eq!(
            attributes,
            vec![
                ConfigAttribute::from("ROLE_C"),
                ConfigAttribute::from("ROLE_A"),
                ConfigAttribute::from("ROLE_B"),
            ]
        );
    }

    #[test]
    fn test_empty_rule_has_no_attributes() {
        let rule = SecurityRule::from_delimited("", waypost_core::Comparison::Any);
        assert!(config_attributes(&rule).is_empty());
    }
}
