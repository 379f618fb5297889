//! Voters - Single-Policy Evaluators
//!
//! A voter looks at the caller and the required attributes and casts one
//! vote. Decision managers combine the votes.

use crate::attribute::ConfigAttribute;
use crate::authentication::Authentication;
use std::fmt;
use waypost_core::FlowElement;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vote {
    Granted,
    Abstain,
    Denied,
}

impl fmt::Display for Vote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vote::Granted => f.write_str("granted"),
            Vote::Abstain => f.write_str("abstain"),
            Vote::Denied => f.write_str("denied"),
        }
    }
}

pub trait AccessDecisionVoter: Send + Sync {
    /// Whether this voter has an opinion on `attribute`.
    fn supports(&self, attribute: &ConfigAttribute) -> bool;

    /// Vote on access to `element`. Must abstain when no attribute is
    /// supported.
    fn vote(
        &self,
        authentication: Option<&Authentication>,
        element: &dyn FlowElement,
        attributes: &[ConfigAttribute],
    ) -> Vote;
}

/// Grants when the caller holds any supported attribute as an authority.
///
/// Attributes are supported when they start with the role prefix
/// (`ROLE_` unless configured otherwise).
#[derive(Debug, Clone)]
pub struct RoleVoter {
    role_prefix: String,
}

impl RoleVoter {
    pub const DEFAULT_PREFIX: &'static str = "ROLE_";

    pub fn new() -> Self {
        Self::with_prefix(Self::DEFAULT_PREFIX)
    }

    pub fn with_prefix(role_prefix: impl Into<String>) -> Self {
        Self {
            role_prefix: role_prefix.into(),
        }
    }

    pub fn role_prefix(&self) -> &str {
        &self.role_prefix
    }
}

impl Default for RoleVoter {
    fn default() -> Self {
        Self::new()
    }
}

impl AccessDecisionVoter for RoleVoter {
    fn supports(&self, attribute: &ConfigAttribute) -> bool {
        attribute.as_str().starts_with(&self.role_prefix)
    }

    fn vote(
        &self,
        authentication: Option<&Authentication>,
        _element: &dyn FlowElement,
        attributes: &[ConfigAttribute],
    ) -> Vote {
        let Some(authentication) = authentication else {
            return Vote::Denied;
        };

        let mut result = Vote::Abstain;
        for attribute in attributes.iter().filter(|a| self.supports(a)) {
            result = Vote::Denied;
            if authentication.has_authority(attribute.as_str()) {
                return Vote::Granted;
            }
        }
        result
    }
}

/// Votes on how strongly the caller is authenticated.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthenticatedVoter;

impl AuthenticatedVoter {
    pub const IS_AUTHENTICATED_FULLY: &'static str = "IS_AUTHENTICATED_FULLY";
    pub const IS_AUTHENTICATED_ANONYMOUSLY: &'static str = "IS_AUTHENTICATED_ANONYMOUSLY";
}

impl AccessDecisionVoter for AuthenticatedVoter {
    fn supports(&self, attribute: &ConfigAttribute) -> bool {
        matches!(
            attribute.as_str(),
            Self::IS_AUTHENTICATED_FULLY | Self::IS_AUTHENTICATED_ANONYMOUSLY
        )
    }

    fn vote(
        &self,
        authentication: Option<&Authentication>,
        _element: &dyn FlowElement,
        attributes: &[ConfigAttribute],
    ) -> Vote {
        let mut result = Vote::Abstain;
        for attribute in attributes.iter().filter(|a| self.supports(a)) {
            result = Vote::Denied;
            let granted = match (attribute.as_str(), authentication) {
                (Self::IS_AUTHENTICATED_FULLY, Some(auth)) => !auth.is_anonymous(),
                (Self::IS_AUTHENTICATED_ANONYMOUSLY, Some(_)) => true,
                _ => false,
            };
            if granted {
                return Vote::Granted;
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypost_core::StateDefinition;

    fn attrs(names: &[&str]) -> Vec<ConfigAttribute> {
        names.iter().map(|n| ConfigAttribute::from(*n)).collect()
    }

    #[test]
    fn test_role_voter_grants_on_any_matching_role() {
        let voter = RoleVoter::new();
        let state = StateDefinition::new("admin");
        let auth = Authentication::new("ada", ["ROLE_USER", "ROLE_ADMIN"]);

        assert_eq!(
            voter.vote(Some(&auth), &state, &attrs(&["ROLE_ROOT", "ROLE_ADMIN"])),
            Vote::Granted
        );
        assert_eq!(voter.vote(Some(&auth), &state, &attrs(&["ROLE_ROOT"])), Vote::Denied);
    }

    #[test]
    fn test_role_voter_abstains_on_unsupported_attributes() {
        let voter = RoleVoter::new();
        let state = StateDefinition::new("admin");
        let auth = Authentication::new("ada", ["PERM_EXPORT"]);

        assert_eq!(voter.vote(Some(&auth), &state, &attrs(&["PERM_EXPORT"])), Vote::Abstain);
        assert_eq!(voter.vote(Some(&auth), &state, &[]), Vote::Abstain);
    }

    #[test]
    fn test_role_voter_denies_missing_authentication() {
        let voter = RoleVoter::new();
        let state = StateDefinition::new("admin");

        assert_eq!(voter.vote(None, &state, &attrs(&["ROLE_USER"])), Vote::Denied);
    }

    #[test]
    fn test_role_voter_custom_prefix() {
        let voter = RoleVoter::with_prefix("PERM_");
        let state = StateDefinition::new("export");
        let auth = Authentication::new("ada", ["PERM_EXPORT"]);

        assert!(!voter.supports(&ConfigAttribute::from("ROLE_USER")));
        assert_eq!(voter.vote(Some(&auth), &state, &attrs(&["PERM_EXPORT"])), Vote::Granted);
    }

    #[test]
    fn test_authenticated_voter() {
        let voter = AuthenticatedVoter;
        let state = StateDefinition::new("profile");
        let fully = attrs(&[AuthenticatedVoter::IS_AUTHENTICATED_FULLY]);
        let anonymously = attrs(&[AuthenticatedVoter::IS_AUTHENTICATED_ANONYMOUSLY]);
        let user = Authentication::new("ada", ["ROLE_USER"]);
        let visitor = Authentication::anonymous();

        assert_eq!(voter.vote(Some(&user), &state, &fully), Vote::Granted);
        assert_eq!(voter.vote(Some(&visitor), &state, &fully), Vote::Denied);
        assert_eq!(voter.vote(Some(&visitor), &state, &anonymously), Vote::Granted);
        assert_eq!(voter.vote(None, &state, &anonymously), Vote::Denied);
        assert_eq!(voter.vote(Some(&user), &state, &attrs(&["ROLE_USER"])), Vote::Abstain);
    }
}
