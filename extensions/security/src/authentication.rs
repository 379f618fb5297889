use serde::{Deserialize, Serialize};
use std::fmt;

/// A permission held by a caller, e.g. `ROLE_ADMIN`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GrantedAuthority(String);

impl GrantedAuthority {
    pub fn new(authority: impl Into<String>) -> Self {
        Self(authority.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GrantedAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GrantedAuthority {
    fn from(authority: &str) -> Self {
        Self::new(authority)
    }
}

impl From<String> for GrantedAuthority {
    fn from(authority: String) -> Self {
        Self(authority)
    }
}

/// The identity of the current caller and what it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authentication {
    principal: String,
    authorities: Vec<GrantedAuthority>,
    #[serde(default)]
    anonymous: bool,
}

impl Authentication {
    pub const ANONYMOUS_PRINCIPAL: &'static str = "anonymousUser";
    pub const ANONYMOUS_AUTHORITY: &'static str = "ROLE_ANONYMOUS";

    pub fn new<I, A>(principal: impl Into<String>, authorities: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<GrantedAuthority>,
    {
        Self {
            principal: principal.into(),
            authorities: authorities.into_iter().map(Into::into).collect(),
            anonymous: false,
        }
    }

    /// An unauthenticated visitor holding only `ROLE_ANONYMOUS`.
    pub fn anonymous() -> Self {
        Self {
            principal: Self::ANONYMOUS_PRINCIPAL.to_string(),
            authorities: vec![GrantedAuthority::new(Self::ANONYMOUS_AUTHORITY)],
            anonymous: true,
        }
    }

    pub fn principal(&self) -> &str {
        &self.principal
    }

    pub fn authorities(&self) -> &[GrantedAuthority] {
        &self.authorities
    }

    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.iter().any(|a| a.as_str() == authority)
    }

    pub fn is_anonymous(&self) -> bool {
        self.anonymous
    }
}
