//! Decision Managers - Combining Votes
//!
//! Every manager polls an ordered, non-empty list of voters and turns the
//! votes into `Ok(())` or `SecurityError::AccessDenied`:
//!
//! * `AffirmativeBased`: one grant is enough (rule mode `any`)
//! * `UnanimousBased`: every attribute must pass every voter (rule mode `all`)
//! * `ConsensusBased`: majority of non-abstaining votes
//!
//! When nobody has an opinion the `allow_if_all_abstain` flag decides.

use crate::attribute::ConfigAttribute;
use crate::authentication::Authentication;
use crate::error::{SecurityError, SecurityResult};
use crate::voter::{AccessDecisionVoter, Vote};
use std::fmt;
use std::sync::Arc;
use waypost_core::FlowElement;

pub trait AccessDecisionManager: Send + Sync {
    /// Returns `Err(SecurityError::AccessDenied)` when the caller may not
    /// access `element`.
    fn decide(
        &self,
        authentication: Option<&Authentication>,
        element: &dyn FlowElement,
        attributes: &[ConfigAttribute],
    ) -> SecurityResult<()>;
}

/// Voter list plus the shared abstain policy.
#[derive(Clone)]
struct Panel {
    voters: Vec<Arc<dyn AccessDecisionVoter>>,
    allow_if_all_abstain: bool,
}

impl Panel {
    fn new(voters: Vec<Arc<dyn AccessDecisionVoter>>) -> SecurityResult<Self> {
        if voters.is_empty() {
            return Err(SecurityError::NoVoters);
        }
        Ok(Self {
            voters,
            allow_if_all_abstain: false,
        })
    }

    fn single(voter: Arc<dyn AccessDecisionVoter>) -> Self {
        Self {
            voters: vec![voter],
            allow_if_all_abstain: false,
        }
    }

    fn poll<'a>(
        &'a self,
        authentication: Option<&'a Authentication>,
        element: &'a dyn FlowElement,
        attributes: &'a [ConfigAttribute],
    ) -> impl Iterator<Item = Vote> + 'a {
        self.voters.iter().enumerate().map(move |(index, voter)| {
            let vote = voter.vote(authentication, element, attributes);
            tracing::trace!(voter = index, %vote, element = %element.describe(), "Voter cast vote");
            vote
        })
    }

    fn check_allow_if_all_abstain(&self, element: &dyn FlowElement) -> SecurityResult<()> {
        if self.allow_if_all_abstain {
            Ok(())
        } else {
            Err(denied(element, "all voters abstained"))
        }
    }
}

fn denied(element: &dyn FlowElement, reason: impl Into<String>) -> SecurityError {
    SecurityError::AccessDenied {
        element: element.describe(),
        reason: reason.into(),
    }
}

impl fmt::Debug for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Panel")
            .field("voter_count", &self.voters.len())
            .field("allow_if_all_abstain", &self.allow_if_all_abstain)
            .finish()
    }
}

macro_rules! panel_constructors {
    ($manager:ident) => {
        impl $manager {
            /// Fails with `SecurityError::NoVoters` when `voters` is empty.
            pub fn new(voters: Vec<Arc<dyn AccessDecisionVoter>>) -> SecurityResult<Self> {
                Ok(Self {
                    panel: Panel::new(voters)?,
                })
            }

            pub fn single(voter: Arc<dyn AccessDecisionVoter>) -> Self {
                Self {
                    panel: Panel::single(voter),
                }
            }

            pub fn allow_if_all_abstain(mut self, allow: bool) -> Self {
                self.panel.allow_if_all_abstain = allow;
                self
            }

            pub fn is_allow_if_all_abstain(&self) -> bool {
                self.panel.allow_if_all_abstain
            }

            pub fn voter_count(&self) -> usize {
                self.panel.voters.len()
            }
        }
    };
}

// ============================================================================
// Affirmative
// ============================================================================

/// Grants as soon as one voter grants.
#[derive(Debug, Clone)]
pub struct AffirmativeBased {
    panel: Panel,
}

panel_constructors!(AffirmativeBased);

impl AccessDecisionManager for AffirmativeBased {
    fn decide(
        &self,
        authentication: Option<&Authentication>,
        element: &dyn FlowElement,
        attributes: &[ConfigAttribute],
    ) -> SecurityResult<()> {
        let mut denials = 0usize;
        for vote in self.panel.poll(authentication, element, attributes) {
            match vote {
                Vote::Granted => return Ok(()),
                Vote::Denied => denials += 1,
                Vote::Abstain => {}
            }
        }

        if denials > 0 {
            return Err(denied(element, format!("{denials} voter(s) denied access")));
        }
        self.panel.check_allow_if_all_abstain(element)
    }
}

// ============================================================================
// Unanimous
// ============================================================================

/// Polls each attribute separately; any denial denies.
#[derive(Debug, Clone)]
pub struct UnanimousBased {
    panel: Panel,
}

panel_constructors!(UnanimousBased);

impl AccessDecisionManager for UnanimousBased {
    fn decide(
        &self,
        authentication: Option<&Authentication>,
        element: &dyn FlowElement,
        attributes: &[ConfigAttribute],
    ) -> SecurityResult<()> {
        let mut grants = 0usize;
        for attribute in attributes {
            let single = std::slice::from_ref(attribute);
            for vote in self.panel.poll(authentication, element, single) {
                match vote {
                    Vote::Granted => grants += 1,
                    Vote::Denied => {
                        return Err(denied(element, format!("requirement '{attribute}' not met")));
                    }
                    Vote::Abstain => {}
                }
            }
        }

        if grants > 0 {
            return Ok(());
        }
        self.panel.check_allow_if_all_abstain(element)
    }
}

// ============================================================================
// Consensus
// ============================================================================

/// Majority of non-abstaining votes wins.
#[derive(Debug, Clone)]
pub struct ConsensusBased {
    panel: Panel,
    allow_if_equal_granted_denied: bool,
}

impl ConsensusBased {
    pub fn new(voters: Vec<Arc<dyn AccessDecisionVoter>>) -> SecurityResult<Self> {
        Ok(Self {
            panel: Panel::new(voters)?,
            allow_if_equal_granted_denied: true,
        })
    }

    pub fn allow_if_all_abstain(mut self, allow: bool) -> Self {
        self.panel.allow_if_all_abstain = allow;
        self
    }

    /// Tie-break policy; ties grant by default.
    pub fn allow_if_equal_granted_denied(mut self, allow: bool) -> Self {
        self.allow_if_equal_granted_denied = allow;
        self
    }
}

impl AccessDecisionManager for ConsensusBased {
    fn decide(
        &self,
        authentication: Option<&Authentication>,
        element: &dyn FlowElement,
        attributes: &[ConfigAttribute],
    ) -> SecurityResult<()> {
        let (mut grants, mut denials) = (0usize, 0usize);
        for vote in self.panel.poll(authentication, element, attributes) {
            match vote {
                Vote::Granted => grants += 1,
                Vote::Denied => denials += 1,
                Vote::Abstain => {}
            }
        }

        if grants > denials {
            return Ok(());
        }
        if denials > grants {
            return Err(denied(
                element,
                format!("{denials} denial(s) outweigh {grants} grant(s)"),
            ));
        }
        if grants > 0 {
            return if self.allow_if_equal_granted_denied {
                Ok(())
            } else {
                Err(denied(element, "grants and denials are tied"))
            };
        }
        self.panel.check_allow_if_all_abstain(element)
    }
}
