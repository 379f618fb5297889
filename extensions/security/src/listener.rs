//! # SecurityFlowExecutionListener: Flow Security Bridge
//!
//! Turns the `SecurityRule` of a flow, state or transition into an access
//! decision at the matching lifecycle point:
//!
//! | Hook                   | Element                | Denial effect           |
//! |------------------------|------------------------|-------------------------|
//! | `session_creating`     | `FlowDefinition`       | session is not created  |
//! | `state_entering`       | `StateDefinition`      | state entry is vetoed   |
//! | `transition_executing` | `TransitionDefinition` | transition is aborted   |
//!
//! Elements without a rule are unrestricted.
//!
//! The caller is the `Authentication` put into the request scope, if any,
//! otherwise the one bound to the current thread by `SecurityContextHolder`.

use crate::attribute::config_attributes;
use crate::authentication::Authentication;
use crate::config::SecurityConfig;
use crate::context::SecurityContextHolder;
use crate::error::{SecurityError, SecurityResult};
use crate::manager::{AccessDecisionManager, AffirmativeBased, UnanimousBased};
use crate::voter::{AccessDecisionVoter, RoleVoter};
use std::fmt;
use std::sync::Arc;
use waypost_core::{
    Comparison, FlowDefinition, FlowElement, FlowExecutionListener, RequestContext, SecurityRule,
    StateDefinition, TransitionDefinition,
};

pub struct SecurityFlowExecutionListener {
    /// When set, every decision goes here regardless of the rule's mode.
    access_decision_manager: Option<Arc<dyn AccessDecisionManager>>,
    /// Role-based fallbacks, one per comparison mode, built once.
    any: AffirmativeBased,
    all: UnanimousBased,
}

impl SecurityFlowExecutionListener {
    pub fn new() -> Self {
        Self::from_config(&SecurityConfig::default())
    }

    pub fn from_config(config: &SecurityConfig) -> Self {
        Self::from_config_with_voter(
            config,
            Arc::new(RoleVoter::with_prefix(config.role_prefix.as_str())),
        )
    }

    /// Like `from_config`, but the fallback managers poll `voter` instead of
    /// a `RoleVoter`. `role_prefix` is ignored.
    pub fn from_config_with_voter(config: &SecurityConfig, voter: Arc<dyn AccessDecisionVoter>) -> Self {
        Self {
            access_decision_manager: None,
            any: AffirmativeBased::single(voter.clone())
                .allow_if_all_abstain(config.allow_if_all_abstain),
            all: UnanimousBased::single(voter).allow_if_all_abstain(config.allow_if_all_abstain),
        }
    }

    /// Delegate every decision to `manager`.
    pub fn with_access_decision_manager(mut self, manager: Arc<dyn AccessDecisionManager>) -> Self {
        self.access_decision_manager = Some(manager);
        self
    }

    pub fn access_decision_manager(&self) -> Option<&Arc<dyn AccessDecisionManager>> {
        self.access_decision_manager.as_ref()
    }

    /// Decide `rule` for `element` on behalf of the caller bound to this thread.
    pub fn decide(&self, rule: &SecurityRule, element: &dyn FlowElement) -> SecurityResult<()> {
        let authentication = SecurityContextHolder::authentication();
        self.decide_for(authentication.as_deref(), rule, element)
    }

    pub fn decide_for(
        &self,
        authentication: Option<&Authentication>,
        rule: &SecurityRule,
        element: &dyn FlowElement,
    ) -> SecurityResult<()> {
        let attributes = config_attributes(rule);
        tracing::debug!(
            element = %element.describe(),
            %rule,
            principal = authentication.map(|a| a.principal()).unwrap_or("<none>"),
            "Evaluating security rule"
        );

        let result = match (&self.access_decision_manager, rule.comparison()) {
            (Some(manager), _) => manager.decide(authentication, element, &attributes),
            (None, Comparison::Any) => self.any.decide(authentication, element, &attributes),
            (None, Comparison::All) => self.all.decide(authentication, element, &attributes),
            (None, Comparison::Unknown(raw)) => {
                tracing::warn!(element = %element.describe(), comparison = %raw, "Unknown security rule match type");
                Err(SecurityError::UnknownComparison(raw.clone()))
            }
        };

        if let Err(SecurityError::AccessDenied { element, reason }) = &result {
            tracing::warn!(%element, %reason, "Access denied");
        }
        result
    }

    fn check(&self, context: &RequestContext, element: &dyn FlowElement) -> SecurityResult<()> {
        let Some(rule) = element.security_rule() else {
            return Ok(());
        };
        match context.scope().get::<Authentication>() {
            Some(authentication) => self.decide_for(Some(authentication), rule, element),
            None => self.decide(rule, element),
        }
    }
}

impl Default for SecurityFlowExecutionListener {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SecurityFlowExecutionListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityFlowExecutionListener")
            .field("custom_manager", &self.access_decision_manager.is_some())
            .field("any", &self.any)
            .field("all", &self.all)
            .finish()
    }
}

impl FlowExecutionListener for SecurityFlowExecutionListener {
    fn session_creating(&self, context: &RequestContext, flow: &FlowDefinition) -> anyhow::Result<()> {
        Ok(self.check(context, flow)?)
    }

    fn state_entering(&self, context: &RequestContext, state: &StateDefinition) -> anyhow::Result<()> {
        Ok(self.check(context, state)?)
    }

    fn transition_executing(
        &self,
        context: &RequestContext,
        transition: &TransitionDefinition,
    ) -> anyhow::Result<()> {
        Ok(self.check(context, transition)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::ConfigAttribute;
    use crate::voter::Vote;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Records every delegated call and answers with a fixed outcome.
    #[derive(Default)]
    struct Recording {
        calls: Mutex<Vec<(Option<String>, String, Vec<String>)>>,
        deny: bool,
    }

    impl AccessDecisionManager for Recording {
        fn decide(
            &self,
            authentication: Option<&Authentication>,
            element: &dyn FlowElement,
            attributes: &[ConfigAttribute],
        ) -> SecurityResult<()> {
            self.calls.lock().unwrap().push((
                authentication.map(|a| a.principal().to_string()),
                element.describe(),
                attributes.iter().map(|a| a.as_str().to_string()).collect(),
            ));
            if self.deny {
                return Err(SecurityError::AccessDenied {
                    element: element.describe(),
                    reason: "recording manager refuses".into(),
                });
            }
            Ok(())
        }
    }

    /// Grants everything and counts how often it was asked.
    #[derive(Default)]
    struct Counting {
        votes: AtomicUsize,
    }

    impl AccessDecisionVoter for Counting {
        fn supports(&self, _attribute: &ConfigAttribute) -> bool {
            true
        }

        fn vote(
            &self,
            _authentication: Option<&Authentication>,
            _element: &dyn FlowElement,
            _attributes: &[ConfigAttribute],
        ) -> Vote {
            self.votes.fetch_add(1, Ordering::SeqCst);
            Vote::Granted
        }
    }

    fn ctx() -> RequestContext {
        RequestContext::new("test")
    }

    #[test]
    fn test_unsecured_elements_skip_decisions() {
        let manager = Arc::new(Recording {
            deny: true,
            ..Default::default()
        });
        let listener = SecurityFlowExecutionListener::new().with_access_decision_manager(manager.clone());
        let state = StateDefinition::new("open");
        let transition = TransitionDefinition::new("go", "open");

        SecurityContextHolder::clear();
        listener.state_entering(&ctx(), &state).unwrap();
        listener.transition_executing(&ctx(), &transition).unwrap();

        assert!(manager.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_any_rule_with_default_manager() {
        let listener = SecurityFlowExecutionListener::new();
        let state = StateDefinition::new("reports").secured(SecurityRule::any(["ROLE_ADMIN", "ROLE_AUDITOR"]));

        let _guard = SecurityContextHolder::set_authentication(Authentication::new("ada", ["ROLE_AUDITOR"]));
        assert!(listener.state_entering(&ctx(), &state).is_ok());

        let _guard = SecurityContextHolder::set_authentication(Authentication::new("eve", ["ROLE_USER"]));
        let err = listener.state_entering(&ctx(), &state).unwrap_err();
        assert!(err.downcast_ref::<SecurityError>().unwrap().is_access_denied());
    }

    #[test]
    fn test_all_rule_with_default_manager() {
        let listener = SecurityFlowExecutionListener::new();
        let transition = TransitionDefinition::new("refund", "refunded")
            .secured(SecurityRule::all(["ROLE_CLERK", "ROLE_SUPERVISOR"]));

        let _guard = SecurityContextHolder::set_authentication(Authentication::new("ada", ["ROLE_CLERK"]));
        assert!(listener.decide(transition.security_rule().unwrap(), &transition).is_err());

        let _guard = SecurityContextHolder::set_authentication(Authentication::new(
            "bob",
            ["ROLE_CLERK", "ROLE_SUPERVISOR"],
        ));
        assert!(listener.transition_executing(&ctx(), &transition).is_ok());
    }

    #[test]
    fn test_missing_authentication_is_denied() {
        let listener = SecurityFlowExecutionListener::new();
        let flow = FlowDefinition::builder("members")
            .secured(SecurityRule::any(["ROLE_MEMBER"]))
            .state(StateDefinition::new("home"))
            .build()
            .unwrap();

        SecurityContextHolder::clear();
        let err = listener.session_creating(&ctx(), &flow).unwrap_err();

        assert_eq!(
            err.to_string(),
            "access denied to flow 'members': 1 voter(s) denied access"
        );
    }

    #[test]
    fn test_unknown_comparison_fails_before_any_vote() {
        let voter = Arc::new(Counting::default());
        let listener = SecurityFlowExecutionListener::from_config_with_voter(&SecurityConfig::default(), voter.clone());
        let rule = SecurityRule::new(["ROLE_USER"], Comparison::parse("majority"));
        let state = StateDefinition::new("vote").secured(rule.clone());

        let _guard = SecurityContextHolder::set_authentication(Authentication::new("ada", ["ROLE_USER"]));
        let err = listener.decide(&rule, &state).unwrap_err();

        assert!(matches!(err, SecurityError::UnknownComparison(ref raw) if raw == "majority"));
        assert_eq!(err.to_string(), "unknown security rule match type: 'majority'");
        assert_eq!(voter.votes.load(Ordering::SeqCst), 0);

        listener.decide(&SecurityRule::all(["ROLE_USER"]), &state).unwrap();
        assert_eq!(voter.votes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_scope_bound_caller_takes_precedence() {
        let listener = SecurityFlowExecutionListener::new();
        let state = StateDefinition::new("ledger").secured(SecurityRule::any(["ROLE_ACCOUNTANT"]));

        let mut scoped = ctx();
        scoped.scope_mut().put(Authentication::new("ada", ["ROLE_ACCOUNTANT"]));

        SecurityContextHolder::clear();
        assert!(listener.state_entering(&scoped, &state).is_ok());
        assert!(listener.state_entering(&ctx(), &state).is_err());

        let _guard = SecurityContextHolder::set_authentication(Authentication::new("ada", ["ROLE_ACCOUNTANT"]));
        let mut outsider = ctx();
        outsider.scope_mut().put(Authentication::new("eve", ["ROLE_USER"]));
        let err = listener.state_entering(&outsider, &state).unwrap_err();
        assert!(err.downcast_ref::<SecurityError>().unwrap().is_access_denied());
    }

    #[test]
    fn test_configured_manager_is_always_used() {
        let manager = Arc::new(Recording::default());
        let listener = SecurityFlowExecutionListener::new().with_access_decision_manager(manager.clone());
        let all = StateDefinition::new("a").secured(SecurityRule::all(["ROLE_X", "PERM_Y"]));
        let unknown = StateDefinition::new("b").secured(SecurityRule::new(["ROLE_Z"], Comparison::parse("odd")));

        let _guard = SecurityContextHolder::set_authentication(Authentication::new("ada", Vec::<String>::new()));
        listener.state_entering(&ctx(), &all).unwrap();
        listener.state_entering(&ctx(), &unknown).unwrap();

        let calls = manager.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![
                (Some("ada".to_string()), "state 'a'".to_string(), vec!["ROLE_X".to_string(), "PERM_Y".to_string()]),
                (Some("ada".to_string()), "state 'b'".to_string(), vec!["ROLE_Z".to_string()]),
            ]
        );
        assert!(listener.access_decision_manager().is_some());
    }

    #[test]
    fn test_configured_manager_denial_propagates() {
        let manager = Arc::new(Recording {
            deny: true,
            ..Default::default()
        });
        let listener = SecurityFlowExecutionListener::new().with_access_decision_manager(manager);
        let flow = FlowDefinition::builder("audit")
            .secured(SecurityRule::any(["ROLE_AUDITOR"]))
            .state(StateDefinition::new("log"))
            .build()
            .unwrap();

        let err = listener.session_creating(&ctx(), &flow).unwrap_err();
        let security = err.downcast_ref::<SecurityError>().unwrap();
        assert!(security.to_string().contains("recording manager refuses"));
    }

    #[test]
    fn test_config_drives_default_managers() {
        let lenient = SecurityFlowExecutionListener::from_config(&SecurityConfig {
            role_prefix: "ROLE_".into(),
            allow_if_all_abstain: true,
        });
        let strict = SecurityFlowExecutionListener::new();
        let state = StateDefinition::new("export").secured(SecurityRule::any(["PERM_EXPORT"]));

        let _guard = SecurityContextHolder::set_authentication(Authentication::new("ada", ["ROLE_USER"]));
        assert!(lenient.state_entering(&ctx(), &state).is_ok());
        assert!(strict.state_entering(&ctx(), &state).is_err());

        let perms = SecurityFlowExecutionListener::from_config(&SecurityConfig {
            role_prefix: "PERM_".into(),
            allow_if_all_abstain: false,
        });
        let _guard = SecurityContextHolder::set_authentication(Authentication::new("bob", ["PERM_EXPORT"]));
        assert!(perms.state_entering(&ctx(), &state).is_ok());
    }
}
