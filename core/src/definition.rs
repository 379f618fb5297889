//! Flow Definitions - The Declared Flow Graph
//!
//! A flow is a set of named states connected by event-triggered transitions.
//! Every part of the graph (the flow itself, each state, each transition) is a
//! `FlowElement` and may carry one `SecurityRule`.
//!
//! Definitions are built once (builder or TOML) and validated before use:
//!
//! ```rust
//! use waypost_core::{FlowDefinition, SecurityRule, StateDefinition, TransitionDefinition};
//!
//! let flow = FlowDefinition::builder("checkout")
//!     .secured(SecurityRule::any(["ROLE_USER"]))
//!     .state(StateDefinition::new("cart").transition(TransitionDefinition::new("pay", "paid")))
//!     .state(StateDefinition::new("paid"))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(flow.start_state_id(), "cart");
//! ```

use crate::attributes::Attributes;
use crate::error::{FlowError, FlowResult};
use crate::rule::{SECURITY_ATTRIBUTE_NAME, SecurityRule};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElementKind {
    Flow,
    State,
    Transition,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Flow => f.write_str("flow"),
            ElementKind::State => f.write_str("state"),
            ElementKind::Transition => f.write_str("transition"),
        }
    }
}

/// Capability shared by every part of a flow graph.
pub trait FlowElement: Send + Sync {
    fn element_id(&self) -> &str;

    fn kind(&self) -> ElementKind;

    fn attributes(&self) -> &Attributes;

    /// The attached rule, if the element is secured.
    fn security_rule(&self) -> Option<&SecurityRule>;

    /// Human-readable label used in errors and logs, e.g. `state 'payment'`.
    fn describe(&self) -> String {
        format!("{} '{}'", self.kind(), self.element_id())
    }
}

// ============================================================================
// Transition
// ============================================================================

/// Moves the flow to state `to` when event `on` is signalled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct TransitionDefinition {
    on: String,
    to: String,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    attributes: Attributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    secured: Option<SecurityRule>,
}

impl TransitionDefinition {
    pub fn new(on: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            on: on.into(),
            to: to.into(),
            attributes: Attributes::new(),
            secured: None,
        }
    }

    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key, value);
        self
    }

    pub fn secured(mut self, rule: SecurityRule) -> Self {
        self.secured = Some(rule);
        self
    }

    /// The event that triggers this transition.
    pub fn on(&self) -> &str {
        &self.on
    }

    /// The target state id.
    pub fn to(&self) -> &str {
        &self.to
    }
}

impl FlowElement for TransitionDefinition {
    fn element_id(&self) -> &str {
        &self.on
    }

    fn kind(&self) -> ElementKind {
        ElementKind::Transition
    }

    fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn security_rule(&self) -> Option<&SecurityRule> {
        self.secured.as_ref()
    }
}

// ============================================================================
// State
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct StateDefinition {
    id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    transitions: Vec<TransitionDefinition>,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    attributes: Attributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    secured: Option<SecurityRule>,
}

impl StateDefinition {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            transitions: Vec::new(),
            attributes: Attributes::new(),
            secured: None,
        }
    }

    pub fn transition(mut self, transition: TransitionDefinition) -> Self {
        self.transitions.push(transition);
        self
    }

    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key, value);
        self
    }

    pub fn secured(mut self, rule: SecurityRule) -> Self {
        self.secured = Some(rule);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn transitions(&self) -> &[TransitionDefinition] {
        &self.transitions
    }

    /// The transition triggered by `event`, if this state declares one.
    pub fn transition_on(&self, event: &str) -> Option<&TransitionDefinition> {
        self.transitions.iter().find(|t| t.on == event)
    }

    /// A state without outgoing transitions ends the flow.
    pub fn is_end_state(&self) -> bool {
        self.transitions.is_empty()
    }
}

impl FlowElement for StateDefinition {
    fn element_id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> ElementKind {
        ElementKind::State
    }

    fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn security_rule(&self) -> Option<&SecurityRule> {
        self.secured.as_ref()
    }
}

// ============================================================================
// Flow
// ============================================================================

/// A validated flow graph.
///
/// Every construction path, serde included, goes through validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", try_from = "RawFlowDefinition")]
pub struct FlowDefinition {
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_state: Option<String>,
    states: Vec<StateDefinition>,
    #[serde(skip_serializing_if = "Attributes::is_empty")]
    attributes: Attributes,
    #[serde(skip_serializing_if = "Option::is_none")]
    secured: Option<SecurityRule>,
}

/// Declared shape of a flow, before validation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawFlowDefinition {
    id: String,
    /// Defaults to the first declared state.
    #[serde(default)]
    start_state: Option<String>,
    states: Vec<StateDefinition>,
    #[serde(default)]
    attributes: Attributes,
    #[serde(default)]
    secured: Option<SecurityRule>,
}

impl TryFrom<RawFlowDefinition> for FlowDefinition {
    type Error = FlowError;

    fn try_from(raw: RawFlowDefinition) -> FlowResult<Self> {
        FlowDefinition {
            id: raw.id,
            start_state: raw.start_state,
            states: raw.states,
            attributes: raw.attributes,
            secured: raw.secured,
        }
        .validated()
    }
}

impl FlowDefinition {
    pub fn builder(id: impl Into<String>) -> FlowDefinitionBuilder {
        FlowDefinitionBuilder::new(id)
    }

    /// Syntax errors surface as `FlowError::Parse`, invariant violations as
    /// `FlowError::Definition`.
    pub fn from_toml_str(source: &str) -> FlowResult<Self> {
        let raw: RawFlowDefinition = toml::from_str(source)?;
        FlowDefinition::try_from(raw)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> FlowResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn states(&self) -> &[StateDefinition] {
        &self.states
    }

    pub fn state(&self, id: &str) -> Option<&StateDefinition> {
        self.states.iter().find(|s| s.id == id)
    }

    pub fn start_state_id(&self) -> &str {
        self.start_state.as_deref().unwrap_or_default()
    }

    pub fn start_state(&self) -> Option<&StateDefinition> {
        self.state(self.start_state_id())
    }

    /// Check structural invariants and resolve the start state.
    fn validated(mut self) -> FlowResult<Self> {
        if self.id.trim().is_empty() {
            return Err(FlowError::Definition("flow id must not be empty".into()));
        }
        let flow_id = self.id.clone();
        let invalid = |message: String| FlowError::Definition(format!("flow '{flow_id}': {message}"));

        if self.states.is_empty() {
            return Err(invalid("declares no states".into()));
        }
        reject_reserved_attribute(&self, &invalid)?;

        let mut ids = HashSet::new();
        for state in &self.states {
            if state.id.trim().is_empty() {
                return Err(invalid("state id must not be empty".into()));
            }
            if !ids.insert(state.id.as_str()) {
                return Err(invalid(format!("duplicate state '{}'", state.id)));
            }
            reject_reserved_attribute(state, &invalid)?;
        }

        for state in &self.states {
            let mut events = HashSet::new();
            for transition in &state.transitions {
                if transition.on.trim().is_empty() {
                    return Err(invalid(format!(
                        "state '{}' declares a transition without an event",
                        state.id
                    )));
                }
                if !events.insert(transition.on.as_str()) {
                    return Err(invalid(format!(
                        "state '{}' declares event '{}' twice",
                        state.id, transition.on
                    )));
                }
                if !ids.contains(transition.to.as_str()) {
                    return Err(invalid(format!(
                        "transition '{}' of state '{}' targets unknown state '{}'",
                        transition.on, state.id, transition.to
                    )));
                }
                reject_reserved_attribute(transition, &invalid)?;
            }
        }

        let start = match self.start_state.take() {
            Some(start) => start,
            None => self.states[0].id.clone(),
        };
        if !ids.contains(start.as_str()) {
            return Err(invalid(format!("unknown start state '{start}'")));
        }
        self.start_state = Some(start);

        Ok(self)
    }
}

fn reject_reserved_attribute(
    element: &dyn FlowElement,
    invalid: &dyn Fn(String) -> FlowError,
) -> FlowResult<()> {
    if element.attributes().contains(SECURITY_ATTRIBUTE_NAME) {
        return Err(invalid(format!(
            "{} uses reserved attribute '{}'; declare a security rule instead",
            element.describe(),
            SECURITY_ATTRIBUTE_NAME
        )));
    }
    Ok(())
}

impl FlowElement for FlowDefinition {
    fn element_id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> ElementKind {
        ElementKind::Flow
    }

    fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn security_rule(&self) -> Option<&SecurityRule> {
        self.secured.as_ref()
    }
}

/// Builder for [`FlowDefinition`]; `build` runs validation.
#[derive(Debug, Clone)]
pub struct FlowDefinitionBuilder {
    flow: FlowDefinition,
}

impl FlowDefinitionBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            flow: FlowDefinition {
                id: id.into(),
                start_state: None,
                states: Vec::new(),
                attributes: Attributes::new(),
                secured: None,
            },
        }
    }

    pub fn start_state(mut self, id: impl Into<String>) -> Self {
        self.flow.start_state = Some(id.into());
        self
    }

    pub fn state(mut self, state: StateDefinition) -> Self {
        self.flow.states.push(state);
        self
    }

    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.flow.attributes.insert(key, value);
        self
    }

    pub fn secured(mut self, rule: SecurityRule) -> Self {
        self.flow.secured = Some(rule);
        self
    }

    pub fn build(self) -> FlowResult<FlowDefinition> {
        self.flow.validated()
    }
}
