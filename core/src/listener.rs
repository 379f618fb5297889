//! Listener - Flow Lifecycle Hooks
//!
//! A `FlowExecutionListener` observes a running flow. Hosts notify listeners
//! through a `ListenerChain` at each lifecycle point; a failing hook in a
//! guarded phase aborts the operation in progress.

use crate::context::RequestContext;
use crate::definition::{FlowDefinition, FlowElement, StateDefinition, TransitionDefinition};
use crate::error::{FlowError, FlowResult};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    SessionCreating,
    SessionStarted,
    StateEntering,
    StateEntered,
    TransitionExecuting,
    SessionEnded,
}

impl Phase {
    /// Guarded phases happen before the operation; a listener failure there
    /// is a veto.
    pub fn is_guarded(self) -> bool {
        matches!(
            self,
            Phase::SessionCreating | Phase::StateEntering | Phase::TransitionExecuting
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::SessionCreating => "session-creating",
            Phase::SessionStarted => "session-started",
            Phase::StateEntering => "state-entering",
            Phase::StateEntered => "state-entered",
            Phase::TransitionExecuting => "transition-executing",
            Phase::SessionEnded => "session-ended",
        };
        f.write_str(name)
    }
}

/// Lifecycle hooks of a flow execution. Every hook defaults to a no-op.
pub trait FlowExecutionListener: Send + Sync {
    /// A new flow session is about to be created. Failing aborts creation.
    fn session_creating(
        &self,
        _context: &RequestContext,
        _flow: &FlowDefinition,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn session_started(
        &self,
        _context: &RequestContext,
        _flow: &FlowDefinition,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// A state is about to be entered. Failing vetoes the entry.
    fn state_entering(
        &self,
        _context: &RequestContext,
        _state: &StateDefinition,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn state_entered(
        &self,
        _context: &RequestContext,
        _previous: Option<&StateDefinition>,
        _state: &StateDefinition,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// A transition is about to execute. Failing aborts the transition.
    fn transition_executing(
        &self,
        _context: &RequestContext,
        _transition: &TransitionDefinition,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn session_ended(
        &self,
        _context: &RequestContext,
        _flow: &FlowDefinition,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Ordered set of listeners, notified in registration order.
///
/// Notification stops at the first failing listener.
#[derive(Clone, Default)]
pub struct ListenerChain {
    listeners: Vec<Arc<dyn FlowExecutionListener>>,
}

impl ListenerChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<L: FlowExecutionListener + 'static>(mut self, listener: L) -> Self {
        self.listeners.push(Arc::new(listener));
        self
    }

    pub fn push(&mut self, listener: Arc<dyn FlowExecutionListener>) {
        self.listeners.push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn notify_session_creating(
        &self,
        context: &RequestContext,
        flow: &FlowDefinition,
    ) -> FlowResult<()> {
        self.dispatch(Phase::SessionCreating, flow, |l| l.session_creating(context, flow))
    }

    pub fn notify_session_started(
        &self,
        context: &RequestContext,
        flow: &FlowDefinition,
    ) -> FlowResult<()> {
        self.dispatch(Phase::SessionStarted, flow, |l| l.session_started(context, flow))
    }

    pub fn notify_state_entering(
        &self,
        context: &RequestContext,
        state: &StateDefinition,
    ) -> FlowResult<()> {
        self.dispatch(Phase::StateEntering, state, |l| l.state_entering(context, state))
    }

    pub fn notify_state_entered(
        &self,
        context: &RequestContext,
        previous: Option<&StateDefinition>,
        state: &StateDefinition,
    ) -> FlowResult<()> {
        self.dispatch(Phase::StateEntered, state, |l| {
            l.state_entered(context, previous, state)
        })
    }

    pub fn notify_transition_executing(
        &self,
        context: &RequestContext,
        transition: &TransitionDefinition,
    ) -> FlowResult<()> {
        self.dispatch(Phase::TransitionExecuting, transition, |l| {
            l.transition_executing(context, transition)
        })
    }

    pub fn notify_session_ended(
        &self,
        context: &RequestContext,
        flow: &FlowDefinition,
    ) -> FlowResult<()> {
        self.dispatch(Phase::SessionEnded, flow, |l| l.session_ended(context, flow))
    }

    /// Notify every lifecycle point along a scripted path: session creation,
    /// entry into the start state, then one transition per event. Ends the
    /// session when the path stops in an end state.
    ///
    /// Returns the id of the state reached. No actions run; this only drives
    /// the listeners, so hosts and tests can check what a caller may reach.
    pub fn walk(
        &self,
        context: &mut RequestContext,
        flow: &FlowDefinition,
        events: &[&str],
    ) -> FlowResult<String> {
        self.notify_session_creating(context, flow)?;
        self.notify_session_started(context, flow)?;

        let mut state = flow.start_state().ok_or_else(|| {
            FlowError::Definition(format!("flow '{}' has no start state", flow.id()))
        })?;
        self.notify_state_entering(context, state)?;
        context.set_current_state(state.id());
        self.notify_state_entered(context, None, state)?;

        for &event in events {
            let transition = state
                .transition_on(event)
                .ok_or_else(|| FlowError::NoTransition {
                    state: state.id().to_string(),
                    event: event.to_string(),
                })?;
            self.notify_transition_executing(context, transition)?;
            let next = flow.state(transition.to()).ok_or_else(|| {
                FlowError::Definition(format!("unknown state '{}'", transition.to()))
            })?;
            self.notify_state_entering(context, next)?;
            context.set_current_state(next.id());
            self.notify_state_entered(context, Some(state), next)?;
            state = next;
        }

        if state.is_end_state() {
            self.notify_session_ended(context, flow)?;
        }
        Ok(state.id().to_string())
    }

    fn dispatch<F>(&self, phase: Phase, element: &dyn FlowElement, notify: F) -> FlowResult<()>
    where
        F: Fn(&dyn FlowExecutionListener) -> anyhow::Result<()>,
    {
        for listener in &self.listeners {
            if let Err(source) = notify(listener.as_ref()) {
                let element = element.describe();
                tracing::debug!(%phase, %element, error = %source, "Listener aborted lifecycle phase");
                return Err(if phase.is_guarded() {
                    FlowError::Vetoed {
                        phase,
                        element,
                        source,
                    }
                } else {
                    FlowError::Listener {
                        phase,
                        element,
                        source,
                    }
                });
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ListenerChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerChain")
            .field("listener_count", &self.listeners.len())
            .finish()
    }
}
