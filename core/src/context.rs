use crate::definition::FlowDefinition;
use crate::scope::Scope;
use uuid::Uuid;

/// Per-request context handed to every listener hook.
pub struct RequestContext {
    execution_id: Uuid,
    flow_id: String,
    current_state: Option<String>,
    scope: Scope,
}

impl RequestContext {
    pub fn new(flow_id: impl Into<String>) -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            flow_id: flow_id.into(),
            current_state: None,
            scope: Scope::new(),
        }
    }

    pub fn for_flow(flow: &FlowDefinition) -> Self {
        Self::new(flow.id())
    }

    pub fn execution_id(&self) -> Uuid {
        self.execution_id
    }

    pub fn flow_id(&self) -> &str {
        &self.flow_id
    }

    pub fn current_state(&self) -> Option<&str> {
        self.current_state.as_deref()
    }

    pub fn set_current_state(&mut self, state_id: impl Into<String>) {
        self.current_state = Some(state_id.into());
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn scope_mut(&mut self) -> &mut Scope {
        &mut self.scope
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("execution_id", &self.execution_id)
            .field("flow_id", &self.flow_id)
            .field("current_state", &self.current_state)
            .field("scope", &self.scope)
            .finish()
    }
}
