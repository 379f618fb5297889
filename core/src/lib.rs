//! Waypost Core - Flow Definitions and Lifecycle Contract
//!
//! This crate defines the **structural** side of Waypost:
//! - `FlowDefinition` / `StateDefinition` / `TransitionDefinition`: the flow graph
//! - `SecurityRule`: typed security metadata attached to any flow element
//! - `FlowExecutionListener` / `ListenerChain`: lifecycle hooks and their dispatch
//! - `RequestContext` / `Scope`: per-request state handed to every hook
//!
//! **IMPORTANT**: No engine lives here. Hosts drive flows and call the chain.

pub mod attributes;
pub mod context;
pub mod definition;
pub mod error;
pub mod listener;
pub mod rule;
pub mod scope;

pub use attributes::Attributes;
pub use context::RequestContext;
pub use definition::{
    ElementKind, FlowDefinition, FlowDefinitionBuilder, FlowElement, StateDefinition,
    TransitionDefinition,
};
pub use error::{FlowError, FlowResult};
pub use listener::{FlowExecutionListener, ListenerChain, Phase};
pub use rule::{Comparison, SECURITY_ATTRIBUTE_NAME, SecurityRule};
pub use scope::Scope;

pub mod prelude {
    pub use crate::attributes::Attributes;
    pub use crate::context::RequestContext;
    pub use crate::definition::{
        ElementKind, FlowDefinition, FlowElement, StateDefinition, TransitionDefinition,
    };
    pub use crate::error::{FlowError, FlowResult};
    pub use crate::listener::{FlowExecutionListener, ListenerChain, Phase};
    pub use crate::rule::{Comparison, SecurityRule};
}
