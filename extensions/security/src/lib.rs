//! # Waypost Security
//!
//! Access decisions for secured flow elements.
//!
//! Install a [`SecurityFlowExecutionListener`] in a flow's listener chain. When
//! a session is created, a state is entered or a transition executes, the
//! listener reads the element's [`SecurityRule`](waypost_core::SecurityRule)
//! and asks an [`AccessDecisionManager`] whether the caller bound to the
//! current thread may proceed.
//!
//! ```rust
//! use waypost_core::{FlowDefinition, ListenerChain, RequestContext, SecurityRule, StateDefinition};
//! use waypost_security::{Authentication, SecurityContextHolder, SecurityFlowExecutionListener};
//!
//! let flow = FlowDefinition::builder("admin")
//!     .secured(SecurityRule::any(["ROLE_ADMIN"]))
//!     .state(StateDefinition::new("dashboard"))
//!     .build()
//!     .unwrap();
//! let chain = ListenerChain::new().with(SecurityFlowExecutionListener::new());
//! let ctx = RequestContext::for_flow(&flow);
//!
//! let _guard = SecurityContextHolder::set_authentication(Authentication::new("ada", ["ROLE_ADMIN"]));
//! assert!(chain.notify_session_creating(&ctx, &flow).is_ok());
//! ```

pub mod attribute;
pub mod authentication;
pub mod config;
pub mod context;
pub mod error;
pub mod listener;
pub mod manager;
pub mod voter;

pub use attribute::{ConfigAttribute, config_attributes};
pub use authentication::{Authentication, GrantedAuthority};
pub use config::SecurityConfig;
pub use context::{AuthenticationGuard, SecurityContextHolder};
pub use error::{SecurityError, SecurityResult};
pub use listener::SecurityFlowExecutionListener;
pub use manager::{AccessDecisionManager, AffirmativeBased, ConsensusBased, UnanimousBased};
pub use voter::{AccessDecisionVoter, AuthenticatedVoter, RoleVoter, Vote};
