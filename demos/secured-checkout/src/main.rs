/*!
# Secured Checkout Demo

Loads a checkout flow whose session, `payment` state and `override-price`
transition carry security rules, installs the security listener, and walks
the flow as several users. Each caller travels in the request scope.

Run with `RUST_LOG=debug` to see every rule evaluation.
*/

use anyhow::Context;
use std::path::Path;
use tracing_subscriber::EnvFilter;
use waypost_core::{
    FlowDefinition, FlowExecutionListener, ListenerChain, RequestContext, StateDefinition,
};
use waypost_security::{
    Authentication, SecurityConfig, SecurityError, SecurityFlowExecutionListener,
};

/// Logs every state the flow settles in.
struct Breadcrumbs;

impl FlowExecutionListener for Breadcrumbs {
    fn state_entered(
        &self,
        context: &RequestContext,
        previous: Option<&StateDefinition>,
        state: &StateDefinition,
    ) -> anyhow::Result<()> {
        tracing::info!(
            execution = %context.execution_id(),
            from = previous.map(|s| s.id()).unwrap_or("<start>"),
            to = state.id(),
            "Entered state"
        );
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let flow = FlowDefinition::from_toml_file(dir.join("checkout.toml"))
        .context("loading checkout flow")?;
    let config = SecurityConfig::from_toml_file(dir.join("security.toml"))
        .context("loading security config")?;

    let chain = ListenerChain::new()
        .with(SecurityFlowExecutionListener::from_config(&config))
        .with(Breadcrumbs);

    let scenarios = [
        ("customer pays", Authentication::new("ada", ["ROLE_CUSTOMER"]), vec!["pay", "confirm"]),
        ("visitor browses", Authentication::anonymous(), vec![]),
        ("staff tries to pay", Authentication::new("sam", ["ROLE_STAFF"]), vec!["pay"]),
        ("clerk overrides price", Authentication::new("cleo", ["ROLE_STAFF"]), vec!["override-price"]),
        (
            "manager overrides price",
            Authentication::new("max", ["ROLE_STAFF", "ROLE_MANAGER"]),
            vec!["override-price"],
        ),
    ];

    for (name, user, events) in scenarios {
        let principal = user.principal().to_string();
        let mut context = RequestContext::for_flow(&flow);
        context.scope_mut().put(user);
        let outcome = chain.walk(&mut context, &flow, &events);
        match outcome {
            Ok(state) => tracing::info!(scenario = name, %principal, %state, "Flow reached state"),
            Err(err) => {
                let reason = err
                    .listener_source()
                    .and_then(|source| source.downcast_ref::<SecurityError>())
                    .map(ToString::to_string)
                    .unwrap_or_else(|| err.to_string());
                tracing::warn!(scenario = name, %principal, error = %err, %reason, "Flow stopped");
            }
        }
    }

    Ok(())
}
