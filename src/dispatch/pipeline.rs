//! Action pipeline.
//!
//! ```text
//! action lookup ──missing──▶ NotFound
//!     │
//! AUTH_CHECK ──needs auth, anonymous──▶ Unauthorized
//!     │
//! flash migration (persisted → now)
//!     │
//! PRE_HOOKS → HANDLER → POST_HOOKS → body
//! ```
//!
//! An action needs authentication when its controller's `AUTH` policy names
//! it or when the route carries `auth = true`. A hook or the handler
//! returning an error stops the pipeline there.

use crate::dispatch::context::ActionContext;
use crate::dispatch::controller::{ActionResult, Controller, DispatchError};

pub fn run_action<C: Controller>(controller: &mut C, ctx: &mut ActionContext<'_>) -> ActionResult {
    let name = ctx.action().to_string();
    let action = C::find_action(&name).ok_or_else(|| {
        DispatchError::NotFound(format!("Forward 404 page from {}/{}", C::NAME, name))
    })?;

    let gated = C::AUTH.requires(action.name) || ctx.params().requires_auth();
    if gated && !ctx.session().is_authenticated() {
        return Err(DispatchError::Unauthorized);
    }

    ctx.migrate_flash();

    for hook in C::BEFORE.iter().filter(|h| h.applies_to(action.name)) {
        tracing::trace!(controller = C::NAME, hook = hook.name, "Running before hook");
        (hook.run)(controller, ctx)?;
    }

    let body = (action.run)(controller, ctx)?;

    for hook in C::AFTER.iter().filter(|h| h.applies_to(action.name)) {
        tracing::trace!(controller = C::NAME, hook = hook.name, "Running after hook");
        (hook.run)(controller, ctx)?;
    }

    Ok(body)
}
