//! Controller declarations.
//!
//! A controller is a plain struct plus static tables: which actions it
//! exposes, which of them need an authenticated session, and which hooks
//! wrap which actions. Nothing is looked up by name outside these tables.

use thiserror::Error;

use crate::dispatch::context::ActionContext;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Body text of a completed action.
pub type ActionResult = Result<String, DispatchError>;

pub type ActionFn<C> = fn(&mut C, &mut ActionContext<'_>) -> ActionResult;

pub type HookFn<C> = fn(&mut C, &mut ActionContext<'_>) -> Result<(), DispatchError>;

/// Outcomes that leave the action pipeline early.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Route, controller or action missing. Recovered into the not-found page.
    #[error("not found: {0}")]
    NotFound(String),

    /// Action needs an authenticated session. Recovered by running the login target.
    #[error("authentication required")]
    Unauthorized,

    /// Anything else a handler fails with. Not recovered by the dispatcher.
    #[error(transparent)]
    Handler(BoxError),
}

impl DispatchError {
    pub fn handler<E>(error: E) -> Self
    where
        E: Into<BoxError>,
    {
        DispatchError::Handler(error.into())
    }
}

/// Which actions of a controller need an authenticated session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthPolicy {
    #[default]
    Public,
    All,
    Actions(&'static [&'static str]),
}

impl AuthPolicy {
    pub fn requires(&self, action: &str) -> bool {
        match self {
            AuthPolicy::Public => false,
            AuthPolicy::All => true,
            AuthPolicy::Actions(actions) => actions.contains(&action),
        }
    }
}

/// A named action and its body.
pub struct Action<C> {
    pub name: &'static str,
    pub run: ActionFn<C>,
}

impl<C> Action<C> {
    pub const fn new(name: &'static str, run: ActionFn<C>) -> Self {
        Self { name, run }
    }
}

/// A hook and the actions it wraps.
pub struct Hook<C> {
    pub name: &'static str,
    pub run: HookFn<C>,
    pub actions: &'static [&'static str],
}

impl<C> Hook<C> {
    pub const fn new(name: &'static str, run: HookFn<C>, actions: &'static [&'static str]) -> Self {
        Self { name, run, actions }
    }

    pub fn applies_to(&self, action: &str) -> bool {
        self.actions.contains(&action)
    }
}

/// A dispatch target.
///
/// ```ignore
/// #[derive(Default)]
/// struct Posts;
///
/// impl Controller for Posts {
///     const NAME: &'static str = "posts";
///     const AUTH: AuthPolicy = AuthPolicy::Actions(&["create"]);
///     const ACTIONS: &'static [Action<Self>] = &[
///         Action::new("index", Posts::index),
///         Action::new("create", Posts::create),
///     ];
/// }
/// ```
pub trait Controller: Sized + Send + 'static {
    /// Identifier matched against the `controller` route metadata.
    const NAME: &'static str;

    const AUTH: AuthPolicy = AuthPolicy::Public;

    const ACTIONS: &'static [Action<Self>];

    /// Run before the action body, in order.
    const BEFORE: &'static [Hook<Self>] = &[];

    /// Run after the action body, in order.
    const AFTER: &'static [Hook<Self>] = &[];

    fn find_action(name: &str) -> Option<&'static Action<Self>> {
        Self::ACTIONS.iter().find(|a| a.name == name)
    }
}
