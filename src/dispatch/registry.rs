//! Controller registry: identifier → factory, filled at startup.

use std::collections::HashMap;

use crate::dispatch::context::ActionContext;
use crate::dispatch::controller::{ActionResult, Controller};
use crate::dispatch::pipeline;

/// Object-safe view of a [`Controller`].
pub trait AnyController: Send {
    fn name(&self) -> &'static str;

    fn has_action(&self, action: &str) -> bool;

    /// Run `ctx.action()` through the action pipeline.
    fn run(&mut self, ctx: &mut ActionContext<'_>) -> ActionResult;
}

impl<C: Controller> AnyController for C {
    fn name(&self) -> &'static str {
        C::NAME
    }

    fn has_action(&self, action: &str) -> bool {
        C::find_action(action).is_some()
    }

    fn run(&mut self, ctx: &mut ActionContext<'_>) -> ActionResult {
        pipeline::run_action(self, ctx)
    }
}

type Factory = Box<dyn Fn() -> Box<dyn AnyController> + Send + Sync>;

/// Creates a fresh controller instance per dispatch.
#[derive(Default)]
pub struct ControllerRegistry {
    factories: HashMap<&'static str, Factory>,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `C` under `C::NAME`, built by `factory`.
    ///
    /// A second registration under the same name replaces the first.
    pub fn register<C, F>(&mut self, factory: F) -> &mut Self
    where
        C: Controller,
        F: Fn() -> C + Send + Sync + 'static,
    {
        let replaced = self
            .factories
            .insert(
                C::NAME,
                Box::new(move || Box::new(factory()) as Box<dyn AnyController>),
            )
            .is_some();
        if replaced {
            tracing::warn!(controller = C::NAME, "Controller registered twice, keeping the last");
        }
        self
    }

    /// Register `C` built with `Default`.
    pub fn with<C>(mut self) -> Self
    where
        C: Controller + Default,
    {
        self.register(C::default);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered identifiers, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    pub fn create(&self, name: &str) -> Option<Box<dyn AnyController>> {
        self.factories.get(name).map(|factory| factory())
    }
}

impl std::fmt::Debug for ControllerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerRegistry")
            .field("controllers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::controller::Action;

    #[derive(Default)]
    struct Pages {
        visits: u32,
    }

    impl Pages {
        fn home(&mut self, _ctx: &mut ActionContext<'_>) -> ActionResult {
            self.visits += 1;
            Ok(format!("visits={}", self.visits))
        }
    }

    impl Controller for Pages {
        const NAME: &'static str = "pages";
        const ACTIONS: &'static [Action<Self>] = &[Action::new("home", Pages::home)];
    }

    #[test]
    fn test_lookup_by_name() {
        let registry = ControllerRegistry::new().with::<Pages>();
        assert!(registry.contains("pages"));
        assert!(!registry.contains("posts"));
        assert_eq!(registry.names(), vec!["pages"]);

        let controller = registry.create("pages").unwrap();
        assert_eq!(controller.name(), "pages");
        assert!(controller.has_action("home"));
        assert!(!controller.has_action("away"));
        assert!(registry.create("posts").is_none());
    }

    #[test]
    fn test_custom_factory() {
        let mut registry = ControllerRegistry::new();
        registry.register(|| Pages { visits: 41 });
        assert_eq!(registry.len(), 1);
        assert!(registry.create("pages").is_some());
    }
}
