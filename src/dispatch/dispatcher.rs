//! Dispatcher run loop.
//!
//! Resolves the request, instantiates the controller and drives the action
//! pipeline. `NotFound` and `Unauthorized` are recovered here and always end
//! in a response; handler failures are returned to the transport.

use std::sync::Arc;
use std::time::Instant;

use crate::config::LoginConfig;
use crate::dispatch::context::ActionContext;
use crate::dispatch::controller::{BoxError, DispatchError};
use crate::dispatch::registry::ControllerRegistry;
use crate::http::{Request, Response};
use crate::observability::metrics;
use crate::routing::{RouteParams, Router};
use crate::security::csrf::CsrfTokens;
use crate::session::Session;
use crate::view::{PlainRenderer, Renderer};

/// Message shown for every not-found outcome outside debug mode.
pub const NOT_FOUND_MESSAGE: &str = "Page not found.";

pub struct Dispatcher {
    router: Arc<Router>,
    registry: Arc<ControllerRegistry>,
    renderer: Arc<dyn Renderer>,
    csrf: CsrfTokens,
    login: Option<LoginConfig>,
    debug: bool,
}

impl Dispatcher {
    pub fn new(router: Arc<Router>, registry: Arc<ControllerRegistry>) -> Self {
        Self {
            router,
            registry,
            renderer: Arc::new(PlainRenderer),
            csrf: CsrfTokens::default(),
            login: None,
            debug: false,
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_csrf(mut self, csrf: CsrfTokens) -> Self {
        self.csrf = csrf;
        self
    }

    /// Target run when an action needs authentication the session lacks.
    pub fn with_login(mut self, login: Option<LoginConfig>) -> Self {
        self.login = login;
        self
    }

    /// Show detailed not-found reasons.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn registry(&self) -> &ControllerRegistry {
        &self.registry
    }

    pub fn csrf(&self) -> &CsrfTokens {
        &self.csrf
    }

    /// Serve one request within `session`.
    pub fn dispatch(&self, request: &Request, session: &mut Session) -> Result<Response, BoxError> {
        let start = Instant::now();

        let resolved = request
            .verb()
            .and_then(|verb| self.router.resolve(request.path(), verb));
        let Some(params) = resolved else {
            let verb = request.verb().map_or("unsupported", |v| v.as_str());
            tracing::debug!(path = %request.path(), verb, "No route matched");
            metrics::record_dispatch("not_found", start);
            return Ok(self.not_found(&format!(
                "No route matches {} {}",
                verb,
                request.path()
            )));
        };

        let controller = params.controller().unwrap_or_default().to_string();
        let action = params.action().unwrap_or_default().to_string();
        tracing::debug!(controller = %controller, action = %action, "Route resolved");

        match self.run_action(&controller, &action, params, request, session) {
            Ok(response) => {
                metrics::record_dispatch("ok", start);
                Ok(response)
            }
            Err(DispatchError::NotFound(detail)) => {
                tracing::warn!(controller = %controller, action = %action, detail = %detail, "Not found");
                metrics::record_dispatch("not_found", start);
                Ok(self.not_found(&detail))
            }
            Err(DispatchError::Unauthorized) => {
                tracing::info!(controller = %controller, action = %action, "Authentication required, running login target");
                metrics::record_dispatch("unauthorized", start);
                self.run_login(request, session)
            }
            Err(DispatchError::Handler(e)) => {
                tracing::error!(controller = %controller, action = %action, error = %e, "Action failed");
                metrics::record_dispatch("error", start);
                Err(e)
            }
        }
    }

    /// Run `controller`/`action` without resolving, as the login fallback does.
    pub fn run_action(
        &self,
        controller: &str,
        action: &str,
        params: RouteParams,
        request: &Request,
        session: &mut Session,
    ) -> Result<Response, DispatchError> {
        let mut instance = self.registry.create(controller).ok_or_else(|| {
            DispatchError::NotFound(format!("Controller `{}` is not registered", controller))
        })?;

        let mut ctx = ActionContext::new(
            controller,
            action,
            request,
            params,
            session,
            &self.csrf,
            self.renderer.as_ref(),
        );
        let body = instance.run(&mut ctx)?;
        Ok(ctx.into_response(body))
    }

    fn run_login(&self, request: &Request, session: &mut Session) -> Result<Response, BoxError> {
        let Some(login) = &self.login else {
            tracing::warn!("No login target configured");
            return Ok(self.not_found("Authentication required and no login target is configured"));
        };

        let params = RouteParams::for_target(&login.controller, &login.action);
        match self.run_action(&login.controller, &login.action, params, request, session) {
            Ok(response) => Ok(response),
            Err(DispatchError::NotFound(detail)) => Ok(self.not_found(&detail)),
            Err(DispatchError::Unauthorized) => {
                tracing::warn!(
                    controller = %login.controller,
                    action = %login.action,
                    "Login target itself requires authentication"
                );
                Ok(self.not_found("Login target requires authentication"))
            }
            Err(DispatchError::Handler(e)) => {
                tracing::error!(error = %e, "Login action failed");
                Err(e)
            }
        }
    }

    /// The fixed not-found response.
    pub fn not_found(&self, detail: &str) -> Response {
        let message = if self.debug { detail } else { NOT_FOUND_MESSAGE };
        Response::not_found(self.renderer.render_not_found(message))
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.router.table().len())
            .field("registry", &self.registry)
            .field("login", &self.login)
            .field("debug", &self.debug)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::controller::{Action, ActionResult, AuthPolicy, Controller};
    use crate::routing::{RouteDefinition, Verb};
    use axum::http::StatusCode;

    #[derive(Default)]
    struct Account;

    impl Account {
        fn login(&mut self, _ctx: &mut ActionContext<'_>) -> ActionResult {
            Ok("login form".into())
        }
    }

    impl Controller for Account {
        const NAME: &'static str = "account";
        const ACTIONS: &'static [Action<Self>] = &[Action::new("login", Account::login)];
    }

    #[derive(Default)]
    struct Vault;

    impl Vault {
        fn open(&mut self, _ctx: &mut ActionContext<'_>) -> ActionResult {
            Ok("opened".into())
        }
    }

    impl Controller for Vault {
        const NAME: &'static str = "vault";
        const AUTH: AuthPolicy = AuthPolicy::All;
        const ACTIONS: &'static [Action<Self>] = &[Action::new("open", Vault::open)];
    }

    #[derive(Default)]
    struct Notes;

    impl Notes {
        fn index(&mut self, _ctx: &mut ActionContext<'_>) -> ActionResult {
            Ok("notes index".into())
        }
    }

    impl Controller for Notes {
        const NAME: &'static str = "notes";
        const ACTIONS: &'static [Action<Self>] = &[Action::new("index", Notes::index)];
    }

    fn dispatcher(login: bool, debug: bool) -> Dispatcher {
        let router = Router::from_definitions([
            RouteDefinition::new("/login", [("controller", "account"), ("action", "login")]),
            RouteDefinition::new("/vault", [("controller", "vault"), ("action", "open")]),
            RouteDefinition::new("/ghost", [("controller", "ghost"), ("action", "index")]),
            RouteDefinition::new("/account/x", [("controller", "account"), ("action", "x")]),
            RouteDefinition::new("/notes/%[index]", [("controller", "notes"), ("auth", "true")]),
            RouteDefinition::new("/public-notes", [("controller", "notes"), ("action", "index")]),
        ])
        .unwrap();
        let registry = ControllerRegistry::new()
            .with::<Account>()
            .with::<Vault>()
            .with::<Notes>();
        let login = login.then(|| LoginConfig {
            controller: "account".into(),
            action: "login".into(),
        });
        Dispatcher::new(Arc::new(router), Arc::new(registry))
            .with_login(login)
            .with_debug(debug)
    }

    #[test]
    fn test_unknown_route_is_not_found() {
        let mut session = Session::new();
        let response = dispatcher(true, false)
            .dispatch(&Request::new(Verb::Get, "/nowhere"), &mut session)
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.body(), NOT_FOUND_MESSAGE);
    }

    #[test]
    fn test_debug_shows_detail() {
        let mut session = Session::new();
        let d = dispatcher(true, true);

        let response = d.dispatch(&Request::new(Verb::Get, "/ghost"), &mut session).unwrap();
        assert_eq!(response.body(), "Controller `ghost` is not registered");

        let response = d.dispatch(&Request::new(Verb::Get, "/account/x"), &mut session).unwrap();
        assert_eq!(response.body(), "Forward 404 page from account/x");
    }

    #[test]
    fn test_unsupported_verb_is_not_found() {
        let mut session = Session::new();
        let response = dispatcher(true, false)
            .dispatch(&Request::new(None::<Verb>, "/login"), &mut session)
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_unauthorized_runs_login_target() {
        let mut session = Session::new();
        let response = dispatcher(true, false)
            .dispatch(&Request::new(Verb::Get, "/vault"), &mut session)
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body(), "login form");

        session.set_authenticated(true);
        let response = dispatcher(true, false)
            .dispatch(&Request::new(Verb::Get, "/vault"), &mut session)
            .unwrap();
        assert_eq!(response.body(), "opened");
    }

    #[test]
    fn test_unauthorized_without_login_target_is_not_found() {
        let mut session = Session::new();
        let response = dispatcher(false, false)
            .dispatch(&Request::new(Verb::Get, "/vault"), &mut session)
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_route_auth_metadata_gates_public_controller() {
        let d = dispatcher(true, false);
        let mut session = Session::new();

        let response = d.dispatch(&Request::new(Verb::Get, "/notes"), &mut session).unwrap();
        assert_eq!(response.body(), "login form");

        let response = d
            .dispatch(&Request::new(Verb::Get, "/public-notes"), &mut session)
            .unwrap();
        assert_eq!(response.body(), "notes index");

        session.set_authenticated(true);
        let response = d.dispatch(&Request::new(Verb::Get, "/notes"), &mut session).unwrap();
        assert_eq!(response.body(), "notes index");
    }
}
