//! Per-invocation context handed to hooks and actions.

use serde_json::{Map, Value};

use crate::dispatch::controller::{ActionResult, DispatchError};
use crate::http::{Request, Response};
use crate::observability::metrics;
use crate::routing::RouteParams;
use crate::security::csrf::{CsrfOutcome, CsrfTokens};
use crate::session::flash::FlashKind;
use crate::session::{Flash, Session};
use crate::view::Renderer;

/// Form field carrying a CSRF token.
pub const CSRF_FIELD: &str = "csrf_token";

/// Everything an action may touch while it runs.
///
/// The session is borrowed for the whole invocation; the response is owned
/// and returned to the dispatcher once the action finishes.
pub struct ActionContext<'a> {
    controller: &'a str,
    action: &'a str,
    request: &'a Request,
    params: RouteParams,
    session: &'a mut Session,
    flash: Flash,
    response: Response,
    csrf: &'a CsrfTokens,
    renderer: &'a dyn Renderer,
}

impl<'a> ActionContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        controller: &'a str,
        action: &'a str,
        request: &'a Request,
        params: RouteParams,
        session: &'a mut Session,
        csrf: &'a CsrfTokens,
        renderer: &'a dyn Renderer,
    ) -> Self {
        Self {
            controller,
            action,
            request,
            params,
            session,
            flash: Flash::new(),
            response: Response::default(),
            csrf,
            renderer,
        }
    }

    pub fn controller(&self) -> &str {
        self.controller
    }

    pub fn action(&self) -> &str {
        self.action
    }

    pub fn request(&self) -> &Request {
        self.request
    }

    pub fn params(&self) -> &RouteParams {
        &self.params
    }

    /// A captured route parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    pub fn session(&self) -> &Session {
        &*self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut *self.session
    }

    /// Messages visible to this response.
    pub fn flash(&self) -> &Flash {
        &self.flash
    }

    pub fn set_flash_now(&mut self, kind: FlashKind, message: impl Into<String>) {
        self.flash.set_now(self.session, kind, message);
    }

    /// Keep a message for the next request.
    pub fn set_flash(&mut self, kind: FlashKind, message: impl Into<String>) {
        Flash::set(self.session, kind, message);
    }

    pub(crate) fn migrate_flash(&mut self) {
        self.flash.migrate(self.session);
    }

    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    /// Answer with a 302 to `location`; the returned body is empty.
    pub fn redirect(&mut self, location: &str) -> ActionResult {
        self.response
            .set_location(location, self.request)
            .map_err(DispatchError::handler)?;
        Ok(String::new())
    }

    /// Issue a token for `form_id`, to be embedded in the form.
    pub fn csrf_token(&mut self, form_id: &str) -> String {
        self.csrf.issue(self.session, form_id)
    }

    /// Check the token submitted in the `csrf_token` form field.
    ///
    /// A submission without the field is rejected outright.
    pub fn check_csrf(&mut self, form_id: &str) -> CsrfOutcome {
        let Some(token) = self.request.form(CSRF_FIELD) else {
            tracing::debug!(form = %form_id, "CSRF token missing from form");
            metrics::record_csrf(CsrfOutcome::Unauthorized.label());
            return CsrfOutcome::Unauthorized;
        };
        self.csrf.validate(self.session, form_id, token)
    }

    /// Check an explicitly supplied token.
    pub fn validate_csrf(&mut self, form_id: &str, token: &str) -> CsrfOutcome {
        self.csrf.validate(self.session, form_id, token)
    }

    /// Render `<controller>/<action>`.
    pub fn render(&self, vars: Value) -> ActionResult {
        let template = format!("{}/{}", self.controller, self.action);
        self.render_with(&template, None, vars)
    }

    pub fn render_template(&self, template: &str, vars: Value) -> ActionResult {
        self.render_with(template, None, vars)
    }

    pub fn render_with_layout(&self, template: &str, layout: &str, vars: Value) -> ActionResult {
        self.render_with(template, Some(layout), vars)
    }

    fn render_with(&self, template: &str, layout: Option<&str>, vars: Value) -> ActionResult {
        let vars = self.view_vars(vars);
        self.renderer
            .render(template, layout, &vars)
            .map_err(DispatchError::handler)
    }

    /// View defaults overlaid with the action's own variables.
    fn view_vars(&self, vars: Value) -> Value {
        let flash: Map<String, Value> = self
            .flash
            .iter()
            .map(|(kind, message)| (kind.to_string(), Value::String(message.to_string())))
            .collect();
        let params: Map<String, Value> = self
            .params
            .captures()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect();

        let mut merged = Map::new();
        merged.insert("base_url".into(), Value::String(self.request.base_url().to_string()));
        merged.insert("flash".into(), Value::Object(flash));
        merged.insert("authenticated".into(), Value::Bool(self.session.is_authenticated()));
        merged.insert("controller".into(), Value::String(self.controller.to_string()));
        merged.insert("action".into(), Value::String(self.action.to_string()));
        merged.insert("params".into(), Value::Object(params));

        match vars {
            Value::Object(own) => merged.extend(own),
            Value::Null => {}
            other => {
                merged.insert("data".into(), other);
            }
        }
        Value::Object(merged)
    }

    /// Abandon the action with the not-found page.
    pub fn forward_404(&self, detail: impl Into<String>) -> DispatchError {
        DispatchError::NotFound(detail.into())
    }

    pub(crate) fn into_response(mut self, body: String) -> Response {
        self.response.set_body(body);
        self.response
    }
}
