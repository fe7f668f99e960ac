//! Shared controllers and helpers for integration tests.
#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use switchyard::config::{parse_config, AppConfig};
use switchyard::dispatch::{
    Action, ActionContext, ActionResult, AuthPolicy, Controller, ControllerRegistry,
    DispatchError, Hook,
};
use switchyard::{Application, CsrfOutcome, FlashKind, Request, Response, Session, Verb};

pub const PASSWORD: &str = "correct horse";

pub const CONFIG: &str = r#"
[login]
controller = "account"
action = "login"

[session]
cookie_name = "SID"

[routes]
"/login@get" = { controller = "account", action = "login" }
"/login@post" = { controller = "account", action = "authenticate" }
"/logout@post" = { controller = "account", action = "logout" }
"/posts/%rest[publish@post]" = { controller = "posts" }
"/archive" = { controller = "posts", action = "archive" }
"/admin/%rest" = { controller = "admin", auth = true }
"/hooked/:id" = { controller = "hooked", action = "show" }
"/hooked" = { controller = "hooked", action = "plain" }
"/broken" = { controller = "broken", action = "explode" }
"/flash/set" = { controller = "flashes", action = "set" }
"/flash/show" = { controller = "flashes", action = "show" }
"/ghost" = { controller = "ghost", action = "index" }
"#;

#[derive(Default)]
pub struct Account;

impl Account {
    fn login(&mut self, ctx: &mut ActionContext<'_>) -> ActionResult {
        let token = ctx.csrf_token("login");
        ctx.render_template("account/login", json!({ "csrf_token": token }))
    }

    fn authenticate(&mut self, ctx: &mut ActionContext<'_>) -> ActionResult {
        match ctx.check_csrf("login") {
            CsrfOutcome::Valid => {}
            CsrfOutcome::Expired => {
                ctx.set_flash_now(FlashKind::Warning, "Form expired, please try again.");
                return self.login(ctx);
            }
            CsrfOutcome::Unauthorized => {
                ctx.set_flash_now(FlashKind::Danger, "Invalid form submission.");
                return self.login(ctx);
            }
        }

        if ctx.request().form("password") != Some(PASSWORD) {
            ctx.set_flash_now(FlashKind::Danger, "Wrong password.");
            return self.login(ctx);
        }

        ctx.session_mut().set_authenticated(true);
        ctx.set_flash(FlashKind::Success, "Welcome back.");
        ctx.redirect("/admin")
    }

    fn logout(&mut self, ctx: &mut ActionContext<'_>) -> ActionResult {
        ctx.session_mut().set_authenticated(false);
        ctx.redirect("/login")
    }
}

impl Controller for Account {
    const NAME: &'static str = "account";
    const ACTIONS: &'static [Action<Self>] = &[
        Action::new("login", Account::login),
        Action::new("authenticate", Account::authenticate),
        Action::new("logout", Account::logout),
    ];
}

/// `controller#action` plus the captured id, if any.
fn echo(ctx: &mut ActionContext<'_>) -> ActionResult {
    Ok(match ctx.param("id") {
        Some(id) => format!("{}#{} {}", ctx.controller(), ctx.action(), id),
        None => format!("{}#{}", ctx.controller(), ctx.action()),
    })
}

#[derive(Default)]
pub struct Posts;

impl Posts {
    fn echo(&mut self, ctx: &mut ActionContext<'_>) -> ActionResult {
        echo(ctx)
    }
}

impl Controller for Posts {
    const NAME: &'static str = "posts";
    const AUTH: AuthPolicy = AuthPolicy::Actions(&["create"]);
    const ACTIONS: &'static [Action<Self>] = &[
        Action::new("index", Posts::echo),
        Action::new("show", Posts::echo),
        Action::new("new", Posts::echo),
        Action::new("create", Posts::echo),
        Action::new("edit", Posts::echo),
        Action::new("update", Posts::echo),
        Action::new("destroy", Posts::echo),
        Action::new("publish", Posts::echo),
    ];
}

/// Public controller; the `/admin/%rest` route's `auth = true` protects it.
#[derive(Default)]
pub struct Admin;

impl Admin {
    fn index(&mut self, ctx: &mut ActionContext<'_>) -> ActionResult {
        ctx.render(json!({ "section": "dashboard" }))
    }

    fn echo(&mut self, ctx: &mut ActionContext<'_>) -> ActionResult {
        echo(ctx)
    }
}

impl Controller for Admin {
    const NAME: &'static str = "admin";
    const ACTIONS: &'static [Action<Self>] = &[
        Action::new("index", Admin::index),
        Action::new("show", Admin::echo),
        Action::new("destroy", Admin::echo),
    ];
}

/// Records the order in which hooks and the action ran.
#[derive(Default)]
pub struct Hooked {
    trail: Vec<&'static str>,
}

impl Hooked {
    fn load(&mut self, ctx: &mut ActionContext<'_>) -> Result<(), DispatchError> {
        self.trail.push("load");
        if ctx.param("id") == Some("0") {
            return Err(ctx.forward_404("No record 0"));
        }
        Ok(())
    }

    fn audit(&mut self, _ctx: &mut ActionContext<'_>) -> Result<(), DispatchError> {
        self.trail.push("audit");
        Ok(())
    }

    fn stamp(&mut self, ctx: &mut ActionContext<'_>) -> Result<(), DispatchError> {
        self.trail.push("stamp");
        let value = HeaderValue::from_str(&self.trail.join(",")).map_err(DispatchError::handler)?;
        ctx.response_mut().headers_mut().insert("x-trail", value);
        Ok(())
    }

    fn show(&mut self, _ctx: &mut ActionContext<'_>) -> ActionResult {
        self.trail.push("show");
        Ok(self.trail.join(","))
    }

    fn plain(&mut self, _ctx: &mut ActionContext<'_>) -> ActionResult {
        self.trail.push("plain");
        Ok(self.trail.join(","))
    }
}

impl Controller for Hooked {
    const NAME: &'static str = "hooked";
    const ACTIONS: &'static [Action<Self>] = &[
        Action::new("show", Hooked::show),
        Action::new("plain", Hooked::plain),
    ];
    const BEFORE: &'static [Hook<Self>] = &[
        Hook::new("load", Hooked::load, &["show"]),
        Hook::new("audit", Hooked::audit, &["show", "plain"]),
    ];
    const AFTER: &'static [Hook<Self>] = &[Hook::new("stamp", Hooked::stamp, &["show"])];
}

#[derive(Default)]
pub struct Broken;

impl Broken {
    fn explode(&mut self, _ctx: &mut ActionContext<'_>) -> ActionResult {
        Err(DispatchError::handler("storage offline"))
    }
}

impl Controller for Broken {
    const NAME: &'static str = "broken";
    const ACTIONS: &'static [Action<Self>] = &[Action::new("explode", Broken::explode)];
}

#[derive(Default)]
pub struct Flashes;

impl Flashes {
    fn set(&mut self, ctx: &mut ActionContext<'_>) -> ActionResult {
        ctx.set_flash(FlashKind::Info, "Saved.");
        ctx.render(json!({}))
    }

    fn show(&mut self, ctx: &mut ActionContext<'_>) -> ActionResult {
        ctx.render(json!({}))
    }
}

impl Controller for Flashes {
    const NAME: &'static str = "flashes";
    const ACTIONS: &'static [Action<Self>] = &[
        Action::new("set", Flashes::set),
        Action::new("show", Flashes::show),
    ];
}

pub fn registry() -> ControllerRegistry {
    ControllerRegistry::new()
        .with::<Account>()
        .with::<Posts>()
        .with::<Admin>()
        .with::<Hooked>()
        .with::<Broken>()
        .with::<Flashes>()
}

pub fn config() -> AppConfig {
    parse_config(CONFIG).unwrap()
}

pub fn app() -> Application {
    app_with(config())
}

pub fn app_with(config: AppConfig) -> Application {
    Application::build(config, registry()).unwrap()
}

/// Dispatch one request directly, bypassing HTTP.
pub fn dispatch(app: &Application, request: Request, session: &mut Session) -> Response {
    app.dispatcher().dispatch(&request, session).unwrap()
}

pub fn get(app: &Application, path: &str, session: &mut Session) -> Response {
    dispatch(app, Request::new(Verb::Get, path), session)
}

/// Variables a `PlainRenderer` body was rendered with.
pub fn view_vars(body: &str) -> Value {
    let (_, json) = body.split_once('\n').unwrap();
    serde_json::from_str(json).unwrap()
}

/// Result of one request through the HTTP stack.
pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl Reply {
    /// Session id set by this reply, if any.
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|v| v.strip_prefix("SID="))
            .map(|v| v.split(';').next().unwrap_or_default().to_string())
    }
}

pub async fn send(router: &axum::Router, request: axum::http::Request<Body>) -> Reply {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    Reply {
        status,
        headers,
        body: String::from_utf8(bytes.to_vec()).unwrap(),
    }
}

pub fn http_get(path: &str, session: Option<&str>) -> axum::http::Request<Body> {
    let mut builder = axum::http::Request::builder().method("GET").uri(path);
    if let Some(id) = session {
        builder = builder.header(header::COOKIE, format!("SID={}", id));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn http_form(
    method: &str,
    path: &str,
    session: Option<&str>,
    fields: &[(&str, &str)],
) -> axum::http::Request<Body> {
    let body = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(fields)
        .finish();
    let mut builder = axum::http::Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(id) = session {
        builder = builder.header(header::COOKIE, format!("SID={}", id));
    }
    builder.body(Body::from(body)).unwrap()
}
