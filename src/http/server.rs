//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the axum Router with a single fallback into the dispatcher
//! - Wire up middleware (tracing, timeout, request ID)
//! - Turn an axum request into a [`Request`], open its session from the
//!   session cookie, dispatch, commit the session and set the cookie
//! - Map handler failures to a generic 500
//!
//! # Design Decisions
//! - Dispatch runs on the blocking pool: actions may block on storage
//! - The session is committed even when the action fails
//! - The cookie is only sent when the session id is new or rotated
//! - A new session nothing was written to is neither stored nor sent
//! - The body limit is enforced while reading the body, answering 413

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::header::{self, HeaderMap, HeaderValue};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response as AxumResponse};
use axum::Router;
use cookie::{Cookie, SameSite};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use url::form_urlencoded;

use crate::config::{AppConfig, SessionConfig};
use crate::dispatch::Dispatcher;
use crate::http::request::{path_info, verb_from_method, Request};
use crate::session::SessionStore;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub sessions: Arc<dyn SessionStore>,
    pub session_config: SessionConfig,
    pub base_url: String,
    pub max_body_size: usize,
}

/// HTTP front end for a [`Dispatcher`].
pub struct HttpServer {
    router: Router,
    config: AppConfig,
}

impl HttpServer {
    pub fn new(config: AppConfig, dispatcher: Arc<Dispatcher>, sessions: Arc<dyn SessionStore>) -> Self {
        let state = AppState {
            dispatcher,
            sessions,
            session_config: config.session.clone(),
            base_url: config.base_url.clone(),
            max_body_size: config.security.max_body_size,
        };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, state: AppState) -> Router {
        Router::new()
            .fallback(dispatch_handler)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TimeoutLayer::new(Duration::from_secs(
                        config.timeouts.request_secs,
                    ))),
            )
    }

    /// The fully layered router, for serving or for driving in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn dispatch_handler(State(state): State<AppState>, request: axum::extract::Request) -> AxumResponse {
    let (parts, body) = request.into_parts();

    let bytes = match axum::body::to_bytes(body, state.max_body_size).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read request body");
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    let form: HashMap<String, String> = if is_urlencoded(&parts.headers) {
        form_urlencoded::parse(&bytes).into_owned().collect()
    } else {
        HashMap::new()
    };
    let query: HashMap<String, String> = parts
        .uri
        .query()
        .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default();

    let verb = verb_from_method(&parts.method, &form);
    let host = parts
        .headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost")
        .to_string();
    let secure = parts.uri.scheme_str() == Some("https")
        || parts
            .headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|p| p.eq_ignore_ascii_case("https"));

    let request = Request::new(verb, path_info(parts.uri.path(), &state.base_url))
        .with_host(host)
        .with_secure(secure)
        .with_base_url(state.base_url.clone())
        .with_query(query)
        .with_form(form);

    let presented = session_cookie(&parts.headers, &state.session_config.cookie_name);
    let dispatcher = state.dispatcher.clone();
    let sessions = state.sessions.clone();
    let opened = presented.clone();

    let joined = tokio::task::spawn_blocking(move || {
        let mut session = sessions.open(opened.as_deref());
        let result = dispatcher.dispatch(&request, &mut session);
        let id = sessions.commit(session);
        (result, id)
    })
    .await;

    let (result, session_id) = match joined {
        Ok(joined) => joined,
        Err(e) => {
            tracing::error!(error = %e, "Dispatch task failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mut response = match result {
        Ok(response) => response.into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Request failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    };

    if let Some(id) = session_id.filter(|id| presented.as_deref() != Some(id.as_str())) {
        let cookie = session_set_cookie(&state.session_config, id);
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::error!(error = %e, "Invalid session cookie"),
        }
    }

    response
}

fn is_urlencoded(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
}

/// Session id presented by the client, if any.
fn session_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|c| c.name() == name)
        .map(|c| c.value().to_string())
}

fn session_set_cookie(config: &SessionConfig, id: String) -> String {
    Cookie::build((config.cookie_name.clone(), id))
        .path(config.cookie_path.clone())
        .http_only(config.http_only)
        .secure(config.secure)
        .same_site(SameSite::Lax)
        .build()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_lookup() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark; SID=abc123"));
        headers.append(header::COOKIE, HeaderValue::from_static("other=1"));
        assert_eq!(session_cookie(&headers, "SID").as_deref(), Some("abc123"));
        assert_eq!(session_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_set_cookie_attributes() {
        let config = SessionConfig::default();
        let cookie = session_set_cookie(&config, "xyz".into());
        assert!(cookie.starts_with(&format!("{}=xyz", config.cookie_name)));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(!cookie.contains("Secure"));
    }
}
