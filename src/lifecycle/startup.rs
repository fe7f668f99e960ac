//! Startup orchestration.
//!
//! # Responsibilities
//! - Compile the route table from validated configuration
//! - Assemble the dispatcher (registry, renderer, CSRF, login target)
//! - Bind the listener, start the metrics exporter when enabled and the
//!   session sweeper
//!
//! # Design Decisions
//! - Fail fast: a malformed route is fatal, never a per-request error
//! - Routes naming unregistered controllers only warn; they answer 404
//! - Listeners start last (traffic only when ready)

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::AppConfig;
use crate::dispatch::{ControllerRegistry, Dispatcher};
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::observability::metrics;
use crate::routing::params::CONTROLLER_KEY;
use crate::routing::{BuildError, Router};
use crate::security::CsrfTokens;
use crate::session::{run_sweeper, MemorySessionStore, SessionStore};
use crate::view::{PlainRenderer, Renderer};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid route table: {0}")]
    Routes(#[from] BuildError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// A fully wired application, ready to serve.
pub struct Application {
    config: AppConfig,
    dispatcher: Arc<Dispatcher>,
    sessions: Arc<dyn SessionStore>,
}

impl Application {
    /// Build with the plain renderer and the in-memory session store.
    pub fn build(config: AppConfig, registry: ControllerRegistry) -> Result<Self, StartupError> {
        let sessions = MemorySessionStore::new()
            .with_max_idle(Duration::from_secs(config.session.max_idle_secs));
        Self::build_with(config, registry, Arc::new(PlainRenderer), Arc::new(sessions))
    }

    pub fn build_with(
        config: AppConfig,
        registry: ControllerRegistry,
        renderer: Arc<dyn Renderer>,
        sessions: Arc<dyn SessionStore>,
    ) -> Result<Self, StartupError> {
        let router = Router::from_definitions(config.route_definitions())?;
        metrics::record_route_table_size(router.table().len());
        warn_unregistered(&router, &registry, &config);

        let dispatcher = Dispatcher::new(Arc::new(router), Arc::new(registry))
            .with_renderer(renderer)
            .with_csrf(CsrfTokens::new(&config.csrf))
            .with_login(config.login.clone())
            .with_debug(config.debug);

        tracing::info!(
            routes = dispatcher.router().table().len(),
            controllers = dispatcher.registry().len(),
            debug = config.debug,
            "Application built"
        );

        Ok(Self {
            config,
            dispatcher: Arc::new(dispatcher),
            sessions,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        self.dispatcher.clone()
    }

    pub fn sessions(&self) -> Arc<dyn SessionStore> {
        self.sessions.clone()
    }

    pub fn server(&self) -> HttpServer {
        HttpServer::new(
            self.config.clone(),
            self.dispatcher.clone(),
            self.sessions.clone(),
        )
    }

    /// Bind, serve, and return once `shutdown` is triggered.
    pub async fn run(self, shutdown: &Shutdown) -> Result<(), StartupError> {
        let address = self.config.listener.bind_address.clone();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| StartupError::Bind {
                address: address.clone(),
                source,
            })?;

        let observability = &self.config.observability;
        if observability.metrics_enabled {
            match observability.metrics_address.parse() {
                Ok(addr) => metrics::init_metrics(addr),
                Err(_) => tracing::error!(
                    metrics_address = %observability.metrics_address,
                    "Failed to parse metrics address"
                ),
            }
        }

        tokio::spawn(run_sweeper(
            self.sessions.clone(),
            Duration::from_secs(self.config.session.sweep_interval_secs),
            shutdown.subscribe(),
        ));

        self.server()
            .run(listener, shutdown.subscribe())
            .await
            .map_err(StartupError::Serve)
    }
}

fn warn_unregistered(router: &Router, registry: &ControllerRegistry, config: &AppConfig) {
    let named: BTreeSet<&str> = router
        .table()
        .iter()
        .filter_map(|route| route.metadata().get(CONTROLLER_KEY))
        .map(String::as_str)
        .collect();
    for controller in named.into_iter().filter(|c| !registry.contains(c)) {
        tracing::warn!(controller, "Routes name a controller that is not registered");
    }

    if let Some(login) = &config.login {
        if !registry.contains(&login.controller) {
            tracing::warn!(controller = %login.controller, "Login controller is not registered");
        }
    }
}
