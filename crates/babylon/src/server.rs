use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tracing::{error, info};

use crate::background::BackgroundTasks;
use crate::config::{Config, SecurityConfig};
use crate::dispatch::Dispatcher;
use crate::handlers;
use crate::notify::Notifier;
use crate::registry::{
    BackendRegistry, CapabilityKind, ReporterRegistry, preconfigure_backend, preconfigure_reporter,
};
use crate::session::SessionStore;
use crate::transport::Transport;

// ============================================================================
// Hub Services
// ============================================================================

/// Registries, session store and the components wired on top of them.
#[derive(Clone)]
pub struct HubServices {
    pub sessions: SessionStore,
    pub backends: Arc<BackendRegistry>,
    pub reporters: Arc<ReporterRegistry>,
    pub dispatcher: Dispatcher,
    pub transport: Arc<dyn Transport>,
}

impl HubServices {
    /// Wire empty registries and an empty session store around `transport`.
    ///
    /// Fan-out pushes are spawned on `tasks`.
    pub fn new(transport: Arc<dyn Transport>, tasks: BackgroundTasks) -> Self {
        let backends = Arc::new(BackendRegistry::new());
        let reporters = Arc::new(ReporterRegistry::new());
        let notifier = Notifier::new(
            backends.clone(),
            reporters.clone(),
            transport.clone(),
            tasks,
        );
        let sessions = SessionStore::new(Arc::new(notifier));
        let dispatcher = Dispatcher::new(sessions.clone(), backends.clone(), transport.clone());

        Self {
            sessions,
            backends,
            reporters,
            dispatcher,
            transport,
        }
    }
}

// ============================================================================
// Application State
// ============================================================================

/// Which kinds of peers may register and deregister themselves over HTTP.
#[derive(Debug, Clone, Copy)]
pub struct SelfManagement {
    pub actor: bool,
    pub driver: bool,
    pub reporter: bool,
}

impl SelfManagement {
    pub fn all() -> Self {
        Self {
            actor: true,
            driver: true,
            reporter: true,
        }
    }

    fn allows(&self, kind: CapabilityKind) -> bool {
        match kind {
            CapabilityKind::Actor => self.actor,
            CapabilityKind::Driver => self.driver,
        }
    }
}

impl From<&SecurityConfig> for SelfManagement {
    fn from(security: &SecurityConfig) -> Self {
        Self {
            actor: security.actor.self_management,
            driver: security.driver.self_management,
            reporter: security.reporter.self_management,
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub services: HubServices,
    pub self_management: SelfManagement,
    pub max_connections: usize,
}

// ============================================================================
// Server Setup
// ============================================================================

pub fn build_app(state: AppState, request_timeout_seconds: u64) -> Router {
    let max_connections = state.max_connections;
    let self_management = state.self_management;

    let mut hub_routes = Router::new()
        .route("/session", get(handlers::create_session))
        .route("/session/", get(handlers::create_session))
        .route(
            "/session/{id}",
            get(handlers::get_session)
                .post(handlers::update_session)
                .delete(handlers::delete_session),
        )
        .route("/actor/execute", post(handlers::execute_actor))
        .route("/driver/execute", post(handlers::execute_driver));

    for kind in CapabilityKind::ALL {
        if !self_management.allows(kind) {
            info!(kind = %kind, "Self-management disabled");
            continue;
        }
        let route = match kind {
            CapabilityKind::Actor => {
                post(handlers::register_actor).delete(handlers::deregister_actor)
            }
            CapabilityKind::Driver => {
                post(handlers::register_driver).delete(handlers::deregister_driver)
            }
        };
        hub_routes = hub_routes.route(&format!("/{kind}/"), route);
    }

    if self_management.reporter {
        hub_routes = hub_routes.route(
            "/reporter/",
            post(handlers::register_reporter).delete(handlers::deregister_reporter),
        );
    } else {
        info!(kind = "reporter", "Self-management disabled");
    }

    let hub_routes = hub_routes
        .with_state(state.clone())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(request_timeout_seconds),
        ))
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024)) // 2 MB
        .layer(ConcurrencyLimitLayer::new(max_connections));

    Router::new()
        .route("/livez", get(handlers::livez))
        .route("/readyz", get(handlers::readyz))
        .route("/version", get(handlers::version))
        .with_state(state)
        .merge(hub_routes)
}

// ============================================================================
// Preconfigured Peers
// ============================================================================

/// Handshake with every backend and reporter listed in `config`.
///
/// Each handshake runs as its own background task. Failures are logged and
/// the peer is simply not registered.
pub fn spawn_preconfigured_peers(services: &HubServices, config: &Config, tasks: &BackgroundTasks) {
    let server_callback = config.server.server_callback();

    let backends = CapabilityKind::ALL.into_iter().flat_map(|kind| {
        let peers = match kind {
            CapabilityKind::Actor => &config.actors,
            CapabilityKind::Driver => &config.drivers,
        };
        peers.iter().map(move |(name, peer)| (kind, name, peer))
    });

    for (kind, name, peer) in backends {
        let registry = services.backends.clone();
        let transport = services.transport.clone();
        let name = name.clone();
        let peer = peer.clone();
        let server_callback = server_callback.clone();
        tasks.spawn(async move {
            if let Err(e) = preconfigure_backend(
                &registry,
                transport.as_ref(),
                kind,
                &name,
                &peer,
                &server_callback,
            )
            .await
            {
                error!(kind = %kind, backend = %name, error = %e, "Preconfigured backend not registered");
            }
        });
    }

    for (name, peer) in &config.reporters {
        let registry = services.reporters.clone();
        let transport = services.transport.clone();
        let name = name.clone();
        let peer = peer.clone();
        let server_callback = server_callback.clone();
        tasks.spawn(async move {
            if let Err(e) = preconfigure_reporter(
                &registry,
                transport.as_ref(),
                &name,
                &peer,
                &server_callback,
            )
            .await
            {
                error!(reporter = %name, error = %e, "Preconfigured reporter not registered");
            }
        });
    }
}
