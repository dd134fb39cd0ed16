use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use domain::services::{
    GroupService, IdentityResolver, IdentityVerifier, MessageFormatter, NotificationDispatcher,
    Notifier, PushGateway, ReminderSweeper, TradeService, UserService,
};
use domain::store::TradeStore;

use crate::config::Config;
use crate::middleware::{
    metrics_handler, metrics_middleware, request_id, security_headers_middleware,
};
use crate::routes::{groups, health, trades, users};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn TradeStore>,
    pub identity: Arc<IdentityResolver>,
    pub users: UserService,
    pub groups: GroupService,
    pub trades: TradeService,
    pub notifier: Notifier,
    pub dispatcher: NotificationDispatcher,
    pub messages: MessageFormatter,
}

impl AppState {
    /// Wire the services over one store, one push gateway and one identity
    /// verifier.
    pub fn new(
        config: Config,
        store: Arc<dyn TradeStore>,
        gateway: Arc<dyn PushGateway>,
        verifier: Arc<dyn IdentityVerifier>,
    ) -> Self {
        let identity = IdentityResolver::from_environment(
            &config.auth.environment,
            config.auth.dev_auth_token(),
            verifier,
        );
        let messages = MessageFormatter::new(config.notifications.display_utc_offset_hours)
            .unwrap_or_default();
        let notifier = Notifier::new(gateway);
        let dispatcher = NotificationDispatcher::new();

        Self {
            config: Arc::new(config),
            users: UserService::new(store.clone()),
            groups: GroupService::new(store.clone()),
            trades: TradeService::new(
                store.clone(),
                notifier.clone(),
                dispatcher.clone(),
                messages,
            ),
            identity: Arc::new(identity),
            store,
            notifier,
            dispatcher,
            messages,
        }
    }

    /// Sweeper sharing this state's store, gateway and formatting.
    pub fn reminder_sweeper(&self) -> ReminderSweeper {
        ReminderSweeper::new(self.store.clone(), self.notifier.clone(), self.messages)
    }
}

pub fn create_app(state: AppState) -> Router {
    let request_timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Authenticated routes resolve the caller through the extractors.
    let api_routes = Router::new()
        .route("/api/users", post(users::register_user))
        .route("/api/me", post(users::me).delete(users::withdraw))
        .route(
            "/api/groups",
            post(groups::create_group).get(groups::list_groups),
        )
        .route("/api/groups/join", post(groups::join_group))
        .route(
            "/api/groups/:group_id",
            put(groups::rename_group).delete(groups::dissolve_group),
        )
        .route(
            "/api/groups/:group_id/trades",
            post(trades::create_trade).get(trades::list_trades),
        )
        .route(
            "/api/groups/:group_id/trades/:trade_id",
            get(trades::get_trade).delete(trades::delete_trade),
        )
        .route(
            "/api/groups/:group_id/trades/:trade_id/accept",
            put(trades::accept_trade),
        )
        .route(
            "/api/groups/:group_id/trades/:trade_id/details",
            put(trades::update_details),
        )
        .route("/api/trades/:trade_id/paid", put(trades::mark_paid));

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/live", get(health::live))
        .route("/api/users/:external_id", get(users::get_user))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id))
        .layer(cors)
        .with_state(state)
}
