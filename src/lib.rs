pub mod builder;
pub mod client;
pub mod date_range;
pub mod debounce;
pub mod edit;
pub mod envelope;
pub mod error;
pub mod event;
pub mod handlers;
pub mod ical;
pub mod layout;
pub mod models;
pub mod notice;
pub mod openapi;
pub mod reconcile;
pub mod recurrence;
pub mod screen;
pub mod service;
pub mod settings;
pub mod validation;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, patch, post},
};
use chrono_tz::Tz;
use config::ConfigError;
use handlers::{
    change_status, create_class, delete_class, dismiss_notice, get_class, get_ical, get_schedule,
    healthz_live, healthz_ready, instances_in_range, list_instances, list_notices, preview_class,
    refresh_schedule, regenerate_instances, root, update_class, update_instance,
};
use tower_http::LatencyUnit;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::client::ClassApiClient;
use crate::ical::ICalExporter;
use crate::notice::NoticeCenter;
use crate::openapi::ApiDoc;
use crate::screen::ScheduleScreen;
use crate::service::ScheduleService;
use crate::settings::Settings;

#[derive(Clone)]
pub struct AppState {
    pub(crate) settings: Settings,
    pub(crate) tz: Tz,
    pub(crate) service: Arc<ScheduleService>,
    pub(crate) notices: Arc<NoticeCenter>,
    pub(crate) exporter: Arc<ICalExporter>,
}

impl AppState {
    pub fn new(settings: Settings) -> Result<Self, ConfigError> {
        let tz = settings.tz()?;
        let notices = Arc::new(NoticeCenter::new(settings.notice_ttl()));
        let service = ScheduleService::new(
            ClassApiClient::new(settings.api_url()?),
            notices.clone(),
            settings.stale_after(),
            settings.classes_page_limit,
        );

        Ok(Self {
            exporter: Arc::new(ICalExporter::new(settings.calendar_name.clone(), tz)),
            settings,
            tz,
            service: Arc::new(service),
            notices,
        })
    }

    /// A headless schedule screen sharing this state's service and cache.
    pub fn screen(&self) -> ScheduleScreen {
        ScheduleScreen::new(
            self.service.clone(),
            self.tz,
            self.settings.search_debounce(),
        )
    }
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;

    let env_filter = if settings.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .without_time()
        .init();

    let state = AppState::new(settings)?;
    let app = build_router(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], state.settings.port));
    info!(
        upstream = %state.settings.api_base_url,
        "Starting Class Schedule API on {addr}"
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        );

    let mut router = Router::new()
        .route("/", get(root))
        .route("/healthz/live", get(healthz_live))
        .route("/healthz/ready", get(healthz_ready))
        .route("/schedule", get(get_schedule))
        .route("/schedule.ical", get(get_ical))
        .route("/schedule/refresh", post(refresh_schedule))
        .route("/classes", post(create_class))
        .route("/classes/preview", post(preview_class))
        .route(
            "/classes/{id}",
            get(get_class).put(update_class).delete(delete_class),
        )
        .route("/classes/{id}/regenerate", post(regenerate_instances))
        .route("/classes/{id}/instances", get(list_instances))
        .route("/instances", get(instances_in_range))
        .route("/instances/{id}", patch(update_instance))
        .route("/events/status", patch(change_status))
        .route("/notices", get(list_notices))
        .route("/notices/{id}", delete(dismiss_notice))
        .with_state(state.clone());

    if state.settings.enable_swagger {
        let openapi = ApiDoc::openapi();
        let swagger = SwaggerUi::new("/docs").url("/openapi.json", openapi);
        router = router.merge(swagger);
    }

    router.layer(CorsLayer::permissive()).layer(trace_layer)
}
