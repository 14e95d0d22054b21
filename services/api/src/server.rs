use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_membership_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use member_intake::config::AppConfig;
use member_intake::error::AppError;
use member_intake::telemetry;
use member_intake::workflows::membership::{
    AdminRoster, HttpKnowledgeBase, IntakeCoordinator, JsonFileStore, LifecycleController,
    LogNotifier, SurveyDefinition,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(JsonFileStore::open(&config.intake.storage_path)?);
    let knowledge_base = Arc::new(HttpKnowledgeBase::from_config(config.sync.as_ref()));
    let notifier = Arc::new(LogNotifier);
    let controller = Arc::new(LifecycleController::new(
        store,
        knowledge_base,
        notifier,
        AdminRoster::new(config.intake.admin_ids.clone()),
        SurveyDefinition::standard(),
        config.intake.invite_link.clone(),
    ));
    let coordinator = Arc::new(IntakeCoordinator::new(controller));

    let app = with_membership_routes(coordinator)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "membership intake service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
