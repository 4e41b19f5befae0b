use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_portal_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Duration;
use nhif_enroll::config::AppConfig;
use nhif_enroll::error::AppError;
use nhif_enroll::portal::{
    AuthService, DirectoryService, EnrollmentService, ExportService, MemoryAccounts,
    MemoryReferences, MemorySubmissions, PortalServices,
};
use nhif_enroll::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

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

    let accounts = Arc::new(MemoryAccounts::default());
    let submissions = Arc::new(MemorySubmissions::default());
    let references = Arc::new(MemoryReferences::default());

    let auth = Arc::new(AuthService::new(
        accounts.clone(),
        Duration::hours(config.auth.token_ttl_hours),
    ));
    if let Some(seed) = &config.auth.admin_seed {
        if let Err(err) = auth.seed_admin(&seed.email, &seed.password) {
            warn!(error = %err, "administrator seed failed");
        }
    }

    let services = PortalServices {
        auth,
        enrollment: Arc::new(EnrollmentService::new(accounts.clone(), submissions.clone())),
        directory: Arc::new(DirectoryService::new(references, submissions.clone())),
        export: Arc::new(ExportService::new(submissions)),
    };

    let app = with_portal_routes(services)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "enrollment portal ready");

    axum::serve(listener, app).await?;
    Ok(())
}
