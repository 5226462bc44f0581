use crate::cli::ServeArgs;
use crate::infra::{AppState, LogMailer};
use crate::routes::with_campaign_routes;
use crate::seed::{seed_campaigns, SeedArgs};
use axum::{Extension, Router};
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use crowdfund::campaigns::{CampaignService, InMemoryCampaignRepository, QueuedNotifier};
use crowdfund::config::AppConfig;
use crowdfund::error::AppError;
use crowdfund::telemetry;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = Arc::new(InMemoryCampaignRepository::default());
    let (notifier, mail_worker) = QueuedNotifier::spawn(LogMailer);
    let campaign_service = Arc::new(CampaignService::new(
        repository,
        Arc::new(notifier),
        config.campaigns.clone(),
    ));

    if args.seed {
        let summary =
            seed_campaigns(campaign_service.as_ref(), &SeedArgs::default(), Utc::now())?;
        info!(
            users = summary.users,
            collects = summary.collects,
            payments = summary.payments,
            "sample data loaded"
        );
    }

    let app = with_campaign_routes(campaign_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "crowdfund service ready");

    serve_until(listener, app, readiness_flag, mail_worker, shutdown_signal()).await
}

/// Serve until `shutdown` resolves, then wait for the notification worker to flush
/// the emails still queued.
pub(crate) async fn serve_until<F>(
    listener: TcpListener,
    app: Router,
    readiness: Arc<AtomicBool>,
    mail_worker: JoinHandle<()>,
    shutdown: F,
) -> Result<(), AppError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let draining = readiness.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            draining.store(false, Ordering::Release);
            info!("shutdown requested, draining connections");
        })
        .await?;

    // The router owned the last service handle, so the queue closes once it drains.
    if let Err(err) = mail_worker.await {
        warn!(error = %err, "notification worker stopped abnormally");
    }
    info!("crowdfund service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "could not listen for the shutdown signal");
        std::future::pending::<()>().await;
    }
}
