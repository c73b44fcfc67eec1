//! noticeflow server entry point.

use std::sync::Arc;
use std::time::Duration;

use api::config::Config;
use api::routes::notices::AppState;
use campaign::{CampaignScheduler, default_campaign};
use channels::{ResendEmailChannel, WebhookOperatorAlert};
use lead_store::PostgresLeadStore;
use saga::{HtmlNoticeRenderer, LobCarrierDispatcher, SagaCoordinator, SquarePaymentGateway};
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Connect to the lead store and run migrations
    let database_url = config
        .database_url
        .as_deref()
        .expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .expect("failed to connect to the database");
    let leads = PostgresLeadStore::new(pool);
    leads.run_migrations().await.expect("migrations failed");

    // 4. Wire the production services
    let payment = SquarePaymentGateway::new(
        config
            .square_access_token
            .as_deref()
            .expect("SQUARE_ACCESS_TOKEN must be set"),
        config.production,
    );
    let carrier = LobCarrierDispatcher::new(
        config.lob_api_key.as_deref().expect("LOB_API_KEY must be set"),
    );
    let email = ResendEmailChannel::new(
        config
            .resend_api_key
            .as_deref()
            .expect("RESEND_API_KEY must be set"),
        config.email_from.clone(),
    );
    let alerts = WebhookOperatorAlert::new(
        config
            .alert_webhook_url
            .as_deref()
            .expect("ALERT_WEBHOOK_URL must be set"),
    );

    let saga = SagaCoordinator::new(
        payment,
        carrier,
        HtmlNoticeRenderer::new(),
        leads.clone(),
        email.clone(),
        alerts.clone(),
    );
    let state = Arc::new(AppState {
        saga,
        leads: leads.clone(),
        alerts,
    });

    // 5. Spawn the campaign scheduler
    let scheduler = CampaignScheduler::new(leads, email, default_campaign())
        .expect("invalid campaign step table");
    tokio::spawn(scheduler.run(Duration::from_secs(config.scheduler_period_secs)));

    // 6. Build and start the server
    let app = api::create_app(state, metrics_handle);
    let addr = config.addr();
    tracing::info!(%addr, production = config.production, "starting server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}
