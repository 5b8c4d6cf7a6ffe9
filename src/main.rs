//! Mandate gateway HTTP server.
//!
//! Configuration comes from `MANDATE_GATEWAY__*` environment variables (see
//! `mandate_gateway::config`). Without a `database` section documents are
//! kept in memory.

use std::sync::Arc;

use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use mandate_gateway::adapters::auth::OidcSessionValidator;
use mandate_gateway::adapters::cashfree::CashfreeGatewayAdapter;
use mandate_gateway::adapters::datastore::{InMemoryDatastore, PostgresDatastore};
use mandate_gateway::adapters::http::{api_router, MandateAppState, OnboardingAppState};
use mandate_gateway::config::AppConfig;
use mandate_gateway::ports::{Datastore, PaymentGateway, SessionValidator};

#[tokio::main]
async fn main() {
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_tracing(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server failed: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    if config.is_production() {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().compact().with_env_filter(filter).init();
    }
}

async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;
    let addr = config.server.socket_addr()?;

    let datastore: Arc<dyn Datastore> = match &config.database {
        Some(db) => {
            let pool = db.connect().await?;
            let store = PostgresDatastore::new(pool);
            if db.ensure_schema {
                store.ensure_schema().await?;
            }
            tracing::info!("Using PostgreSQL datastore");
            Arc::new(store)
        }
        None => {
            tracing::warn!("No database configured; documents are kept in memory");
            Arc::new(InMemoryDatastore::new())
        }
    };

    let gateway: Arc<dyn PaymentGateway> =
        Arc::new(CashfreeGatewayAdapter::new(config.gateway.cashfree_config())?);
    let verifier = Arc::new(config.gateway.signature_verifier());
    if !verifier.is_configured() {
        tracing::error!("No webhook signing secret; every webhook will be rejected");
    }
    let validator: Arc<dyn SessionValidator> =
        Arc::new(OidcSessionValidator::new(config.auth.oidc_config())?);

    let namespace = config.gateway.audit_namespace.clone();
    let app = api_router(
        MandateAppState {
            datastore: datastore.clone(),
            gateway: gateway.clone(),
            verifier,
            audit_namespace: namespace.clone(),
        },
        OnboardingAppState {
            datastore,
            gateway,
            audit_namespace: namespace,
        },
        validator,
    )
    .layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(config.server.request_timeout()))
            .layer(PropagateRequestIdLayer::x_request_id()),
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        environment = ?config.server.environment,
        gateway_environment = ?config.gateway.environment,
        "Mandate gateway listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shut down gracefully");
    Ok(())
}

/// Waits for Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
