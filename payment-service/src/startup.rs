//! Application startup and lifecycle management.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::middleware::from_fn;
use axum::{
    routing::{get, post},
    Router,
};
use mongodb::{options::ClientOptions, Client};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use service_core::middleware::{metrics::metrics_middleware, tracing::request_id_middleware};
use service_core::observability::{extract_request_id, extract_traceparent};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::handlers;
use crate::services::{
    build_client, LineItemAggregator, MercadoPagoClient, OrderClient, OrderLineClient,
    PaymentRepository, PaymentService, ProductClient, ServiceIdentity,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub payments: Arc<PaymentService>,
}

/// Assemble the HTTP router around an already wired [`PaymentService`].
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/ping", get(handlers::ping))
        .route("/metrics", get(handlers::metrics))
        .route(
            "/payments",
            post(handlers::payments::create_payment).get(handlers::payments::list_payments),
        )
        .route(
            "/webhook/payment/check",
            post(handlers::payments::check_payment),
        )
        .layer(from_fn(metrics_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id =
                    extract_request_id(request.headers()).unwrap_or_else(|| "-".to_string());
                let traceparent =
                    extract_traceparent(request.headers()).unwrap_or_else(|| "-".to_string());

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    traceparent = %traceparent,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Connect to MongoDB, wire the peer and provider clients, and bind the listener.
    pub async fn build(config: Config) -> Result<Self, AppError> {
        let mut client_options = ClientOptions::parse(config.database.url.expose_secret())
            .await
            .map_err(|e| {
                tracing::error!("Failed to parse MongoDB connection string: {}", e);
                AppError::from(e)
            })?;
        client_options.app_name = Some(config.service_name.clone());

        let client = Client::with_options(client_options).map_err(|e| {
            tracing::error!("Failed to create MongoDB client: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(&config.database.db_name);

        let repository = PaymentRepository::new(&db);
        repository.init_indexes().await.map_err(|e| {
            tracing::error!("Failed to initialize database indexes: {}", e);
            AppError::DatabaseError(e)
        })?;

        let http = build_client(&config.http)?;
        let identity = ServiceIdentity::from(&config.peers);

        let provider = MercadoPagoClient::new(http.clone(), config.provider.clone());
        if provider.is_configured() {
            tracing::info!("QR code provider client initialized");
        } else {
            tracing::warn!("QR code provider credentials not configured - payment creation will fail");
        }

        let line_items = LineItemAggregator::new(
            Arc::new(OrderLineClient::new(
                http.clone(),
                &config.peers.order_line_url,
                identity.clone(),
            )),
            Arc::new(ProductClient::new(
                http.clone(),
                &config.peers.product_url,
                identity.clone(),
            )),
        );
        let orders = OrderClient::new(http, &config.peers.order_url, identity);

        let payments = PaymentService::new(
            Arc::new(repository),
            line_items,
            Arc::new(provider),
            Arc::new(orders),
        );

        let router = build_router(AppState {
            payments: Arc::new(payments),
        });

        // Port 0 binds a random port (tests).
        let addr = format!("{}:{}", config.server.host, config.server.port)
            .parse::<SocketAddr>()
            .map_err(|e| AppError::ConfigError(e.into()))?;
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Payment service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until SIGINT or SIGTERM.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Service shutdown complete");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
