use anyhow::Context;
use axum::{
    Json, Router,
    body::Body,
    http::{Request, header},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use boombox::prelude::*;
use serde_json::Value;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

const DEFAULT_ERRORS: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/config/errors.json");

async fn raise(Json(payload): Json<Value>) -> Result<Json<Value>, HttpException> {
    let key = payload["error"].as_str().unwrap_or("Something went wrong");
    Err(HttpException::internal(key))
}

async fn echo(Json(payload): Json<Value>) -> Json<Value> {
    Json(payload)
}

async fn lookup(boombox: BoomboxLookup, Json(payload): Json<Value>) -> Json<Option<CatalogEntry>> {
    let error = HttpException::internal(payload["error"].as_str().unwrap_or_default());
    Json(boombox.find(Some(&error)).cloned())
}

/// Treats any `Authorization` header as user 1.
async fn authenticate(mut request: Request<Body>, next: Next) -> Response {
    if request.headers().contains_key(header::AUTHORIZATION) {
        request
            .extensions_mut()
            .insert(Credentials::new(1).with_claim("name", "John Doe"));
    }
    next.run(request).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => tracing::error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,boombox=debug")),
        )
        .init();

    // BOOMBOX_CONFIG / BOOMBOX_ERRORS win; otherwise use the bundled catalog.
    let mut options = BoomboxOptions::from_env().context("loading boombox options")?;
    if options.errors.is_empty() {
        options.errors = ErrorCatalog::from_json_str(
            &std::fs::read_to_string(DEFAULT_ERRORS).context("reading bundled error catalog")?,
        )?;
    }
    let boombox = Boombox::new(options);

    let app = Router::new()
        .route("/error", post(raise))
        .route("/normal", post(echo))
        .route("/lookup", post(lookup))
        .route(
            "/raw",
            get(|| async { Err::<(), _>(HttpException::internal("ERROR_KEY_1")) })
                .layer(route::exempt()),
        )
        .layer(boombox.layer())
        .layer(middleware::from_fn(authenticate))
        .layer(TraceLayer::new_for_http());

    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!("Server running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
