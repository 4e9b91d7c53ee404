//! Bookshelf
//!
//! One binary, two roles:
//! - web tier: JSON books API; every create and update queues the book
//! - worker: enriches queued books from the Books API and serves its
//!   processed count
//!
//! `BOOKSHELF_ROLE=all` runs both in one process for local development.

mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{info, warn};

use api::AppState;
use pubsub::{check_broker, BrokerBackend, Producer};
use storage::DataBackend;
use telemetry::init_tracing_from_env;
use worker::{BooksApiClient, ImageMirror, Listener, Worker};

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider BEFORE any TLS operations
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install rustls crypto provider"))?;

    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("Starting bookshelf v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;

    info!(
        role = ?config.role,
        broker = ?config.pubsub.backend,
        data_backend = ?config.storage.backend,
        topic = %config.pubsub.topic,
        subscription = %config.pubsub.subscription,
        "Loaded config"
    );

    // Backends are chosen once, here.
    let offsets = storage::open_offset_store(&config.storage)
        .await
        .context("Failed to open offset store")?;
    if config.pubsub.backend == BrokerBackend::Redpanda
        && config.storage.backend == DataBackend::Memory
    {
        warn!("Subscription offsets are kept in memory and will not survive a restart");
    }
    let broker = pubsub::connect(&config.pubsub, offsets);
    check_broker(broker.as_ref()).await;

    let producer = Producer::new(broker.clone(), config.pubsub.topic.clone());
    let store = storage::open_store(&config.storage, Arc::new(producer))
        .await
        .context("Failed to open book store")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown_tx.send_replace(true);
    });

    let mut tasks: JoinSet<Result<()>> = JoinSet::new();

    if config.role.runs_frontend() {
        let app = api::router(AppState::new(store.clone()));
        let listener = bind(&config.host, config.port).await?;
        info!("Web tier listening on http://{}", listener.local_addr()?);

        let shutdown = shutdown_rx.clone();
        tasks.spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(wait_for_shutdown(shutdown))
                .await
                .context("Web server error")
        });
    }

    if config.role.runs_worker() {
        let lookup = BooksApiClient::new(config.books_api_url.clone())
            .context("Failed to create Books API client")?;
        let worker = match storage::open_blob_store(&config.storage.blobs) {
            Some(blobs) => Worker::new(
                store.clone(),
                Arc::new(lookup),
                Arc::new(ImageMirror::new(blobs)),
            ),
            None => {
                warn!("No cover bucket configured, covers will not be mirrored");
                Worker::without_covers(store.clone(), Arc::new(lookup))
            }
        };
        let worker = Arc::new(worker);

        // A failed subscribe is fatal: exit and let the supervisor restart us.
        let mut subscriber = Listener::new(
            broker.clone(),
            config.pubsub.topic.clone(),
            config.pubsub.subscription.clone(),
            worker.clone(),
        );
        let cancel = subscriber
            .subscribe()
            .await
            .context("Failed to subscribe to work queue")?;

        let shutdown = shutdown_rx.clone();
        tasks.spawn(async move {
            wait_for_shutdown(shutdown).await;
            cancel.cancel();
            Ok(())
        });
        tasks.spawn(async move {
            subscriber
                .run()
                .await
                .context("Worker subscription failed")
        });

        let app = worker::router(worker);
        let listener = bind(&config.host, config.worker_http_port()).await?;
        info!("Worker listening on http://{}", listener.local_addr()?);

        let shutdown = shutdown_rx.clone();
        tasks.spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(wait_for_shutdown(shutdown))
                .await
                .context("Worker server error")
        });
    }

    // The first failure ends the process; dropping the set aborts the rest.
    while let Some(joined) = tasks.join_next().await {
        joined.context("Task panicked")??;
    }

    info!("Shutdown complete");
    Ok(())
}

async fn bind(host: &str, port: u16) -> Result<TcpListener> {
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .context("Invalid server address")?;

    TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))
}

async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    // A dropped sender also means shutdown.
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
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
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
