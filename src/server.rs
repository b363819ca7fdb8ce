//! binds the webhook endpoint and serves it until the process is told to stop
use std::{future::Future, net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal, task::JoinHandle};

use crate::{
    alertmanager_webhook_receiver as receiver, settings::Settings, telemetry_endpoint,
};

pub async fn run(settings: &Settings, state: Arc<receiver::ReceiverState>) -> Result<()> {
    let host = settings.bind_host();

    let listener = TcpListener::bind((host, settings.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", host, settings.port))?;

    let metrics_listener = match settings.metrics_port {
        Some(port) => Some(
            TcpListener::bind((host, port))
                .await
                .with_context(|| format!("failed to bind telemetry endpoint {}:{}", host, port))?,
        ),
        None => None,
    };

    serve(listener, metrics_listener, state, shutdown_signal()).await
}

/// serves on already bound listeners until `shutdown` resolves
pub async fn serve<F>(
    listener: TcpListener,
    metrics_listener: Option<TcpListener>,
    state: Arc<receiver::ReceiverState>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let logger = state.logger().clone();

    let telemetry = metrics_listener.map(|listener| {
        spawn_telemetry(telemetry_endpoint::run_telemetry_endpoint(
            listener,
            state.metrics().clone(),
        ))
    });

    let app = receiver::router(state);

    logger.system("Server started");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .context("alert webhook endpoint crashed")?;

    if let Some(telemetry) = telemetry {
        telemetry.abort();
    }

    logger.system("Server stopped");

    Ok(())
}

/// runs the telemetry endpoint in the background, a failure of it is logged but doesn't
/// stop the webhook endpoint
pub fn spawn_telemetry<F>(endpoint: F) -> JoinHandle<()>
where
    F: Future<Output = Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(err) = endpoint.await {
            tracing::error!("telemetry endpoint failed: {:#}", err);
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::warn!("failed to listen for ctrl-c: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(err) => {
                tracing::warn!("failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::debug!("received SIGINT, stopping"),
        _ = terminate => tracing::debug!("received SIGTERM, stopping"),
    }
}
