use std::sync::Arc;

use ringkv::bootstrap::start_bootstrap;
use ringkv::bootstrap::BootstrapContext;
use ringkv::network::serve;
use ringkv::network::MessagingService;
use ringkv::network::TcpTransport;
use ringkv::ring::Endpoint;
use ringkv::ClusterConfig;
use ringkv::NodeConfig;
use ringkv::Result;
use ringkv::StorageError;
use tokio::net::TcpListener;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tracing::error;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    let settings = NodeConfig::new()?.validate()?;
    let _log_guard = init_logging(&settings.cluster)?;

    let local = Endpoint::new(settings.cluster.host.clone(), settings.cluster.storage_port);
    let transport = Arc::new(TcpTransport::new(local.clone(), settings.network.clone()));
    let max_frame_bytes = settings.network.max_frame_bytes;
    let join_ring = settings.cluster.initial_token.is_some() || std::env::var("RINGKV_JOIN").is_ok();

    let ctx = BootstrapContext::new(settings, transport);
    let messaging = Arc::new(MessagingService::new());
    BootstrapContext::register_verb_handlers(&ctx, &messaging);

    let listener = TcpListener::bind((local.host.as_str(), local.port))
        .await
        .map_err(|e| {
            ringkv::Error::System(ringkv::SystemError::NodeStartFailed(format!(
                "bind {local}: {e}"
            )))
        })?;
    info!(%local, "storage messaging service listening");
    tokio::spawn(async move {
        if let Err(e) = serve(messaging, listener, max_frame_bytes).await {
            error!("messaging service stopped: {e}");
        }
    });

    if join_ring {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            if let Err(e) = start_bootstrap(ctx).await {
                error!("bootstrap failed: {e}");
            }
        });
    }

    info!("node started");
    let reason = shutdown_signal().await;
    info!(%reason, "shutting down");
    Ok(())
}

/// Resolves when the process is asked to stop, naming the trigger.
async fn shutdown_signal() -> &'static str {
    let mut terminate =
        signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => "interrupt",
        _ = terminate.recv() => "terminate",
    }
}

/// Per-node log file under `<log_dir>/<host>/`, written off the hot
/// path through a non-blocking appender. The returned guard flushes
/// buffered lines on drop and must live as long as the process.
fn init_logging(cluster: &ClusterConfig) -> Result<WorkerGuard> {
    let node_log_dir = cluster.log_dir.join(&cluster.host);
    std::fs::create_dir_all(&node_log_dir).map_err(|e| StorageError::PathError {
        path: node_log_dir.clone(),
        source: e,
    })?;

    let appender = tracing_appender::rolling::never(&node_log_dir, "ringkv.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(writer)
        .init();

    Ok(guard)
}
