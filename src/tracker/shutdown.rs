use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Waits for an interrupt or a termination request and cancels the token. Returns early if
/// something else cancels the token first.
///
/// On Windows detached processes can't detect signals sent to them, so only ctrl+c in the
/// owning console stops the tracker there.
pub async fn detect_shutdown(cancellation: CancellationToken) {
    select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received interrupt");
            cancellation.cancel();
        },
        _ = terminate() => {
            info!("Received termination request");
            cancellation.cancel();
        },
        _ = cancellation.cancelled() => (),
    };
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(e) => {
            tracing::warn!("Can't listen for SIGTERM: {e:?}");
            std::future::pending::<()>().await
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await
}
