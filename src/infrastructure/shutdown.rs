//! Graceful Shutdown Handler
//!
//! Coordinates shutdown between the HTTP server and in-flight catalog
//! requests. Each request runs under a child token, so initiating shutdown
//! aborts upstream calls that are still waiting.

use tokio_util::sync::CancellationToken;

/// Shutdown coordinator for graceful termination.
#[derive(Clone, Debug, Default)]
pub struct ShutdownController {
    token: CancellationToken,
}

impl ShutdownController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initiate graceful shutdown.
    pub fn shutdown(&self) {
        if !self.token.is_cancelled() {
            tracing::info!("initiating graceful shutdown");
            self.token.cancel();
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Token for one request; cancelled when shutdown starts.
    pub fn request_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// Completes once shutdown has been initiated.
    pub async fn wait(&self) {
        self.token.cancelled().await
    }
}

/// Install signal handlers for graceful shutdown.
///
/// Completes when Ctrl+C or SIGTERM is received, after notifying `controller`.
#[cfg_attr(coverage_nightly, coverage(off))]
pub async fn shutdown_signal(controller: ShutdownController) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            tracing::info!("received SIGTERM, initiating shutdown");
        }
        _ = controller.wait() => {}
    }

    controller.shutdown();
}
