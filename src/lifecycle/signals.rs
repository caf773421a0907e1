//! OS signal handling.
//!
//! SIGINT and SIGTERM both mean "shut down gracefully". SIGHUP is logged
//! and otherwise ignored: config reload is driven by the file watcher.

use crate::lifecycle::shutdown::Shutdown;

/// Wait for the first shutdown signal, then trigger `shutdown`.
pub async fn shutdown_on_signal(shutdown: &Shutdown) {
    wait_for_signal().await;
    tracing::info!("Shutdown signal received");
    shutdown.trigger();
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install SIGTERM handler, using Ctrl+C only");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(s) => Some(s),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install SIGHUP handler");
            None
        }
    };

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => return,
            _ = terminate.recv() => return,
            _ = recv_hangup(&mut hangup) => {
                tracing::info!("SIGHUP received, ignored (use --watch to reload the filter)");
            }
        }
    }
}

#[cfg(unix)]
async fn recv_hangup(hangup: &mut Option<tokio::signal::unix::Signal>) {
    if let Some(s) = hangup {
        if s.recv().await.is_some() {
            return;
        }
    }
    std::future::pending::<()>().await
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_sighup_does_not_shut_down() {
        let shutdown = Shutdown::new();
        let mut rx = shutdown.subscribe();
        let task_shutdown = shutdown.clone();
        let task = tokio::spawn(async move { shutdown_on_signal(&task_shutdown).await });

        // Let the handlers install before raising.
        tokio::time::sleep(Duration::from_millis(100)).await;
        let pid = std::process::id().to_string();
        let status = std::process::Command::new("kill")
            .args(["-HUP", &pid])
            .status()
            .unwrap();
        assert!(status.success());

        let waited = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await;
        assert!(waited.is_err(), "SIGHUP must not trigger shutdown");
        assert!(!task.is_finished());
        task.abort();
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
