//! Graceful shutdown handling
//!
//! Signal handling for the server plus draining of background proof
//! generation jobs, so an interrupted job does not leave an incident stuck
//! in `generating`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};

/// Tracks in-flight background jobs
#[derive(Debug, Default)]
pub struct JobTracker {
    /// Number of active jobs
    active: AtomicU64,
    /// Total jobs started
    total: AtomicU64,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a job starting. The returned guard can be moved into a task.
    pub fn job_start(self: &Arc<Self>) -> JobGuard {
        self.active.fetch_add(1, Ordering::SeqCst);
        self.total.fetch_add(1, Ordering::SeqCst);
        JobGuard {
            tracker: Arc::clone(self),
        }
    }

    pub fn active_count(&self) -> u64 {
        self.active.load(Ordering::SeqCst)
    }

    pub fn total_count(&self) -> u64 {
        self.total.load(Ordering::SeqCst)
    }

    /// Wait for all jobs to complete
    pub async fn wait_for_drain(&self, timeout: Duration) -> bool {
        let start = std::time::Instant::now();

        while self.active_count() > 0 {
            if start.elapsed() > timeout {
                warn!(
                    active = self.active_count(),
                    "Timeout waiting for proof jobs to drain"
                );
                return false;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        info!("All proof jobs drained");
        true
    }
}

/// Guard that decrements the active job count when dropped
#[derive(Debug)]
pub struct JobGuard {
    tracker: Arc<JobTracker>,
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        self.tracker.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Future that completes on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
