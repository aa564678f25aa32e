//! Background task registry for fire-and-forget work.
//!
//! Fan-out pushes and startup handshakes are spawned here so they can be
//! awaited during graceful shutdown, or cancelled wholesale in tests.

// std::sync::Mutex is correct here—lock is never held across .await points.
// See: https://docs.rs/tokio/latest/tokio/sync/struct.Mutex.html
use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

// ============================================================================
// BackgroundTasks
// ============================================================================

/// Registry for background tasks that should be awaited on shutdown.
#[derive(Clone, Default)]
pub struct BackgroundTasks {
    handles: Arc<Mutex<Vec<JoinHandle<()>>>>,
    cancel: CancellationToken,
}

impl BackgroundTasks {
    // ------------------------------------------------------------------------
    // Constructor
    // ------------------------------------------------------------------------

    /// Create a new empty task registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handles: Arc::new(Mutex::new(Vec::new())),
            cancel: CancellationToken::new(),
        }
    }

    // ------------------------------------------------------------------------
    // Task Management
    // ------------------------------------------------------------------------

    /// Spawn a background task and register its handle.
    ///
    /// Nothing is spawned once the registry has been cancelled. A task that
    /// is still running when [`cancel`](Self::cancel) fires is dropped at its
    /// next await point.
    ///
    /// Registration is synchronous so the handle is tracked before this
    /// method returns, even for fast-completing tasks.
    pub fn spawn<F>(&self, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        if self.cancel.is_cancelled() {
            debug!("Background tasks cancelled, dropping new task");
            return;
        }

        let cancel = self.cancel.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = future => {}
            }
        });

        let mut guard = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        guard.retain(|h| !h.is_finished());
        guard.push(handle);
    }

    /// Signal every running and future task to stop.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait for all registered background tasks to complete.
    ///
    /// Call this during graceful shutdown so in-flight notifications reach
    /// their peers before the process exits.
    pub async fn shutdown(&self) {
        let handles: Vec<_> = std::mem::take(
            &mut *self.handles.lock().unwrap_or_else(PoisonError::into_inner),
        );

        let count = handles.len();
        if count == 0 {
            return;
        }

        info!(count, "Waiting for background tasks to complete");

        for (i, handle) in handles.into_iter().enumerate() {
            if let Err(e) = handle.await {
                warn!(task = i, error = %e, "Background task panicked");
            }
        }

        info!("All background tasks completed");
    }

    /// Get the number of pending tasks.
    pub fn pending_count(&self) -> usize {
        let mut guard = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        guard.retain(|h| !h.is_finished());
        guard.len()
    }
}

// ============================================================================
// Tests
// ============================================================================
