//! Auth listener - long-lived subscription to identity provider changes

use tokio::task::JoinHandle;
use tracing::debug;

use crate::services::session::SessionManager;

/// Background task feeding provider notifications into the session manager
///
/// The subscription is released when the listener is stopped or dropped.
pub struct AuthListener {
    handle: Option<JoinHandle<()>>,
}

impl AuthListener {
    /// Subscribe and start reconciling
    ///
    /// The provider state at subscription time is handled as the first
    /// notification. Must be called from within a Tokio runtime.
    pub fn spawn(manager: SessionManager) -> Self {
        let mut changes = manager.identity().subscribe();
        let provider = manager.identity().name().to_string();

        let handle = tokio::spawn(async move {
            loop {
                manager.apply_notification(&mut changes).await;

                if changes.changed().await.is_err() {
                    debug!(provider = %provider, "Identity provider closed its session channel");
                    break;
                }
            }
        });

        Self {
            handle: Some(handle),
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Unsubscribe and wait for the task to wind down
    pub async fn stop(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            let _ = handle.await;
        }
    }
}

impl Drop for AuthListener {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
