//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - In-process identity provider, document store and cache (`local`)
//! - One-file-per-key cache on disk for the LocalCache port
//! - Firebase Authentication and Cloud Firestore over REST

pub mod file_cache;
pub mod firebase;
pub mod json_file;
pub mod local;

use crate::domain::result::{Error, Result};

/// Run file IO or password hashing on Tokio's blocking pool
pub(crate) async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Io(std::io::Error::other(format!("blocking task failed: {}", e))))?
}
