//! Identity provider port - credential authentication and session events

use async_trait::async_trait;
use tokio::sync::watch;

use crate::domain::result::Result;

/// Opaque subject identifier issued by the identity provider
pub type SubjectId = String;

/// Identity provider abstraction
///
/// Implementations authenticate email/password credentials and publish the
/// provider-side session as a watch channel: `Some(subject)` while signed
/// in, `None` otherwise. Changes may originate outside this process (token
/// expiry, revocation), which is why the session manager treats this
/// channel as authoritative.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Provider name (e.g., "local", "firebase")
    fn name(&self) -> &str;

    /// Authenticate existing credentials
    async fn sign_in(&self, email: &str, password: &str) -> Result<SubjectId>;

    /// Create a credentialed account and sign it in
    async fn sign_up(&self, email: &str, password: &str) -> Result<SubjectId>;

    /// End the provider-side session
    async fn sign_out(&self) -> Result<()>;

    /// Subscribe to session changes
    ///
    /// Listeners handle the value current at subscription time as the first
    /// notification, then every change after it. Dropping the receiver
    /// unsubscribes.
    fn subscribe(&self) -> watch::Receiver<Option<SubjectId>>;
}
