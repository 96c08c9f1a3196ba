//! Session service - identity, profile document and session cache in step
//!
//! Every mutation runs inside the slot's write queue and, on success,
//! mirrors the new state to the local cache before releasing it. Cache
//! failures are logged and swallowed: the slot is the source of truth, the
//! cache only speeds up the next startup.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::domain::result::{Error, Result};
use crate::domain::{SessionState, User, USERS_COLLECTION};
use crate::ports::{DocumentStore, IdentityProvider, LocalCache, SubjectId};
use crate::services::session_slot::SessionSlot;

/// Session manager
///
/// Cheap to clone; clones share the same slot and ports.
#[derive(Clone)]
pub struct SessionManager {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn DocumentStore>,
    cache: Arc<dyn LocalCache>,
    slot: Arc<SessionSlot>,
    cache_key: Arc<str>,
    handled: Arc<watch::Sender<u64>>,
}

impl SessionManager {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn DocumentStore>,
        cache: Arc<dyn LocalCache>,
        slot: Arc<SessionSlot>,
        cache_key: impl Into<String>,
    ) -> Self {
        let (handled, _) = watch::channel(0);
        Self {
            identity,
            store,
            cache,
            slot,
            cache_key: Arc::from(cache_key.into()),
            handled: Arc::new(handled),
        }
    }

    pub fn identity(&self) -> &Arc<dyn IdentityProvider> {
        &self.identity
    }

    pub fn slot(&self) -> &Arc<SessionSlot> {
        &self.slot
    }

    /// Count of provider notifications processed so far
    pub fn notifications_handled(&self) -> watch::Receiver<u64> {
        self.handled.subscribe()
    }

    /// Create a credentialed account with its profile document
    ///
    /// If the profile write fails after the provider created the account,
    /// the provider-side session stays signed in while the slot is left
    /// untouched; a later login then reports the orphaned credential.
    pub async fn sign_up(&self, data: User) -> Result<User> {
        let mut write = self.slot.begin().await;

        let user = match self.create_account(&data).await {
            Ok(user) => user,
            Err(e) => {
                error!(error = %e, "Sign up failed");
                return Err(e);
            }
        };

        write.set(SessionState::Authenticated(user.clone()));
        self.persist(Some(&user)).await;
        info!(subject = user.id.as_deref().unwrap_or_default(), "Account created");
        Ok(user)
    }

    async fn create_account(&self, data: &User) -> Result<User> {
        let password = data.password.as_deref().unwrap_or_default();
        let subject = self.identity.sign_up(&data.email, password).await?;

        let user = User::for_new_account(data, &subject);
        self.store
            .set(USERS_COLLECTION, &subject, user.to_document()?)
            .await?;
        Ok(user)
    }

    /// Sign in and load the profile document for the returned subject
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let mut write = self.slot.begin().await;

        let user = match self.authenticate(email, password).await {
            Ok(user) => user,
            Err(e) => {
                if e.is_missing_document() {
                    warn!(error = %e, "Login rejected: credential has no profile document");
                } else {
                    error!(error = %e, "Login failed");
                }
                return Err(e);
            }
        };

        write.set(SessionState::Authenticated(user.clone()));
        self.persist(Some(&user)).await;
        info!(subject = user.id.as_deref().unwrap_or_default(), "Signed in");
        Ok(user)
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<User> {
        let subject = self.identity.sign_in(email, password).await?;
        self.fetch_profile(&subject).await
    }

    async fn fetch_profile(&self, subject: &str) -> Result<User> {
        let doc = self
            .store
            .get(USERS_COLLECTION, subject)
            .await?
            .ok_or_else(|| Error::missing_document(USERS_COLLECTION, subject))?;
        User::from_document(doc, subject)
    }

    /// Merge `data` into the profile document at `id`, then replace the
    /// current user with `data` as given
    ///
    /// The store merges while memory and cache are replaced, so fields the
    /// caller omits survive remotely but vanish locally until the next
    /// profile fetch.
    pub async fn update_user(&self, data: User, id: &str) -> Result<User> {
        let mut write = self.slot.begin().await;
        let user = data.without_password();

        let patched = match user.to_document() {
            Ok(fields) => self.store.update(USERS_COLLECTION, id, fields).await,
            Err(e) => Err(e),
        };
        if let Err(e) = patched {
            error!(error = %e, subject = id, "Profile update failed");
            return Err(e);
        }

        write.set(SessionState::Authenticated(user.clone()));
        self.persist(Some(&user)).await;
        info!(subject = id, "Profile updated");
        Ok(user)
    }

    /// End the session
    ///
    /// Local state is cleared only once the provider confirms; a provider
    /// failure leaves the current user in place.
    pub async fn sign_out(&self) -> Result<()> {
        let mut write = self.slot.begin().await;

        if let Err(e) = self.identity.sign_out().await {
            error!(error = %e, "Sign out failed");
            return Err(e);
        }

        write.set(SessionState::Anonymous);
        self.persist(None).await;
        info!("Signed out");
        Ok(())
    }

    /// Optimistically resolve the slot from the cached session record
    ///
    /// Only applies while the slot is still `Unknown`, so a cached record
    /// can never override a state the provider already determined.
    pub async fn restore_from_cache(&self) -> SessionState {
        let mut write = self.slot.begin().await;
        if !write.state().is_unknown() {
            return write.state();
        }

        match self.cache.get(&self.cache_key).await {
            Ok(Some(raw)) => match serde_json::from_str::<User>(&raw) {
                Ok(user) => {
                    debug!("Session restored from cache");
                    write.set(SessionState::Authenticated(user.without_password()));
                }
                Err(e) => {
                    warn!(error = %e, "Discarding unreadable session record");
                    if let Err(e) = self.cache.remove(&self.cache_key).await {
                        warn!(error = %e, "Failed to remove unreadable session record");
                    }
                    write.set(SessionState::Anonymous);
                }
            },
            Ok(None) => write.set(SessionState::Anonymous),
            Err(e) => {
                warn!(error = %e, "Failed to read session record; waiting for identity provider");
            }
        }
        write.state()
    }

    /// Reconcile the slot with the provider's latest session
    ///
    /// The subject is read from `changes` only once the write queue is held,
    /// so an operation that finished earlier in the queue (a sign-out, say)
    /// is never undone by the notification that was pending behind it.
    /// A subject overwrites memory and cache with its freshly fetched
    /// profile; `None` clears both. A subject without a profile document is
    /// logged and changes nothing.
    pub async fn apply_notification(&self, changes: &mut watch::Receiver<Option<SubjectId>>) {
        {
            let mut write = self.slot.begin().await;
            let subject = changes.borrow_and_update().clone();
            match subject {
                Some(subject) => match self.fetch_profile(&subject).await {
                    Ok(user) => {
                        debug!(subject = %subject, "Identity provider reported a session");
                        write.set(SessionState::Authenticated(user.clone()));
                        self.persist(Some(&user)).await;
                    }
                    Err(e) if e.is_missing_document() => {
                        warn!(subject = %subject, "Authenticated subject has no profile document");
                    }
                    Err(e) => {
                        error!(error = %e, subject = %subject, "Failed to load profile after provider notification");
                    }
                },
                None => {
                    debug!("Identity provider reported no session");
                    write.set(SessionState::Anonymous);
                    self.persist(None).await;
                }
            }
        }
        self.handled.send_modify(|n| *n += 1);
    }

    async fn persist(&self, user: Option<&User>) {
        let result = match user {
            Some(user) => match serde_json::to_string(user) {
                Ok(raw) => self.cache.set(&self.cache_key, &raw).await,
                Err(e) => Err(e.into()),
            },
            None => self.cache.remove(&self.cache_key).await,
        };
        if let Err(e) = result {
            warn!(error = %e, "Failed to mirror session to cache");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::local::{LocalDocumentStore, LocalIdentityProvider, MemoryCache};
    use crate::domain::SESSION_KEY;

    struct Harness {
        identity: Arc<LocalIdentityProvider>,
        store: Arc<LocalDocumentStore>,
        cache: Arc<MemoryCache>,
        manager: SessionManager,
    }

    fn harness() -> Harness {
        let identity = Arc::new(LocalIdentityProvider::new());
        let store = Arc::new(LocalDocumentStore::new());
        let cache = Arc::new(MemoryCache::new());
        let manager = SessionManager::new(
            identity.clone(),
            store.clone(),
            cache.clone(),
            Arc::new(SessionSlot::new()),
            SESSION_KEY,
        );
        Harness {
            identity,
            store,
            cache,
            manager,
        }
    }

    fn ana() -> User {
        User::new("a@b.com").with_password("x").with_name("Ana")
    }

    async fn notify(manager: &SessionManager, subject: Option<&str>) {
        let (_tx, mut changes) = watch::channel(subject.map(SubjectId::from));
        manager.apply_notification(&mut changes).await;
    }

    #[tokio::test]
    async fn test_sign_up_writes_profile_slot_and_cache() {
        let h = harness();
        let user = h.manager.sign_up(ana()).await.unwrap();

        let subject = user.id.clone().unwrap();
        assert!(!subject.is_empty());
        assert_eq!(user.email, "a@b.com");
        assert_eq!(user.name.as_deref(), Some("Ana"));
        assert!(user.password.is_none());

        let doc = h.store.get(USERS_COLLECTION, &subject).await.unwrap().unwrap();
        assert_eq!(doc["email"], "a@b.com");
        assert!(!doc.contains_key("password"));

        assert_eq!(h.manager.slot().current_user(), Some(user.clone()));
        let cached = h.cache.get(SESSION_KEY).await.unwrap().unwrap();
        assert!(!cached.contains("\"x\""));
        assert_eq!(serde_json::from_str::<User>(&cached).unwrap(), user);
    }

    #[tokio::test]
    async fn test_sign_up_rejected_by_provider_leaves_state() {
        let h = harness();
        h.manager.sign_up(ana()).await.unwrap();
        h.manager.sign_out().await.unwrap();

        let err = h.manager.sign_up(ana()).await.unwrap_err();
        assert!(err.is_provider());
        assert!(!h.manager.slot().snapshot().signed);
    }

    #[tokio::test]
    async fn test_sign_up_store_failure_keeps_slot_untouched() {
        let h = harness();
        h.store.fail_with("permission denied");

        let err = h.manager.sign_up(ana()).await.unwrap_err();
        assert!(matches!(err, Error::Store(_)));
        assert!(h.manager.slot().current_user().is_none());
        // The account itself exists at the provider
        assert!(h.identity.current_subject().is_some());
    }

    #[tokio::test]
    async fn test_login_without_profile_document_fails() {
        let h = harness();
        h.identity.sign_up("ghost@b.com", "secret").await.unwrap();
        h.identity.sign_out().await.unwrap();

        let err = h.manager.login("ghost@b.com", "secret").await.unwrap_err();
        assert!(err.is_missing_document());
        assert!(!h.manager.slot().snapshot().signed);
        assert!(h.cache.get(SESSION_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let h = harness();
        h.manager.sign_up(ana()).await.unwrap();
        h.manager.sign_out().await.unwrap();

        let err = h.manager.login("a@b.com", "nope").await.unwrap_err();
        assert!(err.is_provider());
        assert!(!h.manager.slot().snapshot().signed);
    }

    #[tokio::test]
    async fn test_update_user_replaces_local_state_wholesale() {
        let h = harness();
        let user = h
            .manager
            .sign_up(ana().with_phone("555-0100"))
            .await
            .unwrap();
        let id = user.id.clone().unwrap();

        // Strict subset of the stored fields
        let data = User::new("a@b.com").with_id(id.clone()).with_name("Ana Maria");
        let updated = h.manager.update_user(data.clone(), &id).await.unwrap();
        assert_eq!(updated, data);
        assert_eq!(h.manager.slot().current_user(), Some(data.clone()));

        // The store merged: phone survives remotely
        let doc = h.store.get(USERS_COLLECTION, &id).await.unwrap().unwrap();
        assert_eq!(doc["name"], "Ana Maria");
        assert_eq!(doc["phone"], "555-0100");

        let cached = h.cache.get(SESSION_KEY).await.unwrap().unwrap();
        assert_eq!(serde_json::from_str::<User>(&cached).unwrap(), data);
    }

    #[tokio::test]
    async fn test_update_user_missing_document_fails() {
        let h = harness();
        let err = h
            .manager
            .update_user(User::new("a@b.com"), "nobody")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Store(_)));
        assert!(h.manager.slot().current_user().is_none());
    }

    #[tokio::test]
    async fn test_sign_out_clears_slot_and_cache() {
        let h = harness();
        h.manager.sign_up(ana()).await.unwrap();
        h.manager.sign_out().await.unwrap();

        assert_eq!(h.manager.slot().state(), SessionState::Anonymous);
        assert!(h.cache.get(SESSION_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sign_out_provider_failure_keeps_local_state() {
        let h = harness();
        h.manager.sign_up(ana()).await.unwrap();
        h.identity.fail_sign_out(true);

        assert!(h.manager.sign_out().await.is_err());
        assert!(h.manager.slot().snapshot().signed);
        assert!(h.cache.get(SESSION_KEY).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_cache_failure_does_not_fail_operation() {
        let h = harness();
        h.cache.fail_with("disk full");

        let user = h.manager.sign_up(ana()).await.unwrap();
        assert_eq!(h.manager.slot().current_user(), Some(user));
    }

    #[tokio::test]
    async fn test_restore_from_cache() {
        let h = harness();
        let cached = User::new("a@b.com").with_id("u1");
        h.cache
            .set(SESSION_KEY, &serde_json::to_string(&cached).unwrap())
            .await
            .unwrap();

        let state = h.manager.restore_from_cache().await;
        assert_eq!(state, SessionState::Authenticated(cached));
    }

    #[tokio::test]
    async fn test_restore_discards_corrupt_record() {
        let h = harness();
        h.cache.set(SESSION_KEY, "{not json").await.unwrap();

        let state = h.manager.restore_from_cache().await;
        assert_eq!(state, SessionState::Anonymous);
        assert!(h.cache.get(SESSION_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_restore_never_overrides_resolved_state() {
        let h = harness();
        notify(&h.manager, None).await;
        h.cache
            .set(SESSION_KEY, r#"{"email":"stale@b.com","id":"old"}"#)
            .await
            .unwrap();

        let state = h.manager.restore_from_cache().await;
        assert_eq!(state, SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_notification_with_dangling_subject_changes_nothing() {
        let h = harness();
        let user = h.manager.sign_up(ana()).await.unwrap();

        notify(&h.manager, Some("dangling")).await;
        assert_eq!(h.manager.slot().current_user(), Some(user));
        assert_eq!(*h.manager.notifications_handled().borrow(), 1);
    }

    #[tokio::test]
    async fn test_notification_refreshes_profile_from_store() {
        let h = harness();
        let user = h.manager.sign_up(ana()).await.unwrap();
        let id = user.id.clone().unwrap();

        let mut fields = crate::domain::Document::new();
        fields.insert("name".into(), "Renamed elsewhere".into());
        h.store.update(USERS_COLLECTION, &id, fields).await.unwrap();

        notify(&h.manager, Some(&id)).await;
        let current = h.manager.slot().current_user().unwrap();
        assert_eq!(current.name.as_deref(), Some("Renamed elsewhere"));

        let cached = h.cache.get(SESSION_KEY).await.unwrap().unwrap();
        assert!(cached.contains("Renamed elsewhere"));
    }
}
