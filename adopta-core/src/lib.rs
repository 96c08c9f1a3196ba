//! Adopta Core - session and data layer for an animal adoption listing app
//!
//! This crate implements the core logic following hexagonal architecture:
//!
//! - **domain**: Core entities (User, Post, SessionState) and error types
//! - **ports**: Trait definitions for external capabilities (IdentityProvider, DocumentStore, LocalCache)
//! - **services**: Session reconciliation and post operations
//! - **adapters**: Concrete implementations (local, file cache, Firebase REST)

pub mod domain;
pub mod ports;
pub mod services;
pub mod adapters;
pub mod config;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result as AnyResult};
use tokio::sync::watch;
use tracing::info;

use adapters::file_cache::FileCache;
use adapters::firebase::{FirebaseAuth, FirestoreStore};
use adapters::local::{LocalDocumentStore, LocalIdentityProvider};
use config::{Backend, Config};
use domain::result::Result;
use ports::{DocumentStore, IdentityProvider, LocalCache};
use services::*;

// Re-export commonly used types at crate root
pub use domain::{Post, PostDraft, PostPatch, SessionSnapshot, SessionState, User};
pub use domain::result::{Error, OperationResult};

/// Main context for Adopta operations
///
/// The single object an application reads from: the session snapshot
/// `{user, signed}` plus every session and post operation. Holds the
/// provider subscription for as long as it lives.
pub struct AdoptaContext {
    pub config: Config,
    session: SessionManager,
    posts: PostService,
    slot: Arc<SessionSlot>,
    listener: Option<AuthListener>,
}

impl AdoptaContext {
    /// Open the context for an app directory, wiring adapters from settings
    pub async fn open(app_dir: &Path) -> AnyResult<Self> {
        let config = Config::load(app_dir)?;
        std::fs::create_dir_all(app_dir)
            .with_context(|| format!("failed to create {}", app_dir.display()))?;

        let cache: Arc<dyn LocalCache> = Arc::new(FileCache::new(app_dir.join("cache")));
        let identity: Arc<dyn IdentityProvider>;
        let store: Arc<dyn DocumentStore>;
        match config.backend {
            Backend::Local => {
                identity = Arc::new(LocalIdentityProvider::open(app_dir.join("identity.json"))?);
                store = Arc::new(LocalDocumentStore::open(app_dir.join("documents.json"))?);
            }
            Backend::Firebase => {
                let auth = Arc::new(
                    FirebaseAuth::new(config.firebase_options()?)
                        .with_persistence(app_dir.join("firebase-auth.json"))?,
                );
                store = Arc::new(FirestoreStore::new(Arc::clone(&auth))?);
                identity = auth;
            }
        }

        info!(backend = %config.backend, dir = %app_dir.display(), "Opening Adopta context");
        let mut context = Self::start(identity, store, cache, config.cache_key.clone()).await;
        context.config = config;
        Ok(context)
    }

    /// Start a context over explicit adapters
    ///
    /// Restores the cached session first, then subscribes to the identity
    /// provider, whose notifications are authoritative from then on.
    pub async fn start(
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn DocumentStore>,
        cache: Arc<dyn LocalCache>,
        cache_key: impl Into<String>,
    ) -> Self {
        let slot = Arc::new(SessionSlot::new());
        let session = SessionManager::new(identity, Arc::clone(&store), cache, Arc::clone(&slot), cache_key);
        let posts = PostService::new(store, Arc::clone(&slot));

        session.restore_from_cache().await;
        let listener = AuthListener::spawn(session.clone());

        Self {
            config: Config::default(),
            session,
            posts,
            slot,
            listener: Some(listener),
        }
    }

    // -- session state -----------------------------------------------------

    pub fn snapshot(&self) -> SessionSnapshot {
        self.slot.snapshot()
    }

    pub fn state(&self) -> SessionState {
        self.slot.state()
    }

    /// True until the cache or the provider has resolved the session
    pub fn is_loading(&self) -> bool {
        self.slot.is_unknown()
    }

    /// Watch session changes; the receiver sees every committed state
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.slot.subscribe()
    }

    pub fn notifications_handled(&self) -> watch::Receiver<u64> {
        self.session.notifications_handled()
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn posts(&self) -> &PostService {
        &self.posts
    }

    /// Release the provider subscription
    pub async fn shutdown(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.stop().await;
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listener.as_ref().is_some_and(AuthListener::is_active)
    }

    // -- session operations ------------------------------------------------

    pub async fn sign_up(&self, data: User) -> Result<User> {
        self.session.sign_up(data).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        self.session.login(email, password).await
    }

    pub async fn update_user(&self, data: User, id: &str) -> Result<User> {
        self.session.update_user(data, id).await
    }

    pub async fn sign_out(&self) -> Result<()> {
        self.session.sign_out().await
    }

    // -- post operations ---------------------------------------------------

    pub async fn create_post(&self, draft: PostDraft) -> Result<String> {
        self.posts.create(draft).await
    }

    pub async fn fetch_post(&self, post_id: &str) -> Result<Post> {
        self.posts.fetch(post_id).await
    }

    pub async fn edit_post(&self, post_id: &str, patch: PostPatch) -> Result<()> {
        self.posts.edit(post_id, patch).await
    }

    pub async fn delete_post(&self, post_id: &str) -> Result<()> {
        self.posts.remove(post_id).await
    }

    pub async fn mark_as_adopted(&self, post_id: &str) -> Result<()> {
        self.posts.mark_adopted(post_id).await
    }
}
