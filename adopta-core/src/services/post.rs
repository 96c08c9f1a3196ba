//! Post service - adoption listings in the `posts` collection
//!
//! No listing state is kept in memory; every call round-trips to the store.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::{error, info, warn};

use crate::domain::result::{Error, Result};
use crate::domain::{Document, Post, PostDraft, PostPatch, POSTS_COLLECTION};
use crate::ports::DocumentStore;
use crate::services::session_slot::SessionSlot;

/// Repository of adoption listings
pub struct PostService {
    store: Arc<dyn DocumentStore>,
    slot: Arc<SessionSlot>,
}

impl PostService {
    pub fn new(store: Arc<dyn DocumentStore>, slot: Arc<SessionSlot>) -> Self {
        Self { store, slot }
    }

    /// Create a listing owned by the current session, returning its key
    ///
    /// Fails with `NoActiveSession` before touching the store when nobody
    /// is signed in.
    pub async fn create(&self, draft: PostDraft) -> Result<String> {
        let owner = match self.slot.current_user() {
            Some(user) => user.id,
            None => {
                warn!("Refusing to create a post without an active session");
                return Err(Error::NoActiveSession);
            }
        };
        let Some(owner) = owner else {
            warn!("Refusing to create a post: session user has no subject id");
            return Err(Error::validation("session user has no subject id"));
        };

        let post = draft.into_post(owner);
        let inserted = match post.to_document() {
            Ok(doc) => self.store.insert(POSTS_COLLECTION, doc).await,
            Err(e) => Err(e),
        };

        match inserted {
            Ok(key) => {
                info!(post_id = %key, "Post created");
                Ok(key)
            }
            Err(e) => {
                error!(error = %e, "Failed to create post");
                Err(e)
            }
        }
    }

    /// Load one listing by key
    pub async fn fetch(&self, post_id: &str) -> Result<Post> {
        let result = match self.store.get(POSTS_COLLECTION, post_id).await {
            Ok(Some(doc)) => Post::from_document(doc, post_id),
            Ok(None) => Err(Error::missing_document(POSTS_COLLECTION, post_id)),
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            error!(error = %e, post_id, "Failed to load post");
        }
        result
    }

    /// Merge the named fields into a listing
    pub async fn edit(&self, post_id: &str, patch: PostPatch) -> Result<()> {
        let result = match patch.to_document() {
            Ok(fields) => self.store.update(POSTS_COLLECTION, post_id, fields).await,
            Err(e) => Err(e),
        };
        self.finish("Post edited", "Failed to edit post", post_id, result)
    }

    /// Delete a listing
    pub async fn remove(&self, post_id: &str) -> Result<()> {
        let result = self.store.delete(POSTS_COLLECTION, post_id).await;
        self.finish("Post deleted", "Failed to delete post", post_id, result)
    }

    /// Set `adotado = true`, whatever its previous value
    pub async fn mark_adopted(&self, post_id: &str) -> Result<()> {
        let mut fields = Document::new();
        fields.insert("adotado".to_string(), JsonValue::Bool(true));
        let result = self.store.update(POSTS_COLLECTION, post_id, fields).await;
        self.finish("Post marked as adopted", "Failed to mark post as adopted", post_id, result)
    }

    fn finish(&self, done: &str, failed: &str, post_id: &str, result: Result<()>) -> Result<()> {
        match &result {
            Ok(()) => info!(post_id, "{}", done),
            Err(e) => error!(error = %e, post_id, "{}", failed),
        }
        result
    }
}
