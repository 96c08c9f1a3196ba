//! End-to-end session and post flows through the context facade
//!
//! Runs against the in-process adapters, so every scenario is hermetic.
//!
//! Run with: cargo test --test session_flow_test -- --nocapture

use std::sync::Arc;

use tempfile::TempDir;

use adopta_core::adapters::file_cache::FileCache;
use adopta_core::adapters::local::{LocalDocumentStore, LocalIdentityProvider, MemoryCache};
use adopta_core::domain::{POSTS_COLLECTION, SESSION_KEY, USERS_COLLECTION};
use adopta_core::ports::{DocumentStore, IdentityProvider, LocalCache};
use adopta_core::{AdoptaContext, Error, PostDraft, PostPatch, SessionState, User};

// ============================================================================
// Test Helpers
// ============================================================================

struct Fixture {
    identity: Arc<LocalIdentityProvider>,
    store: Arc<LocalDocumentStore>,
    cache: Arc<MemoryCache>,
    context: AdoptaContext,
}

async fn start(
    identity: Arc<LocalIdentityProvider>,
    store: Arc<LocalDocumentStore>,
    cache: Arc<MemoryCache>,
) -> Fixture {
    let context = AdoptaContext::start(identity.clone(), store.clone(), cache.clone(), SESSION_KEY).await;
    let fixture = Fixture {
        identity,
        store,
        cache,
        context,
    };
    fixture.settle(1).await;
    fixture
}

async fn fresh() -> Fixture {
    start(
        Arc::new(LocalIdentityProvider::new()),
        Arc::new(LocalDocumentStore::new()),
        Arc::new(MemoryCache::new()),
    )
    .await
}

impl Fixture {
    /// Wait until the listener has handled `count` provider notifications
    async fn settle(&self, count: u64) {
        let mut handled = self.context.notifications_handled();
        handled.wait_for(|n| *n >= count).await.unwrap();
    }

    async fn cached(&self) -> Option<User> {
        self.cache
            .get(SESSION_KEY)
            .await
            .unwrap()
            .map(|raw| serde_json::from_str(&raw).unwrap())
    }
}

fn ana() -> User {
    User::new("a@b.com").with_password("x").with_name("Ana")
}

fn rex() -> PostDraft {
    PostDraft {
        description: "Friendly, vaccinated".into(),
        image: "https://example.com/rex.jpg".into(),
        genero: "macho".into(),
        ..PostDraft::new("Dog", "Rex")
    }
}

// ============================================================================
// Session Tests
// ============================================================================

#[tokio::test]
async fn test_sign_up_scenario() {
    let f = fresh().await;
    assert!(!f.context.is_loading());
    assert!(!f.context.snapshot().signed);

    let user = f.context.sign_up(ana()).await.unwrap();
    let id = user.id.clone().unwrap();
    assert!(!id.is_empty());
    assert_eq!(user.email, "a@b.com");
    assert_eq!(user.name.as_deref(), Some("Ana"));

    let snapshot = f.context.snapshot();
    assert!(snapshot.signed);
    assert_eq!(snapshot.user, Some(user.clone()));

    let doc = f.store.get(USERS_COLLECTION, &id).await.unwrap().unwrap();
    assert_eq!(doc["email"], "a@b.com");
    assert_eq!(doc["name"], "Ana");
    assert!(!doc.contains_key("password"));
    assert_eq!(f.cached().await, Some(user));
}

#[tokio::test]
async fn test_login_with_orphaned_credential_stays_signed_out() {
    let f = fresh().await;
    f.identity.sign_up("ghost@b.com", "secret").await.unwrap();
    f.settle(2).await;
    f.identity.sign_out().await.unwrap();
    f.settle(3).await;

    let err = f.context.login("ghost@b.com", "secret").await.unwrap_err();
    assert!(err.is_missing_document());
    assert!(!f.context.snapshot().signed);
    assert!(f.cached().await.is_none());
}

#[tokio::test]
async fn test_login_restores_profile() {
    let f = fresh().await;
    let user = f.context.sign_up(ana().with_phone("555-0100")).await.unwrap();
    f.context.sign_out().await.unwrap();
    assert!(!f.context.snapshot().signed);

    let again = f.context.login("a@b.com", "x").await.unwrap();
    assert_eq!(again, user);
    assert_eq!(f.context.snapshot().user, Some(user));
}

#[tokio::test]
async fn test_update_user_snapshot_equals_data() {
    let f = fresh().await;
    let user = f.context.sign_up(ana().with_phone("555-0100")).await.unwrap();
    let id = user.id.clone().unwrap();
    f.settle(2).await;

    let data = User::new("a@b.com").with_id(id.clone());
    f.context.update_user(data.clone(), &id).await.unwrap();

    assert_eq!(f.context.snapshot().user, Some(data.clone()));
    assert_eq!(f.cached().await, Some(data));
}

#[tokio::test]
async fn test_sign_out_then_fresh_startup_is_signed_out() {
    let f = fresh().await;
    f.context.sign_up(ana()).await.unwrap();
    f.context.sign_out().await.unwrap();

    assert!(f.context.snapshot().user.is_none());
    assert!(f.cached().await.is_none());

    let Fixture {
        identity,
        store,
        cache,
        mut context,
    } = f;
    context.shutdown().await;

    let restarted = start(identity, store, cache).await;
    assert!(!restarted.context.snapshot().signed);
    assert_eq!(restarted.context.state(), SessionState::Anonymous);
}

#[tokio::test]
async fn test_provider_logout_clears_cache() {
    let f = fresh().await;
    f.context.sign_up(ana()).await.unwrap();
    f.settle(2).await;
    assert!(f.cached().await.is_some());

    f.identity.expire_session().await.unwrap();
    f.settle(3).await;

    assert!(!f.context.snapshot().signed);
    assert!(f.cached().await.is_none());
}

#[tokio::test]
async fn test_cached_session_dropped_when_provider_has_no_subject() {
    let dir = TempDir::new().unwrap();
    let cached = User::new("a@b.com").with_id("u1").with_name("Ana");
    let cache = FileCache::new(dir.path());
    cache
        .set(SESSION_KEY, &serde_json::to_string(&cached).unwrap())
        .await
        .unwrap();

    // Provider says nobody is signed in, so the cached user is dropped
    // once the first notification lands
    let identity = Arc::new(LocalIdentityProvider::new());
    let context = AdoptaContext::start(
        identity,
        Arc::new(LocalDocumentStore::new()),
        Arc::new(cache),
        SESSION_KEY,
    )
    .await;
    context
        .notifications_handled()
        .wait_for(|n| *n >= 1)
        .await
        .unwrap();

    assert!(!context.snapshot().signed);
    assert!(FileCache::new(dir.path()).get(SESSION_KEY).await.unwrap().is_none());
}

#[tokio::test]
async fn test_open_resumes_session_across_restarts() {
    let dir = TempDir::new().unwrap();

    let user = {
        let mut context = AdoptaContext::open(dir.path()).await.unwrap();
        let user = context.sign_up(ana()).await.unwrap();
        context.shutdown().await;
        assert!(!context.is_listening());
        user
    };

    let context = AdoptaContext::open(dir.path()).await.unwrap();
    // Restored from the file cache before any provider round trip
    assert_eq!(context.snapshot().user, Some(user.clone()));
    assert!(context.is_listening());

    context
        .notifications_handled()
        .wait_for(|n| *n >= 1)
        .await
        .unwrap();
    assert_eq!(context.snapshot().user, Some(user));
}

// ============================================================================
// Post Tests
// ============================================================================

#[tokio::test]
async fn test_create_requires_session_and_writes_nothing() {
    let f = fresh().await;

    let err = f.context.create_post(rex()).await.unwrap_err();
    assert!(matches!(err, Error::NoActiveSession));
    assert!(err.is_precondition());
    assert_eq!(f.store.len(POSTS_COLLECTION), 0);
    assert_eq!(f.store.write_count(), 0);
}

#[tokio::test]
async fn test_create_stamps_owner_and_defaults_adoption() {
    let f = fresh().await;
    let user = f.context.sign_up(ana()).await.unwrap();

    let post_id = f.context.create_post(rex()).await.unwrap();
    let stored = f.store.get(POSTS_COLLECTION, &post_id).await.unwrap().unwrap();
    assert_eq!(stored["user_id"], user.id.clone().unwrap().as_str());
    assert_eq!(stored["adotado"], false);
    assert_eq!(stored["title"], "Dog");

    let post = f.context.fetch_post(&post_id).await.unwrap();
    assert_eq!(post.id.as_deref(), Some(post_id.as_str()));
    assert_eq!(post.user_id, user.id.unwrap());
}

#[tokio::test]
async fn test_edit_changes_only_named_fields() {
    let f = fresh().await;
    f.context.sign_up(ana()).await.unwrap();
    let post_id = f.context.create_post(rex()).await.unwrap();

    f.context
        .edit_post(&post_id, PostPatch::title("New"))
        .await
        .unwrap();

    let post = f.context.fetch_post(&post_id).await.unwrap();
    assert_eq!(post.title, "New");
    assert_eq!(post.name, "Rex");
    assert_eq!(post.description, "Friendly, vaccinated");
    assert!(!post.adotado);
}

#[tokio::test]
async fn test_mark_adopted_is_idempotent() {
    let f = fresh().await;
    f.context.sign_up(ana()).await.unwrap();
    let post_id = f.context.create_post(rex()).await.unwrap();

    f.context.mark_as_adopted(&post_id).await.unwrap();
    let once = f.store.get(POSTS_COLLECTION, &post_id).await.unwrap();
    f.context.mark_as_adopted(&post_id).await.unwrap();
    let twice = f.store.get(POSTS_COLLECTION, &post_id).await.unwrap();

    assert_eq!(once, twice);
    assert_eq!(twice.unwrap()["adotado"], true);
}

#[tokio::test]
async fn test_delete_then_fetch_reports_missing() {
    let f = fresh().await;
    f.context.sign_up(ana()).await.unwrap();
    let post_id = f.context.create_post(rex()).await.unwrap();

    f.context.delete_post(&post_id).await.unwrap();
    let err = f.context.fetch_post(&post_id).await.unwrap_err();
    assert!(err.is_missing_document());
}
