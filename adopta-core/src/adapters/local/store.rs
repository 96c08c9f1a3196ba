//! Local document store - collections of JSON documents in process memory
//!
//! Optionally mirrored to a JSON file after every write. A write is applied
//! to a copy of the collections and only becomes visible once the file is
//! written, so a failed write leaves memory as it was. Also carries the
//! failure and latency knobs used to exercise store outages and slow
//! networks in tests and demos.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::adapters::{blocking, json_file};
use crate::domain::result::{Error, Result};
use crate::domain::Document;
use crate::ports::DocumentStore;

/// Length of store-assigned keys
const AUTO_ID_LEN: usize = 20;

type Collections = HashMap<String, BTreeMap<String, Document>>;

/// In-process document store
pub struct LocalDocumentStore {
    collections: Mutex<Collections>,
    /// Orders writes so each one copies the result of the previous
    writing: tokio::sync::Mutex<()>,
    path: Option<PathBuf>,
    failure: Mutex<Option<String>>,
    latency_ms: AtomicU64,
    writes: AtomicUsize,
}

impl LocalDocumentStore {
    pub fn new() -> Self {
        Self::from_parts(Collections::new(), None)
    }

    /// Store backed by a JSON file, loading any existing documents
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let collections: Collections = json_file::read_json(&path)?.unwrap_or_default();
        Ok(Self::from_parts(collections, Some(path)))
    }

    fn from_parts(collections: Collections, path: Option<PathBuf>) -> Self {
        Self {
            collections: Mutex::new(collections),
            writing: tokio::sync::Mutex::new(()),
            path,
            failure: Mutex::new(None),
            latency_ms: AtomicU64::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    /// Fail every subsequent call with `message` until `recover` is called
    pub fn fail_with(&self, message: impl Into<String>) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = Some(message.into());
        }
    }

    pub fn recover(&self) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = None;
        }
    }

    /// Delay every call by `latency` before it takes effect
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of documents in a collection
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .map(|c| c.get(collection).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }

    /// Number of successful writes since creation
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    async fn gate(&self) -> Result<()> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        let failure = self
            .failure
            .lock()
            .map_err(|e| Error::store(format!("lock poisoned: {}", e)))?
            .clone();
        match failure {
            Some(message) => Err(Error::store(message)),
            None => Ok(()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Collections>> {
        self.collections
            .lock()
            .map_err(|e| Error::store(format!("lock poisoned: {}", e)))
    }

    /// Apply `change` to a copy of the collections, mirror the copy to disk
    /// and only then make it current
    async fn write<T, F>(&self, change: F) -> Result<T>
    where
        F: FnOnce(&mut Collections) -> Result<T>,
    {
        let _queue = self.writing.lock().await;
        let mut next = self.lock()?.clone();
        let value = change(&mut next)?;

        if let Some(path) = self.path.clone() {
            next = blocking(move || json_file::write_json(&path, &next).map(|()| next)).await?;
        }
        *self.lock()? = next;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(value)
    }

    fn auto_id() -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(AUTO_ID_LEN)
            .map(char::from)
            .collect()
    }
}

impl Default for LocalDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for LocalDocumentStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>> {
        self.gate().await?;
        let collections = self.lock()?;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(key))
            .cloned())
    }

    async fn set(&self, collection: &str, key: &str, doc: Document) -> Result<()> {
        self.gate().await?;
        self.write(|collections| {
            collections
                .entry(collection.to_string())
                .or_default()
                .insert(key.to_string(), doc);
            Ok(())
        })
        .await
    }

    async fn update(&self, collection: &str, key: &str, fields: Document) -> Result<()> {
        self.gate().await?;
        self.write(|collections| {
            let doc = collections
                .get_mut(collection)
                .and_then(|docs| docs.get_mut(key))
                .ok_or_else(|| Error::store(format!("no document to update: {}/{}", collection, key)))?;
            doc.extend(fields);
            Ok(())
        })
        .await
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<()> {
        self.gate().await?;
        self.write(|collections| {
            if let Some(docs) = collections.get_mut(collection) {
                docs.remove(key);
            }
            Ok(())
        })
        .await
    }

    async fn insert(&self, collection: &str, doc: Document) -> Result<String> {
        self.gate().await?;
        self.write(|collections| {
            let docs = collections.entry(collection.to_string()).or_default();
            let mut key = Self::auto_id();
            while docs.contains_key(&key) {
                key = Self::auto_id();
            }
            docs.insert(key.clone(), doc);
            Ok(key)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn doc(value: serde_json::Value) -> Document {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let store = LocalDocumentStore::new();
        store
            .set("users", "u1", doc(json!({"email": "a@b.com", "phone": "1"})))
            .await
            .unwrap();
        store
            .update("users", "u1", doc(json!({"name": "Ana"})))
            .await
            .unwrap();

        let stored = store.get("users", "u1").await.unwrap().unwrap();
        assert_eq!(stored["email"], "a@b.com");
        assert_eq!(stored["phone"], "1");
        assert_eq!(stored["name"], "Ana");
    }

    #[tokio::test]
    async fn test_set_replaces_and_update_requires_existing() {
        let store = LocalDocumentStore::new();
        store.set("c", "k", doc(json!({"a": 1, "b": 2}))).await.unwrap();
        store.set("c", "k", doc(json!({"a": 3}))).await.unwrap();
        let stored = store.get("c", "k").await.unwrap().unwrap();
        assert_eq!(stored, doc(json!({"a": 3})));

        let err = store.update("c", "missing", Document::new()).await.unwrap_err();
        assert!(matches!(err, Error::Store(_)));
    }

    #[tokio::test]
    async fn test_insert_assigns_distinct_keys() {
        let store = LocalDocumentStore::new();
        let a = store.insert("posts", doc(json!({"title": "a"}))).await.unwrap();
        let b = store.insert("posts", doc(json!({"title": "b"}))).await.unwrap();
        assert_eq!(a.len(), AUTO_ID_LEN);
        assert_ne!(a, b);
        assert_eq!(store.len("posts"), 2);
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let store = LocalDocumentStore::new();
        store.delete("posts", "nope").await.unwrap();
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let store = LocalDocumentStore::new();
        store.fail_with("offline");
        let err = store.get("c", "k").await.unwrap_err();
        assert_eq!(err.to_string(), "Document store error: offline");

        store.recover();
        assert!(store.get("c", "k").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_delays_calls() {
        let store = LocalDocumentStore::new();
        store.set_latency(Duration::from_millis(250));

        let started = tokio::time::Instant::now();
        store.get("c", "k").await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_persistence_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("documents.json");

        let key = {
            let store = LocalDocumentStore::open(&path).unwrap();
            store.insert("posts", doc(json!({"title": "Dog"}))).await.unwrap()
        };

        let reopened = LocalDocumentStore::open(&path).unwrap();
        let stored = reopened.get("posts", &key).await.unwrap().unwrap();
        assert_eq!(stored["title"], "Dog");
    }

    #[tokio::test]
    async fn test_failed_disk_write_leaves_memory_unchanged() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        let store = LocalDocumentStore::open(sub.join("documents.json")).unwrap();
        let key = store.insert("posts", doc(json!({"title": "Dog"}))).await.unwrap();

        // The data directory turns into a plain file
        std::fs::remove_dir_all(&sub).unwrap();
        std::fs::write(&sub, "").unwrap();

        assert!(store.insert("posts", doc(json!({"title": "Cat"}))).await.is_err());
        assert!(store.set("posts", &key, doc(json!({"title": "Fox"}))).await.is_err());
        assert!(store.delete("posts", &key).await.is_err());

        assert_eq!(store.len("posts"), 1);
        assert_eq!(store.write_count(), 1);
        let stored = store.get("posts", &key).await.unwrap().unwrap();
        assert_eq!(stored["title"], "Dog");
    }
}
