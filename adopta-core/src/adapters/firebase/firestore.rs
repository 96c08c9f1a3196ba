//! Cloud Firestore over the v1 REST documents API

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value as JsonValue};
use tracing::debug;
use url::Url;

use super::{api_error_message, value, FirebaseAuth};
use crate::domain::result::{Error, Result};
use crate::domain::Document;
use crate::ports::DocumentStore;

fn simple_field_name() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z_0-9]*$").expect("field pattern is valid"))
}

/// Field names outside the simple identifier alphabet must be backtick-quoted
/// in update masks
fn field_path(name: &str) -> String {
    if simple_field_name().is_match(name) {
        name.to_string()
    } else {
        format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

#[derive(Debug, Deserialize)]
struct FirestoreDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, JsonValue>,
}

/// Document store backed by Cloud Firestore, authorized as the signed-in user
pub struct FirestoreStore {
    http: Client,
    auth: Arc<FirebaseAuth>,
    documents: Url,
}

impl FirestoreStore {
    pub fn new(auth: Arc<FirebaseAuth>) -> Result<Self> {
        let options = auth.options();
        let mut documents = options.firestore_base()?;
        documents
            .path_segments_mut()
            .map_err(|_| Error::config("Firestore endpoint cannot be a base URL"))?
            .pop_if_empty()
            .extend([
                "projects",
                options.project_id.as_str(),
                "databases",
                "(default)",
                "documents",
            ]);
        Ok(Self {
            http: Client::new(),
            auth,
            documents,
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.documents.clone();
        url.path_segments_mut()
            .map_err(|_| Error::config("Firestore endpoint cannot be a base URL"))?
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let request = match self.auth.id_token().await? {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        request
            .send()
            .await
            .map_err(|e| Error::store(format!("Firestore request failed: {}", e)))
    }

    async fn failure(response: Response) -> Error {
        Error::store(api_error_message(response).await)
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>> {
        let url = self.url(&[collection, key])?;
        let response = self.send(self.http.get(url)).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let doc: FirestoreDocument = response.json().await?;
                Ok(Some(value::decode_fields(&doc.fields)?))
            }
            _ => Err(Self::failure(response).await),
        }
    }

    async fn set(&self, collection: &str, key: &str, doc: Document) -> Result<()> {
        let url = self.url(&[collection, key])?;
        let body = json!({ "fields": value::encode_fields(&doc) });
        let response = self.send(self.http.patch(url).json(&body)).await?;
        if !response.status().is_success() {
            return Err(Self::failure(response).await);
        }
        debug!(collection, key, "Firestore document written");
        Ok(())
    }

    async fn update(&self, collection: &str, key: &str, fields: Document) -> Result<()> {
        // a PATCH without a mask replaces the whole document
        if fields.is_empty() {
            return match self.get(collection, key).await? {
                Some(_) => Ok(()),
                None => Err(Error::store(format!("no document to update: {}/{}", collection, key))),
            };
        }

        let mut url = self.url(&[collection, key])?;
        {
            let mut query = url.query_pairs_mut();
            for name in fields.keys() {
                query.append_pair("updateMask.fieldPaths", &field_path(name));
            }
            query.append_pair("currentDocument.exists", "true");
        }

        let body = json!({ "fields": value::encode_fields(&fields) });
        let response = self.send(self.http.patch(url).json(&body)).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(Error::store(format!(
                "no document to update: {}/{}",
                collection, key
            ))),
            status if status.is_success() => {
                debug!(collection, key, "Firestore document updated");
                Ok(())
            }
            _ => Err(Self::failure(response).await),
        }
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<()> {
        let url = self.url(&[collection, key])?;
        let response = self.send(self.http.delete(url)).await?;
        if !response.status().is_success() {
            return Err(Self::failure(response).await);
        }
        debug!(collection, key, "Firestore document deleted");
        Ok(())
    }

    async fn insert(&self, collection: &str, doc: Document) -> Result<String> {
        let url = self.url(&[collection])?;
        let body = json!({ "fields": value::encode_fields(&doc) });
        let response = self.send(self.http.post(url).json(&body)).await?;
        if !response.status().is_success() {
            return Err(Self::failure(response).await);
        }

        let created: FirestoreDocument = response.json().await?;
        created
            .name
            .rsplit('/')
            .next()
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .ok_or_else(|| Error::store(format!("unexpected document name: {}", created.name)))
    }
}
