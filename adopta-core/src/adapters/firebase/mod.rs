//! Firebase backend over the public REST APIs
//!
//! - Identity Toolkit / Secure Token for the IdentityProvider port
//! - Cloud Firestore v1 documents API for the DocumentStore port
//!
//! Emulator hosts (`FIREBASE_AUTH_EMULATOR_HOST`, `FIRESTORE_EMULATOR_HOST`)
//! switch the endpoints to plain HTTP on the given host.

mod auth;
mod firestore;
pub mod value;

pub use auth::FirebaseAuth;
pub use firestore::FirestoreStore;

use reqwest::Response;
use serde::Deserialize;
use url::Url;

use crate::domain::result::{Error, Result};

const IDENTITY_TOOLKIT_HOST: &str = "identitytoolkit.googleapis.com";
const SECURE_TOKEN_HOST: &str = "securetoken.googleapis.com";
const FIRESTORE_HOST: &str = "firestore.googleapis.com";

/// Connection settings for one Firebase project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirebaseOptions {
    pub api_key: String,
    pub project_id: String,
    pub auth_emulator_host: Option<String>,
    pub firestore_emulator_host: Option<String>,
}

impl FirebaseOptions {
    pub fn new(api_key: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            project_id: project_id.into(),
            auth_emulator_host: None,
            firestore_emulator_host: None,
        }
    }

    /// Base for `accounts:*` calls, ending in `/v1/`
    pub fn identity_toolkit_base(&self) -> Result<Url> {
        self.auth_base(IDENTITY_TOOLKIT_HOST)
    }

    /// Base for token refresh, ending in `/v1/`
    pub fn secure_token_base(&self) -> Result<Url> {
        self.auth_base(SECURE_TOKEN_HOST)
    }

    fn auth_base(&self, service: &str) -> Result<Url> {
        let raw = match &self.auth_emulator_host {
            Some(host) => format!("http://{}/{}/v1/", host, service),
            None => format!("https://{}/v1/", service),
        };
        parse_url(&raw)
    }

    /// Base for the documents API, ending in `/v1/`
    pub fn firestore_base(&self) -> Result<Url> {
        let raw = match &self.firestore_emulator_host {
            Some(host) => format!("http://{}/v1/", host),
            None => format!("https://{}/v1/", FIRESTORE_HOST),
        };
        parse_url(&raw)
    }
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| Error::config(format!("invalid Firebase endpoint {}: {}", raw, e)))
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Extract the `error.message` (and status) of a failed Google API call
async fn api_error_message(response: Response) -> String {
    let code = response.status();
    match response.json::<ApiErrorBody>().await {
        Ok(body) => match body.error.status {
            Some(status) => format!("{}: {}", status, body.error.message),
            None => body.error.message,
        },
        Err(_) => format!("HTTP {}", code),
    }
}
