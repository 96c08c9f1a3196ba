//! Firebase Authentication over the Identity Toolkit REST API
//!
//! Email/password sign-up and sign-in return an ID token plus a refresh
//! token. The ID token is refreshed through the Secure Token API shortly
//! before it expires. A refresh the service rejects ends the session and
//! is announced to subscribers as a sign-out.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::{watch, Mutex};
use tracing::{debug, warn};
use url::Url;

use super::{api_error_message, FirebaseOptions};
use crate::adapters::{blocking, json_file};
use crate::domain::result::{Error, Result};
use crate::ports::{IdentityProvider, SubjectId};

/// Refresh this long before the service-side expiry
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Credentials {
    subject: SubjectId,
    id_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl Credentials {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > now
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordAuthResponse {
    local_id: String,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

/// The Secure Token API answers in snake_case
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    user_id: String,
}

fn expiry(expires_in: &str) -> Result<DateTime<Utc>> {
    let secs: i64 = expires_in
        .parse()
        .map_err(|_| Error::provider(format!("unexpected token lifetime: {}", expires_in)))?;
    Ok(Utc::now() + Duration::seconds(secs))
}

/// Identity provider backed by Firebase Authentication
pub struct FirebaseAuth {
    http: Client,
    options: FirebaseOptions,
    credentials: Mutex<Option<Credentials>>,
    session: watch::Sender<Option<SubjectId>>,
    path: Option<PathBuf>,
}

impl FirebaseAuth {
    pub fn new(options: FirebaseOptions) -> Self {
        let (session, _) = watch::channel(None);
        Self {
            http: Client::new(),
            options,
            credentials: Mutex::new(None),
            session,
            path: None,
        }
    }

    /// Keep credentials in a JSON file so a restart resumes the session
    pub fn with_persistence(mut self, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let stored: Option<Credentials> = json_file::read_json(&path)?;
        if let Some(credentials) = &stored {
            debug!(subject = %credentials.subject, "Restored Firebase session");
        }
        self.session.send_replace(stored.as_ref().map(|c| c.subject.clone()));
        self.credentials = Mutex::new(stored);
        self.path = Some(path);
        Ok(self)
    }

    pub fn options(&self) -> &FirebaseOptions {
        &self.options
    }

    /// Current ID token, refreshed when close to expiry
    ///
    /// `None` when nobody is signed in. A rejected refresh clears the
    /// session, notifies subscribers and returns the provider error.
    pub async fn id_token(&self) -> Result<Option<String>> {
        let mut guard = self.credentials.lock().await;
        let Some(current) = guard.as_ref() else {
            return Ok(None);
        };
        if current.is_fresh(Utc::now()) {
            return Ok(Some(current.id_token.clone()));
        }

        match self.refresh(&current.refresh_token).await {
            Ok(refreshed) => {
                let token = refreshed.id_token.clone();
                self.save(Some(&refreshed)).await;
                *guard = Some(refreshed);
                Ok(Some(token))
            }
            Err(e) => {
                warn!(error = %e, "Firebase token refresh failed, ending session");
                *guard = None;
                self.save(None).await;
                self.session.send_replace(None);
                Err(e)
            }
        }
    }

    fn endpoint(&self, base: Url, method: &str) -> Result<Url> {
        let mut url = base
            .join(method)
            .map_err(|e| Error::config(format!("invalid Firebase endpoint: {}", e)))?;
        url.query_pairs_mut().append_pair("key", &self.options.api_key);
        Ok(url)
    }

    async fn password_request(&self, method: &str, email: &str, password: &str) -> Result<Credentials> {
        let url = self.endpoint(self.options.identity_toolkit_base()?, method)?;
        let response = self
            .http
            .post(url)
            .json(&json!({
                "email": email,
                "password": password,
                "returnSecureToken": true,
            }))
            .send()
            .await
            .map_err(|e| Error::provider(format!("network-request-failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::provider(api_error_message(response).await));
        }

        let body: PasswordAuthResponse = response.json().await?;
        Ok(Credentials {
            expires_at: expiry(&body.expires_in)?,
            subject: body.local_id,
            id_token: body.id_token,
            refresh_token: body.refresh_token,
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Credentials> {
        let url = self.endpoint(self.options.secure_token_base()?, "token")?;
        let response = self
            .http
            .post(url)
            .json(&json!({
                "grant_type": "refresh_token",
                "refresh_token": refresh_token,
            }))
            .send()
            .await
            .map_err(|e| Error::provider(format!("network-request-failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::provider(api_error_message(response).await));
        }

        let body: RefreshResponse = response.json().await?;
        Ok(Credentials {
            expires_at: expiry(&body.expires_in)?,
            subject: body.user_id,
            id_token: body.id_token,
            refresh_token: body.refresh_token,
        })
    }

    async fn start_session(&self, credentials: Credentials) -> SubjectId {
        let subject = credentials.subject.clone();
        self.save(Some(&credentials)).await;
        *self.credentials.lock().await = Some(credentials);
        self.session.send_replace(Some(subject.clone()));
        subject
    }

    /// Persistence is best effort; the in-memory session stays authoritative
    async fn save(&self, credentials: Option<&Credentials>) {
        let Some(path) = self.path.clone() else {
            return;
        };
        let credentials = credentials.cloned();
        let target = path.clone();
        let result = blocking(move || match credentials {
            Some(credentials) => json_file::write_json(&target, &credentials),
            None => json_file::remove(&target),
        })
        .await;
        if let Err(e) = result {
            warn!(path = %path.display(), error = %e, "Failed to persist Firebase credentials");
        }
    }
}

#[async_trait]
impl IdentityProvider for FirebaseAuth {
    fn name(&self) -> &str {
        "firebase"
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<SubjectId> {
        let credentials = self
            .password_request("accounts:signInWithPassword", email, password)
            .await?;
        Ok(self.start_session(credentials).await)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SubjectId> {
        let credentials = self.password_request("accounts:signUp", email, password).await?;
        Ok(self.start_session(credentials).await)
    }

    /// Sign-out is local to this client; ID tokens are not revocable
    /// from the client side
    async fn sign_out(&self) -> Result<()> {
        *self.credentials.lock().await = None;
        self.save(None).await;
        self.session.send_replace(None);
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<Option<SubjectId>> {
        self.session.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn credentials(expires_at: DateTime<Utc>) -> Credentials {
        Credentials {
            subject: "uid-1".into(),
            id_token: "id-token".into(),
            refresh_token: "refresh-token".into(),
            expires_at,
        }
    }

    #[test]
    fn test_freshness_margin() {
        let now = Utc::now();
        assert!(credentials(now + Duration::minutes(30)).is_fresh(now));
        assert!(!credentials(now + Duration::seconds(30)).is_fresh(now));
        assert!(!credentials(now - Duration::minutes(1)).is_fresh(now));
    }

    #[test]
    fn test_endpoint_carries_api_key() {
        let auth = FirebaseAuth::new(FirebaseOptions::new("abc123", "adopta"));
        let url = auth
            .endpoint(auth.options().identity_toolkit_base().unwrap(), "accounts:signUp")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://identitytoolkit.googleapis.com/v1/accounts:signUp?key=abc123"
        );
    }

    #[tokio::test]
    async fn test_persisted_credentials_restore_session() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("firebase-auth.json");
        json_file::write_json(&path, &credentials(Utc::now() + Duration::hours(1))).unwrap();

        let auth = FirebaseAuth::new(FirebaseOptions::new("k", "p"))
            .with_persistence(&path)
            .unwrap();
        assert_eq!(*auth.subscribe().borrow(), Some("uid-1".to_string()));
        assert_eq!(auth.id_token().await.unwrap().as_deref(), Some("id-token"));

        auth.sign_out().await.unwrap();
        assert_eq!(*auth.subscribe().borrow(), None);
        assert!(!path.exists());
        assert!(auth.id_token().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_refresh_reports_sign_out() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("firebase-auth.json");
        json_file::write_json(&path, &credentials(Utc::now() - Duration::hours(1))).unwrap();

        // nothing listens on the emulator port, so the refresh fails
        let options = FirebaseOptions {
            auth_emulator_host: Some("127.0.0.1:9".into()),
            ..FirebaseOptions::new("k", "p")
        };
        let auth = FirebaseAuth::new(options).with_persistence(&path).unwrap();
        let mut rx = auth.subscribe();
        rx.borrow_and_update();

        assert!(auth.id_token().await.unwrap_err().is_provider());
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow(), None);
        assert!(!path.exists());
    }
}
