//! Local identity provider - credential checks without a remote service
//!
//! Passwords are stored as Argon2id hashes with a per-account random salt;
//! hashing runs on the blocking pool. With a persistence path, accounts and
//! the signed-in subject survive restarts, so a new process is restored
//! into the same provider session the way a hosted provider restores its
//! own. Changes are written to disk before they are applied or announced.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use async_trait::async_trait;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use tracing::debug;
use uuid::Uuid;

use crate::adapters::{blocking, json_file};
use crate::domain::result::{Error, Result};
use crate::ports::{IdentityProvider, SubjectId};

/// Argon2 parameters: interactive-login cost, not at-rest key derivation
const MEMORY_COST_KIB: u32 = 4096;
const TIME_COST: u32 = 2;
const PARALLELISM: u32 = 1;
const HASH_LEN: usize = 32;

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Account {
    subject: SubjectId,
    salt: String,
    hash: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct IdentityFile {
    #[serde(default)]
    accounts: HashMap<String, Account>,
    #[serde(default)]
    current: Option<SubjectId>,
}

/// In-process identity provider
pub struct LocalIdentityProvider {
    /// Held across the disk write, so persisted changes land in order
    accounts: Mutex<HashMap<String, Account>>,
    session: watch::Sender<Option<SubjectId>>,
    path: Option<PathBuf>,
    min_password_len: usize,
    fail_sign_out: AtomicBool,
}

impl LocalIdentityProvider {
    /// Provider with no persistence and nobody signed in
    pub fn new() -> Self {
        Self::from_parts(IdentityFile::default(), None)
    }

    /// Provider backed by a JSON file, restoring any persisted session
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file: IdentityFile = json_file::read_json(&path)?.unwrap_or_default();
        Ok(Self::from_parts(file, Some(path)))
    }

    fn from_parts(file: IdentityFile, path: Option<PathBuf>) -> Self {
        let (session, _) = watch::channel(file.current);
        Self {
            accounts: Mutex::new(file.accounts),
            session,
            path,
            min_password_len: 1,
            fail_sign_out: AtomicBool::new(false),
        }
    }

    /// Reject passwords shorter than `len` characters as weak
    pub fn with_min_password_len(mut self, len: usize) -> Self {
        self.min_password_len = len.max(1);
        self
    }

    /// Make `sign_out` fail, for exercising provider outages
    pub fn fail_sign_out(&self, fail: bool) {
        self.fail_sign_out.store(fail, Ordering::SeqCst);
    }

    pub fn current_subject(&self) -> Option<SubjectId> {
        self.session.borrow().clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.session.receiver_count()
    }

    /// End the session from the provider side, as a token expiry or
    /// revocation would, notifying subscribers
    pub async fn expire_session(&self) -> Result<()> {
        debug!("Local provider session expired");
        self.set_session(None).await
    }

    fn derive_hash(password: &str, salt: &[u8]) -> Result<String> {
        let params = argon2::Params::new(MEMORY_COST_KIB, TIME_COST, PARALLELISM, Some(HASH_LEN))
            .map_err(|e| Error::provider(format!("invalid argon2 params: {}", e)))?;
        let argon2 = argon2::Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

        let mut hash = vec![0u8; HASH_LEN];
        argon2
            .hash_password_into(password.as_bytes(), salt, &mut hash)
            .map_err(|e| Error::provider(format!("failed to hash password: {}", e)))?;
        Ok(hex::encode(hash))
    }

    async fn hash_password(password: &str, salt: Vec<u8>) -> Result<String> {
        let password = password.to_string();
        blocking(move || Self::derive_hash(&password, &salt)).await
    }

    fn normalize_email(email: &str) -> Result<String> {
        let email = email.trim().to_lowercase();
        if !email_pattern().is_match(&email) {
            return Err(Error::provider("invalid-email"));
        }
        Ok(email)
    }

    async fn set_session(&self, subject: Option<SubjectId>) -> Result<()> {
        let accounts = self.accounts.lock().await;
        self.save(&accounts, &subject).await?;
        self.session.send_replace(subject);
        Ok(())
    }

    async fn save(&self, accounts: &HashMap<String, Account>, current: &Option<SubjectId>) -> Result<()> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };
        let file = IdentityFile {
            accounts: accounts.clone(),
            current: current.clone(),
        };
        blocking(move || json_file::write_json(&path, &file)).await
    }
}

impl Default for LocalIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    fn name(&self) -> &str {
        "local"
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<SubjectId> {
        let email = Self::normalize_email(email)?;
        let account = self
            .accounts
            .lock()
            .await
            .get(&email)
            .cloned()
            .ok_or_else(|| Error::provider("invalid-credential"))?;

        let salt = hex::decode(&account.salt)
            .map_err(|e| Error::provider(format!("corrupt account salt: {}", e)))?;
        if Self::hash_password(password, salt).await? != account.hash {
            return Err(Error::provider("invalid-credential"));
        }

        self.set_session(Some(account.subject.clone())).await?;
        Ok(account.subject)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SubjectId> {
        let email = Self::normalize_email(email)?;
        if password.chars().count() < self.min_password_len {
            return Err(Error::provider("weak-password"));
        }

        let salt: [u8; 16] = rand::thread_rng().gen();
        let account = Account {
            subject: Uuid::new_v4().simple().to_string(),
            salt: hex::encode(salt),
            hash: Self::hash_password(password, salt.to_vec()).await?,
        };
        let subject = Some(account.subject.clone());

        let mut accounts = self.accounts.lock().await;
        if accounts.contains_key(&email) {
            return Err(Error::provider("email-already-in-use"));
        }
        let mut next = accounts.clone();
        next.insert(email, account.clone());

        self.save(&next, &subject).await?;
        *accounts = next;
        self.session.send_replace(subject);
        Ok(account.subject)
    }

    async fn sign_out(&self) -> Result<()> {
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(Error::provider("network-request-failed"));
        }
        self.set_session(None).await
    }

    fn subscribe(&self) -> watch::Receiver<Option<SubjectId>> {
        self.session.subscribe()
    }
}
