//! Configuration management
//!
//! Settings live in `<app_dir>/settings.json`:
//! ```json
//! {
//!   "backend": "firebase",
//!   "cacheKey": "user_data",
//!   "firebase": { "apiKey": "...", "projectId": "...", ... }
//! }
//! ```
//! Fields this crate does not manage are preserved on save, and values
//! that only came from the environment are never written back.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::adapters::firebase::FirebaseOptions;
use crate::adapters::json_file;
use crate::domain::SESSION_KEY;

/// Which adapters back the identity provider and document store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// In-process provider and store, persisted under the app directory
    #[default]
    Local,
    Firebase,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Local => write!(f, "local"),
            Backend::Firebase => write!(f, "firebase"),
        }
    }
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(Backend::Local),
            "firebase" => Ok(Backend::Firebase),
            other => bail!("unknown backend '{}' (expected local or firebase)", other),
        }
    }
}

/// Firebase web-app configuration, as shown in the Firebase console
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirebaseSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messaging_sender_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurement_id: Option<String>,
}

impl FirebaseSettings {
    /// Environment variables overriding each field, in `values` order
    const ENV_VARS: [&'static str; 7] = [
        "FIREBASE_API_KEY",
        "FIREBASE_AUTH_DOMAIN",
        "FIREBASE_PROJECT_ID",
        "FIREBASE_STORAGE_BUCKET",
        "FIREBASE_MESSAGING_SENDER_ID",
        "FIREBASE_APP_ID",
        "FIREBASE_MEASUREMENT_ID",
    ];

    fn values(&self) -> [&Option<String>; 7] {
        [
            &self.api_key,
            &self.auth_domain,
            &self.project_id,
            &self.storage_bucket,
            &self.messaging_sender_id,
            &self.app_id,
            &self.measurement_id,
        ]
    }

    fn values_mut(&mut self) -> [&mut Option<String>; 7] {
        [
            &mut self.api_key,
            &mut self.auth_domain,
            &mut self.project_id,
            &mut self.storage_bucket,
            &mut self.messaging_sender_id,
            &mut self.app_id,
            &mut self.measurement_id,
        ]
    }
}

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    backend: Backend,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cache_key: Option<String>,
    #[serde(default)]
    firebase: FirebaseSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Adopta configuration (settings file plus environment overrides)
#[derive(Debug, Clone)]
pub struct Config {
    pub backend: Backend,
    pub cache_key: String,
    pub firebase: FirebaseSettings,
    pub auth_emulator_host: Option<String>,
    pub firestore_emulator_host: Option<String>,
    /// Firebase values taken from the environment at load time
    from_env: FirebaseSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::Local,
            cache_key: SESSION_KEY.to_string(),
            firebase: FirebaseSettings::default(),
            auth_emulator_host: None,
            firestore_emulator_host: None,
            from_env: FirebaseSettings::default(),
        }
    }
}

impl Config {
    /// Load config from the app directory
    ///
    /// Environment variables win over the settings file:
    /// `ADOPTA_BACKEND`, `FIREBASE_*` and the emulator hosts.
    pub fn load(app_dir: &Path) -> Result<Self> {
        Self::load_with(app_dir, |name| std::env::var(name).ok())
    }

    fn load_with(app_dir: &Path, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let raw = Self::read_settings(app_dir)?;
        let env = |name: &str| env(name).filter(|v| !v.trim().is_empty());

        let backend = match env("ADOPTA_BACKEND") {
            Some(value) => value.parse()?,
            None => raw.backend,
        };

        let mut from_env = FirebaseSettings::default();
        for (name, field) in FirebaseSettings::ENV_VARS.into_iter().zip(from_env.values_mut()) {
            *field = env(name);
        }
        let mut firebase = raw.firebase;
        for (field, value) in firebase.values_mut().into_iter().zip(from_env.values()) {
            if value.is_some() {
                field.clone_from(value);
            }
        }

        Ok(Self {
            backend,
            cache_key: raw
                .cache_key
                .filter(|k| !k.is_empty())
                .unwrap_or_else(|| SESSION_KEY.to_string()),
            firebase,
            auth_emulator_host: env("FIREBASE_AUTH_EMULATOR_HOST"),
            firestore_emulator_host: env("FIRESTORE_EMULATOR_HOST"),
            from_env,
        })
    }

    /// Save config to the app directory, preserving fields we don't manage
    ///
    /// A Firebase value still equal to its environment override keeps
    /// whatever the settings file had, so secrets passed through the
    /// environment stay off disk.
    pub fn save(&self, app_dir: &Path) -> Result<()> {
        let mut settings = Self::read_settings(app_dir)?;

        settings.backend = self.backend;
        settings.cache_key = if self.cache_key == SESSION_KEY {
            None
        } else {
            Some(self.cache_key.clone())
        };
        let mut firebase = self.firebase.clone();
        let sources = self.from_env.values().into_iter().zip(settings.firebase.values());
        for (field, (from_env, from_file)) in firebase.values_mut().into_iter().zip(sources) {
            if from_env.is_some() && field == from_env {
                field.clone_from(from_file);
            }
        }
        settings.firebase = firebase;

        json_file::write_json(&app_dir.join("settings.json"), &settings)?;
        Ok(())
    }

    /// Connection options for the Firebase adapters
    pub fn firebase_options(&self) -> Result<FirebaseOptions> {
        let (Some(api_key), Some(project_id)) = (&self.firebase.api_key, &self.firebase.project_id) else {
            bail!("firebase backend requires firebase.apiKey and firebase.projectId in settings.json");
        };
        Ok(FirebaseOptions {
            api_key: api_key.clone(),
            project_id: project_id.clone(),
            auth_emulator_host: self.auth_emulator_host.clone(),
            firestore_emulator_host: self.firestore_emulator_host.clone(),
        })
    }

    fn read_settings(app_dir: &Path) -> Result<SettingsFile> {
        let settings: Option<SettingsFile> = json_file::read_json(&app_dir.join("settings.json"))?;
        Ok(settings.unwrap_or_default())
    }
}
