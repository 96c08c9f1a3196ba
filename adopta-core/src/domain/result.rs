//! Result and error types for the core library

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core library error type
///
/// Every public session and post operation returns one of these instead of a
/// bare success flag, so callers can tell a precondition failure apart from
/// a provider rejection or a store outage.
#[derive(Error, Debug)]
pub enum Error {
    /// The identity provider rejected the request (bad credentials,
    /// duplicate account, malformed email, expired token...)
    #[error("Identity provider error: {0}")]
    Provider(String),

    /// An authenticated subject (or a key) has no backing document
    #[error("Missing document: {collection}/{key}")]
    MissingDocument { collection: String, key: String },

    #[error("Document store error: {0}")]
    Store(String),

    /// Operation requires a signed-in user and there is none
    #[error("No active session")]
    NoActiveSession,

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Create an identity provider error
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    /// Create a document store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a cache error
    pub fn cache(msg: impl Into<String>) -> Self {
        Self::Cache(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a missing document error
    pub fn missing_document(collection: impl Into<String>, key: impl Into<String>) -> Self {
        Self::MissingDocument {
            collection: collection.into(),
            key: key.into(),
        }
    }

    /// True for failures detected before any network call was made
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::NoActiveSession | Self::Validation(_))
    }

    pub fn is_provider(&self) -> bool {
        matches!(self, Self::Provider(_))
    }

    pub fn is_missing_document(&self) -> bool {
        matches!(self, Self::MissingDocument { .. })
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Operation result with optional context (for JSON / FFI serialization)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub context: Option<HashMap<String, serde_json::Value>>,
}

impl<T> OperationResult<T> {
    /// Create a successful result
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            context: None,
        }
    }

    /// Create a failed result
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            context: None,
        }
    }

    /// Create a failed result with context
    pub fn fail_with_context(
        error: impl Into<String>,
        context: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            context: Some(context),
        }
    }
}

/// Error kind tag carried in `context["kind"]` of a failed result
fn error_kind(error: &Error) -> &'static str {
    match error {
        Error::Provider(_) => "provider",
        Error::MissingDocument { .. } => "missing_document",
        Error::Store(_) => "store",
        Error::NoActiveSession => "no_active_session",
        Error::Cache(_) => "cache",
        Error::Config(_) => "config",
        Error::Validation(_) => "validation",
        Error::Io(_) => "io",
        Error::Json(_) => "json",
        Error::Http(_) => "http",
    }
}

impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => {
                let mut context = HashMap::new();
                context.insert("kind".to_string(), serde_json::Value::from(error_kind(&e)));
                Self::fail_with_context(e.to_string(), context)
            }
        }
    }
}
