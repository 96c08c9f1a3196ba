//! User domain model

use std::fmt;

use serde::{Deserialize, Serialize};

use super::document::{from_document, to_document, Document};
use super::result::Result;

/// An authenticated account's profile
///
/// `password` is write-only: it is accepted as sign-up input but never
/// serialized, so it cannot reach the document store or the session cache.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    /// Subject id issued by the identity provider; immutable once assigned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl User {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Profile for a freshly created account: the supplied profile fields
    /// plus the provider-issued subject id, minus the password
    pub fn for_new_account(data: &User, subject: &str) -> Self {
        Self {
            email: data.email.clone(),
            id: Some(subject.to_string()),
            password: None,
            name: data.name.clone(),
            phone: data.phone.clone(),
        }
    }

    /// Compose a user from its profile document; the key is authoritative
    /// for `id` even if the document carries a different one
    pub fn from_document(mut doc: Document, subject: &str) -> Result<Self> {
        doc.insert("id".to_string(), subject.into());
        from_document(doc)
    }

    pub fn to_document(&self) -> Result<Document> {
        to_document(self)
    }

    /// Copy with the password dropped
    pub fn without_password(&self) -> Self {
        Self {
            password: None,
            ..self.clone()
        }
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("email", &self.email)
            .field("id", &self.id)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("name", &self.name)
            .field("phone", &self.phone)
            .finish()
    }
}
