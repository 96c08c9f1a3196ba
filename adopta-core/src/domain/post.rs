//! Adoption listing domain model

use serde::{Deserialize, Serialize};

use super::document::{from_document, to_document, Document};
use super::result::Result;

/// One adoption listing as stored in the `posts` collection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Document key, assigned by the store; not a stored field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    /// Animal name
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Image reference or URL
    #[serde(default)]
    pub image: String,
    /// Category / gender tag
    #[serde(default)]
    pub genero: String,
    /// Adopted flag; only ever moves false -> true through `mark_adopted`
    #[serde(default)]
    pub adotado: bool,
    /// Subject id of the session that created the listing
    #[serde(default)]
    pub user_id: String,
}

impl Post {
    pub fn from_document(doc: Document, key: &str) -> Result<Self> {
        let mut post: Post = from_document(doc)?;
        post.id = Some(key.to_string());
        Ok(post)
    }

    /// Stored fields; the key never travels inside the document
    pub fn to_document(&self) -> Result<Document> {
        let mut doc = to_document(self)?;
        doc.remove("id");
        Ok(doc)
    }
}

/// Caller input for a new listing
///
/// Has no `user_id` or `id`: ownership comes from the active session and the
/// key from the store, never from the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub genero: String,
    #[serde(default)]
    pub adotado: Option<bool>,
}

impl PostDraft {
    pub fn new(title: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Stamp the draft with its owner; `adotado` defaults to false
    pub fn into_post(self, user_id: impl Into<String>) -> Post {
        Post {
            id: None,
            title: self.title,
            name: self.name,
            description: self.description,
            image: self.image,
            genero: self.genero,
            adotado: self.adotado.unwrap_or(false),
            user_id: user_id.into(),
        }
    }
}

/// Partial edit of a listing; unset fields are left untouched at the store
///
/// Identity-bearing fields (`id`, `user_id`) cannot be expressed here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genero: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adotado: Option<bool>,
}

impl PostPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Only the named fields
    pub fn to_document(&self) -> Result<Document> {
        to_document(self)
    }
}
