//! Schemaless document representation shared by the store port and entities

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use super::result::{Error, Result};

/// Collection holding one profile document per subject id
pub const USERS_COLLECTION: &str = "users";

/// Collection holding adoption listings
pub const POSTS_COLLECTION: &str = "posts";

/// A document's fields, as stored under `(collection, key)`
pub type Document = Map<String, JsonValue>;

/// Serialize an entity into document fields
///
/// Fails if the value does not serialize to a JSON object.
pub fn to_document<T: Serialize>(value: &T) -> Result<Document> {
    match serde_json::to_value(value)? {
        JsonValue::Object(map) => Ok(map),
        other => Err(Error::validation(format!(
            "expected an object document, got {}",
            other
        ))),
    }
}

/// Deserialize document fields into an entity
pub fn from_document<T: DeserializeOwned>(doc: Document) -> Result<T> {
    Ok(serde_json::from_value(JsonValue::Object(doc))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Pet {
        name: String,
    }

    #[test]
    fn test_to_document_requires_object() {
        let doc = to_document(&Pet { name: "Rex".into() }).unwrap();
        assert_eq!(doc["name"], "Rex");

        let err = to_document(&"just a string").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_from_document() {
        let mut doc = Document::new();
        doc.insert("name".into(), "Mel".into());
        let pet: Pet = from_document(doc).unwrap();
        assert_eq!(pet, Pet { name: "Mel".into() });
    }
}
