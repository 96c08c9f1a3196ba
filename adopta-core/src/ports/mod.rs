//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The core domain
//! depends only on these traits, not on concrete implementations.

mod cache;
mod document_store;
mod identity;

pub use cache::LocalCache;
pub use document_store::DocumentStore;
pub use identity::{IdentityProvider, SubjectId};
