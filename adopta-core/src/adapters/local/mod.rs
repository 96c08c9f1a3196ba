//! Local backend: identity, documents and cache without remote services
//!
//! Used by the `local` backend of the CLI (with on-disk persistence) and as
//! test doubles for the ports.

mod cache;
mod identity;
mod store;

pub use cache::MemoryCache;
pub use identity::LocalIdentityProvider;
pub use store::LocalDocumentStore;
