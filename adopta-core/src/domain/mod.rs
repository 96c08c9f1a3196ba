//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with their document mappings - no I/O or external dependencies.

pub mod document;
mod post;
pub mod result;
mod session;
mod user;

pub use document::{Document, POSTS_COLLECTION, USERS_COLLECTION};
pub use post::{Post, PostDraft, PostPatch};
pub use session::{SessionSnapshot, SessionState, SESSION_KEY};
pub use user::User;
