//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod listener;
mod post;
mod session;
mod session_slot;

pub use listener::AuthListener;
pub use post::PostService;
pub use session::SessionManager;
pub use session_slot::{SessionSlot, SessionWrite};
