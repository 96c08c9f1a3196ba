//! Session slot - the single current-user cell shared by the services
//!
//! Reads are synchronous snapshots of a watch channel. Writes go through a
//! fair (FIFO) async queue: a mutation holds its `SessionWrite` for the whole
//! operation, network calls included, so two session mutations never
//! interleave and the last one to enter the queue is the last one applied.

use tokio::sync::{watch, Mutex, MutexGuard};

use crate::domain::{SessionSnapshot, SessionState, User};

/// Shared current-user slot
///
/// Owned by the context facade and handed to the session manager and the
/// post service by `Arc`.
pub struct SessionSlot {
    state: watch::Sender<SessionState>,
    queue: Mutex<()>,
}

impl SessionSlot {
    pub fn new() -> Self {
        let (state, _) = watch::channel(SessionState::Unknown);
        Self {
            state,
            queue: Mutex::new(()),
        }
    }

    /// Current state (cloned)
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().snapshot()
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.borrow().user().cloned()
    }

    pub fn is_unknown(&self) -> bool {
        self.state.borrow().is_unknown()
    }

    /// Watch every committed state change
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Wait for this caller's turn in the write queue
    pub async fn begin(&self) -> SessionWrite<'_> {
        let permit = self.queue.lock().await;
        SessionWrite {
            slot: self,
            _permit: permit,
        }
    }
}

impl Default for SessionSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive write access to the slot, released on drop
pub struct SessionWrite<'a> {
    slot: &'a SessionSlot,
    _permit: MutexGuard<'a, ()>,
}

impl SessionWrite<'_> {
    pub fn state(&self) -> SessionState {
        self.slot.state()
    }

    /// Replace the state wholesale and notify watchers
    pub fn set(&mut self, state: SessionState) {
        self.slot.state.send_replace(state);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_starts_unknown_and_unsigned() {
        let slot = SessionSlot::new();
        assert!(slot.is_unknown());
        assert!(!slot.snapshot().signed);
        assert!(slot.current_user().is_none());
    }

    #[tokio::test]
    async fn test_set_notifies_watchers() {
        let slot = SessionSlot::new();
        let mut rx = slot.subscribe();

        let user = User::new("a@b.com").with_id("u1");
        slot.begin().await.set(SessionState::Authenticated(user.clone()));

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().user(), Some(&user));
        assert!(slot.snapshot().signed);
    }

    #[tokio::test]
    async fn test_writes_are_queued_in_order() {
        let slot = Arc::new(SessionSlot::new());
        let first = slot.begin().await;

        let waiting = {
            let slot = Arc::clone(&slot);
            tokio::spawn(async move {
                let mut write = slot.begin().await;
                write.set(SessionState::Anonymous);
            })
        };
        tokio::task::yield_now().await;
        assert!(!waiting.is_finished());
        assert!(slot.is_unknown());

        drop(first);
        waiting.await.unwrap();
        assert_eq!(slot.state(), SessionState::Anonymous);
    }
}
