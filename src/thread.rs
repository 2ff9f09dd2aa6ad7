//! Lazily created conversation thread.

use crate::client::ChatBackend;
use crate::error::{Error, Result};
use crate::observability::{THREAD_CREATION_ERRORS, THREAD_CREATIONS};
use crate::types::{SessionToken, ThreadId};

/// The current thread id, created on first use.
#[derive(Debug, Default)]
pub struct ThreadSlot {
    id: Option<ThreadId>,
}

impl ThreadSlot {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached thread id.
    pub fn current(&self) -> Option<&ThreadId> {
        self.id.as_ref()
    }

    /// Returns the cached thread id, creating one if none exists.
    ///
    /// Once a thread exists no further creation request is made until
    /// [`ThreadSlot::reset`].  A failed creation leaves the slot empty and
    /// returns [`Error::ThreadCreation`].
    pub async fn ensure_thread<B>(&mut self, backend: &B, token: &SessionToken) -> Result<ThreadId>
    where
        B: ChatBackend + ?Sized,
    {
        if let Some(id) = &self.id {
            return Ok(id.clone());
        }
        THREAD_CREATIONS.click();
        match backend.create_thread(token).await {
            Ok(id) => {
                tracing::debug!(thread_id = %id, "created thread");
                self.id = Some(id.clone());
                Ok(id)
            }
            Err(err) => {
                THREAD_CREATION_ERRORS.click();
                tracing::warn!(error = %err, "thread creation failed");
                Err(Error::thread_creation(err.to_string()))
            }
        }
    }

    /// Forgets the current thread so the next send opens a new one.
    pub fn reset(&mut self) {
        self.id = None;
    }
}
