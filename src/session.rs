//! Session token acquisition and validation.
//!
//! A [`SessionContext`] is the explicit owner of the client's bearer token.  It
//! is initialised once at startup through [`SessionContext::ensure_session`]
//! and cleared on logout; nothing else reads the token from storage.

use crate::client::ChatBackend;
use crate::error::{Error, Result};
use crate::observability::{SESSION_AUTHENTICATIONS, SESSION_FAILURES, SESSION_VALIDATIONS};
use crate::storage::{SESSION_TOKEN_KEY, Storage};
use crate::types::SessionToken;

/// Holds the live session token, if any.
#[derive(Debug, Default)]
pub struct SessionContext {
    token: Option<SessionToken>,
}

impl SessionContext {
    /// Creates a context with no token.
    pub fn new() -> Self {
        Self::default()
    }

    /// The live token.
    pub fn token(&self) -> Option<&SessionToken> {
        self.token.as_ref()
    }

    /// Returns true once a token has been obtained.
    pub fn is_ready(&self) -> bool {
        self.token.is_some()
    }

    /// Makes sure a valid token is held.
    ///
    /// A stored token is checked against the service first.  When there is
    /// none, or the service rejects it (any failure counts as a rejection), a
    /// fresh token is requested and persisted over the old one.  If that also
    /// fails the context is left without a token.
    pub async fn ensure_session<B>(
        &mut self,
        backend: &B,
        storage: &mut dyn Storage,
    ) -> Result<SessionToken>
    where
        B: ChatBackend + ?Sized,
    {
        let stored = match storage.get(SESSION_TOKEN_KEY) {
            Ok(stored) => stored.filter(|t| !t.is_empty()).map(SessionToken::new),
            Err(err) => {
                tracing::warn!(error = %err, "could not read stored session token");
                None
            }
        };

        if let Some(token) = stored {
            SESSION_VALIDATIONS.click();
            match backend.check_token(&token).await {
                Ok(()) => {
                    tracing::debug!("stored session token is valid");
                    self.token = Some(token.clone());
                    return Ok(token);
                }
                Err(err) => {
                    tracing::info!(error = %err, "stored session token rejected");
                }
            }
        }

        SESSION_AUTHENTICATIONS.click();
        match backend.authenticate().await {
            Ok(token) => {
                if let Err(err) = storage.set(SESSION_TOKEN_KEY, token.as_str()) {
                    tracing::warn!(error = %err, "could not persist session token");
                }
                tracing::info!("obtained new session token");
                self.token = Some(token.clone());
                Ok(token)
            }
            Err(err) => {
                SESSION_FAILURES.click();
                tracing::warn!(error = %err, "authentication failed");
                self.token = None;
                Err(Error::authentication(format!(
                    "could not obtain a session token: {err}"
                )))
            }
        }
    }

    /// Forgets the token in memory and in storage.
    pub fn clear(&mut self, storage: &mut dyn Storage) -> Result<()> {
        self.token = None;
        storage.remove(SESSION_TOKEN_KEY)
    }
}
