use std::ops::Deref;

use tracing::warn;

use crate::error::SourceError;
use crate::traits::HostSession;

/// Closes the wrapped session when dropped, so early returns and errors
/// still release the connection. Call [`SessionGuard::close`] to observe
/// the close result instead.
pub struct SessionGuard {
    inner: Option<Box<dyn HostSession>>,
}

impl SessionGuard {
    pub fn new(session: Box<dyn HostSession>) -> Self {
        Self { inner: Some(session) }
    }

    pub fn close(mut self) -> Result<(), SourceError> {
        match self.inner.take() {
            Some(session) => session.close(),
            None => Ok(()),
        }
    }
}

impl Deref for SessionGuard {
    type Target = dyn HostSession;

    fn deref(&self) -> &Self::Target {
        match self.inner.as_deref() {
            Some(session) => session,
            // only `close` and `drop` take the session, both consume the guard
            None => unreachable!("session guard used after close"),
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Some(session) = self.inner.take() {
            let host = session.host().clone();
            if let Err(e) = session.close() {
                warn!("closing session to {} failed: {}", host, e);
            }
        }
    }
}
