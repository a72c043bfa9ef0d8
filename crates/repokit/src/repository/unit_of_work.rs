use std::fmt;
use std::sync::Mutex;

use futures_util::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use repokit_core::storage::{Session, Store};

use super::scope::close;
use super::{RepositoryError, Result};

/// Continuation run once the unit of work has committed.
pub type AfterCommit =
    Box<dyn FnOnce(CancellationToken) -> BoxFuture<'static, Result<()>> + Send + 'static>;

/// A caller-owned session shared by several repository writes.
///
/// Repositories handed a unit of work stage their writes in its session and
/// register their cache refresh with [`after_commit`](Self::after_commit)
/// instead of running it. The repository never commits or closes the session;
/// the owner ends it with [`commit`](Self::commit) or
/// [`rollback`](Self::rollback).
pub struct UnitOfWork<S: Store> {
    session: S::Session,
    after_commit: Mutex<Vec<AfterCommit>>,
}

impl<S: Store> UnitOfWork<S> {
    /// Opens a session on `store` and wraps it.
    pub async fn begin(store: &S) -> Result<Self> {
        Ok(Self::new(store.begin().await?))
    }

    pub fn new(session: S::Session) -> Self {
        Self {
            session,
            after_commit: Mutex::new(Vec::new()),
        }
    }

    pub fn session(&self) -> &S::Session {
        &self.session
    }

    /// Registers a continuation. Continuations are not deduplicated: each
    /// registration runs once, in registration order.
    pub fn after_commit(&self, continuation: AfterCommit) {
        self.continuations().push(continuation);
    }

    /// Number of continuations waiting for commit.
    pub fn pending(&self) -> usize {
        self.continuations().len()
    }

    /// Commits and closes the session, then runs every continuation.
    ///
    /// A failed commit rolls back, closes and drops the continuations. Once the
    /// commit succeeded every continuation still runs; the first failure among
    /// them is returned as [`RepositoryError::PostCommit`].
    pub async fn commit(self, cancel: &CancellationToken) -> Result<()> {
        let continuations = std::mem::take(&mut *self.continuations());

        if let Err(err) = self.session.commit().await {
            if let Err(rollback_err) = self.session.rollback().await {
                tracing::warn!(error = %rollback_err, "Rollback after failed commit failed");
            }
            close(self.session).await;
            return Err(err.into());
        }
        close(self.session).await;

        let mut first_failure = None;
        for continuation in continuations {
            if let Err(err) = continuation(cancel.clone()).await {
                tracing::warn!(error = %err, "After-commit continuation failed");
                first_failure.get_or_insert(err);
            }
        }

        match first_failure {
            Some(err) => Err(RepositoryError::PostCommit(Box::new(err))),
            None => Ok(()),
        }
    }

    /// Discards the staged writes and the continuations, then closes the session.
    pub async fn rollback(self) -> Result<()> {
        let dropped = std::mem::take(&mut *self.continuations()).len();
        let outcome = self.session.rollback().await;
        close(self.session).await;
        tracing::debug!(continuations = dropped, "Unit of work rolled back");
        Ok(outcome?)
    }

    fn continuations(&self) -> std::sync::MutexGuard<'_, Vec<AfterCommit>> {
        // A poisoned list is still a valid list of boxed closures.
        self.after_commit
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<S: Store> fmt::Debug for UnitOfWork<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}
