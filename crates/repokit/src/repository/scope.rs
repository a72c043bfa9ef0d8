//! Session scoping for calls that run without a unit of work.

use repokit_core::storage::Session;

use super::Result;

/// Commits on success and rolls back on failure, then always closes.
pub(super) async fn finish<T: Session, R>(session: T, outcome: Result<R>) -> Result<R> {
    let outcome = match outcome {
        Ok(value) => session.commit().await.map(|()| value).map_err(Into::into),
        Err(err) => Err(err),
    };

    if let Err(err) = &outcome {
        if let Err(rollback_err) = session.rollback().await {
            tracing::warn!(error = %rollback_err, cause = %err, "Rollback failed");
        }
    }

    close(session).await;
    outcome
}

/// Closes a session whose outcome is already decided, logging failures.
pub(super) async fn close<T: Session>(session: T) {
    if let Err(err) = session.close().await {
        tracing::warn!(error = %err, "Failed to close session");
    }
}
