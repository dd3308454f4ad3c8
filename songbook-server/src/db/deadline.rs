//! Deadlines for database work
//!
//! Cancellation is dropping the future; a deadline is a timer that drops it
//! for you. Both surface as [`DbError::DeadlineExceeded`].

use std::future::Future;

use tokio::time::Instant;

use super::error::DbError;

/// Run `fut` until `deadline`. `None` means no limit.
///
/// A deadline that has already passed fails before `fut` is polled, so no
/// statement is sent.
pub async fn within<F>(deadline: Option<Instant>, fut: F) -> Result<F::Output, DbError>
where
    F: Future,
{
    let Some(deadline) = deadline else {
        return Ok(fut.await);
    };

    if Instant::now() >= deadline {
        return Err(DbError::DeadlineExceeded);
    }

    Ok(tokio::time::timeout_at(deadline, fut).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn no_deadline_runs_to_completion() {
        assert_eq!(within(None, async { 42 }).await.unwrap(), 42);
    }

    #[tokio::test]
    async fn expired_deadline_never_polls() {
        let polled = AtomicBool::new(false);
        let deadline = Instant::now();

        let err = within(Some(deadline), async { polled.store(true, Ordering::SeqCst) })
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::DeadlineExceeded));
        assert!(!polled.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_fires_mid_operation() {
        let deadline = Instant::now() + Duration::from_millis(10);

        let err = within(Some(deadline), tokio::time::sleep(Duration::from_secs(60)))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::DeadlineExceeded));
    }

    #[tokio::test(start_paused = true)]
    async fn finishes_before_deadline() {
        let deadline = Instant::now() + Duration::from_secs(1);
        let out = within(Some(deadline), async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            "done"
        })
        .await
        .unwrap();
        assert_eq!(out, "done");
    }
}
