use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::ValidationError;

/// Caller-owned cancellation and deadline for one outbound call.
///
/// The channel layer adds no timeout of its own: without a deadline a call
/// runs until it completes or the token is cancelled.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Drives `fut` until it finishes, the token fires or the deadline passes,
    /// whichever happens first. `fut` is dropped on cancellation.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, ValidationError>
    where
        F: Future<Output = Result<T, ValidationError>>,
    {
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ValidationError::Cancelled),
            _ = deadline => Err(ValidationError::DeadlineExceeded),
            out = fut => out,
        }
    }
}
