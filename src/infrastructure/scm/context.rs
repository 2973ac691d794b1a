use super::scm_interface::ScmError;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Cancellation and deadline carried by every provider call
///
/// Cloned contexts share the same token, so cancelling any clone aborts
/// every in-flight operation that was handed one of them.
#[derive(Debug, Clone, Default)]
pub struct ScmContext {
    cancellation: CancellationToken,
    deadline: Option<Instant>,
}

impl ScmContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context whose deadline is `timeout` from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancellation: CancellationToken::new(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Attach an externally owned cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Fail fast if the context is already cancelled or past its deadline
    pub fn check(&self) -> Result<(), ScmError> {
        if self.is_cancelled() {
            return Err(ScmError::Cancelled);
        }
        if matches!(self.deadline, Some(deadline) if Instant::now() >= deadline) {
            return Err(ScmError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Run `operation`, aborting it on cancellation or deadline expiry
    pub async fn run<T, F>(&self, operation: F) -> Result<T, ScmError>
    where
        F: Future<Output = Result<T, ScmError>>,
    {
        self.check()?;

        let guarded = async {
            tokio::select! {
                biased;
                _ = self.cancellation.cancelled() => Err(ScmError::Cancelled),
                result = operation => result,
            }
        };

        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, guarded)
                .await
                .unwrap_or(Err(ScmError::DeadlineExceeded)),
            None => guarded.await,
        }
    }
}
