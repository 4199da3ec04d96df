use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use thiserror::Error;
use tokio::{io::AsyncRead, sync::Notify};

pub type Stdin = Box<dyn AsyncRead + Send + Unpin>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone, Error)]
pub enum ExecutionError {
    #[error("time limit exceeded")]
    TimeLimit,

    #[error("process was killed")]
    Killed,

    #[error("failed to spawn '{path}': {source}")]
    Spawn {
        path: String,
        #[source]
        source: Arc<io::Error>,
    },

    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: Arc<io::Error>,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl ExecutionError {
    pub fn io(context: &'static str, source: io::Error) -> Self {
        Self::Io {
            context,
            source: Arc::new(source),
        }
    }

    pub fn is_time_limit(&self) -> bool {
        matches!(self, Self::TimeLimit)
    }
}

/// Runs the program under test once.
///
/// Implementations must stop promptly once `cancel` fires and report an error
/// in that case. They must never return `Ok` with exit code 0 after cancellation.
#[async_trait]
pub trait ProcessExecutor: Send + Sync {
    async fn run(&self, cancel: CancelToken, stdin: Stdin) -> Result<ExecutionResult, ExecutionError>;
}

/// One-shot cancellation signal shared between the batch and a running test.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelState>,
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}
