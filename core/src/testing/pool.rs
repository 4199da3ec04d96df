use std::{
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex, PoisonError},
};

use thiserror::Error;
use tokio::sync::{mpsc, Mutex as AsyncMutex};

pub type Task = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("worker pool has been shut down")]
    ShutDown,
}

/// Executes submitted tasks on a bounded set of workers.
///
/// At most [`worker_count`](WorkerPool::worker_count) tasks run at a time.
/// A panicking task must not take the pool down with it.
pub trait WorkerPool: Send + Sync {
    fn execute(&self, task: Task) -> Result<(), PoolError>;

    fn worker_count(&self) -> usize;
}

tokio::task_local! {
    static WORKER_ID: usize;
}

/// Index of the worker running the current task, if any.
pub fn current_worker_id() -> Option<usize> {
    WORKER_ID.try_with(|id| *id).ok()
}

/// Wraps `fut` so that [`current_worker_id`] inside it reports the calling worker,
/// even when `fut` is spawned as a separate task.
pub fn inherit_worker_id<F: Future>(fut: F) -> impl Future<Output = F::Output> {
    let id = current_worker_id();
    async move {
        match id {
            Some(id) => WORKER_ID.scope(id, fut).await,
            None => fut.await,
        }
    }
}

/// Fixed-size pool of tokio workers sharing a single queue.
#[derive(Debug)]
pub struct ThreadPool {
    worker_count: usize,
    queue: Mutex<Option<mpsc::UnboundedSender<Task>>>,
}

impl ThreadPool {
    /// Spawns `worker_count` workers on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if `worker_count` is zero or if called outside a tokio runtime.
    pub fn new(worker_count: usize) -> Self {
        assert!(worker_count > 0, "worker pool needs at least one worker");

        let (tx, rx) = mpsc::unbounded_channel::<Task>();
        let rx = Arc::new(AsyncMutex::new(rx));
        for id in 0..worker_count {
            let rx = Arc::clone(&rx);
            tokio::spawn(async move {
                loop {
                    let Some(task) = rx.lock().await.recv().await else {
                        break;
                    };
                    if let Err(e) = tokio::spawn(WORKER_ID.scope(id, task)).await {
                        log::error!("Task on worker {} failed: {}", id, e);
                    }
                }
                log::trace!("Worker {} stopped", id);
            });
        }

        Self {
            worker_count,
            queue: Mutex::new(Some(tx)),
        }
    }

    /// Stops accepting tasks. Already queued tasks still run.
    pub fn shutdown(&self) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

impl WorkerPool for ThreadPool {
    fn execute(&self, task: Task) -> Result<(), PoolError> {
        let queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = queue.as_ref() else {
            return Err(PoolError::ShutDown);
        };
        tx.send(task).map_err(|_| PoolError::ShutDown)
    }

    fn worker_count(&self) -> usize {
        self.worker_count
    }
}
