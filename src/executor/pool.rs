//! Bounded Worker Pool
//!
//! Jobs go through a bounded queue to a set of long-lived workers. Each worker runs its job on a
//! separate task and awaits it, so a panicking job only loses its own result.
//!
//! ## Submission Policy
//! 1. **Queue has room**: the job is queued.
//! 2. **Queue full, below `max_workers`**: an extra worker starts with the job as its first task.
//! 3. **Queue full, at `max_workers`**: the job is rejected with `PoolError::Saturated`.
//!
//! ## Pool Kinds
//! A `Cpu` pool drives every job to completion on the blocking thread pool, so long computations
//! never stall the async workers. An `Io` pool polls its jobs as ordinary tasks.

use super::types::{PoolKind, PoolSettings};
use crate::error::PoolError;
use crate::telemetry;

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};

type Job = Pin<Box<dyn Future<Output = ()> + Send>>;

pub struct WorkerPool {
    name: String,
    kind: PoolKind,
    settings: PoolSettings,
    /// `None` once shut down.
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<Job>>>,
    live_workers: Arc<AtomicUsize>,
}

impl WorkerPool {
    /// Starts the core workers. Must be called inside a Tokio runtime.
    pub fn new(name: impl Into<String>, kind: PoolKind, settings: PoolSettings) -> Arc<Self> {
        let name = name.into();
        let core = settings.core_workers.max(1);
        let settings = PoolSettings {
            core_workers: core,
            max_workers: settings.max_workers.max(core),
            queue_capacity: settings.queue_capacity.max(1),
            keep_alive_ms: settings.keep_alive_ms,
        };

        let (sender, receiver) = mpsc::channel(settings.queue_capacity);
        let pool = Arc::new(Self {
            name,
            kind,
            settings,
            sender: Mutex::new(Some(sender)),
            receiver: Arc::new(tokio::sync::Mutex::new(receiver)),
            live_workers: Arc::new(AtomicUsize::new(0)),
        });

        for worker_id in 0..core {
            pool.live_workers.fetch_add(1, Ordering::SeqCst);
            pool.spawn_worker(worker_id, None, None);
        }

        tracing::info!(
            pool = %pool.name,
            kind = %kind,
            core = settings.core_workers,
            max = settings.max_workers,
            queue = settings.queue_capacity,
            "worker pool started"
        );

        pool
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PoolKind {
        self.kind
    }

    pub fn settings(&self) -> PoolSettings {
        self.settings
    }

    pub fn live_workers(&self) -> usize {
        self.live_workers.load(Ordering::SeqCst)
    }

    /// Runs `fut` on a pool worker and returns its output.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, PoolError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = match self.kind {
            PoolKind::Io => Box::pin(async move {
                let _ = tx.send(fut.await);
            }),
            PoolKind::Cpu => {
                let handle = tokio::runtime::Handle::current();
                Box::pin(async move {
                    let _ = tokio::task::spawn_blocking(move || {
                        let _ = tx.send(handle.block_on(fut));
                    })
                    .await;
                })
            }
        };
        self.submit(job)?;

        rx.await.map_err(|_| PoolError::WorkerLost {
            pool: self.name.clone(),
        })
    }

    /// Runs a synchronous closure through the pool on the blocking thread pool.
    pub async fn run_blocking<F, T>(&self, f: F) -> Result<T, PoolError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        if self.kind == PoolKind::Cpu {
            return self.run(async move { f() }).await;
        }

        let joined = self
            .run(async move { tokio::task::spawn_blocking(f).await })
            .await?;

        joined.map_err(|_| PoolError::WorkerLost {
            pool: self.name.clone(),
        })
    }

    /// Stops accepting jobs. Queued jobs still run, then the workers exit.
    pub fn shutdown(&self) {
        if let Ok(mut sender) = self.sender.lock() {
            if sender.take().is_some() {
                tracing::info!(pool = %self.name, "worker pool shutting down");
            }
        }
    }

    fn submit(&self, job: Job) -> Result<(), PoolError> {
        let guard = self.sender.lock().map_err(|_| self.shut_down())?;
        let sender = guard.as_ref().ok_or_else(|| self.shut_down())?;

        match sender.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(job)) => {
                if self.reserve_extra_worker() {
                    let worker_id = self.live_workers();
                    tracing::debug!(pool = %self.name, worker_id, "queue full, adding worker");
                    self.spawn_worker(worker_id, Some(job), Some(self.settings.keep_alive()));
                    Ok(())
                } else {
                    telemetry::record_pool_rejection(&self.name);
                    tracing::warn!(pool = %self.name, "pool saturated, rejecting job");
                    Err(PoolError::Saturated {
                        pool: self.name.clone(),
                        workers: self.settings.max_workers,
                        capacity: self.settings.queue_capacity,
                    })
                }
            }
            Err(TrySendError::Closed(_)) => Err(self.shut_down()),
        }
    }

    fn shut_down(&self) -> PoolError {
        telemetry::record_pool_rejection(&self.name);
        PoolError::ShutDown {
            pool: self.name.clone(),
        }
    }

    fn reserve_extra_worker(&self) -> bool {
        let max = self.settings.max_workers;
        self.live_workers
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |live| {
                (live < max).then_some(live + 1)
            })
            .is_ok()
    }

    /// The caller has already counted the worker in `live_workers`.
    fn spawn_worker(&self, worker_id: usize, first: Option<Job>, idle_timeout: Option<Duration>) {
        let name = self.name.clone();
        let receiver = self.receiver.clone();
        let live_workers = self.live_workers.clone();

        tokio::spawn(async move {
            worker_loop(&name, worker_id, receiver, first, idle_timeout).await;
            live_workers.fetch_sub(1, Ordering::SeqCst);
        });
    }
}

async fn worker_loop(
    pool: &str,
    worker_id: usize,
    receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<Job>>>,
    first: Option<Job>,
    idle_timeout: Option<Duration>,
) {
    tracing::trace!(pool, worker_id, "worker started");

    if let Some(job) = first {
        run_job(pool, worker_id, job).await;
    }

    loop {
        let next = async { receiver.lock().await.recv().await };
        let job = match idle_timeout {
            None => next.await,
            Some(timeout) => match tokio::time::timeout(timeout, next).await {
                Ok(job) => job,
                Err(_) => {
                    tracing::debug!(pool, worker_id, "idle extra worker exiting");
                    break;
                }
            },
        };

        match job {
            Some(job) => run_job(pool, worker_id, job).await,
            None => break,
        }
    }

    tracing::trace!(pool, worker_id, "worker stopped");
}

async fn run_job(pool: &str, worker_id: usize, job: Job) {
    if let Err(err) = tokio::spawn(job).await {
        tracing::error!(pool, worker_id, error = %err, "job panicked");
    }
}
