//! Worker pool
//!
//! N threads drain one shared FIFO queue. Shutdown is by poison pill: the
//! coordinator enqueues exactly one `Poison` per worker after the last item,
//! so every worker sees exactly one termination signal.
//!
//! The first fatal error cancels the pool. Workers check the cancel flag
//! before each dequeue and again once an item arrives; a job already running
//! finishes, but nothing new starts. A panicking job counts as a fatal error.
//! Only the first recorded error is kept and reported.

use crate::error::{Result, UntzError};
use crate::types::AudioItem;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, trace};

/// Queue entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkItem {
    Track(AudioItem),
    Poison,
}

/// What a worker is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Running,
    Terminated,
}

/// Final accounting once every worker has stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolReport {
    /// Workers started
    pub workers: usize,
    /// Workers that consumed a poison marker
    pub terminated: usize,
    /// Items handled successfully
    pub processed: usize,
}

/// State shared by the coordinator and every worker
struct Shared {
    cancelled: AtomicBool,
    first_error: Mutex<Option<UntzError>>,
    processed: AtomicUsize,
    terminated: AtomicUsize,
}

impl Shared {
    fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            first_error: Mutex::new(None),
            processed: AtomicUsize::new(0),
            terminated: AtomicUsize::new(0),
        }
    }

    /// Record `err` unless something failed first, then cancel
    fn fail(&self, err: UntzError) {
        let mut slot = self
            .first_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.is_none() {
            error!("{}", err);
            *slot = Some(err);
        } else {
            debug!("Suppressed later failure: {}", err);
        }
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn take_error(&self) -> Option<UntzError> {
        self.first_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }
}

/// Fixed-size pool of workers over one FIFO queue
pub struct WorkerPool {
    tx: Sender<WorkItem>,
    workers: Vec<JoinHandle<()>>,
    shared: Arc<Shared>,
}

impl WorkerPool {
    /// Start `size` workers, each running `handler` on the items it dequeues.
    ///
    /// `size` must be at least 1.
    pub fn spawn<F>(size: usize, handler: F) -> Result<Self>
    where
        F: Fn(&Path) -> Result<()> + Send + Sync + 'static,
    {
        if size == 0 {
            return Err(UntzError::ConfigError(
                "worker count must be at least 1".to_string(),
            ));
        }

        let (tx, rx) = unbounded::<WorkItem>();
        let shared = Arc::new(Shared::new());
        let handler = Arc::new(handler);

        let mut workers = Vec::with_capacity(size);
        for id in 0..size {
            let rx = rx.clone();
            let shared = Arc::clone(&shared);
            let handler = Arc::clone(&handler);
            let handle = thread::Builder::new()
                .name(format!("untz-worker-{}", id))
                .spawn(move || worker_loop(id, rx, shared, &*handler))?;
            workers.push(handle);
        }
        debug!("Started {} workers", size);

        Ok(Self {
            tx,
            workers,
            shared,
        })
    }

    /// Number of workers
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Append an item to the queue. Returns false once the pool is cancelled.
    pub fn submit(&self, item: AudioItem) -> bool {
        if self.is_cancelled() {
            return false;
        }
        // Workers hold their receivers until they exit, and they only exit
        // on poison or cancellation, so a send error implies cancellation.
        self.tx.send(WorkItem::Track(item)).is_ok()
    }

    /// Record a coordinator-side failure and cancel the run
    pub fn fail(&self, err: UntzError) {
        self.shared.fail(err);
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::SeqCst)
    }

    /// Signal end of work, wait for every worker, and report.
    ///
    /// Returns the first fatal error if anything failed.
    pub fn finish(self) -> Result<PoolReport> {
        let WorkerPool {
            tx,
            workers,
            shared,
        } = self;

        for _ in 0..workers.len() {
            // Every worker may already be gone after a cancellation
            if tx.send(WorkItem::Poison).is_err() {
                break;
            }
        }
        drop(tx);

        let size = workers.len();
        for handle in workers {
            if let Err(panic_info) = handle.join() {
                shared.fail(UntzError::WorkerPanic(panic_message(&*panic_info)));
            }
        }

        if let Some(err) = shared.take_error() {
            return Err(err);
        }

        let report = PoolReport {
            workers: size,
            terminated: shared.terminated.load(Ordering::SeqCst),
            processed: shared.processed.load(Ordering::SeqCst),
        };
        debug!("Pool drained: {:?}", report);
        Ok(report)
    }
}

fn worker_loop<F>(id: usize, rx: Receiver<WorkItem>, shared: Arc<Shared>, handler: &F)
where
    F: Fn(&Path) -> Result<()>,
{
    let mut state = WorkerState::Idle;
    trace!("worker {} {:?}", id, state);

    while state != WorkerState::Terminated {
        if shared.cancelled.load(Ordering::SeqCst) {
            debug!("worker {} stopping on cancellation", id);
            break;
        }

        match rx.recv() {
            Ok(WorkItem::Track(item)) => {
                // A sibling may have failed while we were blocked in recv
                if shared.cancelled.load(Ordering::SeqCst) {
                    debug!("worker {} dropping {} on cancellation", id, item.display());
                    break;
                }
                state = WorkerState::Running;
                trace!("worker {} {:?} {}", id, state, item.display());
                match panic::catch_unwind(AssertUnwindSafe(|| handler(item.as_path()))) {
                    Ok(Ok(())) => {
                        shared.processed.fetch_add(1, Ordering::SeqCst);
                    }
                    Ok(Err(e)) => shared.fail(e),
                    Err(panic_info) => {
                        shared.fail(UntzError::WorkerPanic(panic_message(&*panic_info)))
                    }
                }
                state = WorkerState::Idle;
            }
            Ok(WorkItem::Poison) => {
                state = WorkerState::Terminated;
                shared.terminated.fetch_add(1, Ordering::SeqCst);
            }
            // Queue closed without a poison marker for us
            Err(_) => break,
        }
    }
    trace!("worker {} exited in {:?}", id, state);
}

fn panic_message(panic_info: &(dyn Any + Send)) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
