//! Pipeline orchestration: the worker pool and the coordinator driving it

pub mod orchestrator;
pub mod pool;

pub use orchestrator::{preflight, run, RunSummary};
pub use pool::{PoolReport, WorkItem, WorkerPool, WorkerState};
