//! Batch engine
//!
//! # Components
//!
//! - `WorkerPool`: bounded concurrent execution of probes
//! - `Dispatcher`: one batch end to end, from raw URLs to a finalized sink

mod dispatcher;
mod pool;

pub use dispatcher::Dispatcher;
pub use pool::{PoolStats, WorkerPool};

pub use crate::output::{BatchSummary, OutputTarget};
