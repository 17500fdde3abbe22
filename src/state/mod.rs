//! State module for tracking batch progress
//!
//! # Components
//!
//! - `BatchState`: lifecycle of one batch run (idle, running, draining, done, aborted)

mod batch_state;

pub use batch_state::BatchState;
