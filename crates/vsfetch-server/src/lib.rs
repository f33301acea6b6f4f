//! vsfetch server - polls the live network feed and keeps the versioned
//! object store in sync with it.

pub mod backoff;
pub mod config;
pub mod loops;
pub mod reference;
pub mod sync;

pub use config::Config;
pub use loops::poll_loop::{run_poll_loop, CycleOutcome, Pipeline};
pub use reference::{ReferenceData, ReferenceLoader};
