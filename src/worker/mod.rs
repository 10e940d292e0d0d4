//! Digest pipeline: history paging, the per-run builder, run serialization
//! and the hourly trigger.

pub mod digest;
pub mod history;
pub mod runner;
pub mod scheduler;

pub use digest::DigestBuilder;
pub use runner::{DigestRunner, Trigger};
pub use scheduler::{ScheduledJob, Scheduler};

/// Shown when a manual run fails outright.
pub const CANONICAL_FAILURE_MESSAGE: &str =
    "Sorry, I couldn't generate a summary at this time. Please try again later.";
