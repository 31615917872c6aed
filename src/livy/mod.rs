//! Spark batch jobs on HDInsight through the Livy REST API
//!
//! Submission, kill, and the streaming log tailer that follows a batch until
//! it finishes.

pub mod backoff;
pub mod client;
pub mod consumer;
pub mod models;
pub mod tailer;

pub use backoff::{poll_interval, Backoff};
pub use client::{LivyApi, LivyClient};
pub use consumer::{ConsoleConsumer, TailConsumer, TailEvent};
pub use models::{BatchLog, BatchState, SubmissionParameters};
pub use tailer::{find_application_id, JobLogTailer, KillSwitch, TailOutcome, TailProgress, TailState};
