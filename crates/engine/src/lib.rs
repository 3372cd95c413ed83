#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `engine` is the core of Frontdown: it pairs the source and compare scan
//! streams, turns the paired stream into a typed action plan under the
//! SAVE/MIRROR/HARDLINK mode semantics, persists the plan as a durable
//! action record, applies it with bounded error tolerance, and orchestrates
//! multi-source jobs with versioned instance directories.
//!
//! # Design
//!
//! The pipeline is strictly sequential: scan → diff → plan → record →
//! execute. Statistics are owned by the job and passed down by mutable
//! borrow, so nested or test-driven runs stay isolated. All filesystem
//! access goes through [`fsview::FilesystemView`]; the engine never touches
//! `std::fs` directly except for instance-directory bookkeeping in the job.
//!
//! # Modules
//!
//! - [`config`]: the typed configuration record with cross-field validation.
//! - [`stats`]: the statistics accumulator and its protocol rendering.
//! - [`compare`]: the short-circuiting comparator chain.
//! - [`diff`]: the merge join over the two scan streams.
//! - [`plan`]: actions, the planner matrix, and the durable action record.
//! - [`executor`]: per-action application with an error budget.
//! - [`job`]: instance-directory resolution, compare-root selection, and
//!   overall success determination.

pub mod cancel;
pub mod compare;
pub mod config;
pub mod decision;
pub mod diff;
pub mod error;
pub mod executor;
pub mod job;
pub mod plan;
pub mod progress;
pub mod stats;

pub use cancel::CancelFlag;
pub use config::{BackupConfig, BackupMode, CompareMethod, ConfigError, LogLevel, PolicyAction, SourceConfig};
pub use decision::{AbortOnPrompt, DecisionHandler};
pub use error::BackupError;
pub use job::{BackupJob, BackupMetadata, JobOutcome, JobReport};
pub use plan::{Action, ActionRecord, ActionTag, Plan, SourceRecord};
pub use progress::{NullProgress, ProgressSink};
pub use stats::{format_bytes, BackupStatistics};

/// Per-instance log file name.
pub const LOG_FILENAME: &str = "log.txt";
/// Per-instance metadata file name.
pub const METADATA_FILENAME: &str = "metadata.json";
/// Per-instance machine-readable plan file name.
pub const ACTIONS_FILENAME: &str = "actions.json";
/// Per-instance human-readable plan file name.
pub const ACTIONS_HTML_FILENAME: &str = "actions.html";

/// Buffer size for streamed copies and bytewise comparison.
pub const COPY_BUFFER_SIZE: usize = 128 * 1024;
