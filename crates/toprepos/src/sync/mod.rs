//! Synchronization of the ranking table and per-repository activity.
//!
//! # Module Structure
//!
//! - [`types`] - `SyncOptions`, `ErrorPolicy`, `SyncReport`, `SyncError`, defaults
//! - [`progress`] - `SyncProgress` events and the `emit()` helper
//! - [`engine`] - `SyncOrchestrator::run_cycle()`
//!
//! # Example
//!
//! ```ignore
//! use toprepos::source::{SourceConfig, build_source};
//! use toprepos::sync::{SyncOptions, SyncOrchestrator};
//!
//! let source = build_source(&SourceConfig::default())?;
//! let orchestrator = SyncOrchestrator::new(source, db.clone(), SyncOptions::default());
//! let report = orchestrator.run_cycle().await?;
//! println!("ranked {} repositories", report.ranked);
//! ```

pub mod engine;
mod progress;
mod types;

pub use engine::SyncOrchestrator;

pub use types::{ErrorPolicy, RepoFailure, SyncError, SyncOptions, SyncReport};

pub use types::{DEFAULT_INITIAL_WINDOW_DAYS, DEFAULT_REPO_DELAY, DEFAULT_TOP_N};

pub use progress::{ProgressCallback, SyncProgress, emit};
