//! # downtime-core
//!
//! Core library for the shop-floor downtime tracker: operators open a
//! stoppage when a production process halts, close it when work resumes,
//! and the closed records accumulate in a durable history that can be
//! summarised per process and per reason.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime. Every operation finishes its I/O before returning.
//! - **Single writer**: One process owns the files at a time; nothing is locked.
//! - **Graceful degradation**: Missing or corrupt settings and side files load as defaults.
//! - **Explicit state**: The open stoppages live in an [`ActiveStore`] owned by the
//!   caller (usually through [`DowntimeEngine`]), never in a global.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use downtime_core::{DowntimeEngine, HistorySummary};
//!
//! let engine = DowntimeEngine::new()?;
//! if let HistorySummary::Report(agg) = engine.summary()? {
//!     print!("{}", agg.by_process.render_bars(40));
//! }
//! ```

pub mod active;
pub mod aggregate;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod storage;
pub mod types;

pub use active::{ActiveStore, ClosedEntry};
pub use aggregate::{summarize, Aggregates, Breakdown, Bucket, HistorySummary};
pub use catalog::{resolve_reason, Process, ReasonChoice, OTHER_PLACEHOLDER, OTHER_REASON};
pub use config::{load_config, save_config, AppConfig};
pub use engine::{CloseOutcome, DowntimeEngine};
pub use error::{DowntimeError, Result};
pub use history::{HistoryRow, HistoryStore, HISTORY_HEADER, HISTORY_TABLE};
pub use storage::StorageConfig;
pub use types::{ClosedStoppage, Stoppage};
