//! Scene Diff
//!
//! Scene-level comparison of two datasets and the import plans derived
//! from it.
//!
//! # Core Concepts
//!
//! - [`DiffSummary`]: Partition of scene ids into added, removed, modified,
//!   and unchanged
//! - [`DiffEntry`]: Unified and HTML renderings of one changed scene
//! - [`ImportStrategy`]: Turns a summary into an [`ImportPlan`]
//!   ([`MergeStrategy`] keeps existing-only scenes, [`ReplaceStrategy`]
//!   deletes them)
//!
//! # Example
//!
//! ```rust,ignore
//! use scene_diff::{compute_diffs, compute_import_plans};
//!
//! let (summary, entries) = compute_diffs(&current, &incoming)?;
//! for entry in &entries {
//!     print!("{}", entry.unified_diff);
//! }
//! let plans = compute_import_plans(&current, &incoming)?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod classify;
pub mod engine;
pub mod error;
pub mod html;
pub mod lines;
pub mod strategy;
pub mod unified;

pub use classify::{check_scenes, classify, DiffStatus, DiffSummary, STATUS_ORDER};
pub use engine::{compute_diffs, compute_diffs_with, DiffEntry, DiffOptions, CURRENT_LABEL, INCOMING_LABEL};
pub use error::{DiffError, Side};
pub use html::{html_table, HtmlOptions};
pub use strategy::{
    compute_import_plans, plans_for_summary, ImportPlan, ImportStrategy, ImportStrategyKind,
    MergeStrategy, ReplaceStrategy,
};
pub use unified::unified_diff;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
