//! Scene Schema
//!
//! The boundary between stored text and the scene dataset model. Nothing
//! downstream sees a dataset until it has been migrated to the current
//! schema and every scene parses under the narrative model.
//!
//! # Architecture
//!
//! ```text
//! text → DatasetDocument (bare | envelope) → migrate → validate → SceneDataset
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use scene_schema::{load_document, migrate};
//!
//! let scenes = load_document(r#"{"schema_version": 1, "scenes": {...}}"#)?;
//! let same = migrate(&scenes, None)?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod document;
pub mod error;
pub mod migrate;

pub use document::{load_document, render_document, DatasetDocument};
pub use error::{DocumentError, MigrationError};
pub use migrate::{migrate, upgrade_scene_v1, CURRENT_SCHEMA_VERSION, LEGACY_SCHEMA_VERSION};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
