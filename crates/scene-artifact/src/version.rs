//! Version tokens
//!
//! A version id pairs the UTC time a dataset was produced with a prefix of
//! its checksum: `YYYYMMDDTHHMMSSZ-<8 hex chars>`.

use crate::dataset::SceneDataset;
use crate::hash::{Checksum, SHORT_LEN};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// `strftime` layout of the timestamp half of a version id
pub const VERSION_TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Format a version id from a timestamp in any zone and a checksum
#[must_use]
pub fn format_version_id<Tz: TimeZone>(generated_at: &DateTime<Tz>, checksum: &Checksum) -> String {
    let utc = generated_at.with_timezone(&Utc);
    format!(
        "{}-{}",
        utc.format(VERSION_TIMESTAMP_FORMAT),
        checksum.short()
    )
}

/// Identity of one dataset state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    /// When this state was produced (UTC)
    pub generated_at: DateTime<Utc>,
    /// `<timestamp>-<checksum prefix>` token
    pub version_id: String,
    /// Full checksum of the canonical dataset
    pub checksum: Checksum,
}

impl VersionInfo {
    /// Build from a timestamp and an already computed checksum
    #[must_use]
    pub fn new<Tz: TimeZone>(generated_at: &DateTime<Tz>, checksum: Checksum) -> Self {
        Self {
            generated_at: generated_at.with_timezone(&Utc),
            version_id: format_version_id(generated_at, &checksum),
            checksum,
        }
    }

    /// Checksum `dataset` and stamp it with `generated_at`
    #[must_use]
    pub fn compute<Tz: TimeZone>(generated_at: &DateTime<Tz>, dataset: &SceneDataset) -> Self {
        Self::new(generated_at, dataset.checksum())
    }

    /// Whether a caller-supplied token names this version
    #[inline]
    #[must_use]
    pub fn matches(&self, version_id: &str) -> bool {
        self.version_id == version_id
    }
}

impl Display for VersionInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.version_id)
    }
}

/// A parsed version id
///
/// Only the shape is checked; whether it names the current dataset is the
/// concurrency guard's business.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionId {
    timestamp: DateTime<Utc>,
    checksum_prefix: String,
}

impl VersionId {
    /// Timestamp half
    #[inline]
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Checksum half (8 lowercase hex characters)
    #[inline]
    #[must_use]
    pub fn checksum_prefix(&self) -> &str {
        &self.checksum_prefix
    }

    /// Whether `checksum` starts with this id's prefix
    #[must_use]
    pub fn names_checksum(&self, checksum: &Checksum) -> bool {
        checksum.short() == self.checksum_prefix
    }
}

impl Display for VersionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.timestamp.format(VERSION_TIMESTAMP_FORMAT),
            self.checksum_prefix
        )
    }
}

impl FromStr for VersionId {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (stamp, prefix) = s
            .split_once('-')
            .ok_or_else(|| VersionError::Malformed(s.to_string()))?;

        let naive = NaiveDateTime::parse_from_str(stamp, VERSION_TIMESTAMP_FORMAT)
            .map_err(|_| VersionError::Timestamp(stamp.to_string()))?;

        let is_hex = prefix
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        if prefix.len() != SHORT_LEN || !is_hex {
            return Err(VersionError::ChecksumPrefix(prefix.to_string()));
        }

        Ok(Self {
            timestamp: naive.and_utc(),
            checksum_prefix: prefix.to_string(),
        })
    }
}

/// Errors parsing a version id
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    /// Missing the `-` separator
    #[error("malformed version id: '{0}'")]
    Malformed(String),

    /// Timestamp half is not `YYYYMMDDTHHMMSSZ`
    #[error("invalid version timestamp: '{0}'")]
    Timestamp(String),

    /// Checksum half is not 8 lowercase hex characters
    #[error("invalid checksum prefix: '{0}'")]
    ChecksumPrefix(String),
}
