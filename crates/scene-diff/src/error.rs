//! Diff and planning errors

use std::fmt::{self, Display, Formatter};

/// Which dataset of a comparison a scene came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The dataset currently stored
    Existing,
    /// The dataset being compared against it
    Incoming,
}

impl Display for Side {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Existing => "existing",
            Self::Incoming => "incoming",
        })
    }
}

/// Errors from diff computation and strategy selection
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiffError {
    /// A scene payload is not an object
    #[error("{side} scene '{scene_id}' is malformed: expected an object, got {kind}")]
    MalformedScene {
        side: Side,
        scene_id: String,
        kind: &'static str,
    },

    /// Strategy name not recognized
    #[error("unknown import strategy '{0}' (expected 'merge' or 'replace')")]
    UnknownStrategy(String),
}
