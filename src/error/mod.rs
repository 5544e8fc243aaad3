use std::fmt;

use thiserror::Error;

use crate::assets::ImageLoadError;
use crate::persistence::StoreError;
use crate::scene::ObjectId;
use crate::tools::StateError;

pub type EditorResult<T> = std::result::Result<T, EditorError>;

/// Expected mis-input; discarded without a user-visible notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    ShapeTooSmall,
    TooFewPoints { required: usize, got: usize },
    NoTargets,
    OutsideImage,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShapeTooSmall => write!(f, "shape is below the minimum size"),
            Self::TooFewPoints { required, got } => {
                write!(f, "path needs at least {required} points, got {got}")
            }
            Self::NoTargets => write!(f, "no eligible objects under the path"),
            Self::OutsideImage => write!(f, "path does not overlap the image"),
        }
    }
}

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("input rejected: {0}")]
    UserInputRejected(RejectReason),

    #[error("resource `{reference}` unavailable: {source}")]
    ResourceUnavailable {
        reference: String,
        #[source]
        source: ImageLoadError,
    },

    #[error("scene {operation} failed: {source}")]
    Persistence {
        operation: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("unknown object id {0}")]
    UnknownObject(ObjectId),

    #[error(transparent)]
    State(#[from] StateError),
}

impl EditorError {
    /// Silent failures are logged at debug level and never surfaced.
    pub const fn is_silent(&self) -> bool {
        matches!(self, Self::UserInputRejected(_))
    }
}

impl From<RejectReason> for EditorError {
    fn from(reason: RejectReason) -> Self {
        Self::UserInputRejected(reason)
    }
}
