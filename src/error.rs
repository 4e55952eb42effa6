use thiserror::Error;

/// Errors produced by the graph model and the topology refresh.
///
/// `InvalidArgument` and `NotFound` describe a bad edit and leave the
/// structure untouched, so the caller can correct the input and retry.
/// `InvariantViolation` means the derived half-bond state no longer agrees
/// with the graph model; the refresh that raised it has been abandoned and
/// only a forced refresh can rebuild a consistent state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SketchError {
    /// A required construction field was missing or an argument was malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An id lookup missed.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Kind of entity looked up (`"atom"`, `"bond"`, ...).
        kind: &'static str,
        /// The id that was requested.
        id: usize,
    },

    /// The rotation system is inconsistent with the graph, or a raw value
    /// fell outside a closed enumeration.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl SketchError {
    #[must_use]
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument(reason.into())
    }

    #[must_use]
    pub const fn not_found(kind: &'static str, id: usize) -> Self {
        Self::NotFound { kind, id }
    }

    #[must_use]
    pub fn invariant(reason: impl Into<String>) -> Self {
        Self::InvariantViolation(reason.into())
    }

    /// Whether the caller can recover by correcting the edit.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvariantViolation(_))
    }
}

pub type Result<T, E = SketchError> = std::result::Result<T, E>;
