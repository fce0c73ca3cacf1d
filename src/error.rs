//! Error types returned by the fuse registry.
use std::convert::Infallible;
use std::fmt;

use crate::config::ConfigError;

/// Failures of registry operations themselves.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FuseError {
    /// `install` was given a configuration outside the allowed bounds.
    #[error("invalid fuse config: {0}")]
    InvalidConfig(#[from] ConfigError),
    /// No fuse is installed under this name.
    #[error("fuse '{name}' not found")]
    NotFound {
        /// Name that could not be located.
        name: String,
    },
    /// The fuse is blown; the call was rejected without running.
    #[error("fuse '{name}' is blown")]
    Unavailable {
        /// Name of the blown fuse.
        name: String,
    },
}

impl From<Infallible> for FuseError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

impl FuseError {
    pub(crate) fn not_found(name: &str) -> Self {
        FuseError::NotFound { name: name.to_owned() }
    }

    pub(crate) fn unavailable(name: &str) -> Self {
        FuseError::Unavailable { name: name.to_owned() }
    }

    /// Check if the named fuse is missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if the call was rejected by a blown fuse.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    /// Check if this is a configuration rejection.
    pub fn is_invalid_config(&self) -> bool {
        matches!(self, Self::InvalidConfig(_))
    }
}

/// Outcome error of a guarded call whose operation returns `Result<T, E>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunError<E> {
    /// The registry refused or could not route the call.
    Fuse(FuseError),
    /// The operation ran and failed; the fuse has been melted.
    Inner(E),
}

impl<E: fmt::Display> fmt::Display for RunError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fuse(e) => write!(f, "{}", e),
            Self::Inner(e) => write!(f, "{}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RunError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Fuse(e) => Some(e),
            Self::Inner(e) => Some(e),
        }
    }
}

impl<E> From<FuseError> for RunError<E> {
    fn from(err: FuseError) -> Self {
        RunError::Fuse(err)
    }
}

impl<E> RunError<E> {
    /// Check if the fuse was blown and the operation never ran.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Fuse(FuseError::Unavailable { .. }))
    }

    /// Check if the fuse name was unknown.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Fuse(FuseError::NotFound { .. }))
    }

    /// Check if this error came from the operation.
    pub fn is_inner(&self) -> bool {
        matches!(self, Self::Inner(_))
    }

    /// Get the inner error if this is an Inner variant
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Inner(e) => Some(e),
            Self::Fuse(_) => None,
        }
    }

    /// Borrow the inner error if present.
    pub fn as_inner(&self) -> Option<&E> {
        match self {
            Self::Inner(e) => Some(e),
            Self::Fuse(_) => None,
        }
    }

    /// Borrow the registry error if present.
    pub fn as_fuse(&self) -> Option<&FuseError> {
        match self {
            Self::Fuse(e) => Some(e),
            Self::Inner(_) => None,
        }
    }
}
