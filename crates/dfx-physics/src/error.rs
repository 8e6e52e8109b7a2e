use thiserror::Error;

/// Every failure a world operation can report.
///
/// Each variant maps onto one stable status code at the C boundary, see
/// [`crate::bridge::protocol`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhysicsError {
    /// A required input was absent or structurally unusable (null pointer,
    /// reserved handle 0, unknown enum code, short buffer).
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// A numeric input was non-finite or outside its allowed range.
    #[error("validation failed: {0}")]
    Validation(&'static str),

    /// The handle does not name a live body in this world.
    #[error("body {0} not found")]
    NotFound(u64),

    /// The solver produced a numerical failure while stepping.
    #[error("internal engine error: {0}")]
    InternalEngine(String),

    /// The requested backend was not compiled into this build.
    #[error("backend '{0}' is not available in this build")]
    BackendUnavailable(&'static str),
}

pub type PhysicsResult<T> = Result<T, PhysicsError>;

impl PhysicsError {
    /// Stable negative status code for this error.
    pub fn status(&self) -> i32 {
        use crate::bridge::protocol::{
            STATUS_INTERNAL_ERROR, STATUS_INVALID_ARGUMENT, STATUS_NOT_FOUND,
            STATUS_VALIDATION_FAILURE,
        };
        match self {
            PhysicsError::InvalidArgument(_) | PhysicsError::BackendUnavailable(_) => {
                STATUS_INVALID_ARGUMENT
            }
            PhysicsError::Validation(_) => STATUS_VALIDATION_FAILURE,
            PhysicsError::NotFound(_) => STATUS_NOT_FOUND,
            PhysicsError::InternalEngine(_) => STATUS_INTERNAL_ERROR,
        }
    }
}

/// Fail with [`PhysicsError::Validation`] unless `ok` holds.
pub(crate) fn ensure(ok: bool, what: &'static str) -> PhysicsResult<()> {
    if ok {
        Ok(())
    } else {
        Err(PhysicsError::Validation(what))
    }
}
