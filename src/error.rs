//! Error types for circle streams
//!
//! The `Display` output of every variant is part of the public contract:
//! stage ids and sentinels are rendered exactly as callers match on them.

use std::fmt;
use std::sync::Arc;

use crate::value::Kind;

/// Boxed error returned by fallible user functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for stream construction and iteration
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// End of input. Not a failure, the normal termination signal.
    #[error("EOI")]
    Eoi,
    #[error("cannot create iterator")]
    CannotCreateIterator,
    /// A stage of the chain could not be built.
    #[error("cannot create stream {stage} {source}")]
    CannotCreateStream { stage: String, source: Box<Error> },
    #[error("invalid mapper")]
    InvalidMapper,
    #[error("invalid filter")]
    InvalidFilter,
    #[error("invalid aggregator")]
    InvalidAggregator,
    #[error("invalid comparator")]
    InvalidComparator,
    #[error("invalid consumer")]
    InvalidConsumer,
    #[error("invalid aggregate executor")]
    InvalidAggregateExecutor,
    /// Coercion failure or contained panic while invoking a user function.
    #[error("apply error {0}")]
    Apply(ApplyError),
    /// An iteration error re-tagged by the stage it passed through.
    #[error("{stage} {source}")]
    Stage { stage: String, source: Box<Error> },
    /// Failure signalled by a user function.
    #[error("{0}")]
    Failed(Arc<dyn std::error::Error + Send + Sync + 'static>),
    #[error("{0}")]
    Custom(String),
}

impl Error {
    /// The end-of-input signal.
    pub fn eoi() -> Self {
        Error::Eoi
    }

    /// Wrap an error raised by user code.
    pub fn failed<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Error::Failed(Arc::from(err.into()))
    }

    pub fn custom(msg: impl Into<String>) -> Self {
        Error::Custom(msg.into())
    }

    pub fn is_eoi(&self) -> bool {
        matches!(self, Error::Eoi)
    }

    pub fn is_apply(&self) -> bool {
        matches!(self, Error::Apply(_))
    }

    /// Tag this error with the id of the stage it flowed through.
    pub fn tagged(self, stage: impl Into<String>) -> Self {
        Error::Stage {
            stage: stage.into(),
            source: Box::new(self),
        }
    }

    /// The outermost stage id, if this error was produced by a stage.
    pub fn stage_id(&self) -> Option<&str> {
        match self {
            Error::Stage { stage, .. } | Error::CannotCreateStream { stage, .. } => Some(stage),
            _ => None,
        }
    }

    /// Strip stage tags and stream-construction wrappers down to the cause.
    pub fn root(&self) -> &Error {
        match self {
            Error::Stage { source, .. } | Error::CannotCreateStream { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Errors compare by their rendered text, since user errors are opaque.
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

/// Reasons an adapter failed to invoke its function
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyError {
    /// An argument could not be coerced to the declared parameter type.
    Convert { expected: Kind, found: Kind },
    /// A tuple did not match the function's arity.
    Arity { expected: usize, found: usize },
    /// The adapter requires a specific container as input.
    Container { expected: Kind, found: Kind },
    /// The user function panicked.
    Panic(String),
}

impl fmt::Display for ApplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyError::Convert { expected, found } => {
                write!(f, "cannot convert {} to {}", found, expected)
            }
            ApplyError::Arity { expected, found } => {
                write!(f, "arity mismatch: expected {} arguments, got {}", expected, found)
            }
            ApplyError::Container { expected, found } => {
                write!(f, "expected {}, found {}", expected, found)
            }
            ApplyError::Panic(msg) => write!(f, "panic: {}", msg),
        }
    }
}

impl From<ApplyError> for Error {
    fn from(err: ApplyError) -> Self {
        Error::Apply(err)
    }
}

/// Result type for circle stream operations
pub type StreamResult<T> = Result<T, Error>;
