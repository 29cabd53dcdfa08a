use std::fmt;

use model::{feed::FeedScopedId, stop::Stop, trip::Trip};

/// The one runtime-checked invariant violation the type system cannot rule
/// out on its own: calling a mutating `TimetableBuffer` method after it has
/// already been committed and handed its dirty timetables off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    Frozen,
}

impl fmt::Display for BufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frozen => write!(f, "buffer is frozen and cannot be mutated"),
        }
    }
}

impl std::error::Error for BufferError {}

/// Per-update failure reasons surfaced in a batch's `UpdateResult`. Errors
/// are accumulated, not fatal to the batch: the remaining updates still
/// apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateError {
    UnknownTrip(FeedScopedId<Trip>),
    UnknownStop(FeedScopedId<Stop>),
    InvalidStopSequence(FeedScopedId<Trip>),
    NonMonotonicTimes(FeedScopedId<Trip>),
    PatternChangedTooFar(FeedScopedId<Trip>),
    DateUnparseable(String),
    ReadOnly,
}

impl fmt::Display for UpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTrip(id) => write!(f, "unknown trip: {id}"),
            Self::UnknownStop(id) => write!(f, "unknown stop: {id}"),
            Self::InvalidStopSequence(id) => {
                write!(f, "update for {id} refers to a stop outside its pattern")
            }
            Self::NonMonotonicTimes(id) => {
                write!(f, "proposed times for {id} are not non-decreasing")
            }
            Self::PatternChangedTooFar(id) => {
                write!(f, "stop pattern divergence for {id} exceeds policy")
            }
            Self::DateUnparseable(raw) => write!(f, "could not parse date frame: {raw}"),
            Self::ReadOnly => write!(f, "write attempted on a frozen buffer"),
        }
    }
}

impl std::error::Error for UpdateError {}

impl From<BufferError> for UpdateError {
    fn from(error: BufferError) -> Self {
        match error {
            BufferError::Frozen => Self::ReadOnly,
        }
    }
}

/// Failure reasons from [`crate::resolver::EntityResolver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    UnknownTrip,
    UnknownStop,
    DateUnparseable(String),
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTrip => write!(f, "reference did not resolve to a trip"),
            Self::UnknownStop => write!(f, "reference did not resolve to a stop"),
            Self::DateUnparseable(raw) => write!(f, "could not parse date frame: {raw}"),
        }
    }
}

impl std::error::Error for ResolveError {}
