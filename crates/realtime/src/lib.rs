pub mod buffer;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod key;
pub mod resolver;
pub mod snapshot;
pub mod source;
pub mod timetable;
pub mod update;

pub use buffer::TimetableBuffer;
pub use collaborators::{FuzzyTripMatcher, TransitLayerUpdater, TransitModel};
pub use config::{BackwardsDelayPropagation, RealtimeConfig};
pub use error::{BufferError, ResolveError, UpdateError};
pub use resolver::EntityResolver;
pub use snapshot::Snapshot;
pub use source::SnapshotSource;
pub use timetable::{DirtyTimetable, Timetable};
