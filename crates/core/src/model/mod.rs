pub mod payload;
pub mod timeline;
pub mod track;

pub use payload::{AnalysisPayload, MediaPayload, PayloadError, StartDateTimePayload};
pub use timeline::{Timeline, Timing};
pub use track::{Analysis, MediaId, Section, Segment, Track, TrackSummary};
