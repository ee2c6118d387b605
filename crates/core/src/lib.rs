pub use audio::{
    AudioConfig, BeatDetector, CaptureBackend, CaptureDevice, CaptureError, FeatureExtractor,
    FeatureSnapshot, SpectralFluxTracker, SpectrumAnalyzer,
};
#[cfg(feature = "cpal")]
pub use audio::CpalBackend;
pub use color::Color;
pub use config::{ConfigError, ConfigManager, FixtureConfig, StageConfig};
pub use control::{Button, ManualControlState};
pub use control_loop::{ControlLoop, Lifecycle, StageState};
pub use messages::{CommandError, CommandReply, StageCommand, StageStatus};
pub use model::{Analysis, MediaId, MediaPayload, Section, Segment, Timeline, Track};
pub use output::{ArtNetConfig, ArtNetTransmitter, OutputError, Transmitter};
pub use pattern::{Pattern, PatternController, PatternKind, SelectionPolicy};
pub use stage::Stage;

pub mod audio;
mod color;
pub mod config;
pub mod control;
mod control_loop;
pub mod effect;
pub mod messages;
pub mod model;
pub mod output;
pub mod pattern;
mod stage;
