//! Pattern variants and the controller that picks between them.
//!
//! Every variant implements [`PatternBehavior`]; [`Pattern`] is the closed set
//! of them and switching variants always replaces the value.

pub mod controller;
pub mod manual;
pub mod pumper;
pub mod rainbow;
pub mod sweep;

use std::f64::consts::PI;
use std::fmt;

use homestage_fixtures::{ChannelField, Fixture};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::audio::FeatureSnapshot;
use crate::color::Color;
use crate::control::ManualControlState;
use crate::effect::{Oscillator, Waveform};
use crate::model::{Section, Segment, Track};

pub use controller::{ChangeSet, PatternController, SelectionPolicy};
pub use manual::ManualOverride;
pub use pumper::BloodPumper;
pub use rainbow::{RainbowCycle, RainbowRoundabout};
pub use sweep::{DualToneResponseFastSweep, GrayResponseFastSweep, MellowSweep, RainbowSweep};

/// Moving heads only dim in plain dimmer mode, which this level selects.
pub const LEVEL_DIMMER_MODE: u8 = 134;

/// One radian per second, centered on the middle of the range.
pub(crate) const SWEEP: Oscillator = Oscillator::new(Waveform::Sine, 1.0 / (2.0 * PI));

/// Everything a variant may read while rendering one tick.
pub struct RenderContext<'a> {
    /// Wall-clock time in seconds.
    pub time: f64,
    pub audio: &'a FeatureSnapshot,
    pub control: &'a ManualControlState,
    pub rng: &'a mut dyn RngCore,
}

impl RenderContext<'_> {
    /// Normalized magnitude of one band, 0 if the band doesn't exist.
    pub fn band(&self, index: usize) -> f64 {
        self.audio.spectrum.get(index).copied().unwrap_or(0.0) as f64
    }

    /// Mean of the two lowest bands.
    pub fn bass(&self) -> f64 {
        (self.band(0) + self.band(1)) / 2.0
    }

    /// Mean over every band.
    pub fn loudness(&self) -> f64 {
        let spectrum = &self.audio.spectrum;
        if spectrum.is_empty() {
            return 0.0;
        }
        spectrum.iter().map(|v| *v as f64).sum::<f64>() / spectrum.len() as f64
    }
}

/// The fields every variant drives on every fixture, every tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Look {
    pub pan: u8,
    pub tilt: u8,
    pub color: Color,
    pub brightness: u8,
}

impl Look {
    pub fn apply(&self, fixture: &mut Fixture) {
        fixture.set(ChannelField::Pan, self.pan);
        fixture.set(ChannelField::Tilt, self.tilt);
        fixture.set_rgb(self.color.r, self.color.g, self.color.b);
        fixture.set(ChannelField::Level, LEVEL_DIMMER_MODE);
        fixture.set(ChannelField::Brightness, self.brightness);
    }
}

/// A random fully saturated color.
pub(crate) fn random_hue(rng: &mut dyn RngCore) -> Color {
    Color::from_hsv(rng.random::<f64>(), 1.0, 1.0)
}

/// The capability set shared by all variants. Callbacks default to doing
/// nothing.
pub trait PatternBehavior {
    fn on_media_change(&mut self, _track: &Track) {}

    fn on_section_change(&mut self, _section: Option<&Section>, _rng: &mut dyn RngCore) {}

    fn on_segment_change(&mut self, _segment: Option<&Segment>) {}

    fn update(&mut self, fixtures: &mut [Fixture], ctx: &mut RenderContext);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternKind {
    RainbowRoundabout,
    RainbowCycle,
    BloodPumper,
    RainbowSweep,
    MellowSweep,
    DualToneResponseFastSweep,
    GrayResponseFastSweep,
}

impl PatternKind {
    /// The bank random selection draws from.
    pub const ALL: [PatternKind; 7] = [
        PatternKind::RainbowRoundabout,
        PatternKind::RainbowCycle,
        PatternKind::BloodPumper,
        PatternKind::RainbowSweep,
        PatternKind::MellowSweep,
        PatternKind::DualToneResponseFastSweep,
        PatternKind::GrayResponseFastSweep,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PatternKind::RainbowRoundabout => "RainbowRoundabout",
            PatternKind::RainbowCycle => "RainbowCycle",
            PatternKind::BloodPumper => "BloodPumper",
            PatternKind::RainbowSweep => "RainbowSweep",
            PatternKind::MellowSweep => "MellowSweep",
            PatternKind::DualToneResponseFastSweep => "DualToneResponseFastSweep",
            PatternKind::GrayResponseFastSweep => "GrayResponseFastSweep",
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sections shorter than this get the fast dual tone sweep.
const SHORT_SECTION: f64 = 8.0;
/// Sections shorter than this (and not short) get the rainbow sweep.
const MEDIUM_SECTION: f64 = 20.0;

pub enum Pattern {
    RainbowRoundabout(RainbowRoundabout),
    RainbowCycle(RainbowCycle),
    BloodPumper(BloodPumper),
    RainbowSweep(RainbowSweep),
    MellowSweep(MellowSweep),
    DualToneResponseFastSweep(DualToneResponseFastSweep),
    GrayResponseFastSweep(GrayResponseFastSweep),
}

impl Pattern {
    pub fn new(kind: PatternKind, rng: &mut dyn RngCore, time: f64) -> Self {
        match kind {
            PatternKind::RainbowRoundabout => Pattern::RainbowRoundabout(RainbowRoundabout::new()),
            PatternKind::RainbowCycle => Pattern::RainbowCycle(RainbowCycle::new()),
            PatternKind::BloodPumper => Pattern::BloodPumper(BloodPumper::new()),
            PatternKind::RainbowSweep => Pattern::RainbowSweep(RainbowSweep::new()),
            PatternKind::MellowSweep => Pattern::MellowSweep(MellowSweep::new(rng, time)),
            PatternKind::DualToneResponseFastSweep => {
                Pattern::DualToneResponseFastSweep(DualToneResponseFastSweep::new(rng, time))
            }
            PatternKind::GrayResponseFastSweep => {
                Pattern::GrayResponseFastSweep(GrayResponseFastSweep::new())
            }
        }
    }

    /// Pick any variant from the bank.
    pub fn random(rng: &mut dyn RngCore, time: f64) -> Self {
        let kind = PatternKind::ALL[rng.random_range(0..PatternKind::ALL.len())];
        Pattern::new(kind, rng, time)
    }

    /// Pick a variant from the length of the section that just started. Short
    /// sections get fast movement, long ones something calmer.
    pub fn for_section(section: Option<&Section>, rng: &mut dyn RngCore, time: f64) -> Self {
        let kind = match section {
            None => PatternKind::RainbowCycle,
            Some(section) if section.duration < SHORT_SECTION => {
                PatternKind::DualToneResponseFastSweep
            }
            Some(section) if section.duration < MEDIUM_SECTION => PatternKind::RainbowSweep,
            Some(_) => PatternKind::MellowSweep,
        };
        Pattern::new(kind, rng, time)
    }

    pub fn kind(&self) -> PatternKind {
        match self {
            Pattern::RainbowRoundabout(_) => PatternKind::RainbowRoundabout,
            Pattern::RainbowCycle(_) => PatternKind::RainbowCycle,
            Pattern::BloodPumper(_) => PatternKind::BloodPumper,
            Pattern::RainbowSweep(_) => PatternKind::RainbowSweep,
            Pattern::MellowSweep(_) => PatternKind::MellowSweep,
            Pattern::DualToneResponseFastSweep(_) => PatternKind::DualToneResponseFastSweep,
            Pattern::GrayResponseFastSweep(_) => PatternKind::GrayResponseFastSweep,
        }
    }

    fn behavior(&mut self) -> &mut dyn PatternBehavior {
        match self {
            Pattern::RainbowRoundabout(p) => p,
            Pattern::RainbowCycle(p) => p,
            Pattern::BloodPumper(p) => p,
            Pattern::RainbowSweep(p) => p,
            Pattern::MellowSweep(p) => p,
            Pattern::DualToneResponseFastSweep(p) => p,
            Pattern::GrayResponseFastSweep(p) => p,
        }
    }
}

impl PatternBehavior for Pattern {
    fn on_media_change(&mut self, track: &Track) {
        self.behavior().on_media_change(track)
    }

    fn on_section_change(&mut self, section: Option<&Section>, rng: &mut dyn RngCore) {
        self.behavior().on_section_change(section, rng)
    }

    fn on_segment_change(&mut self, segment: Option<&Segment>) {
        self.behavior().on_segment_change(segment)
    }

    fn update(&mut self, fixtures: &mut [Fixture], ctx: &mut RenderContext) {
        self.behavior().update(fixtures, ctx)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pattern({})", self.kind())
    }
}
