use homestage_fixtures::Fixture;
use rand::{Rng, RngCore};

use super::{random_hue, Look, PatternBehavior, RenderContext, SWEEP};
use crate::color::{unit_to_dmx, Color};
use crate::effect::{Oscillator, PulseClock, Waveform};
use crate::model::Section;

/// Degrees-per-second of the mellow pan drift, in channel steps.
const MELLOW_PAN_RATE: f64 = 25.0;
const MELLOW_TILT: u8 = 20;

/// Two radians per second.
const FAST_SWEEP: Oscillator = Oscillator::new(Waveform::Sine, 1.0 / std::f64::consts::PI);

/// Hue walks along a sine on every pulse; pan and tilt sweep together.
#[derive(Debug, Clone, Default)]
pub struct RainbowSweep {
    pulse: PulseClock,
    index: f64,
}

impl RainbowSweep {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index(&self) -> f64 {
        self.index
    }

    pub fn color(&self) -> Color {
        Color::from_hsv(self.index.sin() / 2.0 + 0.5, 1.0, 1.0)
    }
}

impl PatternBehavior for RainbowSweep {
    fn update(&mut self, fixtures: &mut [Fixture], ctx: &mut RenderContext) {
        if self
            .pulse
            .tick(ctx.time, ctx.audio.beat, ctx.audio.tempo)
        {
            self.index += ctx.rng.random::<f64>() * 0.2 + 0.4;
        }

        let position = SWEEP.dmx_at(ctx.time);
        let look = Look {
            pan: position,
            tilt: position,
            color: self.color(),
            brightness: 255,
        };
        for fixture in fixtures.iter_mut() {
            look.apply(fixture);
        }
    }
}

/// Alternates between two colors on every pulse.
#[derive(Debug, Clone)]
struct ToneSwitch {
    pulse: PulseClock,
    color: Color,
    colors: [Color; 2],
    color_index: usize,
}

impl ToneSwitch {
    fn new(rng: &mut dyn RngCore, time: f64) -> Self {
        Self {
            pulse: PulseClock::new(),
            color: Color::from_hsv((time * 5.0).sin() * 0.5 + 0.5, 1.0, 1.0),
            colors: [random_hue(rng), random_hue(rng)],
            color_index: 0,
        }
    }

    fn advance(&mut self, ctx: &RenderContext) -> Color {
        if self
            .pulse
            .tick(ctx.time, ctx.audio.beat, ctx.audio.tempo)
        {
            self.color = self.colors[self.color_index];
            self.color_index = (self.color_index + 1) % self.colors.len();
        }
        self.color
    }

    fn reroll(&mut self, rng: &mut dyn RngCore) {
        self.colors = [random_hue(rng), random_hue(rng)];
    }
}

/// Slow constant pan drift with a low tilt, two tones switching on the beat.
#[derive(Debug, Clone)]
pub struct MellowSweep {
    tones: ToneSwitch,
}

impl MellowSweep {
    pub fn new(rng: &mut dyn RngCore, time: f64) -> Self {
        Self {
            tones: ToneSwitch::new(rng, time),
        }
    }
}

impl PatternBehavior for MellowSweep {
    fn on_section_change(&mut self, _section: Option<&Section>, rng: &mut dyn RngCore) {
        self.tones.reroll(rng);
    }

    fn update(&mut self, fixtures: &mut [Fixture], ctx: &mut RenderContext) {
        let color = self.tones.advance(ctx);
        let look = Look {
            pan: (ctx.time * MELLOW_PAN_RATE).rem_euclid(255.0) as u8,
            tilt: MELLOW_TILT,
            color,
            brightness: 255,
        };
        for fixture in fixtures.iter_mut() {
            look.apply(fixture);
        }
    }
}

/// Two tones switching on the beat while the heads sweep.
#[derive(Debug, Clone)]
pub struct DualToneResponseFastSweep {
    tones: ToneSwitch,
}

impl DualToneResponseFastSweep {
    pub fn new(rng: &mut dyn RngCore, time: f64) -> Self {
        Self {
            tones: ToneSwitch::new(rng, time),
        }
    }
}

impl PatternBehavior for DualToneResponseFastSweep {
    fn on_section_change(&mut self, _section: Option<&Section>, rng: &mut dyn RngCore) {
        self.tones.reroll(rng);
    }

    fn update(&mut self, fixtures: &mut [Fixture], ctx: &mut RenderContext) {
        let color = self.tones.advance(ctx);
        let position = SWEEP.dmx_at(ctx.time);
        let look = Look {
            pan: position,
            tilt: position,
            color,
            brightness: 255,
        };
        for fixture in fixtures.iter_mut() {
            look.apply(fixture);
        }
    }
}

/// White whose level follows overall loudness, on a fast sweep.
#[derive(Debug, Clone, Default)]
pub struct GrayResponseFastSweep;

impl GrayResponseFastSweep {
    pub fn new() -> Self {
        Self
    }
}

impl PatternBehavior for GrayResponseFastSweep {
    fn update(&mut self, fixtures: &mut [Fixture], ctx: &mut RenderContext) {
        let level = unit_to_dmx(ctx.loudness());
        let look = Look {
            pan: FAST_SWEEP.dmx_at(ctx.time),
            tilt: FAST_SWEEP.with_offset(0.25).dmx_at(ctx.time),
            color: Color::gray(level),
            brightness: 255,
        };
        for fixture in fixtures.iter_mut() {
            look.apply(fixture);
        }
    }
}
