use homestage_fixtures::Fixture;
use rand::RngCore;

use super::{Look, PatternBehavior, RenderContext};
use crate::color::{unit_to_dmx, Color};
use crate::effect::{Oscillator, PulseClock, Waveform};
use crate::model::Section;

/// Full hue turns per second of the roundabout drift.
const ROUNDABOUT_HUE_RATE: f64 = 0.05;
/// Hue jump on every pulse.
const ROUNDABOUT_PULSE_STEP: f64 = 0.1;
const ROUNDABOUT_PAN: Oscillator = Oscillator::new(Waveform::Sawtooth, 0.1);
const ROUNDABOUT_TILT: Oscillator = Oscillator::new(Waveform::Sine, 0.05);

/// Each fixture sits at its own point of the color wheel, and the wheel and the
/// pan positions rotate around the rig. Sections reverse the direction.
#[derive(Debug, Clone)]
pub struct RainbowRoundabout {
    pulse: PulseClock,
    hue: f64,
    direction: f64,
    last_time: Option<f64>,
}

impl RainbowRoundabout {
    pub fn new() -> Self {
        Self {
            pulse: PulseClock::new(),
            hue: 0.0,
            direction: 1.0,
            last_time: None,
        }
    }
}

impl Default for RainbowRoundabout {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternBehavior for RainbowRoundabout {
    fn on_section_change(&mut self, _section: Option<&Section>, _rng: &mut dyn RngCore) {
        self.direction = -self.direction;
    }

    fn update(&mut self, fixtures: &mut [Fixture], ctx: &mut RenderContext) {
        let elapsed = self.last_time.map_or(0.0, |last| (ctx.time - last).max(0.0));
        self.last_time = Some(ctx.time);

        self.hue += self.direction * ROUNDABOUT_HUE_RATE * elapsed;
        if self
            .pulse
            .tick(ctx.time, ctx.audio.beat, ctx.audio.tempo)
        {
            self.hue += self.direction * ROUNDABOUT_PULSE_STEP;
        }
        self.hue = self.hue.rem_euclid(1.0);

        let count = fixtures.len().max(1) as f64;
        for (i, fixture) in fixtures.iter_mut().enumerate() {
            let spread = i as f64 / count;
            let look = Look {
                pan: ROUNDABOUT_PAN
                    .with_offset(self.direction * spread)
                    .dmx_at(ctx.time * self.direction),
                tilt: ROUNDABOUT_TILT.with_offset(spread).dmx_at(ctx.time),
                color: Color::from_hsv(self.hue + spread, 1.0, 1.0),
                brightness: 255,
            };
            look.apply(fixture);
        }
    }
}

/// Hue turns per second of the shared cycle.
const CYCLE_HUE_RATE: f64 = 0.1;
/// Brightness floor so quiet passages don't go dark.
const CYCLE_FLOOR: f64 = 0.25;

/// The whole rig cycles through the color wheel together while the bass
/// drives brightness. A new section jumps to the opposite hue.
#[derive(Debug, Clone, Default)]
pub struct RainbowCycle {
    hue_offset: f64,
}

impl RainbowCycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hue_at(&self, time: f64) -> f64 {
        (time * CYCLE_HUE_RATE + self.hue_offset).rem_euclid(1.0)
    }
}

impl PatternBehavior for RainbowCycle {
    fn on_section_change(&mut self, _section: Option<&Section>, _rng: &mut dyn RngCore) {
        self.hue_offset = (self.hue_offset + 0.5).rem_euclid(1.0);
    }

    fn update(&mut self, fixtures: &mut [Fixture], ctx: &mut RenderContext) {
        let value = CYCLE_FLOOR + (1.0 - CYCLE_FLOOR) * ctx.bass();
        let look = Look {
            pan: 128,
            tilt: unit_to_dmx(0.25),
            color: Color::from_hsv(self.hue_at(ctx.time), 1.0, value),
            brightness: 255,
        };
        for fixture in fixtures.iter_mut() {
            look.apply(fixture);
        }
    }
}
