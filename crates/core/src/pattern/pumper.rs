use homestage_fixtures::Fixture;

use super::{Look, PatternBehavior, RenderContext};
use crate::color::{unit_to_dmx, Color};
use crate::effect::PulseClock;
use crate::model::Segment;

/// Exponential fade rate of a heartbeat, per second.
const DECAY_PER_SECOND: f64 = 4.0;
/// A segment whose peak rises this many dB over its onset counts as a hit.
const ATTACK_DB: f64 = 6.0;

/// Red heartbeat: every pulse slams to full and fades out, scaled by how much
/// bass is present. Sharp segment attacks pump too.
#[derive(Debug, Clone, Default)]
pub struct BloodPumper {
    pulse: PulseClock,
    level: f64,
    last_time: Option<f64>,
}

impl BloodPumper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self) -> f64 {
        self.level
    }
}

impl PatternBehavior for BloodPumper {
    fn on_segment_change(&mut self, segment: Option<&Segment>) {
        let Some(segment) = segment else {
            return;
        };
        if let (Some(start), Some(max)) = (segment.loudness_start, segment.loudness_max) {
            if max - start >= ATTACK_DB {
                self.level = 1.0;
            }
        }
    }

    fn update(&mut self, fixtures: &mut [Fixture], ctx: &mut RenderContext) {
        if let Some(last) = self.last_time {
            let elapsed = (ctx.time - last).max(0.0);
            self.level *= (-DECAY_PER_SECOND * elapsed).exp();
        }
        self.last_time = Some(ctx.time);

        if self
            .pulse
            .tick(ctx.time, ctx.audio.beat, ctx.audio.tempo)
        {
            self.level = 1.0;
        }

        let intensity = self.level * (0.5 + 0.5 * ctx.bass());
        let look = Look {
            pan: 128,
            tilt: unit_to_dmx(0.3 + 0.2 * self.level),
            color: Color::RED.scale(intensity),
            brightness: 255,
        };
        for fixture in fixtures.iter_mut() {
            look.apply(fixture);
        }
    }
}

#[cfg(test)]
mod tests {
    use homestage_fixtures::ChannelField;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    use super::*;
    use crate::control::ManualControlState;
    use crate::pattern::tests::{rig, snapshot};

    #[test]
    fn test_pulse_then_decay() {
        let mut rng = SmallRng::seed_from_u64(4);
        let audio = snapshot(false, 60.0, 1.0);
        let control = ManualControlState::default();
        let mut pattern = BloodPumper::new();
        let mut fixtures = rig();

        let mut ctx = RenderContext {
            time: 10.0,
            audio: &audio,
            control: &control,
            rng: &mut rng,
        };
        pattern.update(&mut fixtures, &mut ctx);
        assert_eq!(pattern.level(), 1.0);
        assert_eq!(fixtures[0].get(ChannelField::Red), Some(255));
        assert_eq!(fixtures[0].get(ChannelField::Green), Some(0));

        let mut ctx = RenderContext {
            time: 10.5,
            audio: &audio,
            control: &control,
            rng: &mut rng,
        };
        pattern.update(&mut fixtures, &mut ctx);
        assert!((pattern.level() - (-2.0_f64).exp()).abs() < 1e-9);
        assert!(fixtures[0].get(ChannelField::Red).unwrap_or(255) < 40);
    }

    #[test]
    fn test_segment_attack_pumps() {
        let mut pattern = BloodPumper::new();

        let mut soft = Segment::new(0.0, 0.3);
        soft.loudness_start = Some(-20.0);
        soft.loudness_max = Some(-18.0);
        pattern.on_segment_change(Some(&soft));
        assert_eq!(pattern.level(), 0.0);

        let mut hit = Segment::new(0.3, 0.3);
        hit.loudness_start = Some(-30.0);
        hit.loudness_max = Some(-8.0);
        pattern.on_segment_change(Some(&hit));
        assert_eq!(pattern.level(), 1.0);

        pattern.on_segment_change(None);
        assert_eq!(pattern.level(), 1.0);
    }
}
