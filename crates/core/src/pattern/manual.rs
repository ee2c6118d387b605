use homestage_fixtures::Fixture;
use rand::RngCore;

use super::{Look, Pattern, PatternBehavior, PatternKind, RenderContext};
use crate::color::{unit_to_dmx, Color};
use crate::control::{dead_zone, Button, ManualControlState, Polar};
use crate::model::{Section, Segment, Track};

/// Trigger travel past which the sticks take over color and position.
const TRIGGER_THRESHOLD: f32 = 0.5;

/// Buttons that force an automatic variant, checked in this order.
const FORCED: [(Button, PatternKind); 3] = [
    (Button::Square, PatternKind::RainbowSweep),
    (Button::Circle, PatternKind::BloodPumper),
    (Button::Cross, PatternKind::MellowSweep),
];

/// Wraps the active automatic variant with gamepad control.
///
/// Square, circle and cross force a variant every tick they are held and drop
/// out of manual mode. Triangle enters manual mode, where the left stick picks
/// the color and the right stick aims the heads while the right trigger is
/// pulled. Releasing the trigger holds the last manual look.
#[derive(Debug)]
pub struct ManualOverride {
    pattern: Pattern,
    manual: bool,
    look: Look,
}

impl ManualOverride {
    pub fn new(pattern: Pattern) -> Self {
        Self {
            pattern,
            manual: false,
            look: manual_look(&ManualControlState::default()),
        }
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn kind(&self) -> PatternKind {
        self.pattern.kind()
    }

    pub fn is_manual(&self) -> bool {
        self.manual
    }

    /// Swap the automatic variant. Manual mode is unaffected.
    pub fn replace(&mut self, pattern: Pattern) {
        log::info!("Pattern changed: {} -> {}", self.pattern.kind(), pattern.kind());
        self.pattern = pattern;
    }
}

/// Map the sticks onto a look: left stick angle is hue and deflection is
/// value, right stick angle is pan and deflection lowers the tilt.
pub fn manual_look(control: &ManualControlState) -> Look {
    let color = Polar::from_axis(control.axis0);
    let position = Polar::from_axis(control.axis1);
    Look {
        pan: unit_to_dmx(position.turn as f64),
        tilt: unit_to_dmx(1.0 - dead_zone(position.magnitude) as f64),
        color: Color::from_hsv(color.turn as f64, 1.0, dead_zone(color.magnitude) as f64),
        brightness: 255,
    }
}

impl PatternBehavior for ManualOverride {
    fn on_media_change(&mut self, track: &Track) {
        self.pattern.on_media_change(track);
    }

    fn on_section_change(&mut self, section: Option<&Section>, rng: &mut dyn RngCore) {
        self.pattern.on_section_change(section, rng);
    }

    fn on_segment_change(&mut self, segment: Option<&Segment>) {
        self.pattern.on_segment_change(segment);
    }

    fn update(&mut self, fixtures: &mut [Fixture], ctx: &mut RenderContext) {
        let forced = FORCED
            .iter()
            .find(|(button, _)| ctx.control.pressed(*button))
            .map(|(_, kind)| *kind);

        if let Some(kind) = forced {
            if self.pattern.kind() != kind {
                let pattern = Pattern::new(kind, ctx.rng, ctx.time);
                self.replace(pattern);
            }
            if self.manual {
                log::info!("Manual control released");
                self.manual = false;
            }
        } else if ctx.control.pressed(Button::Triangle) && !self.manual {
            log::info!("Manual control engaged");
            self.manual = true;
        }

        if !self.manual {
            self.pattern.update(fixtures, ctx);
            return;
        }

        if ctx.control.rt > TRIGGER_THRESHOLD {
            self.look = manual_look(ctx.control);
        }
        for fixture in fixtures.iter_mut() {
            self.look.apply(fixture);
        }
    }
}

#[cfg(test)]
mod tests {
    use homestage_fixtures::ChannelField;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    use super::*;
    use crate::pattern::tests::{rig, snapshot};

    fn tick(
        wrapper: &mut ManualOverride,
        fixtures: &mut [Fixture],
        control: &ManualControlState,
        rng: &mut SmallRng,
    ) {
        let audio = snapshot(false, 120.0, 0.5);
        let mut ctx = RenderContext {
            time: 100.0,
            audio: &audio,
            control,
            rng,
        };
        wrapper.update(fixtures, &mut ctx);
    }

    #[test]
    fn test_buttons_force_variants() {
        let mut rng = SmallRng::seed_from_u64(11);
        let mut fixtures = rig();
        let mut wrapper =
            ManualOverride::new(Pattern::new(PatternKind::RainbowCycle, &mut rng, 0.0));

        let square = ManualControlState {
            square: true,
            ..Default::default()
        };
        tick(&mut wrapper, &mut fixtures, &square, &mut rng);
        assert_eq!(wrapper.kind(), PatternKind::RainbowSweep);

        let circle = ManualControlState {
            circle: true,
            ..Default::default()
        };
        tick(&mut wrapper, &mut fixtures, &circle, &mut rng);
        assert_eq!(wrapper.kind(), PatternKind::BloodPumper);

        // Held button re-selects only after something else replaced it
        wrapper.replace(Pattern::new(PatternKind::GrayResponseFastSweep, &mut rng, 0.0));
        tick(&mut wrapper, &mut fixtures, &circle, &mut rng);
        assert_eq!(wrapper.kind(), PatternKind::BloodPumper);

        let cross = ManualControlState {
            cross: true,
            ..Default::default()
        };
        tick(&mut wrapper, &mut fixtures, &cross, &mut rng);
        assert_eq!(wrapper.kind(), PatternKind::MellowSweep);
    }

    #[test]
    fn test_held_button_keeps_variant_state() {
        let mut rng = SmallRng::seed_from_u64(11);
        let mut fixtures = rig();
        let mut wrapper =
            ManualOverride::new(Pattern::new(PatternKind::RainbowCycle, &mut rng, 0.0));
        let square = ManualControlState {
            square: true,
            ..Default::default()
        };

        tick(&mut wrapper, &mut fixtures, &square, &mut rng);
        let Pattern::RainbowSweep(first) = wrapper.pattern() else {
            panic!("expected RainbowSweep");
        };
        let index = first.index();
        assert!(index > 0.0);

        // Same variant type, not rebuilt, so the index keeps its value
        tick(&mut wrapper, &mut fixtures, &square, &mut rng);
        let Pattern::RainbowSweep(second) = wrapper.pattern() else {
            panic!("expected RainbowSweep");
        };
        assert_eq!(second.index(), index);
    }

    #[test]
    fn test_manual_mode_follows_sticks_while_triggered() {
        let mut rng = SmallRng::seed_from_u64(11);
        let mut fixtures = rig();
        let mut wrapper =
            ManualOverride::new(Pattern::new(PatternKind::RainbowSweep, &mut rng, 0.0));

        let triangle = ManualControlState {
            triangle: true,
            ..Default::default()
        };
        tick(&mut wrapper, &mut fixtures, &triangle, &mut rng);
        assert!(wrapper.is_manual());
        // Centered sticks: dark, tilt up
        assert_eq!(fixtures[0].get(ChannelField::Red), Some(0));
        assert_eq!(fixtures[0].get(ChannelField::Tilt), Some(255));

        // Left stick pushed right at full deflection: hue 0.5, full value
        let steer = ManualControlState {
            axis0: [1.0, 0.0],
            axis1: [0.0, 0.55],
            rt: 1.0,
            ..Default::default()
        };
        tick(&mut wrapper, &mut fixtures, &steer, &mut rng);
        assert_eq!(fixtures[0].get(ChannelField::Red), Some(0));
        assert_eq!(fixtures[0].get(ChannelField::Green), Some(255));
        assert_eq!(fixtures[0].get(ChannelField::Blue), Some(255));
        assert_eq!(fixtures[0].get(ChannelField::Pan), Some(191));
        assert_eq!(fixtures[0].get(ChannelField::Tilt), Some(127));

        // Trigger released: sticks move, look holds
        let released = ManualControlState {
            axis0: [-1.0, 0.0],
            axis1: [0.0, 0.0],
            rt: 0.2,
            ..Default::default()
        };
        tick(&mut wrapper, &mut fixtures, &released, &mut rng);
        assert!(wrapper.is_manual());
        assert_eq!(fixtures[0].get(ChannelField::Green), Some(255));
        assert_eq!(fixtures[0].get(ChannelField::Pan), Some(191));

        // Forcing a variant leaves manual mode
        let square = ManualControlState {
            square: true,
            ..Default::default()
        };
        tick(&mut wrapper, &mut fixtures, &square, &mut rng);
        assert!(!wrapper.is_manual());
        assert_eq!(wrapper.kind(), PatternKind::RainbowSweep);
    }
}
