use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

/// Magnitudes below this are treated as a centered stick.
pub const DEAD_ZONE: f32 = 0.1;

/// Latest gamepad state pushed from the control surface. Every field is
/// optional on the wire; missing buttons are released and missing axes and
/// triggers are zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManualControlState {
    /// Left stick, x and y in roughly `[-1, 1]`.
    pub axis0: [f32; 2],
    /// Right stick.
    pub axis1: [f32; 2],
    pub lb: bool,
    pub rb: bool,
    /// Analog triggers in `[0, 1]`.
    pub lt: f32,
    pub rt: f32,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub triangle: bool,
    pub square: bool,
    pub circle: bool,
    pub cross: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Button {
    Lb,
    Rb,
    Left,
    Right,
    Up,
    Down,
    Triangle,
    Square,
    Circle,
    Cross,
}

impl ManualControlState {
    pub fn pressed(&self, button: Button) -> bool {
        match button {
            Button::Lb => self.lb,
            Button::Rb => self.rb,
            Button::Left => self.left,
            Button::Right => self.right,
            Button::Up => self.up,
            Button::Down => self.down,
            Button::Triangle => self.triangle,
            Button::Square => self.square,
            Button::Circle => self.circle,
            Button::Cross => self.cross,
        }
    }
}

/// A stick position decomposed into direction and deflection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Polar {
    /// Direction as a fraction of a full turn in `[0, 1)`.
    pub turn: f32,
    /// Raw deflection; diagonals can exceed 1.
    pub magnitude: f32,
}

impl Polar {
    pub fn from_axis(axis: [f32; 2]) -> Self {
        let [x, y] = axis;
        let turn = ((y.atan2(x) + PI) / (2.0 * PI)).rem_euclid(1.0);
        Self {
            turn,
            magnitude: x.hypot(y),
        }
    }
}

/// Rescale a stick magnitude so everything inside the dead zone reads 0 and
/// the remainder spans `[0, 1]`.
pub fn dead_zone(magnitude: f32) -> f32 {
    if magnitude < DEAD_ZONE {
        return 0.0;
    }
    ((magnitude - DEAD_ZONE) / (1.0 - DEAD_ZONE)).min(1.0)
}
