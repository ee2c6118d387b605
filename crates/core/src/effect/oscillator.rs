use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

// Waveform shapes
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum Waveform {
    Sine,
    Sawtooth,
    Square,
    Triangle,
}

impl Waveform {
    // Takes a phase (0.0 to 1.0) and returns a value (0.0 to 1.0)
    pub fn apply(&self, phase: f64) -> f64 {
        let apply_fn = match self {
            Waveform::Sine => sine_effect,
            Waveform::Square => square_effect,
            Waveform::Sawtooth => sawtooth_effect,
            Waveform::Triangle => triangle_effect,
        };
        (apply_fn)(phase)
    }
}

/// A free-running oscillator over wall-clock seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Oscillator {
    pub waveform: Waveform,
    /// Cycles per second.
    pub frequency: f64,
    /// Phase offset in cycles.
    pub offset: f64,
}

impl Oscillator {
    pub const fn new(waveform: Waveform, frequency: f64) -> Self {
        Self {
            waveform,
            frequency,
            offset: 0.0,
        }
    }

    pub const fn with_offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }

    pub fn phase_at(&self, seconds: f64) -> f64 {
        (seconds * self.frequency + self.offset).rem_euclid(1.0)
    }

    /// Oscillator output in `[0, 1]`.
    pub fn value_at(&self, seconds: f64) -> f64 {
        self.waveform.apply(self.phase_at(seconds))
    }

    /// Oscillator output scaled to a channel value.
    pub fn dmx_at(&self, seconds: f64) -> u8 {
        (self.value_at(seconds) * 255.0).clamp(0.0, 255.0) as u8
    }
}

pub fn sine_effect(phase: f64) -> f64 {
    (phase * 2.0 * PI).sin() * 0.5 + 0.5
}

pub fn square_effect(phase: f64) -> f64 {
    if phase < 0.5 {
        1.0
    } else {
        0.0
    }
}

pub fn sawtooth_effect(phase: f64) -> f64 {
    phase
}

pub fn triangle_effect(phase: f64) -> f64 {
    if phase < 0.5 {
        phase * 2.0
    } else {
        2.0 - phase * 2.0
    }
}
