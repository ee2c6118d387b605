/// Tempo-gated pulse clock.
///
/// A pulse fires when the detector reports an onset or when more than one beat
/// period has passed since the previous pulse. An unknown tempo (0) never
/// pulses, not even on an onset.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PulseClock {
    last_pulse: Option<f64>,
}

impl PulseClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a pulse is due at `now` without recording it.
    pub fn is_due(&self, now: f64, beat: bool, tempo: f32) -> bool {
        if tempo <= 0.0 {
            return false;
        }
        if beat {
            return true;
        }
        match self.last_pulse {
            Some(last) => now - last > 60.0 / tempo as f64,
            None => true,
        }
    }

    /// Check for a pulse and record it when one fires.
    pub fn tick(&mut self, now: f64, beat: bool, tempo: f32) -> bool {
        let due = self.is_due(now, beat, tempo);
        if due {
            self.last_pulse = Some(now);
        }
        due
    }

    pub fn last_pulse(&self) -> Option<f64> {
        self.last_pulse
    }
}
