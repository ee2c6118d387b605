pub mod oscillator;
pub mod pulse;

pub use oscillator::{
    sawtooth_effect, sine_effect, square_effect, triangle_effect, Oscillator, Waveform,
};
pub use pulse::PulseClock;
