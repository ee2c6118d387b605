use serde::{Deserialize, Serialize};

// Color representation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };
    pub const RED: Color = Color { r: 255, g: 0, b: 0 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }

    pub fn gray(level: u8) -> Self {
        Color {
            r: level,
            g: level,
            b: level,
        }
    }

    /// Build a color from hue, saturation and value, each in `[0, 1]`. Hue
    /// wraps, so 1.0 and 0.0 are both red.
    pub fn from_hsv(h: f64, s: f64, v: f64) -> Self {
        let s = s.clamp(0.0, 1.0);
        let v = v.clamp(0.0, 1.0);
        if s == 0.0 {
            return Color::from_unit(v, v, v);
        }

        let h = h.rem_euclid(1.0) * 6.0;
        let sector = h.floor();
        let f = h - sector;
        let p = v * (1.0 - s);
        let q = v * (1.0 - s * f);
        let t = v * (1.0 - s * (1.0 - f));

        match sector as u8 % 6 {
            0 => Color::from_unit(v, t, p),
            1 => Color::from_unit(q, v, p),
            2 => Color::from_unit(p, v, t),
            3 => Color::from_unit(p, q, v),
            4 => Color::from_unit(t, p, v),
            _ => Color::from_unit(v, p, q),
        }
    }

    fn from_unit(r: f64, g: f64, b: f64) -> Self {
        Color {
            r: unit_to_dmx(r),
            g: unit_to_dmx(g),
            b: unit_to_dmx(b),
        }
    }

    /// Every component multiplied by `factor`, clamped to the channel range.
    pub fn scale(&self, factor: f64) -> Self {
        let factor = factor.max(0.0);
        Color {
            r: (self.r as f64 * factor).min(255.0) as u8,
            g: (self.g as f64 * factor).min(255.0) as u8,
            b: (self.b as f64 * factor).min(255.0) as u8,
        }
    }
}

/// Map a `[0, 1]` intensity onto a channel value, truncating like the
/// fixtures expect.
pub fn unit_to_dmx(value: f64) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0) as u8
}
