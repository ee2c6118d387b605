use serde::{Deserialize, Serialize};

pub use fixture_library::FixtureProfile;
pub use frame::{Frame, UNIVERSE_SIZE};

mod fixture_library;
mod frame;

/// A named channel field on a fixture. The order a fixture exposes them in is
/// fixed by its [`FixtureKind`] profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelField {
    Pan,
    PanFine,
    Tilt,
    TiltFine,
    MoveSpeed,
    Level,
    Brightness,
    Dimmer,
    Red,
    Green,
    Blue,
    White,
    ColorPreset,
    ColorCycleSpeed,
    Strobe,
    Control,
    Speed,
    Reset,
    Motor1,
    Motor2,
    Led1,
    Led2,
    Led3,
    Led4,
    Led5,
    Led6,
    Led7,
    Led8,
    Macro,
}

impl std::fmt::Display for ChannelField {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            ChannelField::Pan => "pan",
            ChannelField::PanFine => "pan_fine",
            ChannelField::Tilt => "tilt",
            ChannelField::TiltFine => "tilt_fine",
            ChannelField::MoveSpeed => "move_speed",
            ChannelField::Level => "level",
            ChannelField::Brightness => "brightness",
            ChannelField::Dimmer => "dimmer",
            ChannelField::Red => "r",
            ChannelField::Green => "g",
            ChannelField::Blue => "b",
            ChannelField::White => "w",
            ChannelField::ColorPreset => "color_preset",
            ChannelField::ColorCycleSpeed => "color_cycle_speed",
            ChannelField::Strobe => "strobe",
            ChannelField::Control => "control",
            ChannelField::Speed => "speed",
            ChannelField::Reset => "reset",
            ChannelField::Motor1 => "motor1",
            ChannelField::Motor2 => "motor2",
            ChannelField::Led1 => "led1",
            ChannelField::Led2 => "led2",
            ChannelField::Led3 => "led3",
            ChannelField::Led4 => "led4",
            ChannelField::Led5 => "led5",
            ChannelField::Led6 => "led6",
            ChannelField::Led7 => "led7",
            ChannelField::Led8 => "led8",
            ChannelField::Macro => "macro",
        };
        write!(f, "{}", name)
    }
}

/// Supported fixture models. The serialized names match the `class` values in
/// the stage configuration file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FixtureKind {
    MovingHeadLight,
    #[serde(rename = "LEDWash", alias = "LedWash")]
    LedWash,
    MiniSpider,
}

impl FixtureKind {
    pub fn profile(&self) -> &'static FixtureProfile {
        match self {
            FixtureKind::MovingHeadLight => &fixture_library::MOVING_HEAD_LIGHT,
            FixtureKind::LedWash => &fixture_library::LED_WASH,
            FixtureKind::MiniSpider => &fixture_library::MINI_SPIDER,
        }
    }

    pub fn class_name(&self) -> &'static str {
        self.profile().class_name
    }

    /// Logical fields that fan out to several physical channels on this kind.
    fn aliases(&self, field: ChannelField) -> Option<&'static [ChannelField]> {
        match (self, field) {
            (FixtureKind::MiniSpider, ChannelField::Red) => {
                Some(&[ChannelField::Led1, ChannelField::Led5])
            }
            (FixtureKind::MiniSpider, ChannelField::Green) => {
                Some(&[ChannelField::Led2, ChannelField::Led6])
            }
            (FixtureKind::MiniSpider, ChannelField::Blue) => {
                Some(&[ChannelField::Led3, ChannelField::Led7])
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for FixtureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.class_name())
    }
}

/// A patched fixture: its kind, where it starts in the channel space, and the
/// current value of every channel in mapping order.
#[derive(Clone, Debug)]
pub struct Fixture {
    pub name: String,
    pub kind: FixtureKind,
    /// Zero-based offset of the first channel within the frame.
    pub address: usize,
    values: Vec<u8>,
}

impl Fixture {
    pub fn new(name: &str, kind: FixtureKind, address: usize) -> Self {
        let profile = kind.profile();
        let mut fixture = Fixture {
            name: name.to_string(),
            kind,
            address,
            values: vec![0; profile.channel_layout.len()],
        };
        for (field, value) in profile.defaults {
            fixture.set(*field, *value);
        }
        fixture
    }

    pub fn mapping(&self) -> &'static [ChannelField] {
        self.kind.profile().channel_layout
    }

    fn index_of(&self, field: ChannelField) -> Option<usize> {
        self.mapping().iter().position(|f| *f == field)
    }

    /// Whether writing `field` affects at least one channel of this fixture.
    pub fn supports(&self, field: ChannelField) -> bool {
        match self.kind.aliases(field) {
            Some(targets) => targets.iter().any(|f| self.index_of(*f).is_some()),
            None => self.index_of(field).is_some(),
        }
    }

    /// Set a channel value. Fields the fixture doesn't have are ignored.
    pub fn set(&mut self, field: ChannelField, value: u8) {
        if let Some(targets) = self.kind.aliases(field) {
            for target in targets {
                if let Some(index) = self.index_of(*target) {
                    self.values[index] = value;
                }
            }
            return;
        }

        if let Some(index) = self.index_of(field) {
            self.values[index] = value;
        }
    }

    pub fn get(&self, field: ChannelField) -> Option<u8> {
        let field = match self.kind.aliases(field) {
            Some(targets) => targets[0],
            None => field,
        };
        self.index_of(field).map(|index| self.values[index])
    }

    pub fn set_rgb(&mut self, r: u8, g: u8, b: u8) {
        self.set(ChannelField::Red, r);
        self.set(ChannelField::Green, g);
        self.set(ChannelField::Blue, b);
    }

    /// One value per mapped field, in mapping order.
    pub fn values(&self) -> &[u8] {
        &self.values
    }
}
