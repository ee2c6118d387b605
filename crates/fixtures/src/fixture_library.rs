use crate::{ChannelField, FixtureKind};

/// Static description of a fixture model: channel order plus the values a
/// freshly patched fixture starts with. Unlisted channels start at zero.
#[derive(Debug)]
pub struct FixtureProfile {
    pub kind: FixtureKind,
    pub class_name: &'static str,
    pub manufacturer: &'static str,
    pub model: &'static str,
    pub channel_layout: &'static [ChannelField],
    pub defaults: &'static [(ChannelField, u8)],
}

impl std::fmt::Display for FixtureProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.manufacturer, self.model)
    }
}

pub(crate) static MOVING_HEAD_LIGHT: FixtureProfile = FixtureProfile {
    kind: FixtureKind::MovingHeadLight,
    class_name: "MovingHeadLight",
    manufacturer: "Generic",
    model: "RGBW Moving Head",
    channel_layout: &[
        ChannelField::Pan,
        ChannelField::PanFine,
        ChannelField::Tilt,
        ChannelField::TiltFine,
        ChannelField::MoveSpeed,
        // 134 selects plain dimmer mode on these heads
        ChannelField::Level,
        ChannelField::Red,
        ChannelField::Green,
        ChannelField::Blue,
        ChannelField::White,
        ChannelField::ColorPreset,
        ChannelField::ColorCycleSpeed,
        ChannelField::Control,
        ChannelField::Reset,
    ],
    defaults: &[(ChannelField::Level, 134)],
};

pub(crate) static LED_WASH: FixtureProfile = FixtureProfile {
    kind: FixtureKind::LedWash,
    class_name: "LEDWash",
    manufacturer: "Generic",
    model: "RGB LED Wash",
    channel_layout: &[
        ChannelField::Brightness,
        ChannelField::Red,
        ChannelField::Green,
        ChannelField::Blue,
        ChannelField::Strobe,
        ChannelField::Control,
        ChannelField::Speed,
    ],
    defaults: &[],
};

pub(crate) static MINI_SPIDER: FixtureProfile = FixtureProfile {
    kind: FixtureKind::MiniSpider,
    class_name: "MiniSpider",
    manufacturer: "Generic",
    model: "Mini Spider 8x3W",
    channel_layout: &[
        ChannelField::Motor1,
        ChannelField::Motor2,
        ChannelField::Dimmer,
        ChannelField::Strobe,
        ChannelField::Led1,
        ChannelField::Led2,
        ChannelField::Led3,
        ChannelField::Led4,
        ChannelField::Led5,
        ChannelField::Led6,
        ChannelField::Led7,
        ChannelField::Led8,
        ChannelField::Macro,
        ChannelField::Speed,
        ChannelField::Reset,
    ],
    defaults: &[(ChannelField::Dimmer, 255)],
};
