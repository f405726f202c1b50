//! Types and constants shared between the register transport and the
//! calibration engine.

pub mod band;

pub use band::{Band, PerBand};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum GlobalsError {
    #[error("unknown band index {0}")]
    UnknownBand(u8),
    #[error("unknown crystal selector {0}")]
    UnknownXtal(u8),
}

/// Lowest and highest 2.4 GHz channel numbers.
pub const CHANNEL_2G_MIN: u32 = 1;
pub const CHANNEL_2G_MAX: u32 = 14;

/// Lowest and highest 5 GHz channel numbers.
pub const CHANNEL_5G_MIN: u32 = 34;
pub const CHANNEL_5G_MAX: u32 = 196;

/// 802.11 channel width and secondary channel placement.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub enum ChannelType {
    #[default]
    NoHt,
    Ht20,
    /// 40 MHz, secondary channel below the primary.
    Ht40Minus,
    /// 40 MHz, secondary channel above the primary.
    Ht40Plus,
}

impl ChannelType {
    pub fn is_ht40(&self) -> bool {
        matches!(self, ChannelType::Ht40Minus | ChannelType::Ht40Plus)
    }

    pub fn is_20mhz(&self) -> bool {
        !self.is_ht40()
    }
}

/// Which halves of the radio are calibrated and used.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub enum AgBand {
    /// 2.4 GHz only.
    #[default]
    Band2G,
    /// 2.4 GHz plus all four 5 GHz sub-bands.
    BandBoth,
}

impl AgBand {
    pub fn is_dual(&self) -> bool {
        *self == AgBand::BandBoth
    }

    pub fn supports(&self, band: Band) -> bool {
        self.is_dual() || !band.is_5g()
    }

    /// Bands calibrated for this capability, 2.4 GHz first.
    pub fn bands(&self) -> &'static [Band] {
        match self {
            AgBand::Band2G => &Band::ALL[..1],
            AgBand::BandBoth => &Band::ALL,
        }
    }
}

/// Crystal frequency selector, written verbatim into the xtal field.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
#[repr(u8)]
pub enum Xtal {
    Mhz16 = 0,
    Mhz24 = 1,
    Mhz26 = 2,
    #[default]
    Mhz40 = 3,
    Mhz12 = 4,
    Mhz20 = 5,
    Mhz25 = 6,
    Mhz32 = 7,
    Mhz19p2 = 8,
    Mhz38p4 = 9,
    Mhz52 = 10,
}

impl Xtal {
    pub fn khz(&self) -> u32 {
        match self {
            Xtal::Mhz16 => 16_000,
            Xtal::Mhz24 => 24_000,
            Xtal::Mhz26 => 26_000,
            Xtal::Mhz40 => 40_000,
            Xtal::Mhz12 => 12_000,
            Xtal::Mhz20 => 20_000,
            Xtal::Mhz25 => 25_000,
            Xtal::Mhz32 => 32_000,
            Xtal::Mhz19p2 => 19_200,
            Xtal::Mhz38p4 => 38_400,
            Xtal::Mhz52 => 52_000,
        }
    }
}

impl TryFrom<u8> for Xtal {
    type Error = GlobalsError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Xtal::Mhz16,
            1 => Xtal::Mhz24,
            2 => Xtal::Mhz26,
            3 => Xtal::Mhz40,
            4 => Xtal::Mhz12,
            5 => Xtal::Mhz20,
            6 => Xtal::Mhz25,
            7 => Xtal::Mhz32,
            8 => Xtal::Mhz19p2,
            9 => Xtal::Mhz38p4,
            10 => Xtal::Mhz52,
            _ => {
                log::error!("unsupported crystal selector {value}");
                return Err(GlobalsError::UnknownXtal(value));
            }
        })
    }
}
