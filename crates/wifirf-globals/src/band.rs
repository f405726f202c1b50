use crate::{CHANNEL_2G_MAX, CHANNEL_2G_MIN, CHANNEL_5G_MAX, CHANNEL_5G_MIN, GlobalsError};
use std::fmt;
use std::ops::{Index, IndexMut};

/// Power amplifier bias domains. Each one is calibrated independently.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Band {
    #[default]
    Band2G = 0,
    Band5100 = 1,
    Band5500 = 2,
    Band5700 = 3,
    Band5900 = 4,
}

impl Band {
    pub const COUNT: usize = 5;

    pub const ALL: [Band; Band::COUNT] = [
        Band::Band2G,
        Band::Band5100,
        Band::Band5500,
        Band::Band5700,
        Band::Band5900,
    ];

    /// The four 5 GHz sub-bands, in calibration order.
    pub const SUB_BANDS_5G: [Band; 4] = [
        Band::Band5100,
        Band::Band5500,
        Band::Band5700,
        Band::Band5900,
    ];

    /// Map a channel number onto its PA band.
    ///
    /// Returns `None` for channels outside of 1..=14 and 34..=196.
    pub const fn from_channel(channel: u32) -> Option<Band> {
        match channel {
            CHANNEL_2G_MIN..=CHANNEL_2G_MAX => Some(Band::Band2G),
            CHANNEL_5G_MIN..=99 => Some(Band::Band5100),
            100..=135 => Some(Band::Band5500),
            136..=160 => Some(Band::Band5700),
            161..=CHANNEL_5G_MAX => Some(Band::Band5900),
            _ => None,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn is_5g(self) -> bool {
        !matches!(self, Band::Band2G)
    }

    /// Channel the synthesizer is parked on while calibrating this band.
    pub const fn reference_channel(self) -> u32 {
        match self {
            Band::Band2G => 7,
            Band::Band5100 => 36,
            Band::Band5500 => 100,
            Band::Band5700 => 140,
            Band::Band5900 => 165,
        }
    }
}

impl TryFrom<u8> for Band {
    type Error = GlobalsError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Band::Band2G),
            1 => Ok(Band::Band5100),
            2 => Ok(Band::Band5500),
            3 => Ok(Band::Band5700),
            4 => Ok(Band::Band5900),
            _ => {
                log::error!("unsupported band index {value}");
                Err(GlobalsError::UnknownBand(value))
            }
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Band::Band2G => "2.4G",
            Band::Band5100 => "5100",
            Band::Band5500 => "5500",
            Band::Band5700 => "5700",
            Band::Band5900 => "5900",
        };
        f.write_str(name)
    }
}

/// One value per [`Band`], indexable by band.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PerBand<T>(pub [T; Band::COUNT]);

impl<T: Copy> PerBand<T> {
    pub const fn splat(value: T) -> Self {
        PerBand([value; Band::COUNT])
    }

    pub fn iter(&self) -> impl Iterator<Item = (Band, T)> + '_ {
        Band::ALL.iter().map(move |&band| (band, self[band]))
    }
}

impl<T> Index<Band> for PerBand<T> {
    type Output = T;

    fn index(&self, band: Band) -> &T {
        &self.0[band.index()]
    }
}

impl<T> IndexMut<Band> for PerBand<T> {
    fn index_mut(&mut self, band: Band) -> &mut T {
        &mut self.0[band.index()]
    }
}
