//! Workaround for the receive spur on the upper 2.4 GHz channels.
//!
//! The spur shows up on channel 13 and above, and from channel 9 upwards when the
//! secondary 40 MHz channel is above the primary. Affected channels get a front-end
//! retune and the PHY spur canceller; the narrow cases additionally need a pair of
//! FFT bins erased, whose position depends on the chip variant.

use crate::Result;
use crate::board::radio::Radio;
use crate::hardware::regmap::ChipVariant;
use wifirf_globals::{Band, ChannelType};
use wifirf_regs::{DelayNs, RegisterIo};

/// RX front-end setting with the spur moved out of band.
pub const RX_FE_SPUR_PATCH: u32 = 0x5;
/// RX front-end reset value.
pub const RX_FE_SPUR_BASELINE: u32 = 0x0;

/// Channel / channel type combination affected by the spur.
pub fn spur_triggered(channel: u32, channel_type: ChannelType) -> bool {
    channel >= 13 || (channel >= 9 && channel_type == ChannelType::Ht40Plus)
}

/// FFT bin pair to erase for `channel`, if any.
pub fn comb_erase_pair(
    channel: u32,
    channel_type: ChannelType,
    variant: ChipVariant,
) -> Option<[u32; 2]> {
    let narrow = channel == 13 && channel_type.is_20mhz();
    let wide = (channel == 9 && channel_type == ChannelType::Ht40Plus)
        || (channel == 13 && channel_type == ChannelType::Ht40Minus);

    match (narrow, wide, variant) {
        (true, _, ChipVariant::SingleBand) => Some([22, 23]),
        (true, _, ChipVariant::DualBand) => Some([42, 43]),
        (_, true, ChipVariant::SingleBand) => Some([54, 55]),
        (_, true, ChipVariant::DualBand) => Some([38, 39]),
        _ => None,
    }
}

impl<B: RegisterIo, D: DelayNs> Radio<B, D> {
    /// Return the spur registers to their baseline. Safe to call when no patch is active.
    pub fn remove_spur_patch(&mut self) -> Result<()> {
        let map = self.chip.map();
        self.chip.set(map.rx_fe_spur, RX_FE_SPUR_BASELINE)?;
        self.chip.set(map.spur_cancel_enable, 0)?;
        self.chip.set(map.comb_erase_enable, 0)?;
        for field in map.comb_erase_idx {
            self.chip.set(field, 0)?;
        }
        self.dpd.spur_patched = false;
        Ok(())
    }

    /// Apply the spur patch if `channel` needs it. Returns whether it was applied.
    ///
    /// Only evaluated once the band is calibrated, since the patch shifts the RX front
    /// end away from the setting the calibration ran with.
    pub fn evaluate_spur(
        &mut self,
        channel: u32,
        channel_type: ChannelType,
        band: Band,
    ) -> Result<bool> {
        if !self.cal.cal_iq_done[band] {
            log::debug!("band {band} not calibrated, skipping spur evaluation");
            return Ok(false);
        }
        if !spur_triggered(channel, channel_type) {
            return Ok(false);
        }

        let map = self.chip.map();
        log::debug!("Applying spur patch for channel {channel} {channel_type:?}");
        self.chip.set(map.rx_fe_spur, RX_FE_SPUR_PATCH)?;
        self.chip.set(map.spur_cancel_enable, 1)?;

        let variant = self.chip.chip_variant()?;
        if let Some(pair) = comb_erase_pair(channel, channel_type, variant) {
            log::trace!("comb erase {pair:?}");
            for (field, index) in map.comb_erase_idx.into_iter().zip(pair) {
                self.chip.set(field, index)?;
            }
            self.chip.set(map.comb_erase_enable, 1)?;
        }

        self.dpd.spur_patched = true;
        Ok(true)
    }
}
