use crate::board::radio::{Radio, SwitchPhase};
use crate::{Error, Result};
use wifirf_globals::{Band, ChannelType};
use wifirf_regs::{DelayNs, RegisterIo};

impl<B: RegisterIo, D: DelayNs> Radio<B, D> {
    /// Switch the radio to `channel`.
    ///
    /// On first use of a band after the PHY is up, the band is calibrated and its DPD
    /// table trained before the switch completes. Switching again to the same channel
    /// leaves the registers in the same state.
    pub fn change_channel(
        &mut self,
        channel: u32,
        channel_type: ChannelType,
    ) -> Result<SwitchPhase> {
        let Some(band) = Band::from_channel(channel).filter(|&band| self.ag_band.supports(band))
        else {
            log::error!("invalid channel {channel} for {:?}", self.ag_band);
            return Err(Error::InvalidChannel(channel));
        };
        log::debug!("change_channel {channel} {channel_type:?} (band {band})");

        self.phase = SwitchPhase::Idle;
        self.chip.set_rx_paths(None)?;
        self.remove_spur_patch()?;

        if self.chip.phy_enabled()? {
            if !self.cal.cal_iq_done[band] {
                self.chip.calibrate_band(band, &mut self.cal)?;
                self.cal.refresh_done(self.ag_band);
            }
            self.check_dpd(band)?;
            self.phase = SwitchPhase::CalibrationChecked;
        }

        self.chip.set_bandwidth(channel_type)?;
        self.phase = SwitchPhase::BandwidthConfigured;

        self.chip.select_band(band)?;
        self.chip.set_timing(band)?;
        self.phase = SwitchPhase::BandSelected;

        if band.is_5g() {
            self.phase = SwitchPhase::SpurEvaluated;
            self.chip.program_synth_5g(band, channel)?;
        } else {
            self.evaluate_spur(channel, channel_type, band)?;
            self.phase = SwitchPhase::SpurEvaluated;
            self.chip.program_synth(band, channel)?;
        }

        self.chip.set_rx_paths(Some(band))?;
        self.channel = Some((channel, channel_type));
        self.phase = SwitchPhase::Active;
        Ok(self.phase)
    }
}
