use crate::Result;
use crate::board::radio::{Radio, SwitchPhase};
use crate::config::RfPatch;
use crate::hardware::regmap::{CAL_INDEX_NONE, ChipVariant};
use crate::hardware::rf_chip::RfMode;
use crate::hardware::rf_chip::iq_calibration::CalReport;
use wifirf_globals::{AgBand, Band, Xtal};
use wifirf_regs::{DelayNs, RegisterIo};

impl<B: RegisterIo, D: DelayNs> Radio<B, D> {
    /// Bring the radio up for `ag_band`.
    ///
    /// Loads the reset configuration and the board trims, then either calibrates every
    /// band of `ag_band` or, if the calibration state says so, restores the stored
    /// results. The PHY is enabled on return.
    pub fn init_system(
        &mut self,
        xtal: Xtal,
        ag_band: AgBand,
        patch: &RfPatch,
    ) -> Result<CalReport> {
        let ag_band = if ag_band.is_dual() && self.chip.id().variant == ChipVariant::SingleBand {
            log::warn!("single band chip, ignoring 5 GHz capability");
            AgBand::Band2G
        } else {
            ag_band
        };
        log::debug!("init_system: xtal {} kHz, {ag_band:?}", xtal.khz());
        self.ag_band = ag_band;
        self.channel = None;
        self.phase = SwitchPhase::Idle;

        self.load_init_table()?;
        self.apply_patch(xtal, ag_band, patch)?;

        let report = if self.cal.cal_done {
            log::debug!("calibration results present, restoring");
            self.restore(ag_band)?;
            CalReport::default()
        } else {
            self.chip.calibrate_all(ag_band, &mut self.cal)?
        };

        self.chip.set_mode(RfMode::Run)?;
        self.chip.enable_phy(true)?;
        Ok(report)
    }

    /// Write the stored calibration results of `ag_band` into the result registers.
    pub fn restore(&mut self, ag_band: AgBand) -> Result<()> {
        self.chip.restore_results(ag_band, &self.cal)
    }

    fn load_init_table(&mut self) -> Result<()> {
        let map = self.chip.map();
        self.chip.enable_phy(false)?;
        self.chip.set_mode(RfMode::Standby)?;
        self.chip.set_rx_paths(None)?;
        self.chip.set(map.cal_index, CAL_INDEX_NONE)?;
        self.chip.set(map.tx_gain_manual, 0)?;
        self.chip.set_dpd_enable(false)?;
        self.chip.set_timing(Band::Band2G)?;
        self.remove_spur_patch()
    }

    fn apply_patch(&mut self, xtal: Xtal, ag_band: AgBand, patch: &RfPatch) -> Result<()> {
        let map = self.chip.map();
        self.chip.set(map.xtal, xtal as u32)?;
        self.chip.set(map.ldo_trim, patch.ldo_trim as u32)?;
        self.chip.set(map.buck_trim, patch.buck_trim as u32)?;
        for &band in ag_band.bands() {
            self.chip.set(map.pa_bias(band), patch.pa_bias[band] as u32)?;
            self.chip.set(map.pa_vcas(band), patch.pa_vcas[band] as u32)?;
        }
        self.dpd.bb_scale = patch.bb_scale;
        Ok(())
    }
}
