use crate::Result;
use crate::board::radio::Radio;
use crate::hardware::rf_chip::predistortion::DpdOutcome;
use wifirf_globals::Band;
use wifirf_regs::{DelayNs, RegisterIo};

/// Probe gain of the first training attempt.
pub const DPD_INITIAL_GAIN_2G: u8 = 4;
pub const DPD_INITIAL_GAIN_5G: u8 = 2;

pub fn initial_gain(band: Band) -> u8 {
    if band.is_5g() {
        DPD_INITIAL_GAIN_5G
    } else {
        DPD_INITIAL_GAIN_2G
    }
}

impl<B: RegisterIo, D: DelayNs> Radio<B, D> {
    /// Train the table of `band`, backing the probe gain off by one step after every
    /// saturated sweep.
    ///
    /// Returns the number of attempts made when training succeeded. When even gain 0
    /// saturates, DPD is disabled for `band` and `None` is returned.
    pub fn train_dpd(&mut self, band: Band) -> Result<Option<u32>> {
        let initial = initial_gain(band);
        for (attempt, gain) in (0..=initial).rev().enumerate() {
            match self.chip.train_dpd(band, gain, &mut self.dpd)? {
                DpdOutcome::Trained => {
                    log::debug!("DPD trained on band {band} at gain {gain}");
                    return Ok(Some(attempt as u32 + 1));
                }
                DpdOutcome::Saturated { step, amplitude } => {
                    log::debug!(
                        "DPD on band {band} saturated at gain {gain} (step {step}, amplitude {amplitude})"
                    );
                }
            }
        }

        log::warn!(
            "DPD training exhausted on band {band} after {} attempts, disabling",
            initial as u32 + 1
        );
        self.dpd.dpd_disable[band] = true;
        self.chip.set_dpd_enable(false)?;
        Ok(None)
    }

    /// Make sure the live DPD table matches `band`: train it on first use, swap tables
    /// on a band change, verify it otherwise.
    pub fn check_dpd(&mut self, band: Band) -> Result<()> {
        if self.dpd.dpd_disable[band] {
            return self.chip.set_dpd_enable(false);
        }
        if !self.dpd.dpd_done[band] {
            self.train_dpd(band)?;
        } else if self.dpd.current_band != band {
            self.chip.load_dpd(band, &mut self.dpd)?;
        } else {
            self.chip.verify_dpd_table(band, &self.dpd)?;
            self.chip.activate_dpd(band, &self.dpd)?;
        }
        Ok(())
    }

    /// Allow DPD on `band` again. Takes effect immediately when the radio is tuned to
    /// `band`, otherwise on the next switch to it.
    pub fn enable_dpd(&mut self, band: Band) -> Result<()> {
        self.dpd.dpd_disable[band] = false;
        if self.band() == Some(band) && self.chip.phy_enabled()? {
            self.check_dpd(band)?;
        }
        Ok(())
    }

    /// Keep DPD off on `band` until [`Radio::enable_dpd`].
    pub fn disable_dpd(&mut self, band: Band) -> Result<()> {
        self.dpd.dpd_disable[band] = true;
        if self.band() == Some(band) {
            self.chip.set_dpd_enable(false)?;
        }
        Ok(())
    }
}
