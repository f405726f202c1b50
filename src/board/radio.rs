pub mod bringup;
pub mod channel;
pub mod dpd;
pub mod spur;

use crate::Result;
use crate::calibration::{CalibrationResult, DpdState};
use crate::hardware::rf_chip::RfChip;
use wifirf_globals::{AgBand, Band, ChannelType};
use wifirf_regs::{DelayNs, RegisterIo};

/// Progress of a channel switch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SwitchPhase {
    #[default]
    Idle,
    CalibrationChecked,
    BandwidthConfigured,
    BandSelected,
    SpurEvaluated,
    Active,
}

/// Driver context of one radio.
///
/// Owns the register-level chip handle together with the calibration results and the
/// DPD state, so every entry point borrows the whole context mutably for its duration.
pub struct Radio<B, D> {
    chip: RfChip<B, D>,
    cal: CalibrationResult,
    dpd: DpdState,
    ag_band: AgBand,
    channel: Option<(u32, ChannelType)>,
    phase: SwitchPhase,
}

impl<B: RegisterIo, D: DelayNs> Radio<B, D> {
    /// Identify the chip behind `bus` and create a context with empty calibration state.
    pub fn new(bus: B, delay: D) -> Result<Self> {
        Self::with_state(bus, delay, CalibrationResult::default(), DpdState::default())
    }

    /// Create a context from calibration state persisted before a soft reset.
    ///
    /// When `cal.cal_done` is set, the next [`Radio::init_system`] restores the results
    /// instead of recalibrating.
    pub fn with_state(bus: B, delay: D, cal: CalibrationResult, dpd: DpdState) -> Result<Self> {
        let chip = RfChip::new(bus, delay)?;
        Ok(Self {
            chip,
            cal,
            dpd,
            ag_band: AgBand::default(),
            channel: None,
            phase: SwitchPhase::Idle,
        })
    }

    pub fn chip(&self) -> &RfChip<B, D> {
        &self.chip
    }

    pub fn chip_mut(&mut self) -> &mut RfChip<B, D> {
        &mut self.chip
    }

    pub fn calibration(&self) -> &CalibrationResult {
        &self.cal
    }

    pub fn dpd_state(&self) -> &DpdState {
        &self.dpd
    }

    pub fn ag_band(&self) -> AgBand {
        self.ag_band
    }

    /// Channel and channel type of the last completed switch.
    pub fn channel(&self) -> Option<(u32, ChannelType)> {
        self.channel
    }

    /// Band of the last completed switch.
    pub fn band(&self) -> Option<Band> {
        self.channel.and_then(|(channel, _)| Band::from_channel(channel))
    }

    pub fn phase(&self) -> SwitchPhase {
        self.phase
    }

    /// Tear the context down, handing back the transport, the delay provider and the
    /// state to persist.
    pub fn into_parts(self) -> (B, D, CalibrationResult, DpdState) {
        let (bus, delay) = self.chip.into_parts();
        (bus, delay, self.cal, self.dpd)
    }
}
