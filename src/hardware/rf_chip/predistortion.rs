use crate::Result;
use crate::calibration::{DPD_AM_MAX, DPD_PM_MASK, DPD_POINTS, DPD_WORDS, DpdState, DpdTable};
use crate::hardware::rf_chip::{RfChip, RfMode};
use wifirf_globals::Band;
use wifirf_regs::{DelayNs, RegisterIo};

/// TX scale of every sweep step: six fine steps of 8, then twenty coarse steps of 16.
pub const SWEEP_SCALES: [u16; DPD_POINTS] = sweep_scales();

/// Measured amplitude at or above this value means the PA is compressed.
pub const SATURATION_AMPLITUDE: u16 = 510;

/* PA probe settings */
const PROBE_PGA: u32 = 0x6;
const PROBE_TONE_FREQ: u32 = 0x10;

/* Measurement register layout */
const AMPLITUDE_MASK: u32 = 0x1ff;
const PHASE_SHIFT: u32 = 9;
const PHASE_MASK: u32 = 0x1fff;

const fn sweep_scales() -> [u16; DPD_POINTS] {
    let mut scales = [0; DPD_POINTS];
    let mut step = 0;
    while step < 6 {
        scales[step] = 8 * (step as u16 + 1);
        step += 1;
    }
    while step < DPD_POINTS {
        scales[step] = 48 + 16 * (step as u16 - 5);
        step += 1;
    }
    scales
}

/// One decoded probe measurement.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Measurement {
    /// 9-bit amplitude.
    pub amplitude: u16,
    /// 13-bit phase.
    pub phase: u16,
}

impl Measurement {
    pub fn decode(raw: u32) -> Self {
        Self {
            amplitude: (raw & AMPLITUDE_MASK) as u16,
            phase: ((raw >> PHASE_SHIFT) & PHASE_MASK) as u16,
        }
    }

    pub fn encode(&self) -> u32 {
        (self.amplitude as u32 & AMPLITUDE_MASK)
            | ((self.phase as u32 & PHASE_MASK) << PHASE_SHIFT)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DpdOutcome {
    /// Table written and DPD enabled.
    Trained,
    /// Sweep aborted at `step` because the PA saturated. Retry with less gain.
    Saturated { step: usize, amplitude: u16 },
}

enum Sweep {
    Complete([Measurement; DPD_POINTS]),
    Saturated { step: usize, amplitude: u16 },
}

/// AM gain correction of one point, relative to the small-signal slope.
pub fn am_correction(scale: u16, amplitude: u16, slope: u32) -> u16 {
    if amplitude == 0 {
        return DPD_AM_MAX;
    }
    let gain = 512 * scale as u64 * slope as u64 / (amplitude as u64 * 1024);
    gain.min(DPD_AM_MAX as u64) as u16
}

/// Shortest signed distance from `reference` to `phase` on the 13-bit phase circle,
/// as a 13-bit two's complement value.
pub fn pm_correction(phase: u16, reference: u16) -> u16 {
    let period = DPD_PM_MASK as i32 + 1;
    let mut delta = (phase as i32 - reference as i32).rem_euclid(period);
    if delta >= period / 2 {
        delta -= period;
    }
    (delta as u16) & DPD_PM_MASK
}

/// Turn a complete sweep into AM and PM correction curves.
///
/// Point 0 gives the small-signal slope and the reference phase.
pub fn normalize(
    scales: &[u16; DPD_POINTS],
    points: &[Measurement; DPD_POINTS],
) -> ([u16; DPD_POINTS], [u16; DPD_POINTS]) {
    let slope = ((points[0].amplitude as u32) << 10) / scales[0].max(1) as u32;
    let reference = points[0].phase;

    let am = std::array::from_fn(|step| am_correction(scales[step], points[step].amplitude, slope));
    let pm = std::array::from_fn(|step| pm_correction(points[step].phase, reference));
    (am, pm)
}

impl<B: RegisterIo, D: DelayNs> RfChip<B, D> {
    /// Route a test tone into the PA at a fixed gain and start the probe unit.
    pub fn pre_padpd(&mut self, gain: u8) -> Result<()> {
        let map = self.map();
        log::debug!("PRE_PADPD, TX gain {gain}");

        self.set(map.dpd_enable, 0)?;
        self.set(map.tx_gain_manual, 1)?;
        self.set(map.tx_gain, gain as u32)?;
        self.set(map.pga, PROBE_PGA)?;
        self.set(map.tone_freq, PROBE_TONE_FREQ)?;
        self.set(map.tone_enable, 1)?;
        self.set(map.iq_source, 1)?;
        self.set(map.dc_removal_bypass, 1)?;
        self.set_mode(RfMode::Calibration)?;
        self.set(map.padpd_start, 1)
    }

    /// Undo [`RfChip::pre_padpd`] and return to `mode`.
    pub fn post_padpd(&mut self, mode: u32) -> Result<()> {
        let map = self.map();
        log::debug!("POST_PADPD");

        self.set(map.padpd_start, 0)?;
        self.set(map.tone_enable, 0)?;
        self.set(map.tone_freq, 0)?;
        self.set(map.dc_removal_bypass, 0)?;
        self.set(map.iq_source, 0)?;
        self.set(map.tx_gain_manual, 0)?;
        self.set(map.mode, mode)
    }

    pub fn measure(&mut self, scale: u16) -> Result<Measurement> {
        let map = self.map();
        self.set(map.tx_scale, scale as u32)?;
        self.pulse(map.dpd_latch)?;
        Ok(Measurement::decode(self.read(map.dpd_measure)?))
    }

    fn padpd_sweep(&mut self) -> Result<Sweep> {
        let mut points = [Measurement::default(); DPD_POINTS];
        for (step, &scale) in SWEEP_SCALES.iter().enumerate() {
            let point = self.measure(scale)?;
            log::trace!("sweep {step}: scale {scale} -> {point:?}");
            if point.amplitude >= SATURATION_AMPLITUDE {
                return Ok(Sweep::Saturated {
                    step,
                    amplitude: point.amplitude,
                });
            }
            points[step] = point;
        }
        Ok(Sweep::Complete(points))
    }

    pub fn write_dpd_table(&mut self, table: &DpdTable) -> Result<()> {
        let map = self.map();
        for word in 0..DPD_WORDS {
            self.write(map.am_word(word), table.am[word])?;
            self.write(map.pm_word(word), table.pm[word])?;
        }
        Ok(())
    }

    /// Load the shadow table of `band` and switch DPD on.
    pub fn load_dpd(&mut self, band: Band, state: &mut DpdState) -> Result<()> {
        log::debug!("Loading DPD table of band {band}");
        self.write_dpd_table(&state.table[band])?;
        self.activate_dpd(band, state)?;
        state.current_band = band;
        Ok(())
    }

    /// Apply the baseband scale of `band` and switch DPD on, assuming its table is live.
    pub fn activate_dpd(&mut self, band: Band, state: &DpdState) -> Result<()> {
        let map = self.map();
        self.set(map.bb_scale, state.bb_scale[band] as u32)?;
        self.set(map.dpd_enable, 1)
    }

    pub fn set_dpd_enable(&mut self, enable: bool) -> Result<()> {
        self.set(self.map().dpd_enable, enable as u32)
    }

    /// Compare the first hardware AM word against the shadow table of `band` and
    /// rewrite the table when they differ. Returns whether the table was intact.
    pub fn verify_dpd_table(&mut self, band: Band, state: &DpdState) -> Result<bool> {
        let live = self.read(self.map().am_word(0))?;
        let shadow = state.table[band].am[0];
        if live == shadow {
            return Ok(true);
        }
        log::warn!("stale DPD table for band {band} ({live:#010x} != {shadow:#010x}), restoring");
        self.write_dpd_table(&state.table[band])?;
        Ok(false)
    }

    /// One probe-and-correct pass on `band` at TX `gain`.
    ///
    /// The probe path is torn down again whatever the outcome.
    pub fn train_dpd(&mut self, band: Band, gain: u8, state: &mut DpdState) -> Result<DpdOutcome> {
        let mode = self.get(self.map().mode)?;
        self.pre_padpd(gain)?;
        let trained = self.probe_and_correct(band, state);
        let teardown = self.post_padpd(mode);
        let outcome = trained?;
        teardown?;
        Ok(outcome)
    }

    fn probe_and_correct(&mut self, band: Band, state: &mut DpdState) -> Result<DpdOutcome> {
        let points = match self.padpd_sweep()? {
            Sweep::Complete(points) => points,
            Sweep::Saturated { step, amplitude } => {
                log::debug!("PA saturated at sweep step {step} (amplitude {amplitude})");
                return Ok(DpdOutcome::Saturated { step, amplitude });
            }
        };

        let (am, pm) = normalize(&SWEEP_SCALES, &points);
        state.table[band] = DpdTable::pack(&am, &pm);
        self.load_dpd(band, state)?;
        state.dpd_done[band] = true;
        Ok(DpdOutcome::Trained)
    }
}
