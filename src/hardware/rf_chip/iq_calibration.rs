use crate::Result;
use crate::calibration::CalibrationResult;
use crate::hardware::regmap::{CAL_INDEX_NONE, Knob, StageKind};
use crate::hardware::rf_chip::{RfChip, RfMode};
use wifirf_globals::{AgBand, Band};
use wifirf_regs::{DelayNs, RegisterIo};

/// Stages of the 2.4 GHz path, in execution order.
pub const SEQUENCE_2G: [StageKind; 6] = [
    StageKind::RxDc,
    StageKind::RcBw20,
    StageKind::RcBw40,
    StageKind::TxDc,
    StageKind::TxIq,
    StageKind::RxIq,
];

/// Stages run once per 5 GHz sub-band, after the shared RX DC stage.
pub const SEQUENCE_5G_PER_BAND: [StageKind; 3] =
    [StageKind::TxDc, StageKind::TxIq, StageKind::RxIq];

/// Knobs forced by the stage descriptors, released once a sequence ends.
const CAL_KNOBS: [Knob; 5] = [
    Knob::RxGainManual,
    Knob::ToneEnable,
    Knob::ToneFreq,
    Knob::TxLoopback,
    Knob::RcTargetBw,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// The done flag rose after `polls` reads.
    Done { polls: u32 },
    /// The done flag did not rise within the iteration cap.
    TimedOut { polls: u32 },
}

impl StageOutcome {
    pub fn is_timeout(&self) -> bool {
        matches!(self, StageOutcome::TimedOut { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageRecord {
    pub kind: StageKind,
    pub band: Band,
    pub outcome: StageOutcome,
}

/// Outcome of every stage of a calibration run, in execution order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CalReport {
    pub stages: Vec<StageRecord>,
}

impl CalReport {
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn timeouts(&self) -> impl Iterator<Item = &StageRecord> {
        self.stages.iter().filter(|record| record.outcome.is_timeout())
    }

    /// True if no stage ran into its iteration cap.
    pub fn is_clean(&self) -> bool {
        self.timeouts().next().is_none()
    }

    pub fn bands(&self) -> Vec<Band> {
        let mut bands: Vec<Band> = self.stages.iter().map(|record| record.band).collect();
        bands.sort();
        bands.dedup();
        bands
    }
}

/// Stage plan of the 2.4 GHz path.
pub fn plan_2g() -> Vec<(StageKind, Band)> {
    SEQUENCE_2G
        .iter()
        .map(|&kind| (kind, Band::Band2G))
        .collect()
}

/// Stage plan of the requested 5 GHz sub-bands: one shared RX DC stage on the first
/// sub-band, then TX DC, TX IQ and RX IQ for each sub-band.
pub fn plan_5g(bands: &[Band]) -> Vec<(StageKind, Band)> {
    let mut plan = Vec::with_capacity(1 + bands.len() * SEQUENCE_5G_PER_BAND.len());
    let Some(&first) = bands.first() else {
        return plan;
    };
    plan.push((StageKind::RxDc, first));
    for &band in bands {
        plan.extend(SEQUENCE_5G_PER_BAND.iter().map(|&kind| (kind, band)));
    }
    plan
}

/// Full stage plan of a capability, 2.4 GHz first.
pub fn plan(ag_band: AgBand) -> Vec<(StageKind, Band)> {
    let mut plan = plan_2g();
    if ag_band.is_dual() {
        plan.extend(plan_5g(&Band::SUB_BANDS_5G));
    }
    plan
}

impl<B: RegisterIo, D: DelayNs> RfChip<B, D> {
    /// Run a single calibration stage and capture its results into `cal`.
    ///
    /// A stage that does not complete within its iteration cap is abandoned; the
    /// result registers are captured as they are.
    pub fn run_stage(
        &mut self,
        kind: StageKind,
        band: Band,
        cal: &mut CalibrationResult,
    ) -> Result<StageOutcome> {
        let map = self.map();
        let stage = map.stage(kind);
        log::debug!("{} calibration, band {band}", stage.name);

        for &(knob, value) in stage.setup {
            self.set(map.knob(knob), value)?;
        }
        self.select_band(band)?;
        if band.is_5g() {
            self.program_synth(band, band.reference_channel())?;
        }

        self.set(map.cal_index, stage.cal_index)?;
        let outcome = match self.poll(map.done_flag(stage.done), 1, stage.poll)? {
            Some(polls) => StageOutcome::Done { polls },
            None => {
                log::warn!(
                    "{} calibration of band {band} timed out after {} polls",
                    stage.name,
                    stage.poll.cap
                );
                StageOutcome::TimedOut {
                    polls: stage.poll.cap,
                }
            }
        };

        let values = map
            .result_fields(kind, band)
            .into_iter()
            .map(|field| self.get(field))
            .collect::<Result<Vec<u32>>>()?;
        log::trace!("{} results: {values:x?}", stage.name);
        cal.store(kind, band, &values);

        self.set(map.cal_index, CAL_INDEX_NONE)?;
        Ok(outcome)
    }

    /// Run `plan` in order with an inter-stage reset between every two stages.
    ///
    /// Marks every band that had stages attempted as calibrated and leaves the chip in
    /// run mode.
    pub fn run_sequence(
        &mut self,
        plan: &[(StageKind, Band)],
        cal: &mut CalibrationResult,
    ) -> Result<CalReport> {
        let mut report = CalReport::default();
        self.set_mode(RfMode::Calibration)?;

        for (step, &(kind, band)) in plan.iter().enumerate() {
            if step > 0 {
                self.reset_cal_mode()?;
            }
            let outcome = self.run_stage(kind, band, cal)?;
            report.stages.push(StageRecord {
                kind,
                band,
                outcome,
            });
        }

        for band in report.bands() {
            cal.cal_iq_done[band] = true;
        }

        for knob in CAL_KNOBS {
            self.set(self.map().knob(knob), 0)?;
        }
        self.set_mode(RfMode::Run)?;

        if !report.is_clean() {
            log::warn!(
                "calibration finished with {} timed out stage(s)",
                report.timeouts().count()
            );
        }
        Ok(report)
    }

    pub fn calibrate_2g(&mut self, cal: &mut CalibrationResult) -> Result<CalReport> {
        self.run_sequence(&plan_2g(), cal)
    }

    pub fn calibrate_5g(
        &mut self,
        bands: &[Band],
        cal: &mut CalibrationResult,
    ) -> Result<CalReport> {
        self.run_sequence(&plan_5g(bands), cal)
    }

    /// Calibrate the path of a single band.
    pub fn calibrate_band(&mut self, band: Band, cal: &mut CalibrationResult) -> Result<CalReport> {
        if band.is_5g() {
            self.calibrate_5g(&[band], cal)
        } else {
            self.calibrate_2g(cal)
        }
    }

    /// Calibrate every band of `ag_band` and update `cal.cal_done`.
    pub fn calibrate_all(
        &mut self,
        ag_band: AgBand,
        cal: &mut CalibrationResult,
    ) -> Result<CalReport> {
        let report = self.run_sequence(&plan(ag_band), cal)?;
        cal.refresh_done(ag_band);
        log::debug!(
            "calibrated {} stage(s), cal_done = {}",
            report.len(),
            cal.cal_done
        );
        Ok(report)
    }

    /// Write previously captured results back into the result registers, in
    /// calibration order.
    pub fn restore_results(&mut self, ag_band: AgBand, cal: &CalibrationResult) -> Result<()> {
        let map = self.map();
        for (kind, band) in plan(ag_band) {
            let fields = map.result_fields(kind, band);
            let values = cal.values(kind, band);
            for (field, value) in fields.into_iter().zip(values) {
                self.set(field, value)?;
            }
        }
        Ok(())
    }
}
