//! Register-level simulation of the radio.
//!
//! [`SimulatedChip`] is a [`MockBus`] that reacts to the control registers the engine
//! drives: calibration units raise their done flag and fill in their result registers,
//! the synthesizer reports lock, and the DPD probe path returns measurements of a
//! simple compressing power amplifier. It implements [`RegisterIo`], so a [`Radio`]
//! can be run against it unchanged.
//!
//! [`Radio`]: crate::Radio

use crate::hardware::regmap::{
    CAL_INDEX_NONE, CHIP_ID_ADDR, ChipId, DoneFlag, Field, RegisterMap, StageKind,
};
use crate::hardware::rf_chip::predistortion::Measurement;
use std::collections::HashSet;
use wifirf_globals::Band;
use wifirf_regs::mock::MockBus;
use wifirf_regs::{RegisterIo, Result};

/// Probe gain from which the simulated PA saturates at large TX scales.
pub const DEFAULT_SATURATING_GAIN: u8 = 8;
/// TX scale from which a saturating gain drives the PA into compression.
pub const SATURATING_SCALE: u32 = 200;
/// Amplitude reported by a compressed PA.
pub const SATURATED_AMPLITUDE: u16 = 511;

/// Phase offset of the simulated PA at zero drive.
const PA_PHASE_OFFSET: u32 = 8100;

pub struct SimulatedChip {
    bus: MockBus,
    map: &'static RegisterMap,
    stuck_stages: HashSet<StageKind>,
    synth_stuck: bool,
    saturating_gain: u8,
    pinned_amplitude: Option<u16>,
}

impl SimulatedChip {
    pub fn new(id: ChipId) -> Self {
        Self {
            bus: MockBus::new().with_register(CHIP_ID_ADDR, id.encode()),
            map: RegisterMap::for_revision(id.revision),
            stuck_stages: HashSet::new(),
            synth_stuck: false,
            saturating_gain: DEFAULT_SATURATING_GAIN,
            pinned_amplitude: None,
        }
    }

    /// Never raise the done flag of `kind`.
    pub fn with_stuck_stage(mut self, kind: StageKind) -> Self {
        self.stuck_stages.insert(kind);
        self
    }

    /// Never report synthesizer lock.
    pub fn with_stuck_synth(mut self) -> Self {
        self.synth_stuck = true;
        self
    }

    /// Saturate the PA at probe gains of `gain` and above. `0` saturates every gain.
    pub fn with_saturating_gain(mut self, gain: u8) -> Self {
        self.saturating_gain = gain;
        self
    }

    /// Report `amplitude` for every probe measurement, whatever the drive.
    pub fn with_pinned_amplitude(mut self, amplitude: u16) -> Self {
        self.pinned_amplitude = Some(amplitude);
        self
    }

    pub fn set_saturating_gain(&mut self, gain: u8) {
        self.saturating_gain = gain;
    }

    pub fn map(&self) -> &'static RegisterMap {
        self.map
    }

    pub fn bus(&self) -> &MockBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut MockBus {
        &mut self.bus
    }

    /// Hardware reset: everything but the chip-ID register returns to zero.
    pub fn hardware_reset(&mut self) {
        self.bus.reset(&[CHIP_ID_ADDR]);
        self.bus.clear_log();
    }

    /// Value the calibration unit of `kind` produces for `band` in result register
    /// `index`, before masking to the field width.
    pub fn result_pattern(kind: StageKind, band: Band, index: usize) -> u32 {
        let seed = 0x35 + 7 * kind.index() as u32 + 13 * band.index() as u32 + 3 * index as u32;
        seed | (seed.wrapping_mul(5) << 16)
    }

    /// Measurement of the simulated PA at `scale` and probe `gain`.
    pub fn pa_response(&self, scale: u32, gain: u32) -> Measurement {
        let linear = scale * (gain + 4) / 8;
        let amplitude = if let Some(amplitude) = self.pinned_amplitude {
            amplitude
        } else if gain >= self.saturating_gain as u32 && scale >= SATURATING_SCALE {
            SATURATED_AMPLITUDE
        } else {
            (linear - linear * linear / 4096).min(509) as u16
        };
        Measurement {
            amplitude,
            phase: ((PA_PHASE_OFFSET + linear / 4) & 0x1fff) as u16,
        }
    }

    fn selected_band(&self) -> Band {
        let index = self.field(self.map.band_sel) as u8;
        Band::try_from(index).unwrap_or_default()
    }

    fn field(&self, field: Field) -> u32 {
        self.bus.peek_field(field.addr, field.shift, field.mask)
    }

    fn poke(&mut self, field: Field, value: u32) {
        self.bus.poke_field(field.addr, value, field.shift, field.mask);
    }

    fn rising(field: Field, old: u32, new: u32) -> bool {
        field.extract(old) == 0 && field.extract(new) != 0
    }

    fn on_write(&mut self, addr: u32, old: u32, new: u32) {
        let map = self.map;

        if addr == map.cal_index.addr {
            self.on_cal_index(map.cal_index.extract(new));
        }
        if addr == map.synth_trigger.addr && Self::rising(map.synth_trigger, old, new) {
            self.poke(map.synth_lock, (!self.synth_stuck) as u32);
        }
        if addr == map.dpd_latch.addr && Self::rising(map.dpd_latch, old, new) {
            let response = self.pa_response(self.field(map.tx_scale), self.field(map.tx_gain));
            self.bus.poke(map.dpd_measure, response.encode());
        }
    }

    fn on_cal_index(&mut self, index: u32) {
        let map = self.map;
        if index == CAL_INDEX_NONE {
            self.poke(map.rx_cal_done, 0);
            self.poke(map.tx_cal_done, 0);
            return;
        }
        let Some(stage) = map.stages.iter().find(|stage| stage.cal_index == index) else {
            return;
        };
        if self.stuck_stages.contains(&stage.kind) {
            return;
        }

        let band = self.selected_band();
        for (slot, field) in map.result_fields(stage.kind, band).into_iter().enumerate() {
            self.poke(field, Self::result_pattern(stage.kind, band, slot));
        }
        let done = match stage.done {
            DoneFlag::Rx => map.rx_cal_done,
            DoneFlag::Tx => map.tx_cal_done,
        };
        self.poke(done, 1);
    }
}

impl RegisterIo for SimulatedChip {
    fn read_register(&mut self, addr: u32) -> Result<u32> {
        self.bus.read_register(addr)
    }

    fn write_register(&mut self, addr: u32, value: u32) -> Result<()> {
        let old = self.bus.peek(addr);
        self.bus.write_register(addr, value)?;
        self.on_write(addr, old, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::regmap::{ChipRevision, ChipVariant};

    fn chip() -> SimulatedChip {
        SimulatedChip::new(ChipId {
            revision: ChipRevision::RevA,
            variant: ChipVariant::DualBand,
        })
    }

    #[test]
    fn cal_index_raises_done() {
        let mut sim = chip();
        let map = sim.map();

        sim.write_register(map.cal_index.addr, 0x04).unwrap();
        assert_eq!(sim.bus().peek_field(map.tx_cal_done.addr, 1, 1), 1);

        sim.write_register(map.cal_index.addr, 0).unwrap();
        assert_eq!(sim.bus().peek(map.tx_cal_done.addr), 0);
    }

    #[test]
    fn stuck_stage_stays_low() {
        let mut sim = chip().with_stuck_stage(StageKind::RxDc);
        let map = sim.map();

        sim.write_register(map.cal_index.addr, 0x01).unwrap();

        assert_eq!(sim.bus().peek(map.rx_cal_done.addr), 0);
    }

    #[test]
    fn pa_saturates_at_configured_gain() {
        let sim = chip().with_saturating_gain(3);

        assert_eq!(sim.pa_response(368, 3).amplitude, SATURATED_AMPLITUDE);
        assert!(sim.pa_response(368, 2).amplitude < 510);
        assert!(sim.pa_response(64, 4).amplitude < 510);
    }

    #[test]
    fn pinned_amplitude_ignores_drive() {
        let sim = chip().with_pinned_amplitude(510);

        assert_eq!(sim.pa_response(8, 0).amplitude, 510);
        assert_eq!(sim.pa_response(368, 7).amplitude, 510);
    }

    #[test]
    fn reset_keeps_chip_id() {
        let mut sim = chip();
        sim.write_register(0xccb0_0004, 0x2).unwrap();

        sim.hardware_reset();

        assert_eq!(sim.bus().peek(0xccb0_0004), 0);
        assert_ne!(sim.bus().peek(CHIP_ID_ADDR), 0);
    }
}
