#![allow(dead_code)]
/// This module has been created using mod.rs in a subfolder, instead of just creating a common.rs under tests
/// This is due to the test runner then not searching for runnable tests in mod.rs
/// https://doc.rust-lang.org/rust-by-example/testing/integration_testing.html
use libwifirf_rs::hardware::regmap::{ChipId, ChipRevision, ChipVariant, Field};
use libwifirf_rs::sim::SimulatedChip;
use libwifirf_rs::{AgBand, Radio, Result, RfPatch, Xtal};
use wifirf_regs::delay::CountingDelay;

pub type SimRadio = Radio<SimulatedChip, CountingDelay>;

pub fn logging_init(module: &str) {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Error)
        .filter_module(module, log::LevelFilter::Trace)
        .try_init();
}

pub fn sim_chip(revision: ChipRevision, variant: ChipVariant) -> SimulatedChip {
    SimulatedChip::new(ChipId { revision, variant })
}

pub fn dual_band_chip() -> SimulatedChip {
    sim_chip(ChipRevision::RevA, ChipVariant::DualBand)
}

pub fn radio(sim: SimulatedChip) -> Result<SimRadio> {
    Radio::new(sim, CountingDelay::new())
}

/// A radio on `sim`, brought up for `ag_band` with default trims.
pub fn brought_up(sim: SimulatedChip, ag_band: AgBand) -> Result<SimRadio> {
    let mut radio = radio(sim)?;
    radio.init_system(Xtal::Mhz40, ag_band, &RfPatch::default())?;
    Ok(radio)
}

/// Current value of `field`, read without touching the access log.
pub fn field(radio: &SimRadio, field: Field) -> u32 {
    radio
        .chip()
        .bus()
        .bus()
        .peek_field(field.addr, field.shift, field.mask)
}

/// Values of every write to the register holding `field`, extracted for `field`.
pub fn written(radio: &SimRadio, field: Field) -> Vec<u32> {
    radio
        .chip()
        .bus()
        .bus()
        .writes()
        .filter(|&(addr, _)| addr == field.addr)
        .map(|(_, value)| field.extract(value))
        .collect()
}

pub fn clear_log(radio: &mut SimRadio) {
    radio.chip_mut().bus_mut().bus_mut().clear_log();
}

pub fn snapshot(radio: &SimRadio) -> Vec<(u32, u32)> {
    radio.chip().bus().bus().snapshot()
}
