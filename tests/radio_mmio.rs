mod common;

use crate::common::*;

use libwifirf_rs::hardware::regmap::{
    ChipId, ChipRevision, ChipVariant, Field, REGISTER_WINDOW_BASE, REGISTER_WINDOW_LEN,
};
use libwifirf_rs::hardware::rf_chip::iq_calibration::plan;
use libwifirf_rs::{AgBand, ChannelType, DpdState, Radio, Result};
use std::ptr::NonNull;
use wifirf_regs::delay::CountingDelay;
use wifirf_regs::mmio::MmioBus;

const REV_B_DUAL: ChipId = ChipId {
    revision: ChipRevision::RevB,
    variant: ChipVariant::DualBand,
};

/// A host buffer standing in for the mapped register window, chip ID in place.
fn register_window(id: ChipId) -> Vec<u32> {
    let mut window = vec![0u32; REGISTER_WINDOW_LEN / 4];
    window[0] = id.encode();
    window
}

fn mmio_bus(window: &mut [u32]) -> MmioBus {
    let base = NonNull::new(window.as_mut_ptr()).unwrap();
    unsafe { MmioBus::new(base, REGISTER_WINDOW_BASE, window.len() * 4) }
}

fn peek(window: &[u32], field: Field) -> u32 {
    let index = ((field.addr - REGISTER_WINDOW_BASE) / 4) as usize;
    field.extract(window[index])
}

#[test]
fn radio_detects_chip_over_mmio() -> Result<()> {
    logging_init("radio_mmio");

    let mut window = register_window(REV_B_DUAL);
    let radio = Radio::new(mmio_bus(&mut window), CountingDelay::new())?;

    assert_eq!(radio.chip().id(), REV_B_DUAL);
    assert_eq!(radio.chip().map().revision, ChipRevision::RevB);
    Ok(())
}

#[test]
fn restore_and_switch_over_mmio() -> Result<()> {
    logging_init("radio_mmio");

    let sim = sim_chip(ChipRevision::RevB, ChipVariant::DualBand);
    let cal = brought_up(sim, AgBand::BandBoth)?.into_parts().2;
    let mut window = register_window(REV_B_DUAL);
    let mut radio = Radio::with_state(
        mmio_bus(&mut window),
        CountingDelay::new(),
        cal.clone(),
        DpdState::new(),
    )?;
    let map = radio.chip().map();

    radio.restore(AgBand::BandBoth)?;
    // Nothing drives the lock bit, which only costs a warning
    radio.change_channel(6, ChannelType::Ht20)?;
    drop(radio);

    for (kind, band) in plan(AgBand::BandBoth) {
        let registers: Vec<u32> = map
            .result_fields(kind, band)
            .into_iter()
            .map(|f| peek(&window, f))
            .collect();
        assert_eq!(registers, cal.values(kind, band), "{kind:?} on {band}");
    }
    assert_eq!(peek(&window, map.synth_2g_channel), 6);
    Ok(())
}
