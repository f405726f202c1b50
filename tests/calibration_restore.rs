mod common;

use crate::common::*;

use libwifirf_rs::hardware::regmap::Field;
use libwifirf_rs::hardware::rf_chip::iq_calibration::plan;
use libwifirf_rs::{
    AgBand, Band, CalibrationResult, ChannelType, DpdState, Radio, Result, RfPatch, Xtal,
};
use std::collections::HashSet;
use wifirf_regs::delay::CountingDelay;

fn assert_registers_hold(radio: &SimRadio, ag_band: AgBand, cal: &CalibrationResult) {
    let map = radio.chip().map();
    for (kind, band) in plan(ag_band) {
        let registers: Vec<u32> = map
            .result_fields(kind, band)
            .into_iter()
            .map(|f| field(radio, f))
            .collect();
        assert_eq!(registers, cal.values(kind, band), "{kind:?} on {band}");
    }
}

#[test]
fn soft_reset_restores_without_recalibrating() -> Result<()> {
    logging_init("calibration_restore");

    let radio = brought_up(dual_band_chip(), AgBand::BandBoth)?;
    let (mut sim, delay, cal, dpd) = radio.into_parts();

    sim.hardware_reset();
    let mut radio = Radio::with_state(sim, delay, cal.clone(), dpd)?;
    let report = radio.init_system(Xtal::Mhz40, AgBand::BandBoth, &RfPatch::default())?;
    let map = radio.chip().map();

    assert!(report.is_empty());
    assert!(written(&radio, map.cal_index).iter().all(|&index| index == 0));
    assert_eq!(radio.calibration(), &cal);
    assert_registers_hold(&radio, AgBand::BandBoth, &cal);
    Ok(())
}

#[test]
fn persisted_blobs_survive_reset() -> Result<()> {
    logging_init("calibration_restore");

    let mut radio = brought_up(dual_band_chip(), AgBand::BandBoth)?;
    radio.change_channel(6, ChannelType::Ht20)?;
    let (mut sim, _, cal, dpd) = radio.into_parts();
    let (cal_blob, dpd_blob) = (cal.to_bytes(), dpd.to_bytes());

    sim.hardware_reset();
    let mut radio = Radio::with_state(
        sim,
        CountingDelay::new(),
        CalibrationResult::from_bytes(&cal_blob)?,
        DpdState::from_bytes(&dpd_blob)?,
    )?;
    radio.init_system(Xtal::Mhz40, AgBand::BandBoth, &RfPatch::default())?;
    assert_registers_hold(&radio, AgBand::BandBoth, &cal);
    assert_eq!(radio.dpd_state(), &dpd);

    // The DPD table is gone after the reset and comes back from the shadow copy
    clear_log(&mut radio);
    radio.change_channel(6, ChannelType::Ht20)?;
    let map = radio.chip().map();
    assert_eq!(
        field(&radio, Field::word(map.am_word(0))),
        dpd.table[Band::Band2G].am[0]
    );
    assert!(
        written(&radio, map.tx_scale).is_empty(),
        "no retraining after restore"
    );
    Ok(())
}

#[test]
fn restore_follows_calibration_order() -> Result<()> {
    logging_init("calibration_restore");

    let cal = brought_up(dual_band_chip(), AgBand::BandBoth)?
        .into_parts()
        .2;
    let mut radio = Radio::with_state(
        dual_band_chip(),
        CountingDelay::new(),
        cal.clone(),
        DpdState::new(),
    )?;
    let map = radio.chip().map();

    radio.restore(AgBand::BandBoth)?;
    assert_registers_hold(&radio, AgBand::BandBoth, &cal);

    let result_addrs: HashSet<u32> = plan(AgBand::BandBoth)
        .into_iter()
        .flat_map(|(kind, band)| map.result_fields(kind, band))
        .map(|f| f.addr)
        .collect();
    let order: Vec<u32> = radio
        .chip()
        .bus()
        .bus()
        .writes()
        .map(|(addr, _)| addr)
        .filter(|addr| result_addrs.contains(addr))
        .collect();

    assert_eq!(order.first(), Some(&map.rx_dc_word(Band::Band2G, 0).addr));
    assert_eq!(order.last(), Some(&map.rx_iq_theta(Band::Band5900).addr));
    Ok(())
}

#[test]
fn restore_2g_leaves_5g_untouched() -> Result<()> {
    logging_init("calibration_restore");

    let cal = brought_up(dual_band_chip(), AgBand::BandBoth)?
        .into_parts()
        .2;
    let mut radio = Radio::with_state(
        dual_band_chip(),
        CountingDelay::new(),
        cal.clone(),
        DpdState::new(),
    )?;
    let map = radio.chip().map();

    radio.restore(AgBand::Band2G)?;

    assert_registers_hold(&radio, AgBand::Band2G, &cal);
    assert_eq!(field(&radio, map.rx_dc_word(Band::Band5100, 0)), 0);
    assert_eq!(field(&radio, map.tx_iq_alpha(Band::Band5500)), 0);
    assert_eq!(field(&radio, map.tx_dc_i_5g), 0);
    Ok(())
}
