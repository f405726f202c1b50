mod common;

use crate::common::*;

use libwifirf_rs::board::radio::spur::{RX_FE_SPUR_BASELINE, RX_FE_SPUR_PATCH};
use libwifirf_rs::hardware::regmap::{ChipRevision, ChipVariant};
use libwifirf_rs::hardware::rf_chip::{RX_PATH_2G, RX_PATH_5G, SIFS_2G, SIFS_5G};
use libwifirf_rs::{AgBand, Band, ChannelType, Error, Result, SwitchPhase};

#[test]
fn invalid_channel_touches_no_register() -> Result<()> {
    logging_init("radio_channel");

    let mut radio = brought_up(dual_band_chip(), AgBand::BandBoth)?;
    clear_log(&mut radio);

    for channel in [0, 15, 33, 197, 1000] {
        assert_eq!(
            radio.change_channel(channel, ChannelType::Ht20),
            Err(Error::InvalidChannel(channel))
        );
    }
    assert!(radio.chip().bus().bus().log().is_empty());
    assert_eq!(radio.channel(), None);
    Ok(())
}

#[test]
fn five_ghz_channel_needs_dual_band_bring_up() -> Result<()> {
    logging_init("radio_channel");

    let mut radio = brought_up(dual_band_chip(), AgBand::Band2G)?;
    clear_log(&mut radio);

    assert_eq!(
        radio.change_channel(36, ChannelType::Ht20),
        Err(Error::InvalidChannel(36))
    );
    assert!(radio.chip().bus().bus().log().is_empty());
    Ok(())
}

#[test]
fn switch_2g() -> Result<()> {
    logging_init("radio_channel");

    let mut radio = brought_up(dual_band_chip(), AgBand::Band2G)?;
    let phase = radio.change_channel(6, ChannelType::Ht40Minus)?;
    let map = radio.chip().map();

    assert_eq!(phase, SwitchPhase::Active);
    assert_eq!(radio.phase(), SwitchPhase::Active);
    assert_eq!(radio.channel(), Some((6, ChannelType::Ht40Minus)));
    assert_eq!(field(&radio, map.synth_2g_channel), 6);
    assert_eq!(field(&radio, map.synth_lock), 1);
    assert_eq!(field(&radio, map.bw40), 1);
    assert_eq!(field(&radio, map.prim_upper), 1);
    assert_eq!(field(&radio, map.sifs), SIFS_2G);
    assert_eq!(field(&radio, map.band_sel), Band::Band2G.index() as u32);
    assert_eq!(field(&radio, map.rx_path_enable), RX_PATH_2G);

    radio.change_channel(6, ChannelType::Ht40Plus)?;
    assert_eq!(field(&radio, map.bw40), 1);
    assert_eq!(field(&radio, map.prim_upper), 0);

    radio.change_channel(6, ChannelType::NoHt)?;
    assert_eq!(field(&radio, map.bw40), 0);
    Ok(())
}

#[test]
fn switch_5g() -> Result<()> {
    logging_init("radio_channel");

    let mut radio = brought_up(dual_band_chip(), AgBand::BandBoth)?;
    radio.change_channel(149, ChannelType::Ht20)?;
    let map = radio.chip().map();

    assert_eq!(radio.band(), Some(Band::Band5700));
    assert_eq!(field(&radio, map.synth_5g_channel), 149);
    assert_eq!(field(&radio, map.sifs), SIFS_5G);
    assert_eq!(field(&radio, map.band_sel), Band::Band5700.index() as u32);
    assert_eq!(field(&radio, map.rx_path_enable), RX_PATH_5G);
    assert!(!radio.dpd_state().spur_patched);
    Ok(())
}

#[test]
fn co_channel_guard_hops_and_returns() -> Result<()> {
    logging_init("radio_channel");

    let mut radio = brought_up(dual_band_chip(), AgBand::BandBoth)?;
    let map = radio.chip().map();

    // Calibration left the synthesizer parked on the 5900 reference channel
    clear_log(&mut radio);
    radio.change_channel(36, ChannelType::Ht20)?;
    assert_eq!(written(&radio, map.synth_5g_channel), vec![36]);

    clear_log(&mut radio);
    radio.change_channel(36, ChannelType::Ht20)?;
    assert_eq!(written(&radio, map.synth_5g_channel), vec![40, 36]);

    radio.change_channel(196, ChannelType::Ht20)?;
    clear_log(&mut radio);
    radio.change_channel(196, ChannelType::Ht20)?;
    assert_eq!(written(&radio, map.synth_5g_channel), vec![192, 196]);
    Ok(())
}

#[test]
fn back_to_back_switch_is_idempotent() -> Result<()> {
    logging_init("radio_channel");

    let mut radio = brought_up(dual_band_chip(), AgBand::BandBoth)?;

    for (channel, channel_type) in [
        (6, ChannelType::Ht20),
        (13, ChannelType::NoHt),
        (9, ChannelType::Ht40Plus),
        (36, ChannelType::Ht40Plus),
        (165, ChannelType::Ht20),
    ] {
        radio.change_channel(channel, channel_type)?;
        let first = snapshot(&radio);
        let spur = radio.dpd_state().spur_patched;

        radio.change_channel(channel, channel_type)?;

        assert_eq!(snapshot(&radio), first, "channel {channel} {channel_type:?}");
        assert_eq!(radio.dpd_state().spur_patched, spur);
    }
    Ok(())
}

#[test]
fn spur_patch_dual_band() -> Result<()> {
    logging_init("radio_channel");

    let mut radio = brought_up(dual_band_chip(), AgBand::BandBoth)?;
    let map = radio.chip().map();

    radio.change_channel(13, ChannelType::Ht20)?;
    assert!(radio.dpd_state().spur_patched);
    assert_eq!(field(&radio, map.rx_fe_spur), RX_FE_SPUR_PATCH);
    assert_eq!(field(&radio, map.spur_cancel_enable), 1);
    assert_eq!(field(&radio, map.comb_erase_enable), 1);
    assert_eq!(field(&radio, map.comb_erase_idx[0]), 42);
    assert_eq!(field(&radio, map.comb_erase_idx[1]), 43);

    radio.change_channel(13, ChannelType::Ht40Minus)?;
    assert_eq!(field(&radio, map.comb_erase_idx[0]), 38);
    assert_eq!(field(&radio, map.comb_erase_idx[1]), 39);

    // Wide trigger without comb erase
    radio.change_channel(14, ChannelType::Ht20)?;
    assert!(radio.dpd_state().spur_patched);
    assert_eq!(field(&radio, map.comb_erase_enable), 0);
    assert_eq!(field(&radio, map.comb_erase_idx[0]), 0);

    radio.change_channel(6, ChannelType::Ht20)?;
    assert!(!radio.dpd_state().spur_patched);
    assert_eq!(field(&radio, map.rx_fe_spur), RX_FE_SPUR_BASELINE);
    assert_eq!(field(&radio, map.spur_cancel_enable), 0);
    Ok(())
}

#[test]
fn spur_patch_single_band() -> Result<()> {
    logging_init("radio_channel");

    let mut radio = brought_up(
        sim_chip(ChipRevision::RevB, ChipVariant::SingleBand),
        AgBand::Band2G,
    )?;
    let map = radio.chip().map();

    radio.change_channel(13, ChannelType::NoHt)?;
    assert_eq!(field(&radio, map.comb_erase_idx[0]), 22);
    assert_eq!(field(&radio, map.comb_erase_idx[1]), 23);

    radio.change_channel(9, ChannelType::Ht40Plus)?;
    assert_eq!(field(&radio, map.comb_erase_idx[0]), 54);
    assert_eq!(field(&radio, map.comb_erase_idx[1]), 55);

    radio.change_channel(9, ChannelType::Ht40Minus)?;
    assert!(!radio.dpd_state().spur_patched);
    assert_eq!(field(&radio, map.comb_erase_enable), 0);
    Ok(())
}

#[test]
fn switch_before_phy_enable_skips_calibration() -> Result<()> {
    logging_init("radio_channel");

    let mut radio = radio(dual_band_chip())?;
    let map = radio.chip().map();

    assert_eq!(radio.change_channel(13, ChannelType::NoHt)?, SwitchPhase::Active);

    assert!(!radio.calibration().cal_iq_done[Band::Band2G]);
    assert!(!radio.dpd_state().dpd_done[Band::Band2G]);
    // Spur evaluation waits for the band to be calibrated
    assert!(!radio.dpd_state().spur_patched);
    assert!(written(&radio, map.cal_index).is_empty());
    Ok(())
}

#[test]
fn first_use_of_band_calibrates_before_spur_evaluation() -> Result<()> {
    logging_init("radio_channel");

    let mut radio = radio(dual_band_chip())?;
    radio.chip_mut().enable_phy(true)?;

    radio.change_channel(13, ChannelType::NoHt)?;

    assert!(radio.calibration().cal_iq_done[Band::Band2G]);
    assert!(radio.calibration().cal_done);
    assert!(radio.dpd_state().dpd_done[Band::Band2G]);
    assert!(radio.dpd_state().spur_patched);
    Ok(())
}

#[test]
fn missing_synth_lock_is_not_fatal() -> Result<()> {
    logging_init("radio_channel");

    let mut radio = brought_up(dual_band_chip().with_stuck_synth(), AgBand::BandBoth)?;

    assert_eq!(radio.change_channel(100, ChannelType::Ht20)?, SwitchPhase::Active);
    assert_eq!(field(&radio, radio.chip().map().synth_lock), 0);
    Ok(())
}
