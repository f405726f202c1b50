//! Bring up a simulated radio, calibrate it, hop over a few channels and persist the
//! results.
//!
//! ```bash
//! cargo run --package calibrate -- both 1 13 36 149
//! ```

use anyhow::{Result, anyhow};
use libwifirf_rs::hardware::regmap::{ChipId, ChipRevision, ChipVariant};
use libwifirf_rs::sim::SimulatedChip;
use libwifirf_rs::{AgBand, CalibrationResult, ChannelType, DpdState, Radio, RfPatch};
use wifirf_regs::delay::CountingDelay;

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .init();

    let mut args = std::env::args().skip(1);
    let ag_band = match args.next().as_deref() {
        None | Some("2g") => AgBand::Band2G,
        Some("both") => AgBand::BandBoth,
        Some(other) => return Err(anyhow!("unknown capability {other}, expected 2g or both")),
    };
    let channels = args
        .map(|arg| arg.parse::<u32>())
        .collect::<Result<Vec<_>, _>>()?;

    let id = ChipId {
        revision: ChipRevision::RevB,
        variant: ChipVariant::DualBand,
    };
    let patch = RfPatch::default();

    let mut radio = Radio::new(SimulatedChip::new(id), CountingDelay::new())?;
    let report = radio.init_system(patch.xtal, ag_band, &patch)?;
    log::info!(
        "Calibrated {} stages, {} timed out, busy-wait {:?}",
        report.len(),
        report.timeouts().count(),
        radio.chip().delay().total()
    );

    for channel in channels {
        let phase = radio.change_channel(channel, ChannelType::Ht20)?;
        log::info!(
            "Channel {channel}: {phase:?}, spur patch {}",
            radio.dpd_state().spur_patched
        );
    }

    let (mut sim, delay, cal, dpd) = radio.into_parts();
    let cal_blob = cal.to_bytes();
    let dpd_blob = dpd.to_bytes();
    log::info!(
        "Persisted {} + {} bytes of calibration state",
        cal_blob.len(),
        dpd_blob.len()
    );

    // Soft reset, then bring the radio back up from the persisted state
    sim.hardware_reset();
    let mut radio = Radio::with_state(
        sim,
        delay,
        CalibrationResult::from_bytes(&cal_blob)?,
        DpdState::from_bytes(&dpd_blob)?,
    )?;
    let report = radio.init_system(patch.xtal, ag_band, &patch)?;
    log::info!("Restored without recalibration: {}", report.is_empty());

    Ok(())
}
