//! Calibration and channel-switch engine for a multi-band WiFi RF transceiver family.
//!
//! The engine drives the closed-loop analog calibrations of the radio (RX/TX DC offset
//! nulling, RC filter tuning, IQ imbalance correction and power amplifier digital
//! predistortion) and keeps their results so repeated channel switches only have to
//! restore them instead of recalibrating.
//!
//! ## Usage overview
//!
//! A [`Radio`] is created from a register transport implementing
//! [`wifirf_regs::RegisterIo`] and a delay provider implementing
//! [`embedded_hal::delay::DelayNs`]. The chip-ID register is read once and selects the
//! register map of the detected silicon revision.
//!
//! ```no_run
//! use libwifirf_rs::hardware::regmap::{REGISTER_WINDOW_BASE, REGISTER_WINDOW_LEN};
//! use libwifirf_rs::{AgBand, ChannelType, Radio, RfPatch, Xtal};
//! use std::ptr::NonNull;
//! use wifirf_regs::delay::SpinDelay;
//! use wifirf_regs::mmio::MmioBus;
//!
//! # fn run(mapping: NonNull<u32>) -> libwifirf_rs::Result<()> {
//! // SAFETY: `mapping` covers the register window and is used by nothing else.
//! let bus = unsafe { MmioBus::new(mapping, REGISTER_WINDOW_BASE, REGISTER_WINDOW_LEN) };
//! let mut radio = Radio::new(bus, SpinDelay)?;
//! radio.init_system(Xtal::Mhz40, AgBand::BandBoth, &RfPatch::default())?;
//! radio.change_channel(36, ChannelType::Ht40Plus)?;
//!
//! // Persist across a soft reset
//! let cal = radio.calibration().to_bytes();
//! # Ok(())
//! # }
//! ```
//!
//! ## Layout
//!
//! - [`hardware`]: register maps and the register-level [`hardware::rf_chip::RfChip`],
//!   including the calibration sequencer and the predistortion engine.
//! - [`board`]: the [`Radio`] context with bring-up, restore, channel switching and the
//!   DPD retry policy.
//! - [`calibration`]: persisted calibration results and DPD state.
//! - [`config`]: bring-up trims.
//! - `sim` (feature `sim`): a register-level simulation of the radio, used by the tests
//!   and the demo.

pub mod board;
pub mod calibration;
pub mod config;
pub mod hardware;
#[cfg(feature = "sim")]
pub mod sim;

pub use board::radio::{Radio, SwitchPhase};
pub use calibration::{CalibrationResult, DpdState, DpdTable};
pub use config::RfPatch;
pub use hardware::rf_chip::iq_calibration::{CalReport, StageOutcome};
pub use hardware::rf_chip::predistortion::DpdOutcome;

pub use wifirf_globals::*;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    /// Register transport failure.
    #[error("register access: {0}")]
    Bus(#[from] wifirf_regs::RegError),
    #[error(transparent)]
    Globals(#[from] wifirf_globals::GlobalsError),
    /// Channel number outside of the supported bands, or on a band the radio was not
    /// brought up for.
    #[error("invalid channel {0}")]
    InvalidChannel(u32),
    /// Chip-ID register does not identify a supported chip.
    #[error("unknown chip id {0:#010x}")]
    UnknownChip(u32),
    /// Persisted blob is shorter than its layout.
    #[error("truncated blob ({actual} of {expected} bytes)")]
    Truncated {
        /// Actual length of the blob.
        actual: usize,
        /// Length required by the layout.
        expected: usize,
    },
    #[error("bad magic {0:#010x}")]
    BadMagic(u32),
    #[error("unsupported layout version {0}")]
    UnsupportedVersion(u16),
    /// A decoded value does not fit the width of its register field.
    #[error("field {0} out of range")]
    FieldWidth(&'static str),
}

/// Result type for operations that may return an `Error`.
pub type Result<T> = std::result::Result<T, Error>;
