//! Register layout of the supported silicon revisions.
//!
//! All engine code addresses the radio through a [`RegisterMap`]. The map is
//! picked once at bring-up from the chip-ID register, so the sequencer, the
//! DPD engine and the channel state machine are written once and are
//! parameterized by revision.

use crate::{Error, Result};
use wifirf_globals::Band;

/// A named bitfield. `mask` is the unshifted field mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub addr: u32,
    pub shift: u8,
    pub mask: u32,
}

impl Field {
    pub const fn new(addr: u32, shift: u8, mask: u32) -> Self {
        Self { addr, shift, mask }
    }

    /// A field covering all 32 bits of `addr`.
    pub const fn word(addr: u32) -> Self {
        Self::new(addr, 0, u32::MAX)
    }

    /// Extract this field from a raw register value.
    pub const fn extract(&self, raw: u32) -> u32 {
        (raw >> self.shift) & self.mask
    }
}

/// Bit layout of one RX DC correction word: I in 6:0, Q in 22:16.
pub const RX_DC_WORD_MASK: u32 = 0x007f_007f;
/// Number of RX DC correction words per band group.
pub const RX_DC_WORDS: usize = 21;
/// RC tune codes are seven bits wide.
pub const RC_TUNE_MASK: u32 = 0x7f;
/// IQ alpha / theta coefficients are ten bits wide.
pub const IQ_COEFF_MASK: u32 = 0x3ff;

/// Settle delay between two polls of a completion flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollDelay {
    Micros(u32),
    Millis(u32),
}

/// Bounded wait: at most `cap` reads, each followed by `delay`.
///
/// The effective timeout is `cap * delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSpec {
    pub cap: u32,
    pub delay: PollDelay,
}

impl PollSpec {
    pub const fn micros(cap: u32, us: u32) -> Self {
        Self {
            cap,
            delay: PollDelay::Micros(us),
        }
    }

    pub const fn millis(cap: u32, ms: u32) -> Self {
        Self {
            cap,
            delay: PollDelay::Millis(ms),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    RxDc,
    RcBw20,
    RcBw40,
    TxDc,
    TxIq,
    RxIq,
}

impl StageKind {
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Analog settings a stage may force before it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Knob {
    RxGainManual,
    ToneEnable,
    ToneFreq,
    TxLoopback,
    RcTargetBw,
}

/// Which completion flag a calibration unit raises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoneFlag {
    Rx,
    Tx,
}

/// Static description of one calibration stage.
#[derive(Debug, Clone, Copy)]
pub struct StageDesc {
    pub kind: StageKind,
    pub name: &'static str,
    /// Value written into the calibration index register to start the unit.
    pub cal_index: u32,
    pub done: DoneFlag,
    pub poll: PollSpec,
    pub setup: &'static [(Knob, u32)],
}

/// Value of the calibration index register while no unit is running.
pub const CAL_INDEX_NONE: u32 = 0;

const RX_DC_SETUP: &[(Knob, u32)] = &[
    (Knob::RxGainManual, 1),
    (Knob::ToneEnable, 0),
    (Knob::TxLoopback, 0),
];
const RC_BW20_SETUP: &[(Knob, u32)] = &[(Knob::RcTargetBw, 0)];
const RC_BW40_SETUP: &[(Knob, u32)] = &[(Knob::RcTargetBw, 1)];
const TX_DC_SETUP: &[(Knob, u32)] = &[(Knob::TxLoopback, 1), (Knob::ToneEnable, 0)];
const TX_IQ_SETUP: &[(Knob, u32)] = &[
    (Knob::TxLoopback, 1),
    (Knob::ToneEnable, 1),
    (Knob::ToneFreq, 0x20),
];
const RX_IQ_SETUP: &[(Knob, u32)] = &[
    (Knob::TxLoopback, 1),
    (Knob::ToneEnable, 1),
    (Knob::ToneFreq, 0x40),
];

/// Stage table of revision A silicon, indexed by [`StageKind::index`].
pub static REV_A_STAGES: [StageDesc; 6] = [
    StageDesc {
        kind: StageKind::RxDc,
        name: "RX DC",
        cal_index: 0x01,
        done: DoneFlag::Rx,
        poll: PollSpec::micros(100_000, 1),
        setup: RX_DC_SETUP,
    },
    StageDesc {
        kind: StageKind::RcBw20,
        name: "BW20 RC",
        cal_index: 0x02,
        done: DoneFlag::Rx,
        poll: PollSpec::millis(100, 1),
        setup: RC_BW20_SETUP,
    },
    StageDesc {
        kind: StageKind::RcBw40,
        name: "BW40 RC",
        cal_index: 0x03,
        done: DoneFlag::Rx,
        poll: PollSpec::millis(100, 1),
        setup: RC_BW40_SETUP,
    },
    StageDesc {
        kind: StageKind::TxDc,
        name: "TX DC",
        cal_index: 0x04,
        done: DoneFlag::Tx,
        poll: PollSpec::micros(10_000, 10),
        setup: TX_DC_SETUP,
    },
    StageDesc {
        kind: StageKind::TxIq,
        name: "TX IQ",
        cal_index: 0x05,
        done: DoneFlag::Tx,
        poll: PollSpec::micros(10_000, 10),
        setup: TX_IQ_SETUP,
    },
    StageDesc {
        kind: StageKind::RxIq,
        name: "RX IQ",
        cal_index: 0x06,
        done: DoneFlag::Rx,
        poll: PollSpec::micros(10_000, 10),
        setup: RX_IQ_SETUP,
    },
];

/// Revision B renumbered the TX units and settles faster on RX DC.
pub static REV_B_STAGES: [StageDesc; 6] = [
    StageDesc {
        kind: StageKind::RxDc,
        name: "RX DC",
        cal_index: 0x01,
        done: DoneFlag::Rx,
        poll: PollSpec::micros(50_000, 2),
        setup: RX_DC_SETUP,
    },
    StageDesc {
        kind: StageKind::RcBw20,
        name: "BW20 RC",
        cal_index: 0x02,
        done: DoneFlag::Rx,
        poll: PollSpec::micros(200, 500),
        setup: RC_BW20_SETUP,
    },
    StageDesc {
        kind: StageKind::RcBw40,
        name: "BW40 RC",
        cal_index: 0x03,
        done: DoneFlag::Rx,
        poll: PollSpec::micros(200, 500),
        setup: RC_BW40_SETUP,
    },
    StageDesc {
        kind: StageKind::TxDc,
        name: "TX DC",
        cal_index: 0x08,
        done: DoneFlag::Tx,
        poll: PollSpec::micros(20_000, 5),
        setup: TX_DC_SETUP,
    },
    StageDesc {
        kind: StageKind::TxIq,
        name: "TX IQ",
        cal_index: 0x09,
        done: DoneFlag::Tx,
        poll: PollSpec::micros(20_000, 5),
        setup: TX_IQ_SETUP,
    },
    StageDesc {
        kind: StageKind::RxIq,
        name: "RX IQ",
        cal_index: 0x0a,
        done: DoneFlag::Rx,
        poll: PollSpec::micros(20_000, 5),
        setup: RX_IQ_SETUP,
    },
];

/* Chip-ID register layout
 *
 * FAMILY[15:0] @ [31:16]
 * REVISION[3:0] @ [7:4]
 * DUAL_BAND @ [0]
 */
pub const CHIP_FAMILY: u32 = 0x7a10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipRevision {
    RevA,
    RevB,
}

/// Single-band silicon has no 5 GHz front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipVariant {
    SingleBand,
    DualBand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChipId {
    pub revision: ChipRevision,
    pub variant: ChipVariant,
}

impl ChipId {
    pub fn decode(raw: u32) -> Result<Self> {
        if raw >> 16 != CHIP_FAMILY {
            log::error!("unknown chip id {raw:#010x}");
            return Err(Error::UnknownChip(raw));
        }
        let revision = match (raw >> 4) & 0xf {
            0 => ChipRevision::RevA,
            1 => ChipRevision::RevB,
            _ => {
                log::error!("unsupported chip revision in id {raw:#010x}");
                return Err(Error::UnknownChip(raw));
            }
        };
        let variant = if raw & 1 != 0 {
            ChipVariant::DualBand
        } else {
            ChipVariant::SingleBand
        };
        Ok(Self { revision, variant })
    }

    pub fn encode(&self) -> u32 {
        let revision = match self.revision {
            ChipRevision::RevA => 0,
            ChipRevision::RevB => 1,
        };
        let dual = (self.variant == ChipVariant::DualBand) as u32;
        (CHIP_FAMILY << 16) | (revision << 4) | dual
    }
}

/// Address of the chip-ID register. Identical on every revision so the
/// revision can be detected before a map is chosen.
pub const CHIP_ID_ADDR: u32 = 0xccb0_0000;

/// Physical base and size of the bus window holding the register blocks of
/// every revision. Starts at the chip-ID register.
pub const REGISTER_WINDOW_BASE: u32 = CHIP_ID_ADDR;
pub const REGISTER_WINDOW_LEN: usize = 0x0050_1000;

/// Register layout of one silicon revision.
#[derive(Debug, Clone, Copy)]
pub struct RegisterMap {
    pub revision: ChipRevision,
    pub stages: &'static [StageDesc; 6],

    /* RF block */
    pub mode: Field,
    pub band_sel: Field,
    pub xtal: Field,
    pub rx_path_enable: Field,
    pub ldo_trim: Field,
    pub buck_trim: Field,
    pub pa_trim_base: u32,
    pub synth_2g_channel: Field,
    pub synth_5g_channel: Field,
    pub synth_trigger: Field,
    pub synth_lock: Field,
    pub synth_lock_poll: PollSpec,
    pub rx_fe_spur: Field,
    pub rx_gain_manual: Field,
    pub tone_enable: Field,
    pub tone_freq: Field,
    pub tx_loopback: Field,
    pub rc_target_bw: Field,
    pub tx_gain_manual: Field,
    pub tx_gain: Field,
    pub pga: Field,

    /* PHY block */
    pub phy_enable: Field,
    pub bw40: Field,
    pub prim_upper: Field,
    pub sifs: Field,
    pub slot: Field,
    pub spur_cancel_enable: Field,
    pub comb_erase_enable: Field,
    pub comb_erase_idx: [Field; 2],
    pub dpd_enable: Field,
    pub bb_scale: Field,
    pub iq_source: Field,
    pub dc_removal_bypass: Field,
    pub padpd_start: Field,
    pub dpd_latch: Field,
    pub tx_scale: Field,
    pub dpd_measure: u32,
    pub am_table_base: u32,
    pub pm_table_base: u32,

    /* Calibration block */
    pub cal_index: Field,
    pub rx_cal_done: Field,
    pub tx_cal_done: Field,
    pub rc_bw20: Field,
    pub rc_bw40: Field,
    pub tx_dc_i_2g: Field,
    pub tx_dc_q_2g: Field,
    pub tx_dc_i_5g: Field,
    pub tx_dc_q_5g: Field,
    pub rx_dc_2g_base: u32,
    pub rx_dc_5g_base: u32,
    pub tx_iq_base: u32,
    pub rx_iq_base: u32,
}

pub static REV_A: RegisterMap = RegisterMap::layout(
    ChipRevision::RevA,
    &REV_A_STAGES,
    0xccb0_0000,
    0xcce0_0000,
    0xccb0_8000,
    PollSpec::micros(1_000, 10),
);

pub static REV_B: RegisterMap = RegisterMap::layout(
    ChipRevision::RevB,
    &REV_B_STAGES,
    0xccb0_0000,
    0xcd00_0000,
    0xccb1_0000,
    PollSpec::micros(2_000, 5),
);

impl RegisterMap {
    const fn layout(
        revision: ChipRevision,
        stages: &'static [StageDesc; 6],
        rf: u32,
        phy: u32,
        cal: u32,
        synth_lock_poll: PollSpec,
    ) -> Self {
        Self {
            revision,
            stages,

            mode: Field::new(rf + 0x04, 0, 0x3),
            band_sel: Field::new(rf + 0x04, 4, 0x7),
            xtal: Field::new(rf + 0x04, 8, 0xf),
            rx_path_enable: Field::new(rf + 0x08, 0, 0x3),
            ldo_trim: Field::new(rf + 0x0c, 0, 0x1f),
            buck_trim: Field::new(rf + 0x0c, 8, 0x1f),
            pa_trim_base: rf + 0x10,
            synth_2g_channel: Field::new(rf + 0x30, 0, 0xff),
            synth_trigger: Field::new(rf + 0x30, 8, 0x1),
            synth_lock: Field::new(rf + 0x34, 0, 0x1),
            synth_5g_channel: Field::new(rf + 0x38, 0, 0xff),
            synth_lock_poll,
            rx_fe_spur: Field::new(rf + 0x40, 0, 0xf),
            rx_gain_manual: Field::new(rf + 0x40, 8, 0x1),
            tone_enable: Field::new(rf + 0x44, 0, 0x1),
            tone_freq: Field::new(rf + 0x44, 4, 0xff),
            tx_loopback: Field::new(rf + 0x44, 16, 0x1),
            rc_target_bw: Field::new(rf + 0x44, 20, 0x1),
            tx_gain_manual: Field::new(rf + 0x48, 0, 0x1),
            tx_gain: Field::new(rf + 0x48, 4, 0xf),
            pga: Field::new(rf + 0x48, 8, 0xf),

            phy_enable: Field::new(phy, 0, 0x1),
            bw40: Field::new(phy + 0x04, 0, 0x1),
            prim_upper: Field::new(phy + 0x04, 1, 0x1),
            sifs: Field::new(phy + 0x08, 0, 0xff),
            slot: Field::new(phy + 0x08, 8, 0xff),
            spur_cancel_enable: Field::new(phy + 0x10, 0, 0x1),
            comb_erase_enable: Field::new(phy + 0x10, 1, 0x1),
            comb_erase_idx: [
                Field::new(phy + 0x10, 8, 0x7f),
                Field::new(phy + 0x10, 16, 0x7f),
            ],
            dpd_enable: Field::new(phy + 0x20, 0, 0x1),
            bb_scale: Field::new(phy + 0x20, 8, 0xff),
            iq_source: Field::new(phy + 0x20, 16, 0x1),
            dc_removal_bypass: Field::new(phy + 0x20, 17, 0x1),
            padpd_start: Field::new(phy + 0x20, 18, 0x1),
            dpd_latch: Field::new(phy + 0x20, 19, 0x1),
            tx_scale: Field::new(phy + 0x24, 0, 0x1ff),
            dpd_measure: phy + 0x28,
            am_table_base: phy + 0x40,
            pm_table_base: phy + 0x80,

            cal_index: Field::new(cal, 0, 0x1f),
            rx_cal_done: Field::new(cal + 0x04, 0, 0x1),
            tx_cal_done: Field::new(cal + 0x04, 1, 0x1),
            rc_bw20: Field::new(cal + 0x08, 0, RC_TUNE_MASK),
            rc_bw40: Field::new(cal + 0x08, 8, RC_TUNE_MASK),
            tx_dc_i_2g: Field::new(cal + 0x0c, 0, 0xff),
            tx_dc_q_2g: Field::new(cal + 0x0c, 8, 0xff),
            tx_dc_i_5g: Field::new(cal + 0x0c, 16, 0xff),
            tx_dc_q_5g: Field::new(cal + 0x0c, 24, 0xff),
            rx_dc_2g_base: cal + 0x40,
            rx_dc_5g_base: cal + 0xc0,
            tx_iq_base: cal + 0x140,
            rx_iq_base: cal + 0x160,
        }
    }

    pub fn for_revision(revision: ChipRevision) -> &'static RegisterMap {
        match revision {
            ChipRevision::RevA => &REV_A,
            ChipRevision::RevB => &REV_B,
        }
    }

    pub fn stage(&self, kind: StageKind) -> &'static StageDesc {
        &self.stages[kind.index()]
    }

    pub fn knob(&self, knob: Knob) -> Field {
        match knob {
            Knob::RxGainManual => self.rx_gain_manual,
            Knob::ToneEnable => self.tone_enable,
            Knob::ToneFreq => self.tone_freq,
            Knob::TxLoopback => self.tx_loopback,
            Knob::RcTargetBw => self.rc_target_bw,
        }
    }

    pub fn done_flag(&self, flag: DoneFlag) -> Field {
        match flag {
            DoneFlag::Rx => self.rx_cal_done,
            DoneFlag::Tx => self.tx_cal_done,
        }
    }

    pub fn pa_bias(&self, band: Band) -> Field {
        Field::new(self.pa_trim_base + 4 * band.index() as u32, 0, 0x3f)
    }

    pub fn pa_vcas(&self, band: Band) -> Field {
        Field::new(self.pa_trim_base + 4 * band.index() as u32, 8, 0x3f)
    }

    pub fn tx_iq_alpha(&self, band: Band) -> Field {
        Field::new(self.tx_iq_base + 4 * band.index() as u32, 0, IQ_COEFF_MASK)
    }

    pub fn tx_iq_theta(&self, band: Band) -> Field {
        Field::new(self.tx_iq_base + 4 * band.index() as u32, 16, IQ_COEFF_MASK)
    }

    pub fn rx_iq_alpha(&self, band: Band) -> Field {
        Field::new(self.rx_iq_base + 4 * band.index() as u32, 0, IQ_COEFF_MASK)
    }

    pub fn rx_iq_theta(&self, band: Band) -> Field {
        Field::new(self.rx_iq_base + 4 * band.index() as u32, 16, IQ_COEFF_MASK)
    }

    pub fn rx_dc_word(&self, band: Band, index: usize) -> Field {
        let base = if band.is_5g() {
            self.rx_dc_5g_base
        } else {
            self.rx_dc_2g_base
        };
        Field::new(base + 4 * index as u32, 0, RX_DC_WORD_MASK)
    }

    pub fn am_word(&self, index: usize) -> u32 {
        self.am_table_base + 4 * index as u32
    }

    pub fn pm_word(&self, index: usize) -> u32 {
        self.pm_table_base + 4 * index as u32
    }

    /// Result registers a stage fills in for `band`, in capture order.
    ///
    /// The 5 GHz RX DC and TX DC results are shared by all sub-bands.
    pub fn result_fields(&self, kind: StageKind, band: Band) -> Vec<Field> {
        match kind {
            StageKind::RxDc => (0..RX_DC_WORDS)
                .map(|index| self.rx_dc_word(band, index))
                .collect(),
            StageKind::RcBw20 => vec![self.rc_bw20],
            StageKind::RcBw40 => vec![self.rc_bw40],
            StageKind::TxDc if band.is_5g() => vec![self.tx_dc_i_5g, self.tx_dc_q_5g],
            StageKind::TxDc => vec![self.tx_dc_i_2g, self.tx_dc_q_2g],
            StageKind::TxIq => vec![self.tx_iq_alpha(band), self.tx_iq_theta(band)],
            StageKind::RxIq => vec![self.rx_iq_alpha(band), self.rx_iq_theta(band)],
        }
    }
}
