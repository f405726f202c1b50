//! Calibration results and DPD state kept for the lifetime of the chip.
//!
//! Both structures start out zeroed at bring-up, are filled in by the calibration
//! sequencer and the predistortion engine, and can be persisted by the owning driver
//! across soft resets with `to_bytes` / `from_bytes`.

use crate::hardware::regmap::{IQ_COEFF_MASK, RC_TUNE_MASK, RX_DC_WORD_MASK, RX_DC_WORDS, StageKind};
use crate::{Error, Result};
use wifirf_globals::{AgBand, Band, PerBand};

/// Number of points of one AM/PM predistortion curve.
pub const DPD_POINTS: usize = 26;
/// Two points are packed into every table word.
pub const DPD_WORDS: usize = DPD_POINTS / 2;
/// AM correction gains are ten bits wide.
pub const DPD_AM_MAX: u16 = 0x3ff;
/// PM corrections are 13-bit two's complement values.
pub const DPD_PM_MASK: u16 = 0x1fff;

const CAL_MAGIC: u32 = 0x5752_434c;
const DPD_MAGIC: u32 = 0x5752_4450;
const LAYOUT_VERSION: u16 = 1;
const HEADER_LEN: usize = 6;
const CAL_BLOB_LEN: usize = HEADER_LEN + 2 + 2 * 4 * RX_DC_WORDS + 6 + 4 * 2 * Band::COUNT;
const DPD_BLOB_LEN: usize = HEADER_LEN + 3 + Band::COUNT + 1 + Band::COUNT * 2 * 4 * DPD_WORDS;

/// Values captured from the calibration units.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CalibrationResult {
    /// Every band of the brought-up capability has been calibrated.
    pub cal_done: bool,
    pub cal_iq_done: PerBand<bool>,
    /// RX DC correction words, I in bits 6:0, Q in bits 22:16.
    pub rx_dc_2g: [u32; RX_DC_WORDS],
    pub rx_dc_5g: [u32; RX_DC_WORDS],
    pub rx_rc_bw20: u8,
    pub rx_rc_bw40: u8,
    pub tx_dc_i_2g: u8,
    pub tx_dc_q_2g: u8,
    pub tx_dc_i_5g: u8,
    pub tx_dc_q_5g: u8,
    pub rx_iq_alpha: PerBand<u16>,
    pub rx_iq_theta: PerBand<u16>,
    pub tx_iq_alpha: PerBand<u16>,
    pub tx_iq_theta: PerBand<u16>,
}

impl CalibrationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the result registers of `kind` for `band`.
    ///
    /// `values` are in the order of [`RegisterMap::result_fields`](crate::hardware::regmap::RegisterMap::result_fields).
    pub fn store(&mut self, kind: StageKind, band: Band, values: &[u32]) {
        let value = |index: usize| values.get(index).copied().unwrap_or(0);
        match kind {
            StageKind::RxDc => {
                let words = if band.is_5g() {
                    &mut self.rx_dc_5g
                } else {
                    &mut self.rx_dc_2g
                };
                for (index, word) in words.iter_mut().enumerate() {
                    *word = value(index) & RX_DC_WORD_MASK;
                }
            }
            StageKind::RcBw20 => self.rx_rc_bw20 = (value(0) & RC_TUNE_MASK) as u8,
            StageKind::RcBw40 => self.rx_rc_bw40 = (value(0) & RC_TUNE_MASK) as u8,
            StageKind::TxDc if band.is_5g() => {
                self.tx_dc_i_5g = value(0) as u8;
                self.tx_dc_q_5g = value(1) as u8;
            }
            StageKind::TxDc => {
                self.tx_dc_i_2g = value(0) as u8;
                self.tx_dc_q_2g = value(1) as u8;
            }
            StageKind::TxIq => {
                self.tx_iq_alpha[band] = (value(0) & IQ_COEFF_MASK) as u16;
                self.tx_iq_theta[band] = (value(1) & IQ_COEFF_MASK) as u16;
            }
            StageKind::RxIq => {
                self.rx_iq_alpha[band] = (value(0) & IQ_COEFF_MASK) as u16;
                self.rx_iq_theta[band] = (value(1) & IQ_COEFF_MASK) as u16;
            }
        }
    }

    /// Stored values of `kind` for `band`, inverse of [`CalibrationResult::store`].
    pub fn values(&self, kind: StageKind, band: Band) -> Vec<u32> {
        match kind {
            StageKind::RxDc if band.is_5g() => self.rx_dc_5g.to_vec(),
            StageKind::RxDc => self.rx_dc_2g.to_vec(),
            StageKind::RcBw20 => vec![self.rx_rc_bw20 as u32],
            StageKind::RcBw40 => vec![self.rx_rc_bw40 as u32],
            StageKind::TxDc if band.is_5g() => {
                vec![self.tx_dc_i_5g as u32, self.tx_dc_q_5g as u32]
            }
            StageKind::TxDc => vec![self.tx_dc_i_2g as u32, self.tx_dc_q_2g as u32],
            StageKind::TxIq => vec![
                self.tx_iq_alpha[band] as u32,
                self.tx_iq_theta[band] as u32,
            ],
            StageKind::RxIq => vec![
                self.rx_iq_alpha[band] as u32,
                self.rx_iq_theta[band] as u32,
            ],
        }
    }

    /// Recompute `cal_done` from the per-band flags of `ag_band`.
    pub fn refresh_done(&mut self, ag_band: AgBand) -> bool {
        self.cal_done = ag_band.bands().iter().all(|&band| self.cal_iq_done[band]);
        self.cal_done
    }

    /// Check that every value fits the width of its register field.
    pub fn check_widths(&self) -> Result<()> {
        let dc_ok = |words: &[u32; RX_DC_WORDS]| words.iter().all(|w| w & !RX_DC_WORD_MASK == 0);
        if !dc_ok(&self.rx_dc_2g) {
            return Err(Error::FieldWidth("rx_dc_2g"));
        }
        if !dc_ok(&self.rx_dc_5g) {
            return Err(Error::FieldWidth("rx_dc_5g"));
        }
        if self.rx_rc_bw20 as u32 > RC_TUNE_MASK {
            return Err(Error::FieldWidth("rx_rc_bw20"));
        }
        if self.rx_rc_bw40 as u32 > RC_TUNE_MASK {
            return Err(Error::FieldWidth("rx_rc_bw40"));
        }
        let iq = [
            ("rx_iq_alpha", &self.rx_iq_alpha),
            ("rx_iq_theta", &self.rx_iq_theta),
            ("tx_iq_alpha", &self.tx_iq_alpha),
            ("tx_iq_theta", &self.tx_iq_theta),
        ];
        for (name, coeffs) in iq {
            if coeffs.0.iter().any(|&c| c as u32 > IQ_COEFF_MASK) {
                return Err(Error::FieldWidth(name));
            }
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(CAL_BLOB_LEN);
        write_header(&mut out, CAL_MAGIC);
        out.push(self.cal_done as u8);
        out.push(pack_flags(&self.cal_iq_done));
        for word in self.rx_dc_2g.iter().chain(self.rx_dc_5g.iter()) {
            out.extend_from_slice(&word.to_le_bytes());
        }
        out.extend_from_slice(&[
            self.rx_rc_bw20,
            self.rx_rc_bw40,
            self.tx_dc_i_2g,
            self.tx_dc_q_2g,
            self.tx_dc_i_5g,
            self.tx_dc_q_5g,
        ]);
        for coeffs in [
            &self.rx_iq_alpha,
            &self.rx_iq_theta,
            &self.tx_iq_alpha,
            &self.tx_iq_theta,
        ] {
            for coeff in coeffs.0 {
                out.extend_from_slice(&coeff.to_le_bytes());
            }
        }
        out
    }

    /// Decode a blob written by [`CalibrationResult::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::open(bytes, CAL_MAGIC, CAL_BLOB_LEN)?;
        let mut cal = Self {
            cal_done: reader.u8()? != 0,
            cal_iq_done: unpack_flags(reader.u8()?),
            ..Self::default()
        };
        for word in cal.rx_dc_2g.iter_mut().chain(cal.rx_dc_5g.iter_mut()) {
            *word = reader.u32()?;
        }
        cal.rx_rc_bw20 = reader.u8()?;
        cal.rx_rc_bw40 = reader.u8()?;
        cal.tx_dc_i_2g = reader.u8()?;
        cal.tx_dc_q_2g = reader.u8()?;
        cal.tx_dc_i_5g = reader.u8()?;
        cal.tx_dc_q_5g = reader.u8()?;
        for coeffs in [
            &mut cal.rx_iq_alpha,
            &mut cal.rx_iq_theta,
            &mut cal.tx_iq_alpha,
            &mut cal.tx_iq_theta,
        ] {
            for coeff in coeffs.0.iter_mut() {
                *coeff = reader.u16()?;
            }
        }
        cal.check_widths()?;
        Ok(cal)
    }
}

/// One band's predistortion curve as written to the AM and PM tables.
///
/// Point `2 * i` lives in the low half-word of word `i`, point `2 * i + 1` in the high
/// half-word.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DpdTable {
    pub am: [u32; DPD_WORDS],
    pub pm: [u32; DPD_WORDS],
}

impl DpdTable {
    pub fn pack(am: &[u16; DPD_POINTS], pm: &[u16; DPD_POINTS]) -> Self {
        let mut table = Self::default();
        for word in 0..DPD_WORDS {
            table.am[word] = pack_pair(am[2 * word], am[2 * word + 1]);
            table.pm[word] = pack_pair(pm[2 * word], pm[2 * word + 1]);
        }
        table
    }

    /// AM and PM value of `point`.
    pub fn point(&self, point: usize) -> (u16, u16) {
        let shift = 16 * (point % 2);
        let am = (self.am[point / 2] >> shift) as u16;
        let pm = (self.pm[point / 2] >> shift) as u16;
        (am, pm)
    }

    pub fn is_empty(&self) -> bool {
        self.am.iter().chain(self.pm.iter()).all(|&word| word == 0)
    }

    fn check_widths(&self) -> bool {
        (0..DPD_POINTS).all(|point| {
            let (am, pm) = self.point(point);
            am <= DPD_AM_MAX && pm & !DPD_PM_MASK == 0
        })
    }
}

fn pack_pair(even: u16, odd: u16) -> u32 {
    ((odd as u32) << 16) | even as u32
}

/// Per-band predistortion state.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DpdState {
    pub dpd_done: PerBand<bool>,
    /// Training gave up on this band, DPD stays off until re-enabled.
    pub dpd_disable: PerBand<bool>,
    /// Band whose table is currently loaded into the hardware.
    pub current_band: Band,
    pub bb_scale: PerBand<u8>,
    pub table: PerBand<DpdTable>,
    /// The spur workaround is applied for the current channel.
    pub spur_patched: bool,
}

impl DpdState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(DPD_BLOB_LEN);
        write_header(&mut out, DPD_MAGIC);
        out.push(pack_flags(&self.dpd_done));
        out.push(pack_flags(&self.dpd_disable));
        out.push(self.current_band as u8);
        out.extend_from_slice(&self.bb_scale.0);
        out.push(self.spur_patched as u8);
        for table in &self.table.0 {
            for word in table.am.iter().chain(table.pm.iter()) {
                out.extend_from_slice(&word.to_le_bytes());
            }
        }
        out
    }

    /// Decode a blob written by [`DpdState::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::open(bytes, DPD_MAGIC, DPD_BLOB_LEN)?;
        let mut state = Self {
            dpd_done: unpack_flags(reader.u8()?),
            dpd_disable: unpack_flags(reader.u8()?),
            current_band: Band::try_from(reader.u8()?)?,
            ..Self::default()
        };
        for scale in state.bb_scale.0.iter_mut() {
            *scale = reader.u8()?;
        }
        state.spur_patched = reader.u8()? != 0;
        for table in state.table.0.iter_mut() {
            for word in table.am.iter_mut().chain(table.pm.iter_mut()) {
                *word = reader.u32()?;
            }
            if !table.check_widths() {
                return Err(Error::FieldWidth("dpd table"));
            }
        }
        Ok(state)
    }
}

fn pack_flags(flags: &PerBand<bool>) -> u8 {
    flags
        .iter()
        .filter(|&(_, set)| set)
        .fold(0, |acc, (band, _)| acc | 1 << band.index())
}

fn unpack_flags(bits: u8) -> PerBand<bool> {
    let mut flags = PerBand::splat(false);
    for band in Band::ALL {
        flags[band] = bits & (1 << band.index()) != 0;
    }
    flags
}

fn write_header(out: &mut Vec<u8>, magic: u32) {
    out.extend_from_slice(&magic.to_le_bytes());
    out.extend_from_slice(&LAYOUT_VERSION.to_le_bytes());
}

/// Little-endian cursor over a length-checked blob.
struct Reader<'a> {
    bytes: &'a [u8],
}

impl<'a> Reader<'a> {
    fn open(bytes: &'a [u8], magic: u32, expected: usize) -> Result<Self> {
        if bytes.len() < expected {
            return Err(Error::Truncated {
                actual: bytes.len(),
                expected,
            });
        }
        let mut reader = Self { bytes };
        let found = reader.u32()?;
        if found != magic {
            return Err(Error::BadMagic(found));
        }
        let version = reader.u16()?;
        if version != LAYOUT_VERSION {
            return Err(Error::UnsupportedVersion(version));
        }
        Ok(reader)
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes: &'a [u8] = self.bytes;
        let (head, rest) = bytes.split_first_chunk::<N>().ok_or(Error::Truncated {
            actual: bytes.len(),
            expected: N,
        })?;
        self.bytes = rest;
        Ok(*head)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take::<1>()?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.take()?))
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calibrated() -> CalibrationResult {
        let mut cal = CalibrationResult::new();
        cal.cal_done = true;
        cal.cal_iq_done = PerBand::splat(true);
        for (index, word) in cal.rx_dc_2g.iter_mut().enumerate() {
            *word = ((index as u32 + 3) << 16) | index as u32;
        }
        cal.rx_dc_5g[20] = 0x007f_007f;
        cal.rx_rc_bw20 = 0x41;
        cal.rx_rc_bw40 = 0x22;
        cal.tx_dc_i_5g = 0xfe;
        cal.tx_iq_alpha[Band::Band5700] = 0x3ff;
        cal.rx_iq_theta[Band::Band2G] = 0x155;
        cal
    }

    #[test]
    fn store_masks_to_field_width() {
        let mut cal = CalibrationResult::new();

        cal.store(StageKind::RcBw20, Band::Band2G, &[0xff]);
        cal.store(StageKind::TxIq, Band::Band5500, &[0x7ff, 0x401]);

        assert_eq!(cal.rx_rc_bw20, 0x7f);
        assert_eq!(cal.tx_iq_alpha[Band::Band5500], 0x3ff);
        assert_eq!(cal.tx_iq_theta[Band::Band5500], 0x001);
        cal.check_widths().unwrap();
    }

    #[test]
    fn values_mirror_store() {
        let mut cal = CalibrationResult::new();
        let dc: Vec<u32> = (0..RX_DC_WORDS as u32).map(|i| (i << 16) | (i + 1)).collect();

        cal.store(StageKind::RxDc, Band::Band5900, &dc);
        cal.store(StageKind::TxDc, Band::Band2G, &[0x12, 0x34]);

        assert_eq!(cal.values(StageKind::RxDc, Band::Band5100), dc);
        assert_eq!(cal.values(StageKind::RxDc, Band::Band2G), vec![0; RX_DC_WORDS]);
        assert_eq!(cal.values(StageKind::TxDc, Band::Band2G), vec![0x12, 0x34]);
    }

    #[test]
    fn refresh_done_follows_capability() {
        let mut cal = CalibrationResult::new();
        cal.cal_iq_done[Band::Band2G] = true;

        assert!(cal.refresh_done(AgBand::Band2G));
        assert!(!cal.refresh_done(AgBand::BandBoth));
    }

    #[test]
    fn calibration_blob() {
        let cal = calibrated();
        let bytes = cal.to_bytes();

        assert_eq!(bytes.len(), CAL_BLOB_LEN);
        assert_eq!(CalibrationResult::from_bytes(&bytes).unwrap(), cal);
    }

    #[test]
    fn calibration_blob_rejects_garbage() {
        let mut bytes = calibrated().to_bytes();

        assert_eq!(
            CalibrationResult::from_bytes(&bytes[..10]),
            Err(Error::Truncated {
                actual: 10,
                expected: CAL_BLOB_LEN
            })
        );
        assert!(matches!(
            DpdState::from_bytes(&bytes),
            Err(Error::Truncated { .. })
        ));
        let mut wrong_magic = DpdState::new().to_bytes();
        wrong_magic[0] ^= 0xff;
        assert!(matches!(
            DpdState::from_bytes(&wrong_magic),
            Err(Error::BadMagic(_))
        ));

        bytes[4] = 9;
        assert_eq!(
            CalibrationResult::from_bytes(&bytes),
            Err(Error::UnsupportedVersion(9))
        );
        bytes[4] = 1;
        // rx_rc_bw20
        bytes[HEADER_LEN + 2 + 8 * RX_DC_WORDS] = 0x80;
        assert_eq!(
            CalibrationResult::from_bytes(&bytes),
            Err(Error::FieldWidth("rx_rc_bw20"))
        );
    }

    #[test]
    fn dpd_table_packing() {
        let am: [u16; DPD_POINTS] = std::array::from_fn(|i| 1023 - i as u16);
        let pm: [u16; DPD_POINTS] = std::array::from_fn(|i| (0x1fff - i as u16) & DPD_PM_MASK);

        let table = DpdTable::pack(&am, &pm);

        assert_eq!(table.am[0], (1022 << 16) | 1023);
        assert_eq!(table.point(25), (998, 0x1fff - 25));
        assert!(!table.is_empty());
    }

    #[test]
    fn dpd_state_blob() {
        let mut state = DpdState::new();
        state.dpd_done[Band::Band5500] = true;
        state.dpd_disable[Band::Band2G] = true;
        state.current_band = Band::Band5500;
        state.bb_scale = PerBand::splat(0x40);
        state.table[Band::Band5500].am[3] = (700 << 16) | 701;
        state.spur_patched = true;

        let bytes = state.to_bytes();

        assert_eq!(bytes.len(), DPD_BLOB_LEN);
        assert_eq!(DpdState::from_bytes(&bytes).unwrap(), state);
    }

    #[test]
    fn dpd_state_blob_rejects_wide_am() {
        let mut state = DpdState::new();
        state.table[Band::Band2G].am[0] = 0x400;

        assert_eq!(
            DpdState::from_bytes(&state.to_bytes()),
            Err(Error::FieldWidth("dpd table"))
        );
    }
}
