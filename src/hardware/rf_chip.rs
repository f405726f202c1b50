pub mod iq_calibration;
pub mod predistortion;

use crate::Result;
use crate::hardware::regmap::{
    CHIP_ID_ADDR, ChipId, ChipVariant, Field, PollDelay, PollSpec, RegisterMap,
};
use wifirf_globals::{Band, CHANNEL_5G_MAX, ChannelType};
use wifirf_regs::{DelayNs, RegisterIo};

/// RF controller operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum RfMode {
    Standby = 0,
    Calibration = 1,
    Run = 2,
}

/* Interframe timing per PHY, in microseconds */
pub const SIFS_2G: u32 = 10;
pub const SIFS_5G: u32 = 16;
pub const SLOT_TIME: u32 = 9;

/// RX path enable bits.
pub const RX_PATH_2G: u32 = 1 << 0;
pub const RX_PATH_5G: u32 = 1 << 1;

/// Distance of the guard hop used to force a 5 GHz synthesizer relock.
const SYNTH_GUARD_HOP: u32 = 4;

/// Register-level handle on the radio.
///
/// Owns the register transport and the delay provider and knows the register
/// layout of the detected silicon revision.
pub struct RfChip<B, D> {
    bus: B,
    delay: D,
    map: &'static RegisterMap,
    id: ChipId,
}

impl<B: RegisterIo, D: DelayNs> RfChip<B, D> {
    /// Identify the chip and select the register map for its revision.
    pub fn new(mut bus: B, delay: D) -> Result<Self> {
        let raw = bus.read_register(CHIP_ID_ADDR)?;
        let id = ChipId::decode(raw)?;
        log::debug!("Chip id {raw:#010x}: {:?}, {:?}", id.revision, id.variant);

        Ok(Self {
            bus,
            delay,
            map: RegisterMap::for_revision(id.revision),
            id,
        })
    }

    pub fn map(&self) -> &'static RegisterMap {
        self.map
    }

    pub fn id(&self) -> ChipId {
        self.id
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn delay(&self) -> &D {
        &self.delay
    }

    pub fn into_parts(self) -> (B, D) {
        (self.bus, self.delay)
    }

    pub fn read(&mut self, addr: u32) -> Result<u32> {
        Ok(self.bus.read_register(addr)?)
    }

    pub fn write(&mut self, addr: u32, value: u32) -> Result<()> {
        Ok(self.bus.write_register(addr, value)?)
    }

    pub fn get(&mut self, field: Field) -> Result<u32> {
        Ok(self.bus.get_field(field.addr, field.shift, field.mask)?)
    }

    pub fn set(&mut self, field: Field, value: u32) -> Result<()> {
        Ok(self
            .bus
            .set_field(field.addr, value, field.shift, field.mask)?)
    }

    /// Drive a single-bit control high, then low again.
    pub fn pulse(&mut self, field: Field) -> Result<()> {
        self.set(field, 1)?;
        self.set(field, 0)
    }

    pub fn wait(&mut self, delay: PollDelay) {
        match delay {
            PollDelay::Micros(us) => self.delay.delay_us(us),
            PollDelay::Millis(ms) => self.delay.delay_ms(ms),
        }
    }

    /// Poll `field` until it reads `expected`.
    ///
    /// Each iteration is one register read followed by one settle delay.
    /// Returns the number of reads it took, or `None` when `spec.cap` reads
    /// passed without a match.
    pub fn poll(&mut self, field: Field, expected: u32, spec: PollSpec) -> Result<Option<u32>> {
        for iteration in 1..=spec.cap {
            if self.get(field)? == expected {
                return Ok(Some(iteration));
            }
            self.wait(spec.delay);
        }
        Ok(None)
    }

    pub fn set_mode(&mut self, mode: RfMode) -> Result<()> {
        log::trace!("RF mode -> {mode:?}");
        self.set(self.map.mode, mode as u32)
    }

    /// Flush analog state between two calibration stages.
    pub fn reset_cal_mode(&mut self) -> Result<()> {
        self.set_mode(RfMode::Standby)?;
        self.set_mode(RfMode::Calibration)
    }

    pub fn select_band(&mut self, band: Band) -> Result<()> {
        self.set(self.map.band_sel, band.index() as u32)
    }

    /// Enable the RX path of `band`, or disable all RX paths.
    pub fn set_rx_paths(&mut self, band: Option<Band>) -> Result<()> {
        let paths = match band {
            None => 0,
            Some(band) if band.is_5g() => RX_PATH_5G,
            Some(_) => RX_PATH_2G,
        };
        self.set(self.map.rx_path_enable, paths)
    }

    /// Re-read the chip variant from the chip-ID register.
    pub fn chip_variant(&mut self) -> Result<ChipVariant> {
        let raw = self.read(CHIP_ID_ADDR)?;
        Ok(ChipId::decode(raw)?.variant)
    }

    pub fn phy_enabled(&mut self) -> Result<bool> {
        Ok(self.get(self.map.phy_enable)? != 0)
    }

    pub fn enable_phy(&mut self, enable: bool) -> Result<()> {
        self.set(self.map.phy_enable, enable as u32)
    }

    pub fn set_bandwidth(&mut self, channel_type: ChannelType) -> Result<()> {
        log::trace!("Bandwidth -> {channel_type:?}");
        self.set(self.map.bw40, channel_type.is_ht40() as u32)?;
        // With the secondary channel below, the primary is the upper half.
        self.set(
            self.map.prim_upper,
            (channel_type == ChannelType::Ht40Minus) as u32,
        )
    }

    pub fn set_timing(&mut self, band: Band) -> Result<()> {
        let sifs = if band.is_5g() { SIFS_5G } else { SIFS_2G };
        self.set(self.map.sifs, sifs)?;
        self.set(self.map.slot, SLOT_TIME)
    }

    /// Program the synthesizer of `band`'s PHY and wait for lock.
    ///
    /// Returns false if the synthesizer did not report lock within the
    /// bounded wait. This is logged, not fatal.
    pub fn program_synth(&mut self, band: Band, channel: u32) -> Result<bool> {
        let target = if band.is_5g() {
            self.map.synth_5g_channel
        } else {
            self.map.synth_2g_channel
        };
        self.set(target, channel)?;
        self.pulse(self.map.synth_trigger)?;

        match self.poll(self.map.synth_lock, 1, self.map.synth_lock_poll)? {
            Some(iterations) => {
                log::trace!("Synthesizer locked on channel {channel} after {iterations} polls");
                Ok(true)
            }
            None => {
                log::warn!("Synthesizer did not lock on channel {channel}");
                Ok(false)
            }
        }
    }

    /// Program the 5 GHz synthesizer, hopping away first when it is already
    /// parked on `channel` so that lock is re-acquired.
    pub fn program_synth_5g(&mut self, band: Band, channel: u32) -> Result<bool> {
        if self.get(self.map.synth_5g_channel)? == channel {
            let neighbour = if channel + SYNTH_GUARD_HOP <= CHANNEL_5G_MAX {
                channel + SYNTH_GUARD_HOP
            } else {
                channel - SYNTH_GUARD_HOP
            };
            log::debug!("Synthesizer already on {channel}, hopping via {neighbour}");
            self.program_synth(band, neighbour)?;
        }
        self.program_synth(band, channel)
    }
}
