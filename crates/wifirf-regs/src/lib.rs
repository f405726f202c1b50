//! Register and delay primitives consumed by the calibration engine.
//!
//! The engine only needs two things from the platform: 32-bit register access
//! and busy-wait delays. Register access is expressed by [`RegisterIo`], delays
//! by [`embedded_hal::delay::DelayNs`]. Three backends are provided:
//!
//! - [`mmio::MmioBus`] for a memory mapped register window,
//! - [`mock::MockBus`], a register file that records every access,
//! - [`delay::SpinDelay`] / [`delay::CountingDelay`] for real and zero-time delays.

pub mod delay;
pub mod mmio;
pub mod mock;

pub use embedded_hal::delay::DelayNs;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RegError {
    /// Address does not fall into the mapped register window.
    #[error("register {addr:#010x} outside of mapped window ({len:#x} bytes)")]
    OutOfRange { addr: u32, len: usize },
    /// Registers are 32 bits wide and must be word aligned.
    #[error("unaligned register address {0:#010x}")]
    Unaligned(u32),
    /// The underlying bus reported a failure.
    #[error("bus access to {addr:#010x} failed")]
    Bus { addr: u32 },
}

/// Result type for register accesses.
pub type Result<T> = std::result::Result<T, RegError>;

/// Access to the 32-bit register space of the radio.
///
/// `mask` arguments of the field helpers are the unshifted field mask,
/// e.g. `0x7f` for a seven bit field.
pub trait RegisterIo {
    fn read_register(&mut self, addr: u32) -> Result<u32>;

    fn write_register(&mut self, addr: u32, value: u32) -> Result<()>;

    /// Read-modify-write of a single bitfield. Bits of `value` outside of
    /// `mask` are dropped.
    fn set_field(&mut self, addr: u32, value: u32, shift: u8, mask: u32) -> Result<()> {
        let current = self.read_register(addr)?;
        let updated = (current & !(mask << shift)) | ((value & mask) << shift);
        log::trace!(
            "set_field {addr:#010x}[{shift}] = {value:#x} ({current:#010x} -> {updated:#010x})"
        );
        self.write_register(addr, updated)
    }

    fn get_field(&mut self, addr: u32, shift: u8, mask: u32) -> Result<u32> {
        Ok((self.read_register(addr)? >> shift) & mask)
    }
}

impl<T: RegisterIo + ?Sized> RegisterIo for &mut T {
    fn read_register(&mut self, addr: u32) -> Result<u32> {
        (**self).read_register(addr)
    }

    fn write_register(&mut self, addr: u32, value: u32) -> Result<()> {
        (**self).write_register(addr, value)
    }
}

impl<T: RegisterIo + ?Sized> RegisterIo for Box<T> {
    fn read_register(&mut self, addr: u32) -> Result<u32> {
        (**self).read_register(addr)
    }

    fn write_register(&mut self, addr: u32, value: u32) -> Result<()> {
        (**self).write_register(addr, value)
    }
}
