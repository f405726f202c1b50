use crate::{RegError, RegisterIo, Result};
use std::ptr::NonNull;

/// Volatile access to a memory mapped register window.
///
/// Addresses passed to [`RegisterIo`] are physical bus addresses; the window
/// maps `len` bytes starting at `phys_base`.
#[derive(Debug)]
pub struct MmioBus {
    base: NonNull<u32>,
    phys_base: u32,
    len: usize,
}

impl MmioBus {
    /// # Safety
    ///
    /// `base` must point to a mapping of at least `len` bytes that stays valid
    /// and is not accessed through any other path for the lifetime of the bus.
    pub unsafe fn new(base: NonNull<u32>, phys_base: u32, len: usize) -> Self {
        Self {
            base,
            phys_base,
            len,
        }
    }

    pub fn phys_base(&self) -> u32 {
        self.phys_base
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn slot(&self, addr: u32) -> Result<*mut u32> {
        if addr % 4 != 0 {
            return Err(RegError::Unaligned(addr));
        }
        let out_of_range = RegError::OutOfRange {
            addr,
            len: self.len,
        };
        let Some(offset) = addr.checked_sub(self.phys_base) else {
            return Err(out_of_range);
        };
        let offset = offset as usize;
        if offset.checked_add(4).is_none_or(|end| end > self.len) {
            return Err(out_of_range);
        }
        // SAFETY: offset + 4 <= len, within the window promised by `new`.
        Ok(unsafe { self.base.as_ptr().add(offset / 4) })
    }
}

impl RegisterIo for MmioBus {
    fn read_register(&mut self, addr: u32) -> Result<u32> {
        let slot = self.slot(addr)?;
        // SAFETY: `slot` is aligned and inside the mapped window.
        Ok(unsafe { slot.read_volatile() })
    }

    fn write_register(&mut self, addr: u32, value: u32) -> Result<()> {
        let slot = self.slot(addr)?;
        // SAFETY: `slot` is aligned and inside the mapped window.
        unsafe { slot.write_volatile(value) };
        Ok(())
    }
}
