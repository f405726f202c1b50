//! In-memory register file for tests and simulation.

use crate::{RegError, RegisterIo, Result};
use std::collections::{HashMap, HashSet};

/// A single recorded register access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read { addr: u32, value: u32 },
    Write { addr: u32, value: u32 },
}

impl Access {
    pub fn addr(&self) -> u32 {
        match self {
            Access::Read { addr, .. } | Access::Write { addr, .. } => *addr,
        }
    }

    pub fn is_write(&self) -> bool {
        matches!(self, Access::Write { .. })
    }
}

/// Register file backed by a hash map. Unwritten registers read as zero.
///
/// Every access made through [`RegisterIo`] is appended to the access log;
/// [`MockBus::peek`] and [`MockBus::poke`] bypass the log so test code can
/// inspect and prepare state without disturbing it.
#[derive(Debug, Default, Clone)]
pub struct MockBus {
    regs: HashMap<u32, u32>,
    log: Vec<Access>,
    faulty: HashSet<u32>,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_register(mut self, addr: u32, value: u32) -> Self {
        self.regs.insert(addr, value);
        self
    }

    pub fn peek(&self, addr: u32) -> u32 {
        self.regs.get(&addr).copied().unwrap_or(0)
    }

    pub fn poke(&mut self, addr: u32, value: u32) {
        self.regs.insert(addr, value);
    }

    pub fn peek_field(&self, addr: u32, shift: u8, mask: u32) -> u32 {
        (self.peek(addr) >> shift) & mask
    }

    pub fn poke_field(&mut self, addr: u32, value: u32, shift: u8, mask: u32) {
        let current = self.peek(addr);
        self.poke(addr, (current & !(mask << shift)) | ((value & mask) << shift));
    }

    /// All non-zero registers, sorted by address.
    pub fn snapshot(&self) -> Vec<(u32, u32)> {
        let mut regs: Vec<(u32, u32)> = self
            .regs
            .iter()
            .filter(|&(_, &value)| value != 0)
            .map(|(&addr, &value)| (addr, value))
            .collect();
        regs.sort_unstable();
        regs
    }

    pub fn log(&self) -> &[Access] {
        &self.log
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    pub fn writes(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.log.iter().filter_map(|access| match *access {
            Access::Write { addr, value } => Some((addr, value)),
            Access::Read { .. } => None,
        })
    }

    pub fn write_count(&self) -> usize {
        self.log.iter().filter(|access| access.is_write()).count()
    }

    pub fn read_count(&self) -> usize {
        self.log.len() - self.write_count()
    }

    /// Number of accesses, read or write, to `addr`.
    pub fn accesses_to(&self, addr: u32) -> usize {
        self.log.iter().filter(|access| access.addr() == addr).count()
    }

    /// Emulate a hardware reset: every register except `keep` returns to zero.
    pub fn reset(&mut self, keep: &[u32]) {
        self.regs.retain(|addr, _| keep.contains(addr));
    }

    /// Make every access to `addr` fail with [`RegError::Bus`].
    pub fn inject_fault(&mut self, addr: u32) {
        self.faulty.insert(addr);
    }

    pub fn clear_faults(&mut self) {
        self.faulty.clear();
    }

    fn check(&self, addr: u32) -> Result<()> {
        if addr % 4 != 0 {
            return Err(RegError::Unaligned(addr));
        }
        if self.faulty.contains(&addr) {
            return Err(RegError::Bus { addr });
        }
        Ok(())
    }
}

impl RegisterIo for MockBus {
    fn read_register(&mut self, addr: u32) -> Result<u32> {
        self.check(addr)?;
        let value = self.peek(addr);
        self.log.push(Access::Read { addr, value });
        Ok(value)
    }

    fn write_register(&mut self, addr: u32, value: u32) -> Result<()> {
        self.check(addr)?;
        self.regs.insert(addr, value);
        self.log.push(Access::Write { addr, value });
        Ok(())
    }
}
