//! The hardware register file and the backends that hold it.
//!
//! [`RegisterFile`] is a plain value snapshot of all slots. The live copy sits
//! behind [`VmpRegisters`], implemented by [`MmioRegisters`] on hardware and by
//! [`RegisterFile`] itself for host tests and simulation.

use crate::cfg::ConfigSlot;
use crate::config::{ADDR_BASE, CFG_BASE, SLOT_COUNT};

/// A snapshot of every (config, address) slot pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterFile {
    /// Per-slot configuration bytes.
    pub cfg: [ConfigSlot; SLOT_COUNT],
    /// Per-slot address words (exclusive top of range for TOR slots).
    pub addr: [usize; SLOT_COUNT],
}

impl RegisterFile {
    /// Size of the serialized form: all address words, then all config bytes.
    pub const SIZE: usize = SLOT_COUNT * core::mem::size_of::<usize>() + SLOT_COUNT;

    const WORD: usize = core::mem::size_of::<usize>();

    /// Returns a file with every slot disabled and zeroed.
    pub const fn zeroed() -> Self {
        Self {
            cfg: [ConfigSlot::OFF; SLOT_COUNT],
            addr: [0; SLOT_COUNT],
        }
    }

    /// Serializes the file into `buf`, address words first.
    ///
    /// Returns the number of bytes written, or `None` if `buf` is shorter
    /// than [`Self::SIZE`].
    pub fn write_to(&self, buf: &mut [u8]) -> Option<usize> {
        let out = buf.get_mut(..Self::SIZE)?;
        let (words, bytes) = out.split_at_mut(SLOT_COUNT * Self::WORD);
        for (chunk, addr) in words.chunks_exact_mut(Self::WORD).zip(self.addr) {
            chunk.copy_from_slice(&addr.to_ne_bytes());
        }
        for (byte, cfg) in bytes.iter_mut().zip(self.cfg) {
            *byte = cfg.to_byte();
        }
        Some(Self::SIZE)
    }

    /// Deserializes a file from `buf`, the inverse of [`Self::write_to`].
    pub fn read_from(buf: &[u8]) -> Option<Self> {
        let src = buf.get(..Self::SIZE)?;
        let (words, bytes) = src.split_at(SLOT_COUNT * Self::WORD);
        let mut file = Self::zeroed();
        for (addr, chunk) in file.addr.iter_mut().zip(words.chunks_exact(Self::WORD)) {
            let mut raw = [0u8; core::mem::size_of::<usize>()];
            raw.copy_from_slice(chunk);
            *addr = usize::from_ne_bytes(raw);
        }
        for (cfg, byte) in file.cfg.iter_mut().zip(bytes) {
            *cfg = ConfigSlot::from_byte(*byte);
        }
        Some(file)
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// Access to the live register file of the current hart.
///
/// Implementations are hart-local; callers keep interrupts masked for the
/// whole of any load/modify/store sequence.
pub trait VmpRegisters {
    /// Reads every slot.
    fn load(&self) -> RegisterFile;

    /// Writes every slot.
    fn store(&mut self, file: &RegisterFile);
}

impl VmpRegisters for RegisterFile {
    fn load(&self) -> RegisterFile {
        *self
    }

    fn store(&mut self, file: &RegisterFile) {
        *self = *file;
    }
}

/// Memory-mapped register file at two fixed physical bases.
#[derive(Debug)]
pub struct MmioRegisters {
    cfg: *mut u8,
    addr: *mut usize,
}

impl MmioRegisters {
    /// Maps the register file at the platform's default bases.
    ///
    /// # Safety
    ///
    /// See [`MmioRegisters::new`].
    pub unsafe fn at_default_bases() -> Self {
        // SAFETY: Forwarded to the caller.
        unsafe { Self::new(CFG_BASE, ADDR_BASE) }
    }

    /// Maps the register file at `cfg_base` (`SLOT_COUNT` bytes) and
    /// `addr_base` (`SLOT_COUNT` words).
    ///
    /// # Safety
    ///
    /// Both ranges must be this hart's protection registers, valid for
    /// volatile access, and not accessed through any other handle while this
    /// one is alive.
    pub unsafe fn new(cfg_base: usize, addr_base: usize) -> Self {
        Self {
            cfg: cfg_base as *mut u8,
            addr: addr_base as *mut usize,
        }
    }
}

impl VmpRegisters for MmioRegisters {
    fn load(&self) -> RegisterFile {
        let mut file = RegisterFile::zeroed();
        for i in 0..SLOT_COUNT {
            // SAFETY: `new` guarantees both bases cover SLOT_COUNT entries.
            unsafe {
                file.cfg[i] = ConfigSlot::from_byte(self.cfg.add(i).read_volatile());
                file.addr[i] = self.addr.add(i).read_volatile();
            }
        }
        file
    }

    fn store(&mut self, file: &RegisterFile) {
        for i in 0..SLOT_COUNT {
            // SAFETY: `new` guarantees both bases cover SLOT_COUNT entries.
            unsafe {
                self.addr.add(i).write_volatile(file.addr[i]);
                self.cfg.add(i).write_volatile(file.cfg[i].to_byte());
            }
        }
    }
}
