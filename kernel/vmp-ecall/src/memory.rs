//! Caller buffer resolution for context calls.
//!
//! Context images travel through caller-owned memory given as a raw
//! `(addr, len)` pair. [`CallerMemory`] turns that pair into a byte slice,
//! validating the range before the region manager ever sees it.

use vmp::VmpError;

/// Validated caller range `[addr, addr + len)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerRange {
    addr: usize,
    len: usize,
}

impl CallerRange {
    /// Validates a raw range against the inclusive-exclusive window
    /// `[base, limit)`.
    ///
    /// # Errors
    ///
    /// [`VmpError::InvalidRange`] if the range overflows or leaves the window.
    pub fn new(addr: usize, len: usize, base: usize, limit: usize) -> Result<Self, VmpError> {
        if len == 0 {
            return Ok(Self { addr, len: 0 });
        }
        let end = addr.checked_add(len).ok_or(VmpError::InvalidRange)?;
        if addr < base || end > limit {
            return Err(VmpError::InvalidRange);
        }
        Ok(Self { addr, len })
    }

    /// Returns the first byte's address.
    pub fn addr(&self) -> usize {
        self.addr
    }

    /// Returns the length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the range is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Resolves caller addresses to memory the firmware may touch.
pub trait CallerMemory {
    /// Returns the bytes at `[addr, addr + len)` for reading.
    ///
    /// # Errors
    ///
    /// [`VmpError::InvalidRange`] if the range is not caller memory.
    fn slice(&self, addr: usize, len: usize) -> Result<&[u8], VmpError>;

    /// Returns the bytes at `[addr, addr + len)` for writing.
    ///
    /// # Errors
    ///
    /// [`VmpError::InvalidRange`] if the range is not caller memory.
    fn slice_mut(&mut self, addr: usize, len: usize) -> Result<&mut [u8], VmpError>;
}

/// Caller memory identity-mapped into the firmware's address space.
#[derive(Debug)]
pub struct DirectMemory {
    base: usize,
    limit: usize,
}

impl DirectMemory {
    /// Accepts any range within `[base, limit)`.
    ///
    /// # Safety
    ///
    /// Every address in `[base, limit)` must be mapped, readable and writable
    /// at the same address, and not aliased by a live Rust reference while a
    /// slice returned from this value is in use.
    pub unsafe fn new(base: usize, limit: usize) -> Self {
        Self { base, limit }
    }
}

impl CallerMemory for DirectMemory {
    fn slice(&self, addr: usize, len: usize) -> Result<&[u8], VmpError> {
        let range = CallerRange::new(addr, len, self.base, self.limit)?;
        if range.is_empty() {
            return Ok(&[]);
        }
        // SAFETY: `new` guarantees the window is mapped; the range lies inside it.
        Ok(unsafe { core::slice::from_raw_parts(range.addr() as *const u8, range.len()) })
    }

    fn slice_mut(&mut self, addr: usize, len: usize) -> Result<&mut [u8], VmpError> {
        let range = CallerRange::new(addr, len, self.base, self.limit)?;
        if range.is_empty() {
            return Ok(&mut []);
        }
        // SAFETY: As in `slice`; `&mut self` excludes other slices from this value.
        Ok(unsafe { core::slice::from_raw_parts_mut(range.addr() as *mut u8, range.len()) })
    }
}

/// Caller memory backed by a byte buffer that appears at `base`.
///
/// Used by simulators and tests that model a caller's address space.
#[derive(Debug)]
pub struct MappedWindow<'a> {
    base: usize,
    bytes: &'a mut [u8],
}

impl<'a> MappedWindow<'a> {
    /// Maps `bytes` at caller address `base`.
    pub fn new(base: usize, bytes: &'a mut [u8]) -> Self {
        Self { base, bytes }
    }

    fn offsets(&self, addr: usize, len: usize) -> Result<core::ops::Range<usize>, VmpError> {
        let limit = self
            .base
            .checked_add(self.bytes.len())
            .ok_or(VmpError::InvalidRange)?;
        let range = CallerRange::new(addr, len, self.base, limit)?;
        if range.is_empty() {
            return Ok(0..0);
        }
        let off = range.addr() - self.base;
        Ok(off..off + range.len())
    }
}

impl CallerMemory for MappedWindow<'_> {
    fn slice(&self, addr: usize, len: usize) -> Result<&[u8], VmpError> {
        let range = self.offsets(addr, len)?;
        Ok(&self.bytes[range])
    }

    fn slice_mut(&mut self, addr: usize, len: usize) -> Result<&mut [u8], VmpError> {
        let range = self.offsets(addr, len)?;
        Ok(&mut self.bytes[range])
    }
}
