//! Register-file invariant checks.

use core::fmt;

use vmp_core::addr::is_aligned;

use crate::cfg::AddrMode;
use crate::config::ADDR_ALIGN;
use crate::regfile::RegisterFile;

/// The first invariant a register file was found to break.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantViolation {
    /// A used slot's address is below its predecessor's.
    NonMonotonic {
        /// Offending slot.
        slot: usize,
    },
    /// A used slot's address is not a multiple of the boundary alignment.
    Misaligned {
        /// Offending slot.
        slot: usize,
    },
    /// An active slot covers no addresses.
    EmptyRegion {
        /// Offending slot.
        slot: usize,
    },
    /// An active slot uses an addressing mode other than top-of-range.
    UnsupportedMode {
        /// Offending slot.
        slot: usize,
        /// The mode found.
        mode: AddrMode,
    },
    /// A slot past the last used slot is enabled.
    DirtyTail {
        /// Offending slot.
        slot: usize,
    },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonMonotonic { slot } => write!(f, "slot {slot} ends below its predecessor"),
            Self::Misaligned { slot } => write!(f, "slot {slot} has a misaligned boundary"),
            Self::EmptyRegion { slot } => write!(f, "active slot {slot} is empty"),
            Self::UnsupportedMode { slot, mode } => {
                write!(f, "active slot {slot} uses unsupported mode {mode:?}")
            }
            Self::DirtyTail { slot } => write!(f, "unused slot {slot} is enabled"),
        }
    }
}

impl core::error::Error for InvariantViolation {}

/// Checks that `file` can be materialized into disjoint, ordered regions.
///
/// # Errors
///
/// Returns the first [`InvariantViolation`] found, scanning in slot order.
pub fn validate(file: &RegisterFile) -> Result<(), InvariantViolation> {
    let used = file.addr.iter().rposition(|&a| a != 0).map_or(0, |i| i + 1);

    let mut prev_end = 0;
    for slot in 0..used {
        let end = file.addr[slot];
        let cfg = file.cfg[slot];
        if end < prev_end {
            return Err(InvariantViolation::NonMonotonic { slot });
        }
        if !is_aligned(end, ADDR_ALIGN) {
            return Err(InvariantViolation::Misaligned { slot });
        }
        if cfg.is_active() {
            if cfg.mode() != AddrMode::TopOfRange {
                return Err(InvariantViolation::UnsupportedMode {
                    slot,
                    mode: cfg.mode(),
                });
            }
            if end == prev_end {
                return Err(InvariantViolation::EmptyRegion { slot });
            }
        }
        prev_end = end;
    }

    if let Some(slot) = (used..file.cfg.len()).find(|&i| file.cfg[i].is_active()) {
        return Err(InvariantViolation::DirtyTail { slot });
    }
    Ok(())
}
