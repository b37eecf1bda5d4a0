//! Error type shared by every VMP operation.

use core::fmt;

/// Errors returned by the region allocator and the context store.
///
/// Every failing call leaves the register file byte-for-byte unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmpError {
    /// The maximum number of active regions is already in use.
    SlotExhausted,
    /// The request overlaps more than one existing region.
    MultiRegionSpan,
    /// The target region is neither free nor permissive, or is locked.
    RestrictedTarget,
    /// Splitting the target would need more slots than the file has left.
    InsufficientSlots,
    /// No region or gap matches the requested range.
    NotFound,
    /// The context buffer is smaller than a serialized register file.
    BufferTooSmall,
    /// The function id is not part of the call interface.
    Unsupported,
    /// The range is empty, inverted, or overflows the address space.
    InvalidRange,
}

// SBI error numbers.
const SBI_ERR_FAILED: isize = -1;
const SBI_ERR_NOT_SUPPORTED: isize = -2;
const SBI_ERR_INVALID_PARAM: isize = -3;
const SBI_ERR_DENIED: isize = -4;
const SBI_ERR_INVALID_ADDRESS: isize = -5;
const SBI_ERR_NO_SHMEM: isize = -9;
const SBI_ERR_BAD_RANGE: isize = -11;

impl VmpError {
    /// Returns the negative status code reported to the caller.
    pub const fn code(self) -> isize {
        match self {
            Self::InsufficientSlots => SBI_ERR_FAILED,
            Self::Unsupported => SBI_ERR_NOT_SUPPORTED,
            Self::InvalidRange | Self::BufferTooSmall => SBI_ERR_INVALID_PARAM,
            Self::RestrictedTarget => SBI_ERR_DENIED,
            Self::NotFound => SBI_ERR_INVALID_ADDRESS,
            Self::SlotExhausted => SBI_ERR_NO_SHMEM,
            Self::MultiRegionSpan => SBI_ERR_BAD_RANGE,
        }
    }
}

impl fmt::Display for VmpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SlotExhausted => write!(f, "no free protection slot"),
            Self::MultiRegionSpan => write!(f, "range spans multiple regions"),
            Self::RestrictedTarget => write!(f, "target region is restricted"),
            Self::InsufficientSlots => write!(f, "split needs more slots than available"),
            Self::NotFound => write!(f, "no matching region"),
            Self::BufferTooSmall => write!(f, "context buffer too small"),
            Self::Unsupported => write!(f, "function not supported"),
            Self::InvalidRange => write!(f, "invalid address range"),
        }
    }
}

impl core::error::Error for VmpError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_negative_and_distinct_per_class() {
        let all = [
            VmpError::SlotExhausted,
            VmpError::MultiRegionSpan,
            VmpError::RestrictedTarget,
            VmpError::InsufficientSlots,
            VmpError::NotFound,
            VmpError::BufferTooSmall,
            VmpError::Unsupported,
            VmpError::InvalidRange,
        ];
        for err in all {
            assert!(err.code() < 0, "{err} should map to a negative code");
        }
        assert_eq!(VmpError::Unsupported.code(), -2);
        assert_ne!(VmpError::SlotExhausted.code(), VmpError::InsufficientSlots.code());
    }

    #[test]
    fn display_messages() {
        assert_eq!(
            std::format!("{}", VmpError::RestrictedTarget),
            "target region is restricted"
        );
    }
}
