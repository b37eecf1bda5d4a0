//! Compile-time platform constants and the runtime allocator policy.

/// Number of (config, address) slot pairs in the hardware register file.
pub const SLOT_COUNT: usize = 16;

/// Alignment every region boundary is rounded down to.
pub const ADDR_ALIGN: usize = 8;

/// Physical base of the `SLOT_COUNT` config bytes.
pub const CFG_BASE: usize = 0x378;

/// Physical base of the `SLOT_COUNT` address words.
pub const ADDR_BASE: usize = 0x380;

/// Maximum number of independently-permissioned regions a register file of
/// `slots` entries can always represent.
///
/// The first region can sit at address 0 and uses one slot. Every later
/// region may need its own top plus a gap slot below it, i.e. two of the
/// remaining `slots - 1` boundaries.
pub const fn max_regions(slots: usize) -> usize {
    if slots == 0 {
        0
    } else {
        (slots - 1) / 2 + 1
    }
}

/// Maximum number of active regions for this platform.
pub const MAX_REGIONS: usize = max_regions(SLOT_COUNT);

const _: () = assert!(MAX_REGIONS <= SLOT_COUNT);

/// Runtime policy knobs for the region allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmpConfig {
    /// Also coalesce a destroyed region with a free *upper* neighbour and
    /// release trailing gaps into the unused tail.
    ///
    /// Off by default: destroy only ever merges downward.
    pub coalesce_upper: bool,
}

impl VmpConfig {
    /// The default policy (downward-only coalescing).
    pub const DEFAULT: Self = Self {
        coalesce_upper: false,
    };
}

impl Default for VmpConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
