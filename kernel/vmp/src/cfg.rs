//! The packed per-slot configuration byte.
//!
//! Layout (hardware contract, one byte per slot):
//!
//! | bits | field |
//! |------|-------|
//! | 0-2  | R / W / X permission |
//! | 3-4  | address-matching mode ([`AddrMode`]) |
//! | 5-6  | reserved, read as zero |
//! | 7    | lock |

use core::fmt;

bitflags::bitflags! {
    /// Access permissions granted by a region.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Perm: u8 {
        /// Loads are allowed.
        const R = 1 << 0;
        /// Stores are allowed.
        const W = 1 << 1;
        /// Instruction fetch is allowed.
        const X = 1 << 2;
        /// Read + write.
        const RW = Self::R.bits() | Self::W.bits();
        /// Read + execute.
        const RX = Self::R.bits() | Self::X.bits();
    }
}

impl Perm {
    /// Builds a permission set from the low three bits of a raw argument.
    #[inline]
    pub const fn from_raw(raw: usize) -> Self {
        Self::from_bits_truncate((raw & PERM_MASK as usize) as u8)
    }

    /// Returns `true` if all of R, W and X are set.
    #[inline]
    pub const fn is_permissive(self) -> bool {
        self.bits() == PERM_MASK
    }
}

impl fmt::Display for Perm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |set: bool, c: char| if set { c } else { '-' };
        write!(
            f,
            "{}{}{}",
            flag(self.contains(Self::R), 'r'),
            flag(self.contains(Self::W), 'w'),
            flag(self.contains(Self::X), 'x'),
        )
    }
}

const PERM_MASK: u8 = 0b0000_0111;
const MODE_SHIFT: u8 = 3;
const MODE_MASK: u8 = 0b0001_1000;
const LOCK_BIT: u8 = 0b1000_0000;
const RESERVED_MASK: u8 = 0b0110_0000;

/// Address-matching mode of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AddrMode {
    /// Slot disabled.
    Off = 0b00,
    /// Top of range: `[addr[i-1], addr[i])`.
    TopOfRange = 0b01,
    /// Naturally aligned four-byte region.
    NaturallyAligned4 = 0b10,
    /// Naturally aligned power-of-two region.
    NaturallyAlignedPow2 = 0b11,
}

impl AddrMode {
    const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => Self::Off,
            0b01 => Self::TopOfRange,
            0b10 => Self::NaturallyAligned4,
            _ => Self::NaturallyAlignedPow2,
        }
    }
}

/// One slot's configuration byte.
///
/// Stored in its on-wire form; fields are decoded on access so the value can
/// never drift from the hardware layout.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct ConfigSlot(u8);

impl ConfigSlot {
    /// A disabled, unlocked slot with no permissions.
    pub const OFF: Self = Self(0);

    /// Encodes a configuration byte from its fields.
    #[inline]
    pub const fn new(perm: Perm, mode: AddrMode, locked: bool) -> Self {
        let lock = if locked { LOCK_BIT } else { 0 };
        Self(perm.bits() | ((mode as u8) << MODE_SHIFT) | lock)
    }

    /// Decodes a raw configuration byte. Reserved bits are dropped.
    #[inline]
    pub const fn from_byte(byte: u8) -> Self {
        Self(byte & !RESERVED_MASK)
    }

    /// Returns the on-wire byte.
    #[inline]
    pub const fn to_byte(self) -> u8 {
        self.0
    }

    /// Returns the permission bits.
    #[inline]
    pub const fn perm(self) -> Perm {
        Perm::from_bits_truncate(self.0 & PERM_MASK)
    }

    /// Returns the address-matching mode.
    #[inline]
    pub const fn mode(self) -> AddrMode {
        AddrMode::from_bits((self.0 & MODE_MASK) >> MODE_SHIFT)
    }

    /// Returns `true` if the lock bit is set.
    #[inline]
    pub const fn locked(self) -> bool {
        self.0 & LOCK_BIT != 0
    }

    /// Returns `true` if the slot participates in address matching.
    #[inline]
    pub const fn is_active(self) -> bool {
        !matches!(self.mode(), AddrMode::Off)
    }
}

impl fmt::Debug for ConfigSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigSlot")
            .field("perm", &self.perm())
            .field("mode", &self.mode())
            .field("locked", &self.locked())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_places_fields_at_hardware_bits() {
        let cfg = ConfigSlot::new(Perm::RW, AddrMode::TopOfRange, false);
        assert_eq!(cfg.to_byte(), 0b0000_1011);

        let cfg = ConfigSlot::new(Perm::X, AddrMode::NaturallyAlignedPow2, true);
        assert_eq!(cfg.to_byte(), 0b1001_1100);
    }

    #[test]
    fn decode_reads_every_field() {
        let cfg = ConfigSlot::from_byte(0b1001_0101);
        assert_eq!(cfg.perm(), Perm::RX);
        assert_eq!(cfg.mode(), AddrMode::NaturallyAligned4);
        assert!(cfg.locked());
        assert!(cfg.is_active());
    }

    #[test]
    fn reserved_bits_read_as_zero() {
        let cfg = ConfigSlot::from_byte(0b0110_1111);
        assert_eq!(cfg.to_byte(), 0b0000_1111);
    }

    #[test]
    fn off_slot_is_inactive() {
        assert!(!ConfigSlot::OFF.is_active());
        assert_eq!(ConfigSlot::OFF.perm(), Perm::empty());
        assert_eq!(ConfigSlot::default(), ConfigSlot::OFF);
    }

    #[test]
    fn perm_from_raw_masks_to_three_bits() {
        assert_eq!(Perm::from_raw(0xff), Perm::all());
        assert_eq!(Perm::from_raw(0x0b), Perm::RW);
        assert!(Perm::from_raw(7).is_permissive());
        assert!(!Perm::RW.is_permissive());
    }

    #[test]
    fn perm_display() {
        assert_eq!(std::format!("{}", Perm::RX), "r-x");
        assert_eq!(std::format!("{}", Perm::empty()), "---");
    }
}
