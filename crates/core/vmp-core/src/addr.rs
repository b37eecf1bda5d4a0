//! Address-range arithmetic on raw `usize` addresses.
//!
//! Protection registers hold plain machine words, so unlike the page-table
//! code there is no typed address wrapper here; these helpers only guard the
//! arithmetic against overflow and misalignment.

/// Aligns `addr` down to `align`.
///
/// `align` must be a power of two.
#[inline]
pub const fn align_down(addr: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two(), "alignment must be a power of two");
    addr & !(align - 1)
}

/// Returns `true` if `addr` is aligned to `align`.
///
/// `align` must be a power of two.
#[inline]
pub const fn is_aligned(addr: usize, align: usize) -> bool {
    debug_assert!(align.is_power_of_two(), "alignment must be a power of two");
    addr & (align - 1) == 0
}

/// Returns the exclusive end of `[start, start + size)`, or `None` on overflow.
#[inline]
pub const fn range_end(start: usize, size: usize) -> Option<usize> {
    start.checked_add(size)
}

/// Returns `true` if the half-open ranges `[a_start, a_end)` and
/// `[b_start, b_end)` share at least one address.
#[inline]
pub const fn overlaps(a_start: usize, a_end: usize, b_start: usize, b_end: usize) -> bool {
    a_start < b_end && b_start < a_end
}

/// Returns `true` if `[inner_start, inner_end)` lies within
/// `[outer_start, outer_end)`.
#[inline]
pub const fn contains(
    outer_start: usize,
    outer_end: usize,
    inner_start: usize,
    inner_end: usize,
) -> bool {
    outer_start <= inner_start && inner_end <= outer_end
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_down_clears_low_bits() {
        assert_eq!(align_down(0x1007, 8), 0x1000);
        assert_eq!(align_down(0x1008, 8), 0x1008);
        assert_eq!(align_down(7, 8), 0);
    }

    #[test]
    fn aligned_check() {
        assert!(is_aligned(0x4000, 8));
        assert!(!is_aligned(0x4004, 8));
    }

    #[test]
    fn range_end_detects_overflow() {
        assert_eq!(range_end(0x1000, 0x1000), Some(0x2000));
        assert_eq!(range_end(usize::MAX, 1), None);
    }

    #[test]
    fn overlap_is_half_open() {
        assert!(overlaps(0, 0x1000, 0xff8, 0x2000));
        assert!(!overlaps(0, 0x1000, 0x1000, 0x2000));
        assert!(!overlaps(0x1000, 0x2000, 0, 0x1000));
    }

    #[test]
    fn containment() {
        assert!(contains(0, 0x1000, 0, 0x1000));
        assert!(contains(0, 0x1000, 0x200, 0x400));
        assert!(!contains(0x200, 0x1000, 0, 0x400));
    }
}
