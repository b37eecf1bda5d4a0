//! Materialized region view of the register file.
//!
//! A [`RegionView`] holds exactly one [`Region`] per hardware slot, in slot
//! order. Only each node's `end` is stored in hardware; `start` is always the
//! previous node's end and is recomputed by [`RegionView::relink`] after any
//! edit. Shifting slots is a bounded move inside the fixed array.

use crate::cfg::{AddrMode, ConfigSlot, Perm};
use crate::config::SLOT_COUNT;
use crate::error::VmpError;
use crate::regfile::RegisterFile;

/// One slot's logical range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// Inclusive lower bound (the previous slot's end).
    pub start: usize,
    /// Exclusive upper bound (this slot's address register).
    pub end: usize,
    /// Access permissions.
    pub perm: Perm,
    /// Whether the slot participates in address matching.
    pub active: bool,
    /// Whether the slot's lock bit is set.
    pub locked: bool,
}

impl Region {
    /// An unused, zeroed node.
    pub const EMPTY: Self = Self {
        start: 0,
        end: 0,
        perm: Perm::empty(),
        active: false,
        locked: false,
    };

    /// Creates an active, unlocked region.
    pub const fn new(start: usize, end: usize, perm: Perm) -> Self {
        Self {
            start,
            end,
            perm,
            active: true,
            locked: false,
        }
    }

    /// Creates an inactive gap.
    pub const fn gap(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            perm: Perm::empty(),
            active: false,
            locked: false,
        }
    }

    /// Returns `true` if the node is inactive and may be merged or reused.
    #[inline]
    pub const fn is_free(&self) -> bool {
        !self.active && !self.locked
    }

    /// Returns `true` if the node is an active R|W|X region.
    #[inline]
    pub const fn is_permissive(&self) -> bool {
        self.active && self.perm.is_permissive()
    }

    /// Returns `true` if the node is past the last used slot.
    #[inline]
    pub const fn is_unused(&self) -> bool {
        self.end == 0
    }

    /// Returns `true` if `[start, end)` lies within this node.
    #[inline]
    pub const fn contains(&self, start: usize, end: usize) -> bool {
        vmp_core::addr::contains(self.start, self.end, start, end)
    }

    /// Returns `true` if `[start, end)` shares an address with this node.
    #[inline]
    pub const fn overlaps(&self, start: usize, end: usize) -> bool {
        vmp_core::addr::overlaps(self.start, self.end, start, end)
    }

    /// Returns `true` if the node's bounds are exactly `[start, end)`.
    #[inline]
    pub const fn matches(&self, start: usize, end: usize) -> bool {
        self.start == start && self.end == end
    }
}

impl Default for Region {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Fixed-capacity, slot-ordered view over a [`RegisterFile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionView {
    nodes: [Region; SLOT_COUNT],
}

impl RegionView {
    /// Materializes `file` into one node per slot.
    pub fn from_file(file: &RegisterFile) -> Self {
        let mut nodes = [Region::EMPTY; SLOT_COUNT];
        let mut prev_end = 0;
        for (node, (cfg, &end)) in nodes.iter_mut().zip(file.cfg.iter().zip(&file.addr)) {
            *node = Region {
                start: if end == 0 { 0 } else { prev_end },
                end,
                perm: cfg.perm(),
                active: cfg.is_active(),
                locked: cfg.locked(),
            };
            prev_end = end;
        }
        Self { nodes }
    }

    /// Writes the view back positionally. Active nodes become TOR slots.
    pub fn to_file(&self) -> RegisterFile {
        let mut file = RegisterFile::zeroed();
        for (i, node) in self.nodes.iter().enumerate() {
            let mode = if node.active {
                AddrMode::TopOfRange
            } else {
                AddrMode::Off
            };
            file.addr[i] = node.end;
            file.cfg[i] = ConfigSlot::new(node.perm, mode, node.locked);
        }
        file
    }

    /// Returns every node, used or not.
    #[inline]
    pub fn nodes(&self) -> &[Region; SLOT_COUNT] {
        &self.nodes
    }

    /// Returns the node at `index`.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Region> {
        self.nodes.get(index)
    }

    /// Returns the nodes up to and including the last slot with a non-zero end.
    #[inline]
    pub fn used(&self) -> &[Region] {
        &self.nodes[..self.used_slots()]
    }

    /// Number of slots up to and including the last slot with a non-zero end.
    pub fn used_slots(&self) -> usize {
        self.nodes
            .iter()
            .rposition(|node| !node.is_unused())
            .map_or(0, |i| i + 1)
    }

    /// End address of the last used slot, or 0 for an empty file.
    pub fn last_end(&self) -> usize {
        self.used().last().map_or(0, |node| node.end)
    }

    /// Number of active slots.
    pub fn active_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.active).count()
    }

    /// Returns `true` if any slot at or after `from` is locked.
    pub fn has_locked_from(&self, from: usize) -> bool {
        self.nodes
            .get(from..)
            .is_some_and(|rest| rest.iter().any(|node| node.locked))
    }

    pub(crate) fn node_mut(&mut self, index: usize) -> &mut Region {
        &mut self.nodes[index]
    }

    /// Moves slots `from..used` up by `by` positions.
    ///
    /// The nodes at `from..from + by` keep stale copies for the caller to
    /// overwrite.
    ///
    /// # Errors
    ///
    /// [`VmpError::InsufficientSlots`] if the used slots would overflow the
    /// register file; the view is untouched in that case.
    pub(crate) fn shift_up(&mut self, from: usize, by: usize) -> Result<(), VmpError> {
        let used = self.used_slots();
        if used.max(from) + by > SLOT_COUNT {
            return Err(VmpError::InsufficientSlots);
        }
        if from < used {
            self.nodes.copy_within(from..used, from + by);
        }
        Ok(())
    }

    /// Removes `by` slots starting at `at`, moving every later slot down and
    /// zeroing the freed tail.
    pub(crate) fn compact(&mut self, at: usize, by: usize) {
        debug_assert!(at + by <= SLOT_COUNT, "compact: range past end of file");
        self.nodes.copy_within(at + by.., at);
        for node in &mut self.nodes[SLOT_COUNT - by..] {
            *node = Region::EMPTY;
        }
    }

    /// Recomputes every node's `start` from its predecessor's `end`.
    pub(crate) fn relink(&mut self) {
        let mut prev_end = 0;
        for node in &mut self.nodes {
            node.start = if node.end == 0 { 0 } else { prev_end };
            prev_end = node.end;
        }
    }
}

impl Default for RegionView {
    fn default() -> Self {
        Self::from_file(&RegisterFile::zeroed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tor(perm: Perm) -> ConfigSlot {
        ConfigSlot::new(perm, AddrMode::TopOfRange, false)
    }

    /// [0,0x1000) rw, gap [0x1000,0x2000), [0x2000,0x3000) rwx.
    fn three_slots() -> RegisterFile {
        let mut file = RegisterFile::zeroed();
        file.addr[0] = 0x1000;
        file.cfg[0] = tor(Perm::RW);
        file.addr[1] = 0x2000;
        file.addr[2] = 0x3000;
        file.cfg[2] = tor(Perm::all());
        file
    }

    #[test]
    fn materializes_contiguous_nodes() {
        let view = RegionView::from_file(&three_slots());
        assert_eq!(view.nodes()[0], Region::new(0, 0x1000, Perm::RW));
        assert_eq!(view.nodes()[1], Region::gap(0x1000, 0x2000));
        assert_eq!(view.nodes()[2], Region::new(0x2000, 0x3000, Perm::all()));
        assert_eq!(view.nodes()[3], Region::EMPTY);
        assert_eq!(view.used_slots(), 3);
        assert_eq!(view.last_end(), 0x3000);
        assert_eq!(view.active_count(), 2);
    }

    #[test]
    fn tail_nodes_are_zeroed() {
        let view = RegionView::from_file(&three_slots());
        assert!(view.nodes()[3..].iter().all(|n| *n == Region::EMPTY));
    }

    #[test]
    fn round_trip_preserves_file() {
        let mut file = three_slots();
        file.cfg[1] = ConfigSlot::new(Perm::X, AddrMode::Off, true);
        assert_eq!(RegionView::from_file(&file).to_file(), file);
        assert_eq!(RegionView::default().to_file(), RegisterFile::zeroed());
    }

    #[test]
    fn shift_up_moves_used_slots() {
        let mut view = RegionView::from_file(&three_slots());
        view.shift_up(1, 2).unwrap();
        view.relink();
        assert_eq!(view.nodes()[3].end, 0x2000);
        assert!(!view.nodes()[3].active);
        assert_eq!(view.nodes()[4].end, 0x3000);
        assert!(view.nodes()[4].active);
        assert_eq!(view.used_slots(), 5);
    }

    #[test]
    fn shift_up_rejects_overflow() {
        let mut view = RegionView::from_file(&three_slots());
        let before = view;
        assert_eq!(
            view.shift_up(0, SLOT_COUNT - 2),
            Err(VmpError::InsufficientSlots)
        );
        assert_eq!(view, before);
        assert!(view.shift_up(0, SLOT_COUNT - 3).is_ok());
    }

    #[test]
    fn compact_zeroes_tail() {
        let mut view = RegionView::from_file(&three_slots());
        view.compact(1, 1);
        view.relink();
        assert_eq!(view.used_slots(), 2);
        assert_eq!(view.nodes()[1], Region::new(0x1000, 0x3000, Perm::all()));
        assert_eq!(view.nodes()[SLOT_COUNT - 1], Region::EMPTY);
    }

    #[test]
    fn locked_scan() {
        let mut file = three_slots();
        file.cfg[2] = ConfigSlot::new(Perm::all(), AddrMode::TopOfRange, true);
        let view = RegionView::from_file(&file);
        assert!(view.has_locked_from(0));
        assert!(view.has_locked_from(2));
        assert!(!view.has_locked_from(3));
        assert!(!view.has_locked_from(SLOT_COUNT));
    }
}
