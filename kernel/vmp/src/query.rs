//! Lookups over a [`RegionView`]: placement, overlap and permission queries.

use planck_noalloc::vec::ArrayVec;

use crate::cfg::Perm;
use crate::config::SLOT_COUNT;
use crate::error::VmpError;
use crate::view::{Region, RegionView};

/// Where a new range would be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fit {
    /// Slot index of the target (equal to the used-slot count for the tail).
    pub index: usize,
    /// The target's current bounds and attributes.
    pub region: Region,
    /// The target is the unused tail past the last used slot.
    pub tail: bool,
}

impl Fit {
    /// Returns `true` if the request covers the target exactly.
    pub const fn is_exact(&self, start: usize, end: usize) -> bool {
        !self.tail && self.region.matches(start, end)
    }

    /// Returns `true` if the target may be subdivided or overwritten.
    pub const fn is_carvable(&self) -> bool {
        !self.region.locked && (!self.region.active || self.region.perm.is_permissive())
    }
}

impl RegionView {
    /// Finds the slot that can host `[start, end)`.
    ///
    /// Scans in slot order for the active region or free gap fully containing
    /// the range; the unused tail is an unbounded gap after every slot.
    ///
    /// A free slot left at the top of the used range by a destroy stays a
    /// real, bounded gap: a request that starts in it and runs past its end
    /// into the tail is not hosted by either node.
    ///
    /// # Errors
    ///
    /// [`VmpError::NotFound`] if no single node can host the range.
    pub fn fit_region(&self, start: usize, end: usize) -> Result<Fit, VmpError> {
        let used = self.used_slots();
        for (index, node) in self.used().iter().enumerate() {
            if node.start < node.end && node.contains(start, end) {
                return Ok(Fit {
                    index,
                    region: *node,
                    tail: false,
                });
            }
        }

        let last_end = self.last_end();
        if start >= last_end && start < end {
            return Ok(Fit {
                index: used,
                region: Region::gap(last_end, usize::MAX),
                tail: true,
            });
        }
        Err(VmpError::NotFound)
    }

    /// Returns `true` if `[start, end)` overlaps two or more active regions.
    pub fn address_spans_multiple_ranges(&self, start: usize, end: usize) -> bool {
        self.used()
            .iter()
            .filter(|node| node.active && node.overlaps(start, end))
            .nth(1)
            .is_some()
    }

    /// Returns the index of the active region whose bounds are exactly
    /// `[start, end)`.
    pub fn find_exact(&self, start: usize, end: usize) -> Option<usize> {
        self.used()
            .iter()
            .position(|node| node.active && node.matches(start, end))
    }

    /// Returns the node (region or gap) fully containing `[start, end)`.
    pub fn query(&self, start: usize, end: usize) -> Option<Region> {
        self.used()
            .iter()
            .find(|node| node.start < node.end && node.contains(start, end))
            .copied()
    }

    /// Returns the permissions of the active region containing
    /// `[start, end)`, or no permissions if there is none.
    pub fn range_permissions(&self, start: usize, end: usize) -> Perm {
        self.query(start, end)
            .filter(|node| node.active)
            .map_or(Perm::empty(), |node| node.perm)
    }

    /// Returns `true` if exactly one active region contains `[start, end)`
    /// and it grants exactly `perm`.
    pub fn permission_matches(&self, start: usize, end: usize, perm: Perm) -> bool {
        let mut hits = self
            .used()
            .iter()
            .filter(|node| node.active && node.contains(start, end));
        match (hits.next(), hits.next()) {
            (Some(node), None) => node.perm == perm,
            _ => false,
        }
    }

    /// Returns the permissions of slot `index`, or none if it is inactive or
    /// out of range.
    pub fn region_permission(&self, index: usize) -> Perm {
        self.get(index)
            .filter(|node| node.active)
            .map_or(Perm::empty(), |node| node.perm)
    }

    /// Returns `true` if slot `index` is an active R|W|X region.
    pub fn is_permissive(&self, index: usize) -> bool {
        self.get(index).is_some_and(Region::is_permissive)
    }

    /// Returns the index of the active region containing `addr`.
    pub fn lowest_index_region(&self, addr: usize) -> Option<usize> {
        self.used()
            .iter()
            .position(|node| node.active && node.start <= addr && addr < node.end)
    }

    /// Returns the highest active slot index.
    pub fn highest_used_slot(&self) -> Option<usize> {
        self.nodes().iter().rposition(|node| node.active)
    }

    /// Returns every active region in address order.
    pub fn regions(&self) -> ArrayVec<Region, SLOT_COUNT> {
        let mut out = ArrayVec::new();
        for node in self.used().iter().filter(|node| node.active) {
            out.push(*node);
        }
        out
    }
}
