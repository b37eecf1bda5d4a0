//! Protection region allocator.
//!
//! [`RegionAllocator`] maps a dynamic set of non-overlapping regions onto the
//! fixed slot file. Every call materializes a fresh [`RegionView`], checks all
//! preconditions against it, edits the view and only then writes it back, so
//! a failed call never touches the hardware.
//!
//! # Algorithm
//!
//! - **Create**: find the region or gap hosting the request, then either
//!   overwrite it in place (exact bounds) or split it. A split shifts every
//!   slot at and above the target up by one or two positions and writes the
//!   lower remainder, the new region and the upper remainder in their place.
//! - **Destroy**: clear the region; if the slot below is free, extend it over
//!   the destroyed range (and over a free slot above) and compact the file.

use vmp_core::addr::{align_down, range_end};
use vmp_core::{kdebug, ktrace};

use crate::cfg::Perm;
use crate::config::{ADDR_ALIGN, MAX_REGIONS, VmpConfig};
use crate::context;
use crate::error::VmpError;
use crate::regfile::VmpRegisters;
use crate::view::{Region, RegionView};

/// Region allocator over one hart's register file.
#[derive(Debug)]
pub struct RegionAllocator<R: VmpRegisters> {
    regs: R,
    config: VmpConfig,
}

impl<R: VmpRegisters> RegionAllocator<R> {
    /// Creates an allocator with the default policy.
    pub fn new(regs: R) -> Self {
        Self::with_config(regs, VmpConfig::DEFAULT)
    }

    /// Creates an allocator with an explicit policy.
    pub fn with_config(regs: R, config: VmpConfig) -> Self {
        Self { regs, config }
    }

    /// Returns the active policy.
    pub fn config(&self) -> VmpConfig {
        self.config
    }

    /// Returns the register backend.
    pub fn registers(&self) -> &R {
        &self.regs
    }

    /// Consumes the allocator, returning the register backend.
    pub fn into_registers(self) -> R {
        self.regs
    }

    /// Materializes the live register file.
    pub fn view(&self) -> RegionView {
        RegionView::from_file(&self.regs.load())
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Protects `[start, end)` with `perm`.
    ///
    /// Both bounds are aligned down to 8 bytes.
    ///
    /// # Errors
    ///
    /// Checked in this order, before anything is written:
    ///
    /// - [`VmpError::InvalidRange`]: the aligned range is empty.
    /// - [`VmpError::SlotExhausted`]: the maximum region count is in use, or
    ///   splitting a permissive region would exceed it.
    /// - [`VmpError::MultiRegionSpan`]: the range overlaps two regions.
    /// - [`VmpError::NotFound`]: no single region or gap contains the range.
    /// - [`VmpError::RestrictedTarget`]: the host region is restricted or a
    ///   slot that would move is locked.
    /// - [`VmpError::InsufficientSlots`]: the split does not fit.
    pub fn create_region(&mut self, start: usize, end: usize, perm: Perm) -> Result<(), VmpError> {
        let (start, end) = aligned_range(start, end)?;
        let result = self.try_create(start, end, perm);
        match result {
            Ok(()) => kdebug!("vmp: created [{:#x}, {:#x}) {}", start, end, perm),
            Err(err) => kdebug!("vmp: create [{:#x}, {:#x}) {} refused: {}", start, end, perm, err),
        }
        result
    }

    fn try_create(&mut self, start: usize, end: usize, perm: Perm) -> Result<(), VmpError> {
        let mut view = self.view();

        if view.active_count() >= MAX_REGIONS {
            return Err(VmpError::SlotExhausted);
        }
        if view.address_spans_multiple_ranges(start, end) {
            return Err(VmpError::MultiRegionSpan);
        }
        let fit = view.fit_region(start, end)?;
        if !fit.is_carvable() {
            return Err(VmpError::RestrictedTarget);
        }

        let new = Region::new(start, end, perm);
        if fit.is_exact(start, end) {
            *view.node_mut(fit.index) = new;
        } else {
            let target = fit.region;
            let lower = start != target.start;
            // The tail has no upper boundary to preserve.
            let upper = !fit.tail && end != target.end;
            let needed = usize::from(lower) + usize::from(upper) + usize::from(fit.tail);

            // Remainders of an active target stay active.
            let remainders = if target.active {
                usize::from(lower) + usize::from(upper)
            } else {
                0
            };
            let active_after = view.active_count() - usize::from(target.active) + 1 + remainders;
            if active_after > MAX_REGIONS {
                return Err(VmpError::SlotExhausted);
            }
            if view.has_locked_from(fit.index) {
                return Err(VmpError::RestrictedTarget);
            }
            view.shift_up(fit.index, needed)?;
            ktrace!("vmp: split slot {} into {} slots", fit.index, needed + 1);

            let mut slot = fit.index;
            if lower {
                *view.node_mut(slot) = Region { end: start, ..target };
                slot += 1;
            }
            *view.node_mut(slot) = new;
            if upper {
                *view.node_mut(slot + 1) = Region { end: target.end, ..target };
            }
        }

        self.commit(&mut view);
        Ok(())
    }

    /// Removes the region whose bounds are exactly `[start, end)`.
    ///
    /// If the slot below is free it absorbs the destroyed range (and a free
    /// slot directly above), releasing the merged slots. Otherwise only the
    /// slot's permission and activity are cleared. With
    /// [`VmpConfig::coalesce_upper`] a free slot above is merged even when
    /// the slot below is in use, and trailing gaps return to the unused tail.
    ///
    /// # Errors
    ///
    /// - [`VmpError::InvalidRange`]: the aligned range is empty.
    /// - [`VmpError::NotFound`]: no active region has exactly these bounds.
    /// - [`VmpError::RestrictedTarget`]: the region is locked.
    pub fn destroy_region(&mut self, start: usize, end: usize) -> Result<(), VmpError> {
        let (start, end) = aligned_range(start, end)?;
        let result = self.try_destroy(start, end);
        match result {
            Ok(()) => kdebug!("vmp: destroyed [{:#x}, {:#x})", start, end),
            Err(err) => kdebug!("vmp: destroy [{:#x}, {:#x}) refused: {}", start, end, err),
        }
        result
    }

    fn try_destroy(&mut self, start: usize, end: usize) -> Result<(), VmpError> {
        let mut view = self.view();
        let index = view.find_exact(start, end).ok_or(VmpError::NotFound)?;
        if view.nodes()[index].locked {
            return Err(VmpError::RestrictedTarget);
        }

        let used = view.used_slots();
        let nodes = *view.nodes();
        let lower_free = index > 0 && nodes[index - 1].is_free();
        let upper_free = index + 1 < used && nodes[index + 1].is_free();
        // Compaction moves every later slot; a locked one must stay put.
        let movable = !view.has_locked_from(index + 1);

        match (lower_free, upper_free && movable) {
            (true, true) => {
                let upper_end = nodes[index + 1].end;
                view.node_mut(index - 1).end = upper_end;
                view.compact(index, 2);
            }
            (true, false) if movable => {
                view.node_mut(index - 1).end = end;
                view.compact(index, 1);
            }
            (false, true) if self.config.coalesce_upper => {
                let upper_end = nodes[index + 1].end;
                *view.node_mut(index) = Region::gap(start, upper_end);
                view.compact(index + 1, 1);
            }
            _ => {
                let node = view.node_mut(index);
                node.active = false;
                node.perm = Perm::empty();
            }
        }

        if self.config.coalesce_upper {
            release_trailing_gaps(&mut view);
        }

        self.commit(&mut view);
        Ok(())
    }

    /// Replaces the permissions of the region whose bounds are exactly
    /// `[start, start + size)`, without reshaping any slot.
    ///
    /// # Errors
    ///
    /// - [`VmpError::InvalidRange`]: the aligned range is empty or overflows.
    /// - [`VmpError::NotFound`]: no active region has exactly these bounds.
    /// - [`VmpError::RestrictedTarget`]: the region is locked.
    pub fn modify_region(&mut self, start: usize, size: usize, perm: Perm) -> Result<(), VmpError> {
        let end = range_end(start, size).ok_or(VmpError::InvalidRange)?;
        let (start, end) = aligned_range(start, end)?;

        let mut view = self.view();
        let index = view.find_exact(start, end).ok_or(VmpError::NotFound)?;
        let node = view.node_mut(index);
        if node.locked {
            return Err(VmpError::RestrictedTarget);
        }
        node.perm = perm;

        self.commit(&mut view);
        kdebug!("vmp: slot {} now {}", index, perm);
        Ok(())
    }

    fn commit(&mut self, view: &mut RegionView) {
        view.relink();
        self.regs.store(&view.to_file());
    }

    // -----------------------------------------------------------------------
    // Context
    // -----------------------------------------------------------------------

    /// Saves the register file into `buf` and clears it.
    ///
    /// See [`context::save_and_clear_context`].
    ///
    /// # Errors
    ///
    /// [`VmpError::BufferTooSmall`] if `buf` cannot hold the register file.
    pub fn save_and_clear_context(&mut self, buf: &mut [u8]) -> Result<usize, VmpError> {
        context::save_and_clear_context(&mut self.regs, buf)
    }

    /// Replaces the register file with the image in `buf`.
    ///
    /// See [`context::restore_context`].
    ///
    /// # Errors
    ///
    /// [`VmpError::BufferTooSmall`] if `buf` is shorter than a register file.
    pub fn restore_context(&mut self, buf: &[u8]) -> Result<(), VmpError> {
        context::restore_context(&mut self.regs, buf)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Returns the region or gap fully containing `[start, end)`.
    pub fn query(&self, start: usize, end: usize) -> Option<Region> {
        self.view().query(start, end)
    }

    /// Returns the permissions covering `[start, end)`.
    pub fn range_permissions(&self, start: usize, end: usize) -> Perm {
        self.view().range_permissions(start, end)
    }

    /// Returns the number of active regions.
    pub fn active_regions(&self) -> usize {
        self.view().active_count()
    }

    /// Logs every used slot at debug level.
    pub fn dump(&self) {
        let view = self.view();
        kdebug!(
            "vmp: {} active regions, {} slots used",
            view.active_count(),
            view.used_slots()
        );
        for (i, node) in view.used().iter().enumerate() {
            kdebug!(
                "vmp[{:2}] {:#018x}..{:#018x} {} {}{}",
                i,
                node.start,
                node.end,
                node.perm,
                if node.active { "TOR" } else { "OFF" },
                if node.locked { " L" } else { "" },
            );
        }
    }
}

/// Aligns both bounds down and rejects empty ranges.
fn aligned_range(start: usize, end: usize) -> Result<(usize, usize), VmpError> {
    let start = align_down(start, ADDR_ALIGN);
    let end = align_down(end, ADDR_ALIGN);
    if start >= end {
        return Err(VmpError::InvalidRange);
    }
    Ok((start, end))
}

/// Returns free slots at the top of the used range to the unused tail.
fn release_trailing_gaps(view: &mut RegionView) {
    while let Some(last) = view.used_slots().checked_sub(1) {
        if !view.nodes()[last].is_free() {
            break;
        }
        *view.node_mut(last) = Region::EMPTY;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
