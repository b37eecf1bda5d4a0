//! Call interface for the VMP region manager.
//!
//! Decodes a function id and up to three raw argument registers, runs the
//! matching [`RegionAllocator`] operation and folds the outcome into a single
//! status word: zero or a byte count on success, a negative
//! [`VmpError::code`] on failure.

#![cfg_attr(not(test), no_std)]

pub mod memory;

use vmp::{Perm, RegionAllocator, VmpError, VmpRegisters};
use vmp_core::addr::range_end;
use vmp_core::{kwarn, ktrace};

pub use memory::{CallerMemory, CallerRange, DirectMemory, MappedWindow};

/// Function id: protect `[a0, a0 + a1)` with permissions `a2`.
pub const CREATE_REGION: usize = 0;
/// Function id: set permissions `a2` on the region `[a0, a0 + a1)`.
pub const MODIFY_REGION: usize = 1;
/// Function id: save the register file to buffer `(a0, a1)` and clear it.
pub const SAVE_CLEAR_CONTEXT: usize = 2;
/// Function id: restore the register file from buffer `(a0, a1)`.
pub const RESTORE_CONTEXT: usize = 3;
/// Function id: remove the region `[a0, a1)`.
pub const DESTROY_REGION: usize = 4;

/// A decoded function id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmpFunction {
    /// See [`CREATE_REGION`].
    CreateRegion,
    /// See [`MODIFY_REGION`].
    ModifyRegion,
    /// See [`SAVE_CLEAR_CONTEXT`].
    SaveClearContext,
    /// See [`RESTORE_CONTEXT`].
    RestoreContext,
    /// See [`DESTROY_REGION`].
    DestroyRegion,
}

impl TryFrom<usize> for VmpFunction {
    type Error = VmpError;

    fn try_from(fid: usize) -> Result<Self, Self::Error> {
        match fid {
            CREATE_REGION => Ok(Self::CreateRegion),
            MODIFY_REGION => Ok(Self::ModifyRegion),
            SAVE_CLEAR_CONTEXT => Ok(Self::SaveClearContext),
            RESTORE_CONTEXT => Ok(Self::RestoreContext),
            DESTROY_REGION => Ok(Self::DestroyRegion),
            _ => Err(VmpError::Unsupported),
        }
    }
}

/// Dispatches one call and returns its status word.
pub fn dispatch<R, M>(
    alloc: &mut RegionAllocator<R>,
    mem: &mut M,
    fid: usize,
    args: [usize; 3],
) -> isize
where
    R: VmpRegisters,
    M: CallerMemory + ?Sized,
{
    ktrace!(
        "vmp: call {} ({:#x}, {:#x}, {:#x})",
        fid,
        args[0],
        args[1],
        args[2]
    );
    match handle(alloc, mem, fid, args) {
        Ok(value) => isize::try_from(value).unwrap_or(isize::MAX),
        Err(err) => {
            if err == VmpError::Unsupported {
                kwarn!("vmp: unknown function id {}", fid);
            }
            err.code()
        }
    }
}

/// Runs one call, returning the success value (zero or bytes written).
///
/// # Errors
///
/// [`VmpError::Unsupported`] for an unknown `fid`; otherwise whatever the
/// selected operation reports.
pub fn handle<R, M>(
    alloc: &mut RegionAllocator<R>,
    mem: &mut M,
    fid: usize,
    [a0, a1, a2]: [usize; 3],
) -> Result<usize, VmpError>
where
    R: VmpRegisters,
    M: CallerMemory + ?Sized,
{
    match VmpFunction::try_from(fid)? {
        VmpFunction::CreateRegion => {
            let end = range_end(a0, a1).ok_or(VmpError::InvalidRange)?;
            alloc.create_region(a0, end, Perm::from_raw(a2))?;
            Ok(0)
        }
        VmpFunction::ModifyRegion => {
            alloc.modify_region(a0, a1, Perm::from_raw(a2))?;
            Ok(0)
        }
        VmpFunction::SaveClearContext => {
            let buf = mem.slice_mut(a0, a1)?;
            alloc.save_and_clear_context(buf)
        }
        VmpFunction::RestoreContext => {
            let buf = mem.slice(a0, a1)?;
            alloc.restore_context(buf)?;
            Ok(0)
        }
        VmpFunction::DestroyRegion => {
            alloc.destroy_region(a0, a1)?;
            Ok(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vmp::RegisterFile;

    const BUF_BASE: usize = 0x9000_0000;

    fn setup() -> RegionAllocator<RegisterFile> {
        RegionAllocator::new(RegisterFile::zeroed())
    }

    fn call(
        alloc: &mut RegionAllocator<RegisterFile>,
        bytes: &mut [u8],
        fid: usize,
        args: [usize; 3],
    ) -> isize {
        let mut window = MappedWindow::new(BUF_BASE, bytes);
        dispatch(alloc, &mut window, fid, args)
    }

    #[test]
    fn function_ids_follow_call_table() {
        assert_eq!(VmpFunction::try_from(0), Ok(VmpFunction::CreateRegion));
        assert_eq!(VmpFunction::try_from(1), Ok(VmpFunction::ModifyRegion));
        assert_eq!(VmpFunction::try_from(2), Ok(VmpFunction::SaveClearContext));
        assert_eq!(VmpFunction::try_from(3), Ok(VmpFunction::RestoreContext));
        assert_eq!(VmpFunction::try_from(4), Ok(VmpFunction::DestroyRegion));
        assert_eq!(VmpFunction::try_from(5), Err(VmpError::Unsupported));
    }

    #[test]
    fn unknown_function_is_unsupported() {
        let mut alloc = setup();
        assert_eq!(call(&mut alloc, &mut [], 42, [0; 3]), -2);
        assert_eq!(*alloc.registers(), RegisterFile::zeroed());
    }

    #[test]
    fn create_takes_start_and_size() {
        let mut alloc = setup();
        assert_eq!(call(&mut alloc, &mut [], CREATE_REGION, [0x1000, 0x1000, 0x3]), 0);
        let region = alloc.query(0x1000, 0x2000).unwrap();
        assert!(region.active);
        assert_eq!((region.start, region.end), (0x1000, 0x2000));
        assert_eq!(region.perm, Perm::RW);
    }

    #[test]
    fn create_aligns_and_masks_arguments() {
        let mut alloc = setup();
        assert_eq!(call(&mut alloc, &mut [], CREATE_REGION, [0x1003, 0x1000, 0xff]), 0);
        let region = alloc.view().regions()[0];
        assert_eq!((region.start, region.end), (0x1000, 0x2000));
        assert_eq!(region.perm, Perm::all());
    }

    #[test]
    fn create_rejects_overflowing_size() {
        let mut alloc = setup();
        assert_eq!(
            call(&mut alloc, &mut [], CREATE_REGION, [0x1000, usize::MAX, 0x7]),
            VmpError::InvalidRange.code()
        );
    }

    #[test]
    fn modify_then_destroy() {
        let mut alloc = setup();
        call(&mut alloc, &mut [], CREATE_REGION, [0, 0x1000, 0x7]);
        assert_eq!(call(&mut alloc, &mut [], MODIFY_REGION, [0, 0x1000, 0x1]), 0);
        assert_eq!(alloc.range_permissions(0, 0x1000), Perm::R);

        // Destroy takes an end address, not a size.
        assert_eq!(call(&mut alloc, &mut [], DESTROY_REGION, [0, 0x1000, 0]), 0);
        assert_eq!(alloc.active_regions(), 0);
        assert_eq!(
            call(&mut alloc, &mut [], DESTROY_REGION, [0, 0x1000, 0]),
            VmpError::NotFound.code()
        );
    }

    #[test]
    fn error_codes_reach_the_caller() {
        let mut alloc = setup();
        call(&mut alloc, &mut [], CREATE_REGION, [0, 0x1000, 0x3]);
        assert_eq!(
            call(&mut alloc, &mut [], CREATE_REGION, [0x100, 0x100, 0x1]),
            VmpError::RestrictedTarget.code()
        );
        assert_eq!(
            call(&mut alloc, &mut [], MODIFY_REGION, [0, 0x800, 0x1]),
            VmpError::NotFound.code()
        );
    }

    #[test]
    fn context_save_and_restore_through_caller_buffer() {
        let mut alloc = setup();
        call(&mut alloc, &mut [], CREATE_REGION, [0x2000, 0x2000, 0x5]);
        let before = *alloc.registers();

        let mut bytes = [0u8; RegisterFile::SIZE];
        let written = call(
            &mut alloc,
            &mut bytes,
            SAVE_CLEAR_CONTEXT,
            [BUF_BASE, RegisterFile::SIZE, 0],
        );
        assert_eq!(written, isize::try_from(RegisterFile::SIZE).unwrap());
        assert_eq!(*alloc.registers(), RegisterFile::zeroed());

        assert_eq!(
            call(&mut alloc, &mut bytes, RESTORE_CONTEXT, [BUF_BASE, RegisterFile::SIZE, 0]),
            0
        );
        assert_eq!(*alloc.registers(), before);
    }

    #[test]
    fn context_calls_check_buffers() {
        let mut alloc = setup();
        call(&mut alloc, &mut [], CREATE_REGION, [0, 0x1000, 0x7]);
        let before = *alloc.registers();

        let mut bytes = [0u8; RegisterFile::SIZE];
        assert_eq!(
            call(&mut alloc, &mut bytes, SAVE_CLEAR_CONTEXT, [BUF_BASE, 16, 0]),
            VmpError::BufferTooSmall.code()
        );
        assert_eq!(
            call(
                &mut alloc,
                &mut bytes,
                SAVE_CLEAR_CONTEXT,
                [BUF_BASE + 8, RegisterFile::SIZE, 0]
            ),
            VmpError::InvalidRange.code()
        );
        assert_eq!(
            call(&mut alloc, &mut bytes, RESTORE_CONTEXT, [BUF_BASE, 8, 0]),
            VmpError::BufferTooSmall.code()
        );
        assert_eq!(*alloc.registers(), before);
    }
}
