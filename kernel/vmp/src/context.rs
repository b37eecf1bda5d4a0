//! Whole-file save and restore against a caller buffer.
//!
//! The serialized image is every address word (native endian) followed by
//! every config byte, [`RegisterFile::SIZE`] bytes in total.

use vmp_core::{kdebug, kwarn};

use crate::error::VmpError;
use crate::regfile::{RegisterFile, VmpRegisters};
use crate::validate::validate;

/// Copies the live register file into `buf`, then disables every slot.
///
/// Returns the number of bytes written. After a successful call the hart
/// holds no protection state.
///
/// # Errors
///
/// [`VmpError::BufferTooSmall`] if `buf` is shorter than
/// [`RegisterFile::SIZE`]; the registers are left untouched.
pub fn save_and_clear_context<R: VmpRegisters + ?Sized>(
    regs: &mut R,
    buf: &mut [u8],
) -> Result<usize, VmpError> {
    let written = regs
        .load()
        .write_to(buf)
        .ok_or(VmpError::BufferTooSmall)?;
    regs.store(&RegisterFile::zeroed());
    kdebug!("vmp: saved {} byte context, registers cleared", written);
    Ok(written)
}

/// Replaces the live register file with the image in `buf`.
///
/// The image is installed as-is, without merging with the live state. An
/// image that violates the register-file invariants is still installed but
/// logged.
///
/// # Errors
///
/// [`VmpError::BufferTooSmall`] if `buf` is shorter than
/// [`RegisterFile::SIZE`]; the registers are left untouched.
pub fn restore_context<R: VmpRegisters + ?Sized>(
    regs: &mut R,
    buf: &[u8],
) -> Result<(), VmpError> {
    let file = RegisterFile::read_from(buf).ok_or(VmpError::BufferTooSmall)?;
    if let Err(violation) = validate(&file) {
        kwarn!("vmp: restoring inconsistent context: {}", violation);
    }
    regs.store(&file);
    kdebug!("vmp: context restored");
    Ok(())
}
