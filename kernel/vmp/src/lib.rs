//! Virtual Memory Protection (VMP) region manager.
//!
//! Maps a dynamic set of non-overlapping, independently-permissioned memory
//! regions onto a fixed file of top-of-range protection slots, and saves or
//! restores that file as a single context image.
//!
//! All operations are synchronous and allocation-free. The register file is
//! hart-local: callers keep interrupts masked around every call.

#![cfg_attr(not(test), no_std)]

pub mod cfg;
pub mod config;
pub mod context;
pub mod error;
pub mod query;
pub mod regfile;
pub mod region;
pub mod validate;
pub mod view;

pub use cfg::{AddrMode, ConfigSlot, Perm};
pub use config::VmpConfig;
pub use error::VmpError;
pub use regfile::{MmioRegisters, RegisterFile, VmpRegisters};
pub use region::RegionAllocator;
pub use view::{Region, RegionView};
