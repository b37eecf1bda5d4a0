//! Core support library for the VMP firmware crates: logging and address
//! arithmetic shared by the region manager and its call dispatcher.

#![cfg_attr(not(test), no_std)]

pub mod addr;
pub mod log;
