//! Shared foundational types for the Overdrive testbench simulator.
//!
//! This crate provides 4-state logic values, packed logic vectors with
//! byte-buffer conversion, interned signal paths, and simulation time units.

#![warn(missing_docs)]

pub mod ident;
pub mod logic;
pub mod logic_vec;
pub mod time_unit;

pub use ident::{Ident, Interner};
pub use logic::Logic;
pub use logic_vec::LogicVec;
pub use time_unit::{
    ParseTimeError, SimDuration, TimeUnit, FS_PER_MS, FS_PER_NS, FS_PER_PS, FS_PER_S, FS_PER_US,
};
