//! Force/release override layer for time-stepped HDL testbench simulation.
//!
//! A testbench resolves signals of a design under test to handles, writes
//! values to them in one of three modes (normal, force, release), and moves
//! simulated time forward. Forced signals hold their forced value whatever
//! their drivers compute; releasing hands them back to normal propagation at
//! the next time step.
//!
//! # Architecture
//!
//! The design is described by a [`Hierarchy`] of typed signals and the
//! combinational and sequential processes that drive them. [`SimKernel`]
//! pairs it with a [`DriverOverlay`] holding each signal's override state
//! and an [`EventScheduler`] that flushes queued writes and runs delta
//! cycles at every step.
//!
//! # Usage
//!
//! ```ignore
//! use overdrive_common::TimeUnit;
//! use overdrive_sim::{HierarchyBuilder, SimKernel, Value, ValueKind, WriteMode};
//!
//! let mut b = HierarchyBuilder::new("dut");
//! let a = b.signal("a", ValueKind::Vector, 8)?;
//! let y = b.signal("y", ValueKind::Vector, 8)?;
//! b.comb(y, &[a], |ins: &[&Value]| ins[0].clone())?;
//! let mut sim = SimKernel::with_defaults(b.build())?;
//!
//! let y = sim.handle("dut.y")?;
//! sim.write(y, WriteMode::Force(0x5au8.into()))?;
//! sim.advance(10, TimeUnit::Ns)?;
//! assert_eq!(sim.read(y)?.to_u64()?, 0x5a);
//! ```
//!
//! # Modules
//!
//! - `error`: simulation error types
//! - `time`: femtosecond time with delta cycles
//! - `value`: signal kinds, canonical values, literals, driver resolution
//! - `codec`: literal encoding and value decoding
//! - `hierarchy`: signal registry and driving processes
//! - `handle`: signal handles and write modes
//! - `overlay`: per-signal force/release state
//! - `scheduler`: timed events and the delta-cycle loop
//! - `kernel`: the testbench-facing facade

#![warn(missing_docs)]

pub mod codec;
pub mod error;
pub mod handle;
pub mod hierarchy;
pub mod kernel;
pub mod overlay;
pub mod scheduler;
pub mod time;
pub mod value;

pub use codec::{decode, encode, Decoded};
pub use error::SimError;
pub use handle::{SignalHandle, WriteMode};
pub use hierarchy::{Edge, Hierarchy, HierarchyBuilder, Process, SignalDecl, SignalId, Trigger};
pub use kernel::SimKernel;
pub use overlay::{DriverOverlay, ForceTransition, OverrideState};
pub use scheduler::EventScheduler;
pub use time::SimTime;
pub use value::{resolve_drivers, Literal, Value, ValueKind};
