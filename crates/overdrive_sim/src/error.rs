//! Error types for the override layer and its time-stepped evaluation.
//!
//! Every fallible operation reports synchronously with a [`SimError`]. None of
//! these conditions is transient, so callers never retry.

use overdrive_config::ConfigError;

use crate::value::ValueKind;

/// Errors raised while building a hierarchy, driving signals, or advancing time.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// No signal is registered under the given path or handle.
    #[error("unknown signal '{path}'")]
    UnknownSignal {
        /// The path (or `#<index>` for a foreign handle) that failed to resolve.
        path: String,
    },

    /// A value cannot be represented at the declared width without truncation.
    #[error("value does not fit in {width} bit(s): {reason}")]
    WidthMismatch {
        /// Declared width of the destination.
        width: u32,
        /// What did not fit.
        reason: String,
    },

    /// A literal of the wrong shape was used for a signal kind.
    #[error("cannot encode {literal} as {kind}")]
    TypeMismatch {
        /// Destination kind.
        kind: ValueKind,
        /// Short description of the rejected literal.
        literal: &'static str,
    },

    /// Two declarations share one hierarchical path.
    #[error("signal '{path}' is declared twice")]
    DuplicateSignal {
        /// The duplicated path.
        path: String,
    },

    /// A declaration's width is not valid for its kind.
    #[error("invalid width {width} for {kind} signal: {reason}")]
    InvalidWidth {
        /// Declared kind.
        kind: ValueKind,
        /// Declared width.
        width: u32,
        /// Which constraint was violated.
        reason: &'static str,
    },

    /// A numeric view was requested of a value holding `X` or `Z` bits.
    #[error("value {value} has unresolved bits")]
    UnresolvedValue {
        /// Display form of the offending value.
        value: String,
    },

    /// A force targeted a net with several drivers while the policy rejects it.
    #[error("refusing to force '{path}': it has {drivers} drivers")]
    MultiDriverForce {
        /// Path of the multiply-driven signal.
        path: String,
        /// Number of driving processes.
        drivers: usize,
    },

    /// Too many delta cycles at one time step, indicating a combinational loop.
    #[error("delta cycle limit exceeded at {fs} fs (max {max_deltas} deltas)")]
    DeltaCycleLimit {
        /// Time in femtoseconds where the limit was hit.
        fs: u64,
        /// Configured maximum.
        max_deltas: u32,
    },

    /// A clock could not be started on the given signal.
    #[error("invalid clock on '{path}': {reason}")]
    InvalidClock {
        /// Path of the clock signal.
        path: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Moving time forward would pass the largest representable timestamp.
    #[error("time overflow: cannot move {by} past {now_fs} fs")]
    TimeOverflow {
        /// Current time in femtoseconds.
        now_fs: u64,
        /// The requested offset, with its unit.
        by: String,
    },

    /// Loading the simulation configuration failed.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
