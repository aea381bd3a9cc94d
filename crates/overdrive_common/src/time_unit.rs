//! Simulation time units and duration parsing (`"10ns"`, `"2 us"`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Femtoseconds per picosecond.
pub const FS_PER_PS: u64 = 1_000;
/// Femtoseconds per nanosecond.
pub const FS_PER_NS: u64 = 1_000_000;
/// Femtoseconds per microsecond.
pub const FS_PER_US: u64 = 1_000_000_000;
/// Femtoseconds per millisecond.
pub const FS_PER_MS: u64 = 1_000_000_000_000;
/// Femtoseconds per second.
pub const FS_PER_S: u64 = 1_000_000_000_000_000;

/// A symbolic simulation time unit. Femtoseconds are the kernel's resolution.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    /// Femtoseconds.
    Fs,
    /// Picoseconds.
    Ps,
    /// Nanoseconds.
    #[default]
    Ns,
    /// Microseconds.
    Us,
    /// Milliseconds.
    Ms,
    /// Seconds.
    S,
}

impl TimeUnit {
    /// Femtoseconds in one of this unit.
    pub fn fs_per_unit(self) -> u64 {
        match self {
            TimeUnit::Fs => 1,
            TimeUnit::Ps => FS_PER_PS,
            TimeUnit::Ns => FS_PER_NS,
            TimeUnit::Us => FS_PER_US,
            TimeUnit::Ms => FS_PER_MS,
            TimeUnit::S => FS_PER_S,
        }
    }

    /// Converts `amount` of this unit to femtoseconds, `None` on overflow.
    pub fn to_fs(self, amount: u64) -> Option<u64> {
        amount.checked_mul(self.fs_per_unit())
    }

    fn suffix(self) -> &'static str {
        match self {
            TimeUnit::Fs => "fs",
            TimeUnit::Ps => "ps",
            TimeUnit::Ns => "ns",
            TimeUnit::Us => "us",
            TimeUnit::Ms => "ms",
            TimeUnit::S => "s",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Error returned when a time unit or duration string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time '{input}': {reason}")]
pub struct ParseTimeError {
    /// The rejected input.
    pub input: String,
    /// What was wrong with it.
    pub reason: &'static str,
}

impl FromStr for TimeUnit {
    type Err = ParseTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fs" => Ok(TimeUnit::Fs),
            "ps" => Ok(TimeUnit::Ps),
            "ns" => Ok(TimeUnit::Ns),
            "us" => Ok(TimeUnit::Us),
            "ms" => Ok(TimeUnit::Ms),
            "s" | "sec" => Ok(TimeUnit::S),
            _ => Err(ParseTimeError {
                input: s.to_string(),
                reason: "unknown unit",
            }),
        }
    }
}

/// A span of simulated time in femtoseconds.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default, Serialize, Deserialize)]
pub struct SimDuration {
    fs: u64,
}

impl SimDuration {
    /// A duration of exactly `fs` femtoseconds.
    pub fn from_fs(fs: u64) -> Self {
        Self { fs }
    }

    /// `amount` of `unit`, or `None` if that does not fit in `u64`
    /// femtoseconds.
    pub fn new(amount: u64, unit: TimeUnit) -> Option<Self> {
        unit.to_fs(amount).map(Self::from_fs)
    }

    /// Length in femtoseconds.
    pub fn as_fs(self) -> u64 {
        self.fs
    }
}

impl FromStr for SimDuration {
    type Err = ParseTimeError;

    /// Parses `<integer><unit>` with optional whitespace between the parts.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = |reason| ParseTimeError {
            input: s.to_string(),
            reason,
        };
        let digit_end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        if digit_end == 0 {
            return Err(err("missing number"));
        }
        let amount: u64 = s[..digit_end].parse().map_err(|_| err("number too large"))?;
        let unit_str = s[digit_end..].trim();
        if unit_str.is_empty() {
            return Err(err("missing unit"));
        }
        let unit: TimeUnit = unit_str.parse().map_err(|_| err("unknown unit"))?;
        unit.to_fs(amount)
            .map(SimDuration::from_fs)
            .ok_or_else(|| err("duration overflows femtoseconds"))
    }
}

impl fmt::Display for SimDuration {
    /// Uses the largest unit that divides the duration exactly.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = [
            TimeUnit::S,
            TimeUnit::Ms,
            TimeUnit::Us,
            TimeUnit::Ns,
            TimeUnit::Ps,
        ]
        .into_iter()
        .find(|u| self.fs != 0 && self.fs % u.fs_per_unit() == 0)
        .unwrap_or(TimeUnit::Fs);
        write!(f, "{} {unit}", self.fs / unit.fs_per_unit())
    }
}
