//! Configuration types deserialized from `overdrive.toml`.

use overdrive_common::TimeUnit;
use serde::Deserialize;

/// The top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverdriveConfig {
    /// Kernel settings from the `[simulation]` table.
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Settings that shape how the simulation kernel evaluates a design.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Unit applied when a testbench advances time without naming one.
    pub time_unit: TimeUnit,
    /// Upper bound on delta cycles within one time step before the kernel
    /// reports a combinational loop.
    pub max_deltas: u32,
    /// Power-on value of logic signals declared without an explicit initial value.
    pub initial_value: InitialValue,
    /// What forcing a signal with several driving processes does.
    pub multi_driver_force: MultiDriverForcePolicy,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            time_unit: TimeUnit::Ns,
            max_deltas: 10_000,
            initial_value: InitialValue::Zero,
            multi_driver_force: MultiDriverForcePolicy::Allow,
        }
    }
}

/// Power-on state for bit and vector signals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitialValue {
    /// Every bit starts at `0`.
    #[default]
    Zero,
    /// Every bit starts unknown.
    X,
}

/// Policy for forcing a net that more than one process drives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MultiDriverForcePolicy {
    /// The force overrides every driver.
    #[default]
    Allow,
    /// The force is refused with an error.
    Reject,
}
