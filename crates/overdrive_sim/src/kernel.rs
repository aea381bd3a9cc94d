//! The testbench-facing simulation kernel.
//!
//! [`SimKernel`] ties a frozen [`Hierarchy`] to its [`DriverOverlay`] and
//! [`EventScheduler`]. Test code resolves [`SignalHandle`]s once, issues
//! [`WriteMode`] requests and reads, and moves time with
//! [`advance`](SimKernel::advance). Every value change other than a force
//! becomes observable only at an advance.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use overdrive_common::{LogicVec, SimDuration, TimeUnit};
use overdrive_config::{load_config, InitialValue, MultiDriverForcePolicy, SimulationConfig};
use tracing::{debug, info};

use crate::codec;
use crate::error::SimError;
use crate::handle::{SignalHandle, WriteMode};
use crate::hierarchy::{Hierarchy, SignalDecl, SignalId};
use crate::overlay::{DriverOverlay, ForceTransition, OverrideState};
use crate::scheduler::EventScheduler;
use crate::time::SimTime;
use crate::value::{Literal, Value};

/// Source of per-kernel handle tokens.
static NEXT_KERNEL: AtomicU64 = AtomicU64::new(0);

/// A design under test with its override layer and simulated time.
#[derive(Debug)]
pub struct SimKernel {
    token: u64,
    hierarchy: Hierarchy,
    overlay: DriverOverlay,
    scheduler: EventScheduler,
    config: SimulationConfig,
}

impl SimKernel {
    /// Builds a kernel and settles the design at time zero.
    ///
    /// Signals without an explicit initial value start at zero, or at all-`X`
    /// for bit and vector signals when `config.initial_value` is `x`.
    pub fn new(hierarchy: Hierarchy, config: &SimulationConfig) -> Result<Self, SimError> {
        let initial = hierarchy
            .signals()
            .map(|(_, decl)| power_on_value(decl, config.initial_value))
            .collect::<Result<Vec<_>, _>>()?;
        let mut overlay = DriverOverlay::new(initial);
        let mut scheduler = EventScheduler::new(hierarchy.processes().len(), config.max_deltas);
        scheduler.initialize(&hierarchy, &mut overlay)?;
        info!(
            top = hierarchy.top(),
            signals = hierarchy.signal_count(),
            processes = hierarchy.processes().len(),
            "simulation kernel built"
        );
        Ok(Self {
            token: NEXT_KERNEL.fetch_add(1, Ordering::Relaxed),
            hierarchy,
            overlay,
            scheduler,
            config: config.clone(),
        })
    }

    /// Builds a kernel with the default settings.
    pub fn with_defaults(hierarchy: Hierarchy) -> Result<Self, SimError> {
        Self::new(hierarchy, &SimulationConfig::default())
    }

    /// Builds a kernel with the settings of `overdrive.toml` in `dir`.
    pub fn from_config_dir(hierarchy: Hierarchy, dir: &Path) -> Result<Self, SimError> {
        let config = load_config(dir)?;
        Self::new(hierarchy, &config.simulation)
    }

    /// Resolves a full or top-relative path to a handle.
    pub fn handle(&self, path: &str) -> Result<SignalHandle, SimError> {
        let id = self
            .hierarchy
            .lookup(path)
            .ok_or_else(|| SimError::UnknownSignal {
                path: path.to_string(),
            })?;
        let decl = self.decl(id)?;
        Ok(SignalHandle::new(self.token, id, decl.kind, decl.width))
    }

    /// Handles for every declared signal, in declaration order.
    pub fn handles(&self) -> impl Iterator<Item = SignalHandle> + '_ {
        self.hierarchy
            .signals()
            .map(|(id, decl)| SignalHandle::new(self.token, id, decl.kind, decl.width))
    }

    /// The settled value of a signal.
    pub fn read(&self, handle: SignalHandle) -> Result<Value, SimError> {
        let id = self.check(handle)?;
        Ok(self.overlay.settled(id).clone())
    }

    /// Reads a signal by path.
    pub fn read_path(&self, path: &str) -> Result<Value, SimError> {
        self.read(self.handle(path)?)
    }

    /// Applies a write request.
    ///
    /// A normal write is queued for the next advance, replacing any earlier
    /// queued write. A force takes effect at once. Releasing a signal that is
    /// not forced does nothing.
    pub fn write(&mut self, handle: SignalHandle, mode: WriteMode) -> Result<(), SimError> {
        let id = self.check(handle)?;
        match mode {
            WriteMode::Normal(literal) => {
                let value = self.encode(handle, literal)?;
                debug!(signal = %self.path(id), %value, "write queued");
                self.overlay.queue(id, value);
            }
            WriteMode::Force(literal) => {
                let value = self.encode(handle, literal)?;
                let drivers = self.hierarchy.drivers(id).len();
                if drivers > 1 && self.config.multi_driver_force == MultiDriverForcePolicy::Reject {
                    return Err(SimError::MultiDriverForce {
                        path: self.path(id).to_string(),
                        drivers,
                    });
                }
                let transition = self.overlay.force(id, value.clone());
                match transition {
                    ForceTransition::Entered => debug!(signal = %self.path(id), %value, "forced"),
                    ForceTransition::Updated => {
                        debug!(signal = %self.path(id), %value, "forced value replaced")
                    }
                }
            }
            WriteMode::Release => match self.overlay.release(id) {
                Some(value) => debug!(signal = %self.path(id), forced = %value, "released"),
                None => debug!(signal = %self.path(id), "release of unforced signal ignored"),
            },
        }
        Ok(())
    }

    /// Applies a write request to a signal given by path.
    pub fn write_path(&mut self, path: &str, mode: WriteMode) -> Result<(), SimError> {
        let handle = self.handle(path)?;
        self.write(handle, mode)
    }

    /// Returns `true` while the signal is forced.
    pub fn is_forced(&self, handle: SignalHandle) -> Result<bool, SimError> {
        let id = self.check(handle)?;
        Ok(self.overlay.is_forced(id))
    }

    /// The signal's override state.
    pub fn override_state(&self, handle: SignalHandle) -> Result<&OverrideState, SimError> {
        let id = self.check(handle)?;
        Ok(self.overlay.state(id))
    }

    /// The normal write queued for the signal, if any.
    pub fn pending(&self, handle: SignalHandle) -> Result<Option<&Value>, SimError> {
        let id = self.check(handle)?;
        Ok(self.overlay.pending(id))
    }

    /// Encodes `literal` for the signal behind `handle`.
    pub fn encode(
        &self,
        handle: SignalHandle,
        literal: impl Into<Literal>,
    ) -> Result<Value, SimError> {
        codec::encode(handle.kind(), handle.width(), literal)
    }

    /// Advances time by `amount` of `unit`.
    pub fn advance(&mut self, amount: u64, unit: TimeUnit) -> Result<SimTime, SimError> {
        let duration = self.duration(amount, unit)?;
        self.advance_by(duration)
    }

    /// Advances time by `amount` of the configured default unit.
    pub fn advance_default(&mut self, amount: u64) -> Result<SimTime, SimError> {
        self.advance(amount, self.config.time_unit)
    }

    /// Advances time by `duration`.
    pub fn advance_by(&mut self, duration: SimDuration) -> Result<SimTime, SimError> {
        let now = self
            .scheduler
            .advance(duration.as_fs(), &self.hierarchy, &mut self.overlay)?;
        debug!(time = %now, "advanced");
        Ok(now)
    }

    /// Starts a 50% duty-cycle clock on a 1-bit signal, high for the first
    /// half period beginning at the current time.
    ///
    /// Clock edges are normal writes, so a forced clock holds its forced level.
    pub fn start_clock(
        &mut self,
        handle: SignalHandle,
        period: u64,
        unit: TimeUnit,
    ) -> Result<(), SimError> {
        let id = self.check(handle)?;
        let invalid = |reason| SimError::InvalidClock {
            path: self.path(id).to_string(),
            reason,
        };
        if handle.width() != 1 {
            return Err(invalid("clocks must be 1 bit wide"));
        }
        let period_fs = self.duration(period, unit)?.as_fs();
        if period_fs < 2 || period_fs % 2 != 0 {
            return Err(invalid("period must be an even number of femtoseconds, at least 2"));
        }
        let low = self.encode(handle, false)?;
        let high = self.encode(handle, true)?;
        self.scheduler.start_clock(id, period_fs / 2, low, high);
        debug!(
            signal = %self.path(id),
            period = %SimDuration::from_fs(period_fs),
            "clock started"
        );
        Ok(())
    }

    /// Stops the clock on a signal, leaving it at its current level. Returns
    /// `false` if no clock was running.
    pub fn stop_clock(&mut self, handle: SignalHandle) -> Result<bool, SimError> {
        let id = self.check(handle)?;
        let stopped = self.scheduler.stop_clock(id);
        debug!(signal = %self.path(id), stopped, "clock stop");
        Ok(stopped)
    }

    /// Queues a normal write that becomes pending `delay` from now.
    pub fn schedule_write(
        &mut self,
        handle: SignalHandle,
        literal: impl Into<Literal>,
        delay: SimDuration,
    ) -> Result<(), SimError> {
        let id = self.check(handle)?;
        let value = self.encode(handle, literal)?;
        self.scheduler.schedule_write(id, value.clone(), delay.as_fs())?;
        debug!(signal = %self.path(id), %value, %delay, "write scheduled");
        Ok(())
    }

    /// The current simulation time.
    pub fn current_time(&self) -> SimTime {
        self.scheduler.now()
    }

    /// Total delta cycles executed.
    pub fn total_deltas(&self) -> u64 {
        self.scheduler.total_deltas()
    }

    /// The design hierarchy.
    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    /// The settings the kernel was built with.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    fn duration(&self, amount: u64, unit: TimeUnit) -> Result<SimDuration, SimError> {
        SimDuration::new(amount, unit).ok_or_else(|| SimError::TimeOverflow {
            now_fs: self.scheduler.now().fs,
            by: format!("{amount} {unit}"),
        })
    }

    fn decl(&self, id: SignalId) -> Result<&SignalDecl, SimError> {
        self.hierarchy
            .decl(id)
            .ok_or_else(|| SimError::UnknownSignal {
                path: format!("#{}", id.as_raw()),
            })
    }

    /// Rejects handles issued by another kernel.
    fn check(&self, handle: SignalHandle) -> Result<SignalId, SimError> {
        let id = handle.id();
        let decl = self.decl(id)?;
        if handle.kernel() != self.token
            || decl.kind != handle.kind()
            || decl.width != handle.width()
        {
            return Err(SimError::UnknownSignal {
                path: format!("#{}", id.as_raw()),
            });
        }
        Ok(id)
    }

    fn path(&self, id: SignalId) -> &str {
        self.hierarchy.decl(id).map_or("?", |d| d.path.as_str())
    }
}

fn power_on_value(decl: &SignalDecl, initial: InitialValue) -> Result<Value, SimError> {
    if let Some(init) = &decl.init {
        return Ok(init.clone());
    }
    match initial {
        InitialValue::X if decl.kind.is_logic() => {
            codec::encode(decl.kind, decl.width, LogicVec::all_x(decl.width))
        }
        _ => codec::encode(decl.kind, decl.width, 0u64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::HierarchyBuilder;
    use crate::value::ValueKind;
    use overdrive_common::Logic;

    /// `out = in` for an 8-bit vector plus a free-standing flag.
    fn passthrough() -> Hierarchy {
        let mut b = HierarchyBuilder::new("top");
        let i = b.signal("in", ValueKind::Vector, 8).unwrap();
        let o = b.signal("out", ValueKind::Vector, 8).unwrap();
        b.signal("flag", ValueKind::Bit, 1).unwrap();
        b.comb(o, &[i], |ins: &[&Value]| ins[0].clone()).unwrap();
        b.build()
    }

    fn kernel() -> SimKernel {
        SimKernel::with_defaults(passthrough()).unwrap()
    }

    #[test]
    fn unknown_path() {
        let k = kernel();
        assert!(matches!(
            k.handle("top.nope"),
            Err(SimError::UnknownSignal { path }) if path == "top.nope"
        ));
    }

    #[test]
    fn normal_write_visible_after_advance() {
        let mut k = kernel();
        let i = k.handle("in").unwrap();
        let o = k.handle("top.out").unwrap();
        k.write(i, WriteMode::Normal(7u8.into())).unwrap();
        assert_eq!(k.read(i).unwrap().to_u64().unwrap(), 0);
        assert_eq!(k.pending(i).unwrap().unwrap().to_u64().unwrap(), 7);
        k.advance(10, TimeUnit::Ns).unwrap();
        assert_eq!(k.read(o).unwrap().to_u64().unwrap(), 7);
        assert_eq!(k.current_time(), SimTime::from_fs(10_000_000));
    }

    #[test]
    fn force_is_visible_without_advance() {
        let mut k = kernel();
        let o = k.handle("out").unwrap();
        k.write(o, WriteMode::Force(0x5au8.into())).unwrap();
        assert_eq!(k.read(o).unwrap().to_u64().unwrap(), 0x5a);
        assert!(k.is_forced(o).unwrap());
        assert_eq!(
            k.override_state(o).unwrap(),
            &OverrideState::Forced {
                value: k.encode(o, 0x5au8).unwrap()
            }
        );
    }

    #[test]
    fn release_of_normal_signal_is_ignored() {
        let mut k = kernel();
        let f = k.handle("flag").unwrap();
        k.write(f, WriteMode::Release).unwrap();
        k.write(f, WriteMode::Release).unwrap();
        assert_eq!(k.override_state(f).unwrap(), &OverrideState::Normal);
    }

    #[test]
    fn oversized_write_rejected() {
        let mut k = kernel();
        let i = k.handle("in").unwrap();
        let err = k.write(i, WriteMode::Normal(256u64.into())).unwrap_err();
        assert!(matches!(err, SimError::WidthMismatch { width: 8, .. }));
        assert!(k.pending(i).unwrap().is_none());
    }

    #[test]
    fn foreign_handle_rejected() {
        let k = kernel();
        let mut b = HierarchyBuilder::new("other");
        for n in 0..5 {
            b.signal(&format!("s{n}"), ValueKind::Vector, 3).unwrap();
        }
        let other = SimKernel::with_defaults(b.build()).unwrap();
        let foreign = other.handle("s4").unwrap();
        assert!(matches!(k.read(foreign), Err(SimError::UnknownSignal { .. })));
    }

    #[test]
    fn handle_from_identical_kernel_rejected() {
        let mut a = kernel();
        let b = kernel();
        let twin = b.handle("in").unwrap();
        assert_eq!(twin.id(), a.handle("in").unwrap().id());
        assert!(matches!(a.read(twin), Err(SimError::UnknownSignal { .. })));
        assert!(a.write(twin, WriteMode::Force(1u8.into())).is_err());
        assert!(b.read(twin).is_ok());
    }

    #[test]
    fn x_power_on_for_logic_only() {
        let mut b = HierarchyBuilder::new("top");
        b.signal("v", ValueKind::Vector, 4).unwrap();
        b.signal("n", ValueKind::Integer { signed: false }, 8).unwrap();
        let config = SimulationConfig {
            initial_value: InitialValue::X,
            ..SimulationConfig::default()
        };
        let k = SimKernel::new(b.build(), &config).unwrap();
        assert_eq!(k.read_path("v").unwrap().bits().get(3), Logic::X);
        assert_eq!(k.read_path("n").unwrap().to_u64().unwrap(), 0);
    }

    #[test]
    fn clock_rejects_odd_period_and_wide_signal() {
        let mut k = kernel();
        let f = k.handle("flag").unwrap();
        let i = k.handle("in").unwrap();
        assert!(matches!(
            k.start_clock(f, 3, TimeUnit::Fs),
            Err(SimError::InvalidClock { .. })
        ));
        assert!(matches!(
            k.start_clock(i, 10, TimeUnit::Ns),
            Err(SimError::InvalidClock { .. })
        ));
        k.start_clock(f, 10, TimeUnit::Ns).unwrap();
        assert!(k.stop_clock(f).unwrap());
    }

    #[test]
    fn advance_default_uses_configured_unit() {
        let config = SimulationConfig {
            time_unit: TimeUnit::Us,
            ..SimulationConfig::default()
        };
        let mut k = SimKernel::new(passthrough(), &config).unwrap();
        k.advance_default(2).unwrap();
        assert_eq!(k.current_time().fs, 2_000_000_000);
    }

    #[test]
    fn handles_cover_every_signal() {
        let k = kernel();
        let widths: Vec<u32> = k.handles().map(|h| h.width()).collect();
        assert_eq!(widths, vec![8, 8, 1]);
    }
}
