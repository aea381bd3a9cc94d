//! Per-signal force/release state and the buffers between test writes and
//! the settled values the scheduler publishes.
//!
//! Each signal carries three values:
//!
//! - *settled*: what a read observes, updated only by a force or by a
//!   completed evaluation step;
//! - *driven*: what the normal drivers (test writes or processes) currently
//!   produce, tracked even while the signal is forced;
//! - an optional *pending* normal write, applied at the next step flush
//!   unless the signal is forced.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::hierarchy::SignalId;
use crate::value::Value;

/// Override state of one signal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OverrideState {
    /// Normal driver propagation.
    Normal,
    /// Pinned to `value` until released.
    Forced {
        /// The value every read observes.
        value: Value,
    },
}

/// Result of a force request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ForceTransition {
    /// The signal moved from `Normal` to `Forced`.
    Entered,
    /// The signal was already forced; only the forced value changed.
    Updated,
}

#[derive(Clone, Debug)]
struct Slot {
    state: OverrideState,
    settled: Value,
    driven: Value,
}

/// Everything a step flush has to apply, in signal order.
#[derive(Debug, Default)]
pub(crate) struct Flush {
    /// Pending normal writes of signals that are not forced.
    pub writes: Vec<(SignalId, Value)>,
    /// Signals released since the previous flush.
    pub released: Vec<SignalId>,
    /// Signals whose settled value a force changed, with the value before it.
    pub forced_changes: BTreeMap<SignalId, Value>,
}

/// The force/release layer over every signal of a hierarchy.
#[derive(Debug)]
pub struct DriverOverlay {
    slots: Vec<Slot>,
    pending: BTreeMap<SignalId, Value>,
    released: BTreeSet<SignalId>,
    forced_changes: BTreeMap<SignalId, Value>,
}

impl DriverOverlay {
    /// Creates a `Normal` slot per signal, settled at its initial value.
    pub fn new(initial: Vec<Value>) -> Self {
        let slots = initial
            .into_iter()
            .map(|v| Slot {
                state: OverrideState::Normal,
                settled: v.clone(),
                driven: v,
            })
            .collect();
        Self {
            slots,
            pending: BTreeMap::new(),
            released: BTreeSet::new(),
            forced_changes: BTreeMap::new(),
        }
    }

    /// Number of signals covered.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if the overlay covers no signals.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The value a read observes.
    pub fn settled(&self, id: SignalId) -> &Value {
        &self.slots[id.index()].settled
    }

    /// What the normal drivers currently produce.
    pub fn driven(&self, id: SignalId) -> &Value {
        &self.slots[id.index()].driven
    }

    /// The override state.
    pub fn state(&self, id: SignalId) -> &OverrideState {
        &self.slots[id.index()].state
    }

    /// Returns `true` while the signal is forced.
    pub fn is_forced(&self, id: SignalId) -> bool {
        matches!(self.state(id), OverrideState::Forced { .. })
    }

    /// The normal write waiting for the next flush, if any.
    pub fn pending(&self, id: SignalId) -> Option<&Value> {
        self.pending.get(&id)
    }

    /// Queues a normal write. A later write before the flush replaces an
    /// earlier one, which is returned.
    pub fn queue(&mut self, id: SignalId, value: Value) -> Option<Value> {
        self.pending.insert(id, value)
    }

    /// Pins the signal to `value`. The new value is observable at once.
    ///
    /// Entering the forced state discards a normal write queued before it in
    /// the same step; writes queued while forced are kept for the release.
    pub fn force(&mut self, id: SignalId, value: Value) -> ForceTransition {
        self.released.remove(&id);
        let slot = &mut self.slots[id.index()];
        let transition = match slot.state {
            OverrideState::Normal => {
                self.pending.remove(&id);
                ForceTransition::Entered
            }
            OverrideState::Forced { .. } => ForceTransition::Updated,
        };
        if slot.settled != value {
            let previous = std::mem::replace(&mut slot.settled, value.clone());
            self.forced_changes.entry(id).or_insert(previous);
        }
        slot.state = OverrideState::Forced { value };
        transition
    }

    /// Returns the signal to normal propagation, yielding the forced value.
    ///
    /// The settled value keeps the forced value until the next flush. A
    /// signal that is not forced is left alone and `None` is returned.
    pub fn release(&mut self, id: SignalId) -> Option<Value> {
        let slot = &mut self.slots[id.index()];
        match std::mem::replace(&mut slot.state, OverrideState::Normal) {
            OverrideState::Normal => None,
            OverrideState::Forced { value } => {
                self.released.insert(id);
                Some(value)
            }
        }
    }

    /// Records a value produced by a normal driver.
    ///
    /// The driven value always updates. The settled value follows only when
    /// the signal is not forced; the previous settled value is returned if it
    /// changed.
    pub fn drive(&mut self, id: SignalId, value: Value) -> Option<Value> {
        let slot = &mut self.slots[id.index()];
        if matches!(slot.state, OverrideState::Forced { .. }) {
            slot.driven = value;
            return None;
        }
        slot.driven = value.clone();
        if slot.settled == value {
            return None;
        }
        Some(std::mem::replace(&mut slot.settled, value))
    }

    /// Publishes the driven value of a normal signal as its settled value,
    /// returning the previous settled value if it changed.
    pub fn restore_driven(&mut self, id: SignalId) -> Option<Value> {
        let slot = &mut self.slots[id.index()];
        if matches!(slot.state, OverrideState::Forced { .. }) || slot.settled == slot.driven {
            return None;
        }
        Some(std::mem::replace(&mut slot.settled, slot.driven.clone()))
    }

    /// Drains what the next step has to apply. Pending writes of forced
    /// signals stay queued until those signals are released.
    pub(crate) fn take_flush(&mut self) -> Flush {
        let (held, writes): (BTreeMap<SignalId, Value>, BTreeMap<SignalId, Value>) =
            std::mem::take(&mut self.pending)
                .into_iter()
                .partition(|(id, _)| self.is_forced(*id));
        self.pending = held;
        Flush {
            writes: writes.into_iter().collect(),
            released: std::mem::take(&mut self.released).into_iter().collect(),
            forced_changes: std::mem::take(&mut self.forced_changes),
        }
    }
}
