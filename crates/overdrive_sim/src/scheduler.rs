//! Time-stepped evaluation: timed event queue and the delta-cycle loop.
//!
//! [`EventScheduler`] owns simulated time. Each call to
//! [`advance`](EventScheduler::advance) flushes the writes queued in the
//! [`DriverOverlay`] at the current time, settles the design, then walks the
//! timed events (clock edges, scheduled writes) up to the target time,
//! settling after each batch.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap};

use overdrive_common::{LogicVec, SimDuration};
use tracing::{debug, trace};

use crate::codec;
use crate::error::SimError;
use crate::hierarchy::{Hierarchy, SignalId, Trigger};
use crate::overlay::DriverOverlay;
use crate::time::SimTime;
use crate::value::{resolve_drivers, Value};

#[derive(Debug, Clone)]
enum EventKind {
    /// Drive a clock to `level`, then schedule the opposite level.
    ClockEdge {
        signal: SignalId,
        level: bool,
        half_period: u64,
        generation: u64,
    },
    /// A normal write that becomes pending at its time.
    Write { signal: SignalId, value: Value },
}

#[derive(Debug, Clone)]
struct TimedEvent {
    fs: u64,
    /// Insertion order; keeps events at one timestamp FIFO.
    seq: u64,
    kind: EventKind,
}

impl PartialEq for TimedEvent {
    fn eq(&self, other: &Self) -> bool {
        self.fs == other.fs && self.seq == other.seq
    }
}

impl Eq for TimedEvent {}

impl PartialOrd for TimedEvent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimedEvent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.fs.cmp(&other.fs).then(self.seq.cmp(&other.seq))
    }
}

#[derive(Debug, Clone)]
struct ClockGen {
    generation: u64,
    low: Value,
    high: Value,
}

/// Advances simulated time and settles the design between steps.
#[derive(Debug)]
pub struct EventScheduler {
    now: SimTime,
    /// Min-heap of timed events.
    queue: BinaryHeap<Reverse<TimedEvent>>,
    next_seq: u64,
    /// Active clock generator per signal; stale edges carry an old generation.
    clocks: HashMap<SignalId, ClockGen>,
    next_generation: u64,
    /// Last value produced by each process, indexed like `Hierarchy::processes`.
    contributions: Vec<Option<LogicVec>>,
    max_deltas: u32,
    /// Delta cycles run at `now.fs`, across every batch settled there.
    step_deltas: u32,
    total_deltas: u64,
}

impl EventScheduler {
    /// Creates a scheduler at time zero for a design with `process_count`
    /// processes.
    pub fn new(process_count: usize, max_deltas: u32) -> Self {
        Self {
            now: SimTime::zero(),
            queue: BinaryHeap::new(),
            next_seq: 0,
            clocks: HashMap::new(),
            next_generation: 0,
            contributions: vec![None; process_count],
            max_deltas,
            step_deltas: 0,
            total_deltas: 0,
        }
    }

    /// The current simulation time.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Total delta cycles executed since construction.
    pub fn total_deltas(&self) -> u64 {
        self.total_deltas
    }

    /// Maximum delta cycles allowed in one time step.
    pub fn max_deltas(&self) -> u32 {
        self.max_deltas
    }

    /// Number of timed events still queued, including stale clock edges.
    pub fn queued_events(&self) -> usize {
        self.queue.len()
    }

    /// Runs every combinational process once and settles, giving each driven
    /// signal its natural power-on value.
    pub fn initialize(&mut self, h: &Hierarchy, ov: &mut DriverOverlay) -> Result<(), SimError> {
        let rerun = h
            .processes()
            .iter()
            .enumerate()
            .filter(|(_, p)| p.trigger() == Trigger::Combinational)
            .map(|(idx, _)| idx)
            .collect();
        self.settle(h, ov, BTreeMap::new(), rerun)
    }

    /// Moves time forward by `duration_fs` femtoseconds.
    ///
    /// Writes queued before the call are applied at the current time; timed
    /// events up to and including the target time are then processed in
    /// order. Returns the new time.
    ///
    /// Fails with [`SimError::TimeOverflow`] before touching any state if the
    /// target time is not representable.
    pub fn advance(
        &mut self,
        duration_fs: u64,
        h: &Hierarchy,
        ov: &mut DriverOverlay,
    ) -> Result<SimTime, SimError> {
        let target = self.offset(duration_fs)?;
        self.step(h, ov)?;
        while let Some(fs) = self.next_event_fs().filter(|&fs| fs <= target) {
            self.move_to(fs);
            self.fire_due(fs, ov);
            self.step(h, ov)?;
        }
        self.move_to(target);
        Ok(self.now)
    }

    /// Starts a 50% duty-cycle clock on `signal` toggling between `low` and
    /// `high`, beginning high at the current time. A clock already running on
    /// the signal is replaced.
    pub fn start_clock(&mut self, signal: SignalId, half_period_fs: u64, low: Value, high: Value) {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.clocks.insert(
            signal,
            ClockGen {
                generation,
                low,
                high,
            },
        );
        self.push(
            self.now.fs,
            EventKind::ClockEdge {
                signal,
                level: true,
                half_period: half_period_fs,
                generation,
            },
        );
    }

    /// Stops the clock on `signal`. Returns `false` if none was running.
    pub fn stop_clock(&mut self, signal: SignalId) -> bool {
        self.clocks.remove(&signal).is_some()
    }

    /// Queues a normal write to become pending `delay_fs` from now.
    pub fn schedule_write(
        &mut self,
        signal: SignalId,
        value: Value,
        delay_fs: u64,
    ) -> Result<(), SimError> {
        let fs = self.offset(delay_fs)?;
        self.push(fs, EventKind::Write { signal, value });
        Ok(())
    }

    /// The timestamp `delta_fs` after now.
    fn offset(&self, delta_fs: u64) -> Result<u64, SimError> {
        self.now
            .fs
            .checked_add(delta_fs)
            .ok_or_else(|| SimError::TimeOverflow {
                now_fs: self.now.fs,
                by: SimDuration::from_fs(delta_fs).to_string(),
            })
    }

    /// Moves to `fs`; the per-step delta budget restarts only at a new timestamp.
    fn move_to(&mut self, fs: u64) {
        if fs != self.now.fs {
            self.step_deltas = 0;
        }
        self.now = self.now.advance_to(fs);
    }

    fn push(&mut self, fs: u64, kind: EventKind) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Reverse(TimedEvent { fs, seq, kind }));
    }

    fn next_event_fs(&self) -> Option<u64> {
        self.queue.peek().map(|Reverse(evt)| evt.fs)
    }

    /// Turns every event at `fs` into a pending write.
    fn fire_due(&mut self, fs: u64, ov: &mut DriverOverlay) {
        while let Some(Reverse(evt)) = self.queue.peek() {
            if evt.fs != fs {
                break;
            }
            let Some(Reverse(evt)) = self.queue.pop() else {
                break;
            };
            match evt.kind {
                EventKind::ClockEdge {
                    signal,
                    level,
                    half_period,
                    generation,
                } => {
                    let Some(clock) = self.clocks.get(&signal) else {
                        continue;
                    };
                    if clock.generation != generation {
                        continue;
                    }
                    let value = if level { &clock.high } else { &clock.low };
                    ov.queue(signal, value.clone());
                    // A clock whose next edge is past the end of time stops.
                    if let Some(next) = fs.checked_add(half_period) {
                        self.push(
                            next,
                            EventKind::ClockEdge {
                                signal,
                                level: !level,
                                half_period,
                                generation,
                            },
                        );
                    }
                }
                EventKind::Write { signal, value } => {
                    debug!(signal = signal.as_raw(), %value, fs, "scheduled write due");
                    ov.queue(signal, value);
                }
            }
        }
    }

    /// Applies the overlay's flush and settles.
    fn step(&mut self, h: &Hierarchy, ov: &mut DriverOverlay) -> Result<(), SimError> {
        let flush = ov.take_flush();
        let mut changes = flush.forced_changes;
        let mut rerun = BTreeSet::new();
        let written: BTreeSet<SignalId> = flush.writes.iter().map(|(id, _)| *id).collect();

        for id in flush.released {
            if let Some(prev) = ov.restore_driven(id) {
                changes.entry(id).or_insert(prev);
            }
            if written.contains(&id) {
                continue;
            }
            rerun.extend(
                h.drivers(id)
                    .iter()
                    .copied()
                    .filter(|&p| h.processes()[p].trigger() == Trigger::Combinational),
            );
        }
        for (id, value) in flush.writes {
            if let Some(prev) = ov.drive(id, value) {
                changes.entry(id).or_insert(prev);
            }
        }
        self.settle(h, ov, changes, rerun)
    }

    /// Runs delta cycles until no process is woken.
    ///
    /// `changes` maps each changed signal to its value before the change;
    /// `rerun` lists processes to evaluate regardless of their inputs.
    fn settle(
        &mut self,
        h: &Hierarchy,
        ov: &mut DriverOverlay,
        mut changes: BTreeMap<SignalId, Value>,
        mut rerun: BTreeSet<usize>,
    ) -> Result<(), SimError> {
        loop {
            let mut woken = std::mem::take(&mut rerun);
            for (&id, prev) in &changes {
                let curr = ov.settled(id);
                for &p in h.fanout(id) {
                    let wake = match h.processes()[p].trigger() {
                        Trigger::Combinational => true,
                        Trigger::Sequential { clock, edge } => {
                            clock == id && edge.matches(prev.bits().get(0), curr.bits().get(0))
                        }
                    };
                    if wake {
                        woken.insert(p);
                    }
                }
            }
            if woken.is_empty() {
                return Ok(());
            }
            if self.step_deltas >= self.max_deltas {
                return Err(SimError::DeltaCycleLimit {
                    fs: self.now.fs,
                    max_deltas: self.max_deltas,
                });
            }
            self.step_deltas += 1;
            self.total_deltas += 1;
            self.now = self.now.next_delta();

            // Every woken process sees the values settled by the previous delta.
            let mut results = Vec::with_capacity(woken.len());
            for &p in &woken {
                let process = &h.processes()[p];
                let decl = h.decl(process.target()).ok_or_else(|| SimError::UnknownSignal {
                    path: format!("#{}", process.target().as_raw()),
                })?;
                let inputs: Vec<&Value> = process.inputs().iter().map(|&i| ov.settled(i)).collect();
                let value = codec::encode(decl.kind, decl.width, process.evaluate(&inputs))?;
                results.push((p, value));
            }

            let mut targets = BTreeSet::new();
            for (p, value) in results {
                targets.insert(h.processes()[p].target());
                self.contributions[p] = Some(value.into_bits());
            }

            changes = BTreeMap::new();
            for target in targets {
                let resolved = self.resolved(h, target)?;
                if let Some(prev) = ov.drive(target, resolved) {
                    changes.insert(target, prev);
                }
            }
            trace!(time = %self.now, woken = woken.len(), changed = changes.len(), "delta cycle");
        }
    }

    /// Resolves the contributions of every process driving `target`.
    fn resolved(&self, h: &Hierarchy, target: SignalId) -> Result<Value, SimError> {
        let decl = h.decl(target).ok_or_else(|| SimError::UnknownSignal {
            path: format!("#{}", target.as_raw()),
        })?;
        let contributions: Vec<&LogicVec> = h
            .drivers(target)
            .iter()
            .filter_map(|&p| self.contributions[p].as_ref())
            .collect();
        let bits = resolve_drivers(&contributions, decl.width);
        Ok(Value::from_parts(decl.kind, bits))
    }
}
