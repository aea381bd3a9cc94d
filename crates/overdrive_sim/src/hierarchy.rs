//! The static signal registry of a design under test and its driving processes.
//!
//! A [`HierarchyBuilder`] collects signal declarations and the evaluation
//! functions that compute each signal's natural (un-forced) value. Paths are
//! interned and mapped to dense [`SignalId`]s once, when the hierarchy is
//! built; every later access is an index into a vector.

use std::collections::HashMap;
use std::fmt;

use overdrive_common::{Ident, Interner, Logic};
use serde::{Deserialize, Serialize};

use crate::codec;
use crate::error::SimError;
use crate::value::{Literal, Value, ValueKind};

/// Dense index of a declared signal.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct SignalId(u32);

impl SignalId {
    /// Creates a `SignalId` from a raw index.
    pub const fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    pub fn as_raw(self) -> u32 {
        self.0
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// One declared signal.
#[derive(Clone, Debug)]
pub struct SignalDecl {
    /// Full hierarchical path, e.g. `sample_module.stream_in_data`.
    pub path: String,
    /// Interned form of `path`.
    pub name: Ident,
    /// Declared kind.
    pub kind: ValueKind,
    /// Declared width in bits.
    pub width: u32,
    /// Explicit power-on value, if any.
    pub init: Option<Value>,
}

/// Clock edge that wakes a sequential process.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Edge {
    /// `0 -> 1`.
    Posedge,
    /// `1 -> 0`.
    Negedge,
    /// Either transition.
    Both,
}

impl Edge {
    /// Whether the transition `prev -> curr` is this edge. Transitions to or
    /// from `X`/`Z` never count.
    pub fn matches(self, prev: Logic, curr: Logic) -> bool {
        let rising = prev == Logic::Zero && curr == Logic::One;
        let falling = prev == Logic::One && curr == Logic::Zero;
        match self {
            Edge::Posedge => rising,
            Edge::Negedge => falling,
            Edge::Both => rising || falling,
        }
    }
}

/// What wakes a process.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Trigger {
    /// Any change of any input.
    Combinational,
    /// An edge on a one-bit clock; inputs are sampled, not watched.
    Sequential {
        /// The clock signal.
        clock: SignalId,
        /// The edge to react to.
        edge: Edge,
    },
}

type EvalFn = Box<dyn Fn(&[&Value]) -> Literal>;

/// An evaluation function driving one signal from the settled values of its inputs.
pub struct Process {
    target: SignalId,
    inputs: Vec<SignalId>,
    trigger: Trigger,
    eval: EvalFn,
}

impl Process {
    /// The driven signal.
    pub fn target(&self) -> SignalId {
        self.target
    }

    /// The signals read by the evaluation function, in argument order.
    pub fn inputs(&self) -> &[SignalId] {
        &self.inputs
    }

    /// What wakes this process.
    pub fn trigger(&self) -> Trigger {
        self.trigger
    }

    /// Runs the evaluation function.
    pub fn evaluate(&self, inputs: &[&Value]) -> Literal {
        (self.eval)(inputs)
    }
}

impl fmt::Debug for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Process")
            .field("target", &self.target)
            .field("inputs", &self.inputs)
            .field("trigger", &self.trigger)
            .finish_non_exhaustive()
    }
}

/// Collects declarations and processes, then freezes them into a [`Hierarchy`].
#[derive(Debug)]
pub struct HierarchyBuilder {
    top: String,
    interner: Interner,
    by_name: HashMap<Ident, SignalId>,
    signals: Vec<SignalDecl>,
    processes: Vec<Process>,
}

impl HierarchyBuilder {
    /// Starts a hierarchy whose signals live under the `top` scope.
    pub fn new(top: &str) -> Self {
        Self {
            top: top.to_string(),
            interner: Interner::new(),
            by_name: HashMap::new(),
            signals: Vec::new(),
            processes: Vec::new(),
        }
    }

    /// Declares `top.<name>`.
    pub fn signal(&mut self, name: &str, kind: ValueKind, width: u32) -> Result<SignalId, SimError> {
        self.declare(name, kind, width, None)
    }

    /// Declares `top.<name>` with an explicit power-on value.
    pub fn signal_with_init(
        &mut self,
        name: &str,
        kind: ValueKind,
        width: u32,
        init: impl Into<Literal>,
    ) -> Result<SignalId, SimError> {
        let init = codec::encode(kind, width, init)?;
        self.declare(name, kind, width, Some(init))
    }

    fn declare(
        &mut self,
        name: &str,
        kind: ValueKind,
        width: u32,
        init: Option<Value>,
    ) -> Result<SignalId, SimError> {
        kind.check_width(width)?;
        let path = format!("{}.{name}", self.top);
        let ident = self.interner.get_or_intern(&path);
        if self.by_name.contains_key(&ident) {
            return Err(SimError::DuplicateSignal { path });
        }
        let id = SignalId(self.signals.len() as u32);
        self.by_name.insert(ident, id);
        self.signals.push(SignalDecl {
            path,
            name: ident,
            kind,
            width,
            init,
        });
        Ok(id)
    }

    /// Adds a combinational process: `target = f(inputs)` whenever an input changes.
    pub fn comb<F, L>(&mut self, target: SignalId, inputs: &[SignalId], f: F) -> Result<(), SimError>
    where
        F: Fn(&[&Value]) -> L + 'static,
        L: Into<Literal>,
    {
        self.add_process(target, inputs, Trigger::Combinational, f)
    }

    /// Adds a sequential process: `target <= f(inputs)` on `edge` of `clock`.
    pub fn seq<F, L>(
        &mut self,
        target: SignalId,
        clock: SignalId,
        edge: Edge,
        inputs: &[SignalId],
        f: F,
    ) -> Result<(), SimError>
    where
        F: Fn(&[&Value]) -> L + 'static,
        L: Into<Literal>,
    {
        let decl = self.decl(clock)?;
        if decl.width != 1 {
            return Err(SimError::InvalidClock {
                path: decl.path.clone(),
                reason: "clocks must be 1 bit wide",
            });
        }
        self.add_process(target, inputs, Trigger::Sequential { clock, edge }, f)
    }

    fn add_process<F, L>(
        &mut self,
        target: SignalId,
        inputs: &[SignalId],
        trigger: Trigger,
        f: F,
    ) -> Result<(), SimError>
    where
        F: Fn(&[&Value]) -> L + 'static,
        L: Into<Literal>,
    {
        self.decl(target)?;
        for &input in inputs {
            self.decl(input)?;
        }
        self.processes.push(Process {
            target,
            inputs: inputs.to_vec(),
            trigger,
            eval: Box::new(move |values: &[&Value]| -> Literal { f(values).into() }),
        });
        Ok(())
    }

    fn decl(&self, id: SignalId) -> Result<&SignalDecl, SimError> {
        self.signals
            .get(id.index())
            .ok_or_else(|| SimError::UnknownSignal {
                path: format!("#{}", id.0),
            })
    }

    /// Freezes the declarations and precomputes driver and fan-out tables.
    pub fn build(self) -> Hierarchy {
        let mut drivers = vec![Vec::new(); self.signals.len()];
        let mut fanout = vec![Vec::new(); self.signals.len()];
        for (idx, process) in self.processes.iter().enumerate() {
            drivers[process.target.index()].push(idx);
            match process.trigger {
                Trigger::Combinational => {
                    for input in &process.inputs {
                        let watchers: &mut Vec<usize> = &mut fanout[input.index()];
                        if !watchers.contains(&idx) {
                            watchers.push(idx);
                        }
                    }
                }
                Trigger::Sequential { clock, .. } => fanout[clock.index()].push(idx),
            }
        }
        Hierarchy {
            top: self.top,
            interner: self.interner,
            by_name: self.by_name,
            signals: self.signals,
            processes: self.processes,
            drivers,
            fanout,
        }
    }
}

/// A frozen design hierarchy: signals, processes, and lookup tables.
#[derive(Debug)]
pub struct Hierarchy {
    top: String,
    interner: Interner,
    by_name: HashMap<Ident, SignalId>,
    signals: Vec<SignalDecl>,
    processes: Vec<Process>,
    drivers: Vec<Vec<usize>>,
    fanout: Vec<Vec<usize>>,
}

impl Hierarchy {
    /// Name of the top scope.
    pub fn top(&self) -> &str {
        &self.top
    }

    /// Resolves a full path (`top.name`) or a name relative to the top scope.
    pub fn lookup(&self, path: &str) -> Option<SignalId> {
        let find = |p: &str| {
            self.interner
                .get(p)
                .and_then(|ident| self.by_name.get(&ident).copied())
        };
        find(path).or_else(|| find(&format!("{}.{path}", self.top)))
    }

    /// The declaration of `id`, if it belongs to this hierarchy.
    pub fn decl(&self, id: SignalId) -> Option<&SignalDecl> {
        self.signals.get(id.index())
    }

    /// All declarations in declaration order.
    pub fn signals(&self) -> impl Iterator<Item = (SignalId, &SignalDecl)> {
        self.signals
            .iter()
            .enumerate()
            .map(|(i, d)| (SignalId(i as u32), d))
    }

    /// Number of declared signals.
    pub fn signal_count(&self) -> usize {
        self.signals.len()
    }

    /// All processes in insertion order.
    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    /// Indices of the processes driving `id`.
    pub fn drivers(&self, id: SignalId) -> &[usize] {
        &self.drivers[id.index()]
    }

    /// Indices of the processes woken by a change of `id`.
    pub fn fanout(&self, id: SignalId) -> &[usize] {
        &self.fanout[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_signal_builder() -> (HierarchyBuilder, SignalId, SignalId) {
        let mut b = HierarchyBuilder::new("dut");
        let a = b.signal("a", ValueKind::Vector, 8).unwrap();
        let y = b.signal("y", ValueKind::Vector, 8).unwrap();
        (b, a, y)
    }

    #[test]
    fn lookup_full_and_relative_paths() {
        let (b, a, y) = two_signal_builder();
        let h = b.build();
        assert_eq!(h.lookup("dut.a"), Some(a));
        assert_eq!(h.lookup("y"), Some(y));
        assert_eq!(h.lookup("dut.missing"), None);
        assert_eq!(h.decl(y).unwrap().path, "dut.y");
    }

    #[test]
    fn duplicate_path_rejected() {
        let (mut b, _, _) = two_signal_builder();
        let err = b.signal("a", ValueKind::Bit, 1).unwrap_err();
        assert!(matches!(err, SimError::DuplicateSignal { path } if path == "dut.a"));
    }

    #[test]
    fn invalid_width_rejected() {
        let mut b = HierarchyBuilder::new("dut");
        assert!(matches!(
            b.signal("flag", ValueKind::Boolean, 8),
            Err(SimError::InvalidWidth { .. })
        ));
    }

    #[test]
    fn init_value_is_encoded() {
        let mut b = HierarchyBuilder::new("dut");
        let id = b
            .signal_with_init("count", ValueKind::Integer { signed: true }, 16, -2)
            .unwrap();
        let h = b.build();
        assert_eq!(h.decl(id).unwrap().init.as_ref().unwrap().to_i64().unwrap(), -2);
    }

    #[test]
    fn init_value_must_fit() {
        let mut b = HierarchyBuilder::new("dut");
        assert!(b.signal_with_init("v", ValueKind::Vector, 2, 7u8).is_err());
    }

    #[test]
    fn driver_and_fanout_tables() {
        let (mut b, a, y) = two_signal_builder();
        let clk = b.signal("clk", ValueKind::Bit, 1).unwrap();
        let q = b.signal("q", ValueKind::Vector, 8).unwrap();
        b.comb(y, &[a, a], |ins: &[&Value]| ins[0].clone()).unwrap();
        b.seq(q, clk, Edge::Posedge, &[a], |ins: &[&Value]| ins[0].clone())
            .unwrap();
        let h = b.build();
        assert_eq!(h.drivers(y), &[0]);
        assert_eq!(h.drivers(q), &[1]);
        assert_eq!(h.fanout(a), &[0]);
        assert_eq!(h.fanout(clk), &[1]);
        assert!(h.drivers(a).is_empty());
    }

    #[test]
    fn process_on_foreign_signal_rejected() {
        let (mut b, a, _) = two_signal_builder();
        let err = b
            .comb(SignalId::from_raw(99), &[a], |_: &[&Value]| 0u8)
            .unwrap_err();
        assert!(matches!(err, SimError::UnknownSignal { .. }));
    }

    #[test]
    fn wide_clock_rejected() {
        let (mut b, a, y) = two_signal_builder();
        let err = b
            .seq(y, a, Edge::Posedge, &[], |_: &[&Value]| 0u8)
            .unwrap_err();
        assert!(matches!(err, SimError::InvalidClock { .. }));
    }

    #[test]
    fn edge_matching() {
        use Logic::*;
        assert!(Edge::Posedge.matches(Zero, One));
        assert!(!Edge::Posedge.matches(X, One));
        assert!(Edge::Negedge.matches(One, Zero));
        assert!(Edge::Both.matches(One, Zero));
        assert!(!Edge::Both.matches(One, One));
    }
}
