//! Resolved signal references and the write request variants.

use serde::{Deserialize, Serialize};

use crate::hierarchy::SignalId;
use crate::value::{Literal, ValueKind};

/// A resolved, non-owning reference to one signal of a kernel.
///
/// Handles are cheap to copy and stay valid for the kernel's lifetime. Each
/// carries the token of the kernel that issued it, so another kernel refuses
/// it even when the ids line up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignalHandle {
    kernel: u64,
    id: SignalId,
    kind: ValueKind,
    width: u32,
}

impl SignalHandle {
    pub(crate) fn new(kernel: u64, id: SignalId, kind: ValueKind, width: u32) -> Self {
        Self {
            kernel,
            id,
            kind,
            width,
        }
    }

    pub(crate) fn kernel(&self) -> u64 {
        self.kernel
    }

    /// The signal's dense id.
    pub fn id(&self) -> SignalId {
        self.id
    }

    /// Declared kind.
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Declared width in bits.
    pub fn width(&self) -> u32 {
        self.width
    }
}

/// How a write request affects a signal.
#[derive(Clone, Debug, PartialEq)]
pub enum WriteMode {
    /// A normal write, applied at the next time step unless the signal is
    /// forced at that point.
    Normal(Literal),
    /// Pin the signal to a value, observable immediately.
    Force(Literal),
    /// Return a forced signal to normal propagation.
    Release,
}

impl WriteMode {
    /// Short name for log events.
    pub fn name(&self) -> &'static str {
        match self {
            WriteMode::Normal(_) => "normal",
            WriteMode::Force(_) => "force",
            WriteMode::Release => "release",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_accessors() {
        let h = SignalHandle::new(1, SignalId::from_raw(3), ValueKind::Vector, 12);
        assert_eq!(h.kernel(), 1);
        assert_eq!(h.id().as_raw(), 3);
        assert_eq!(h.kind(), ValueKind::Vector);
        assert_eq!(h.width(), 12);
    }

    #[test]
    fn mode_names() {
        assert_eq!(WriteMode::Normal(1u8.into()).name(), "normal");
        assert_eq!(WriteMode::Force(true.into()).name(), "force");
        assert_eq!(WriteMode::Release.name(), "release");
    }
}
