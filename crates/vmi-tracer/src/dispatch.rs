use indexmap::IndexMap;
use vmi_core::VcpuId;

use crate::pidtid::Tid;

/// Threads opaque per-invocation state from a syscall-entry callback to its
/// matching syscall-return callback.
///
/// Keyed by `(vCPU, thread)` rather than a single "last state" slot, per the
/// design note on opaque per-invocation state: state the core holds on
/// behalf of the caller, not a raw pointer the caller owns.
#[derive(Debug, Default)]
pub struct CallbackDispatcher<State> {
    pending: IndexMap<(VcpuId, Tid), State>,
}

impl<State> CallbackDispatcher<State> {
    /// Creates an empty dispatcher.
    pub fn new() -> Self {
        Self {
            pending: IndexMap::new(),
        }
    }

    /// Records the opaque state returned by an entry callback, to be handed
    /// to the matching return callback.
    pub fn store(&mut self, vcpu: VcpuId, tid: Tid, state: State) {
        self.pending.insert((vcpu, tid), state);
    }

    /// Removes and returns the state stored for `(vcpu, tid)`, if any.
    ///
    /// Absence is not an error: it means no matching entry was observed
    /// (e.g. the tracer started mid-syscall), and the return callback is
    /// simply skipped.
    pub fn take(&mut self, vcpu: VcpuId, tid: Tid) -> Option<State> {
        self.pending.shift_remove(&(vcpu, tid))
    }
}
