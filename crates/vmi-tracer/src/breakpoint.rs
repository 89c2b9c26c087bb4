use vmi_core::{Gfn, Pa, Va};

/// Reserved [`BreakpointRecord::identifier`] denoting the syscall-return trap.
///
/// There is exactly one such record in the trap table at any time, and it is
/// never looked up by name - it is wired in directly when the tracer starts.
pub const RETURN_SITE_IDENTIFIER: u16 = u16::MAX;

/// State for a single instrumented guest virtual address.
///
/// One `BreakpointRecord` exists per instrumented address, owned by the
/// [`PageRecord`](crate::page::PageRecord) covering its physical page. The
/// `parent` field is a non-owning back-reference (the page's frame number),
/// resolved through the trap table rather than held as a borrow - see the
/// design note on back-references without cycles.
#[derive(Debug, Clone, Copy)]
pub struct BreakpointRecord {
    /// Guest virtual address of the instrumented byte.
    pub guest_va: Va,

    /// Guest physical address of the instrumented byte.
    pub guest_pa: Pa,

    /// The instruction byte that lived at `guest_pa` before instrumentation.
    pub original_byte: u8,

    /// The byte currently written into guest memory at `guest_pa`.
    pub current_byte: u8,

    /// Whether this breakpoint should fire for the guest's control flow.
    ///
    /// A disabled record still physically exists and may still be
    /// transiently patched by the coherence protocol; it simply does not
    /// invoke callbacks or chain further state transitions.
    pub enabled: bool,

    /// Tags which configured syscall this record represents.
    ///
    /// [`RETURN_SITE_IDENTIFIER`] marks the syscall-return trap.
    pub identifier: u16,

    /// Guest physical frame number of the owning [`PageRecord`].
    pub parent: Gfn,
}

impl BreakpointRecord {
    /// Returns whether this record is the distinguished syscall-return trap.
    pub fn is_return_site(&self) -> bool {
        self.identifier == RETURN_SITE_IDENTIFIER
    }
}
