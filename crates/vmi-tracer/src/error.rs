use vmi_core::{Va, VmiError};

/// Errors produced by the tracer.
///
/// Mirrors the four error kinds named by the design: translation failures,
/// hypervisor I/O failures, disassembly failures, and the "not ours"
/// unknown-interrupt outcome (which is routed rather than propagated, and so
/// does not appear here).
#[derive(Debug, thiserror::Error)]
pub enum TracerError {
    /// A kernel symbol could not be resolved to a guest virtual address.
    #[error("symbol not found: {0}")]
    SymbolNotFound(String),

    /// Translating a guest virtual address yielded a null physical address.
    #[error("translation failed for {0}")]
    TranslationFailed(Va),

    /// The underlying hypervisor-introspection facility returned an error.
    #[error(transparent)]
    Driver(#[from] VmiError),

    /// The return-site locator could not disassemble the dispatcher, or
    /// found no matching `call r10` within the scanned window.
    #[error("disassembly failed: {0}")]
    Disassembly(String),
}

/// A convenience alias for tracer results.
pub type Result<T> = std::result::Result<T, TracerError>;
