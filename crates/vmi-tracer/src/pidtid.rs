use vmi_core::{VmiCore, VmiFullDriver};

/// A guest process identifier, in whatever form the guest operating system
/// represents it (e.g. an `EPROCESS` pointer on Windows).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pid(pub u64);

/// A guest per-thread identifier, in whatever form the guest operating
/// system represents it (e.g. an `ETHREAD` pointer on Windows).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tid(pub u64);

/// Resolves the guest process and thread identifiers for the vCPU currently
/// executing a syscall.
///
/// The core tracer deliberately knows nothing about guest-OS memory layout:
/// walking `KPCR`/`KTHREAD`/`EPROCESS`-style structures is guest-OS-specific
/// knowledge, consumed here as an external collaborator (the same way
/// symbol-to-address translation and syscall-argument decoding are, per the
/// boundary the core draws around itself). The operator binary supplies a
/// concrete implementation tied to the guest OS it targets.
pub trait GuestIdentity<Driver>
where
    Driver: VmiFullDriver,
{
    /// Resolves the current process and thread identifiers on `vcpu`.
    ///
    /// Returns `None` if identity could not be resolved (e.g. the guest has
    /// not yet initialized per-thread state); this is non-fatal and callers
    /// should proceed with a placeholder.
    fn identity(
        &self,
        vmi: &VmiCore<Driver>,
        vcpu: vmi_core::VcpuId,
        registers: &<Driver::Architecture as vmi_core::Architecture>::Registers,
    ) -> Option<(Pid, Tid)>;
}
