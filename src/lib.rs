//! A stealthy VMI syscall tracer.
//!
//! This crate plants software breakpoints at kernel virtual addresses
//! inside a running guest, delivers control to callbacks on syscall
//! entry and return, and restores original guest memory around each
//! hypervisor trap so that in-guest integrity scanners never observe
//! a patched instruction stream.
//!
//! The implementation is split across a handful of crates, re-exported
//! here under feature-gated modules, mirroring the layering of the
//! hypervisor-introspection stack it is built on:
//!
//! - [`vmi_core`] provides the driver-agnostic abstractions (address
//!   spaces, the event loop, the `VmiDriver` capability traits).
//! - [`vmi_arch_amd64`] provides the AMD64/Intel64 architecture layer
//!   (register layout, page table walking, event types).
//! - [`vmi_driver_xen`] provides the Xen VMI driver backing the above
//!   abstractions.
//! - [`vmi_tracer`] implements the breakpoint engine itself: the trap
//!   table, the coherence protocol, the entry-point locator and the
//!   callback dispatcher.

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub use vmi_core::*;

/// Architecture abstractions.
pub mod arch {
    pub use vmi_core::arch::*;

    /// AMD64 / Intel 64 architecture support.
    pub mod amd64 {
        pub use vmi_arch_amd64::*;
    }
}

/// VMI drivers.
pub mod driver {
    /// Xen VMI driver.
    #[cfg(feature = "driver-xen")]
    pub mod xen {
        pub use vmi_driver_xen::*;
    }
}

/// The stealthy breakpoint engine.
pub mod tracer {
    pub use vmi_tracer::*;
}
