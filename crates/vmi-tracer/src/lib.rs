//! A stealthy software-breakpoint syscall tracer built on top of
//! `vmi-core`.
//!
//! Plants `INT3` traps at kernel addresses in a running guest, delivers
//! control to caller-supplied callbacks on syscall entry and return, and
//! hides the patched bytes from guest integrity scanners by toggling page
//! protection around a brief read/write or execute window rather than
//! leaving the breakpoint opcode permanently visible to guest code that
//! reads its own text section.

mod breakpoint;
mod dispatch;
mod error;
mod locate;
mod page;
mod pidtid;
#[cfg(test)]
mod testutil;
mod table;
mod tracer;

pub use breakpoint::{BreakpointRecord, RETURN_SITE_IDENTIFIER};
pub use error::{Result, TracerError};
pub use locate::{EntryPointLocator, SymbolResolver};
pub use page::PageState;
pub use pidtid::{GuestIdentity, Pid, Tid};
pub use table::TrapTable;
pub use tracer::{SyscallHandler, Tracer};
