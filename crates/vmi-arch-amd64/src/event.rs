use vmi_core::{Gfn, MemoryAccess, Pa, Va};

use crate::{ExceptionVector, Interrupt};

bitflags::bitflags! {
    /// Flags describing a memory access event.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct MemoryAccessFlags: u8 {
        /// The [`EventMemoryAccess::va`] field holds a guest VA associated with the event.
        const GLA_VALID        = (1 << 3);

        /// The `MemoryAccess` event was triggered by accessing a guest linear address.
        const FAULT_WITH_GLA   = (1 << 4);

        /// The `MemoryAccess` event was triggered during translating a guest linear address.
        const FAULT_IN_GPT     = (1 << 5);
    }
}

/// Event generated when monitored memory is accessed.
#[derive(Debug, Clone, Copy)]
pub struct EventMemoryAccess {
    /// Physical address that was accessed.
    pub pa: Pa,

    /// Virtual address that was accessed.
    pub va: Va,

    /// Type of access that occurred (read/write/execute).
    pub access: MemoryAccess,

    /// Additional flags describing the access.
    pub flags: MemoryAccessFlags,
}

/// Event generated when an interrupt or exception occurs.
#[derive(Debug, Clone, Copy)]
pub struct EventInterrupt {
    /// GFN of the instruction that caused the interrupt.
    /// Effectively, this is GFN of the current instruction pointer.
    pub gfn: Gfn,

    /// Information about the interrupt/exception.
    pub interrupt: Interrupt,
}

/// Event generated when a singlestep event occurs.
#[derive(Debug, Clone, Copy)]
pub struct EventSinglestep {
    /// GFN of the instruction that caused the singlestep.
    pub gfn: Gfn,
}

/// Reason for an event.
#[derive(Debug, Clone, Copy)]
pub enum EventReason {
    /// Memory access event (read/write/execute).
    MemoryAccess(EventMemoryAccess),

    /// Interrupt or exception event.
    Interrupt(EventInterrupt),

    /// Singlestep event.
    Singlestep(EventSinglestep),
}

impl EventReason {
    /// Returns the memory access event.
    ///
    /// # Panics
    ///
    /// Panics if the event reason is not a memory access event.
    pub fn as_memory_access(&self) -> &EventMemoryAccess {
        match self {
            Self::MemoryAccess(memory_access) => memory_access,
            _ => panic!("EventReason is not a MemoryAccess"),
        }
    }

    /// Returns the interrupt or exception event.
    ///
    /// # Panics
    ///
    /// Panics if the event reason is not an interrupt or exception event.
    pub fn as_interrupt(&self) -> &EventInterrupt {
        match self {
            Self::Interrupt(interrupt) => interrupt,
            _ => panic!("EventReason is not an Interrupt"),
        }
    }

    /// Returns the singlestep event.
    ///
    /// # Panics
    ///
    /// Panics if the event reason is not a singlestep event.
    pub fn as_singlestep(&self) -> &EventSinglestep {
        match self {
            Self::Singlestep(singlestep) => singlestep,
            _ => panic!("EventReason is not a Singlestep"),
        }
    }
}

/// Specifies which hardware events should be monitored.
#[derive(Debug, Clone, Copy)]
pub enum EventMonitor {
    // MemoryAccess, (implicit)
    /// Monitor specific hardware interrupts or exception vectors.
    Interrupt(ExceptionVector),

    /// Monitor singlestep execution of instructions.
    Singlestep,
}
