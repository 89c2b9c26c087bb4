use indexmap::IndexMap;
use vmi_core::{Architecture, Gfn, MemoryAccess, Pa, VmiCore, VmiDriver, VmiFullDriver};

use crate::{breakpoint::BreakpointRecord, error::Result};

/// Which of the page's two memory-access traps is currently registered.
///
/// The hypervisor driver used here exposes memory-access monitoring as a
/// single synchronous `set_memory_access` call rather than the two-phase
/// "clear, then register in the clear-completion callback" sequence the
/// design note describes in the abstract; setting [`MemoryAccess::X`] (page
/// executable, not readable/writable) is what makes reads and writes trap,
/// and setting [`MemoryAccess::RW`] (page readable/writable, not executable)
/// is what makes execution trap. The net effect - exactly one of the two
/// event classes active at a time - is identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    /// At rest: instrumented bytes are live, reads/writes trap.
    ///
    /// Corresponds to `rw_event` registered, `x_event` not.
    Armed,

    /// Mid integrity-scan: original bytes are live, execution traps.
    ///
    /// Corresponds to `x_event` registered, `rw_event` not.
    Disarmed,
}

impl PageState {
    fn access(self) -> MemoryAccess {
        match self {
            PageState::Armed => MemoryAccess::X,
            PageState::Disarmed => MemoryAccess::RW,
        }
    }
}

/// One per guest physical page containing at least one instrumented address.
///
/// Invariant: exactly one of the page's two memory events is registered with
/// the hypervisor at any time (tracked here as `state`). When `children`
/// becomes empty, the owning trap table destroys this record and the
/// protection reverts to full access.
#[derive(Debug)]
pub struct PageRecord {
    /// Guest physical page number.
    pub page_frame: Gfn,

    /// Which memory-access trap is currently registered against this page.
    pub state: PageState,

    /// Instrumented addresses within this page, keyed by physical address.
    pub children: IndexMap<Pa, BreakpointRecord>,
}

impl PageRecord {
    /// Creates a new page record and arms it (registers the rw trap).
    pub fn new<Driver>(vmi: &VmiCore<Driver>, page_frame: Gfn) -> Result<Self>
    where
        Driver: VmiDriver,
    {
        vmi.set_memory_access(page_frame, PageState::Armed.access())?;

        Ok(Self {
            page_frame,
            state: PageState::Armed,
            children: IndexMap::new(),
        })
    }

    /// Writes `original_byte` for every child back to guest memory, then
    /// revokes this page's special protection entirely.
    ///
    /// Used during trap-table teardown; best-effort per byte, matching the
    /// "attempt restoration for every record even if some fail" requirement.
    pub fn restore_all<Driver>(&self, vmi: &VmiCore<Driver>) -> Vec<vmi_core::VmiError>
    where
        Driver: VmiDriver,
    {
        let mut errors = Vec::new();

        for record in self.children.values() {
            if let Err(err) = write_byte(vmi, record.guest_pa, record.original_byte) {
                errors.push(err);
            }
        }

        if let Err(err) = vmi.set_memory_access(self.page_frame, MemoryAccess::RWX) {
            errors.push(err);
        }

        errors
    }

    /// Handles a read/write trap: restores every child's original byte, then
    /// flips this page into the [`PageState::Disarmed`] (x-trapped) state.
    pub fn handle_rw_trap<Driver>(&mut self, vmi: &VmiCore<Driver>) -> Result<()>
    where
        Driver: VmiDriver,
    {
        for record in self.children.values_mut() {
            write_byte(vmi, record.guest_pa, record.original_byte)?;
        }

        vmi.set_memory_access(self.page_frame, PageState::Disarmed.access())?;
        self.state = PageState::Disarmed;

        Ok(())
    }

    /// Handles an execute trap: rewrites every child's current (possibly
    /// instrumented) byte, then flips this page back into
    /// [`PageState::Armed`] (rw-trapped).
    pub fn handle_x_trap<Driver>(&mut self, vmi: &VmiCore<Driver>) -> Result<()>
    where
        Driver: VmiDriver,
    {
        for record in self.children.values_mut() {
            write_byte(vmi, record.guest_pa, record.current_byte)?;
        }

        vmi.set_memory_access(self.page_frame, PageState::Armed.access())?;
        self.state = PageState::Armed;

        Ok(())
    }

    /// Writes the breakpoint opcode at `guest_pa` and marks the record
    /// enabled.
    pub fn enable<Driver>(&mut self, vmi: &VmiCore<Driver>, guest_pa: Pa) -> Result<()>
    where
        Driver: VmiFullDriver,
    {
        let opcode = Driver::Architecture::BREAKPOINT[0];
        if let Some(record) = self.children.get_mut(&guest_pa) {
            record.current_byte = opcode;
            record.enabled = true;
        }

        write_byte(vmi, guest_pa, opcode)
    }

    /// Writes `original_byte` at `guest_pa` and marks the record disabled.
    pub fn disable<Driver>(&mut self, vmi: &VmiCore<Driver>, guest_pa: Pa) -> Result<()>
    where
        Driver: VmiDriver,
    {
        let original = self
            .children
            .get(&guest_pa)
            .map(|record| record.original_byte);

        if let Some(original) = original {
            write_byte(vmi, guest_pa, original)?;
        }

        if let Some(record) = self.children.get_mut(&guest_pa) {
            record.current_byte = record.original_byte;
            record.enabled = false;
        }

        Ok(())
    }
}

fn write_byte<Driver>(vmi: &VmiCore<Driver>, pa: Pa, byte: u8) -> Result<()>
where
    Driver: VmiDriver,
{
    vmi.write_u8(pa, byte)?;
    Ok(())
}
