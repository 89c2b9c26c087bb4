use indexmap::IndexMap;
use vmi_core::{AddressContext, Architecture, Gfn, Pa, Registers, Va, VmiCore, VmiError, VmiFullDriver};

use crate::{
    breakpoint::{BreakpointRecord, RETURN_SITE_IDENTIFIER},
    error::{Result, TracerError},
    page::PageRecord,
};

/// The global trap table: the sole root from which all live introspection
/// state is reachable.
///
/// A single mapping from page frame to [`PageRecord`], unique keys. Dropping
/// the table does not by itself restore guest memory - callers must call
/// [`TrapTable::teardown`] explicitly so errors can be observed and logged,
/// matching the "best-effort, attempt every record" requirement.
#[derive(Debug, Default)]
pub struct TrapTable {
    pages: IndexMap<Gfn, PageRecord>,
}

impl TrapTable {
    /// Creates an empty trap table.
    pub fn new() -> Self {
        Self {
            pages: IndexMap::new(),
        }
    }

    /// Number of pages currently instrumented.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Total number of instrumented addresses across all pages.
    pub fn breakpoint_count(&self) -> usize {
        self.pages.values().map(|page| page.children.len()).sum()
    }

    /// Plants a software breakpoint at `guest_va`, translated using `root`.
    ///
    /// Idempotent: calling this twice for the same address returns the same
    /// record and performs no second write. On any failure while creating a
    /// brand-new page, the partially built [`PageRecord`] is torn down
    /// before the error is returned, so no partial state leaks.
    pub fn install<Driver>(
        &mut self,
        vmi: &VmiCore<Driver>,
        root: Pa,
        guest_va: Va,
        identifier: u16,
    ) -> Result<BreakpointRecord>
    where
        Driver: VmiFullDriver,
    {
        let guest_pa = vmi.translate_address(AddressContext::new(guest_va, root))?;
        if guest_pa.0 == 0 {
            return Err(TracerError::TranslationFailed(guest_va));
        }

        let page_frame = Driver::Architecture::gfn_from_pa(guest_pa);

        let created_page = !self.pages.contains_key(&page_frame);
        if created_page {
            let page = PageRecord::new(vmi, page_frame)?;
            self.pages.insert(page_frame, page);
        }

        let install_result = self.install_child(vmi, page_frame, guest_pa, guest_va, identifier);

        match install_result {
            Ok(record) => Ok(record),
            Err(err) => {
                if created_page {
                    // Roll back the page we just created; nothing else
                    // references it yet.
                    if let Some(page) = self.pages.shift_remove(&page_frame) {
                        let _ = vmi.set_memory_access(page.page_frame, vmi_core::MemoryAccess::RWX);
                    }
                }
                Err(err)
            }
        }
    }

    fn install_child<Driver>(
        &mut self,
        vmi: &VmiCore<Driver>,
        page_frame: Gfn,
        guest_pa: Pa,
        guest_va: Va,
        identifier: u16,
    ) -> Result<BreakpointRecord>
    where
        Driver: VmiFullDriver,
    {
        let page = self
            .pages
            .get_mut(&page_frame)
            .expect("page record just inserted or already present");

        if let Some(existing) = page.children.get(&guest_pa) {
            return Ok(*existing);
        }

        let original_byte = vmi.read_u8(guest_pa)?;
        let opcode = Driver::Architecture::BREAKPOINT[0];
        vmi.write_u8(guest_pa, opcode)?;

        let record = BreakpointRecord {
            guest_va,
            guest_pa,
            original_byte,
            current_byte: opcode,
            enabled: true,
            identifier,
            parent: page_frame,
        };

        page.children.insert(guest_pa, record);

        Ok(record)
    }

    /// Resolves a guest virtual address to its [`BreakpointRecord`], if any.
    ///
    /// Returns `None` if any step of the lookup fails - the interrupt was
    /// not ours and must be reinjected.
    pub fn resolve<Driver>(
        &self,
        vmi: &VmiCore<Driver>,
        root: Pa,
        guest_va: Va,
    ) -> Option<BreakpointRecord>
    where
        Driver: VmiFullDriver,
    {
        let guest_pa = vmi.translate_address(AddressContext::new(guest_va, root)).ok()?;
        if guest_pa.0 == 0 {
            return None;
        }

        let page_frame = Driver::Architecture::gfn_from_pa(guest_pa);
        let page = self.pages.get(&page_frame)?;
        page.children.get(&guest_pa).copied()
    }

    /// Marks the record at `guest_pa` on `page_frame` enabled, writing the
    /// breakpoint opcode into guest memory.
    pub fn enable<Driver>(&mut self, vmi: &VmiCore<Driver>, page_frame: Gfn, guest_pa: Pa) -> Result<()>
    where
        Driver: VmiFullDriver,
    {
        let page = self
            .pages
            .get_mut(&page_frame)
            .ok_or(TracerError::TranslationFailed(Va(guest_pa.0)))?;
        page.enable(vmi, guest_pa)
    }

    /// Marks the record at `guest_pa` on `page_frame` disabled, restoring
    /// `original_byte` into guest memory.
    pub fn disable<Driver>(&mut self, vmi: &VmiCore<Driver>, page_frame: Gfn, guest_pa: Pa) -> Result<()>
    where
        Driver: VmiFullDriver,
    {
        let page = self
            .pages
            .get_mut(&page_frame)
            .ok_or(TracerError::TranslationFailed(Va(guest_pa.0)))?;
        page.disable(vmi, guest_pa)
    }

    /// Writes `original_byte` back at `guest_pa` without touching `enabled`.
    ///
    /// Used on INT3 delivery: the real instruction must execute (via
    /// single-step or direct resume) before the breakpoint opcode is
    /// re-written, which happens separately via [`TrapTable::rearm`].
    pub fn restore_original<Driver>(&mut self, vmi: &VmiCore<Driver>, page_frame: Gfn, guest_pa: Pa) -> Result<()>
    where
        Driver: VmiFullDriver,
    {
        let page = self
            .pages
            .get_mut(&page_frame)
            .ok_or(TracerError::TranslationFailed(Va(guest_pa.0)))?;

        let original_byte = match page.children.get(&guest_pa) {
            Some(record) => record.original_byte,
            None => return Ok(()),
        };

        vmi.write_u8(guest_pa, original_byte)?;

        if let Some(record) = page.children.get_mut(&guest_pa) {
            record.current_byte = original_byte;
        }

        Ok(())
    }

    /// Writes `current_byte` back at `guest_pa` (re-arming after a
    /// single-step), without touching `enabled`.
    pub fn rearm<Driver>(&mut self, vmi: &VmiCore<Driver>, page_frame: Gfn, guest_pa: Pa) -> Result<()>
    where
        Driver: VmiFullDriver,
    {
        let page = self
            .pages
            .get_mut(&page_frame)
            .ok_or(TracerError::TranslationFailed(Va(guest_pa.0)))?;

        let opcode = Driver::Architecture::BREAKPOINT[0];
        vmi.write_u8(guest_pa, opcode)?;

        if let Some(record) = page.children.get_mut(&guest_pa) {
            record.current_byte = opcode;
        }

        Ok(())
    }

    /// Dispatches a read/write trap for `page_frame` to its [`PageRecord`].
    pub fn handle_rw_trap<Driver>(&mut self, vmi: &VmiCore<Driver>, page_frame: Gfn) -> Result<()>
    where
        Driver: VmiFullDriver,
    {
        if let Some(page) = self.pages.get_mut(&page_frame) {
            page.handle_rw_trap(vmi)?;
        }
        Ok(())
    }

    /// Dispatches an execute trap for `page_frame` to its [`PageRecord`].
    pub fn handle_x_trap<Driver>(&mut self, vmi: &VmiCore<Driver>, page_frame: Gfn) -> Result<()>
    where
        Driver: VmiFullDriver,
    {
        if let Some(page) = self.pages.get_mut(&page_frame) {
            page.handle_x_trap(vmi)?;
        }
        Ok(())
    }

    /// Returns the distinguished syscall-return record, if installed.
    pub fn return_site(&self) -> Option<BreakpointRecord> {
        self.pages
            .values()
            .flat_map(|page| page.children.values())
            .find(|record| record.identifier == RETURN_SITE_IDENTIFIER)
            .copied()
    }

    /// Destroys the trap table, writing `original_byte` back into guest
    /// memory for every record and reverting every page's protection.
    ///
    /// Best-effort: every record is attempted even if earlier ones fail; all
    /// failures are returned so the caller can log them (a failed
    /// restoration leaves an illegal opcode at that site, which the caller
    /// must be able to report).
    pub fn teardown<Driver>(&mut self, vmi: &VmiCore<Driver>) -> Vec<VmiError>
    where
        Driver: VmiFullDriver,
    {
        let mut errors = Vec::new();

        for page in self.pages.values() {
            errors.extend(page.restore_all(vmi));
        }

        self.pages.clear();
        errors
    }
}

#[cfg(test)]
mod tests {
    use vmi_core::MemoryAccess;

    use super::*;
    use crate::testutil::MockDriver;

    fn setup() -> (MockDriver, VmiCore<MockDriver>) {
        let driver = MockDriver::new();
        let handle = driver.clone();
        let vmi = VmiCore::new(driver).unwrap();
        (handle, vmi)
    }

    /// S1: install then teardown round-trips the original byte.
    #[test]
    fn s1_install_then_teardown_restores_original_byte() {
        let (guest, vmi) = setup();
        let root = guest.root();
        let va = Va(0xFFFF_F800_0010_2000);
        let pa = guest.map(va.0);
        vmi.write_u8(pa, 0x48).unwrap();

        let mut table = TrapTable::new();
        table.install(&vmi, root, va, 0).unwrap();
        assert_eq!(guest.byte_at(pa), 0xcc);

        let errors = table.teardown(&vmi);
        assert!(errors.is_empty());
        assert_eq!(guest.byte_at(pa), 0x48);
        assert_eq!(guest.access_at(pa), MemoryAccess::RWX);
    }

    #[test]
    fn install_is_idempotent() {
        let (guest, vmi) = setup();
        let root = guest.root();
        let va = Va(0x1000);
        let pa = guest.map(va.0);
        vmi.write_u8(pa, 0x90).unwrap();

        let mut table = TrapTable::new();
        let first = table.install(&vmi, root, va, 7).unwrap();
        let second = table.install(&vmi, root, va, 7).unwrap();

        assert_eq!(first.guest_pa, second.guest_pa);
        assert_eq!(first.original_byte, 0x90);
        assert_eq!(table.breakpoint_count(), 1);
        assert_eq!(table.page_count(), 1);
    }

    #[test]
    fn resolve_finds_installed_address_and_misses_others() {
        let (guest, vmi) = setup();
        let root = guest.root();
        let va = Va(0x2000);
        let pa = guest.map(va.0);
        vmi.write_u8(pa, 0x55).unwrap();

        let mut table = TrapTable::new();
        table.install(&vmi, root, va, 3).unwrap();

        let found = table.resolve(&vmi, root, va).expect("installed address resolves");
        assert_eq!(found.identifier, 3);

        assert!(table.resolve(&vmi, root, Va(0xdead_b000)).is_none());
    }

    #[test]
    fn disable_then_enable_round_trips_guest_byte() {
        let (guest, vmi) = setup();
        let root = guest.root();
        let va = Va(0x3000);
        let pa = guest.map(va.0);
        vmi.write_u8(pa, 0x55).unwrap();

        let mut table = TrapTable::new();
        let record = table.install(&vmi, root, va, 1).unwrap();
        assert_eq!(guest.byte_at(pa), 0xcc);

        table.disable(&vmi, record.parent, record.guest_pa).unwrap();
        assert_eq!(guest.byte_at(pa), 0x55);
        assert!(!table.resolve(&vmi, root, va).unwrap().enabled);

        table.enable(&vmi, record.parent, record.guest_pa).unwrap();
        assert_eq!(guest.byte_at(pa), 0xcc);
        assert!(table.resolve(&vmi, root, va).unwrap().enabled);
    }

    #[test]
    fn restore_original_then_rearm_round_trips_without_touching_enabled() {
        let (guest, vmi) = setup();
        let root = guest.root();
        let va = Va(0x4000);
        let pa = guest.map(va.0);
        vmi.write_u8(pa, 0x48).unwrap();

        let mut table = TrapTable::new();
        let record = table.install(&vmi, root, va, 0).unwrap();

        table.restore_original(&vmi, record.parent, record.guest_pa).unwrap();
        assert_eq!(guest.byte_at(pa), 0x48);
        assert!(table.resolve(&vmi, root, va).unwrap().enabled, "restore_original leaves enabled untouched");

        table.rearm(&vmi, record.parent, record.guest_pa).unwrap();
        assert_eq!(guest.byte_at(pa), 0xcc);
    }

    /// S5/S6: three breakpoints sharing a page toggle together under the
    /// rw/x coherence protocol.
    #[test]
    fn s5_and_s6_rw_then_x_trap_toggle_all_children_together() {
        let (guest, vmi) = setup();
        let root = guest.root();
        let base = 0x5000u64;

        let va1 = Va(base + 0x10);
        let va2 = Va(base + 0x20);
        let va3 = Va(base + 0x30);

        let pa1 = guest.map(va1.0);
        let pa2 = guest.map(va2.0);
        let pa3 = guest.map(va3.0);

        vmi.write_u8(pa1, 0x48).unwrap();
        vmi.write_u8(pa2, 0x55).unwrap();
        vmi.write_u8(pa3, 0x90).unwrap();

        let mut table = TrapTable::new();
        let r1 = table.install(&vmi, root, va1, 1).unwrap();
        table.install(&vmi, root, va2, 2).unwrap();
        table.install(&vmi, root, va3, 3).unwrap();

        assert_eq!(guest.byte_at(pa1), 0xcc);
        assert_eq!(guest.byte_at(pa2), 0xcc);
        assert_eq!(guest.byte_at(pa3), 0xcc);
        assert_eq!(guest.access_at(pa1), MemoryAccess::X);

        let page_frame = r1.parent;

        // S5: a read/write trap fires (guest integrity scan) - every child's
        // original byte comes back and the page flips to execute-trapped.
        table.handle_rw_trap(&vmi, page_frame).unwrap();
        assert_eq!(guest.byte_at(pa1), 0x48);
        assert_eq!(guest.byte_at(pa2), 0x55);
        assert_eq!(guest.byte_at(pa3), 0x90);
        assert_eq!(guest.access_at(pa1), MemoryAccess::RW);

        // S6: the scan finishes and execution resumes - breakpoints return.
        table.handle_x_trap(&vmi, page_frame).unwrap();
        assert_eq!(guest.byte_at(pa1), 0xcc);
        assert_eq!(guest.byte_at(pa2), 0xcc);
        assert_eq!(guest.byte_at(pa3), 0xcc);
        assert_eq!(guest.access_at(pa1), MemoryAccess::X);
    }

    #[test]
    fn return_site_is_found_among_other_breakpoints() {
        let (guest, vmi) = setup();
        let root = guest.root();
        let va = Va(0x6000);
        let return_va = Va(0x6100);
        guest.map(va.0);
        guest.map(return_va.0);

        let mut table = TrapTable::new();
        table.install(&vmi, root, va, 0).unwrap();
        assert!(table.return_site().is_none());

        table.install(&vmi, root, return_va, RETURN_SITE_IDENTIFIER).unwrap();
        let site = table.return_site().expect("return site installed");
        assert_eq!(site.guest_va, return_va);
    }
}
