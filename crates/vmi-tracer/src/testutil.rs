//! An in-memory guest used only by tests.
//!
//! Backs guest physical memory with a `HashMap` and maintains a real 4-level
//! AMD64 page table, so `vmi_core`'s address translation walks it exactly as
//! it would walk a hypervisor's EPT/NPT-backed guest. Page-table levels are
//! allocated lazily the first time a virtual address is mapped.

use std::{cell::RefCell, collections::HashMap, rc::Rc, time::Duration};

use vmi_arch_amd64::{Amd64, PageTableEntry, Registers};
use vmi_core::{
    Gfn, MemoryAccess, MemoryAccessOptions, Pa, VcpuId, VmiDriver, VmiError, VmiEvent,
    VmiEventControl, VmiEventResponse, VmiInfo, VmiMappedPage, VmiQueryProtection,
    VmiQueryRegisters, VmiRead, VmiSetProtection, VmiSetRegisters, VmiVmControl, VmiWrite,
};

const PAGE_SIZE: u64 = 0x1000;
const ROOT_GFN: Gfn = Gfn(1);

struct Inner {
    pages: RefCell<HashMap<Gfn, Vec<u8>>>,
    access: RefCell<HashMap<Gfn, MemoryAccess>>,
    registers: RefCell<HashMap<VcpuId, Registers>>,
    next_gfn: RefCell<u64>,
}

/// A cheaply-cloneable handle to an in-memory guest.
///
/// Clone it before handing ownership to a [`vmi_core::VmiCore`] to keep a
/// handle for asserting on guest state after the fact.
#[derive(Clone)]
pub struct MockDriver {
    inner: Rc<Inner>,
}

impl MockDriver {
    pub fn new() -> Self {
        let driver = Self {
            inner: Rc::new(Inner {
                pages: RefCell::new(HashMap::new()),
                access: RefCell::new(HashMap::new()),
                registers: RefCell::new(HashMap::new()),
                next_gfn: RefCell::new(2),
            }),
        };
        driver.alloc_page(ROOT_GFN);
        driver
    }

    /// Physical address of the PML4 table - pass as `root` to translations.
    pub fn root(&self) -> Pa {
        Pa(ROOT_GFN.0 << 12)
    }

    /// Ensures `va` is mapped, creating any missing page-table level along
    /// the way, and returns its physical address within a dedicated backing
    /// page.
    pub fn map(&self, va: u64) -> Pa {
        let pml4i = (va >> 39) & 0x1ff;
        let pdpti = (va >> 30) & 0x1ff;
        let pdi = (va >> 21) & 0x1ff;
        let pti = (va >> 12) & 0x1ff;

        let pdpt = self.walk_or_create(ROOT_GFN, pml4i);
        let pd = self.walk_or_create(pdpt, pdpti);
        let pt = self.walk_or_create(pd, pdi);
        let data = self.walk_or_create(pt, pti);

        Pa((data.0 << 12) | (va & 0xfff))
    }

    /// Writes raw bytes directly into guest memory, bypassing `VmiCore`.
    /// Used to seed test fixtures (e.g. crafted dispatcher code) before a
    /// `VmiCore` read would otherwise populate its cache from zeroed memory.
    pub fn write_bytes(&self, pa: Pa, bytes: &[u8]) {
        let gfn = Gfn(pa.0 >> 12);
        let offset = (pa.0 & 0xfff) as usize;
        let mut pages = self.inner.pages.borrow_mut();
        let page = pages.get_mut(&gfn).unwrap();
        page[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    /// Reads the current byte at a physical address, bypassing `VmiCore`'s
    /// read cache.
    pub fn byte_at(&self, pa: Pa) -> u8 {
        let gfn = Gfn(pa.0 >> 12);
        self.inner.pages.borrow()[&gfn][(pa.0 & 0xfff) as usize]
    }

    /// Current memory-access permission registered for the page containing
    /// `pa`.
    pub fn access_at(&self, pa: Pa) -> MemoryAccess {
        let gfn = Gfn(pa.0 >> 12);
        self.inner.access.borrow()[&gfn]
    }

    pub fn set_registers_for_test(&self, vcpu: VcpuId, registers: Registers) {
        self.inner.registers.borrow_mut().insert(vcpu, registers);
    }

    fn alloc_gfn(&self) -> Gfn {
        let mut next = self.inner.next_gfn.borrow_mut();
        let gfn = Gfn(*next);
        *next += 1;
        drop(next);
        self.alloc_page(gfn);
        gfn
    }

    fn alloc_page(&self, gfn: Gfn) {
        self.inner
            .pages
            .borrow_mut()
            .insert(gfn, vec![0u8; PAGE_SIZE as usize]);
        self.inner.access.borrow_mut().insert(gfn, MemoryAccess::RWX);
    }

    fn pte_at(&self, table: Gfn, index: u64) -> PageTableEntry {
        let pages = self.inner.pages.borrow();
        let page = &pages[&table];
        let offset = (index * 8) as usize;
        let bytes: [u8; 8] = page[offset..offset + 8].try_into().unwrap();
        PageTableEntry(u64::from_le_bytes(bytes))
    }

    fn set_pte(&self, table: Gfn, index: u64, target: Gfn) {
        let mut pages = self.inner.pages.borrow_mut();
        let page = pages.get_mut(&table).unwrap();
        let offset = (index * 8) as usize;
        let entry = (target.0 << 12) | 1;
        page[offset..offset + 8].copy_from_slice(&entry.to_le_bytes());
    }

    fn walk_or_create(&self, table: Gfn, index: u64) -> Gfn {
        let entry = self.pte_at(table, index);
        if entry.present() {
            entry.pfn()
        }
        else {
            let child = self.alloc_gfn();
            self.set_pte(table, index, child);
            child
        }
    }
}

impl VmiDriver for MockDriver {
    type Architecture = Amd64;

    fn info(&self) -> Result<VmiInfo, VmiError> {
        Ok(VmiInfo {
            page_size: PAGE_SIZE,
            page_shift: 12,
            max_gfn: Gfn(u32::MAX as u64),
            vcpus: 1,
        })
    }
}

impl VmiRead for MockDriver {
    fn read_page(&self, gfn: Gfn) -> Result<VmiMappedPage, VmiError> {
        let data = self
            .inner
            .pages
            .borrow()
            .get(&gfn)
            .cloned()
            .unwrap_or_else(|| vec![0u8; PAGE_SIZE as usize]);
        Ok(VmiMappedPage::new(data))
    }
}

impl VmiWrite for MockDriver {
    fn write_page(&self, gfn: Gfn, offset: u64, content: &[u8]) -> Result<VmiMappedPage, VmiError> {
        let mut pages = self.inner.pages.borrow_mut();
        let page = pages
            .entry(gfn)
            .or_insert_with(|| vec![0u8; PAGE_SIZE as usize]);
        let offset = offset as usize;
        page[offset..offset + content.len()].copy_from_slice(content);
        Ok(VmiMappedPage::new(page.clone()))
    }
}

impl VmiQueryProtection for MockDriver {
    fn memory_access(&self, gfn: Gfn) -> Result<MemoryAccess, VmiError> {
        Ok(self
            .inner
            .access
            .borrow()
            .get(&gfn)
            .copied()
            .unwrap_or(MemoryAccess::RWX))
    }
}

impl VmiSetProtection for MockDriver {
    fn set_memory_access(&self, gfn: Gfn, access: MemoryAccess) -> Result<(), VmiError> {
        self.inner.access.borrow_mut().insert(gfn, access);
        Ok(())
    }

    fn set_memory_access_with_options(
        &self,
        gfn: Gfn,
        access: MemoryAccess,
        _options: MemoryAccessOptions,
    ) -> Result<(), VmiError> {
        self.set_memory_access(gfn, access)
    }
}

impl VmiQueryRegisters for MockDriver {
    fn registers(&self, vcpu: VcpuId) -> Result<Registers, VmiError> {
        Ok(self.inner.registers.borrow().get(&vcpu).copied().unwrap_or_default())
    }
}

impl VmiSetRegisters for MockDriver {
    fn set_registers(&self, vcpu: VcpuId, registers: Registers) -> Result<(), VmiError> {
        self.inner.registers.borrow_mut().insert(vcpu, registers);
        Ok(())
    }
}

impl VmiEventControl for MockDriver {
    fn monitor_enable(&self, _option: vmi_arch_amd64::EventMonitor) -> Result<(), VmiError> {
        Ok(())
    }

    fn monitor_disable(&self, _option: vmi_arch_amd64::EventMonitor) -> Result<(), VmiError> {
        Ok(())
    }

    fn events_pending(&self) -> usize {
        0
    }

    fn event_processing_overhead(&self) -> Duration {
        Duration::ZERO
    }

    fn wait_for_event(
        &self,
        _timeout: Duration,
        _handler: impl FnMut(&VmiEvent<Amd64>) -> VmiEventResponse<Amd64>,
    ) -> Result<(), VmiError> {
        Err(VmiError::Timeout)
    }
}

impl VmiVmControl for MockDriver {
    fn pause(&self) -> Result<(), VmiError> {
        Ok(())
    }

    fn resume(&self) -> Result<(), VmiError> {
        Ok(())
    }

    fn allocate_gfn(&self, _gfn: Gfn) -> Result<(), VmiError> {
        Ok(())
    }

    fn free_gfn(&self, _gfn: Gfn) -> Result<(), VmiError> {
        Ok(())
    }

    fn inject_interrupt(
        &self,
        _vcpu: VcpuId,
        _interrupt: vmi_arch_amd64::Interrupt,
    ) -> Result<(), VmiError> {
        Ok(())
    }

    fn reset_state(&self) -> Result<(), VmiError> {
        Ok(())
    }
}
