//! VMI driver for the Xen hypervisor.

mod arch;
mod convert;
mod core;
mod driver;
mod error;

use std::time::Duration;

use vmi_core::{
    Architecture, Gfn, MemoryAccess, MemoryAccessOptions, VcpuId, VmiEvent, VmiEventControl,
    VmiEventResponse, VmiInfo, VmiMappedPage, VmiQueryProtection, VmiQueryRegisters, VmiRead,
    VmiSetProtection, VmiSetRegisters, VmiVmControl, VmiWrite,
};

pub use self::error::Error;
use self::arch::ArchAdapter;
pub use self::{
    convert::{FromExt, IntoExt, TryFromExt},
    driver::XenDriver,
};

impl<Arch> vmi_core::VmiDriver for XenDriver<Arch>
where
    Arch: Architecture + ArchAdapter,
{
    type Architecture = Arch;

    fn info(&self) -> Result<VmiInfo, vmi_core::VmiError> {
        Ok(self.info()?)
    }
}

impl<Arch> VmiRead for XenDriver<Arch>
where
    Arch: Architecture + ArchAdapter,
{
    fn read_page(&self, gfn: Gfn) -> Result<VmiMappedPage, vmi_core::VmiError> {
        Ok(self.read_page(gfn)?)
    }
}

impl<Arch> VmiWrite for XenDriver<Arch>
where
    Arch: Architecture + ArchAdapter,
{
    fn write_page(
        &self,
        gfn: Gfn,
        offset: u64,
        content: &[u8],
    ) -> Result<VmiMappedPage, vmi_core::VmiError> {
        Ok(self.write_page(gfn, offset, content)?)
    }
}

impl<Arch> VmiQueryProtection for XenDriver<Arch>
where
    Arch: Architecture + ArchAdapter,
{
    fn memory_access(&self, gfn: Gfn) -> Result<MemoryAccess, vmi_core::VmiError> {
        Ok(self.memory_access(gfn)?)
    }
}

impl<Arch> VmiSetProtection for XenDriver<Arch>
where
    Arch: Architecture + ArchAdapter,
{
    fn set_memory_access(
        &self,
        gfn: Gfn,
        access: MemoryAccess,
    ) -> Result<(), vmi_core::VmiError> {
        Ok(self.set_memory_access(gfn, access)?)
    }

    fn set_memory_access_with_options(
        &self,
        gfn: Gfn,
        access: MemoryAccess,
        options: MemoryAccessOptions,
    ) -> Result<(), vmi_core::VmiError> {
        Ok(self.set_memory_access_with_options(gfn, access, options)?)
    }
}

impl<Arch> VmiQueryRegisters for XenDriver<Arch>
where
    Arch: Architecture + ArchAdapter,
{
    fn registers(&self, vcpu: VcpuId) -> Result<Arch::Registers, vmi_core::VmiError> {
        Ok(self.registers(vcpu)?)
    }
}

impl<Arch> VmiSetRegisters for XenDriver<Arch>
where
    Arch: Architecture + ArchAdapter,
{
    fn set_registers(
        &self,
        vcpu: VcpuId,
        registers: Arch::Registers,
    ) -> Result<(), vmi_core::VmiError> {
        Ok(self.set_registers(vcpu, registers)?)
    }
}

impl<Arch> VmiEventControl for XenDriver<Arch>
where
    Arch: Architecture + ArchAdapter,
{
    fn monitor_enable(&self, option: Arch::EventMonitor) -> Result<(), vmi_core::VmiError> {
        Ok(self.monitor_enable(option)?)
    }

    fn monitor_disable(&self, option: Arch::EventMonitor) -> Result<(), vmi_core::VmiError> {
        Ok(self.monitor_disable(option)?)
    }

    fn events_pending(&self) -> usize {
        self.events_pending()
    }

    fn event_processing_overhead(&self) -> Duration {
        self.event_processing_overhead()
    }

    fn wait_for_event(
        &self,
        timeout: Duration,
        handler: impl FnMut(&VmiEvent<Arch>) -> VmiEventResponse<Arch>,
    ) -> Result<(), vmi_core::VmiError> {
        Ok(self.wait_for_event(timeout, handler)?)
    }
}

impl<Arch> VmiVmControl for XenDriver<Arch>
where
    Arch: Architecture + ArchAdapter,
{
    fn pause(&self) -> Result<(), vmi_core::VmiError> {
        Ok(self.pause()?)
    }

    fn resume(&self) -> Result<(), vmi_core::VmiError> {
        Ok(self.resume()?)
    }

    fn allocate_gfn(&self, gfn: Gfn) -> Result<(), vmi_core::VmiError> {
        Ok(self.allocate_gfn(gfn)?)
    }

    fn free_gfn(&self, gfn: Gfn) -> Result<(), vmi_core::VmiError> {
        Ok(self.free_gfn(gfn)?)
    }

    fn inject_interrupt(
        &self,
        vcpu: VcpuId,
        interrupt: Arch::Interrupt,
    ) -> Result<(), vmi_core::VmiError> {
        Ok(self.inject_interrupt(vcpu, interrupt)?)
    }

    fn reset_state(&self) -> Result<(), vmi_core::VmiError> {
        Ok(self.reset_state()?)
    }
}
