mod access_context;
mod address_context;
mod hex;
mod info;
pub(crate) mod macros;
mod memory_access;
mod vcpu_id;

pub use self::{
    access_context::{AccessContext, Gfn, Pa, TranslationMechanism, Va},
    address_context::AddressContext,
    hex::Hex,
    info::VmiInfo,
    memory_access::{MemoryAccess, MemoryAccessOptions},
    vcpu_id::VcpuId,
};
