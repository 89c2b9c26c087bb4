use capstone::{arch::x86::ArchMode, arch::BuildsCapstone, Capstone};
use vmi_core::{Va, VmiCore, VmiFullDriver};

use crate::error::{Result, TracerError};

/// Maximum number of bytes read from the dispatcher when searching for the
/// return site. The call is expected to be found well within the first page.
const SCAN_WINDOW: usize = 4096;

/// Resolves configured kernel-symbol names to guest virtual addresses.
///
/// Symbol translation is an external collaborator per the design's scope:
/// the core tracer never parses a PDB or walks a kernel export table itself.
/// The operator binary supplies a concrete implementation (backed by an
/// `isr` profile, in the shipped binary).
pub trait SymbolResolver {
    /// Resolves `name` to a guest virtual address.
    ///
    /// Returns [`TracerError::SymbolNotFound`] if the symbol is absent.
    fn resolve(&self, name: &str) -> Result<Va>;
}

/// Resolves a syscall name via a [`SymbolResolver`] and locates the single
/// return-site address inside the fast-syscall dispatcher.
pub struct EntryPointLocator<'a> {
    resolver: &'a dyn SymbolResolver,
}

impl<'a> EntryPointLocator<'a> {
    /// Creates a locator backed by the given symbol resolver.
    pub fn new(resolver: &'a dyn SymbolResolver) -> Self {
        Self { resolver }
    }

    /// Looks up the kernel virtual address of a monitored syscall by name.
    pub fn resolve_syscall(&self, name: &str) -> Result<Va> {
        self.resolver.resolve(name)
    }

    /// Reads up to [`SCAN_WINDOW`] bytes of kernel instructions starting at
    /// `dispatcher_va`, disassembles them linearly in 64-bit x86 mode, finds
    /// the first `call r10` instruction, and returns the address of the
    /// instruction immediately following it.
    ///
    /// The fast-syscall dispatcher calls into the specific service routine
    /// through a register; the instruction after that call is the universal
    /// syscall-return point reached regardless of which service ran.
    pub fn find_return_site<Driver>(
        &self,
        vmi: &VmiCore<Driver>,
        root: vmi_core::Pa,
        dispatcher_va: Va,
    ) -> Result<Va>
    where
        Driver: VmiFullDriver,
    {
        let mut code = vec![0u8; SCAN_WINDOW];
        vmi.read(
            vmi_core::AddressContext::new(dispatcher_va, root),
            &mut code,
        )?;

        find_return_site_in_bytes(&code, dispatcher_va.0)
    }
}

/// Pure disassembly-only half of [`EntryPointLocator::find_return_site`],
/// split out so it can be exercised with hand-built byte buffers and no
/// guest at all.
pub fn find_return_site_in_bytes(code: &[u8], base: u64) -> Result<Va> {
    let cs = Capstone::new()
        .x86()
        .mode(ArchMode::Mode64)
        .build()
        .map_err(|err| TracerError::Disassembly(err.to_string()))?;

    let instructions = cs
        .disasm_all(code, base)
        .map_err(|err| TracerError::Disassembly(err.to_string()))?;

    let mut iter = instructions.iter();
    while let Some(insn) = iter.next() {
        if insn.mnemonic() == Some("call") && insn.op_str() == Some("r10") {
            let next = iter
                .next()
                .ok_or_else(|| TracerError::Disassembly("call r10 has no successor".into()))?;
            return Ok(Va(next.address()));
        }
    }

    Err(TracerError::Disassembly(
        "no `call r10` found within scan window".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `mov eax, 1; call r10; nop` - the `nop` is the return site.
    #[test]
    fn finds_instruction_after_call_r10() {
        #[rustfmt::skip]
        let code: &[u8] = &[
            0xb8, 0x01, 0x00, 0x00, 0x00, // mov eax, 1
            0x41, 0xff, 0xd2,             // call r10
            0x90,                         // nop
        ];

        let va = find_return_site_in_bytes(code, 0x1000).expect("return site found");
        assert_eq!(va, Va(0x1000 + 8));
    }

    #[test]
    fn fails_when_no_call_r10_present() {
        #[rustfmt::skip]
        let code: &[u8] = &[
            0xb8, 0x01, 0x00, 0x00, 0x00, // mov eax, 1
            0x90,                         // nop
        ];

        assert!(find_return_site_in_bytes(code, 0x1000).is_err());
    }

    #[test]
    fn fails_when_call_r10_is_last_instruction() {
        #[rustfmt::skip]
        let code: &[u8] = &[
            0x41, 0xff, 0xd2, // call r10
        ];

        assert!(find_return_site_in_bytes(code, 0x1000).is_err());
    }
}
