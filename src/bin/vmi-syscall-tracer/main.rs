//! Operator binary: attaches to a running Xen guest, locates its kernel,
//! loads a matching `isr` profile, and runs the stealthy syscall tracer
//! until a termination signal arrives.

mod kernel;

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use isr::{
    cache::{IsrCache, JsonCodec},
    macros::symbols,
};
use vmi_arch_amd64::Amd64;
use vmi_core::{Architecture as _, Registers as _, VcpuId, Va, VmiCore};
use vmi_driver_xen::XenDriver;
use vmi_tracer::{EntryPointLocator, GuestIdentity, Pid, SyscallHandler, SymbolResolver, Tid, Tracer, TracerError};
use xen::XenStore;

symbols! {
    #[derive(Debug)]
    struct Symbols {
        NtCreateFile: u64,
        NtOpenSymbolicLinkObject: u64,
        NtOpenDirectoryObject: u64,
        NtOpenProcess: u64,
    }
}

const DEFAULT_SYSCALLS: &[&str] = &[
    "NtCreateFile",
    "NtOpenSymbolicLinkObject",
    "NtOpenDirectoryObject",
    "NtOpenProcess",
];

const DEFAULT_POLL_TIMEOUT_MS: u64 = 500;

struct ProfileResolver {
    kernel_base: Va,
    symbols: Symbols,
}

impl SymbolResolver for ProfileResolver {
    fn resolve(&self, name: &str) -> vmi_tracer::Result<Va> {
        let rva = match name {
            "NtCreateFile" => self.symbols.NtCreateFile,
            "NtOpenSymbolicLinkObject" => self.symbols.NtOpenSymbolicLinkObject,
            "NtOpenDirectoryObject" => self.symbols.NtOpenDirectoryObject,
            "NtOpenProcess" => self.symbols.NtOpenProcess,
            _ => return Err(TracerError::SymbolNotFound(name.to_string())),
        };

        Ok(Va(self.kernel_base.0 + rva))
    }
}

/// Approximates process/thread identity from `CR3` and the vCPU that took
/// the trap.
///
/// A precise identity requires walking `KPCR` -> `KTHREAD` -> `EPROCESS`,
/// which is Windows-struct-layout glue well outside the breakpoint engine's
/// scope; this approximation is enough to group entry/return pairs and to
/// distinguish one guest process from another in log output. See
/// `DESIGN.md` for the open-question decision.
struct Cr3Identity;

impl<Driver> GuestIdentity<Driver> for Cr3Identity
where
    Driver: vmi_core::VmiFullDriver,
{
    fn identity(
        &self,
        _vmi: &VmiCore<Driver>,
        vcpu: VcpuId,
        registers: &<Driver::Architecture as vmi_core::Architecture>::Registers,
    ) -> Option<(Pid, Tid)> {
        let root = registers.translation_root(Va(0));
        Some((Pid(root.0), Tid(u64::from(u16::from(vcpu)))))
    }
}

struct LoggingHandler;

impl<Driver> SyscallHandler<Driver> for LoggingHandler
where
    Driver: vmi_core::VmiFullDriver,
{
    type State = ();

    fn on_entry(
        &mut self,
        _session: &vmi_core::VmiSession<Driver>,
        _event: &vmi_core::VmiEvent<Driver::Architecture>,
        pid: Pid,
        tid: Tid,
        syscall: &str,
    ) {
        tracing::info!(pid = pid.0, tid = tid.0, syscall, "entry");
    }

    fn on_return(
        &mut self,
        _session: &vmi_core::VmiSession<Driver>,
        _event: &vmi_core::VmiEvent<Driver::Architecture>,
        pid: Pid,
        tid: Tid,
        _state: (),
    ) {
        tracing::info!(pid = pid.0, tid = tid.0, "return");
    }
}

fn parse_args() -> (String, Vec<String>, u64) {
    let mut args = std::env::args().skip(1);
    let vm_name = args.next().unwrap_or_else(|| {
        eprintln!("usage: vmi-syscall-tracer <vm-name> [syscall ...]");
        std::process::exit(2);
    });

    let syscalls: Vec<String> = args.collect();
    let syscalls = if syscalls.is_empty() {
        DEFAULT_SYSCALLS.iter().map(|s| s.to_string()).collect()
    }
    else {
        syscalls
    };

    (vm_name, syscalls, DEFAULT_POLL_TIMEOUT_MS)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let (vm_name, syscalls, poll_timeout_ms) = parse_args();

    let domain_id = XenStore::domain_id_from_name(&vm_name)?
        .unwrap_or_else(|| panic!("domain {vm_name:?} not found"));
    tracing::info!(%vm_name, ?domain_id, "attached to domain");

    let driver = XenDriver::<Amd64>::new(domain_id)?;
    let core = VmiCore::new(driver)?;

    let (kernel_base, codeview) = {
        let _pause_guard = core.pause_guard()?;
        let registers = core.registers(VcpuId(0))?;
        let root = registers.translation_root(Va(0));

        let info = kernel::find_kernel(&core, root, registers.msr_lstar)?
            .expect("kernel image not found within search window");

        (info.base_address, info.codeview)
    };
    tracing::info!(%kernel_base, "located kernel image");

    let isr = IsrCache::<JsonCodec>::new("cache")?;
    let entry = isr.entry_from_codeview(codeview)?;
    let profile = entry.profile()?;
    let symbols = Symbols::new(&profile)?;

    let resolver = ProfileResolver { kernel_base, symbols };
    let locator = EntryPointLocator::new(&resolver);

    let shutdown = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGHUP, shutdown.clone())?;
    signal_hook::flag::register(signal_hook::consts::SIGINT, shutdown.clone())?;
    signal_hook::flag::register(signal_hook::consts::SIGALRM, shutdown.clone())?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, shutdown.clone())?;

    let dispatcher_va = {
        let registers = core.registers(VcpuId(0))?;
        Va(registers.msr_lstar)
    };

    let session = vmi_core::VmiSession::new(&core);

    let tracer = {
        let _pause_guard = core.pause_guard()?;
        Tracer::install(&core, &locator, dispatcher_va, &syscalls, Cr3Identity, LoggingHandler, shutdown)?
    };

    let result = session.handle_with_timeout(Duration::from_millis(poll_timeout_ms), |_session| Ok(tracer));

    match result {
        Ok(_) => {}
        Err(err) => tracing::error!(?err, "event loop terminated with an error"),
    }

    Ok(())
}
