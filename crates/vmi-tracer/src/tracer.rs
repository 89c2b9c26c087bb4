use std::sync::{atomic::{AtomicBool, Ordering}, Arc};

use indexmap::IndexMap;
use vmi_core::{
    arch::{EventInterrupt as _, EventMemoryAccess as _, EventReason as _, EventSinglestep as _},
    Architecture, Gfn, MemoryAccess, Pa, Registers as _, Va, VcpuId, VmiCore, VmiEvent,
    VmiEventResponse, VmiFullDriver, VmiHandler, VmiSession,
};

use crate::{
    breakpoint::RETURN_SITE_IDENTIFIER,
    dispatch::CallbackDispatcher,
    error::Result,
    locate::EntryPointLocator,
    pidtid::{GuestIdentity, Pid, Tid},
    table::TrapTable,
};

/// User-supplied entry/return callbacks, invoked by the [`Tracer`] on
/// syscall entry and return.
///
/// Both callbacks may observe guest memory and registers through `session`;
/// neither may modify guest state - that is the tracer's own privilege,
/// exercised only to maintain the breakpoint/coherence machinery.
pub trait SyscallHandler<Driver>
where
    Driver: VmiFullDriver,
{
    /// Opaque state threaded from the entry callback to the matching return
    /// callback for the same invocation.
    type State;

    /// Invoked when a monitored syscall is entered.
    fn on_entry(
        &mut self,
        session: &VmiSession<Driver>,
        event: &VmiEvent<Driver::Architecture>,
        pid: Pid,
        tid: Tid,
        syscall: &str,
    ) -> Self::State;

    /// Invoked when a monitored syscall returns.
    ///
    /// `state` is exactly the value returned by the matching [`on_entry`]
    /// call; the callback is responsible for releasing any resources it
    /// holds.
    ///
    /// [`on_entry`]: SyscallHandler::on_entry
    fn on_return(
        &mut self,
        session: &VmiSession<Driver>,
        event: &VmiEvent<Driver::Architecture>,
        pid: Pid,
        tid: Tid,
        state: Self::State,
    );
}

/// The stealthy breakpoint engine.
///
/// Implements [`VmiHandler`] so it can be driven directly by
/// [`VmiSession::handle`]. Owns the trap table, the per-invocation
/// dispatcher, and the shutdown flag checked between polls.
///
/// Holds the [`VmiCore`] it was installed against so that [`Drop`] can
/// restore every instrumented byte even if the caller never calls
/// [`Tracer::teardown`] explicitly - the same RAII shape as
/// [`vmi_core::VmiPauseGuard`].
pub struct Tracer<'a, Driver, Identity, Handler>
where
    Driver: VmiFullDriver,
    Identity: GuestIdentity<Driver>,
    Handler: SyscallHandler<Driver>,
{
    vmi: &'a VmiCore<Driver>,
    table: TrapTable,
    syscalls: IndexMap<u16, String>,
    return_site: Option<(Gfn, Pa)>,
    identity: Identity,
    handler: Handler,
    dispatcher: CallbackDispatcher<Handler::State>,
    pending_rearm: IndexMap<VcpuId, (Gfn, Pa)>,
    shutdown: Arc<AtomicBool>,
    torn_down: bool,
}

impl<'a, Driver, Identity, Handler> Tracer<'a, Driver, Identity, Handler>
where
    Driver: VmiFullDriver,
    Identity: GuestIdentity<Driver>,
    Handler: SyscallHandler<Driver>,
{
    /// Builds a tracer and performs the full installation sequence:
    ///
    /// 1. Locate the return site inside the fast-syscall dispatcher at
    ///    `dispatcher_va` (resolved by the caller, typically from `MSR_LSTAR`
    ///    - reading a model-specific register is architecture glue the core
    ///    tracer does not perform itself).
    /// 2. Install the return-site trap, left disabled.
    /// 3. Install a trap for every configured syscall name.
    ///
    /// Per the initialization order, the caller is expected to have already
    /// paused the guest; this constructor does not pause or resume it.
    pub fn install(
        vmi: &'a VmiCore<Driver>,
        locator: &EntryPointLocator<'_>,
        dispatcher_va: Va,
        syscall_names: &[String],
        identity: Identity,
        handler: Handler,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self> {
        let registers = vmi.registers(VcpuId(0))?;
        let root = registers.translation_root(dispatcher_va);

        let return_va = locator.find_return_site(vmi, root, dispatcher_va)?;

        let mut table = TrapTable::new();

        let return_record = table.install(vmi, root, return_va, RETURN_SITE_IDENTIFIER)?;
        table.disable(vmi, return_record.parent, return_record.guest_pa)?;
        let return_site = Some((return_record.parent, return_record.guest_pa));

        let mut syscalls = IndexMap::new();
        for (index, name) in syscall_names.iter().enumerate() {
            let identifier = index as u16;
            let va = locator.resolve_syscall(name)?;
            table.install(vmi, root, va, identifier)?;
            syscalls.insert(identifier, name.clone());
        }

        tracing::info!(
            syscalls = syscalls.len(),
            %return_va,
            "tracer installed"
        );

        Ok(Self {
            vmi,
            table,
            syscalls,
            return_site,
            identity,
            handler,
            dispatcher: CallbackDispatcher::new(),
            pending_rearm: IndexMap::new(),
            shutdown,
            torn_down: false,
        })
    }

    /// Destroys the trap table, restoring every instrumented byte.
    ///
    /// Best-effort: every failure is logged at `warn` rather than causing
    /// further failures to be skipped. Idempotent - a second call is a
    /// no-op, so callers may tear down explicitly and still let [`Drop`]
    /// run harmlessly afterward.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        for err in self.table.teardown(self.vmi) {
            tracing::warn!(?err, "failed to restore an instrumented byte");
        }
    }

    fn handle_int3(
        &mut self,
        session: &VmiSession<Driver>,
        event: &VmiEvent<Driver::Architecture>,
    ) -> VmiEventResponse<Driver::Architecture> {
        let vcpu = event.vcpu_id();
        let registers = event.registers();

        // The CPU has already advanced rip past the one-byte INT3 opcode.
        let guest_va = Va(registers.instruction_pointer().wrapping_sub(1));
        let root = registers.translation_root(guest_va);

        let Some(record) = self.table.resolve(session.core(), root, guest_va) else {
            tracing::trace!(%guest_va, "int3 at unknown address, reinjecting");
            return VmiEventResponse::reinject_interrupt().and_emulate();
        };

        if let Err(err) = self.table.restore_original(session.core(), record.parent, record.guest_pa) {
            tracing::warn!(?err, %guest_va, "failed to restore original byte for int3");
        }

        let mut rewound = *registers;
        rewound.set_instruction_pointer(guest_va.0);
        let gp = rewound.gp_registers();

        if !record.enabled {
            return VmiEventResponse::default().and_set_registers(gp);
        }

        let (pid, tid) = self
            .identity
            .identity(session.core(), vcpu, registers)
            .unwrap_or((Pid(0), Tid(0)));

        if record.is_return_site() {
            tracing::info!(pid = pid.0, tid = tid.0, "syscall return");

            if let Some(state) = self.dispatcher.take(vcpu, tid) {
                self.handler.on_return(session, event, pid, tid, state);
            }

            if let Err(err) = self.table.disable(session.core(), record.parent, record.guest_pa) {
                tracing::warn!(?err, "failed to disable return-site trap");
            }

            VmiEventResponse::default().and_set_registers(gp)
        }
        else {
            let name = self
                .syscalls
                .get(&record.identifier)
                .map(String::as_str)
                .unwrap_or("<unknown>");

            tracing::info!(pid = pid.0, tid = tid.0, syscall = name, "syscall entry");

            let state = self.handler.on_entry(session, event, pid, tid, name);
            self.dispatcher.store(vcpu, tid, state);

            if let Some((return_page, return_pa)) = self.return_site {
                if let Err(err) = self.table.enable(session.core(), return_page, return_pa) {
                    tracing::warn!(?err, "failed to enable return-site trap");
                }
            }

            self.pending_rearm.insert(vcpu, (record.parent, record.guest_pa));

            VmiEventResponse::toggle_singlestep().and_set_registers(gp)
        }
    }

    fn handle_memory_access(
        &mut self,
        session: &VmiSession<Driver>,
        access: &impl vmi_core::arch::EventMemoryAccess<Architecture = Driver::Architecture>,
    ) -> VmiEventResponse<Driver::Architecture> {
        let page_frame = Driver::Architecture::gfn_from_pa(access.pa());

        let result = if access.access().contains(MemoryAccess::X) {
            self.table.handle_x_trap(session.core(), page_frame)
        }
        else {
            self.table.handle_rw_trap(session.core(), page_frame)
        };

        if let Err(err) = result {
            tracing::warn!(?err, %page_frame, "coherence toggle failed");
        }

        VmiEventResponse::default()
    }

    fn handle_singlestep(
        &mut self,
        session: &VmiSession<Driver>,
        vcpu: VcpuId,
    ) -> VmiEventResponse<Driver::Architecture> {
        if let Some((page_frame, guest_pa)) = self.pending_rearm.shift_remove(&vcpu) {
            if let Err(err) = self.table.rearm(session.core(), page_frame, guest_pa) {
                tracing::warn!(?err, %guest_pa, "failed to re-arm breakpoint after single-step");
            }
        }

        VmiEventResponse::default()
    }
}

impl<Driver, Identity, Handler> Drop for Tracer<'_, Driver, Identity, Handler>
where
    Driver: VmiFullDriver,
    Identity: GuestIdentity<Driver>,
    Handler: SyscallHandler<Driver>,
{
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<Driver, Identity, Handler> VmiHandler<Driver> for Tracer<'_, Driver, Identity, Handler>
where
    Driver: VmiFullDriver,
    Identity: GuestIdentity<Driver>,
    Handler: SyscallHandler<Driver>,
{
    type Output = ();

    fn handle_event(
        &mut self,
        session: &VmiSession<Driver>,
        event: &VmiEvent<Driver::Architecture>,
    ) -> VmiEventResponse<Driver::Architecture> {
        session.flush_v2p_cache();

        let reason = event.reason();

        if reason.as_software_breakpoint().is_some() {
            return self.handle_int3(session, event);
        }

        if let Some(access) = reason.as_memory_access() {
            return self.handle_memory_access(session, access);
        }

        if reason.as_singlestep().is_some() {
            return self.handle_singlestep(session, event.vcpu_id());
        }

        VmiEventResponse::default()
    }

    fn check_completion(&self) -> Option<Self::Output> {
        if self.shutdown.load(Ordering::Relaxed) {
            Some(())
        }
        else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use vmi_arch_amd64::{Amd64, Cr3, EventInterrupt, EventReason, EventSinglestep, Interrupt, Registers};
    use vmi_core::{VmiEventFlags, VmiEventResponseFlags, VmiSession};

    use super::*;
    use crate::{locate::SymbolResolver, testutil::MockDriver};

    struct FixedResolver(Va);

    impl SymbolResolver for FixedResolver {
        fn resolve(&self, name: &str) -> Result<Va> {
            match name {
                "NtTest" => Ok(self.0),
                other => Err(crate::error::TracerError::SymbolNotFound(other.to_string())),
            }
        }
    }

    struct FixedIdentity;

    impl GuestIdentity<MockDriver> for FixedIdentity {
        fn identity(&self, _vmi: &VmiCore<MockDriver>, _vcpu: VcpuId, _registers: &Registers) -> Option<(Pid, Tid)> {
            Some((Pid(1), Tid(1)))
        }
    }

    #[derive(Clone, Default)]
    struct EventLog(Rc<RefCell<Vec<String>>>);

    impl EventLog {
        fn push(&self, entry: impl Into<String>) {
            self.0.borrow_mut().push(entry.into());
        }

        fn snapshot(&self) -> Vec<String> {
            self.0.borrow().clone()
        }
    }

    struct LoggingHandler {
        log: EventLog,
    }

    impl SyscallHandler<MockDriver> for LoggingHandler {
        type State = u32;

        fn on_entry(
            &mut self,
            _session: &VmiSession<MockDriver>,
            _event: &VmiEvent<Amd64>,
            pid: Pid,
            tid: Tid,
            syscall: &str,
        ) -> u32 {
            self.log.push(format!("entry:{}:{}:{syscall}", pid.0, tid.0));
            42
        }

        fn on_return(
            &mut self,
            _session: &VmiSession<MockDriver>,
            _event: &VmiEvent<Amd64>,
            pid: Pid,
            tid: Tid,
            state: u32,
        ) {
            self.log.push(format!("return:{}:{}:{state}", pid.0, tid.0));
        }
    }

    fn breakpoint_event(mut registers: Registers, guest_va: Va) -> VmiEvent<Amd64> {
        registers.rip = guest_va.0 + 1;
        VmiEvent::new(
            VcpuId(0),
            VmiEventFlags::empty(),
            registers,
            EventReason::Interrupt(EventInterrupt {
                gfn: Gfn(0),
                interrupt: Interrupt::breakpoint(1),
            }),
        )
    }

    fn singlestep_event(registers: Registers) -> VmiEvent<Amd64> {
        VmiEvent::new(
            VcpuId(0),
            VmiEventFlags::empty(),
            registers,
            EventReason::Singlestep(EventSinglestep { gfn: Gfn(0) }),
        )
    }

    /// Builds a guest with a crafted `mov eax,1; call r10; nop` dispatcher and
    /// a single `NtTest` syscall entry point, and installs a [`Tracer`]
    /// against it.
    fn install_tracer(
        guest: &MockDriver,
        vmi: &VmiCore<MockDriver>,
        log: EventLog,
    ) -> (Va, Va, Registers, Tracer<'_, MockDriver, FixedIdentity, LoggingHandler>) {
        let dispatcher_va = Va(0x1000);
        let entry_va = Va(0x9000);

        let dispatcher_pa = guest.map(dispatcher_va.0);
        #[rustfmt::skip]
        let code: &[u8] = &[
            0xb8, 0x01, 0x00, 0x00, 0x00, // mov eax, 1
            0x41, 0xff, 0xd2,             // call r10
            0x90,                         // nop (return site)
        ];
        vmi.write(dispatcher_pa, code).unwrap();

        let entry_pa = guest.map(entry_va.0);
        vmi.write_u8(entry_pa, 0x90).unwrap();

        let mut registers = Registers::default();
        registers.cr3 = Cr3(guest.root().0);
        guest.set_registers_for_test(VcpuId(0), registers);

        let resolver = FixedResolver(entry_va);
        let locator = EntryPointLocator::new(&resolver);
        let shutdown = Arc::new(AtomicBool::new(false));
        let handler = LoggingHandler { log };

        let tracer = Tracer::install(
            vmi,
            &locator,
            dispatcher_va,
            &["NtTest".to_string()],
            FixedIdentity,
            handler,
            shutdown,
        )
        .expect("install succeeds");

        (dispatcher_va, entry_va, registers, tracer)
    }

    #[test]
    fn s2_int3_at_unknown_address_reinjects_without_invoking_callbacks() {
        let driver = MockDriver::new();
        let guest = driver.clone();
        let vmi = VmiCore::new(driver).unwrap();
        let log = EventLog::default();
        let (_, _, registers, mut tracer) = install_tracer(&guest, &vmi, log.clone());
        let session = VmiSession::new(&vmi);

        let unknown_va = Va(0x20000);
        guest.map(unknown_va.0);

        let event = breakpoint_event(registers, unknown_va);
        let response = tracer.handle_event(&session, &event);

        assert!(response.flags.contains(VmiEventResponseFlags::REINJECT_INTERRUPT));
        assert!(response.flags.contains(VmiEventResponseFlags::EMULATE));
        assert!(log.snapshot().is_empty());
    }

    #[test]
    fn s3_and_s4_entry_then_return_chain_through_singlestep() {
        let driver = MockDriver::new();
        let guest = driver.clone();
        let vmi = VmiCore::new(driver).unwrap();
        let log = EventLog::default();
        let (dispatcher_va, entry_va, registers, mut tracer) = install_tracer(&guest, &vmi, log.clone());
        let session = VmiSession::new(&vmi);

        let entry_pa = guest.map(entry_va.0);
        let return_va = Va(dispatcher_va.0 + 8);
        let return_pa = guest.map(return_va.0);

        assert_eq!(guest.byte_at(entry_pa), 0xcc, "entry armed at install");
        assert_eq!(guest.byte_at(return_pa), 0x90, "return site starts disabled");

        // S3: the entry breakpoint fires.
        let entry_event = breakpoint_event(registers, entry_va);
        let response = tracer.handle_event(&session, &entry_event);

        assert!(response.flags.contains(VmiEventResponseFlags::TOGGLE_SINGLESTEP));
        assert_eq!(guest.byte_at(entry_pa), 0x90, "original byte restored before single-step");
        assert_eq!(guest.byte_at(return_pa), 0xcc, "return site armed on entry");
        assert_eq!(log.snapshot(), vec!["entry:1:1:NtTest".to_string()]);

        let step_event = singlestep_event(registers);
        tracer.handle_event(&session, &step_event);
        assert_eq!(guest.byte_at(entry_pa), 0xcc, "entry re-armed after single-step");

        // S4: the return breakpoint fires.
        let return_event = breakpoint_event(registers, return_va);
        let response = tracer.handle_event(&session, &return_event);

        assert!(!response.flags.contains(VmiEventResponseFlags::TOGGLE_SINGLESTEP));
        assert_eq!(guest.byte_at(return_pa), 0x90, "return site disabled again");
        assert_eq!(
            log.snapshot(),
            vec!["entry:1:1:NtTest".to_string(), "return:1:1:42".to_string()]
        );

        tracer.teardown();
    }
}
