use std::{io::ErrorKind, time::Duration};

use crate::{VmiCore, VmiError, VmiFullDriver, VmiHandler};

/// A VMI session.
///
/// A thin wrapper around [`VmiCore`] that drives the main event loop: wait
/// for an event, dispatch it to a [`VmiHandler`], repeat until the handler
/// reports completion.
pub struct VmiSession<'a, Driver>
where
    Driver: VmiFullDriver,
{
    core: &'a VmiCore<Driver>,
}

impl<Driver> Clone for VmiSession<'_, Driver>
where
    Driver: VmiFullDriver,
{
    fn clone(&self) -> Self {
        *self
    }
}

impl<Driver> Copy for VmiSession<'_, Driver> where Driver: VmiFullDriver {}

impl<Driver> std::ops::Deref for VmiSession<'_, Driver>
where
    Driver: VmiFullDriver,
{
    type Target = VmiCore<Driver>;

    fn deref(&self) -> &Self::Target {
        self.core
    }
}

impl<'a, Driver> VmiSession<'a, Driver>
where
    Driver: VmiFullDriver,
{
    /// Creates a new VMI session around the given core.
    pub fn new(core: &'a VmiCore<Driver>) -> Self {
        Self { core }
    }

    /// Returns the underlying VMI core.
    pub fn core(&self) -> &'a VmiCore<Driver> {
        self.core
    }
}

impl<'a, Driver> VmiSession<'a, Driver>
where
    Driver: VmiEventControl,
{
    /// Waits for an event to occur and dispatches it to the handler.
    pub fn wait_for_event(
        &self,
        timeout: Duration,
        handler: &mut impl VmiHandler<Driver>,
    ) -> Result<(), VmiError> {
        self.core
            .wait_for_event(timeout, |event| handler.handle_event(self, event))
    }
}

impl<'a, Driver> VmiSession<'a, Driver>
where
    Driver: VmiEventControl + VmiVmControl,
{
    /// Enters the main event loop, using the default 5-second poll timeout.
    pub fn handle<Handler>(
        &self,
        handler_factory: impl FnOnce(&VmiSession<Driver>) -> Result<Handler, VmiError>,
    ) -> Result<Option<Handler::Output>, VmiError>
    where
        Handler: VmiHandler<Driver>,
    {
        self.handle_with_timeout(Duration::from_millis(5000), handler_factory)
    }

    /// Enters the main event loop with an explicit poll timeout.
    ///
    /// Blocks waiting for events and dispatching them to the handler until
    /// [`VmiHandler::check_completion`] returns `Some`, or until a signal
    /// interrupts the wait. Before returning, the event monitors are reset
    /// and any events still pending are drained with a zero timeout so the
    /// virtual machine is left in a clean state.
    pub fn handle_with_timeout<Handler>(
        &self,
        timeout: Duration,
        handler_factory: impl FnOnce(&VmiSession<Driver>) -> Result<Handler, VmiError>,
    ) -> Result<Option<Handler::Output>, VmiError>
    where
        Handler: VmiHandler<Driver>,
    {
        let mut result;
        let mut handler = handler_factory(self)?;

        loop {
            result = handler.check_completion();

            if result.is_some() {
                break;
            }

            match self.wait_for_event(timeout, &mut handler) {
                Err(VmiError::Timeout) => {
                    tracing::trace!("timeout");
                    handler.handle_timeout(self);
                }
                Err(VmiError::Io(err)) if err.kind() == ErrorKind::Interrupted => {
                    tracing::trace!("interrupted");
                    handler.handle_interrupted(self);
                    break;
                }
                Err(err) => return Err(err),
                Ok(_) => {}
            }
        }

        tracing::trace!("disabling monitor");
        self.core.reset_state()?;
        tracing::trace!(pending_events = self.events_pending());

        let _pause_guard = self.pause_guard()?;
        if self.events_pending() > 0 {
            match self.wait_for_event(Duration::from_millis(0), &mut handler) {
                Err(VmiError::Timeout) => {
                    tracing::trace!("timeout");
                }
                Err(err) => return Err(err),
                Ok(_) => {}
            }
        }

        Ok(result)
    }
}
