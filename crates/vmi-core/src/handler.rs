use crate::{VmiEvent, VmiEventResponse, VmiFullDriver, VmiSession};

/// A trait for handling VMI events.
///
/// A factory that creates a handler implementing this trait is passed to
/// [`VmiSession::handle`] to drive the main event loop.
pub trait VmiHandler<Driver>
where
    Driver: VmiFullDriver,
{
    /// The value produced once the handler has finished processing events.
    type Output;

    /// Handles a VMI event.
    fn handle_event(
        &mut self,
        session: &VmiSession<Driver>,
        event: &VmiEvent<Driver::Architecture>,
    ) -> VmiEventResponse<Driver::Architecture>;

    /// Handles a timeout while waiting for an event.
    fn handle_timeout(&mut self, _session: &VmiSession<Driver>) {}

    /// Handles an interrupted wait (e.g. a delivered signal).
    fn handle_interrupted(&mut self, _session: &VmiSession<Driver>) {}

    /// Returns `Some` once the handler is done, ending the event loop.
    fn check_completion(&self) -> Option<Self::Output> {
        None
    }
}
