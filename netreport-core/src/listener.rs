use crate::{
    host::{Host, HostId},
    message::Message,
    report::ReportError,
    time::SimTime,
};

/// Receives the periodic world update of the simulation engine.
pub trait UpdateListener {
    /// Called once per world update with the current host set.
    fn updated<H: Host>(&mut self, now: SimTime, hosts: &[H]) -> Result<(), ReportError>;
}

/// Receives the message lifecycle events of the simulation engine.
///
/// Every event has a defined behaviour, none of them is optional.
pub trait MessageListener {
    fn new_message(&mut self, now: SimTime, message: &Message) -> Result<(), ReportError>;

    fn message_transfer_started(
        &mut self,
        now: SimTime,
        message: &Message,
        from: HostId,
        to: HostId,
    ) -> Result<(), ReportError>;

    fn message_transferred(
        &mut self,
        now: SimTime,
        message: &Message,
        from: HostId,
        to: HostId,
        final_target: bool,
    ) -> Result<(), ReportError>;

    fn message_transfer_aborted(
        &mut self,
        now: SimTime,
        message: &Message,
        from: HostId,
        to: HostId,
    ) -> Result<(), ReportError>;

    fn message_deleted(
        &mut self,
        now: SimTime,
        message: &Message,
        at: HostId,
        dropped: bool,
    ) -> Result<(), ReportError>;
}
