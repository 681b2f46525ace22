//! Message lifecycle accounting.
//!
//! The [`MessageTracker`] follows every message from its creation to its
//! delivery, abortion or deletion and keeps the run-wide [`MessageStats`].
//!
//! ```text
//!            created              transferred(final)
//! Unseen ─────────────► Created ─────────────────────► Delivered
//!                          │
//!                          ├── transfer aborted ─────► Aborted
//!                          └── deleted ──────────────► Deleted
//! ```
//!
//! A message is a family of copies: a copy may be aborted or deleted on
//! one host while another copy is still travelling. The creation time of
//! a message is therefore kept for the whole run.

use crate::{
    host::HostId,
    message::{Message, MessageId},
    stats::Summary,
    time::SimTime,
    warmup::WarmupFilter,
};
use std::collections::HashMap;

/// Run-wide message counters and samples.
///
/// Only the [`MessageTracker`] updates it. Messages excluded by the
/// warm-up period never appear in any field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageStats {
    pub created: u64,
    pub started: u64,
    pub relayed: u64,
    pub aborted: u64,
    pub dropped: u64,
    pub removed: u64,
    pub delivered: u64,
    pub response_created: u64,
    pub response_delivered: u64,

    /// creation to delivery, in simulated seconds
    pub latencies: Vec<f64>,
    /// relay transfers of every delivered message
    pub hop_counts: Vec<usize>,
    /// time deleted copies spent in a buffer
    pub buffer_times: Vec<f64>,
    /// request creation to response delivery
    pub rtts: Vec<f64>,
}

impl MessageStats {
    /// `delivered / created`, `None` until a message was created.
    pub fn delivery_probability(&self) -> Option<f64> {
        ratio(self.delivered, self.created)
    }

    /// `response_delivered / response_created`
    pub fn response_probability(&self) -> Option<f64> {
        ratio(self.response_delivered, self.response_created)
    }

    /// `(relayed - delivered) / delivered`, the extra transfers paid for
    /// every delivery.
    pub fn overhead_ratio(&self) -> Option<f64> {
        if self.delivered == 0 {
            return None;
        }
        Some((self.relayed as f64 - self.delivered as f64) / self.delivered as f64)
    }

    pub fn latency(&self) -> Option<Summary> {
        Summary::of(&self.latencies)
    }

    pub fn hop_count(&self) -> Option<Summary> {
        Summary::of_counts(&self.hop_counts)
    }

    pub fn buffer_time(&self) -> Option<Summary> {
        Summary::of(&self.buffer_times)
    }

    pub fn rtt(&self) -> Option<Summary> {
        Summary::of(&self.rtts)
    }
}

fn ratio(numerator: u64, denominator: u64) -> Option<f64> {
    (denominator > 0).then(|| numerator as f64 / denominator as f64)
}

/// Consumes the message lifecycle events and maintains [`MessageStats`].
///
/// # Example
///
/// ```
/// # use netreport_core::{
/// #     host::HostId, message::{Message, MessageId}, tracker::MessageTracker,
/// #     warmup::WarmupFilter, SimTime,
/// # };
/// let mut tracker = MessageTracker::new(WarmupFilter::disabled());
/// let (a, b) = (HostId::new(1), HostId::new(2));
///
/// let mut message = Message::builder().id(MessageId::new(1)).build().unwrap();
/// tracker.created(SimTime::from_secs(0.0), &message);
/// tracker.transfer_started(&message, a, b);
/// message.push_hop(SimTime::from_secs(12.0));
/// tracker.transferred(SimTime::from_secs(12.0), &message, a, b, true);
///
/// assert_eq!(tracker.stats().delivered, 1);
/// assert_eq!(tracker.stats().latencies, vec![12.0]);
/// assert_eq!(tracker.stats().hop_counts, vec![1]);
/// ```
///
/// # Known limitation
///
/// The creation time of every tracked message is kept until the end of
/// the run, so memory grows with the number of messages created. A copy
/// may still be delivered after another copy was, the tracker cannot
/// tell when the last one is gone.
#[derive(Debug, Clone, Default)]
pub struct MessageTracker {
    warmup: WarmupFilter,
    creation_times: HashMap<MessageId, SimTime>,
    stats: MessageStats,
}

impl MessageTracker {
    pub fn new(warmup: WarmupFilter) -> Self {
        Self {
            warmup,
            creation_times: HashMap::new(),
            stats: MessageStats::default(),
        }
    }

    #[inline]
    pub fn stats(&self) -> &MessageStats {
        &self.stats
    }

    #[inline]
    pub fn warmup(&self) -> &WarmupFilter {
        &self.warmup
    }

    /// number of messages whose creation time is kept
    pub fn tracked_messages(&self) -> usize {
        self.creation_times.len()
    }

    /// creation time of a tracked message
    pub fn created_at(&self, id: MessageId) -> Option<SimTime> {
        self.creation_times.get(&id).copied()
    }

    /// `true` if the events of `id` are ignored.
    #[inline]
    pub fn is_excluded(&self, id: MessageId) -> bool {
        self.warmup.is_excluded(id)
    }

    /// A new message was created.
    ///
    /// During the warm-up period the message is excluded for the rest of
    /// the run and nothing is counted.
    pub fn created(&mut self, now: SimTime, message: &Message) {
        let id = message.id();
        if self.warmup.is_active(now) {
            tracing::debug!(%id, %now, "message created during warm-up, excluded");
            self.warmup.register(id);
            return;
        }

        self.creation_times.insert(id, now);
        self.stats.created += 1;
        if message.expects_response() {
            self.stats.response_created += 1;
        }
    }

    pub fn transfer_started(&mut self, message: &Message, _from: HostId, _to: HostId) {
        if self.is_excluded(message.id()) {
            return;
        }

        self.stats.started += 1;
    }

    /// A copy of the message arrived at `to`. `final_target` is set when
    /// `to` is the destination of the message.
    pub fn transferred(
        &mut self,
        now: SimTime,
        message: &Message,
        from: HostId,
        to: HostId,
        final_target: bool,
    ) {
        let id = message.id();
        if self.is_excluded(id) {
            return;
        }

        self.stats.relayed += 1;
        if !final_target {
            return;
        }

        let latency = match self.created_at(id) {
            Some(created_at) => non_negative(now.elapsed_since(created_at), id, "latency"),
            None => {
                tracing::warn!(
                    %id, %from, %to, %now,
                    "delivery of an unknown message, recording a zero latency"
                );
                0.0
            }
        };
        self.stats.latencies.push(latency);
        self.stats.delivered += 1;
        self.stats.hop_counts.push(message.hop_count());

        if let Some(request) = message.request() {
            let rtt = non_negative(now.elapsed_since(request.created_at), id, "round trip time");
            self.stats.rtts.push(rtt);
            self.stats.response_delivered += 1;
        }
    }

    pub fn transfer_aborted(&mut self, message: &Message, _from: HostId, _to: HostId) {
        if self.is_excluded(message.id()) {
            return;
        }

        self.stats.aborted += 1;
    }

    /// A copy was removed from the buffer of `at`. `dropped` is set when
    /// the removal was forced (buffer overflow, expired TTL).
    pub fn deleted(&mut self, now: SimTime, message: &Message, at: HostId, dropped: bool) {
        let id = message.id();
        if self.is_excluded(id) {
            return;
        }

        self.stats.removed += 1;
        if dropped {
            self.stats.dropped += 1;
        }

        let buffer_time = now.elapsed_since(message.received_at());
        if buffer_time < 0.0 {
            tracing::warn!(%id, %at, %now, "message deleted before it was received");
        }
        self.stats.buffer_times.push(buffer_time.max(0.0));
    }
}

fn non_negative(elapsed: f64, id: MessageId, what: &str) -> f64 {
    if elapsed < 0.0 {
        tracing::warn!(%id, elapsed, "negative {what}, recording zero");
        0.0
    } else {
        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Request;

    const A: HostId = HostId::new(1);
    const B: HostId = HostId::new(2);

    fn t(secs: f64) -> SimTime {
        SimTime::from_secs(secs)
    }

    fn message(id: u64) -> Message {
        Message::builder().id(MessageId::new(id)).build().unwrap()
    }

    #[test]
    fn created_counts_responses() {
        let mut tracker = MessageTracker::default();
        tracker.created(t(1.0), &message(1));
        let with_response = Message::builder()
            .id(MessageId::new(2))
            .response_size(512)
            .build()
            .unwrap();
        tracker.created(t(1.0), &with_response);

        assert_eq!(tracker.stats().created, 2);
        assert_eq!(tracker.stats().response_created, 1);
        assert_eq!(tracker.created_at(MessageId::new(2)), Some(t(1.0)));
    }

    #[test]
    fn relay_and_delivery() {
        let mut tracker = MessageTracker::default();
        let mut msg = message(1);
        tracker.created(t(2.0), &msg);

        msg.push_hop(t(5.0));
        tracker.transferred(t(5.0), &msg, A, B, false);
        msg.push_hop(t(9.0));
        tracker.transferred(t(9.0), &msg, B, A, true);

        let stats = tracker.stats();
        assert_eq!(stats.relayed, 2);
        assert_eq!(stats.delivered, 1);
        assert_eq!(stats.latencies, vec![7.0]);
        assert_eq!(stats.hop_counts, vec![2]);
        assert_eq!(stats.overhead_ratio(), Some(1.0));
        assert_eq!(stats.delivery_probability(), Some(1.0));
    }

    #[test]
    fn response_delivery_records_rtt() {
        let mut tracker = MessageTracker::default();
        let request = Message::builder()
            .id(MessageId::new(1))
            .response_size(64)
            .build()
            .unwrap();
        tracker.created(t(10.0), &request);

        let response = Message::builder()
            .id(MessageId::new(2))
            .path_len(2)
            .response_to(Request::new(request.id(), t(10.0)))
            .build()
            .unwrap();
        tracker.created(t(20.0), &response);
        tracker.transferred(t(26.0), &response, B, A, true);

        let stats = tracker.stats();
        assert_eq!(stats.rtts, vec![16.0]);
        assert_eq!(stats.latencies, vec![6.0]);
        assert_eq!(stats.response_delivered, 1);
        assert_eq!(stats.response_probability(), Some(1.0));
    }

    #[test]
    fn creation_times_outlive_delivery() {
        let mut tracker = MessageTracker::default();
        let mut msg = message(1);
        tracker.created(t(0.0), &msg);
        tracker.created(t(1.0), &message(2));

        msg.push_hop(t(4.0));
        tracker.transferred(t(4.0), &msg, A, B, true);
        assert_eq!(tracker.tracked_messages(), 2);

        // a second copy reaching the destination still finds the creation time
        tracker.transferred(t(6.0), &msg, B, A, true);
        assert_eq!(tracker.stats().latencies, vec![4.0, 6.0]);
    }

    #[test]
    fn rtt_is_never_negative() {
        let mut tracker = MessageTracker::default();
        let response = Message::builder()
            .id(MessageId::new(2))
            .response_to(Request::new(MessageId::new(1), t(50.0)))
            .build()
            .unwrap();
        tracker.created(t(20.0), &response);
        tracker.transferred(t(30.0), &response, A, B, true);

        assert_eq!(tracker.stats().rtts, vec![0.0]);
    }

    #[test]
    fn unknown_message_delivery_is_zero_latency() {
        let mut tracker = MessageTracker::default();
        tracker.transferred(t(30.0), &message(9), A, B, true);

        let stats = tracker.stats();
        assert_eq!(stats.delivered, 1);
        assert_eq!(stats.relayed, 1);
        assert_eq!(stats.latencies, vec![0.0]);
        assert_eq!(stats.hop_counts, vec![0]);
    }

    #[test]
    fn abort_and_delete() {
        let mut tracker = MessageTracker::default();
        let msg = Message::builder()
            .id(MessageId::new(1))
            .received_at(t(3.0))
            .build()
            .unwrap();
        tracker.created(t(1.0), &msg);
        tracker.transfer_started(&msg, A, B);
        tracker.transfer_aborted(&msg, A, B);
        tracker.deleted(t(8.0), &msg, A, false);
        tracker.deleted(t(10.0), &msg, B, true);

        let stats = tracker.stats();
        assert_eq!(stats.started, 1);
        assert_eq!(stats.aborted, 1);
        assert_eq!(stats.removed, 2);
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.buffer_times, vec![5.0, 7.0]);
    }

    #[test]
    fn warmup_messages_are_never_counted() {
        let mut tracker = MessageTracker::new(WarmupFilter::new(t(5.0)));
        let msg = message(2);
        tracker.created(t(2.0), &msg);

        tracker.transfer_started(&msg, A, B);
        tracker.transfer_aborted(&msg, A, B);
        tracker.transferred(t(8.0), &msg, A, B, false);
        tracker.transferred(t(9.0), &msg, B, A, true);
        tracker.deleted(t(10.0), &msg, A, true);

        assert_eq!(tracker.stats(), &MessageStats::default());
        assert!(tracker.is_excluded(msg.id()));
        assert_eq!(tracker.created_at(msg.id()), None);
    }

    #[test]
    fn messages_after_warmup_are_counted() {
        let mut tracker = MessageTracker::new(WarmupFilter::new(t(5.0)));
        tracker.created(t(5.0), &message(3));
        tracker.transferred(t(8.0), &message(3), A, B, true);

        assert_eq!(tracker.stats().created, 1);
        assert_eq!(tracker.stats().latencies, vec![3.0]);
    }

    #[test]
    fn ratios_without_samples() {
        let stats = MessageStats::default();
        assert_eq!(stats.delivery_probability(), None);
        assert_eq!(stats.overhead_ratio(), None);
        assert!(stats.latency().is_none());
    }
}
