//! A small seeded world driving the reports.
//!
//! [`SyntheticWorld`] is not a network simulator: hosts meet at random,
//! copy messages to each other epidemic style and drop the oldest copies
//! when their buffer overflows. It exists to exercise the reports with
//! plausible event sequences (in tests, benchmarks and the demo example)
//! and it is fully deterministic for a given seed.

use anyhow::{Result, bail};
use netreport_core::{
    host::{Host, HostId},
    listener::{MessageListener, UpdateListener},
    message::{Message, MessageId, Request},
    time::SimTime,
};
use rand_chacha::ChaChaRng;
use rand_core::{Rng, SeedableRng as _};
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub hosts: u64,
    /// buffer capacity of every host, in bytes
    pub buffer_size: u64,
    pub min_message_size: u64,
    pub max_message_size: u64,
    /// probability that a message is created during a step
    pub creation_probability: f64,
    /// random host pairs meeting during a step
    pub contacts: usize,
    pub abort_probability: f64,
    /// probability that a new message asks for a response
    pub response_probability: f64,
    /// seconds a copy may stay in a buffer before it is dropped
    pub ttl: f64,
    /// simulated seconds per step
    pub step: f64,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            hosts: 20,
            buffer_size: 5_000_000,
            min_message_size: 100_000,
            max_message_size: 500_000,
            creation_probability: 0.5,
            contacts: 4,
            abort_probability: 0.05,
            response_probability: 0.2,
            ttl: 1_200.0,
            step: 1.0,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone)]
struct Stored {
    message: Message,
    source: HostId,
    destination: HostId,
    size: u64,
    created_at: SimTime,
}

/// A host of the [`SyntheticWorld`].
#[derive(Debug)]
pub struct SyntheticHost {
    id: HostId,
    capacity: u64,
    used: u64,
    buffer: Vec<Stored>,
}

impl SyntheticHost {
    fn holds(&self, id: MessageId) -> bool {
        self.buffer.iter().any(|copy| copy.message.id() == id)
    }

    /// number of message copies in the buffer
    pub fn copies(&self) -> usize {
        self.buffer.len()
    }
}

impl Host for SyntheticHost {
    fn id(&self) -> HostId {
        self.id
    }

    fn buffer_occupancy(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        100.0 * self.used as f64 / self.capacity as f64
    }
}

pub struct SyntheticWorld {
    config: SyntheticConfig,
    rng: ChaChaRng,
    now: SimTime,
    hosts: Vec<SyntheticHost>,
    next_message: u64,
    delivered: HashSet<MessageId>,
}

impl SyntheticWorld {
    /// # Errors
    ///
    /// Fails if the step is not a positive number of seconds, or if the
    /// message size range is empty.
    pub fn new(config: SyntheticConfig) -> Result<Self> {
        if !(config.step.is_finite() && config.step > 0.0) {
            bail!("Step must be a positive number of seconds, got {}", config.step)
        }
        if config.min_message_size > config.max_message_size {
            bail!(
                "Message size range is empty ({}..={})",
                config.min_message_size,
                config.max_message_size
            )
        }

        let hosts = (1..=config.hosts)
            .map(|id| SyntheticHost {
                id: HostId::new(id),
                capacity: config.buffer_size,
                used: 0,
                buffer: Vec::new(),
            })
            .collect();

        Ok(Self {
            rng: ChaChaRng::seed_from_u64(config.seed),
            now: SimTime::ZERO,
            hosts,
            next_message: 0,
            delivered: HashSet::new(),
            config,
        })
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    pub fn hosts(&self) -> &[SyntheticHost] {
        &self.hosts
    }

    /// Run steps until the simulated time reaches `until`.
    pub fn run_until<L>(&mut self, until: SimTime, listener: &mut L) -> Result<()>
    where
        L: UpdateListener + MessageListener,
    {
        while self.now < until {
            self.step(listener)?;
        }
        Ok(())
    }

    /// Advance the world by one step. The listener receives the message
    /// events of the step, then the world update.
    pub fn step<L>(&mut self, listener: &mut L) -> Result<()>
    where
        L: UpdateListener + MessageListener,
    {
        self.now = SimTime::from_secs(self.now.as_secs() + self.config.step);
        let now = self.now;

        self.expire(now, listener)?;

        if chance(&mut self.rng, self.config.creation_probability) {
            self.create(now, listener)?;
        }

        if self.hosts.len() >= 2 {
            for _ in 0..self.config.contacts {
                self.contact(now, listener)?;
            }
        }

        listener.updated(now, &self.hosts)?;
        Ok(())
    }

    fn next_id(&mut self) -> MessageId {
        self.next_message += 1;
        MessageId::new(self.next_message)
    }

    fn create<L: MessageListener>(&mut self, now: SimTime, listener: &mut L) -> Result<()> {
        let Some((source, destination)) = self.pick_pair() else {
            return Ok(());
        };
        let size = between(
            &mut self.rng,
            self.config.min_message_size,
            self.config.max_message_size,
        );
        let response_size = if chance(&mut self.rng, self.config.response_probability) {
            size
        } else {
            0
        };

        let message = Message::builder()
            .id(self.next_id())
            .response_size(response_size)
            .received_at(now)
            .build()?;
        listener.new_message(now, &message)?;

        let copy = Stored {
            message,
            source: self.hosts[source].id,
            destination: self.hosts[destination].id,
            size,
            created_at: now,
        };
        self.store(now, source, copy, listener)
    }

    fn contact<L: MessageListener>(&mut self, now: SimTime, listener: &mut L) -> Result<()> {
        let Some((from, to)) = self.pick_pair() else {
            return Ok(());
        };
        self.purge_delivered(now, from, listener)?;

        let to_id = self.hosts[to].id;
        let candidate = self.hosts[from]
            .buffer
            .iter()
            .find(|copy| !self.hosts[to].holds(copy.message.id()))
            .cloned();
        let Some(mut copy) = candidate else {
            return Ok(());
        };
        let from_id = self.hosts[from].id;

        listener.message_transfer_started(now, &copy.message, from_id, to_id)?;
        if chance(&mut self.rng, self.config.abort_probability) {
            listener.message_transfer_aborted(now, &copy.message, from_id, to_id)?;
            return Ok(());
        }

        copy.message.push_hop(now);
        let final_target = copy.destination == to_id;
        listener.message_transferred(now, &copy.message, from_id, to_id, final_target)?;

        if !final_target {
            return self.store(now, to, copy, listener);
        }

        self.delivered.insert(copy.message.id());
        if copy.message.expects_response() {
            let response = Message::builder()
                .id(self.next_id())
                .response_to(Request::new(copy.message.id(), copy.created_at))
                .received_at(now)
                .build()?;
            listener.new_message(now, &response)?;

            let reply = Stored {
                message: response,
                source: to_id,
                destination: copy.source,
                size: copy.message.response_size(),
                created_at: now,
            };
            self.store(now, to, reply, listener)?;
        }
        Ok(())
    }

    /// Put a copy in the buffer of `host`, dropping the oldest copies
    /// until it fits.
    fn store<L: MessageListener>(
        &mut self,
        now: SimTime,
        host: usize,
        copy: Stored,
        listener: &mut L,
    ) -> Result<()> {
        let host = &mut self.hosts[host];
        if copy.size > host.capacity {
            listener.message_deleted(now, &copy.message, host.id, true)?;
            return Ok(());
        }

        while host.used + copy.size > host.capacity && !host.buffer.is_empty() {
            let oldest = host.buffer.remove(0);
            host.used -= oldest.size;
            listener.message_deleted(now, &oldest.message, host.id, true)?;
        }

        host.used += copy.size;
        host.buffer.push(copy);
        Ok(())
    }

    /// Remove the copies of messages already delivered.
    fn purge_delivered<L: MessageListener>(
        &mut self,
        now: SimTime,
        host: usize,
        listener: &mut L,
    ) -> Result<()> {
        let host = &mut self.hosts[host];
        let (removed, kept) = std::mem::take(&mut host.buffer)
            .into_iter()
            .partition::<Vec<_>, _>(|copy| self.delivered.contains(&copy.message.id()));
        host.buffer = kept;

        for copy in removed {
            host.used -= copy.size;
            listener.message_deleted(now, &copy.message, host.id, false)?;
        }
        Ok(())
    }

    /// Drop the copies older than the configured TTL.
    fn expire<L: MessageListener>(&mut self, now: SimTime, listener: &mut L) -> Result<()> {
        let ttl = self.config.ttl;
        for host in &mut self.hosts {
            let (expired, kept) = std::mem::take(&mut host.buffer)
                .into_iter()
                .partition::<Vec<_>, _>(|copy| now.elapsed_since(copy.created_at) > ttl);
            host.buffer = kept;

            for copy in expired {
                host.used -= copy.size;
                listener.message_deleted(now, &copy.message, host.id, true)?;
            }
        }
        Ok(())
    }

    /// two distinct random hosts
    fn pick_pair(&mut self) -> Option<(usize, usize)> {
        let count = self.hosts.len();
        if count < 2 {
            return None;
        }
        let a = below(&mut self.rng, count);
        let b = (a + 1 + below(&mut self.rng, count - 1)) % count;
        Some((a, b))
    }
}

fn below<R: Rng>(rng: &mut R, bound: usize) -> usize {
    (rng.next_u64() % bound as u64) as usize
}

fn between<R: Rng>(rng: &mut R, min: u64, max: u64) -> u64 {
    if max <= min {
        return min;
    }
    match (max - min).checked_add(1) {
        Some(span) => min + rng.next_u64() % span,
        // the whole u64 range
        None => rng.next_u64(),
    }
}

fn chance<R: Rng>(rng: &mut R, probability: f64) -> bool {
    let bits = rng.next_u64();
    let sample = (bits as f64) * (1.0 / (u64::MAX as f64 + 1.0));
    sample < probability
}

#[cfg(test)]
mod tests {
    use super::*;
    use netreport_core::report::ReportError;

    /// records the events it receives
    #[derive(Default)]
    struct Journal {
        created: HashSet<MessageId>,
        events: Vec<String>,
        ticks: usize,
    }

    impl UpdateListener for Journal {
        fn updated<H: Host>(&mut self, now: SimTime, hosts: &[H]) -> Result<(), ReportError> {
            self.ticks += 1;
            for host in hosts {
                let occupancy = host.buffer_occupancy();
                assert!((0.0..=100.0).contains(&occupancy), "{now}: {occupancy}");
            }
            Ok(())
        }
    }

    impl MessageListener for Journal {
        fn new_message(&mut self, now: SimTime, message: &Message) -> Result<(), ReportError> {
            assert!(self.created.insert(message.id()), "{} created twice", message.id());
            self.events.push(format!("{now} created {}", message.id()));
            Ok(())
        }

        fn message_transfer_started(
            &mut self,
            now: SimTime,
            message: &Message,
            from: HostId,
            to: HostId,
        ) -> Result<(), ReportError> {
            assert_ne!(from, to);
            self.events
                .push(format!("{now} started {} {from} {to}", message.id()));
            Ok(())
        }

        fn message_transferred(
            &mut self,
            now: SimTime,
            message: &Message,
            from: HostId,
            to: HostId,
            final_target: bool,
        ) -> Result<(), ReportError> {
            assert!(self.created.contains(&message.id()));
            self.events.push(format!(
                "{now} transferred {} {from} {to} {final_target}",
                message.id()
            ));
            Ok(())
        }

        fn message_transfer_aborted(
            &mut self,
            now: SimTime,
            message: &Message,
            from: HostId,
            to: HostId,
        ) -> Result<(), ReportError> {
            self.events
                .push(format!("{now} aborted {} {from} {to}", message.id()));
            Ok(())
        }

        fn message_deleted(
            &mut self,
            now: SimTime,
            message: &Message,
            at: HostId,
            dropped: bool,
        ) -> Result<(), ReportError> {
            self.events
                .push(format!("{now} deleted {} {at} {dropped}", message.id()));
            Ok(())
        }
    }

    fn run(seed: u64) -> Journal {
        let mut world = SyntheticWorld::new(SyntheticConfig {
            seed,
            ..SyntheticConfig::default()
        })
        .unwrap();
        let mut journal = Journal::default();
        world
            .run_until(SimTime::from_secs(600.0), &mut journal)
            .unwrap();
        journal
    }

    #[test]
    fn same_seed_same_events() {
        assert_eq!(run(7).events, run(7).events);
        assert_ne!(run(7).events, run(8).events);
    }

    #[test]
    fn one_tick_per_step() {
        let journal = run(1);
        assert_eq!(journal.ticks, 600);
        assert!(!journal.created.is_empty());
    }

    #[test]
    fn buffers_never_overflow() {
        let mut world = SyntheticWorld::new(SyntheticConfig {
            buffer_size: 600_000,
            creation_probability: 1.0,
            ..SyntheticConfig::default()
        })
        .unwrap();
        let mut journal = Journal::default();
        world
            .run_until(SimTime::from_secs(200.0), &mut journal)
            .unwrap();

        assert!(journal.events.iter().any(|event| event.ends_with("true") && event.contains("deleted")));
        for host in world.hosts() {
            assert!(host.used <= host.capacity);
        }
    }

    #[test]
    fn pairs_are_distinct() {
        let mut world = SyntheticWorld::new(SyntheticConfig {
            hosts: 2,
            ..SyntheticConfig::default()
        })
        .unwrap();
        for _ in 0..100 {
            let (a, b) = world.pick_pair().unwrap();
            assert_ne!(a, b);
        }

        let mut lonely = SyntheticWorld::new(SyntheticConfig {
            hosts: 1,
            ..SyntheticConfig::default()
        })
        .unwrap();
        assert!(lonely.pick_pair().is_none());
    }

    #[test]
    fn invalid_configurations_are_rejected() {
        for step in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let Err(error) = SyntheticWorld::new(SyntheticConfig {
                step,
                ..SyntheticConfig::default()
            }) else {
                panic!("a step of {step} should be rejected")
            };
            assert!(error.to_string().starts_with("Step must be a positive"));
        }

        let Err(error) = SyntheticWorld::new(SyntheticConfig {
            min_message_size: 10,
            max_message_size: 1,
            ..SyntheticConfig::default()
        }) else {
            panic!("an empty size range should be rejected")
        };
        assert_eq!(error.to_string(), "Message size range is empty (10..=1)");
    }

    #[test]
    fn full_size_range_does_not_overflow() {
        let mut rng = ChaChaRng::seed_from_u64(3);
        for _ in 0..100 {
            let size = between(&mut rng, 0, u64::MAX);
            let bounded = between(&mut rng, u64::MAX - 1, u64::MAX);
            assert!(bounded >= u64::MAX - 1, "{size} {bounded}");
        }
        assert_eq!(between(&mut rng, 7, 7), 7);
    }
}
