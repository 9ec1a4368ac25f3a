use std::collections::{HashMap, VecDeque};
use std::io;

use super::config::ExerciseConfig;
use super::transport::Transport;
use crate::pdu::{
    CodecError, Pdu, PduBody, PduKind, PduRegistry, encode_datagram, split_header, timestamp_now,
};
use crate::subscription::{SubscriptionId, Subscribers};

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("encode failed: {0}")]
    Codec(#[from] CodecError),
    #[error("transport error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SubscribeError {
    #[error("no decoder registered for {0:?}")]
    Unregistered(PduKind),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionStats {
    pub datagrams_sent: u64,
    pub bytes_sent: u64,
    pub datagrams_received: u64,
    pub bytes_received: u64,
    pub foreign_exercise: u64,
    pub unregistered_kind: u64,
    pub malformed: u64,
    pub dispatched: u64,
}

type PduCallback = dyn FnMut(&Pdu);

/// Inbound queues, subscriber lists and the send path for one exercise.
///
/// Received datagrams are only queued. Decoding and subscriber callbacks
/// happen in [`dispatch`](Self::dispatch), in arrival order per kind.
pub struct ExerciseConnection<T> {
    transport: T,
    config: ExerciseConfig,
    registry: PduRegistry,
    queues: HashMap<PduKind, VecDeque<Vec<u8>>>,
    subscribers: HashMap<PduKind, Subscribers<PduCallback>>,
    timestamp: u32,
    stats: ConnectionStats,
}

impl<T: Transport> ExerciseConnection<T> {
    pub fn new(transport: T, config: ExerciseConfig) -> Self {
        Self::with_registry(transport, config, PduRegistry::default())
    }

    pub fn with_registry(transport: T, config: ExerciseConfig, registry: PduRegistry) -> Self {
        Self {
            transport,
            config,
            registry,
            queues: HashMap::new(),
            subscribers: HashMap::new(),
            timestamp: timestamp_now(),
            stats: ConnectionStats::default(),
        }
    }

    pub fn config(&self) -> &ExerciseConfig {
        &self.config
    }

    pub fn registry(&self) -> &PduRegistry {
        &self.registry
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn stats(&self) -> &ConnectionStats {
        &self.stats
    }

    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    pub fn update_timestamp(&mut self) {
        self.timestamp = timestamp_now();
    }

    pub fn subscribe<B: PduBody>(
        &mut self,
        mut callback: impl FnMut(&B) + 'static,
    ) -> Result<SubscriptionId, SubscribeError> {
        self.subscribe_kind(B::KIND, move |pdu| {
            if let Some(body) = B::from_pdu(pdu) {
                callback(body);
            }
        })
    }

    pub fn subscribe_kind(
        &mut self,
        kind: PduKind,
        callback: impl FnMut(&Pdu) + 'static,
    ) -> Result<SubscriptionId, SubscribeError> {
        if !self.registry.is_registered(kind) {
            return Err(SubscribeError::Unregistered(kind));
        }
        Ok(self
            .subscribers
            .entry(kind)
            .or_default()
            .add(Box::new(callback)))
    }

    /// Removes one callback. A kind left without callbacks is dropped from
    /// the table.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let removed = self
            .subscribers
            .values_mut()
            .any(|subscribers| subscribers.remove(id));
        if removed {
            self.subscribers.retain(|_, subscribers| !subscribers.is_empty());
        }
        removed
    }

    pub fn subscriber_count(&self, kind: PduKind) -> usize {
        self.subscribers.get(&kind).map_or(0, Subscribers::len)
    }

    pub fn queued(&self, kind: PduKind) -> usize {
        self.queues.get(&kind).map_or(0, VecDeque::len)
    }

    /// Pulls datagrams off the transport into the per-kind queues.
    pub fn receive(&mut self) -> io::Result<usize> {
        let datagrams = self.transport.receive()?;
        let count = datagrams.len();
        for datagram in datagrams {
            self.enqueue(&datagram);
        }
        Ok(count)
    }

    /// Queues the body of one raw datagram if it belongs to this exercise.
    pub fn enqueue(&mut self, datagram: &[u8]) {
        self.stats.datagrams_received += 1;
        self.stats.bytes_received += datagram.len() as u64;

        let (header, body) = match split_header(datagram) {
            Ok(parts) => parts,
            Err(e) => {
                log::debug!("dropping datagram with bad header: {e}");
                self.stats.malformed += 1;
                return;
            }
        };

        if header.exercise_id != self.config.exercise_id {
            log::trace!("dropping {:?} for exercise {}", header.kind, header.exercise_id);
            self.stats.foreign_exercise += 1;
            return;
        }

        if !self.registry.is_registered(header.kind) {
            log::trace!("dropping unregistered {:?}", header.kind);
            self.stats.unregistered_kind += 1;
            return;
        }

        self.queues
            .entry(header.kind)
            .or_default()
            .push_back(body.to_vec());
    }

    /// Decodes every queued body and hands it to `observer`, then to the
    /// subscribers of its kind.
    pub fn dispatch(&mut self, mut observer: impl FnMut(&Pdu)) -> usize {
        let mut dispatched = 0;
        for (kind, queue) in &mut self.queues {
            while let Some(body) = queue.pop_front() {
                let pdu = match self.registry.decode(*kind, &body) {
                    Some(Ok(pdu)) => pdu,
                    Some(Err(e)) => {
                        log::debug!("dropping undecodable {kind:?}: {e}");
                        self.stats.malformed += 1;
                        continue;
                    }
                    None => continue,
                };

                observer(&pdu);
                if let Some(subscribers) = self.subscribers.get_mut(kind) {
                    for callback in subscribers.iter_mut() {
                        callback(&pdu);
                    }
                }
                dispatched += 1;
            }
        }
        self.stats.dispatched += dispatched as u64;
        dispatched
    }

    /// Receives, refreshes the timestamp and dispatches.
    pub fn tick(&mut self) -> usize {
        if let Err(e) = self.receive() {
            log::warn!("receive failed: {e}");
        }
        self.update_timestamp();
        self.dispatch(|_| {})
    }

    pub fn send(&mut self, pdu: &Pdu) -> Result<usize, SendError> {
        let datagram = encode_datagram(
            pdu,
            self.config.exercise_id,
            self.config.protocol_version,
            self.timestamp,
        )?;
        let sent = self.transport.broadcast(&datagram)?;
        self.stats.datagrams_sent += 1;
        self.stats.bytes_sent += sent as u64;
        Ok(sent)
    }

    pub fn send_body<B: PduBody>(&mut self, body: &B) -> Result<usize, SendError> {
        self.send(&body.clone().into())
    }
}
