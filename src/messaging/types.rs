//! Log Records, Deliveries and Acknowledgments
//!
//! A consumer group sees each record as a [`Delivery`]. The delivery must be settled through its
//! [`Acknowledgment`]: `acknowledge` commits it, `nack` hands the same record back to the same
//! group after a backoff.

use crate::error::TransportError;

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// One appended record. `payload == None` is a tombstone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub topic: String,
    pub partition: u32,
    pub offset: u64,
    pub key: String,
    pub payload: Option<Vec<u8>>,
}

/// Where an append landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordMetadata {
    pub topic: String,
    pub partition: u32,
    pub offset: u64,
}

/// The partitioned log the services talk through.
#[async_trait]
pub trait EventLog: Send + Sync {
    async fn append(
        &self,
        topic: &str,
        key: &str,
        payload: Option<Vec<u8>>,
    ) -> Result<RecordMetadata, TransportError>;

    async fn subscribe(&self, topic: &str, group: &str) -> Result<Subscription, TransportError>;
}

/// Per-group settlement counters.
#[derive(Debug, Default)]
pub struct GroupStats {
    delivered: AtomicU64,
    acked: AtomicU64,
    nacked: AtomicU64,
    redelivered: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupStatsSnapshot {
    pub delivered: u64,
    pub acked: u64,
    pub nacked: u64,
    pub redelivered: u64,
}

impl GroupStats {
    pub fn snapshot(&self) -> GroupStatsSnapshot {
        GroupStatsSnapshot {
            delivered: self.delivered.load(Ordering::SeqCst),
            acked: self.acked.load(Ordering::SeqCst),
            nacked: self.nacked.load(Ordering::SeqCst),
            redelivered: self.redelivered.load(Ordering::SeqCst),
        }
    }
}

/// Sending half of one group's delivery stream.
#[derive(Debug, Clone)]
pub(crate) struct GroupChannel {
    sender: mpsc::UnboundedSender<Delivery>,
    stats: Arc<GroupStats>,
}

impl GroupChannel {
    pub(crate) fn new() -> (Self, mpsc::UnboundedReceiver<Delivery>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let channel = Self {
            sender,
            stats: Arc::new(GroupStats::default()),
        };
        (channel, receiver)
    }

    pub(crate) fn stats(&self) -> Arc<GroupStats> {
        self.stats.clone()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Returns `false` once the subscription has been dropped.
    pub(crate) fn deliver(&self, record: Record, attempt: u32) -> bool {
        let delivery = Delivery {
            record: record.clone(),
            attempt,
            ack: Acknowledgment {
                record,
                attempt,
                channel: self.clone(),
            },
        };
        self.stats.delivered.fetch_add(1, Ordering::SeqCst);
        self.sender.send(delivery).is_ok()
    }
}

/// A record handed to one consumer group.
#[derive(Debug)]
pub struct Delivery {
    pub record: Record,
    /// 1 on first delivery, incremented on every redelivery.
    pub attempt: u32,
    pub ack: Acknowledgment,
}

/// Settles exactly one delivery.
#[derive(Debug)]
pub struct Acknowledgment {
    record: Record,
    attempt: u32,
    channel: GroupChannel,
}

impl Acknowledgment {
    pub fn acknowledge(self) {
        self.channel.stats.acked.fetch_add(1, Ordering::SeqCst);
    }

    /// Redelivers the record to the same group after `backoff`. There is no attempt limit.
    pub fn nack(self, backoff: Duration) {
        self.channel.stats.nacked.fetch_add(1, Ordering::SeqCst);

        let Acknowledgment {
            record,
            attempt,
            channel,
        } = self;

        tokio::spawn(async move {
            tokio::time::sleep(backoff).await;
            channel.stats.redelivered.fetch_add(1, Ordering::SeqCst);
            if !channel.deliver(record.clone(), attempt + 1) {
                tracing::debug!(
                    topic = %record.topic,
                    partition = record.partition,
                    offset = record.offset,
                    "subscription gone, dropping redelivery"
                );
            }
        });
    }
}

/// Receiving half of a consumer group's stream.
#[derive(Debug)]
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<Delivery>,
    stats: Arc<GroupStats>,
}

impl Subscription {
    pub(crate) fn new(receiver: mpsc::UnboundedReceiver<Delivery>, stats: Arc<GroupStats>) -> Self {
        Self { receiver, stats }
    }

    /// Next delivery, or `None` once the log has closed the group.
    pub async fn next(&mut self) -> Option<Delivery> {
        self.receiver.recv().await
    }

    pub fn stats(&self) -> GroupStatsSnapshot {
        self.stats.snapshot()
    }
}
