//! In-Process Partitioned Event Log
//!
//! Topics are created up front with a fixed partition count. Each topic keeps its partitions as
//! append-only vectors plus the global append order, which is what a new consumer group replays
//! before it starts receiving live appends.

use super::partitioner::Partitioner;
use super::types::{EventLog, GroupChannel, GroupStatsSnapshot, Record, RecordMetadata, Subscription};
use crate::error::TransportError;

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

struct TopicState {
    partitioner: Partitioner,
    partitions: Vec<Vec<Record>>,
    /// `(partition, offset)` in append order.
    appended: Vec<(u32, u64)>,
    groups: HashMap<String, GroupChannel>,
}

impl TopicState {
    fn new(num_partitions: u32) -> Self {
        let partitioner = Partitioner::new(num_partitions);
        Self {
            partitions: vec![Vec::new(); partitioner.num_partitions() as usize],
            partitioner,
            appended: Vec::new(),
            groups: HashMap::new(),
        }
    }

    fn in_append_order(&self) -> impl Iterator<Item = &Record> {
        self.appended
            .iter()
            .map(move |(partition, offset)| &self.partitions[*partition as usize][*offset as usize])
    }
}

#[derive(Default)]
pub struct MemoryEventLog {
    topics: DashMap<String, TopicState>,
    closed: AtomicBool,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_topic(&self, topic: &str, num_partitions: u32) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        if self.topics.contains_key(topic) {
            return Err(TransportError::TopicExists(topic.to_string()));
        }

        self.topics
            .insert(topic.to_string(), TopicState::new(num_partitions));
        tracing::info!(topic, partitions = num_partitions, "topic created");
        Ok(())
    }

    /// Every record of `topic` in append order.
    pub fn records(&self, topic: &str) -> Result<Vec<Record>, TransportError> {
        let state = self
            .topics
            .get(topic)
            .ok_or_else(|| TransportError::UnknownTopic(topic.to_string()))?;
        Ok(state.in_append_order().cloned().collect())
    }

    pub fn group_stats(&self, topic: &str, group: &str) -> Option<GroupStatsSnapshot> {
        let state = self.topics.get(topic)?;
        let channel = state.groups.get(group)?;
        Some(channel.stats().snapshot())
    }

    /// Rejects further appends and ends every subscription once its pending redeliveries drain.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        for mut topic in self.topics.iter_mut() {
            topic.groups.clear();
        }
        tracing::info!("event log closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventLog for MemoryEventLog {
    async fn append(
        &self,
        topic: &str,
        key: &str,
        payload: Option<Vec<u8>>,
    ) -> Result<RecordMetadata, TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }

        let mut state = self
            .topics
            .get_mut(topic)
            .ok_or_else(|| TransportError::UnknownTopic(topic.to_string()))?;

        let partition = state.partitioner.get_partition(key);
        let offset = state.partitions[partition as usize].len() as u64;
        let record = Record {
            topic: topic.to_string(),
            partition,
            offset,
            key: key.to_string(),
            payload,
        };

        state.partitions[partition as usize].push(record.clone());
        state.appended.push((partition, offset));

        // Groups whose subscription was dropped are forgotten
        state
            .groups
            .retain(|_, channel| channel.deliver(record.clone(), 1));

        tracing::trace!(topic, partition, offset, "record appended");

        Ok(RecordMetadata {
            topic: topic.to_string(),
            partition,
            offset,
        })
    }

    async fn subscribe(&self, topic: &str, group: &str) -> Result<Subscription, TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }

        let mut state = self
            .topics
            .get_mut(topic)
            .ok_or_else(|| TransportError::UnknownTopic(topic.to_string()))?;

        if let Some(existing) = state.groups.get(group) {
            if !existing.is_closed() {
                return Err(TransportError::GroupAlreadySubscribed {
                    topic: topic.to_string(),
                    group: group.to_string(),
                });
            }
        }

        let (channel, receiver) = GroupChannel::new();

        let mut replayed = 0usize;
        for record in state.in_append_order() {
            channel.deliver(record.clone(), 1);
            replayed += 1;
        }

        let stats = channel.stats();
        state.groups.insert(group.to_string(), channel);

        tracing::info!(topic, group, replayed, "consumer group subscribed");

        Ok(Subscription::new(receiver, stats))
    }
}
