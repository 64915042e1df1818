use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Maps a record key onto one of a topic's partitions.
///
/// Every event of one run shares the key `"{tenantId}:{runId}"`, so a whole run lands on one
/// partition and keeps its order there.
#[derive(Debug, Clone, Copy)]
pub struct Partitioner {
    num_partitions: u32,
}

impl Partitioner {
    pub fn new(num_partitions: u32) -> Self {
        Self {
            num_partitions: num_partitions.max(1),
        }
    }

    pub fn num_partitions(&self) -> u32 {
        self.num_partitions
    }

    pub fn get_partition(&self, key: &str) -> u32 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let hash = hasher.finish() as u32;
        hash % self.num_partitions
    }
}
