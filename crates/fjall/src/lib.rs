use fjall::{Keyspace, PartitionHandle, PersistMode};
use loadstar::store::PersistentStore;
use std::error::Error;

pub mod third_party {
    pub use fjall;
}

/// Persistent store keeping cached module content in a fjall partition.
#[derive(Clone)]
pub struct FjallStore {
    keyspace: Keyspace,
    partition: PartitionHandle,
}

impl FjallStore {
    pub fn new(keyspace: Keyspace, partition_name: impl AsRef<str>) -> Result<Self, Box<dyn Error>> {
        let partition = keyspace.open_partition(partition_name.as_ref(), Default::default())?;
        Ok(Self {
            keyspace,
            partition,
        })
    }

    pub fn partition(&self) -> &PartitionHandle {
        &self.partition
    }

    /// Flushes journal to disk, so cached content survives a crash.
    pub fn persist(&self) -> Result<(), Box<dyn Error>> {
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }
}

impl PersistentStore for FjallStore {
    fn get(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let Some(slice) = self.partition.get(key)? else {
            return Ok(None);
        };
        let content = String::from_utf8(slice.to_vec())
            .map_err(|error| format!("Store entry `{key}` is not valid UTF-8: {error}"))?;
        Ok(Some(content))
    }

    fn put(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        self.partition.insert(key, value)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), Box<dyn Error>> {
        self.partition.remove(key)?;
        Ok(())
    }
}
