//! In-memory directory of nodes and their values.
//!
//! The directory is the only stateful structure in a session. It is written
//! by a single dispatcher and read concurrently by request handlers, so every
//! access goes through one reader/writer lock and readers only ever receive
//! owned copies. Nothing here talks to the driver; callers fetch whatever
//! they need from the driver before (or after) touching the directory.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use zwave_sync_types::{NodeKey, NodeMetadata, ValueId, ValueKey};

/// A value as held by the directory.
///
/// Only the identity is cached. Flags, labels and the current string form
/// are queried from the driver at projection time because they can change
/// without a notification.
pub type ValueRecord = ValueId;

/// A node and the values it has reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    key: NodeKey,
    metadata: NodeMetadata,
    /// Insertion-ordered; keys are unique.
    values: Vec<ValueRecord>,
}

impl NodeRecord {
    /// Create a record with no values.
    pub fn new(key: NodeKey, metadata: NodeMetadata) -> Self {
        Self {
            key,
            metadata,
            values: Vec::new(),
        }
    }

    /// The node's key.
    pub fn key(&self) -> NodeKey {
        self.key
    }

    /// Classification and naming fields.
    pub fn metadata(&self) -> &NodeMetadata {
        &self.metadata
    }

    /// Replace the metadata. The key is never changed.
    pub fn set_metadata(&mut self, metadata: NodeMetadata) {
        self.metadata = metadata;
    }

    /// Values in the order they were first added.
    pub fn values(&self) -> &[ValueRecord] {
        &self.values
    }

    /// Look up a value by key.
    pub fn value(&self, key: ValueKey) -> Option<&ValueRecord> {
        self.values.iter().find(|v| v.key == key)
    }

    /// Insert a value, or replace the one with the same key in place.
    ///
    /// Returns the replaced value, if any.
    pub fn upsert_value(&mut self, value: ValueRecord) -> Option<ValueRecord> {
        match self.values.iter_mut().find(|v| v.key == value.key) {
            Some(existing) => Some(std::mem::replace(existing, value)),
            None => {
                self.values.push(value);
                None
            }
        }
    }

    /// Remove a value by key. Returns the removed value, if it existed.
    pub fn remove_value(&mut self, key: ValueKey) -> Option<ValueRecord> {
        let index = self.values.iter().position(|v| v.key == key)?;
        Some(self.values.remove(index))
    }
}

/// Concurrency-safe map from [`NodeKey`] to [`NodeRecord`].
#[derive(Debug, Default)]
pub struct NodeDirectory {
    nodes: RwLock<HashMap<NodeKey, NodeRecord>>,
}

impl NodeDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record. Returns the previous record for the key.
    pub fn upsert(&self, record: NodeRecord) -> Option<NodeRecord> {
        self.write().insert(record.key(), record)
    }

    /// Delete a record. Returns it if it was present.
    pub fn remove(&self, key: &NodeKey) -> Option<NodeRecord> {
        self.write().remove(key)
    }

    /// An owned copy of one record.
    pub fn get(&self, key: &NodeKey) -> Option<NodeRecord> {
        self.read().get(key).cloned()
    }

    /// Whether a record exists for the key.
    pub fn contains(&self, key: &NodeKey) -> bool {
        self.read().contains_key(key)
    }

    /// An owned copy of every record, taken under a single read lock.
    ///
    /// Order is unspecified.
    pub fn snapshot(&self) -> Vec<NodeRecord> {
        self.read().values().cloned().collect()
    }

    /// Insert or replace a value under an existing node.
    ///
    /// Returns `false` (and changes nothing) when the node is unknown.
    pub fn upsert_value(&self, node: &NodeKey, value: ValueRecord) -> bool {
        match self.write().get_mut(node) {
            Some(record) => {
                record.upsert_value(value);
                true
            }
            None => false,
        }
    }

    /// Remove a value from an existing node.
    ///
    /// Returns `false` when the node is unknown; removing an absent value
    /// from a known node is a no-op that still returns `true`.
    pub fn remove_value(&self, node: &NodeKey, value: ValueKey) -> bool {
        match self.write().get_mut(node) {
            Some(record) => {
                record.remove_value(value);
                true
            }
            None => false,
        }
    }

    /// Replace the metadata of an existing node, keeping its values.
    ///
    /// Returns `false` when the node is unknown.
    pub fn update_metadata(&self, node: &NodeKey, metadata: NodeMetadata) -> bool {
        match self.write().get_mut(node) {
            Some(record) => {
                record.set_metadata(metadata);
                true
            }
            None => false,
        }
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the directory holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Drop every record.
    pub fn clear(&self) {
        self.write().clear();
    }

    // A panic while holding the lock cannot leave a record half-written
    // (every mutation is a single map or vec operation), so poisoning is
    // safe to ignore.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<NodeKey, NodeRecord>> {
        self.nodes.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<NodeKey, NodeRecord>> {
        self.nodes.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use zwave_sync_types::{ValueGenre, ValueType};

    fn record(home: u32, node: u8) -> NodeRecord {
        NodeRecord::new(NodeKey::new(home, node), NodeMetadata::default())
    }

    fn value(key: u64, value_type: ValueType) -> ValueRecord {
        ValueId::new(ValueKey::new(key), ValueGenre::User, 0x25, value_type)
    }

    fn keys(directory: &NodeDirectory) -> HashSet<NodeKey> {
        directory.snapshot().into_iter().map(|r| r.key()).collect()
    }

    #[test]
    fn membership_is_added_minus_removed() {
        let directory = NodeDirectory::new();
        directory.upsert(record(1, 2));
        directory.upsert(record(1, 3));
        directory.upsert(record(1, 4));
        directory.remove(&NodeKey::new(1, 3));
        directory.remove(&NodeKey::new(1, 9));

        let expected: HashSet<_> = [NodeKey::new(1, 2), NodeKey::new(1, 4)].into();
        assert_eq!(keys(&directory), expected);
        assert_eq!(directory.len(), 2);
    }

    #[test]
    fn duplicate_upsert_replaces_without_duplicating() {
        let directory = NodeDirectory::new();
        let mut first = record(1, 5);
        first.upsert_value(value(1, ValueType::Bool));
        directory.upsert(first);

        let previous = directory.upsert(record(1, 5));
        assert_eq!(previous.map(|r| r.values().len()), Some(1));
        assert_eq!(directory.len(), 1);
        let stored = directory.get(&NodeKey::new(1, 5)).unwrap();
        assert!(stored.values().is_empty());
    }

    #[test]
    fn value_upsert_is_last_write_wins() {
        let directory = NodeDirectory::new();
        let key = NodeKey::new(1, 5);
        directory.upsert(record(1, 5));

        assert!(directory.upsert_value(&key, value(42, ValueType::Bool)));
        assert!(directory.upsert_value(&key, value(42, ValueType::Byte)));

        let stored = directory.get(&key).unwrap();
        assert_eq!(stored.values().len(), 1);
        assert_eq!(stored.values()[0].value_type, ValueType::Byte);
    }

    #[test]
    fn replaced_value_keeps_its_position() {
        let mut node = record(1, 5);
        node.upsert_value(value(1, ValueType::Bool));
        node.upsert_value(value(2, ValueType::Bool));
        node.upsert_value(value(3, ValueType::Bool));
        node.upsert_value(value(2, ValueType::Int));

        let order: Vec<u64> = node.values().iter().map(|v| v.key.value()).collect();
        assert_eq!(order, vec![1, 2, 3]);
        assert_eq!(
            node.value(ValueKey::new(2)).unwrap().value_type,
            ValueType::Int
        );
    }

    #[test]
    fn removing_absent_value_is_noop() {
        let directory = NodeDirectory::new();
        let key = NodeKey::new(1, 5);
        directory.upsert(record(1, 5));
        directory.upsert_value(&key, value(1, ValueType::Bool));

        assert!(directory.remove_value(&key, ValueKey::new(99)));
        assert_eq!(directory.get(&key).unwrap().values().len(), 1);

        assert!(directory.remove_value(&key, ValueKey::new(1)));
        assert!(directory.get(&key).unwrap().values().is_empty());
    }

    #[test]
    fn value_ops_on_unknown_node_never_create_it() {
        let directory = NodeDirectory::new();
        let ghost = NodeKey::new(7, 7);

        assert!(!directory.upsert_value(&ghost, value(1, ValueType::Bool)));
        assert!(!directory.remove_value(&ghost, ValueKey::new(1)));
        assert!(!directory.update_metadata(&ghost, NodeMetadata::default()));
        assert!(directory.is_empty());
        assert!(!directory.contains(&ghost));
    }

    #[test]
    fn update_metadata_keeps_values() {
        let directory = NodeDirectory::new();
        let key = NodeKey::new(1, 5);
        directory.upsert(record(1, 5));
        directory.upsert_value(&key, value(1, ValueType::Bool));

        let metadata = NodeMetadata {
            name: "Hall".into(),
            ..NodeMetadata::default()
        };
        assert!(directory.update_metadata(&key, metadata));

        let stored = directory.get(&key).unwrap();
        assert_eq!(stored.metadata().name, "Hall");
        assert_eq!(stored.values().len(), 1);
    }

    #[test]
    fn snapshot_is_independent_of_later_writes() {
        let directory = NodeDirectory::new();
        let key = NodeKey::new(1, 5);
        directory.upsert(record(1, 5));

        let snapshot = directory.snapshot();
        directory.upsert_value(&key, value(1, ValueType::Bool));
        directory.remove(&key);

        assert_eq!(snapshot.len(), 1);
        assert!(snapshot[0].values().is_empty());
    }

    #[test]
    fn clear_empties_directory() {
        let directory = NodeDirectory::new();
        directory.upsert(record(1, 1));
        directory.upsert(record(1, 2));
        directory.clear();
        assert!(directory.is_empty());
    }

    #[test]
    fn concurrent_snapshots_never_see_torn_records() {
        // Each write replaces the record with one whose name states how many
        // values it carries; a reader must always see the two agree.
        let directory = Arc::new(NodeDirectory::new());
        let key = NodeKey::new(1, 5);

        let writer = {
            let directory = Arc::clone(&directory);
            std::thread::spawn(move || {
                for n in 0..500u64 {
                    let mut node = NodeRecord::new(
                        key,
                        NodeMetadata {
                            name: (n % 17).to_string(),
                            ..NodeMetadata::default()
                        },
                    );
                    for v in 0..(n % 17) {
                        node.upsert_value(value(v, ValueType::Int));
                    }
                    directory.upsert(node);
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let directory = Arc::clone(&directory);
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        for node in directory.snapshot() {
                            let expected: usize = node.metadata().name.parse().unwrap();
                            assert_eq!(node.values().len(), expected);
                        }
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
    }
}
