//! Client-facing projection of directory records.
//!
//! Node metadata comes from the record. Everything about a value beyond its
//! identity is read live from the driver on every projection, so a summary
//! always reflects what the driver currently knows.

use std::sync::Arc;
use tracing::debug;
use zwave_sync_core::{NodeRecord, ValueRecord};
use zwave_sync_driver::{DeviceDriver, DriverResult};
use zwave_sync_types::{NodeKey, NodeSummary, ValueSummary};

/// Builds [`NodeSummary`] views from owned records.
///
/// Calls into the driver, which may block on device I/O; never call it while
/// holding the directory lock.
#[derive(Debug)]
pub struct SummaryProjector<D> {
    driver: Arc<D>,
}

impl<D> Clone for SummaryProjector<D> {
    fn clone(&self) -> Self {
        Self {
            driver: Arc::clone(&self.driver),
        }
    }
}

impl<D: DeviceDriver> SummaryProjector<D> {
    /// Create a projector querying `driver`.
    pub fn new(driver: Arc<D>) -> Self {
        Self { driver }
    }

    /// Project one record, values in insertion order.
    pub fn project(&self, record: &NodeRecord) -> NodeSummary {
        let key = record.key();
        let mut summary = NodeSummary::from_metadata(key, record.metadata());
        summary.values = record
            .values()
            .iter()
            .map(|value| self.project_value(key, value))
            .collect();
        summary
    }

    /// Project every record of a snapshot.
    pub fn project_all(&self, records: &[NodeRecord]) -> Vec<NodeSummary> {
        records.iter().map(|record| self.project(record)).collect()
    }

    fn project_value(&self, node: NodeKey, value: &ValueRecord) -> ValueSummary {
        let driver = &self.driver;
        let at = Accessor { node, value };

        ValueSummary {
            value_id: value.key,
            node_id: node.node_id(),
            genre: value.genre,
            command_class_id: value.command_class_id,
            value_type: value.value_type,
            read_only: at.get("read_only", driver.is_value_read_only(node, value)),
            write_only: at.get("write_only", driver.is_value_write_only(node, value)),
            set: at.get("set", driver.is_value_set(node, value)),
            polled: at.get("polled", driver.is_value_polled(node, value)),
            label: at.get("label", driver.value_label(node, value)),
            units: at.get("units", driver.value_units(node, value)),
            help: at.get("help", driver.value_help(node, value)),
            min: at.get("min", driver.value_min(node, value)),
            max: at.get("max", driver.value_max(node, value)),
            as_string: at.get("string", driver.value_as_string(node, value)),
        }
    }
}

struct Accessor<'a> {
    node: NodeKey,
    value: &'a ValueRecord,
}

impl Accessor<'_> {
    fn get<T: Default>(&self, field: &'static str, result: DriverResult<T>) -> T {
        result.unwrap_or_else(|error| {
            debug!(
                node = %self.node,
                value = ?self.value.key,
                field,
                %error,
                "value accessor failed, using default"
            );
            T::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zwave_sync_driver::{MockDriver, ValueDetails};
    use zwave_sync_types::{NodeMetadata, ValueGenre, ValueId, ValueKey, ValueType};

    fn record_with_values(keys: &[u64]) -> NodeRecord {
        let metadata = NodeMetadata {
            name: "Hall".into(),
            product_name: "Smart Switch 6".into(),
            ..NodeMetadata::default()
        };
        let mut record = NodeRecord::new(NodeKey::new(0xCAFE, 5), metadata);
        for key in keys {
            record.upsert_value(ValueId::new(
                ValueKey::new(*key),
                ValueGenre::User,
                0x25,
                ValueType::Bool,
            ));
        }
        record
    }

    #[test]
    fn flattens_metadata_and_values() {
        let driver = MockDriver::new();
        driver.set_value_details(
            NodeKey::new(0xCAFE, 5),
            ValueKey::new(42),
            ValueDetails {
                label: "Switch".into(),
                set: true,
                max: 255,
                as_string: "True".into(),
                ..ValueDetails::default()
            },
        );
        let projector = SummaryProjector::new(Arc::new(driver));

        let summary = projector.project(&record_with_values(&[42]));

        assert_eq!(summary.node_info_id.to_string(), "51966:5");
        assert_eq!(summary.node_name, "Hall");
        assert_eq!(summary.product_name, "Smart Switch 6");
        assert_eq!(summary.values.len(), 1);
        let value = &summary.values[0];
        assert_eq!(value.value_id, ValueKey::new(42));
        assert_eq!(value.node_id, 5);
        assert_eq!(value.label, "Switch");
        assert!(value.set);
        assert_eq!(value.max, 255);
        assert_eq!(value.as_string, "True");
    }

    #[test]
    fn keeps_value_insertion_order() {
        let projector = SummaryProjector::new(Arc::new(MockDriver::new()));
        let summary = projector.project(&record_with_values(&[9, 3, 7]));
        let keys: Vec<u64> = summary.values.iter().map(|v| v.value_id.value()).collect();
        assert_eq!(keys, vec![9, 3, 7]);
    }

    #[test]
    fn accessor_failures_degrade_to_defaults() {
        let driver = MockDriver::new();
        driver.set_value_details(
            NodeKey::new(0xCAFE, 5),
            ValueKey::new(42),
            ValueDetails {
                label: "Switch".into(),
                read_only: true,
                ..ValueDetails::default()
            },
        );
        driver.fail_value_queries(true);
        let projector = SummaryProjector::new(Arc::new(driver));

        let summary = projector.project(&record_with_values(&[42]));

        let value = &summary.values[0];
        assert_eq!(value.label, "");
        assert!(!value.read_only);
        assert_eq!(value.min, 0);
        assert_eq!(value.genre, ValueGenre::User);
    }

    #[test]
    fn reads_live_state_every_time() {
        let driver = MockDriver::new();
        let projector = SummaryProjector::new(Arc::new(driver.clone()));
        let record = record_with_values(&[42]);

        assert_eq!(projector.project(&record).values[0].as_string, "");

        driver.set_value_details(
            NodeKey::new(0xCAFE, 5),
            ValueKey::new(42),
            ValueDetails {
                as_string: "False".into(),
                ..ValueDetails::default()
            },
        );
        assert_eq!(projector.project(&record).values[0].as_string, "False");
    }

    #[test]
    fn project_all_maps_each_record() {
        let projector = SummaryProjector::new(Arc::new(MockDriver::new()));
        let records = vec![
            record_with_values(&[]),
            NodeRecord::new(NodeKey::new(0xCAFE, 6), NodeMetadata::default()),
        ];
        let summaries = projector.project_all(&records);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[1].node_id, 6);
    }
}
