//! Notification scripts: one JSON-encoded notification per line.
//!
//! ```text
//! # comments and blank lines are skipped
//! {"type":"node_added","node":"25439834:1"}
//! {"type":"value_added","node":"25439834:1","value":{"key":72057594043940865,"genre":"user","command_class_id":37,"type":"bool"}}
//! {"type":"all_nodes_queried","node":"25439834:1"}
//! ```

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info, warn};
use zwave_sync_driver::MockDriver;
use zwave_sync_types::NotificationEvent;

/// Parse a script. Errors name the offending line.
pub fn parse(script: &str) -> Result<Vec<NotificationEvent>> {
    script
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(index, line)| {
            serde_json::from_str(line.trim())
                .with_context(|| format!("Invalid notification on line {}", index + 1))
        })
        .collect()
}

/// Read and parse a script file.
pub async fn load(path: &Path) -> Result<Vec<NotificationEvent>> {
    let script = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse(&script)
}

/// Push every notification into the driver, in order.
///
/// Added nodes become known to the driver, so their names can be read and
/// changed. Stops early if the session stops listening.
pub async fn feed(driver: &MockDriver, events: Vec<NotificationEvent>) -> usize {
    let total = events.len();
    for (sent, event) in events.into_iter().enumerate() {
        debug!(kind = event.kind(), "replaying notification");
        if let NotificationEvent::NodeAdded { node } = event {
            driver.ensure_node(node);
        }
        if let Err(e) = driver.emit(event).await {
            warn!(error = %e, sent, total, "replay stopped early");
            return sent;
        }
    }
    info!(total, "replay finished");
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zwave_sync_driver::{notification_channel, DeviceDriver};
    use zwave_sync_types::NodeKey;

    #[test]
    fn parses_lines_in_order() {
        let script = r#"
# two nodes
{"type":"node_added","node":"1:2"}

{"type":"node_added","node":"1:3"}
{"type":"driver_ready","home_id":1}
"#;
        let events = parse(script).unwrap();
        assert_eq!(
            events,
            vec![
                NotificationEvent::NodeAdded {
                    node: NodeKey::new(1, 2)
                },
                NotificationEvent::NodeAdded {
                    node: NodeKey::new(1, 3)
                },
                NotificationEvent::DriverReady { home_id: 1 },
            ]
        );
    }

    #[test]
    fn bad_line_is_named() {
        let script = "{\"type\":\"node_added\",\"node\":\"1:2\"}\n{\"type\":\"nope\"}\n";
        let err = parse(script).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn malformed_node_key_is_rejected() {
        assert!(parse(r#"{"type":"node_removed","node":"1-2"}"#).is_err());
    }

    #[tokio::test]
    async fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"type":"node_naming","node":"7:9"}}"#).unwrap();

        let events = load(file.path()).await.unwrap();
        assert_eq!(
            events,
            vec![NotificationEvent::NodeNaming {
                node: NodeKey::new(7, 9)
            }]
        );
    }

    #[tokio::test]
    async fn fed_nodes_can_be_renamed() {
        let driver = MockDriver::new();
        let (sink, mut stream) = notification_channel(8);
        driver.register_notifications(sink).unwrap();
        let node = NodeKey::new(1, 2);
        let events = parse(r#"{"type":"node_added","node":"1:2"}"#).unwrap();

        assert_eq!(feed(&driver, events).await, 1);
        assert_eq!(
            stream.next().await,
            Some(NotificationEvent::NodeAdded { node })
        );
        assert_eq!(driver.node_name(node).unwrap(), "");

        driver.set_node_name(node, "Garage").unwrap();
        assert_eq!(driver.node_name(node).unwrap(), "Garage");
        assert_eq!(driver.lost_notifications(), 0);
    }

    #[tokio::test]
    async fn feed_without_session_stops_immediately() {
        let driver = MockDriver::new();
        let events = parse(r#"{"type":"node_added","node":"1:2"}"#).unwrap();
        assert_eq!(feed(&driver, events).await, 0);
    }
}
