// src/ros_interface/subscriber.rs

// Subscribes to the subsystem's diagnostics topic and feeds decoded payloads
// into the collision cache. Decoding runs in the subscription task, outside
// the cache lock; a record without the component's entry is skipped, a
// malformed payload is dropped with the previous state left in place.

use std::sync::Arc;

use futures::executor::LocalSpawner;
use futures::task::LocalSpawnExt;
use futures::StreamExt;
use log::{debug, error, info};
use r2r::diagnostic_msgs::msg::DiagnosticArray;
use r2r::{Node, QosProfile};

use crate::cache::CollisionCache;
use crate::decoder;
use crate::ros_interface::diag_topic;
use crate::ColvisError;

/// Subscribes to `/{subsystem_name}/diag` and spawns the task that decodes
/// every incoming record into the cache.
pub fn spawn_diag_listener(
    node: &mut Node,
    spawner: &LocalSpawner,
    subsystem_name: &str,
    component_name: &str,
    cache: Arc<CollisionCache>,
) -> Result<(), ColvisError> {
    let topic = diag_topic(subsystem_name);
    let subscription = node.subscribe::<DiagnosticArray>(&topic, QosProfile::default())?;
    info!("subscribed to {}", topic);

    let component = component_name.to_string();
    spawner
        .spawn_local(async move {
            subscription
                .for_each(|msg| {
                    handle_diagnostics(&msg, &component, &cache);
                    futures::future::ready(())
                })
                .await;
        })
        .map_err(|e| ColvisError::Ros(format!("diagnostics task: {}", e)))?;

    Ok(())
}

/// Handles one diagnostic record.
fn handle_diagnostics(msg: &DiagnosticArray, component: &str, cache: &CollisionCache) {
    let Some(payload) = find_component_payload(msg, component) else {
        debug!("no '{}' entry in diagnostic record", component);
        return;
    };

    match decoder::parse_payload(payload) {
        Ok(update) => cache.apply_update(update.collisions, update.links),
        Err(e) => error!("dropping malformed collision payload: {}", e),
    }
}

/// First status value whose key matches the component name, across all
/// status entries of the record.
fn find_component_payload<'a>(msg: &'a DiagnosticArray, component: &str) -> Option<&'a str> {
    msg.status
        .iter()
        .flat_map(|status| status.values.iter())
        .find(|kv| kv.key == component)
        .map(|kv| kv.value.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use r2r::diagnostic_msgs::msg::{DiagnosticStatus, KeyValue};

    fn record(entries: Vec<(&str, &str)>) -> DiagnosticArray {
        DiagnosticArray {
            status: vec![DiagnosticStatus {
                values: entries
                    .into_iter()
                    .map(|(k, v)| KeyValue {
                        key: k.to_string(),
                        value: v.to_string(),
                    })
                    .collect(),
                ..DiagnosticStatus::default()
            }],
            ..DiagnosticArray::default()
        }
    }

    #[test]
    fn finds_component_entry_by_key() {
        let msg = record(vec![("other", "x"), ("col_det", "<cd></cd>")]);
        assert_eq!(find_component_payload(&msg, "col_det"), Some("<cd></cd>"));
    }

    #[test]
    fn absent_component_entry_yields_none() {
        let msg = record(vec![("other", "x")]);
        assert_eq!(find_component_payload(&msg, "col_det"), None);
    }

    #[test]
    fn absent_entry_leaves_cache_untouched() {
        let cache = CollisionCache::new();
        handle_diagnostics(&record(vec![("other", "x")]), "col_det", &cache);
        let (collisions, links) = cache.snapshot();
        assert!(collisions.is_empty());
        assert!(links.is_empty());
    }

    #[test]
    fn malformed_payload_keeps_previous_state() {
        let cache = CollisionCache::new();
        handle_diagnostics(
            &record(vec![("col_det", r#"<cd><l idx="0" name="torso"/></cd>"#)]),
            "col_det",
            &cache,
        );
        assert_eq!(cache.link_count(), 1);

        // Link record with no idx attribute: the whole payload is dropped.
        handle_diagnostics(
            &record(vec![("col_det", r#"<cd><l name="chest"/></cd>"#)]),
            "col_det",
            &cache,
        );
        assert_eq!(cache.link_count(), 1);
    }
}
