//! Snapshot lifecycle: atomic publication of compiled routing tables.
//!
//! Dispatch never blocks on compilation and compilation never waits for
//! dispatch: readers grab the current `Arc` snapshot and hold it for one
//! request or TLS handshake, while the rebuilder swaps in fresh tables
//! behind them. A superseded snapshot is freed when its last holder
//! drops it.

use std::sync::{Arc, Mutex, MutexGuard};

use arc_swap::ArcSwap;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::cluster::ClusterState;
use crate::config::EngineConfig;
use crate::remap::RemapDatabase;

/// The published-snapshot slot shared by the rebuilder and all
/// dispatchers.
#[derive(Debug)]
pub struct SnapshotSlot {
    inner: ArcSwap<RemapDatabase>,
}

impl SnapshotSlot {
    /// A slot holding an empty table; every dispatch defers until the
    /// first rebuild publishes something.
    pub fn new() -> Self {
        Self {
            inner: ArcSwap::from_pointee(RemapDatabase::empty()),
        }
    }

    /// The current snapshot. Each caller holds its own reference for the
    /// duration of one request.
    pub fn current(&self) -> Arc<RemapDatabase> {
        self.inner.load_full()
    }

    /// Atomically supersede the published table.
    pub fn publish(&self, db: RemapDatabase) {
        self.inner.store(Arc::new(db));
    }
}

impl Default for SnapshotSlot {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_cluster(cluster: &Mutex<ClusterState>) -> MutexGuard<'_, ClusterState> {
    match cluster.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Rebuild and publish a fresh table if the cluster changed since the
/// last build. Returns whether a new snapshot was published.
///
/// The cluster lock is held for the duration of one compilation; the
/// watcher queues behind it, dispatchers never touch it.
pub fn rebuild_if_changed(
    cluster: &Mutex<ClusterState>,
    config: &EngineConfig,
    slot: &SnapshotSlot,
) -> bool {
    let db = {
        let mut state = lock_cluster(cluster);
        if !state.take_changed() {
            tracing::debug!("rebuild skipped, no changes");
            return false;
        }
        RemapDatabase::from_cluster(config, &state)
    };

    tracing::info!(hosts = db.len(), "publishing rebuilt routing table");
    slot.publish(db);
    true
}

/// Spawn the rebuild loop: every `changed` notification triggers one
/// rebuild-if-changed pass. Runs until the returned handle is aborted.
pub fn spawn_rebuilder(
    cluster: Arc<Mutex<ClusterState>>,
    config: EngineConfig,
    slot: Arc<SnapshotSlot>,
    changed: Arc<Notify>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            changed.notified().await;
            rebuild_if_changed(&cluster, &config, &slot);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{Endpoints, Ingress, Service};
    use serde_json::json;
    use std::time::Duration;

    fn populated_cluster() -> ClusterState {
        let mut cluster = ClusterState::new();
        cluster.apply_service(
            Service::from_value(json!({
                "metadata": {"namespace": "default", "name": "web"},
                "spec": {"ports": [{"name": "http", "port": 80}]}
            }))
            .unwrap(),
        );
        cluster.apply_endpoints(
            Endpoints::from_value(json!({
                "metadata": {"namespace": "default", "name": "web"},
                "subsets": [{
                    "addresses": [{"ip": "10.0.0.1"}],
                    "ports": [{"name": "http", "port": 8080}]
                }]
            }))
            .unwrap(),
        );
        cluster.apply_ingress(
            Ingress::from_value(json!({
                "metadata": {"namespace": "default", "name": "web"},
                "spec": {"rules": [{
                    "host": "web.example.com",
                    "http": {"paths": [
                        {"backend": {"serviceName": "web", "servicePort": 80}}
                    ]}
                }]}
            }))
            .unwrap(),
        );
        cluster
    }

    #[test]
    fn test_rebuild_publishes_once_per_change() {
        let cluster = Mutex::new(populated_cluster());
        let slot = SnapshotSlot::new();
        let config = EngineConfig::default();

        assert!(slot.current().is_empty());
        assert!(rebuild_if_changed(&cluster, &config, &slot));
        assert_eq!(slot.current().len(), 1);

        // Nothing changed; the same snapshot stays published.
        assert!(!rebuild_if_changed(&cluster, &config, &slot));

        lock_cluster(&cluster).delete_ingress("default", "web");
        assert!(rebuild_if_changed(&cluster, &config, &slot));
        assert!(slot.current().is_empty());
    }

    #[test]
    fn test_held_snapshot_survives_publication() {
        let cluster = Mutex::new(populated_cluster());
        let slot = SnapshotSlot::new();
        let config = EngineConfig::default();
        rebuild_if_changed(&cluster, &config, &slot);

        let held = slot.current();
        assert!(held.host("web.example.com").is_some());

        lock_cluster(&cluster).delete_ingress("default", "web");
        rebuild_if_changed(&cluster, &config, &slot);

        // The old snapshot is untouched; new readers see the new table.
        assert!(held.host("web.example.com").is_some());
        assert!(slot.current().host("web.example.com").is_none());
    }

    #[tokio::test]
    async fn test_rebuilder_task_reacts_to_notify() {
        let cluster = Arc::new(Mutex::new(populated_cluster()));
        let slot = Arc::new(SnapshotSlot::new());
        let changed = Arc::new(Notify::new());

        let handle = spawn_rebuilder(
            cluster.clone(),
            EngineConfig::default(),
            slot.clone(),
            changed.clone(),
        );

        changed.notify_one();
        for _ in 0..100 {
            if !slot.current().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(slot.current().len(), 1);

        handle.abort();
    }
}
