//! copy-on-write store for the current graph.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tailmap_graph::NetworkGraph;
use tracing::{debug, info, warn};

/// one published graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphSnapshot {
    /// the graph itself.
    pub graph: NetworkGraph,
    /// increments on every publish, starting at 0 for the initial graph.
    pub generation: u64,
    /// when this snapshot was published.
    pub built_at: DateTime<Utc>,
}

impl GraphSnapshot {
    fn new(graph: NetworkGraph, generation: u64) -> Self {
        Self {
            graph,
            generation,
            built_at: Utc::now(),
        }
    }
}

/// holds the current graph behind an atomically swapped pointer.
///
/// - reads take the read lock only long enough to clone the `Arc`
/// - `publish` replaces the pointer under the write lock
/// - `reload` runs the rebuild under a separate mutex so concurrent reloads
///   queue up instead of racing, while readers keep seeing the old graph
#[derive(Debug)]
pub struct GraphStore {
    current: RwLock<Arc<GraphSnapshot>>,
    reload: Mutex<()>,
}

impl GraphStore {
    /// create a store holding `graph` as generation 0.
    pub fn new(graph: NetworkGraph) -> Self {
        Self {
            current: RwLock::new(Arc::new(GraphSnapshot::new(graph, 0))),
            reload: Mutex::new(()),
        }
    }

    /// the current snapshot.
    pub fn current(&self) -> Arc<GraphSnapshot> {
        // a panicking writer cannot leave a half-written Arc behind
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// generation of the current snapshot.
    pub fn generation(&self) -> u64 {
        self.current().generation
    }

    /// replace the current graph, returning the new snapshot.
    pub fn publish(&self, graph: NetworkGraph) -> Arc<GraphSnapshot> {
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let snapshot = Arc::new(GraphSnapshot::new(graph, guard.generation + 1));
        *guard = Arc::clone(&snapshot);
        debug!(generation = snapshot.generation, "published graph");
        snapshot
    }

    /// rebuild and publish.
    ///
    /// on error the previous snapshot stays current and the error is
    /// returned unchanged.
    pub fn reload<E>(
        &self,
        rebuild: impl FnOnce() -> Result<NetworkGraph, E>,
    ) -> Result<Arc<GraphSnapshot>, E>
    where
        E: std::fmt::Display,
    {
        let _serialized = self.reload.lock().unwrap_or_else(PoisonError::into_inner);

        match rebuild() {
            Ok(graph) => {
                let snapshot = self.publish(graph);
                info!(
                    generation = snapshot.generation,
                    nodes = snapshot.graph.node_count(),
                    edges = snapshot.graph.edge_count(),
                    "graph reloaded"
                );
                Ok(snapshot)
            }
            Err(e) => {
                warn!(
                    error = %e,
                    generation = self.generation(),
                    "graph reload failed, keeping current graph"
                );
                Err(e)
            }
        }
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new(NetworkGraph::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    fn graph(raw: &str) -> NetworkGraph {
        let parsed = tailmap_policy::parse(raw).unwrap();
        tailmap_graph::GraphBuilder::new(&parsed.document, &parsed.lines).build()
    }

    fn one_edge() -> NetworkGraph {
        graph(r#"{"acls": [{"action": "accept", "src": ["tag:a"], "dst": ["tag:b"]}]}"#)
    }

    #[test]
    fn test_new_store_is_generation_zero() {
        let store = GraphStore::new(one_edge());
        let snapshot = store.current();
        assert_eq!(snapshot.generation, 0);
        assert_eq!(snapshot.graph.edge_count(), 1);
    }

    #[test]
    fn test_publish_swaps_pointer() {
        let store = GraphStore::default();
        let before = store.current();
        let after = store.publish(one_edge());

        assert_eq!(after.generation, 1);
        assert_eq!(store.generation(), 1);
        // old readers keep their snapshot
        assert_eq!(before.graph.node_count(), 0);
        assert_eq!(store.current().graph.node_count(), 2);
        assert!(after.built_at >= before.built_at);
    }

    #[test]
    fn test_failed_reload_keeps_previous_graph() {
        let store = GraphStore::new(one_edge());
        let err = store
            .reload(|| Err::<NetworkGraph, _>("policy went missing"))
            .unwrap_err();
        assert_eq!(err, "policy went missing");
        assert_eq!(store.generation(), 0);
        assert_eq!(store.current().graph.edge_count(), 1);
    }

    #[test]
    fn test_successful_reload_publishes() {
        let store = GraphStore::default();
        let snapshot = store.reload(|| Ok::<_, String>(one_edge())).unwrap();
        assert_eq!(snapshot.generation, 1);
        assert_eq!(store.current().graph.edge_count(), 1);
    }

    #[test]
    fn test_concurrent_reloads_are_serialized() {
        let store = Arc::new(GraphStore::default());
        let active = Arc::new(AtomicUsize::new(0));
        let overlapped = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let active = Arc::clone(&active);
                let overlapped = Arc::clone(&overlapped);
                thread::spawn(move || {
                    store
                        .reload(|| {
                            if active.fetch_add(1, Ordering::SeqCst) > 0 {
                                overlapped.fetch_add(1, Ordering::SeqCst);
                            }
                            thread::sleep(Duration::from_millis(5));
                            active.fetch_sub(1, Ordering::SeqCst);
                            Ok::<_, String>(one_edge())
                        })
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(overlapped.load(Ordering::SeqCst), 0);
        assert_eq!(store.generation(), 8);
    }

    #[test]
    fn test_readers_see_complete_graphs() {
        let store = Arc::new(GraphStore::default());
        let reader = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..200 {
                    let snapshot = store.current();
                    let count = snapshot.graph.node_count();
                    assert!(count == 0 || count == 2, "saw partial graph with {count} nodes");
                }
            })
        };
        for _ in 0..20 {
            store.publish(one_edge());
        }
        reader.join().unwrap();
        assert_eq!(store.generation(), 20);
    }
}
