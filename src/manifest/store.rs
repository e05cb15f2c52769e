//! The current compiled route table.
//!
//! Readers take an `Arc` snapshot without locking and keep it for the whole
//! request; a rebuild swaps in a new pipeline atomically. A request already in
//! flight finishes against the snapshot it started with.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::dispatch::pipeline::Pipeline;
use crate::observability::metrics;

#[derive(Clone)]
pub struct ManifestStore {
    current: Arc<ArcSwap<Pipeline>>,
}

impl ManifestStore {
    pub fn new(initial: Pipeline) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(initial)),
        }
    }

    /// The pipeline requests should match against right now.
    pub fn snapshot(&self) -> Arc<Pipeline> {
        self.current.load_full()
    }

    /// Replace the current pipeline, returning the one it replaced.
    pub fn publish(&self, next: Pipeline) -> Arc<Pipeline> {
        let routes = next.manifest().routes.len();
        let previous = self.current.swap(Arc::new(next));
        metrics::record_publish(routes);
        tracing::info!(routes, "Manifest published");
        previous
    }
}

impl std::fmt::Debug for ManifestStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManifestStore")
            .field("routes", &self.current.load().manifest().routes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::registry::Registry;
    use crate::manifest::format::Manifest;

    #[test]
    fn test_snapshot_survives_publish() {
        let registry = Registry::with_builtins();
        let store = ManifestStore::new(Pipeline::compile(Manifest::empty(), &registry).unwrap());
        let before = store.snapshot();

        let raw = r#"{"version":1,"routes":[{"method":"GET","template":"/a","status":200,
            "headers":{},"delay":0,"enabled":true,"handler":{"kind":"static","body":1},
            "middleware":[],"source":"a.get.json"}],"configChain":[]}"#;
        let next = Pipeline::compile(Manifest::from_json(raw).unwrap(), &registry).unwrap();
        store.publish(next);

        assert!(before.manifest().routes.is_empty());
        assert_eq!(store.snapshot().manifest().routes.len(), 1);
    }
}
