//! Synchronous change notifications published by commits.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::models::Artifact;

/// Receives commit notifications. All methods default to no-ops.
///
/// Listeners run on the committing thread while the commit is still in
/// progress and must not commit themselves.
pub trait ArtifactListener: Send + Sync {
    fn artifact_added(&self, _artifact: &Arc<Artifact>) {}

    fn artifact_removed(&self, _artifact: &Arc<Artifact>) {}

    fn artifact_changed(&self, _original: &Arc<Artifact>, _artifact: &Arc<Artifact>) {}
}

#[derive(Debug, Clone)]
pub enum ArtifactEvent {
    Added(Arc<Artifact>),
    Removed(Arc<Artifact>),
    Changed {
        original: Arc<Artifact>,
        artifact: Arc<Artifact>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Listener list for one artifact manager.
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<Vec<(SubscriptionId, Arc<dyn ArtifactListener>)>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: Arc<dyn ArtifactListener>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .expect("listener lock poisoned")
            .push((id, listener));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.write().expect("listener lock poisoned");
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().expect("listener lock poisoned").len()
    }

    /// Deliver `event` to every listener subscribed at the time of the call.
    pub fn publish(&self, event: &ArtifactEvent) {
        // Listeners may (un)subscribe while being notified.
        let listeners: Vec<Arc<dyn ArtifactListener>> = self
            .listeners
            .read()
            .expect("listener lock poisoned")
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            match event {
                ArtifactEvent::Added(artifact) => listener.artifact_added(artifact),
                ArtifactEvent::Removed(artifact) => listener.artifact_removed(artifact),
                ArtifactEvent::Changed { original, artifact } => {
                    listener.artifact_changed(original, artifact)
                }
            }
        }
    }
}

/// Logs every notification through `tracing`.
pub struct TracingListener;

impl ArtifactListener for TracingListener {
    fn artifact_added(&self, artifact: &Arc<Artifact>) {
        tracing::info!("Artifact added: {}", artifact.name());
    }

    fn artifact_removed(&self, artifact: &Arc<Artifact>) {
        tracing::info!("Artifact removed: {}", artifact.name());
    }

    fn artifact_changed(&self, original: &Arc<Artifact>, artifact: &Arc<Artifact>) {
        if original.name() == artifact.name() {
            tracing::info!("Artifact changed: {}", artifact.name());
        } else {
            tracing::info!(
                "Artifact changed: {} (renamed from {})",
                artifact.name(),
                original.name()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Names(Mutex<Vec<String>>);

    impl ArtifactListener for Names {
        fn artifact_added(&self, artifact: &Arc<Artifact>) {
            self.0.lock().unwrap().push(artifact.name().to_string());
        }
    }

    #[test]
    fn unsubscribed_listener_is_not_notified() {
        let bus = EventBus::new();
        let first = Arc::new(Names::default());
        let second = Arc::new(Names::default());
        let first_id = bus.subscribe(first.clone());
        bus.subscribe(second.clone());

        assert!(bus.unsubscribe(first_id));
        assert!(!bus.unsubscribe(first_id));
        bus.publish(&ArtifactEvent::Added(Arc::new(Artifact::new("a", "plain"))));

        assert!(first.0.lock().unwrap().is_empty());
        assert_eq!(*second.0.lock().unwrap(), vec!["a".to_string()]);
        assert_eq!(bus.listener_count(), 1);
    }
}
