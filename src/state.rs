use std::sync::Arc;

use crate::config::Config;
use crate::db::ChatStore;
use crate::fanout::{BroadcastTrigger, ConnectionRegistry};

/// Everything the route handlers share. Built once in `main`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<ConnectionRegistry>,
    pub trigger: Arc<BroadcastTrigger>,
    pub store: Option<Arc<ChatStore>>,
}

impl AppState {
    /// Wire the fan-out engine around a fresh registry
    pub fn new(config: Config, store: Option<ChatStore>) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let dedup = crate::fanout::DedupCache::new(config.dedup_window(), config.dedup_max_entries);
        let trigger = crate::fanout::trigger::build(registry.clone(), dedup, config.send_timeout());
        Self {
            config: Arc::new(config),
            registry,
            trigger: Arc::new(trigger),
            store: store.map(Arc::new),
        }
    }
}
