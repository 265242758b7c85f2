use moka::sync::Cache;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct ConnCtx {
    pub user_id: String,
    pub document_id: String,
}

/// Live WebSocket connections, for diagnostics
#[derive(Clone)]
pub struct ConnectionRegistry {
    cache: Cache<Uuid, ConnCtx>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        let cache = Cache::builder()
            .max_capacity(100_000)
            .time_to_idle(Duration::from_secs(3 * 60 * 60))
            .build();
        info!("Connection context cache initialized");
        Self { cache }
    }

    pub fn register(&self, connection_id: Uuid, ctx: ConnCtx) {
        self.cache.insert(connection_id, ctx);
    }

    /// Refresh idle timer
    pub fn touch(&self, connection_id: &Uuid) {
        let _ = self.cache.get(connection_id);
    }

    pub fn release(&self, connection_id: &Uuid) -> Option<ConnCtx> {
        self.cache.remove(connection_id)
    }

    pub fn count(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_and_releases_connections() {
        let registry = ConnectionRegistry::new();
        let id = Uuid::new_v4();
        registry.register(id, ConnCtx { user_id: "ada".into(), document_id: "d1".into() });
        assert_eq!(registry.count(), 1);

        let ctx = registry.release(&id).unwrap();
        assert_eq!(ctx.user_id, "ada");
        assert_eq!(ctx.document_id, "d1");
        assert!(registry.release(&id).is_none());
        assert_eq!(registry.count(), 0);
    }
}
