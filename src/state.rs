use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::db::DocumentStore;
use crate::services::doc_lifecycle_service::{DocLifecycleService, DocLimits};
use crate::services::session_service::SessionDirectory;
use crate::services::update_policy::UpdatePolicy;
use crate::websocket::broadcast::BroadcastHub;
use crate::websocket::connctx::ConnectionRegistry;
use crate::websocket::gateway::CollaborationGateway;

/// Shared handles for every route and socket
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn DocumentStore>,
    pub sessions: Arc<dyn SessionDirectory>,
    pub docs: Arc<DocLifecycleService>,
    pub gateway: Arc<CollaborationGateway>,
    pub connections: ConnectionRegistry,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn DocumentStore>, sessions: Arc<dyn SessionDirectory>) -> Self {
        let policy = config.update_policy.parse::<UpdatePolicy>().unwrap_or_else(|e| {
            warn!("{}, falling back to {:?}", e, UpdatePolicy::default());
            UpdatePolicy::default()
        });
        info!("Update policy: {:?}", policy);

        let limits = DocLimits {
            max_content_bytes: config.doc_max_content_bytes,
            ttl: config.doc_ttl(),
        };
        let docs = Arc::new(DocLifecycleService::new(store.clone(), sessions.clone(), policy, limits));
        let hub = Arc::new(BroadcastHub::new(config.broadcast_capacity));
        let gateway = Arc::new(CollaborationGateway::new(docs.clone(), hub));

        Self {
            config: Arc::new(config),
            store,
            sessions,
            docs,
            gateway,
            connections: ConnectionRegistry::new(),
        }
    }

    pub fn hub(&self) -> &Arc<BroadcastHub> {
        self.gateway.hub()
    }
}
