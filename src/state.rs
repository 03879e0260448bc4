use crate::config::Config;
use crate::forward::{Forwarder, ResourceChange};
use crate::store::{MemoryStore, Store};
use scim_filter::FilterParser;
use scim_types::{Group, User};
use std::sync::Arc;

/// Shared application state accessible to all handlers
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn Store<User>>,

    pub groups: Arc<dyn Store<Group>>,

    /// Mirrors committed changes downstream
    pub forwarder: Arc<dyn Forwarder>,

    /// Parser configured with the filter limits from `config`
    pub parser: FilterParser,

    pub config: Arc<Config>,
}

impl AppState {
    /// State backed by empty in-memory stores.
    pub fn new(config: Config, forwarder: Arc<dyn Forwarder>) -> Self {
        Self {
            users: Arc::new(MemoryStore::new()),
            groups: Arc::new(MemoryStore::new()),
            forwarder,
            parser: FilterParser::with_limits(config.filter.limits()),
            config: Arc::new(config),
        }
    }

    /// Forwards a committed change. Failures are logged and never reach the
    /// client, whose change has already been stored.
    pub async fn propagate(&self, change: ResourceChange) {
        if let Err(e) = self.forwarder.forward(&change).await {
            tracing::warn!(
                "Could not forward {:?} of {} {}: {}",
                change.kind,
                change.resource_type,
                change.id,
                e
            );
        }
    }
}
