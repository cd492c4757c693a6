//! # Application registry.
//!
//! Maps [`ApplicationId`] to [`ManagedApplication`] while remembering the
//! registration order, which bulk start/stop iterate in. The lock guards only
//! structural mutation and lookups; it is never held across a start/stop
//! transition, so status queries stay responsive while applications transition.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::engine::ApplicationId;
use crate::env::ManagedApplication;
use crate::error::EnvError;

#[derive(Default)]
struct Inner {
    map: HashMap<ApplicationId, Arc<ManagedApplication>>,
    order: Vec<ApplicationId>,
}

/// Concurrent id-to-application map preserving registration order.
#[derive(Default)]
pub(crate) struct AppRegistry {
    inner: RwLock<Inner>,
}

impl AppRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Inserts a new record, rejecting duplicate ids.
    pub(crate) async fn insert(&self, app: Arc<ManagedApplication>) -> Result<(), EnvError> {
        let mut inner = self.inner.write().await;
        if inner.map.contains_key(app.id()) {
            return Err(EnvError::IdCollision {
                id: app.id().clone(),
            });
        }
        inner.order.push(app.id().clone());
        inner.map.insert(app.id().clone(), app);
        Ok(())
    }

    /// Looks up a record by id.
    pub(crate) async fn get(&self, id: &ApplicationId) -> Result<Arc<ManagedApplication>, EnvError> {
        self.inner
            .read()
            .await
            .map
            .get(id)
            .cloned()
            .ok_or_else(|| EnvError::UnknownApplication { id: id.clone() })
    }

    /// Removes a record by id and returns it.
    pub(crate) async fn remove(
        &self,
        id: &ApplicationId,
    ) -> Result<Arc<ManagedApplication>, EnvError> {
        let mut inner = self.inner.write().await;
        let app = inner
            .map
            .remove(id)
            .ok_or_else(|| EnvError::UnknownApplication { id: id.clone() })?;
        inner.order.retain(|o| o != id);
        Ok(app)
    }

    /// All records, in registration order.
    pub(crate) async fn snapshot(&self) -> Vec<Arc<ManagedApplication>> {
        let inner = self.inner.read().await;
        inner
            .order
            .iter()
            .filter_map(|id| inner.map.get(id).cloned())
            .collect()
    }

    /// All ids, in registration order.
    pub(crate) async fn ids(&self) -> Vec<ApplicationId> {
        self.inner.read().await.order.clone()
    }
}
