//! In-memory `RouteStore` for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use brigade_common::{BrigadeError, Route};

use crate::progress::RouteStore;

#[derive(Default)]
pub struct MemoryRouteStore {
    routes: Mutex<HashMap<Uuid, Route>>,
}

impl MemoryRouteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route_count(&self) -> usize {
        self.routes.lock().expect("memory route store poisoned").len()
    }

    pub fn stored_progress(&self, unit_id: Uuid) -> Option<f64> {
        self.routes
            .lock()
            .expect("memory route store poisoned")
            .get(&unit_id)
            .map(|r| r.progress_percent)
    }
}

#[async_trait]
impl RouteStore for MemoryRouteStore {
    async fn save_route(&self, route: &Route) -> Result<(), BrigadeError> {
        self.routes
            .lock()
            .expect("memory route store poisoned")
            .insert(route.unit_id, route.clone());
        Ok(())
    }

    async fn load_route(&self, unit_id: Uuid) -> Result<Option<Route>, BrigadeError> {
        Ok(self
            .routes
            .lock()
            .expect("memory route store poisoned")
            .get(&unit_id)
            .cloned())
    }

    async fn set_progress(&self, unit_id: Uuid, percent: f64) -> Result<(), BrigadeError> {
        let mut routes = self.routes.lock().expect("memory route store poisoned");
        let route = routes
            .get_mut(&unit_id)
            .ok_or_else(|| BrigadeError::NotFound(format!("route for unit {unit_id}")))?;
        route.progress_percent = percent;
        Ok(())
    }

    async fn delete_route(&self, unit_id: Uuid) -> Result<(), BrigadeError> {
        self.routes
            .lock()
            .expect("memory route store poisoned")
            .remove(&unit_id);
        Ok(())
    }
}
