//! Bounded route cache.
//!
//! Simulated fleets hammer the provider with near-identical origin and
//! destination pairs, so results are kept under a key rounded to 1e-5
//! degrees (about a meter). Entries are evicted by capacity only, never by
//! age; callers that need fresh road conditions bypass the cache through
//! `RoutePlanner::plan_fresh`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use brigade_common::GeoPoint;

use crate::provider::PlannedRoute;

const MICRODEGREES: f64 = 1e5;

/// Origin/destination pair in integer microdegrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteKey {
    from_lat: i64,
    from_lon: i64,
    to_lat: i64,
    to_lon: i64,
}

impl RouteKey {
    pub fn new(origin: GeoPoint, destination: GeoPoint) -> Self {
        Self {
            from_lat: (origin.lat * MICRODEGREES).round() as i64,
            from_lon: (origin.lon * MICRODEGREES).round() as i64,
            to_lat: (destination.lat * MICRODEGREES).round() as i64,
            to_lon: (destination.lon * MICRODEGREES).round() as i64,
        }
    }
}

struct CacheSlot {
    route: Arc<PlannedRoute>,
    last_used: u64,
}

struct CacheInner {
    slots: HashMap<RouteKey, CacheSlot>,
    tick: u64,
}

/// Least-recently-used route cache. Injectable so each test can own an
/// independent instance and assert eviction deterministically.
pub struct RouteCache {
    inner: Mutex<CacheInner>,
    capacity: usize,
}

impl RouteCache {
    pub const DEFAULT_CAPACITY: usize = 100;

    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                slots: HashMap::with_capacity(capacity),
                tick: 0,
            }),
            capacity: capacity.max(1),
        }
    }

    pub fn get(&self, origin: GeoPoint, destination: GeoPoint) -> Option<Arc<PlannedRoute>> {
        let key = RouteKey::new(origin, destination);
        let mut inner = self.inner.lock().expect("route cache lock poisoned");
        inner.tick += 1;
        let tick = inner.tick;

        let slot = inner.slots.get_mut(&key)?;
        slot.last_used = tick;
        Some(Arc::clone(&slot.route))
    }

    /// Insert (or replace) an entry and return the shared handle. Evicts
    /// the least recently used entry when over capacity.
    pub fn insert(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        route: PlannedRoute,
    ) -> Arc<PlannedRoute> {
        let key = RouteKey::new(origin, destination);
        let route = Arc::new(route);
        let mut inner = self.inner.lock().expect("route cache lock poisoned");
        inner.tick += 1;
        let tick = inner.tick;

        inner.slots.insert(
            key,
            CacheSlot {
                route: Arc::clone(&route),
                last_used: tick,
            },
        );

        while inner.slots.len() > self.capacity {
            let oldest = inner
                .slots
                .iter()
                .min_by_key(|(_, slot)| slot.last_used)
                .map(|(key, _)| *key);
            match oldest {
                Some(key) => {
                    inner.slots.remove(&key);
                }
                None => break,
            }
        }

        route
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("route cache lock poisoned").slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for RouteCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
