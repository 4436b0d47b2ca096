//! Compiled routing graph cache.
//!
//! # Responsibilities
//! - Compile each (routing, date) map once and share it across validations
//! - Keep forward and reversed orientations as separate entries
//! - Remember routings that have no map so they are not recompiled
//!
//! # Design Decisions
//! - `Arc<DashMap>` so clones of the cache share entries across workers
//! - Graphs are immutable once inserted; readers clone the `Arc`
//! - Beyond `capacity` entries, graphs are compiled but not retained

use std::sync::Arc;

use chrono::NaiveDate;
use dashmap::DashMap;

use crate::data::DataHandle;
use crate::observability::metrics;
use crate::routing::specified::SpecifiedRouting;
use crate::routing::types::{Routing, RoutingId};

/// Identity of one compiled graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GraphKey {
    pub routing: RoutingId,
    pub date: NaiveDate,
    pub reversed: bool,
    /// Base routing an add-on was compiled against.
    pub base: Option<RoutingId>,
}

/// Thread-safe store of compiled graphs.
#[derive(Clone)]
pub struct GraphCache {
    inner: Arc<DashMap<GraphKey, Option<Arc<SpecifiedRouting>>>>,
    capacity: usize,
}

impl Default for GraphCache {
    fn default() -> Self {
        Self::new(4096)
    }
}

impl GraphCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            capacity,
        }
    }

    /// Compiled graph of `routing` in the requested orientation.
    ///
    /// `None` when the routing has no map, or when a reversal was requested
    /// for a directional routing.
    pub fn get_or_compile(
        &self,
        routing: &Routing,
        date: NaiveDate,
        data: &dyn DataHandle,
        base: Option<&SpecifiedRouting>,
        reversed: bool,
    ) -> Option<Arc<SpecifiedRouting>> {
        let key = GraphKey {
            routing: routing.id.clone(),
            date,
            reversed,
            base: base.map(|b| b.id.clone()),
        };
        if let Some(hit) = self.inner.get(&key) {
            metrics::record_graph_cache(true);
            return hit.value().clone();
        }
        metrics::record_graph_cache(false);

        let compiled = if reversed {
            self.get_or_compile(routing, date, data, base, false)
                .and_then(|forward| forward.reverse_map())
                .map(Arc::new)
        } else {
            SpecifiedRouting::initialize(routing, date, data, base).map(Arc::new)
        };

        if self.inner.len() < self.capacity {
            self.inner.insert(key, compiled.clone());
        } else {
            tracing::debug!(routing = %routing.id, "Graph cache full, not retaining");
        }
        compiled
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&self) {
        self.inner.clear();
    }
}
