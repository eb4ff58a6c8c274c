use std::sync::{Mutex, PoisonError};

use gload_common::UpstreamDefinition;
use url::Url;

/// One backend endpoint plus its load-balancer counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamInfo {
    pub id: String,
    pub url: Url,
    pub weight: u32,
    pub current_weight: i64,
}

impl From<UpstreamDefinition> for UpstreamInfo {
    fn from(def: UpstreamDefinition) -> Self {
        Self {
            id: def.id,
            url: def.url,
            weight: def.weight,
            current_weight: 0,
        }
    }
}

/// The endpoint chosen for one call, detached from the counter state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamTarget {
    pub id: String,
    pub url: Url,
}

impl UpstreamInfo {
    fn target(&self) -> UpstreamTarget {
        UpstreamTarget {
            id: self.id.clone(),
            url: self.url.clone(),
        }
    }
}

/// Ordered upstreams of a channel. Order is the selection tie-break order.
///
/// All counter reads and writes happen under `entries`; the lock is held only
/// for the duration of one selection and never across IO.
#[derive(Debug)]
pub struct UpstreamSet {
    entries: Mutex<Vec<UpstreamInfo>>,
}

impl UpstreamSet {
    pub fn new(upstreams: Vec<UpstreamInfo>) -> Self {
        Self {
            entries: Mutex::new(upstreams),
        }
    }

    pub fn from_definitions(defs: Vec<UpstreamDefinition>) -> Self {
        Self::new(defs.into_iter().map(UpstreamInfo::from).collect())
    }

    // Selection never panics while holding the lock, so a poisoned guard
    // still holds consistent counters.
    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<UpstreamInfo>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Smooth weighted round robin.
    ///
    /// Every entry gains its static weight, the largest counter wins (first in
    /// order on ties) and pays back the total weight. A single entry is
    /// returned as-is without touching its counter.
    pub fn select(&self) -> Option<UpstreamTarget> {
        let mut entries = self.lock();
        match entries.len() {
            0 => return None,
            1 => return Some(entries[0].target()),
            _ => {}
        }

        let mut total: i64 = 0;
        let mut best = 0;
        for idx in 0..entries.len() {
            let weight = i64::from(entries[idx].weight);
            total += weight;
            entries[idx].current_weight += weight;
            if entries[idx].current_weight > entries[best].current_weight {
                best = idx;
            }
        }

        let winner = &mut entries[best];
        winner.current_weight -= total;
        Some(winner.target())
    }

    /// Looks an upstream up by id without touching any counter.
    pub fn find(&self, id: &str) -> Option<UpstreamTarget> {
        self.lock()
            .iter()
            .find(|up| up.id == id)
            .map(UpstreamInfo::target)
    }

    /// Copy of the current state, counters included.
    pub fn snapshot(&self) -> Vec<UpstreamInfo> {
        self.lock().clone()
    }
}
