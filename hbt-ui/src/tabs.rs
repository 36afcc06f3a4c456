//! Per-tab session state
//!
//! Each browser tab owns a session store (what the page would otherwise keep
//! in its own tab storage) and, once the comparison screen is reached, a
//! [`ComparisonSession`]. Tabs are identified by a UUID the page obtains once
//! and sends with every request.
//!
//! Every tab sits behind its own async mutex, so one tab's events are handled
//! strictly in order while tabs never contend with each other.

use crate::compare::{CompareError, ComparisonSession};
use hbt_common::MemorySessionStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

/// State of one browser tab
#[derive(Debug, Default)]
pub struct TabSession {
    pub store: MemorySessionStore,
    pub compare: Option<ComparisonSession>,
}

impl TabSession {
    /// Comparison in progress, created from the store on first access
    pub fn comparison(&mut self) -> Result<&mut ComparisonSession, CompareError> {
        if self.compare.is_none() {
            self.compare = Some(ComparisonSession::load(&self.store)?);
        }
        self.compare.as_mut().ok_or(CompareError::MissingPriorState)
    }

    /// Forget the comparison; the next access rebuilds it from the store
    pub fn reset_comparison(&mut self) {
        self.compare = None;
    }
}

/// All open tabs
#[derive(Debug, Default)]
pub struct TabRegistry {
    tabs: RwLock<HashMap<Uuid, Arc<Mutex<TabSession>>>>,
}

impl TabRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new tab
    pub async fn open(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.tabs
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(TabSession::default())));
        debug!(tab_id = %id, "Opened tab session");
        id
    }

    /// Session for `id`, created empty if unknown (e.g. after a restart)
    ///
    /// Only for handlers that store something in the tab.
    pub async fn get_or_open(&self, id: Uuid) -> Arc<Mutex<TabSession>> {
        if let Some(tab) = self.tabs.read().await.get(&id) {
            return Arc::clone(tab);
        }

        let mut tabs = self.tabs.write().await;
        Arc::clone(tabs.entry(id).or_insert_with(|| {
            debug!(tab_id = %id, "Recreated unknown tab session");
            Arc::new(Mutex::new(TabSession::default()))
        }))
    }

    /// Session for `id` if the tab has ever been written to
    pub async fn get(&self, id: Uuid) -> Option<Arc<Mutex<TabSession>>> {
        self.tabs.read().await.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.tabs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tabs.read().await.is_empty()
    }
}
