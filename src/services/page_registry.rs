//! Live page contexts keyed by page id.
//!
//! Pages are dropped on close, when they sit idle past the configured
//! timeout, or when opening a new page would exceed the page cap.

use std::{sync::Arc, time::Duration as StdDuration};

use chrono::{Duration, Utc};
use dashmap::DashMap;
use tokio::{task::JoinHandle, time::interval};
use tracing::{info, warn};
use uuid::Uuid;

use super::page::PageContext;
use crate::config::PageLimits;
use crate::error::DappError;

pub struct PageRegistry {
    pages: DashMap<Uuid, Arc<PageContext>>,
    max_pages: usize,
}

impl PageRegistry {
    pub fn with_limit(max_pages: usize) -> Self {
        Self {
            pages: DashMap::new(),
            max_pages: max_pages.max(1),
        }
    }

    /// Registers a new page with a fresh counter identity.
    pub fn open(&self) -> Arc<PageContext> {
        while self.pages.len() >= self.max_pages {
            let oldest = self
                .pages
                .iter()
                .min_by_key(|entry| entry.value().last_used())
                .map(|entry| *entry.key());
            let Some(id) = oldest else { break };
            if self.pages.remove(&id).is_some() {
                warn!("Page limit {} reached, evicted page {}", self.max_pages, id);
            }
        }

        let page = Arc::new(PageContext::new());
        self.pages.insert(page.id(), page.clone());
        page
    }

    /// Looks up a page and marks it as used.
    pub fn get(&self, id: Uuid) -> Result<Arc<PageContext>, DappError> {
        let page = self
            .pages
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(DappError::PageNotFound(id))?;
        page.touch();
        Ok(page)
    }

    pub fn close(&self, id: Uuid) -> Result<(), DappError> {
        self.pages
            .remove(&id)
            .map(|_| info!("Page {} closed", id))
            .ok_or(DappError::PageNotFound(id))
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Drops every page not used within `max_idle`; returns how many went.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let Some(cutoff) = Utc::now().checked_sub_signed(max_idle) else {
            return 0;
        };
        let idle: Vec<Uuid> = self
            .pages
            .iter()
            .filter(|entry| entry.value().last_used() < cutoff)
            .map(|entry| *entry.key())
            .collect();

        let mut evicted = 0;
        for id in idle {
            // re-check: the page may have been used since the scan
            if self
                .pages
                .remove_if(&id, |_, page| page.last_used() < cutoff)
                .is_some()
            {
                evicted += 1;
            }
        }
        if evicted > 0 {
            info!("Evicted {} idle page(s), {} still open", evicted, self.pages.len());
        }
        evicted
    }

    /// Starts the background task that evicts idle pages.
    pub fn spawn_sweeper(self: &Arc<Self>, limits: PageLimits) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        let max_idle = Duration::from_std(StdDuration::from_secs(limits.idle_timeout_secs))
            .unwrap_or(Duration::MAX);
        let period = StdDuration::from_secs(limits.sweep_interval_secs.max(1));

        tokio::spawn(async move {
            let mut ticker = interval(period);
            loop {
                ticker.tick().await;
                registry.evict_idle(max_idle);
            }
        })
    }
}

impl Default for PageRegistry {
    fn default() -> Self {
        Self::with_limit(PageLimits::default().max_pages)
    }
}
