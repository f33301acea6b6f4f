//! Reference data service.
//!
//! Holds the reference index and runway catalog for the lifetime of the
//! process. Both are loaded on first use and replaced only by an explicit
//! [`ReferenceData::reload`].

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;
use vsfetch_client::SourceClient;
use vsfetch_core::{ReferenceIndex, RunwayCatalog};

/// Loads reference datasets from wherever they live.
#[async_trait]
pub trait ReferenceLoader: Send + Sync {
    async fn load_index(&self) -> Result<ReferenceIndex>;
    async fn load_runways(&self) -> Result<RunwayCatalog>;
}

#[async_trait]
impl ReferenceLoader for SourceClient {
    async fn load_index(&self) -> Result<ReferenceIndex> {
        self.fetch_reference_index()
            .await
            .context("failed to load reference data")
    }

    async fn load_runways(&self) -> Result<RunwayCatalog> {
        self.fetch_runway_catalog()
            .await
            .context("failed to load runway catalog")
    }
}

pub struct ReferenceData<L> {
    loader: L,
    index: RwLock<Option<Arc<ReferenceIndex>>>,
    runways: RwLock<Option<Arc<RunwayCatalog>>>,
}

impl<L: ReferenceLoader> ReferenceData<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            index: RwLock::new(None),
            runways: RwLock::new(None),
        }
    }

    /// The reference index, loading it if nothing is cached yet.
    pub async fn index(&self) -> Result<Arc<ReferenceIndex>> {
        if let Some(index) = self.index.read().await.as_ref() {
            return Ok(index.clone());
        }

        let mut slot = self.index.write().await;
        if let Some(index) = slot.as_ref() {
            return Ok(index.clone());
        }
        let index = Arc::new(self.loader.load_index().await?);
        *slot = Some(index.clone());
        Ok(index)
    }

    /// The runway catalog, loading it if nothing is cached yet.
    pub async fn runways(&self) -> Result<Arc<RunwayCatalog>> {
        if let Some(runways) = self.runways.read().await.as_ref() {
            return Ok(runways.clone());
        }

        let mut slot = self.runways.write().await;
        if let Some(runways) = slot.as_ref() {
            return Ok(runways.clone());
        }
        let runways = Arc::new(self.loader.load_runways().await?);
        *slot = Some(runways.clone());
        Ok(runways)
    }

    /// Fetch both datasets again and swap them in. On failure the cached
    /// data stays untouched.
    pub async fn reload(&self) -> Result<()> {
        let index = Arc::new(self.loader.load_index().await?);
        let runways = Arc::new(self.loader.load_runways().await?);

        *self.index.write().await = Some(index);
        *self.runways.write().await = Some(runways);
        tracing::info!("reference data reloaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingLoader {
        loads: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl ReferenceLoader for CountingLoader {
        async fn load_index(&self) -> Result<ReferenceIndex> {
            if self.fail {
                anyhow::bail!("reference source unavailable");
            }
            let n = self.loads.fetch_add(1, Ordering::SeqCst);
            let text = format!("[Airports]\nEDDF|Frankfurt {}|50.0|8.5|FRA|EDGG|0\n", n);
            Ok(ReferenceIndex::parse(&text, &HashMap::new())?)
        }

        async fn load_runways(&self) -> Result<RunwayCatalog> {
            Ok(RunwayCatalog::default())
        }
    }

    fn loader(fail: bool) -> CountingLoader {
        CountingLoader {
            loads: AtomicUsize::new(0),
            fail,
        }
    }

    #[tokio::test]
    async fn loads_lazily_once() {
        let data = ReferenceData::new(loader(false));
        let first = data.index().await.unwrap();
        let second = data.index().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(data.loader.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn reload_replaces_cached_index() {
        let data = ReferenceData::new(loader(false));
        let before = data.index().await.unwrap();
        data.reload().await.unwrap();
        let after = data.index().await.unwrap();
        assert_eq!(before.airports()[0].name, "Frankfurt 0");
        assert_eq!(after.airports()[0].name, "Frankfurt 1");
    }

    #[tokio::test]
    async fn load_failure_propagates() {
        let data = ReferenceData::new(loader(true));
        assert!(data.index().await.is_err());
        assert!(data.reload().await.is_err());
    }
}
