//! Live feed and reference dataset sources.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use vsfetch_core::{parse_boundaries, Boundaries, RawSnapshot, ReferenceIndex, RunwayCatalog};

use crate::error::Result;
use crate::http::get_text;

pub const VATSIM_DATA_URL: &str = "https://data.vatsim.net/v3/vatsim-data.json";
pub const FIXED_DATA_URL: &str =
    "https://raw.githubusercontent.com/vatsimnetwork/vatspy-data-project/master/VATSpy.dat";
pub const BOUNDARIES_DATA_URL: &str =
    "https://raw.githubusercontent.com/vatsimnetwork/vatspy-data-project/master/Boundaries.geojson";
pub const RUNWAY_MAP_URL: &str =
    "https://raw.githubusercontent.com/viert/ourairports-json/main/output/runway_split_map.json";

/// Where the live feed and the reference datasets are fetched from.
#[derive(Debug, Clone)]
pub struct SourceUrls {
    pub data_url: String,
    pub fixed_data_url: String,
    pub boundaries_url: String,
    pub runways_url: String,
}

impl Default for SourceUrls {
    fn default() -> Self {
        Self {
            data_url: VATSIM_DATA_URL.to_string(),
            fixed_data_url: FIXED_DATA_URL.to_string(),
            boundaries_url: BOUNDARIES_DATA_URL.to_string(),
            runways_url: RUNWAY_MAP_URL.to_string(),
        }
    }
}

/// Anything that can produce the current live snapshot.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_snapshot(&self) -> Result<RawSnapshot>;
}

/// HTTP client for the live feed and the static reference datasets.
#[derive(Clone)]
pub struct SourceClient {
    client: Client,
    urls: SourceUrls,
    timeout: Duration,
}

impl SourceClient {
    pub fn new(client: Client, urls: SourceUrls, timeout: Duration) -> Self {
        Self {
            client,
            urls,
            timeout,
        }
    }

    pub fn urls(&self) -> &SourceUrls {
        &self.urls
    }

    /// Fetch and parse the boundary feature collection.
    pub async fn fetch_boundaries(&self) -> Result<HashMap<String, Boundaries>> {
        tracing::debug!("loading and parsing boundaries from {}", self.urls.boundaries_url);
        let text = get_text(&self.client, &self.urls.boundaries_url, self.timeout).await?;
        Ok(parse_boundaries(&text)?)
    }

    /// Fetch boundaries and the reference dataset and build the index.
    pub async fn fetch_reference_index(&self) -> Result<ReferenceIndex> {
        let bounds = self.fetch_boundaries().await?;

        let started = Instant::now();
        tracing::debug!("loading fixed data from {}", self.urls.fixed_data_url);
        let text = get_text(&self.client, &self.urls.fixed_data_url, self.timeout).await?;
        let index = ReferenceIndex::parse(&text, &bounds)?;
        tracing::info!(
            "reference data loaded in {:.3}s ({} airports, {} firs)",
            started.elapsed().as_secs_f64(),
            index.airports().len(),
            index.firs().len()
        );
        Ok(index)
    }

    pub async fn fetch_runway_catalog(&self) -> Result<RunwayCatalog> {
        let started = Instant::now();
        tracing::debug!("loading runway catalog from {}", self.urls.runways_url);
        let text = get_text(&self.client, &self.urls.runways_url, self.timeout).await?;
        let catalog = RunwayCatalog::parse(&text)?;
        tracing::info!(
            "runway catalog loaded in {:.3}s ({} airports)",
            started.elapsed().as_secs_f64(),
            catalog.len()
        );
        Ok(catalog)
    }
}

#[async_trait]
impl SnapshotSource for SourceClient {
    async fn fetch_snapshot(&self) -> Result<RawSnapshot> {
        tracing::debug!("fetching data from {}", self.urls.data_url);
        let text = get_text(&self.client, &self.urls.data_url, self.timeout).await?;
        Ok(RawSnapshot::parse(&text)?)
    }
}
