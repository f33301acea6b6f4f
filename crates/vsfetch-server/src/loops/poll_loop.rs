//! Live feed poll loop.
//!
//! Each cycle fetches the snapshot, gates it on the feed version, resolves
//! entities against the reference data and syncs every namespace. Cycles
//! that fail leave the last accepted version untouched and back off.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use vsfetch_client::{SnapshotSource, TrackStore, VersionedStore};
use vsfetch_core::{
    pilot_objects, resolve_controllers, Controller, Pilot, ReferenceIndex, RunwayCatalog, Version,
};

use crate::backoff::Backoff;
use crate::config::PollConfig;
use crate::reference::{ReferenceData, ReferenceLoader};
use crate::sync::{store_tracks, sync_namespace, SyncReport};

/// Result of one poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The snapshot was newer than the last accepted one and was stored.
    Processed {
        version: Version,
        reports: Vec<SyncReport>,
    },
    /// The snapshot was not newer; nothing was written.
    Stale { version: Version },
}

impl CycleOutcome {
    pub fn version(&self) -> Version {
        match self {
            CycleOutcome::Processed { version, .. } | CycleOutcome::Stale { version } => *version,
        }
    }
}

/// Everything one poll cycle talks to.
pub struct Pipeline<F, S, L> {
    source: F,
    store: S,
    reference: Arc<ReferenceData<L>>,
}

impl<F, S, L> Pipeline<F, S, L>
where
    F: SnapshotSource,
    S: VersionedStore + TrackStore,
    L: ReferenceLoader,
{
    pub fn new(source: F, store: S, reference: Arc<ReferenceData<L>>) -> Self {
        Self {
            source,
            store,
            reference,
        }
    }

    pub fn source(&self) -> &F {
        &self.source
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn reference(&self) -> &Arc<ReferenceData<L>> {
        &self.reference
    }

    /// Run one cycle against the last accepted version.
    pub async fn process(&self, prev: Option<Version>) -> Result<CycleOutcome> {
        let started = Instant::now();
        let raw = self
            .source
            .fetch_snapshot()
            .await
            .context("failed to fetch live snapshot")?;
        let version = raw.version().context("invalid snapshot timestamp")?;

        if let Some(prev) = prev {
            if version <= prev {
                tracing::debug!("snapshot version {} not newer than {}, skipping", version, prev);
                return Ok(CycleOutcome::Stale { version });
            }
        }

        let snapshot = raw.normalize().context("failed to normalize snapshot")?;
        let index = self.reference.index().await?;
        let runways = self.reference.runways().await?;
        tracing::debug!(
            "snapshot {}: {} pilots, {} controllers, {} atis",
            version,
            snapshot.pilots.len(),
            snapshot.controllers.len(),
            snapshot.atis.len()
        );

        let pilots = snapshot.pilots;
        let (tracks, pilot_report, ctrl_reports) = tokio::join!(
            store_tracks(&self.store, &pilots, version),
            self.sync_pilots(&pilots, version),
            self.sync_controllers(&index, &runways, snapshot.controllers, snapshot.atis, version),
        );

        if let Err(err) = tracks {
            tracing::warn!("track write failed: {:#}", err);
        }

        let mut reports = vec![pilot_report?];
        reports.extend(ctrl_reports?);
        tracing::info!(
            "snapshot {} processed in {:.3}s",
            version,
            started.elapsed().as_secs_f64()
        );

        Ok(CycleOutcome::Processed { version, reports })
    }

    async fn sync_pilots(&self, pilots: &[Pilot], version: Version) -> Result<SyncReport> {
        let objects = pilot_objects(pilots, version).context("failed to encode pilots")?;
        sync_namespace(&self.store, &objects, version).await
    }

    async fn sync_controllers(
        &self,
        index: &ReferenceIndex,
        runways: &RunwayCatalog,
        controllers: Vec<Controller>,
        atis: Vec<Controller>,
        version: Version,
    ) -> Result<Vec<SyncReport>> {
        let resolved = resolve_controllers(index, runways, controllers, atis);
        let airports = resolved
            .airport_objects(version)
            .context("failed to encode airports")?;
        let firs = resolved.fir_objects(version).context("failed to encode firs")?;
        let ctrls = resolved
            .controller_objects(version)
            .context("failed to encode controllers")?;

        let (airports, firs, ctrls) = tokio::join!(
            sync_namespace(&self.store, &airports, version),
            sync_namespace(&self.store, &firs, version),
            sync_namespace(&self.store, &ctrls, version),
        );
        Ok(vec![airports?, firs?, ctrls?])
    }
}

/// Poll until `shutdown` fires.
pub async fn run_poll_loop<F, S, L>(
    pipeline: Arc<Pipeline<F, S, L>>,
    config: PollConfig,
    mut shutdown: broadcast::Receiver<()>,
) where
    F: SnapshotSource + 'static,
    S: VersionedStore + TrackStore + 'static,
    L: ReferenceLoader + 'static,
{
    let mut prev: Option<Version> = None;
    let mut backoff = Backoff::new(config.backoff_base(), config.backoff_max());

    loop {
        let outcome = tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("poll loop shutting down");
                break;
            }
            outcome = pipeline.process(prev) => outcome,
        };

        let delay = next_delay(&outcome, &mut prev, &mut backoff, &config);

        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("poll loop shutting down");
                break;
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

fn next_delay(
    outcome: &Result<CycleOutcome>,
    prev: &mut Option<Version>,
    backoff: &mut Backoff,
    config: &PollConfig,
) -> Duration {
    match outcome {
        Ok(CycleOutcome::Processed { version, .. }) => {
            *prev = Some(*version);
            backoff.reset();
            config.normal_interval()
        }
        Ok(CycleOutcome::Stale { .. }) => {
            backoff.reset();
            config.idle_interval()
        }
        Err(err) => {
            let delay = backoff.fail();
            tracing::error!(
                "poll cycle failed (attempt {}), retrying in {:.1}s: {:#}",
                backoff.failures(),
                delay.as_secs_f64(),
                err
            );
            delay
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PollConfig {
        PollConfig {
            idle_interval_secs: 3,
            normal_interval_secs: 10,
            backoff_base_secs: 15,
            backoff_max_secs: 120,
        }
    }

    #[test]
    fn processed_cycle_advances_version() {
        let mut prev = None;
        let mut backoff = Backoff::new(Duration::from_secs(15), Duration::from_secs(120));
        let outcome = Ok(CycleOutcome::Processed {
            version: 42,
            reports: Vec::new(),
        });

        let delay = next_delay(&outcome, &mut prev, &mut backoff, &config());
        assert_eq!(prev, Some(42));
        assert_eq!(delay, Duration::from_secs(10));
    }

    #[test]
    fn stale_cycle_keeps_version_and_polls_sooner() {
        let mut prev = Some(42);
        let mut backoff = Backoff::new(Duration::from_secs(15), Duration::from_secs(120));
        let delay = next_delay(
            &Ok(CycleOutcome::Stale { version: 42 }),
            &mut prev,
            &mut backoff,
            &config(),
        );
        assert_eq!(prev, Some(42));
        assert_eq!(delay, Duration::from_secs(3));
    }

    #[test]
    fn failures_back_off_and_success_resets() {
        let mut prev = Some(7);
        let mut backoff = Backoff::new(Duration::from_secs(15), Duration::from_secs(120));
        let failed: Result<CycleOutcome> = Err(anyhow::anyhow!("feed down"));

        let first = next_delay(&failed, &mut prev, &mut backoff, &config());
        let second = next_delay(&failed, &mut prev, &mut backoff, &config());
        assert!(first >= Duration::from_secs(15) && first <= Duration::from_secs(18));
        assert!(second >= Duration::from_secs(30) && second <= Duration::from_secs(36));
        assert_eq!(backoff.failures(), 2);
        assert_eq!(prev, Some(7));

        next_delay(&Ok(CycleOutcome::Stale { version: 7 }), &mut prev, &mut backoff, &config());
        assert_eq!(backoff.failures(), 0);
    }
}
