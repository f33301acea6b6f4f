//! Store synchronization.
//!
//! Each namespace is upserted first and reconciled second: the store's key
//! set under the namespace prefix is listed and every key the current cycle
//! did not produce is deleted in one request tagged with the cycle version.
//! Namespaces never interact.

use std::collections::BTreeSet;
use std::time::Instant;

use anyhow::{Context, Result};
use vsfetch_client::{TrackStore, VersionedStore};
use vsfetch_core::{stale_keys, track_objects, KeyedObjects, Namespace, Pilot, Version};

/// Outcome of syncing one namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub namespace: Namespace,
    pub upserted: usize,
    pub deleted: usize,
}

/// Delete every key under `namespace` that is not in `current_keys`.
/// Returns the deleted keys.
pub async fn reconcile<S>(
    store: &S,
    namespace: Namespace,
    current_keys: &BTreeSet<String>,
    version: Version,
) -> Result<BTreeSet<String>>
where
    S: VersionedStore + ?Sized,
{
    let existing = store
        .list_keys(&namespace.prefix())
        .await
        .with_context(|| format!("failed to list {} keys", namespace))?;
    let existing_count = existing.len();

    let stale = stale_keys(namespace, existing, current_keys);
    tracing::debug!(
        "keys in db {}, number of {} keys to remove {}",
        existing_count,
        namespace,
        stale.len()
    );

    if !stale.is_empty() {
        store
            .delete_objects(&stale, version)
            .await
            .with_context(|| format!("failed to delete stale {} keys", namespace))?;
    }
    Ok(stale)
}

/// Upsert the namespace's current objects, then reconcile it.
pub async fn sync_namespace<S>(store: &S, objects: &KeyedObjects, version: Version) -> Result<SyncReport>
where
    S: VersionedStore + ?Sized,
{
    let namespace = objects.namespace();
    let started = Instant::now();

    if !objects.is_empty() {
        let response = store
            .upsert_objects(objects.objects())
            .await
            .with_context(|| format!("failed to store {} objects", namespace))?;
        tracing::debug!("{} store status: {}", namespace, response.status);
    }

    let deleted = reconcile(store, namespace, &objects.keys(), version).await?;
    tracing::info!(
        "versioned {} stored in {:.3}s ({} upserted, {} removed)",
        namespace,
        started.elapsed().as_secs_f64(),
        objects.len(),
        deleted.len()
    );

    Ok(SyncReport {
        namespace,
        upserted: objects.len(),
        deleted: deleted.len(),
    })
}

/// Append one track point per pilot to the tracked store.
pub async fn store_tracks<S>(store: &S, pilots: &[Pilot], version: Version) -> Result<usize>
where
    S: TrackStore + ?Sized,
{
    let started = Instant::now();
    let tracks = track_objects(pilots, version);
    let response = store
        .store_tracks(&tracks)
        .await
        .context("failed to store track data")?;
    tracing::info!(
        "track data stored in {:.3}s status: {}",
        started.elapsed().as_secs_f64(),
        response.status
    );
    Ok(tracks.len())
}
