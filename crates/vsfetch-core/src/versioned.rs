//! Versioned object model shared by every stored namespace.
//!
//! Keys are `"<namespace>:<natural id>"`. Each cycle produces the full set
//! of current keys per namespace; anything the store holds under that
//! namespace's prefix and the cycle did not produce is stale.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::boundaries::{BoundingBox, Point};

/// Snapshot version in epoch milliseconds.
pub type Version = i64;

/// A derived entity together with the version it was computed under.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionedObject<T> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point: Option<Point>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rect: Option<BoundingBox>,
    pub version: Version,
}

impl<T> VersionedObject<T> {
    pub fn new(data: T, version: Version) -> Self {
        Self {
            data,
            point: None,
            rect: None,
            version,
        }
    }

    pub fn with_point(mut self, point: Point) -> Self {
        self.point = Some(point);
        self
    }

    pub fn with_rect(mut self, rect: Option<BoundingBox>) -> Self {
        self.rect = rect;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub ts: Version,
    pub lat: f64,
    pub lng: f64,
    pub hdg: i64,
    pub alt: i64,
    pub gs: i64,
}

/// Append-only track sample for the tracked store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackObject {
    pub track_id: String,
    pub point: TrackPoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    Pilot,
    Airport,
    Fir,
    Controller,
}

impl Namespace {
    pub const ALL: [Namespace; 4] = [
        Namespace::Pilot,
        Namespace::Airport,
        Namespace::Fir,
        Namespace::Controller,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Namespace::Pilot => "pilot",
            Namespace::Airport => "airport",
            Namespace::Fir => "fir",
            Namespace::Controller => "ctrl",
        }
    }

    /// Key prefix used when listing the store, e.g. `"pilot:"`.
    pub fn prefix(self) -> String {
        format!("{}:", self.name())
    }

    pub fn key(self, natural_id: &str) -> String {
        format!("{}:{}", self.name(), natural_id)
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Serialized upsert set of one namespace for one cycle.
#[derive(Debug, Clone)]
pub struct KeyedObjects {
    namespace: Namespace,
    objects: BTreeMap<String, Value>,
}

impl KeyedObjects {
    pub fn new(namespace: Namespace) -> Self {
        Self {
            namespace,
            objects: BTreeMap::new(),
        }
    }

    pub fn insert<T: Serialize>(
        &mut self,
        natural_id: &str,
        object: &VersionedObject<T>,
    ) -> Result<(), serde_json::Error> {
        let value = serde_json::to_value(object)?;
        self.objects.insert(self.namespace.key(natural_id), value);
        Ok(())
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    pub fn objects(&self) -> &BTreeMap<String, Value> {
        &self.objects
    }

    pub fn keys(&self) -> BTreeSet<String> {
        self.objects.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

/// Keys present in the store under `namespace` but not in `current`.
pub fn stale_keys<I>(namespace: Namespace, existing: I, current: &BTreeSet<String>) -> BTreeSet<String>
where
    I: IntoIterator<Item = String>,
{
    let prefix = namespace.prefix();
    existing
        .into_iter()
        .filter(|key| key.starts_with(&prefix) && !current.contains(key))
        .collect()
}
