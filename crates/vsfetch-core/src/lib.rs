//! vsfetch core - reference data, entity resolution and versioned objects.
//!
//! Network-free: everything here operates on already fetched documents so it
//! can be exercised with fixture data.

pub mod boundaries;
pub mod error;
pub mod models;
pub mod reference;
pub mod resolver;
pub mod runways;
pub mod versioned;

#[cfg(test)]
pub(crate) mod fixtures;

pub use boundaries::{parse_boundaries, Boundaries, BoundingBox, Point};
pub use error::ParseError;
pub use models::{
    parse_timestamp_ms, Controller, EntityType, Facility, FlightPlan, Pilot, RawController,
    RawPilot, RawSnapshot, Snapshot, TextAtis,
};
pub use reference::{Country, ReferenceAirport, ReferenceFir, ReferenceIndex, Uir};
pub use resolver::{
    pilot_objects, resolve_controllers, track_objects, AirportControllerSet, AirportState,
    FirState, ResolvedControllers, StoredController,
};
pub use runways::{Runway, RunwayCatalog, RunwayMap};
pub use versioned::{
    stale_keys, KeyedObjects, Namespace, TrackObject, TrackPoint, Version, VersionedObject,
};
