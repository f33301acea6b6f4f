//! Entity resolution: raw controllers, ATIS stations and pilots of one
//! cycle are mapped onto reference data and grouped into per-airport and
//! per-FIR composite states.
//!
//! Everything built here lives for one cycle only. Unresolvable callsigns
//! are logged and skipped, never treated as errors.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::boundaries::Point;
use crate::models::{Controller, EntityType, Facility, Pilot};
use crate::reference::{ReferenceAirport, ReferenceFir, ReferenceIndex};
use crate::runways::{RunwayCatalog, RunwayMap};
use crate::versioned::{KeyedObjects, Namespace, TrackObject, Version, VersionedObject};

/// Label used for center controllers when the country has no custom term.
pub const DEFAULT_CONTROL_NAME: &str = "Radar";

/// One controller per airport role.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AirportControllerSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atis: Option<Controller>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery: Option<Controller>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ground: Option<Controller>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tower: Option<Controller>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approach: Option<Controller>,
}

impl AirportControllerSet {
    pub fn is_empty(&self) -> bool {
        self.atis.is_none()
            && self.delivery.is_none()
            && self.ground.is_none()
            && self.tower.is_none()
            && self.approach.is_none()
    }

    /// Role slot for an airport facility. Center controllers have none.
    pub fn slot_mut(&mut self, facility: Facility) -> Option<&mut Option<Controller>> {
        match facility {
            Facility::Atis => Some(&mut self.atis),
            Facility::Delivery => Some(&mut self.delivery),
            Facility::Ground => Some(&mut self.ground),
            Facility::Tower => Some(&mut self.tower),
            Facility::Approach => Some(&mut self.approach),
            Facility::Center => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AirportState {
    #[serde(flatten)]
    pub airport: ReferenceAirport,
    pub controllers: AirportControllerSet,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub runways: RunwayMap,
}

impl AirportState {
    pub fn new(airport: ReferenceAirport) -> Self {
        Self {
            airport,
            controllers: AirportControllerSet::default(),
            entity_type: EntityType::Airport,
            runways: RunwayMap::new(),
        }
    }

    /// An airport with no controller in any role slot.
    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    pub fn position(&self) -> Point {
        Point::new(self.airport.latitude, self.airport.longitude)
    }

    pub fn versioned_object(&self, version: Version) -> VersionedObject<&AirportState> {
        VersionedObject::new(self, version).with_point(self.position())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FirState {
    #[serde(flatten)]
    pub fir: ReferenceFir,
    /// Controllers keyed by callsign; a FIR may be split into sectors.
    pub controllers: BTreeMap<String, Controller>,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
}

impl FirState {
    pub fn new(fir: ReferenceFir) -> Self {
        Self {
            fir,
            controllers: BTreeMap::new(),
            entity_type: EntityType::Fir,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    pub fn versioned_object(&self, version: Version) -> VersionedObject<&FirState> {
        let rect = self.fir.boundaries.as_ref().map(|b| b.bbox);
        VersionedObject::new(self, version).with_rect(rect)
    }
}

/// A resolved controller flattened with a single representative position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredController {
    #[serde(flatten)]
    pub controller: Controller,
    pub position: Point,
}

impl StoredController {
    pub fn versioned_object(&self, version: Version) -> VersionedObject<&StoredController> {
        VersionedObject::new(self, version)
    }
}

/// Controller-derived entities of one cycle.
#[derive(Debug, Clone, Default)]
pub struct ResolvedControllers {
    pub airports: BTreeMap<String, AirportState>,
    pub firs: BTreeMap<String, FirState>,
    pub controllers: BTreeMap<String, StoredController>,
}

impl ResolvedControllers {
    /// Upsert set for `airport:`; empty airports are left out.
    pub fn airport_objects(&self, version: Version) -> Result<KeyedObjects, serde_json::Error> {
        let mut objects = KeyedObjects::new(Namespace::Airport);
        for airport in self.airports.values().filter(|a| !a.is_empty()) {
            objects.insert(&airport.airport.icao, &airport.versioned_object(version))?;
        }
        Ok(objects)
    }

    /// Upsert set for `fir:`; FIRs without controllers are left out.
    pub fn fir_objects(&self, version: Version) -> Result<KeyedObjects, serde_json::Error> {
        let mut objects = KeyedObjects::new(Namespace::Fir);
        for fir in self.firs.values().filter(|f| !f.is_empty()) {
            objects.insert(&fir.fir.icao, &fir.versioned_object(version))?;
        }
        Ok(objects)
    }

    pub fn controller_objects(&self, version: Version) -> Result<KeyedObjects, serde_json::Error> {
        let mut objects = KeyedObjects::new(Namespace::Controller);
        for (callsign, ctrl) in &self.controllers {
            objects.insert(callsign, &ctrl.versioned_object(version))?;
        }
        Ok(objects)
    }
}

struct ControllerResolver<'a> {
    index: &'a ReferenceIndex,
    runways: &'a RunwayCatalog,
    runways_attached: HashSet<String>,
    resolved: ResolvedControllers,
}

impl<'a> ControllerResolver<'a> {
    fn airport_state(&mut self, airport: &ReferenceAirport) -> &mut AirportState {
        self.resolved
            .airports
            .entry(airport.icao.clone())
            .or_insert_with(|| AirportState::new(airport.clone()))
    }

    fn attach_runways(&mut self, icao: &str) {
        if !self.runways_attached.insert(icao.to_string()) {
            return;
        }
        let Some(runways) = self.runways.find_airport_runways(icao) else {
            return;
        };
        if let Some(state) = self.resolved.airports.get_mut(icao) {
            state.runways = runways.clone();
        }
    }

    fn assign_airport(&mut self, mut ctrl: Controller, facility: Facility) {
        let index = self.index;
        let Some(airport) = index.find_airport_by_ctrl(&ctrl.callsign) else {
            tracing::debug!("can't find airport by callsign {}", ctrl.callsign);
            return;
        };

        ctrl.facility = facility.code();
        ctrl.human_readable = Some(format!("{} {}", airport.name, facility.role_name()));

        let state = self.airport_state(airport);
        if let Some(slot) = state.controllers.slot_mut(facility) {
            *slot = Some(ctrl.clone());
        }
        if facility != Facility::Atis {
            self.attach_runways(&airport.icao);
        }

        self.resolved.controllers.insert(
            ctrl.callsign.clone(),
            StoredController {
                controller: ctrl,
                position: Point::new(airport.latitude, airport.longitude),
            },
        );
    }

    fn assign_fir(&mut self, mut ctrl: Controller) {
        let index = self.index;
        let Some(fir) = index.find_fir_by_ctrl(&ctrl.callsign) else {
            tracing::debug!("can't find FIR by callsign {}", ctrl.callsign);
            return;
        };

        let control_name = index
            .find_country_by_icao(&fir.icao)
            .and_then(|country| country.custom_control_name.as_deref())
            .unwrap_or(DEFAULT_CONTROL_NAME);
        ctrl.human_readable = Some(format!("{} {}", fir.name, control_name));

        self.resolved
            .firs
            .entry(fir.icao.clone())
            .or_insert_with(|| FirState::new(fir.clone()))
            .controllers
            .insert(ctrl.callsign.clone(), ctrl.clone());

        match &fir.boundaries {
            Some(boundaries) => {
                self.resolved.controllers.insert(
                    ctrl.callsign.clone(),
                    StoredController {
                        controller: ctrl,
                        position: boundaries.center,
                    },
                );
            }
            None => {
                tracing::warn!(
                    "fir {} has no boundaries, controller {} stored without position",
                    fir.icao,
                    ctrl.callsign
                );
            }
        }
    }
}

/// Group one cycle's controllers and ATIS stations into airport, FIR and
/// flattened controller entities.
pub fn resolve_controllers(
    index: &ReferenceIndex,
    runways: &RunwayCatalog,
    controllers: Vec<Controller>,
    atis: Vec<Controller>,
) -> ResolvedControllers {
    let mut resolver = ControllerResolver {
        index,
        runways,
        runways_attached: HashSet::new(),
        resolved: ResolvedControllers::default(),
    };

    for ctrl in controllers {
        match Facility::try_from(ctrl.facility) {
            Ok(
                facility @ (Facility::Delivery
                | Facility::Ground
                | Facility::Tower
                | Facility::Approach),
            ) => resolver.assign_airport(ctrl, facility),
            Ok(Facility::Center) => resolver.assign_fir(ctrl),
            Ok(Facility::Atis) => {
                tracing::debug!("controller {} has ATIS facility, skipping", ctrl.callsign);
            }
            Err(code) => {
                tracing::debug!("controller {} has unknown facility {}, skipping", ctrl.callsign, code);
            }
        }
    }

    for station in atis {
        resolver.assign_airport(station, Facility::Atis);
    }

    resolver.resolved
}

/// Upsert set for `pilot:`, keyed by callsign.
pub fn pilot_objects(pilots: &[Pilot], version: Version) -> Result<KeyedObjects, serde_json::Error> {
    let mut objects = KeyedObjects::new(Namespace::Pilot);
    for pilot in pilots {
        objects.insert(&pilot.callsign, &pilot.versioned_object(version))?;
    }
    Ok(objects)
}

pub fn track_objects(pilots: &[Pilot], version: Version) -> Vec<TrackObject> {
    pilots.iter().map(|pilot| pilot.track_object(version)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn ctrl(callsign: &str, facility: i64) -> Controller {
        Controller {
            cid: 1,
            name: "Controller".to_string(),
            callsign: callsign.to_string(),
            frequency: "199.998".to_string(),
            facility,
            visual_range: 50,
            text_atis: None,
            logon_time: "2024-03-01T09:00:00Z".to_string(),
            human_readable: None,
        }
    }

    fn resolve(controllers: Vec<Controller>, atis: Vec<Controller>) -> ResolvedControllers {
        resolve_controllers(
            &fixtures::reference_index(),
            &fixtures::runway_catalog(),
            controllers,
            atis,
        )
    }

    #[test]
    fn tower_family_controllers_fill_role_slots() {
        let resolved = resolve(
            vec![
                ctrl("EDDF_DEL", 2),
                ctrl("EDDF_GND", 3),
                ctrl("EDDF_TWR", 4),
                ctrl("EDDF_APP", 5),
            ],
            vec![],
        );

        let eddf = &resolved.airports["EDDF"];
        let slots = &eddf.controllers;
        assert_eq!(
            slots.delivery.as_ref().unwrap().human_readable.as_deref(),
            Some("Frankfurt Main Delivery")
        );
        assert_eq!(
            slots.ground.as_ref().unwrap().human_readable.as_deref(),
            Some("Frankfurt Main Ground")
        );
        assert_eq!(
            slots.tower.as_ref().unwrap().human_readable.as_deref(),
            Some("Frankfurt Main Tower")
        );
        assert_eq!(
            slots.approach.as_ref().unwrap().human_readable.as_deref(),
            Some("Frankfurt Main Approach")
        );
        assert_eq!(eddf.runways.len(), 2);
        assert_eq!(resolved.controllers.len(), 4);
        assert_eq!(
            resolved.controllers["EDDF_TWR"].position,
            Point::new(50.0333, 8.5706)
        );
    }

    #[test]
    fn atis_is_forced_to_atis_slot() {
        let resolved = resolve(vec![], vec![ctrl("MUC_ATIS", 4)]);
        let eddm = &resolved.airports["EDDM"];
        let atis = eddm.controllers.atis.as_ref().unwrap();
        assert_eq!(atis.facility, 1);
        assert_eq!(atis.human_readable.as_deref(), Some("Munich ATIS"));
        assert!(eddm.controllers.tower.is_none());
        assert!(eddm.runways.is_empty());
        assert_eq!(resolved.controllers["MUC_ATIS"].controller.facility, 1);
    }

    #[test]
    fn center_controllers_group_by_fir() {
        let resolved = resolve(
            vec![ctrl("EGTT_CTR", 6), ctrl("LON_S_CTR", 6), ctrl("EGTT_N_CTR", 6)],
            vec![],
        );

        let london = &resolved.firs["EGTT"];
        assert_eq!(london.controllers.len(), 2);
        assert_eq!(
            london.controllers["EGTT_CTR"].human_readable.as_deref(),
            Some("London Radar")
        );
        assert_eq!(
            resolved.controllers["EGTT_N_CTR"].position,
            Point::new(53.0, -2.0)
        );
        // "LON" is shorter than the minimum radio prefix length
        assert!(!resolved.controllers.contains_key("LON_S_CTR"));
    }

    #[test]
    fn country_custom_control_name_overrides_radar() {
        let resolved = resolve(vec![ctrl("MOSCOW_CTR", 6)], vec![]);
        let moscow = &resolved.firs["UUWV"];
        assert_eq!(
            moscow.controllers["MOSCOW_CTR"].human_readable.as_deref(),
            Some("Moscow Control")
        );
        // no boundaries known for UUWV: kept in the FIR, not flattened
        assert!(!resolved.controllers.contains_key("MOSCOW_CTR"));
    }

    #[test]
    fn unresolved_and_unknown_facilities_are_dropped() {
        let resolved = resolve(
            vec![
                ctrl("XXXX_TWR", 4),
                ctrl("EDDF_OBS", 0),
                ctrl("EDDF_FSS", 1),
                ctrl("EDDF_SUP", 11),
                ctrl("NOWHERE_CTR", 6),
            ],
            vec![ctrl("XYZ_ATIS", 4)],
        );
        assert!(resolved.airports.is_empty());
        assert!(resolved.firs.is_empty());
        assert!(resolved.controllers.is_empty());
    }

    #[test]
    fn airport_emptiness_follows_role_slots() {
        let index = fixtures::reference_index();
        let mut state = AirportState::new(index.find_airport("EDDF").unwrap().clone());
        assert!(state.is_empty());

        state.controllers.tower = Some(ctrl("EDDF_TWR", 4));
        assert!(!state.is_empty());

        state.controllers.tower = None;
        assert!(state.is_empty());
    }

    #[test]
    fn empty_airports_are_not_upserted() {
        let mut resolved = resolve(vec![ctrl("EDDF_TWR", 4)], vec![]);
        let index = fixtures::reference_index();
        resolved.airports.insert(
            "EDDM".to_string(),
            AirportState::new(index.find_airport("EDDM").unwrap().clone()),
        );

        let objects = resolved.airport_objects(10).unwrap();
        assert_eq!(objects.len(), 1);
        let eddf = &objects.objects()["airport:EDDF"];
        assert_eq!(eddf["data"]["icao"], "EDDF");
        assert_eq!(eddf["data"]["type"], "airport");
        assert_eq!(eddf["data"]["iata"], "FRA");
        assert_eq!(eddf["point"]["lat"], 50.0333);
        assert!(eddf["data"]["controllers"].get("ground").is_none());
        assert_eq!(eddf["data"]["runways"]["07C"]["ident"], "07C");
    }

    #[test]
    fn fir_objects_carry_bounding_rect() {
        let resolved = resolve(vec![ctrl("EGTT_CTR", 6), ctrl("MOSCOW_CTR", 6)], vec![]);
        let objects = resolved.fir_objects(10).unwrap();
        let london = &objects.objects()["fir:EGTT"];
        assert_eq!(london["rect"]["min"]["lat"], 50.0);
        assert_eq!(london["data"]["type"], "fir");
        let moscow = &objects.objects()["fir:UUWV"];
        assert!(moscow.get("rect").is_none());
        assert!(moscow["data"].get("boundaries").is_none());
    }

    #[test]
    fn stored_controllers_are_keyed_by_callsign() {
        let resolved = resolve(vec![ctrl("EDDF_TWR", 4)], vec![ctrl("FRA_ATIS", 4)]);
        let objects = resolved.controller_objects(3).unwrap();
        let keys: Vec<&String> = objects.objects().keys().collect();
        assert_eq!(keys, vec!["ctrl:EDDF_TWR", "ctrl:FRA_ATIS"]);
        let tower = &objects.objects()["ctrl:EDDF_TWR"];
        assert_eq!(tower["data"]["position"]["lng"], 8.5706);
        assert_eq!(tower["data"]["callsign"], "EDDF_TWR");
        assert_eq!(tower["version"], 3);
    }
}
