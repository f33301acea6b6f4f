//! Runway catalog keyed by airport code.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Runway {
    #[serde(default, skip_serializing)]
    pub airport_ref: Option<i64>,
    #[serde(default, skip_serializing)]
    pub airport_ident: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length_ft: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width_ft: Option<i64>,
    #[serde(default)]
    pub surface: String,
    #[serde(default)]
    pub lighted: bool,
    #[serde(default)]
    pub closed: bool,
    pub ident: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude_deg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude_deg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevation_ft: Option<i64>,
    #[serde(rename = "heading_degT", skip_serializing_if = "Option::is_none")]
    pub heading_deg_t: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub displaced_threshold_ft: Option<i64>,
    /// Active for takeoffs.
    #[serde(default)]
    pub active_to: bool,
    /// Active for landings.
    #[serde(default)]
    pub active_lnd: bool,
}

/// Runway ident -> runway, ordered by ident.
pub type RunwayMap = BTreeMap<String, Runway>;

#[derive(Debug, Clone, Default)]
pub struct RunwayCatalog {
    airports: HashMap<String, RunwayMap>,
}

impl RunwayCatalog {
    pub fn new(airports: HashMap<String, RunwayMap>) -> Self {
        Self { airports }
    }

    /// Parse a JSON object mapping airport code -> runway ident -> runway.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let airports: HashMap<String, RunwayMap> = serde_json::from_str(text)?;
        tracing::debug!("runway catalog parsed: {} airports", airports.len());
        Ok(Self { airports })
    }

    pub fn find_airport_runways(&self, icao: &str) -> Option<&RunwayMap> {
        self.airports.get(icao)
    }

    pub fn len(&self) -> usize {
        self.airports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.airports.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn finds_runways_by_airport() {
        let catalog = fixtures::runway_catalog();
        let runways = catalog.find_airport_runways("EDDF").unwrap();
        assert_eq!(runways.len(), 2);
        let rwy = &runways["07C"];
        assert_eq!(rwy.length_ft, Some(13123));
        assert!(rwy.lighted);
        assert!(!rwy.closed);
        assert_eq!(rwy.heading_deg_t, Some(69.0));
        assert_eq!(runways["25C"].displaced_threshold_ft, Some(984));
        assert!(catalog.find_airport_runways("KSFO").is_none());
    }

    #[test]
    fn serialized_runway_omits_catalog_refs_and_nulls() {
        let catalog = fixtures::runway_catalog();
        let value = serde_json::to_value(&catalog.find_airport_runways("EDDF").unwrap()["25C"]).unwrap();
        assert!(value.get("airport_ref").is_none());
        assert!(value.get("latitude_deg").is_none());
        assert_eq!(value["active_to"], false);
        assert_eq!(value["displaced_threshold_ft"], 984);
    }

    #[test]
    fn malformed_catalog_is_an_error() {
        assert!(matches!(RunwayCatalog::parse("[1, 2]"), Err(ParseError::Json(_))));
    }
}
