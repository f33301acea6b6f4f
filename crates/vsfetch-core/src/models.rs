//! Live network snapshot model.
//!
//! Feed records are deserialized into `Raw*` shapes first and normalized
//! into typed records by explicit functions, so every coercion rule
//! (timestamps to epoch ms, ATIS line joining) is visible and testable.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::boundaries::Point;
use crate::error::ParseError;
use crate::versioned::{TrackObject, TrackPoint, Version, VersionedObject};

/// Parse a feed timestamp into epoch milliseconds.
///
/// Accepts RFC 3339 with any offset, or a naive ISO-8601 date-time taken as
/// UTC. Sub-millisecond precision is rounded.
pub fn parse_timestamp_ms(value: &str) -> Result<i64, ParseError> {
    let value = value.trim();
    let dt: DateTime<Utc> = match DateTime::parse_from_rfc3339(value) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(_) => NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
            .map(|naive| naive.and_utc())
            .map_err(|_| ParseError::Timestamp(value.to_string()))?,
    };
    let sub_ms = (dt.timestamp_subsec_nanos() as f64 / 1_000_000.0).round() as i64;
    Ok(dt.timestamp() * 1000 + sub_ms)
}

/// Controller facility. Codes outside 1..=6 have no variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facility {
    Atis,
    Delivery,
    Ground,
    Tower,
    Approach,
    Center,
}

impl Facility {
    pub fn code(self) -> i64 {
        match self {
            Facility::Atis => 1,
            Facility::Delivery => 2,
            Facility::Ground => 3,
            Facility::Tower => 4,
            Facility::Approach => 5,
            Facility::Center => 6,
        }
    }

    /// Role name used in human readable labels. Center labels depend on the
    /// country and are built by the resolver.
    pub fn role_name(self) -> &'static str {
        match self {
            Facility::Atis => "ATIS",
            Facility::Delivery => "Delivery",
            Facility::Ground => "Ground",
            Facility::Tower => "Tower",
            Facility::Approach => "Approach",
            Facility::Center => "Radar",
        }
    }
}

impl TryFrom<i64> for Facility {
    type Error = i64;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Facility::Atis),
            2 => Ok(Facility::Delivery),
            3 => Ok(Facility::Ground),
            4 => Ok(Facility::Tower),
            5 => Ok(Facility::Approach),
            6 => Ok(Facility::Center),
            other => Err(other),
        }
    }
}

/// ATIS text as it appears in the feed: a list of lines or a single string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TextAtis {
    Lines(Vec<String>),
    Text(String),
}

/// Join ATIS lines with newlines; a plain string passes through unchanged.
pub fn join_text_atis(raw: Option<TextAtis>) -> Option<String> {
    match raw? {
        TextAtis::Lines(lines) => Some(lines.join("\n")),
        TextAtis::Text(text) => Some(text),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawController {
    pub cid: i64,
    pub name: String,
    pub callsign: String,
    pub frequency: String,
    pub facility: i64,
    pub visual_range: i64,
    #[serde(default)]
    pub text_atis: Option<TextAtis>,
    pub logon_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Controller {
    pub cid: i64,
    pub name: String,
    pub callsign: String,
    pub frequency: String,
    pub facility: i64,
    pub visual_range: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_atis: Option<String>,
    pub logon_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub human_readable: Option<String>,
}

impl From<RawController> for Controller {
    fn from(raw: RawController) -> Self {
        Self {
            cid: raw.cid,
            name: raw.name,
            callsign: raw.callsign,
            frequency: raw.frequency,
            facility: raw.facility,
            visual_range: raw.visual_range,
            text_atis: join_text_atis(raw.text_atis),
            logon_time: raw.logon_time,
            human_readable: None,
        }
    }
}

/// Discriminator written into stored entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Pilot,
    Airport,
    Fir,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightPlan {
    pub flight_rules: String,
    pub aircraft: String,
    pub aircraft_faa: String,
    pub aircraft_short: String,
    pub departure: String,
    pub arrival: String,
    pub alternate: String,
    pub cruise_tas: String,
    pub altitude: String,
    pub deptime: String,
    pub enroute_time: String,
    pub fuel_time: String,
    pub remarks: String,
    pub route: String,
    pub revision_id: i64,
    pub assigned_transponder: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPilot {
    pub cid: i64,
    pub name: String,
    pub callsign: String,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: i64,
    pub groundspeed: i64,
    pub transponder: String,
    pub heading: i64,
    pub qnh_i_hg: f64,
    pub qnh_mb: i64,
    #[serde(default)]
    pub flight_plan: Option<FlightPlan>,
    pub logon_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pilot {
    pub cid: i64,
    pub name: String,
    pub callsign: String,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: i64,
    pub groundspeed: i64,
    pub transponder: String,
    pub heading: i64,
    pub qnh_i_hg: f64,
    pub qnh_mb: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flight_plan: Option<FlightPlan>,
    /// Logon time in epoch milliseconds.
    pub logon_time: i64,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
}

impl TryFrom<RawPilot> for Pilot {
    type Error = ParseError;

    fn try_from(raw: RawPilot) -> Result<Self, Self::Error> {
        Ok(Self {
            logon_time: parse_timestamp_ms(&raw.logon_time)?,
            cid: raw.cid,
            name: raw.name,
            callsign: raw.callsign,
            latitude: raw.latitude,
            longitude: raw.longitude,
            altitude: raw.altitude,
            groundspeed: raw.groundspeed,
            transponder: raw.transponder,
            heading: raw.heading,
            qnh_i_hg: raw.qnh_i_hg,
            qnh_mb: raw.qnh_mb,
            flight_plan: raw.flight_plan,
            entity_type: EntityType::Pilot,
        })
    }
}

impl Pilot {
    /// Session-stable track identity: callsign, cid and logon time.
    pub fn track_id(&self) -> String {
        format!("{}.{}.{}", self.callsign, self.cid, self.logon_time)
    }

    pub fn position(&self) -> Point {
        Point::new(self.latitude, self.longitude)
    }

    pub fn track_object(&self, ts: Version) -> TrackObject {
        TrackObject {
            track_id: self.track_id(),
            point: TrackPoint {
                ts,
                lat: self.latitude,
                lng: self.longitude,
                hdg: self.heading,
                alt: self.altitude,
                gs: self.groundspeed,
            },
        }
    }

    pub fn versioned_object(&self, version: Version) -> VersionedObject<&Pilot> {
        VersionedObject::new(self, version).with_point(self.position())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct General {
    pub update_timestamp: String,
}

/// One live feed document as received.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSnapshot {
    pub general: General,
    #[serde(default)]
    pub pilots: Vec<RawPilot>,
    #[serde(default)]
    pub controllers: Vec<RawController>,
    #[serde(default)]
    pub atis: Vec<RawController>,
}

impl RawSnapshot {
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, ParseError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Snapshot version: the feed update timestamp in epoch milliseconds.
    pub fn version(&self) -> Result<Version, ParseError> {
        parse_timestamp_ms(&self.general.update_timestamp)
    }

    pub fn normalize(self) -> Result<Snapshot, ParseError> {
        let version = self.version()?;
        let pilots = self
            .pilots
            .into_iter()
            .map(Pilot::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Snapshot {
            version,
            pilots,
            controllers: self.controllers.into_iter().map(Controller::from).collect(),
            atis: self.atis.into_iter().map(Controller::from).collect(),
        })
    }
}

/// A normalized snapshot, valid for one cycle.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub version: Version,
    pub pilots: Vec<Pilot>,
    pub controllers: Vec<Controller>,
    pub atis: Vec<Controller>,
}
