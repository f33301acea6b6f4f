//! Shared test fixtures.

use std::collections::HashMap;

use crate::boundaries::{Boundaries, BoundingBox, Point};
use crate::reference::ReferenceIndex;
use crate::runways::RunwayCatalog;

pub const REFERENCE: &str = "\
; VATSpy-style fixture
[Countries]
Germany|ED|
Russia|UU|Control
United Kingdom|EG|

[Airports]
EDDF|Frankfurt Main|50.0333|8.5706|FRA|EDGG|0
EDDM|Munich|48.3538|11.7861|MUC|EDMM|0
EGLL|London Heathrow|51.4775|-0.4614|LHR|EGTT|0
EGLL|Heathrow Duplicate|51.0|-0.4|LHX|EGTT|0
UUEE|Sheremetyevo|55.9726|37.4146|SVO|UUWV|0
KSFO|San Francisco Intl|37.6188|-122.375||KZOA|0
FAKE|Pseudo Field|10.0|10.0|FAK|EDGG|1

[FIRs]
EDGG|Langen|EDGG|
EDMM|Munich|EDMM|
EGTT|London|LON|EGTT
UUWV|Moscow|MOSCOW|UUWV
EGTX|London Shadow|LON|

[UIRs]
EURM|Europe Mid|EDGG,EDMM
";

pub const RUNWAYS: &str = r#"{
    "EDDF": {
        "07C": {
            "airport_ref": 2212, "airport_ident": "EDDF",
            "length_ft": 13123, "width_ft": 148, "surface": "CON",
            "lighted": true, "closed": false, "ident": "07C",
            "latitude_deg": 50.0325, "longitude_deg": 8.5347,
            "elevation_ft": 328, "heading_degT": 69.0,
            "displaced_threshold_ft": null
        },
        "25C": {
            "airport_ref": 2212, "airport_ident": "EDDF",
            "length_ft": 13123, "width_ft": 148, "surface": "CON",
            "lighted": true, "closed": false, "ident": "25C",
            "latitude_deg": null, "longitude_deg": null,
            "elevation_ft": null, "heading_degT": null,
            "displaced_threshold_ft": 984
        }
    }
}"#;

fn london_bounds() -> HashMap<String, Boundaries> {
    let mut bounds = HashMap::new();
    bounds.insert(
        "EGTT".to_string(),
        Boundaries {
            geometry: geojson::Geometry::new(geojson::Value::Point(vec![-1.0, 52.0])),
            bbox: BoundingBox {
                min: Point::new(50.0, -6.0),
                max: Point::new(56.0, 2.0),
            },
            center: Point::new(53.0, -2.0),
        },
    );
    bounds
}

pub fn reference_index() -> ReferenceIndex {
    ReferenceIndex::parse(REFERENCE, &london_bounds()).unwrap()
}

pub fn runway_catalog() -> RunwayCatalog {
    RunwayCatalog::parse(RUNWAYS).unwrap()
}
