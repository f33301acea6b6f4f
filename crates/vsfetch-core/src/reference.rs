//! Static reference data: countries, airports, FIRs and UIRs.
//!
//! The dataset is line-oriented and section-delimited. Blank lines and lines
//! starting with `;` are skipped, `[section]` switches the active section and
//! every other line is a pipe-delimited record with a fixed field count.
//!
//! Lookups that may hit several records (airports and FIRs by code) are kept
//! as ordered lists of positions into the record list. The first position,
//! i.e. the record that appeared first in the source, wins.

use std::collections::HashMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::boundaries::Boundaries;
use crate::error::ParseError;

/// Minimum callsign prefix length tried against the FIR radio prefix index.
pub const MIN_FIR_PREFIX_LEN: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Country {
    pub name: String,
    pub code: String,
    /// Regional term used instead of "Radar" for center controllers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_control_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceAirport {
    pub icao: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iata: Option<String>,
    pub fir: String,
    pub is_pseudo: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceFir {
    pub icao: String,
    pub name: String,
    pub prefix: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boundaries: Option<Boundaries>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Uir {
    pub icao: String,
    pub name: String,
    pub fir_ids: Vec<String>,
}

fn split_fields<'a>(
    section: &'static str,
    expected: usize,
    line: &'a str,
) -> Result<Vec<&'a str>, ParseError> {
    let tokens: Vec<&str> = line.trim().split('|').collect();
    if tokens.len() != expected {
        return Err(ParseError::FieldCount {
            section,
            expected,
            actual: tokens.len(),
            line: line.to_string(),
        });
    }
    Ok(tokens)
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_coord(field: &'static str, value: &str, line: &str) -> Result<f64, ParseError> {
    value.trim().parse::<f64>().map_err(|_| ParseError::InvalidNumber {
        section: "airports",
        field,
        value: value.to_string(),
        line: line.to_string(),
    })
}

impl Country {
    /// `name|code|custom control name`
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let tokens = split_fields("countries", 3, line)?;
        Ok(Self {
            name: tokens[0].to_string(),
            code: tokens[1].to_string(),
            custom_control_name: non_empty(tokens[2]),
        })
    }
}

impl ReferenceAirport {
    /// `icao|name|lat|lng|iata|fir|pseudo`
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let tokens = split_fields("airports", 7, line)?;
        Ok(Self {
            icao: tokens[0].to_string(),
            name: tokens[1].to_string(),
            latitude: parse_coord("latitude", tokens[2], line)?,
            longitude: parse_coord("longitude", tokens[3], line)?,
            iata: non_empty(tokens[4]),
            fir: tokens[5].to_string(),
            is_pseudo: tokens[6] == "1",
        })
    }
}

impl ReferenceFir {
    /// `icao|name|radio prefix|boundary id`
    ///
    /// Boundaries are matched by the boundary id field, then the radio
    /// prefix, then the ICAO code. A FIR without boundaries is kept.
    pub fn parse(line: &str, bounds: &HashMap<String, Boundaries>) -> Result<Self, ParseError> {
        let tokens = split_fields("firs", 4, line)?;
        let (icao, name, prefix, boundary_id) = (tokens[0], tokens[1], tokens[2], tokens[3]);

        let boundaries = [boundary_id, prefix, icao]
            .iter()
            .filter(|key| !key.is_empty())
            .find_map(|key| bounds.get(*key))
            .cloned();

        if boundaries.is_none() {
            tracing::warn!("can't find boundaries for fir {} {}", icao, prefix);
        }

        Ok(Self {
            icao: icao.to_string(),
            name: name.to_string(),
            prefix: prefix.to_string(),
            boundaries,
        })
    }
}

impl Uir {
    /// `icao|name|fir,fir,...`
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let tokens = split_fields("uirs", 3, line)?;
        Ok(Self {
            icao: tokens[0].to_string(),
            name: tokens[1].to_string(),
            fir_ids: tokens[2]
                .trim()
                .split(',')
                .filter(|id| !id.is_empty())
                .map(|id| id.to_string())
                .collect(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Countries,
    Airports,
    Firs,
    Uirs,
    Other,
}

impl Section {
    fn from_header(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "countries" => Section::Countries,
            "airports" => Section::Airports,
            "firs" => Section::Firs,
            "uirs" => Section::Uirs,
            _ => Section::Other,
        }
    }
}

/// In-memory reference index with lookup tables.
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    countries: Vec<Country>,
    airports: Vec<ReferenceAirport>,
    firs: Vec<ReferenceFir>,
    uirs: Vec<Uir>,

    country_idx: HashMap<String, usize>,
    airport_icao_idx: HashMap<String, Vec<usize>>,
    airport_iata_idx: HashMap<String, Vec<usize>>,
    fir_icao_idx: HashMap<String, Vec<usize>>,
    fir_prefix_idx: HashMap<String, usize>,
    uir_icao_idx: HashMap<String, usize>,
    uir_fir_idx: HashMap<String, usize>,
}

impl ReferenceIndex {
    pub fn new(
        countries: Vec<Country>,
        airports: Vec<ReferenceAirport>,
        firs: Vec<ReferenceFir>,
        uirs: Vec<Uir>,
    ) -> Self {
        let mut index = Self {
            countries,
            airports,
            firs,
            uirs,
            ..Default::default()
        };
        index.build_indexes();
        index
    }

    /// Parse the reference dataset. Any malformed record aborts the whole parse.
    pub fn parse(text: &str, bounds: &HashMap<String, Boundaries>) -> Result<Self, ParseError> {
        let started = Instant::now();
        let mut section = Section::Other;

        let mut countries = Vec::new();
        let mut airports = Vec::new();
        let mut firs = Vec::new();
        let mut uirs = Vec::new();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(';') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                section = Section::from_header(&line[1..line.len() - 1]);
                continue;
            }

            match section {
                Section::Countries => countries.push(Country::parse(line)?),
                Section::Airports => airports.push(ReferenceAirport::parse(line)?),
                Section::Firs => firs.push(ReferenceFir::parse(line, bounds)?),
                Section::Uirs => uirs.push(Uir::parse(line)?),
                Section::Other => {}
            }
        }

        tracing::debug!(
            "reference data parsed in {:.3}s: {} countries, {} airports, {} firs, {} uirs",
            started.elapsed().as_secs_f64(),
            countries.len(),
            airports.len(),
            firs.len(),
            uirs.len()
        );
        Ok(Self::new(countries, airports, firs, uirs))
    }

    fn build_indexes(&mut self) {
        let started = Instant::now();

        for (i, country) in self.countries.iter().enumerate() {
            self.country_idx.insert(country.code.clone(), i);
        }

        for (i, airport) in self.airports.iter().enumerate() {
            self.airport_icao_idx
                .entry(airport.icao.clone())
                .or_default()
                .push(i);
            if let Some(iata) = &airport.iata {
                self.airport_iata_idx.entry(iata.clone()).or_default().push(i);
            }
        }

        for (i, fir) in self.firs.iter().enumerate() {
            self.fir_icao_idx.entry(fir.icao.clone()).or_default().push(i);
            // last write wins on duplicate prefixes
            self.fir_prefix_idx.insert(fir.prefix.clone(), i);
        }

        for (i, uir) in self.uirs.iter().enumerate() {
            self.uir_icao_idx.insert(uir.icao.clone(), i);
            for fir_id in &uir.fir_ids {
                self.uir_fir_idx.insert(fir_id.clone(), i);
            }
        }

        tracing::debug!(
            "reference indexes built in {:.3}s",
            started.elapsed().as_secs_f64()
        );
    }

    pub fn countries(&self) -> &[Country] {
        &self.countries
    }

    pub fn airports(&self) -> &[ReferenceAirport] {
        &self.airports
    }

    pub fn firs(&self) -> &[ReferenceFir] {
        &self.firs
    }

    pub fn uirs(&self) -> &[Uir] {
        &self.uirs
    }

    fn first_airport(&self, idx: Option<&Vec<usize>>) -> Option<&ReferenceAirport> {
        idx.and_then(|positions| positions.first())
            .map(|&i| &self.airports[i])
    }

    /// Resolve the airport a controller callsign belongs to.
    ///
    /// The station code is the callsign segment before the first underscore.
    /// Codes shorter than 4 characters are IATA codes; longer ones are tried
    /// as ICAO first and as IATA second.
    pub fn find_airport_by_ctrl(&self, callsign: &str) -> Option<&ReferenceAirport> {
        let code = station_code(callsign);
        if code.chars().count() < 4 {
            return self.first_airport(self.airport_iata_idx.get(code));
        }

        self.first_airport(self.airport_icao_idx.get(code))
            .or_else(|| self.first_airport(self.airport_iata_idx.get(code)))
    }

    /// Resolve the FIR a center callsign belongs to.
    ///
    /// The station code is tried against FIR ICAO codes first. Otherwise
    /// left-substrings of the full callsign, longest first and down to
    /// [`MIN_FIR_PREFIX_LEN`] characters, are tried against radio prefixes.
    pub fn find_fir_by_ctrl(&self, callsign: &str) -> Option<&ReferenceFir> {
        let code = station_code(callsign);
        if let Some(&i) = self.fir_icao_idx.get(code).and_then(|idx| idx.first()) {
            return Some(&self.firs[i]);
        }

        fir_prefix_candidates(callsign)
            .find_map(|candidate| self.fir_prefix_idx.get(candidate))
            .map(|&i| &self.firs[i])
    }

    /// Look up a country by the first two characters of an ICAO code.
    pub fn find_country_by_icao(&self, icao: &str) -> Option<&Country> {
        let code: String = icao.chars().take(2).collect();
        self.country_idx.get(&code).map(|&i| &self.countries[i])
    }

    pub fn find_airport(&self, icao: &str) -> Option<&ReferenceAirport> {
        self.first_airport(self.airport_icao_idx.get(icao))
    }

    pub fn find_fir(&self, icao: &str) -> Option<&ReferenceFir> {
        self.fir_icao_idx
            .get(icao)
            .and_then(|idx| idx.first())
            .map(|&i| &self.firs[i])
    }

    pub fn find_uir(&self, icao: &str) -> Option<&Uir> {
        self.uir_icao_idx.get(icao).map(|&i| &self.uirs[i])
    }

    /// UIR a FIR belongs to. If several list it, the last one listed wins.
    pub fn find_uir_by_fir(&self, fir_id: &str) -> Option<&Uir> {
        self.uir_fir_idx.get(fir_id).map(|&i| &self.uirs[i])
    }
}

/// Callsign segment before the first underscore.
pub fn station_code(callsign: &str) -> &str {
    callsign.split('_').next().unwrap_or(callsign)
}

/// Left-substrings of a callsign from full length down to
/// [`MIN_FIR_PREFIX_LEN`] characters, longest first.
pub fn fir_prefix_candidates(callsign: &str) -> impl Iterator<Item = &str> + '_ {
    let mut ends: Vec<usize> = callsign
        .char_indices()
        .map(|(i, _)| i)
        .skip(MIN_FIR_PREFIX_LEN)
        .collect();
    if callsign.chars().count() >= MIN_FIR_PREFIX_LEN {
        ends.push(callsign.len());
    }
    ends.into_iter().rev().map(move |end| &callsign[..end])
}
