//! Boundary parsing: raw query parameters in, typed requests out.
//!
//! Parsing never stops at the first problem. Every issue is collected into a
//! [`ValidationError`] so the caller sees the full list in one response, and
//! nothing is silently corrected.

use crate::error::ValidationError;
use crate::species::SpeciesRegistry;
use crate::Location;
use chrono::{DateTime, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Longest fishing-conditions request, in days.
pub const MAX_CONDITIONS_DAYS: i64 = 30;
/// Longest lunar-calendar request, in days.
pub const MAX_LUNAR_DAYS: i64 = 90;
/// Longest migration-events request, in days.
pub const MAX_MIGRATION_DAYS: i64 = 180;

/// Raw `key=value` parameters, as they arrive on a query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    values: BTreeMap<String, String>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Trimmed value, treating blank as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
    }
}

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl DateRange {
    pub fn single(date: NaiveDate) -> Self {
        Self {
            start_date: date,
            end_date: date,
        }
    }

    /// Number of days, counting both ends.
    pub fn days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start_date;
        (0..self.days().max(0)).map(move |i| start + Duration::days(i))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionsRequest {
    pub range: DateRange,
    pub location: Location,
    /// Upper-cased, de-duplicated, in request order. May contain unknown codes.
    pub species: Vec<String>,
    pub include_historical: bool,
}

impl ConditionsRequest {
    /// Keys: `date` or `startDate`+`endDate`, `latitude`, `longitude`, `targetSpecies`,
    /// `includeHistorical`, and optional `locationName`, `depths`, `bottomType`.
    pub fn parse(params: &QueryParams, defaults: &Location) -> Result<Self, ValidationError> {
        let mut errors = ValidationError::new();
        let range = parse_date_range(params, MAX_CONDITIONS_DAYS, &mut errors);
        let location = parse_location(params, defaults, &mut errors);
        let species = parse_species_list(params.get("targetSpecies"));
        let include_historical = parse_bool(params, "includeHistorical", &mut errors);

        match (range, location) {
            (Some(range), Some(location)) => errors.into_result(Self {
                range,
                location,
                species,
                include_historical,
            }),
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LunarCalendarRequest {
    pub range: DateRange,
    pub force_recalculate: bool,
}

impl LunarCalendarRequest {
    /// Keys: `date` or `startDate`+`endDate`, `forceRecalculate`.
    pub fn parse(params: &QueryParams) -> Result<Self, ValidationError> {
        let mut errors = ValidationError::new();
        let range = parse_date_range(params, MAX_LUNAR_DAYS, &mut errors);
        let force_recalculate = parse_bool(params, "forceRecalculate", &mut errors);
        match range {
            Some(range) => errors.into_result(Self {
                range,
                force_recalculate,
            }),
            None => Err(errors),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MigrationRequest {
    pub range: DateRange,
    pub location: Location,
    /// `None` means every registered species
    pub species: Option<Vec<String>>,
}

impl MigrationRequest {
    /// Keys: `date` or `startDate`+`endDate`, `latitude`, `longitude`, `species`,
    /// plus the optional location keys. Species codes must be registered.
    pub fn parse(
        params: &QueryParams,
        defaults: &Location,
        registry: &SpeciesRegistry,
    ) -> Result<Self, ValidationError> {
        let mut errors = ValidationError::new();
        let range = parse_date_range(params, MAX_MIGRATION_DAYS, &mut errors);
        let location = parse_location(params, defaults, &mut errors);

        let species = params.get("species").map(|raw| parse_species_list(Some(raw)));
        if let Some(codes) = &species {
            for code in codes.iter().filter(|c| !registry.contains(c)) {
                errors.push(format!("species '{code}' is not supported"));
            }
        }

        match (range, location) {
            (Some(range), Some(location)) => errors.into_result(Self {
                range,
                location,
                species,
            }),
            _ => Err(errors),
        }
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

fn parse_date_param(params: &QueryParams, key: &str, errors: &mut ValidationError) -> Option<NaiveDate> {
    let raw = params.get(key)?;
    let parsed = parse_date(raw);
    if parsed.is_none() {
        errors.push(format!("{key} '{raw}' is not an ISO date (YYYY-MM-DD)"));
    }
    parsed
}

fn parse_date_range(params: &QueryParams, max_days: i64, errors: &mut ValidationError) -> Option<DateRange> {
    let has_single = params.get("date").is_some();
    let has_bounds = params.get("startDate").is_some() || params.get("endDate").is_some();

    let range = if has_single {
        if has_bounds {
            errors.push("use either date or startDate/endDate, not both");
            return None;
        }
        DateRange::single(parse_date_param(params, "date", errors)?)
    } else {
        if params.get("startDate").is_none() {
            errors.push("startDate is required (or date)");
        }
        if params.get("endDate").is_none() {
            errors.push("endDate is required (or date)");
        }
        let start = parse_date_param(params, "startDate", errors);
        let end = parse_date_param(params, "endDate", errors);
        DateRange {
            start_date: start?,
            end_date: end?,
        }
    };

    if range.end_date < range.start_date {
        errors.push("endDate must not be before startDate");
        return None;
    }
    if range.days() > max_days {
        errors.push(format!(
            "date range of {} days exceeds the maximum of {max_days} days",
            range.days()
        ));
        return None;
    }
    Some(range)
}

fn parse_coordinate(
    params: &QueryParams,
    key: &str,
    bound: f64,
    errors: &mut ValidationError,
) -> Option<f64> {
    let Some(raw) = params.get(key) else {
        errors.push(format!("{key} is required"));
        return None;
    };
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v.abs() <= bound => Some(v),
        Ok(_) => {
            errors.push(format!("{key} must be between -{bound} and {bound}"));
            None
        }
        Err(_) => {
            errors.push(format!("{key} '{raw}' is not a number"));
            None
        }
    }
}

fn parse_location(params: &QueryParams, defaults: &Location, errors: &mut ValidationError) -> Option<Location> {
    let latitude = parse_coordinate(params, "latitude", 90.0, errors);
    let longitude = parse_coordinate(params, "longitude", 180.0, errors);

    let depths = match params.get("depths") {
        Some(raw) => {
            let mut depths = Vec::new();
            for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                match part.parse::<f64>() {
                    Ok(d) if d.is_finite() && d >= 0.0 => depths.push(d),
                    _ => errors.push(format!("depth '{part}' is not a non-negative number")),
                }
            }
            depths
        }
        None => defaults.depths.clone(),
    };

    let (latitude, longitude) = (latitude?, longitude?);
    let name = params
        .get("locationName")
        .map(str::to_string)
        .unwrap_or_else(|| format!("{latitude:.4}, {longitude:.4}"));

    let mut location = Location::new(latitude, longitude, name).with_depths(depths);
    location.bottom_type = params
        .get("bottomType")
        .map(str::to_string)
        .or_else(|| defaults.bottom_type.clone());
    Some(location)
}

/// Comma-separated codes, upper-cased and de-duplicated in order.
pub fn parse_species_list(raw: Option<&str>) -> Vec<String> {
    let mut codes: Vec<String> = Vec::new();
    for code in raw.unwrap_or_default().split(',') {
        let code = code.trim().to_ascii_uppercase();
        if !code.is_empty() && !codes.contains(&code) {
            codes.push(code);
        }
    }
    codes
}

fn parse_bool(params: &QueryParams, key: &str, errors: &mut ValidationError) -> bool {
    match params.get(key).map(str::to_ascii_lowercase).as_deref() {
        None | Some("false") | Some("0") | Some("no") => false,
        Some("true") | Some("1") | Some("yes") => true,
        Some(other) => {
            errors.push(format!("{key} '{other}' must be true or false"));
            false
        }
    }
}
