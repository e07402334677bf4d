//! # Fishing Conditions Core Library
//!
//! This library computes day-by-day fishing conditions for charter trip planning.
//! Every signal it produces is a deterministic function of the calendar date and
//! the requested location, so reports can be cached, compared and tested exactly.
//!
//! ## Signal Pipeline
//!
//! For each requested day:
//! 1. **Moon**: [`lunar::LunarPhaseCalculator`] derives phase, illumination and the
//!    solunar feeding windows. Results are memoised through [`store::LunarPhaseCache`].
//! 2. **Tide**: [`tides::TidalApproximator`] evaluates a synthetic two-constituent tide.
//! 3. **Species**: [`species::MigrationProbabilityModel`] turns each species' seasonal
//!    curve into an arrival probability, depth and location advice.
//! 4. **Rating**: [`conditions::FishingConditionsAggregator`] blends the above into a
//!    1–10 rating with ordered recommendations.
//! 5. **History** (optional): [`history::HistoricalCorrelationAnalyzer`] looks at the
//!    same seasonal window in prior years and correlates catches with the moon.
//!
//! ## Approximations
//! The lunar ephemeris is accurate to about a day, the tide is a synthetic sine model
//! and the seasonal curves are Gaussian bumps over day-of-year. None of them claim
//! astronomical or biological precision; they are stable, bounded and documented.
//!
//! ## Core Types
//! The types shared between modules live here:
//! - [`Location`]: request-scoped fishing spot with its depth bands
//! - [`FishingWindow`]: a time-of-day window with an expected quality score
//! - [`CatchRecord`] / [`Catch`]: historical trip outcomes (read-only input)

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

pub mod conditions;
pub mod config;
pub mod error;
pub mod history;
pub mod lunar;
pub mod query;
pub mod renderer;
pub mod service;
pub mod species;
pub mod store;
pub mod tides;

/// Synthetic continental shelf gradient used to derive distance from shore.
const SHELF_GRADIENT_M_PER_KM: f64 = 25.0;

/// Mean Earth radius used for great-circle distances.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// A fishing spot, constructed per request from query parameters.
///
/// Depth bands are kept sorted ascending so the deepest band is always last.
///
/// # Example
/// ```
/// use fishing_conditions_lib::Location;
///
/// let spot = Location::new(60.39, 5.32, "Bergen Outer Reef")
///     .with_depths(vec![40.0, 10.0, 25.0]);
///
/// assert_eq!(spot.depths, vec![10.0, 25.0, 40.0]);
/// assert!((spot.distance_from_shore_km - 1.6).abs() < 1e-9);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
    /// Depth bands in metres, ascending
    #[serde(default)]
    pub depths: Vec<f64>,
    #[serde(default)]
    pub bottom_type: Option<String>,
    /// Derived from the deepest band; zero when no depths are known
    #[serde(default)]
    pub distance_from_shore_km: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64, name: impl Into<String>) -> Self {
        Self {
            latitude,
            longitude,
            name: name.into(),
            depths: Vec::new(),
            bottom_type: None,
            distance_from_shore_km: 0.0,
        }
    }

    /// Replace the depth bands, sorting them and re-deriving distance from shore.
    pub fn with_depths(mut self, mut depths: Vec<f64>) -> Self {
        depths.retain(|d| d.is_finite() && *d >= 0.0);
        depths.sort_by(f64::total_cmp);
        self.distance_from_shore_km = depths
            .last()
            .map(|deepest| deepest / SHELF_GRADIENT_M_PER_KM)
            .unwrap_or(0.0);
        self.depths = depths;
        self
    }

    pub fn with_bottom_type(mut self, bottom_type: impl Into<String>) -> Self {
        self.bottom_type = Some(bottom_type.into());
        self
    }

    /// Great-circle (haversine) distance to another point in kilometres.
    pub fn distance_km(&self, latitude: f64, longitude: f64) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), latitude.to_radians());
        let dlat = lat2 - lat1;
        let dlon = (longitude - self.longitude).to_radians();
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
    }
}

/// Inclusive depth range in metres.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DepthRange {
    pub min: f64,
    pub max: f64,
}

impl DepthRange {
    /// Span of a set of depths, or `None` when the set is empty.
    pub fn spanning(depths: &[f64]) -> Option<Self> {
        let min = depths.iter().copied().reduce(f64::min)?;
        let max = depths.iter().copied().reduce(f64::max)?;
        Some(Self { min, max })
    }
}

/// A time-of-day window with an expected fishing quality (0–10).
///
/// Windows may wrap past midnight, in which case `end < start`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FishingWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub description: String,
    pub quality: u8,
}

impl FishingWindow {
    /// Formats the window as `description (HH:MM-HH:MM)`.
    pub fn label(&self) -> String {
        format!(
            "{} ({}-{})",
            self.description,
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}

/// A single fish landed during a trip.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Catch {
    /// Species code, e.g. `COD`
    pub species: String,
    pub weight_kg: f64,
    #[serde(default)]
    pub count: u32,
}

/// A historical trip outcome. Owned by other collaborators; never mutated here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatchRecord {
    pub date: NaiveDate,
    pub latitude: f64,
    pub longitude: f64,
    pub angler: String,
    /// Phase stored alongside the record, if the writer joined it
    #[serde(default)]
    pub lunar_phase: Option<lunar::LunarPhaseType>,
    pub total_weight: f64,
    pub success: bool,
    #[serde(default)]
    pub catches: Vec<Catch>,
}

impl CatchRecord {
    pub fn has_species(&self, codes: &[String]) -> bool {
        self.catches
            .iter()
            .any(|c| codes.iter().any(|code| code.eq_ignore_ascii_case(&c.species)))
    }
}
