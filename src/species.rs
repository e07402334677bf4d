//! # Species Registry and Migration Probability Model
//!
//! Each species is described by a [`SpeciesProfile`]: a seasonal curve over
//! day-of-year plus the practical advice a skipper gives for it (depth bands,
//! baits, marks). The registry is plain data, so new species can be added from the
//! configuration file without touching code.
//!
//! ## Seasonal Curve
//! Arrival probability is a circular Gaussian bump centred on `peak_day`:
//!
//! ```text
//! p(d) = base + (peak - base) * exp(-Δ² / 2σ²),   Δ = circular distance(d, peak_day)
//! ```
//!
//! Arrival and departure events sit 1.5σ either side of the peak. The curve is a
//! replaceable approximation, not a biological model.

use crate::{DepthRange, Location};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

const DAYS_PER_YEAR: f64 = 365.0;

/// Events sit this many σ away from the peak.
const EVENT_SPREAD_SIGMAS: f64 = 1.5;

/// Tolerance when matching profile depths against a location's bands.
const DEPTH_MATCH_TOLERANCE_M: f64 = 10.0;

/// Requested species code is not in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown species: {0}")]
pub struct UnknownSpeciesError(pub String);

/// Seasonal and practical data for one species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesProfile {
    /// Upper-case code used in queries, e.g. `COD`
    pub code: String,
    pub name: String,
    /// Day-of-year (1–365) of peak presence
    pub peak_day: u16,
    /// Curve width in days (σ)
    pub spread_days: f64,
    /// Off-season floor probability
    pub base_probability: f64,
    /// Probability at the peak
    pub peak_probability: f64,
    /// Depth bands in metres, shallow first
    pub depths: Vec<f64>,
    #[serde(default)]
    pub baits: Vec<String>,
    #[serde(default)]
    pub best_locations: Vec<String>,
    #[serde(default)]
    pub water_temperature_c: Option<f64>,
    /// Confidence in the curve itself, 0–1
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_confidence() -> f64 {
    0.6
}

impl SpeciesProfile {
    /// Probability of presence on `date`, always within `[0, 1]`.
    pub fn probability_on(&self, date: NaiveDate) -> f64 {
        let base = self.base_probability.clamp(0.0, 1.0);
        let peak = self.peak_probability.clamp(0.0, 1.0);
        let sigma = self.spread_days.max(1.0);

        let raw = (date.ordinal() as f64 - self.peak_day as f64).rem_euclid(DAYS_PER_YEAR);
        let delta = raw.min(DAYS_PER_YEAR - raw);
        let p = base + (peak - base) * (-(delta * delta) / (2.0 * sigma * sigma)).exp();
        p.clamp(0.0, 1.0)
    }

    fn event_offset_days(&self) -> i64 {
        // Beyond half a year arrival and departure would swap sides of the peak.
        (self.spread_days.max(1.0) * EVENT_SPREAD_SIGMAS).round().min(DAYS_PER_YEAR / 2.0) as i64
    }
}

/// Code → profile lookup. Ordered by code so iteration is deterministic.
#[derive(Debug, Clone, Default)]
pub struct SpeciesRegistry {
    profiles: BTreeMap<String, SpeciesProfile>,
}

impl SpeciesRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in North Atlantic species.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for profile in builtin_profiles() {
            registry.insert(profile);
        }
        registry
    }

    /// Adds or replaces a profile, keyed by its upper-cased code.
    pub fn insert(&mut self, mut profile: SpeciesProfile) {
        profile.code = profile.code.trim().to_ascii_uppercase();
        self.profiles.insert(profile.code.clone(), profile);
    }

    pub fn get(&self, code: &str) -> Result<&SpeciesProfile, UnknownSpeciesError> {
        self.profiles
            .get(&code.trim().to_ascii_uppercase())
            .ok_or_else(|| UnknownSpeciesError(code.to_string()))
    }

    pub fn contains(&self, code: &str) -> bool {
        self.get(code).is_ok()
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[allow(clippy::too_many_arguments)]
fn profile(
    code: &str,
    name: &str,
    peak_day: u16,
    spread_days: f64,
    (base_probability, peak_probability): (f64, f64),
    depths: &[f64],
    baits: &[&str],
    best_locations: &[&str],
    water_temperature_c: f64,
    confidence: f64,
) -> SpeciesProfile {
    SpeciesProfile {
        code: code.to_string(),
        name: name.to_string(),
        peak_day,
        spread_days,
        base_probability,
        peak_probability,
        depths: depths.to_vec(),
        baits: baits.iter().map(|s| s.to_string()).collect(),
        best_locations: best_locations.iter().map(|s| s.to_string()).collect(),
        water_temperature_c: Some(water_temperature_c),
        confidence,
    }
}

fn builtin_profiles() -> Vec<SpeciesProfile> {
    vec![
        profile(
            "COD", "Atlantic Cod", 45, 40.0, (0.25, 0.9),
            &[20.0, 40.0, 60.0, 80.0],
            &["Shad", "Clam", "Pirk jig"],
            &["Offshore banks", "Wreck marks", "Rocky ledges"],
            5.0, 0.75,
        ),
        profile(
            "MACKEREL", "Atlantic Mackerel", 200, 30.0, (0.05, 0.95),
            &[2.0, 5.0, 10.0, 20.0],
            &["Feathers", "Sabiki", "Small spinners"],
            &["Harbour mouths", "Headlands", "Tide rips"],
            14.0, 0.8,
        ),
        profile(
            "HERRING", "Atlantic Herring", 260, 35.0, (0.1, 0.85),
            &[5.0, 15.0, 30.0],
            &["Sabiki", "Small jigs"],
            &["Fjord basins", "Sheltered bays"],
            10.0, 0.65,
        ),
        profile(
            "POLLOCK", "Pollock", 280, 45.0, (0.2, 0.8),
            &[10.0, 25.0, 50.0],
            &["Soft plastic eel", "Metal jig"],
            &["Kelp edges", "Reef drop-offs"],
            9.0, 0.7,
        ),
        profile(
            "HALIBUT", "Atlantic Halibut", 170, 35.0, (0.05, 0.6),
            &[40.0, 80.0, 120.0],
            &["Whole herring", "Large shad"],
            &["Sandy plateaus", "Channel edges"],
            7.0, 0.55,
        ),
        profile(
            "SALMON", "Atlantic Salmon", 190, 25.0, (0.02, 0.7),
            &[1.0, 3.0, 8.0],
            &["Spoon", "Fly", "Prawn"],
            &["River estuaries", "Fjord heads"],
            12.0, 0.6,
        ),
        profile(
            "SEABASS", "European Sea Bass", 240, 40.0, (0.05, 0.75),
            &[1.0, 5.0, 12.0],
            &["Sandeel", "Surface lure", "Peeler crab"],
            &["Surf beaches", "Estuary mouths", "Rocky shores"],
            16.0, 0.65,
        ),
        profile(
            "TUNA", "Atlantic Bluefin Tuna", 250, 20.0, (0.0, 0.5),
            &[10.0, 50.0, 100.0],
            &["Live mackerel", "Spreader bar", "Stickbait"],
            &["Offshore fronts", "Herring shoals"],
            15.0, 0.45,
        ),
    ]
}

/// Per-species advice for a date and location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationRecommendation {
    pub probability: f64,
    pub recommended_depths: Vec<f64>,
    pub best_locations: Vec<String>,
}

impl MigrationRecommendation {
    pub fn depth_range(&self) -> Option<DepthRange> {
        DepthRange::spanning(&self.recommended_depths)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationEventType {
    Arrival,
    Peak,
    Departure,
}

/// A predicted arrival/peak/departure of a species at a location.
///
/// Identified by (species, date, event type, latitude, longitude).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationEvent {
    pub species: String,
    pub event_type: MigrationEventType,
    pub date: NaiveDate,
    /// `[0, 1]`
    pub probability: f64,
    pub location: Location,
    #[serde(default)]
    pub water_temperature: Option<f64>,
    #[serde(default)]
    pub depth: Option<f64>,
    pub description: String,
    pub data_source: String,
    pub confidence: f64,
}

/// Seasonal model over a [`SpeciesRegistry`].
#[derive(Debug, Clone)]
pub struct MigrationProbabilityModel {
    registry: SpeciesRegistry,
}

impl Default for MigrationProbabilityModel {
    fn default() -> Self {
        Self::new(SpeciesRegistry::builtin())
    }
}

impl MigrationProbabilityModel {
    pub const DATA_SOURCE: &'static str = "seasonal-curve-model";

    pub fn new(registry: SpeciesRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &SpeciesRegistry {
        &self.registry
    }

    /// Probability, depths and marks for `species` on `date`.
    ///
    /// Depths are narrowed to the profile bands within reach of the location's own
    /// depth bands; when nothing matches, or the location has no depths, the full
    /// profile list is returned.
    pub fn get_recommendation(
        &self,
        species: &str,
        date: NaiveDate,
        location: &Location,
    ) -> Result<MigrationRecommendation, UnknownSpeciesError> {
        let profile = self.registry.get(species)?;

        let mut recommended_depths: Vec<f64> = profile
            .depths
            .iter()
            .copied()
            .filter(|d| {
                location
                    .depths
                    .iter()
                    .any(|band| (band - d).abs() <= DEPTH_MATCH_TOLERANCE_M)
            })
            .collect();
        if recommended_depths.is_empty() {
            recommended_depths = profile.depths.clone();
        }

        Ok(MigrationRecommendation {
            probability: profile.probability_on(date),
            recommended_depths,
            best_locations: profile.best_locations.clone(),
        })
    }

    /// Arrival, peak and departure events inside `[start, end]` (inclusive).
    ///
    /// `species_filter` of `None` means every registered species; unknown codes in
    /// the filter are an error. Results are sorted by probability descending, then
    /// date ascending, then species code and event type for full determinism.
    pub fn upcoming_events(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        location: &Location,
        species_filter: Option<&[String]>,
    ) -> Result<Vec<MigrationEvent>, UnknownSpeciesError> {
        let profiles: Vec<&SpeciesProfile> = match species_filter {
            Some(codes) => codes
                .iter()
                .map(|code| self.registry.get(code))
                .collect::<Result<_, _>>()?,
            None => self.registry.profiles.values().collect(),
        };

        let mut events = Vec::new();
        for profile in profiles {
            let offset = profile.event_offset_days();
            // Peaks from neighbouring years can push arrival/departure into the window.
            for year in (start.year() - 1)..=(end.year() + 1) {
                let Some(peak) = peak_date(year, profile.peak_day) else {
                    continue;
                };
                let candidates = [
                    (MigrationEventType::Arrival, peak.checked_sub_signed(Duration::days(offset))),
                    (MigrationEventType::Peak, Some(peak)),
                    (MigrationEventType::Departure, peak.checked_add_signed(Duration::days(offset))),
                ];
                for (event_type, date) in candidates {
                    let Some(date) = date else {
                        continue;
                    };
                    if date < start || date > end {
                        continue;
                    }
                    events.push(build_event(profile, event_type, date, location));
                }
            }
        }

        sort_events(&mut events);
        Ok(events)
    }
}

/// Probability descending, then date ascending.
pub fn sort_events(events: &mut [MigrationEvent]) {
    events.sort_by(|a, b| {
        b.probability
            .total_cmp(&a.probability)
            .then(a.date.cmp(&b.date))
            .then_with(|| a.species.cmp(&b.species))
            .then(a.event_type.cmp(&b.event_type))
    });
}

fn peak_date(year: i32, peak_day: u16) -> Option<NaiveDate> {
    let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)?;
    jan1.checked_add_signed(Duration::days(i64::from(peak_day.clamp(1, 365)) - 1))
}

fn build_event(
    profile: &SpeciesProfile,
    event_type: MigrationEventType,
    date: NaiveDate,
    location: &Location,
) -> MigrationEvent {
    let probability = profile.probability_on(date);
    let verb = match event_type {
        MigrationEventType::Arrival => "expected to arrive",
        MigrationEventType::Peak => "at seasonal peak",
        MigrationEventType::Departure => "expected to depart",
    };
    MigrationEvent {
        species: profile.code.clone(),
        event_type,
        date,
        probability: (probability * 1000.0).round() / 1000.0,
        location: location.clone(),
        water_temperature: profile.water_temperature_c,
        depth: profile.depths.get(profile.depths.len() / 2).copied(),
        description: format!("{} {} near {}", profile.name, verb, location.name),
        data_source: MigrationProbabilityModel::DATA_SOURCE.to_string(),
        confidence: profile.confidence.clamp(0.0, 1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn spot() -> Location {
        Location::new(60.39, 5.32, "Bergen").with_depths(vec![5.0, 20.0])
    }

    #[test]
    fn test_probability_bounded_for_every_species() {
        let model = MigrationProbabilityModel::default();
        let codes: Vec<String> = model.registry().codes().map(str::to_string).collect();
        assert!(codes.len() >= 5);
        let mut d = date(2023, 1, 1);
        while d <= date(2024, 12, 31) {
            for code in &codes {
                let rec = model.get_recommendation(code, d, &spot()).unwrap();
                assert!((0.0..=1.0).contains(&rec.probability), "{code} on {d}");
                assert!(!rec.recommended_depths.is_empty());
            }
            d += Duration::days(7);
        }
    }

    #[test]
    fn test_peak_is_maximum() {
        let model = MigrationProbabilityModel::default();
        let at_peak = model.get_recommendation("MACKEREL", date(2024, 7, 18), &spot()).unwrap();
        let off_season = model.get_recommendation("MACKEREL", date(2024, 1, 15), &spot()).unwrap();
        assert!(at_peak.probability > 0.9);
        assert!(off_season.probability < 0.1);
    }

    #[test]
    fn test_curve_wraps_around_new_year() {
        let registry = SpeciesRegistry::builtin();
        let cod = registry.get("COD").unwrap();
        // Peak at day 45; late December is ~50 days away across the boundary.
        let december = cod.probability_on(date(2023, 12, 27));
        let june = cod.probability_on(date(2024, 6, 15));
        assert!(december > june);
    }

    #[test]
    fn test_unknown_species_is_error() {
        let model = MigrationProbabilityModel::default();
        let err = model.get_recommendation("KRAKEN", date(2024, 5, 1), &spot()).unwrap_err();
        assert_eq!(err, UnknownSpeciesError("KRAKEN".to_string()));
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let model = MigrationProbabilityModel::default();
        assert!(model.get_recommendation("cod", date(2024, 5, 1), &spot()).is_ok());
    }

    #[test]
    fn test_depths_narrowed_to_location() {
        let model = MigrationProbabilityModel::default();
        let rec = model.get_recommendation("COD", date(2024, 2, 1), &spot()).unwrap();
        assert_eq!(rec.recommended_depths, vec![20.0]);

        let no_depths = Location::new(60.0, 5.0, "Unknown");
        let rec = model.get_recommendation("COD", date(2024, 2, 1), &no_depths).unwrap();
        assert_eq!(rec.recommended_depths, vec![20.0, 40.0, 60.0, 80.0]);
    }

    #[test]
    fn test_registry_accepts_new_species_as_data() {
        let mut registry = SpeciesRegistry::builtin();
        let before = registry.len();
        registry.insert(SpeciesProfile {
            code: "wolffish".to_string(),
            name: "Atlantic Wolffish".to_string(),
            peak_day: 100,
            spread_days: 30.0,
            base_probability: 0.1,
            peak_probability: 0.5,
            depths: vec![30.0],
            baits: vec![],
            best_locations: vec![],
            water_temperature_c: None,
            confidence: 0.5,
        });
        assert_eq!(registry.len(), before + 1);
        assert!(registry.contains("WOLFFISH"));
    }

    #[test]
    fn test_upcoming_events_within_window_and_sorted() {
        let model = MigrationProbabilityModel::default();
        let (start, end) = (date(2024, 6, 1), date(2024, 9, 30));
        let events = model.upcoming_events(start, end, &spot(), None).unwrap();
        assert!(!events.is_empty());
        for e in &events {
            assert!(e.date >= start && e.date <= end);
            assert!((0.0..=1.0).contains(&e.probability));
        }
        for pair in events.windows(2) {
            assert!(
                pair[0].probability > pair[1].probability
                    || (pair[0].probability == pair[1].probability && pair[0].date <= pair[1].date)
            );
        }
    }

    #[test]
    fn test_window_is_inclusive() {
        let model = MigrationProbabilityModel::default();
        // MACKEREL peak is day 200 = 2024-07-18 (leap year).
        let peak = date(2024, 7, 18);
        let filter = vec!["MACKEREL".to_string()];
        let events = model.upcoming_events(peak, peak, &spot(), Some(&filter)).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, MigrationEventType::Peak);
    }

    #[test]
    fn test_equal_probability_resolves_earlier_date_first() {
        let event = |d: NaiveDate| MigrationEvent {
            species: "COD".to_string(),
            event_type: MigrationEventType::Arrival,
            date: d,
            probability: 0.5,
            location: spot(),
            water_temperature: None,
            depth: None,
            description: String::new(),
            data_source: "test".to_string(),
            confidence: 0.5,
        };
        let mut events = vec![event(date(2024, 5, 3)), event(date(2024, 5, 1))];
        let mut stronger = event(date(2024, 5, 9));
        stronger.probability = 0.8;
        events.push(stronger);

        sort_events(&mut events);
        let dates: Vec<_> = events.iter().map(|e| e.date).collect();
        assert_eq!(dates, vec![date(2024, 5, 9), date(2024, 5, 1), date(2024, 5, 3)]);
    }

    #[test]
    fn test_unknown_species_in_filter_is_error() {
        let model = MigrationProbabilityModel::default();
        let filter = vec!["COD".to_string(), "NESSIE".to_string()];
        assert!(model
            .upcoming_events(date(2024, 1, 1), date(2024, 2, 1), &spot(), Some(&filter))
            .is_err());
    }

    #[test]
    fn test_events_from_previous_year_peak() {
        let model = MigrationProbabilityModel::default();
        // COD peak day 45 with σ 40 departs ~60 days later; arrival falls in late December.
        let filter = vec!["COD".to_string()];
        let events = model
            .upcoming_events(date(2023, 12, 1), date(2023, 12, 31), &spot(), Some(&filter))
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, MigrationEventType::Arrival);
    }

    #[test]
    fn test_events_at_calendar_limits() {
        let model = MigrationProbabilityModel::default();
        let early = model
            .upcoming_events(NaiveDate::MIN, NaiveDate::MIN + Duration::days(400), &spot(), None)
            .unwrap();
        assert!(early.iter().all(|e| e.date >= NaiveDate::MIN));

        let late = model
            .upcoming_events(NaiveDate::MAX - Duration::days(400), NaiveDate::MAX, &spot(), None)
            .unwrap();
        assert!(late.iter().all(|e| (0.0..=1.0).contains(&e.probability)));
    }

    #[test]
    fn test_huge_spread_keeps_events_in_range() {
        let mut registry = SpeciesRegistry::empty();
        registry.insert(SpeciesProfile {
            code: "WIDE".to_string(),
            name: "Everywhere Fish".to_string(),
            peak_day: 120,
            spread_days: f64::MAX,
            base_probability: 0.2,
            peak_probability: 0.8,
            depths: vec![10.0],
            baits: vec![],
            best_locations: vec![],
            water_temperature_c: None,
            confidence: 0.5,
        });
        let model = MigrationProbabilityModel::new(registry);
        let events = model.upcoming_events(date(2024, 1, 1), date(2024, 6, 28), &spot(), None).unwrap();
        assert!(events.iter().all(|e| e.species == "WIDE"));
    }
}
