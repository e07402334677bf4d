//! # Fishing Conditions Aggregation
//!
//! Merges the lunar, tidal, species and (optionally) historical signals into one
//! [`FishingConditionsReport`] per day.
//!
//! ## Rating
//! 1. Start from the moon's intrinsic strength, or [`DEFAULT_LUNAR_STRENGTH`] when
//!    the stored phase has none.
//! 2. If any species were evaluated, average that with the mean species activity.
//! 3. Round to the nearest integer and clamp to 1–10.
//!
//! ## Species
//! At most [`MAX_SPECIES_PER_REPORT`] requested species are evaluated. Activity is
//! `round(probability * 10)`. A species the model cannot evaluate is logged and left
//! out; the rest of the report is still produced.
//!
//! ## Multi-day Reports
//! Days are computed with bounded fan-out and re-assembled in date order.

use crate::history::{HistoricalCorrelationAnalyzer, HistoricalSummary};
use crate::lunar::{LunarPhase, LunarPhaseType};
use crate::query::DateRange;
use crate::species::MigrationProbabilityModel;
use crate::store::{CatchRecordStore, LunarPhaseCache, LunarPhaseStore, StoreResult};
use crate::tides::{TidalApproximator, TidalInfluence};
use crate::{DepthRange, FishingWindow, Location};
use chrono::{NaiveDate, NaiveTime};
use futures_util::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Species evaluated per day; extra requested species are ignored.
pub const MAX_SPECIES_PER_REPORT: usize = 5;

/// Baseline used when a lunar phase carries no strength.
pub const DEFAULT_LUNAR_STRENGTH: f64 = 5.0;

/// Denormalised moon summary carried on each report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LunarSummary {
    pub phase_type: LunarPhaseType,
    pub illumination_percent: f64,
    pub angle: f64,
    pub fishing_strength: Option<f64>,
    pub description: Option<String>,
}

impl From<&LunarPhase> for LunarSummary {
    fn from(phase: &LunarPhase) -> Self {
        Self {
            phase_type: phase.phase_type,
            illumination_percent: phase.illumination_percent,
            angle: phase.angle,
            fishing_strength: phase.fishing_strength,
            description: phase.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeciesInfluence {
    pub species: String,
    pub name: String,
    pub probability: f64,
    /// 0–10
    pub activity_score: u8,
    pub recommended_depth: Option<DepthRange>,
    pub bait_suggestions: Vec<String>,
    pub best_locations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FishingConditionsReport {
    pub date: NaiveDate,
    /// 1–10, derived
    pub overall_rating: u8,
    pub lunar_phase: LunarSummary,
    pub best_hours: Vec<FishingWindow>,
    pub species_influence: Vec<SpeciesInfluence>,
    pub recommendations: Vec<String>,
    pub tidal_influence: TidalInfluence,
    pub historical_data: Option<HistoricalSummary>,
}

/// Blend lunar strength with mean species activity into a 1–10 rating.
pub fn overall_rating(lunar_strength: Option<f64>, influence: &[SpeciesInfluence]) -> u8 {
    let lunar = lunar_strength
        .filter(|s| s.is_finite())
        .unwrap_or(DEFAULT_LUNAR_STRENGTH);
    let blended = if influence.is_empty() {
        lunar
    } else {
        let mean = influence.iter().map(|s| s.activity_score as f64).sum::<f64>() / influence.len() as f64;
        (lunar + mean) / 2.0
    };
    blended.round().clamp(1.0, 10.0) as u8
}

/// Moon advice, then the best window, then the two most active species.
fn recommendations(phase: &LunarPhase, best_hours: &[FishingWindow], influence: &[SpeciesInfluence]) -> Vec<String> {
    let mut out = Vec::with_capacity(3);
    if let Some(description) = &phase.description {
        out.push(description.clone());
    }
    if let Some(best) = best_hours.first() {
        out.push(best.label());
    }
    let top: Vec<&str> = influence.iter().take(2).map(|s| s.name.as_str()).collect();
    if !top.is_empty() {
        out.push(format!("Most active species: {}", top.join(", ")));
    }
    out
}

pub struct FishingConditionsAggregator<S: ?Sized> {
    lunar: LunarPhaseCache<S>,
    tides: TidalApproximator,
    model: Arc<MigrationProbabilityModel>,
    history: HistoricalCorrelationAnalyzer<S, S>,
    max_parallel_days: usize,
}

impl<S> FishingConditionsAggregator<S>
where
    S: LunarPhaseStore + CatchRecordStore + ?Sized,
{
    pub fn new(store: Arc<S>, model: Arc<MigrationProbabilityModel>, history_radius_km: f64) -> Self {
        let lunar = LunarPhaseCache::new(Arc::clone(&store));
        Self {
            history: HistoricalCorrelationAnalyzer::new(store, lunar.clone(), history_radius_km),
            lunar,
            tides: TidalApproximator::new(),
            model,
            max_parallel_days: 1,
        }
    }

    pub fn with_max_parallel_days(mut self, n: usize) -> Self {
        self.max_parallel_days = n.max(1);
        self
    }

    /// One day's report. Only storage failures abort it.
    pub async fn compute_day_report(
        &self,
        date: NaiveDate,
        location: &Location,
        species: &[String],
        include_historical: bool,
    ) -> StoreResult<FishingConditionsReport> {
        let phase = self.lunar.get_or_compute(date).await.inspect_err(|e| {
            error!(%date, "lunar phase lookup failed: {e}");
        })?;
        let best_hours = self.lunar.calculator().best_fishing_hours(date, &phase);
        let species_influence = self.species_influence(date, location, species);
        let overall_rating = overall_rating(phase.fishing_strength, &species_influence);
        let recommendations = recommendations(&phase, &best_hours, &species_influence);

        // Describe the water during the best window, else at midday.
        let tide_at = best_hours
            .first()
            .map(|w| w.start)
            .unwrap_or(NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN));
        let tidal_influence = self.tides.approximate(date.and_time(tide_at), location);

        let historical_data = if include_historical {
            self.history
                .analyze(date, location, species)
                .await
                .inspect_err(|e| error!(%date, "historical analysis failed: {e}"))?
        } else {
            None
        };

        debug!(%date, rating = overall_rating, species = species_influence.len(), "day report computed");
        Ok(FishingConditionsReport {
            date,
            overall_rating,
            lunar_phase: LunarSummary::from(&phase),
            best_hours,
            species_influence,
            recommendations,
            tidal_influence,
            historical_data,
        })
    }

    /// Reports for every day of `range`, in date order.
    pub async fn compute_range(
        &self,
        range: &DateRange,
        location: &Location,
        species: &[String],
        include_historical: bool,
    ) -> StoreResult<Vec<FishingConditionsReport>> {
        stream::iter(range.dates())
            .map(|date| self.compute_day_report(date, location, species, include_historical))
            .buffered(self.max_parallel_days)
            .try_collect()
            .await
    }

    /// Capped, evaluated and sorted species influence. Unknown species are skipped.
    fn species_influence(&self, date: NaiveDate, location: &Location, species: &[String]) -> Vec<SpeciesInfluence> {
        let mut influence: Vec<SpeciesInfluence> = species
            .iter()
            .take(MAX_SPECIES_PER_REPORT)
            .filter_map(|code| {
                let recommendation = match self.model.get_recommendation(code, date, location) {
                    Ok(r) => r,
                    Err(e) => {
                        warn!(species = %code, %date, "excluding species from report: {e}");
                        return None;
                    }
                };
                let profile = self.model.registry().get(code).ok()?;
                let raw = recommendation.probability;
                Some(SpeciesInfluence {
                    species: profile.code.clone(),
                    name: profile.name.clone(),
                    probability: (raw * 1000.0).round() / 1000.0,
                    activity_score: (raw * 10.0).round().clamp(0.0, 10.0) as u8,
                    recommended_depth: recommendation.depth_range(),
                    bait_suggestions: profile.baits.clone(),
                    best_locations: recommendation.best_locations,
                })
            })
            .collect();

        influence.sort_by(|a, b| {
            b.activity_score
                .cmp(&a.activity_score)
                .then(b.probability.total_cmp(&a.probability))
                .then_with(|| a.species.cmp(&b.species))
        });
        influence
    }
}
