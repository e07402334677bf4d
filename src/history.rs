//! Retrospective analysis of catch records around the same seasonal window in
//! prior years, correlated with the moon phase in effect on each trip.

use crate::lunar::LunarPhaseType;
use crate::store::{CatchRecordStore, LunarPhaseCache, LunarPhaseStore, StoreResult};
use crate::{CatchRecord, Location};
use chrono::{Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Days either side of the target date.
pub const WINDOW_DAYS: i64 = 7;
/// How many prior years are searched.
pub const YEARS_BACK: u32 = 3;
/// Upper bound on records analysed.
pub const MAX_RECORDS: usize = 50;
/// Phase correlation needs at least this many records to mean anything.
pub const MIN_CORRELATION_RECORDS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BestDay {
    pub date: NaiveDate,
    pub total_weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LunarPhaseCorrelation {
    pub best_phase: LunarPhaseType,
    pub average_weight: f64,
    pub sample_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalSummary {
    pub total_records: usize,
    pub average_weight: f64,
    /// Percentage of successful trips, 0–100
    pub success_rate: f64,
    pub best_day: BestDay,
    pub lunar_phase_correlation: Option<LunarPhaseCorrelation>,
}

pub struct HistoricalCorrelationAnalyzer<C: ?Sized, L: ?Sized> {
    catches: Arc<C>,
    lunar: LunarPhaseCache<L>,
    radius_km: f64,
}

impl<C, L> HistoricalCorrelationAnalyzer<C, L>
where
    C: CatchRecordStore + ?Sized,
    L: LunarPhaseStore + ?Sized,
{
    pub fn new(catches: Arc<C>, lunar: LunarPhaseCache<L>, radius_km: f64) -> Self {
        Self {
            catches,
            lunar,
            radius_km,
        }
    }

    /// Summary of past trips near `location` within ±7 days of `date` one to
    /// three years back, or `None` when there are none.
    ///
    /// A non-empty `species` list keeps only trips that landed at least one of them.
    pub async fn analyze(
        &self,
        date: NaiveDate,
        location: &Location,
        species: &[String],
    ) -> StoreResult<Option<HistoricalSummary>> {
        let mut records = Vec::new();
        for years in 1..=YEARS_BACK {
            let Some(anchor) = date.checked_sub_months(Months::new(12 * years)) else {
                continue;
            };
            let window = Duration::days(WINDOW_DAYS);
            let (Some(start), Some(end)) = (anchor.checked_sub_signed(window), anchor.checked_add_signed(window)) else {
                continue;
            };
            records.extend(
                self.catches
                    .catch_records(start, end)
                    .await?
                    .into_iter()
                    .filter(|r| location.distance_km(r.latitude, r.longitude) <= self.radius_km)
                    .filter(|r| species.is_empty() || r.has_species(species)),
            );
        }

        records.sort_by(|a, b| b.date.cmp(&a.date));
        records.truncate(MAX_RECORDS);
        debug!(%date, records = records.len(), "historical records selected");

        if records.is_empty() {
            return Ok(None);
        }

        let mut phased = Vec::with_capacity(records.len());
        for record in &records {
            let phase = match record.lunar_phase {
                Some(phase) => phase,
                None => self.lunar.get_or_compute(record.date).await?.phase_type,
            };
            phased.push((phase, record));
        }

        Ok(Some(summarize(&phased)))
    }
}

fn summarize(records: &[(LunarPhaseType, &CatchRecord)]) -> HistoricalSummary {
    let total = records.len();
    let total_weight: f64 = records.iter().map(|(_, r)| r.total_weight).sum();
    let successes = records.iter().filter(|(_, r)| r.success).count();

    // Heaviest day; ties go to the earliest date.
    let best = records
        .iter()
        .map(|(_, r)| *r)
        .fold(None::<&CatchRecord>, |best, r| match best {
            Some(b) if b.total_weight > r.total_weight => Some(b),
            Some(b) if b.total_weight == r.total_weight && b.date <= r.date => Some(b),
            _ => Some(r),
        });
    let best_day = best
        .map(|r| BestDay {
            date: r.date,
            total_weight: r.total_weight,
        })
        .unwrap_or(BestDay {
            date: NaiveDate::MIN,
            total_weight: 0.0,
        });

    HistoricalSummary {
        total_records: total,
        average_weight: round2(total_weight / total as f64),
        success_rate: round2(successes as f64 / total as f64 * 100.0),
        best_day,
        lunar_phase_correlation: if total >= MIN_CORRELATION_RECORDS {
            correlate(records)
        } else {
            None
        },
    }
}

/// Phase with the highest mean weight; ties prefer more samples, then cycle order.
fn correlate(records: &[(LunarPhaseType, &CatchRecord)]) -> Option<LunarPhaseCorrelation> {
    let mut groups: BTreeMap<LunarPhaseType, (f64, usize)> = BTreeMap::new();
    for (phase, record) in records {
        let entry = groups.entry(*phase).or_insert((0.0, 0));
        entry.0 += record.total_weight;
        entry.1 += 1;
    }

    groups
        .into_iter()
        .map(|(phase, (sum, n))| LunarPhaseCorrelation {
            best_phase: phase,
            average_weight: round2(sum / n as f64),
            sample_count: n,
        })
        .reduce(|best, next| {
            let better = next.average_weight > best.average_weight
                || (next.average_weight == best.average_weight && next.sample_count > best.sample_count);
            if better {
                next
            } else {
                best
            }
        })
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
