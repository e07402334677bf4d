//! The three request operations, from raw parameters to response envelope:
//! fishing conditions (≤ 30 days), lunar calendar (≤ 90 days) and migration
//! events (≤ 180 days).
//!
//! Validation runs first and rejects bad requests before any computation starts.

use crate::conditions::{FishingConditionsAggregator, FishingConditionsReport, MAX_SPECIES_PER_REPORT};
use crate::config::Config;
use crate::error::Result;
use crate::lunar::LunarPhase;
use crate::query::{ConditionsRequest, DateRange, LunarCalendarRequest, MigrationRequest, QueryParams};
use crate::species::{MigrationEvent, MigrationProbabilityModel};
use crate::store::{CatchRecordStore, LunarPhaseCache, LunarPhaseStore, MigrationEventStore};
use crate::Location;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    pub start_date: chrono::NaiveDate,
    pub end_date: chrono::NaiveDate,
    pub days: i64,
}

impl From<&DateRange> for Period {
    fn from(range: &DateRange) -> Self {
        Self {
            start_date: range.start_date,
            end_date: range.end_date,
            days: range.days(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionsMetadata {
    pub generated_at: DateTime<Utc>,
    pub requested_species: Vec<String>,
    /// Species actually present in the reports (capped, unknown codes removed)
    pub evaluated_species: Vec<String>,
    pub species_cap: usize,
    pub include_historical: bool,
    pub tide_model: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionsResponse {
    pub period: Period,
    pub location: Location,
    pub conditions: Vec<FishingConditionsReport>,
    pub metadata: ConditionsMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LunarCalendarMetadata {
    pub generated_at: DateTime<Utc>,
    pub force_recalculate: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LunarCalendarResponse {
    pub period: Period,
    pub phases: Vec<LunarPhase>,
    pub metadata: LunarCalendarMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationMetadata {
    pub generated_at: DateTime<Utc>,
    pub species_filter: Option<Vec<String>>,
    pub persisted: usize,
    pub data_source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationEventsResponse {
    pub period: Period,
    pub location: Location,
    pub events: Vec<MigrationEvent>,
    pub metadata: MigrationMetadata,
}

/// Entry point shared by the CLI and any HTTP front end.
pub struct FishingService<S: ?Sized> {
    store: Arc<S>,
    lunar: LunarPhaseCache<S>,
    aggregator: FishingConditionsAggregator<S>,
    model: Arc<MigrationProbabilityModel>,
    defaults: Location,
}

impl<S> FishingService<S>
where
    S: LunarPhaseStore + MigrationEventStore + CatchRecordStore + ?Sized,
{
    pub fn new(store: Arc<S>, config: &Config) -> Self {
        let model = Arc::new(MigrationProbabilityModel::new(config.species_registry()));
        let aggregator = FishingConditionsAggregator::new(Arc::clone(&store), Arc::clone(&model), config.history.radius_km)
            .with_max_parallel_days(config.max_parallel_days());
        Self {
            lunar: LunarPhaseCache::new(Arc::clone(&store)),
            store,
            aggregator,
            model,
            defaults: config.default_location(),
        }
    }

    pub async fn fishing_conditions(&self, params: &QueryParams) -> Result<ConditionsResponse> {
        let request = ConditionsRequest::parse(params, &self.defaults)?;
        info!(
            start = %request.range.start_date,
            end = %request.range.end_date,
            species = request.species.len(),
            "computing fishing conditions"
        );

        let conditions = self
            .aggregator
            .compute_range(&request.range, &request.location, &request.species, request.include_historical)
            .await?;

        let registry = self.model.registry();
        let evaluated_species = request
            .species
            .iter()
            .take(MAX_SPECIES_PER_REPORT)
            .filter(|code| registry.contains(code))
            .cloned()
            .collect();

        Ok(ConditionsResponse {
            period: Period::from(&request.range),
            location: request.location,
            conditions,
            metadata: ConditionsMetadata {
                generated_at: Utc::now(),
                requested_species: request.species,
                evaluated_species,
                species_cap: MAX_SPECIES_PER_REPORT,
                include_historical: request.include_historical,
                tide_model: "synthetic M2+S2 approximation".to_string(),
            },
        })
    }

    pub async fn lunar_calendar(&self, params: &QueryParams) -> Result<LunarCalendarResponse> {
        let request = LunarCalendarRequest::parse(params)?;
        let mut phases = Vec::with_capacity(request.range.days() as usize);
        for date in request.range.dates() {
            let result = if request.force_recalculate {
                self.lunar.recalculate(date).await
            } else {
                self.lunar.get_or_compute(date).await
            };
            phases.push(result.inspect_err(|e| error!(%date, "lunar calendar storage failure: {e}"))?);
        }

        Ok(LunarCalendarResponse {
            period: Period::from(&request.range),
            phases,
            metadata: LunarCalendarMetadata {
                generated_at: Utc::now(),
                force_recalculate: request.force_recalculate,
            },
        })
    }

    /// Computes events for the window, upserts them, and returns them ranked.
    pub async fn migration_events(&self, params: &QueryParams) -> Result<MigrationEventsResponse> {
        let request = MigrationRequest::parse(params, &self.defaults, self.model.registry())?;
        let events = self.model.upcoming_events(
            request.range.start_date,
            request.range.end_date,
            &request.location,
            request.species.as_deref(),
        )?;

        let persisted = self
            .store
            .upsert_migration_events(&events)
            .await
            .inspect_err(|e| error!(events = events.len(), "migration event upsert failed: {e}"))?;
        info!(persisted, "migration events stored");

        Ok(MigrationEventsResponse {
            period: Period::from(&request.range),
            location: request.location,
            events,
            metadata: MigrationMetadata {
                generated_at: Utc::now(),
                species_filter: request.species,
                persisted,
                data_source: MigrationProbabilityModel::DATA_SOURCE.to_string(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConditionsError;
    use crate::store::MemoryStore;

    fn service() -> (Arc<MemoryStore>, FishingService<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Arc::clone(&store), FishingService::new(store, &Config::default()))
    }

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        QueryParams::from_pairs(pairs.iter().copied())
    }

    #[tokio::test]
    async fn test_conditions_response_shape() {
        let (_, svc) = service();
        let response = svc
            .fishing_conditions(&params(&[
                ("startDate", "2024-01-11"),
                ("endDate", "2024-01-13"),
                ("latitude", "60.39"),
                ("longitude", "5.32"),
                ("targetSpecies", "COD,KRAKEN"),
            ]))
            .await
            .unwrap();
        assert_eq!(response.period.days, 3);
        assert_eq!(response.conditions.len(), 3);
        assert_eq!(response.metadata.requested_species, vec!["COD", "KRAKEN"]);
        assert_eq!(response.metadata.evaluated_species, vec!["COD"]);

        let json = serde_json::to_value(&response).unwrap();
        for key in ["period", "location", "conditions", "metadata"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert!(json["conditions"][0].get("overallRating").is_some());
    }

    #[tokio::test]
    async fn test_oversized_range_rejected_before_computation() {
        let (store, svc) = service();
        let err = svc
            .fishing_conditions(&params(&[
                ("startDate", "2024-01-01"),
                ("endDate", "2024-03-01"),
                ("latitude", "60"),
                ("longitude", "5"),
            ]))
            .await
            .unwrap_err();
        assert!(matches!(err, ConditionsError::Validation(_)));
        assert_eq!(err.status_code(), 400);
        assert_eq!(store.lunar_phase_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_lunar_calendar_and_forced_recalculation() {
        let (store, svc) = service();
        let d = chrono::NaiveDate::from_ymd_opt(2024, 1, 11).unwrap();
        let mut stale = crate::lunar::LunarPhaseCalculator::new().calculate(d);
        stale.description = Some("stale".to_string());
        store.upsert_lunar_phase(&stale).await.unwrap();

        let cached = svc.lunar_calendar(&params(&[("date", "2024-01-11")])).await.unwrap();
        assert_eq!(cached.phases[0].description.as_deref(), Some("stale"));

        let forced = svc
            .lunar_calendar(&params(&[("date", "2024-01-11"), ("forceRecalculate", "true")]))
            .await
            .unwrap();
        assert_ne!(forced.phases[0].description.as_deref(), Some("stale"));
        assert!(forced.metadata.force_recalculate);
    }

    #[tokio::test]
    async fn test_lunar_calendar_ninety_days() {
        let (store, svc) = service();
        let response = svc
            .lunar_calendar(&params(&[("startDate", "2024-01-01"), ("endDate", "2024-03-30")]))
            .await
            .unwrap();
        assert_eq!(response.phases.len(), 90);
        assert_eq!(store.lunar_phase_count().unwrap(), 90);
    }

    #[tokio::test]
    async fn test_migration_events_persisted_idempotently() {
        let (store, svc) = service();
        let p = params(&[
            ("startDate", "2024-05-01"),
            ("endDate", "2024-09-30"),
            ("latitude", "60.39"),
            ("longitude", "5.32"),
            ("species", "mackerel,herring"),
        ]);
        let first = svc.migration_events(&p).await.unwrap();
        assert!(!first.events.is_empty());
        assert!(first.events.iter().all(|e| e.species == "MACKEREL" || e.species == "HERRING"));
        svc.migration_events(&p).await.unwrap();
        assert_eq!(store.migration_event_count().unwrap(), first.events.len());
    }

    #[tokio::test]
    async fn test_migration_unknown_species_is_client_error() {
        let (_, svc) = service();
        let err = svc
            .migration_events(&params(&[
                ("date", "2024-05-01"),
                ("latitude", "60"),
                ("longitude", "5"),
                ("species", "NESSIE"),
            ]))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.to_response().details, vec!["species 'NESSIE' is not supported"]);
    }
}
