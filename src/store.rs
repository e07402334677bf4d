//! # Storage Collaborators
//!
//! The engine reads and writes three kinds of records through narrow async traits:
//! - [`LunarPhaseStore`]: one [`LunarPhase`] per date, upserted on first computation
//! - [`MigrationEventStore`]: migration events upserted on their composite key
//! - [`CatchRecordStore`]: read-only catch history filtered by date range
//!
//! Two implementations are provided:
//! - [`MemoryStore`]: `RwLock`-guarded maps, for tests and embedding
//! - [`JsonFileStore`]: the same data persisted as a single JSON document, rewritten
//!   atomically (temp file + rename) after every write
//!
//! No retries happen here. A failed read or write surfaces as [`StoreError`] and the
//! caller decides what to do with it.
//!
//! [`LunarPhaseCache`] layers compute-if-absent semantics on top of any
//! [`LunarPhaseStore`]. Concurrent misses for the same date may both compute and
//! both write; the computation is pure, so the last write stores the same value.

use crate::lunar::{LunarPhase, LunarPhaseCalculator};
use crate::species::{MigrationEvent, MigrationEventType};
use crate::CatchRecord;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Errors raised by storage collaborators.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage IO: {0}")]
    Io(#[from] io::Error),

    #[error("storage encoding: {0}")]
    Json(#[from] serde_json::Error),

    #[error("storage backend: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait LunarPhaseStore: Send + Sync {
    async fn get_lunar_phase(&self, date: NaiveDate) -> StoreResult<Option<LunarPhase>>;

    /// Insert or overwrite the record for `phase.date`.
    async fn upsert_lunar_phase(&self, phase: &LunarPhase) -> StoreResult<()>;
}

#[async_trait]
pub trait MigrationEventStore: Send + Sync {
    /// Upsert each event on (species, date, event type, latitude, longitude).
    /// Returns how many events were written.
    async fn upsert_migration_events(&self, events: &[MigrationEvent]) -> StoreResult<usize>;

    /// Stored events dated within `[start, end]`.
    async fn migration_events(&self, start: NaiveDate, end: NaiveDate) -> StoreResult<Vec<MigrationEvent>>;
}

#[async_trait]
pub trait CatchRecordStore: Send + Sync {
    /// Records dated within `[start, end]`, newest first.
    async fn catch_records(&self, start: NaiveDate, end: NaiveDate) -> StoreResult<Vec<CatchRecord>>;
}

/// Composite identity of a migration event.
///
/// Coordinates are keyed as integer micro-degrees to avoid float map keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MigrationEventKey {
    pub species: String,
    pub date: NaiveDate,
    pub event_type: MigrationEventType,
    pub latitude_e6: i64,
    pub longitude_e6: i64,
}

impl MigrationEventKey {
    pub fn of(event: &MigrationEvent) -> Self {
        Self {
            species: event.species.to_ascii_uppercase(),
            date: event.date,
            event_type: event.event_type,
            latitude_e6: coordinate_key(event.location.latitude),
            longitude_e6: coordinate_key(event.location.longitude),
        }
    }
}

#[inline]
fn coordinate_key(degrees: f64) -> i64 {
    (degrees * 1_000_000.0).round() as i64
}

#[derive(Debug, Default, Clone)]
struct StoreData {
    lunar_phases: BTreeMap<NaiveDate, LunarPhase>,
    migration_events: BTreeMap<MigrationEventKey, MigrationEvent>,
    catch_records: Vec<CatchRecord>,
}

impl StoreData {
    fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let mut data = Self {
            catch_records: snapshot.catch_records,
            ..Self::default()
        };
        for phase in snapshot.lunar_phases {
            data.lunar_phases.insert(phase.date, phase);
        }
        for event in snapshot.migration_events {
            data.migration_events.insert(MigrationEventKey::of(&event), event);
        }
        data
    }

    fn to_snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            lunar_phases: self.lunar_phases.values().cloned().collect(),
            migration_events: self.migration_events.values().cloned().collect(),
            catch_records: self.catch_records.clone(),
        }
    }

    fn upsert_events(&mut self, events: &[MigrationEvent]) -> usize {
        for event in events {
            self.migration_events.insert(MigrationEventKey::of(event), event.clone());
        }
        events.len()
    }

    fn events_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<MigrationEvent> {
        self.migration_events
            .values()
            .filter(|e| e.date >= start && e.date <= end)
            .cloned()
            .collect()
    }

    fn catches_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<CatchRecord> {
        let mut records: Vec<CatchRecord> = self
            .catch_records
            .iter()
            .filter(|r| r.date >= start && r.date <= end)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.date.cmp(&a.date));
        records
    }
}

/// On-disk document layout for [`JsonFileStore`].
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    #[serde(default)]
    pub lunar_phases: Vec<LunarPhase>,
    #[serde(default)]
    pub migration_events: Vec<MigrationEvent>,
    #[serde(default)]
    pub catch_records: Vec<CatchRecord>,
}

/// In-memory store.
///
/// # Example
/// ```
/// use fishing_conditions_lib::store::{LunarPhaseStore, MemoryStore};
/// use fishing_conditions_lib::lunar::LunarPhaseCalculator;
/// use chrono::NaiveDate;
///
/// # tokio_test_runtime(async {
/// let store = MemoryStore::new();
/// let date = NaiveDate::from_ymd_opt(2024, 1, 11).unwrap();
/// store.upsert_lunar_phase(&LunarPhaseCalculator::new().calculate(date)).await.unwrap();
/// assert!(store.get_lunar_phase(date).await.unwrap().is_some());
/// # });
/// # fn tokio_test_runtime<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<StoreData>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catch_records(records: Vec<CatchRecord>) -> Self {
        let store = Self::new();
        if let Ok(mut data) = store.data.write() {
            data.catch_records = records;
        }
        store
    }

    pub fn add_catch_record(&self, record: CatchRecord) -> StoreResult<()> {
        self.write()?.catch_records.push(record);
        Ok(())
    }

    pub fn lunar_phase_count(&self) -> StoreResult<usize> {
        Ok(self.read()?.lunar_phases.len())
    }

    pub fn migration_event_count(&self) -> StoreResult<usize> {
        Ok(self.read()?.migration_events.len())
    }

    fn read(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, StoreData>> {
        self.data
            .read()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, StoreData>> {
        self.data
            .write()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl LunarPhaseStore for MemoryStore {
    async fn get_lunar_phase(&self, date: NaiveDate) -> StoreResult<Option<LunarPhase>> {
        Ok(self.read()?.lunar_phases.get(&date).cloned())
    }

    async fn upsert_lunar_phase(&self, phase: &LunarPhase) -> StoreResult<()> {
        self.write()?.lunar_phases.insert(phase.date, phase.clone());
        Ok(())
    }
}

#[async_trait]
impl MigrationEventStore for MemoryStore {
    async fn upsert_migration_events(&self, events: &[MigrationEvent]) -> StoreResult<usize> {
        Ok(self.write()?.upsert_events(events))
    }

    async fn migration_events(&self, start: NaiveDate, end: NaiveDate) -> StoreResult<Vec<MigrationEvent>> {
        Ok(self.read()?.events_between(start, end))
    }
}

#[async_trait]
impl CatchRecordStore for MemoryStore {
    async fn catch_records(&self, start: NaiveDate, end: NaiveDate) -> StoreResult<Vec<CatchRecord>> {
        Ok(self.read()?.catches_between(start, end))
    }
}

/// Store persisted to a single JSON file.
///
/// Catch records are whatever the file contains; this store never writes them.
/// Writes only reach memory once the file has been replaced, so a failed write
/// leaves both unchanged.
pub struct JsonFileStore {
    path: PathBuf,
    data: Mutex<StoreData>,
}

impl JsonFileStore {
    /// Open `path`, starting empty when the file does not exist yet.
    pub async fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let snapshot = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<StoreSnapshot>(&bytes)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "store file not found, starting empty");
                StoreSnapshot::default()
            }
            Err(e) => return Err(e.into()),
        };
        debug!(
            path = %path.display(),
            lunar_phases = snapshot.lunar_phases.len(),
            migration_events = snapshot.migration_events.len(),
            catch_records = snapshot.catch_records.len(),
            "store loaded"
        );
        Ok(Self {
            path,
            data: Mutex::new(StoreData::from_snapshot(snapshot)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, data: &StoreData) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(&data.to_snapshot())?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl LunarPhaseStore for JsonFileStore {
    async fn get_lunar_phase(&self, date: NaiveDate) -> StoreResult<Option<LunarPhase>> {
        Ok(self.data.lock().await.lunar_phases.get(&date).cloned())
    }

    async fn upsert_lunar_phase(&self, phase: &LunarPhase) -> StoreResult<()> {
        let mut data = self.data.lock().await;
        let mut next = data.clone();
        next.lunar_phases.insert(phase.date, phase.clone());
        self.persist(&next).await?;
        *data = next;
        Ok(())
    }
}

#[async_trait]
impl MigrationEventStore for JsonFileStore {
    async fn upsert_migration_events(&self, events: &[MigrationEvent]) -> StoreResult<usize> {
        let mut data = self.data.lock().await;
        let mut next = data.clone();
        let written = next.upsert_events(events);
        self.persist(&next).await?;
        *data = next;
        Ok(written)
    }

    async fn migration_events(&self, start: NaiveDate, end: NaiveDate) -> StoreResult<Vec<MigrationEvent>> {
        Ok(self.data.lock().await.events_between(start, end))
    }
}

#[async_trait]
impl CatchRecordStore for JsonFileStore {
    async fn catch_records(&self, start: NaiveDate, end: NaiveDate) -> StoreResult<Vec<CatchRecord>> {
        Ok(self.data.lock().await.catches_between(start, end))
    }
}

/// Compute-if-absent cache of [`LunarPhase`] records over a store.
pub struct LunarPhaseCache<S: ?Sized> {
    store: Arc<S>,
    calculator: LunarPhaseCalculator,
}

impl<S: ?Sized> Clone for LunarPhaseCache<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            calculator: self.calculator,
        }
    }
}

impl<S: LunarPhaseStore + ?Sized> LunarPhaseCache<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            calculator: LunarPhaseCalculator::new(),
        }
    }

    pub fn calculator(&self) -> &LunarPhaseCalculator {
        &self.calculator
    }

    /// Stored record for `date`, computing and persisting it on a miss.
    pub async fn get_or_compute(&self, date: NaiveDate) -> StoreResult<LunarPhase> {
        if let Some(phase) = self.store.get_lunar_phase(date).await? {
            return Ok(phase);
        }
        debug!(%date, "lunar phase cache miss");
        self.recalculate(date).await
    }

    /// Compute and overwrite the stored record for `date`.
    pub async fn recalculate(&self, date: NaiveDate) -> StoreResult<LunarPhase> {
        let phase = self.calculator.calculate(date);
        self.store.upsert_lunar_phase(&phase).await?;
        debug!(%date, phase = ?phase.phase_type, "lunar phase persisted");
        Ok(phase)
    }
}
