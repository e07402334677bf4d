use crate::{parse_args, run};
use chrono::NaiveDate;
use fishing_conditions_lib::config::Config;
use fishing_conditions_lib::store::StoreSnapshot;
use fishing_conditions_lib::{Catch, CatchRecord};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn config_for(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.storage.path = dir.path().join("store.json").display().to_string();
    config
}

async fn run_args(list: &[&str], config: &Config) -> Result<String, u16> {
    let invocation = parse_args(list.iter().map(|s| s.to_string())).unwrap();
    run(&invocation, config).await.unwrap().map_err(|e| e.status_code())
}

fn snapshot(path: &str) -> StoreSnapshot {
    serde_json::from_slice(&fs::read(Path::new(path)).unwrap()).unwrap()
}

fn trip(y: i32, m: u32, d: u32, weight: f64) -> CatchRecord {
    CatchRecord {
        date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
        latitude: 60.40,
        longitude: 5.30,
        angler: "Kari".to_string(),
        lunar_phase: None,
        total_weight: weight,
        success: weight > 0.0,
        catches: vec![Catch {
            species: "COD".to_string(),
            weight_kg: weight,
            count: 1,
        }],
    }
}

#[tokio::test]
async fn conditions_json_persists_lunar_phases() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir);
    let out = run_args(
        &[
            "conditions",
            "startDate=2024-01-11",
            "endDate=2024-01-17",
            "latitude=60.39",
            "longitude=5.32",
            "targetSpecies=cod,herring",
        ],
        &config,
    )
    .await
    .unwrap();

    let json: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(json["period"]["days"], 7);
    assert_eq!(json["conditions"].as_array().unwrap().len(), 7);
    assert_eq!(json["conditions"][0]["date"], "2024-01-11");
    assert_eq!(json["conditions"][0]["lunarPhase"]["phaseType"], "NEW_MOON");
    assert!(json["conditions"][0]["tidalInfluence"]["type"].is_string());
    assert_eq!(snapshot(&config.storage.path).lunar_phases.len(), 7);
}

#[tokio::test]
async fn oversized_request_leaves_store_untouched() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir);
    let status = run_args(
        &["conditions", "startDate=2024-01-01", "endDate=2024-01-31", "latitude=60", "longitude=5"],
        &config,
    )
    .await
    .unwrap_err();
    assert_eq!(status, 400);
    assert!(!Path::new(&config.storage.path).exists());
}

#[tokio::test]
async fn historical_summary_from_store_file() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir);
    let seeded = StoreSnapshot {
        catch_records: vec![trip(2023, 6, 10, 4.0), trip(2022, 6, 12, 9.5), trip(2021, 6, 20, 2.0)],
        ..StoreSnapshot::default()
    };
    fs::write(&config.storage.path, serde_json::to_vec(&seeded).unwrap()).unwrap();

    let out = run_args(
        &[
            "conditions",
            "date=2024-06-14",
            "latitude=60.39",
            "longitude=5.32",
            "targetSpecies=COD",
            "includeHistorical=true",
        ],
        &config,
    )
    .await
    .unwrap();

    let json: Value = serde_json::from_str(&out).unwrap();
    let history = &json["conditions"][0]["historicalData"];
    assert_eq!(history["totalRecords"], 3);
    assert_eq!(history["bestDay"]["date"], "2022-06-12");
    assert!(history["lunarPhaseCorrelation"].is_null());

    // Catch records survive the rewrite triggered by lunar phase caching.
    assert_eq!(snapshot(&config.storage.path).catch_records.len(), 3);
}

#[tokio::test]
async fn migrations_upserted_across_runs() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir);
    let args = [
        "migrations",
        "startDate=2024-01-01",
        "endDate=2024-06-28",
        "latitude=60.39",
        "longitude=5.32",
    ];
    let first: Value = serde_json::from_str(&run_args(&args, &config).await.unwrap()).unwrap();
    run_args(&args, &config).await.unwrap();

    let events = first["events"].as_array().unwrap();
    assert!(!events.is_empty());
    assert_eq!(first["metadata"]["persisted"], events.len());
    assert_eq!(snapshot(&config.storage.path).migration_events.len(), events.len());
}

#[tokio::test]
async fn unknown_migration_species_is_rejected() {
    let dir = TempDir::new().unwrap();
    let status = run_args(
        &["migrations", "date=2024-06-01", "latitude=60", "longitude=5", "species=COD,YETI"],
        &config_for(&dir),
    )
    .await
    .unwrap_err();
    assert_eq!(status, 400);
}

#[tokio::test]
async fn lunar_text_output_lists_each_day() {
    let dir = TempDir::new().unwrap();
    let out = run_args(
        &["lunar", "startDate=2024-01-24", "endDate=2024-01-27", "--text"],
        &config_for(&dir),
    )
    .await
    .unwrap();
    assert_eq!(out.lines().count(), 4);
    assert!(out.contains("Full Moon"));
}
