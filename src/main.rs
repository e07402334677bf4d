//! # Fishing Conditions Entry Point
//!
//! ```text
//! fishing-conditions <conditions|lunar|migrations> key=value... [--text] [--config=PATH]
//! ```
//!
//! Parameters use the query-string names (`date`, `startDate`, `endDate`, `latitude`,
//! `longitude`, `targetSpecies`, `species`, `includeHistorical`, `forceRecalculate`).
//! Responses are printed as JSON, or as a terminal view with `--text`.
//!
//! Failures print the `{error, details}` body to stderr. Exit status is 2 for
//! invalid parameters and 1 for internal failures.

#[cfg(test)]
mod tests;

use anyhow::{bail, Context};
use fishing_conditions_lib::config::{Config, DEFAULT_CONFIG_PATH};
use fishing_conditions_lib::error::ConditionsError;
use fishing_conditions_lib::query::QueryParams;
use fishing_conditions_lib::renderer::{render_ascii, render_lunar_calendar, render_migrations};
use fishing_conditions_lib::service::FishingService;
use fishing_conditions_lib::store::JsonFileStore;
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Conditions,
    Lunar,
    Migrations,
}

#[derive(Debug)]
struct Invocation {
    command: Command,
    params: QueryParams,
    text: bool,
    config_path: String,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> anyhow::Result<Invocation> {
    let mut command = None;
    let mut params = QueryParams::new();
    let mut text = false;
    let mut config_path = DEFAULT_CONFIG_PATH.to_string();

    for arg in args {
        if arg == "--text" {
            text = true;
        } else if let Some(path) = arg.strip_prefix("--config=") {
            config_path = path.to_string();
        } else if let Some((key, value)) = arg.split_once('=') {
            params.insert(key, value);
        } else if command.is_none() {
            command = Some(match arg.as_str() {
                "conditions" => Command::Conditions,
                "lunar" => Command::Lunar,
                "migrations" => Command::Migrations,
                other => bail!("unknown command '{other}' (expected conditions, lunar or migrations)"),
            });
        } else {
            bail!("unexpected argument '{arg}'");
        }
    }

    Ok(Invocation {
        command: command.context("missing command (conditions, lunar or migrations)")?,
        params,
        text,
        config_path,
    })
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // Logs go to stderr so stdout stays parseable JSON.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run(invocation: &Invocation, config: &Config) -> anyhow::Result<Result<String, ConditionsError>> {
    let store = JsonFileStore::open(&config.storage.path)
        .await
        .with_context(|| format!("opening store {}", config.storage.path))?;
    let service = FishingService::new(Arc::new(store), config);
    let params = &invocation.params;

    let output = match invocation.command {
        Command::Conditions => service.fishing_conditions(params).await.and_then(|r| {
            Ok(if invocation.text { render_ascii(&r) } else { to_json(&r)? })
        }),
        Command::Lunar => service.lunar_calendar(params).await.and_then(|r| {
            Ok(if invocation.text { render_lunar_calendar(&r) } else { to_json(&r)? })
        }),
        Command::Migrations => service.migration_events(params).await.and_then(|r| {
            Ok(if invocation.text { render_migrations(&r) } else { to_json(&r)? })
        }),
    };
    Ok(output)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, ConditionsError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ConditionsError::Store(fishing_conditions_lib::store::StoreError::Json(e)))
}

/// Print the failure envelope and return the exit status for it.
fn report_failure(err: &ConditionsError) -> u8 {
    if err.is_client_error() {
        info!("rejected request: {err}");
    } else {
        error!("request failed: {err}");
    }
    let body = serde_json::to_string_pretty(&err.to_response()).unwrap_or_default();
    eprintln!("{body}");
    if err.is_client_error() {
        2
    } else {
        1
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let invocation = parse_args(env::args().skip(1))?;
    let config = Config::load_from_path(&invocation.config_path);
    init_logging(&config.logging.level);
    info!(
        config = %invocation.config_path,
        location = %config.location.name,
        store = %config.storage.path,
        "configuration in effect"
    );

    let rt = tokio::runtime::Runtime::new()?;
    match rt.block_on(run(&invocation, &config))? {
        Ok(output) => {
            println!("{}", output.trim_end());
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => Ok(ExitCode::from(report_failure(&err))),
    }
}
