use crate::{parse_args, report_failure, Command};
use fishing_conditions_lib::error::{ConditionsError, ValidationError};
use fishing_conditions_lib::store::StoreError;

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn parses_command_params_and_flags() {
    let invocation = parse_args(args(&[
        "conditions",
        "date=2024-01-11",
        "latitude=60.39",
        "longitude=5.32",
        "--text",
        "--config=/tmp/spot.toml",
    ]))
    .unwrap();

    assert_eq!(invocation.command, Command::Conditions);
    assert!(invocation.text);
    assert_eq!(invocation.config_path, "/tmp/spot.toml");
    assert_eq!(invocation.params.get("latitude"), Some("60.39"));
}

#[test]
fn splits_on_first_equals_only() {
    let invocation = parse_args(args(&["lunar", "locationName=a=b"])).unwrap();
    assert_eq!(invocation.command, Command::Lunar);
    assert_eq!(invocation.params.get("locationName"), Some("a=b"));
}

#[test]
fn defaults_to_json_and_default_config() {
    let invocation = parse_args(args(&["migrations"])).unwrap();
    assert_eq!(invocation.command, Command::Migrations);
    assert!(!invocation.text);
    assert_eq!(invocation.config_path, "fishing-config.toml");
}

#[test]
fn rejects_missing_or_unknown_command() {
    assert!(parse_args(args(&["date=2024-01-11"])).is_err());
    assert!(parse_args(args(&["forecast"])).is_err());
    assert!(parse_args(args(&["lunar", "extra"])).is_err());
}

#[test]
fn exit_status_follows_error_class() {
    let client = ConditionsError::from(ValidationError::single("latitude is required"));
    assert_eq!(report_failure(&client), 2);

    let internal = ConditionsError::from(StoreError::Backend("unavailable".to_string()));
    assert_eq!(report_failure(&internal), 1);
}
