use super::AppConfig;
use clap::Parser;
use std::time::Duration;

fn parse(args: &[&str]) -> AppConfig {
    let mut argv = vec!["mirrortalk"];
    argv.extend_from_slice(args);
    AppConfig::parse_from(argv)
}

#[test]
fn defaults_are_valid() {
    let config = parse(&[]);
    config.validate().expect("defaults should validate");
    assert_eq!(config.endpoint_threshold, 5);
    assert_eq!(config.endpoint_silence_ms, 2_000);
    assert_eq!(config.directive_retry_ms, 500);
}

#[test]
fn zero_silence_tail_is_rejected() {
    let config = parse(&["--endpoint-silence-ms", "0"]);
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("--endpoint-silence-ms"));
}

#[test]
fn oversized_threshold_is_rejected() {
    let config = parse(&["--endpoint-threshold", "40000"]);
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("--endpoint-threshold"));
}

#[test]
fn directive_retry_bounds_are_enforced() {
    for value in ["10", "60000"] {
        let config = parse(&["--directive-retry-ms", value]);
        let err = config.validate().unwrap_err();
        assert!(
            err.to_string().contains("--directive-retry-ms"),
            "value {value} should be out of range"
        );
    }
}

#[test]
fn session_config_mirrors_cli_values() {
    let config = parse(&[
        "--endpoint-threshold",
        "9",
        "--endpoint-silence-ms",
        "750",
        "--directive-retry-ms",
        "200",
    ]);
    config.validate().expect("values should be in range");
    let session = config.session_config().expect("snapshot should build");
    assert_eq!(session.endpoint.threshold_level, 9);
    assert_eq!(session.endpoint.silence_duration, Duration::from_millis(750));
    assert_eq!(session.directive_retry, Duration::from_millis(200));
}
