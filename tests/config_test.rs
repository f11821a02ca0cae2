use sqlguard::config::AppConfig;
use sqlguard::error::GuardError;
use sqlguard::guard::{DEFAULT_PATTERNS, InspectedRequest, Verdict};

const MINIMAL_TOML: &str = r#"
[server]
listen = "127.0.0.1:9090"
"#;

const FULL_TOML: &str = r#"
[server]
listen = "0.0.0.0:8080"
upstream = "http://orders.internal:8000"
upstream_timeout_secs = 5

[guard]
timing_header = "X-Guard-Time"
patterns = [";\\s*drop\\s", "--"]
extra_patterns = ["union\\s+select"]
"#;

#[test]
fn parse_minimal_config() {
    let config: AppConfig = toml::from_str(MINIMAL_TOML).unwrap();
    assert_eq!(config.server.listen, "127.0.0.1:9090");
    assert_eq!(config.server.upstream, "http://127.0.0.1:8000");
    assert_eq!(config.server.upstream_timeout_secs, 30);
    assert_eq!(config.guard.timing_header, "X-Detection-Time-ms");
    assert_eq!(config.guard.active_patterns(), DEFAULT_PATTERNS);
}

#[test]
fn parse_empty_config_uses_defaults() {
    let config: AppConfig = toml::from_str("").unwrap();
    assert_eq!(config.server.listen, "127.0.0.1:8080");
    assert!(config.guard.patterns.is_none());
}

#[test]
fn parse_full_config() {
    let config: AppConfig = toml::from_str(FULL_TOML).unwrap();
    assert_eq!(config.server.upstream, "http://orders.internal:8000");
    assert_eq!(config.server.upstream_timeout_secs, 5);
    assert_eq!(
        config.guard.active_patterns(),
        vec![r";\s*drop\s", "--", r"union\s+select"]
    );

    let interceptor = config.guard.build_interceptor().unwrap();
    assert_eq!(interceptor.registry().len(), 3);
    assert_eq!(interceptor.timing_header().as_str(), "x-guard-time");
}

#[test]
fn configured_registry_drives_verdicts() {
    let config: AppConfig = toml::from_str(FULL_TOML).unwrap();
    let interceptor = config.guard.build_interceptor().unwrap();

    let request = InspectedRequest::new("/api").with_body(b"1 union select pass");
    match interceptor.evaluate(&request, std::time::Instant::now()) {
        Verdict::Block(rejection) => assert_eq!(rejection.scan().matched_rule, Some(2)),
        Verdict::Forward(_) => panic!("expected block"),
    }

    // DELETE is a default rule but the config replaced the defaults.
    let request = InspectedRequest::new("/api").with_body(b"1; delete from t");
    assert!(matches!(
        interceptor.evaluate(&request, std::time::Instant::now()),
        Verdict::Forward(_)
    ));
}

#[test]
fn invalid_pattern_in_config_is_fatal() {
    let toml = r#"
[guard]
extra_patterns = ["(unbalanced"]
"#;
    let config: AppConfig = toml::from_str(toml).unwrap();
    let err = config.guard.build_interceptor().unwrap_err();
    assert!(err.is_config_error());
    assert!(err.to_string().contains("(unbalanced"));
}

#[test]
fn empty_pattern_list_is_fatal() {
    let toml = r#"
[guard]
patterns = []
"#;
    let config: AppConfig = toml::from_str(toml).unwrap();
    let err = config.guard.build_registry().unwrap_err();
    assert!(matches!(err, GuardError::EmptyRegistry));
}

#[test]
fn invalid_toml_returns_error() {
    let bad_toml = "this is not valid toml [[[";
    let result = toml::from_str::<AppConfig>(bad_toml);
    assert!(result.is_err());
}

#[test]
fn config_load_from_file() {
    use std::io::Write;
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("sqlguard.toml");
    let mut file = std::fs::File::create(&config_path).unwrap();
    write!(file, "{}", MINIMAL_TOML).unwrap();

    let config = AppConfig::load_from_path(&config_path).unwrap();
    assert_eq!(config.server.listen, "127.0.0.1:9090");
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("absent.toml");

    assert!(matches!(
        AppConfig::load_from_path(&config_path),
        Err(GuardError::Io(_))
    ));
    let config = AppConfig::load_or_default(&config_path).unwrap();
    assert_eq!(config.server.listen, "127.0.0.1:8080");
}

#[test]
fn default_template_is_valid() {
    let template = include_str!("../templates/sqlguard.toml");
    let config: AppConfig = toml::from_str(template).unwrap();
    assert_eq!(config.guard.active_patterns(), DEFAULT_PATTERNS);
    assert!(config.guard.build_interceptor().is_ok());
}

#[test]
fn literal_dollar_pattern_loads_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("sqlguard.toml");
    std::fs::write(&config_path, "[guard]\nextra_patterns = [\"\\\\$IFS\"]\n").unwrap();

    let config = AppConfig::load_from_path(&config_path).unwrap();
    assert_eq!(config.guard.extra_patterns, vec![r"\$IFS"]);

    let interceptor = config.guard.build_interceptor().unwrap();
    let request = InspectedRequest::new("/run").with_query("cmd=cat$IFS/etc/passwd");
    assert!(matches!(
        interceptor.evaluate(&request, std::time::Instant::now()),
        Verdict::Block(_)
    ));
}
