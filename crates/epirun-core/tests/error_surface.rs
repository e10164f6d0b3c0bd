use epirun_core::errors::{ErrorInfo, SweepError};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("path", "policies.lockdown")
        .with_context("reason", "example")
}

#[test]
fn configuration_error_surface() {
    let err = SweepError::Configuration(sample_info("run-selection", "malformed selection"));
    assert_eq!(err.info().code, "run-selection");
    assert!(err.info().context.contains_key("path"));
    assert!(err.to_string().starts_with("configuration error: malformed selection"));
}

#[test]
fn circular_reference_surface() {
    let err = SweepError::CircularReference(sample_info("expr-cycle", "a -> b -> a"));
    assert_eq!(err.info().code, "expr-cycle");
    assert!(!err.is_missing_path());
}

#[test]
fn missing_path_surface() {
    let err = SweepError::MissingPath(sample_info("path-missing", "no such key"));
    assert!(err.is_missing_path());
    assert_eq!(err.info().context.get("reason").map(String::as_str), Some("example"));
}

#[test]
fn display_includes_context_and_hint() {
    let err = SweepError::Io(
        ErrorInfo::new("write", "disk full")
            .with_context("path", "/tmp/run_000")
            .with_hint("free some space"),
    );
    let rendered = err.to_string();
    assert!(rendered.contains("path=/tmp/run_000"));
    assert!(rendered.contains("hint: free some space"));
}

#[test]
fn errors_serialize_with_family_tag() {
    let err = SweepError::configuration("bad", "bad input");
    let json = serde_json::to_value(&err).expect("serialize");
    assert_eq!(json["family"], "Configuration");
    assert_eq!(json["detail"]["code"], "bad");
    let restored: SweepError = serde_json::from_value(json).expect("deserialize");
    assert_eq!(restored, err);
}
