use epirun_params::{GeneratorOptions, ParamMap, ParameterGenerator, SweepError};
use serde_json::{json, Value};

fn map(value: Value) -> ParamMap {
    value.as_object().cloned().expect("object")
}

#[test]
fn dependent_parameter_resolves_per_run() {
    let spec = map(json!({"a": [0.8, 0.9], "b": "1 - 2 * ( 1 - @a )"}));
    let generator = ParameterGenerator::from_grid(&spec, &GeneratorOptions::default()).expect("grid");
    let b0 = generator[0]["b"].as_f64().expect("b");
    let b1 = generator[1]["b"].as_f64().expect("b");
    assert!((b0 - 0.6).abs() < 1e-12);
    assert!((b1 - 0.8).abs() < 1e-12);
}

#[test]
fn nested_references_use_flattened_paths() {
    let spec = map(json!({
        "infection": {"seed_strength": [1.0, 2.0]},
        "policies": {"quarantine": {"compliance": "@infection__seed_strength / 4"}}
    }));
    let generator = ParameterGenerator::from_grid(&spec, &GeneratorOptions::default()).expect("grid");
    assert_eq!(generator[1]["policies"]["quarantine"]["compliance"], json!(0.5));
}

#[test]
fn cycles_are_reported_with_their_paths() {
    let list = vec![map(json!({"a": "@b + 1", "b": "@a * 2", "c": 1}))];
    let err = ParameterGenerator::new(list, &GeneratorOptions::default()).unwrap_err();
    match err {
        SweepError::CircularReference(info) => {
            assert_eq!(info.context["paths"], "a, b");
        }
        other => panic!("expected a cycle, got {other}"),
    }
}

#[test]
fn self_reference_is_a_cycle() {
    let list = vec![map(json!({"a": "@a + 1"}))];
    let err = ParameterGenerator::new(list, &GeneratorOptions::default()).unwrap_err();
    assert!(matches!(err, SweepError::CircularReference(_)));
}

#[test]
fn missing_reference_is_reported() {
    let list = vec![map(json!({"a": "@nowhere * 2"}))];
    let err = ParameterGenerator::new(list, &GeneratorOptions::default()).unwrap_err();
    assert!(err.is_missing_path());
    assert_eq!(err.info().context["reference"], "nowhere");
}

#[test]
fn unsupported_syntax_is_a_configuration_error() {
    let list = vec![map(json!({"a": 2, "b": "@a ** 2"}))];
    let err = ParameterGenerator::new(list, &GeneratorOptions::default()).unwrap_err();
    assert!(matches!(err, SweepError::Configuration(_)));
    assert_eq!(err.info().context["parameter"], "b");
}

#[test]
fn template_is_not_mutated() {
    let spec = map(json!({"a": [0.5], "b": "@a * 2"}));
    let before = spec.clone();
    let _ = ParameterGenerator::from_grid(&spec, &GeneratorOptions::default()).expect("grid");
    assert_eq!(spec, before);
}

#[test]
fn inner_marker_in_literal_is_not_an_expression() {
    let list = vec![map(json!({"contact": "ops@example.org", "tag": "run@2x", "a": 1}))];
    let generator = ParameterGenerator::new(list, &GeneratorOptions::default()).expect("literal strings");
    assert_eq!(generator[0]["contact"], json!("ops@example.org"));
    assert_eq!(generator[0]["tag"], json!("run@2x"));
}
