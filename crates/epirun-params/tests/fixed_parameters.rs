use epirun_params::{GeneratorOptions, OnConflict, ParamMap, ParameterGenerator};
use serde_json::{json, Value};

fn map(value: Value) -> ParamMap {
    value.as_object().cloned().expect("object")
}

fn sweep_with(on_conflict: OnConflict) -> ParameterGenerator {
    let spec = map(json!({"interaction": {"betas": {"pub": [0.1, 0.2]}}}));
    let fixed = map(json!({
        "interaction": {"betas": {"pub": 0.9, "school": 0.4}},
        "seed_strength": 0.7
    }));
    let options = GeneratorOptions::default().with_fixed(fixed, on_conflict);
    ParameterGenerator::from_grid(&spec, &options).expect("grid")
}

#[test]
fn prefer_explicit_keeps_swept_values() {
    let generator = sweep_with(OnConflict::PreferExplicit);
    assert_eq!(generator[0]["interaction"]["betas"]["pub"], json!(0.1));
    assert_eq!(generator[1]["interaction"]["betas"]["pub"], json!(0.2));
    assert_eq!(generator[1]["interaction"]["betas"]["school"], json!(0.4));
    assert_eq!(generator[1]["seed_strength"], json!(0.7));
}

#[test]
fn prefer_fixed_overwrites_swept_values() {
    let generator = sweep_with(OnConflict::PreferFixed);
    assert!(generator
        .iter()
        .all(|p| p["interaction"]["betas"]["pub"] == json!(0.9)));
    assert_eq!(generator[0]["interaction"]["betas"]["school"], json!(0.4));
}

#[test]
fn default_policy_is_prefer_explicit() {
    assert_eq!(OnConflict::default(), OnConflict::PreferExplicit);
    let parsed: OnConflict = serde_json::from_value(json!("prefer_fixed")).expect("policy");
    assert_eq!(parsed, OnConflict::PreferFixed);
}

#[test]
fn fixed_values_feed_expressions() {
    let spec = map(json!({"a": [1.0, 2.0], "b": "@a + @offset"}));
    let options = GeneratorOptions::default().with_fixed(map(json!({"offset": 10})), OnConflict::PreferExplicit);
    let generator = ParameterGenerator::from_grid(&spec, &options).expect("grid");
    assert_eq!(generator[1]["b"], json!(12.0));
}

#[test]
fn list_valued_fixed_parameters_are_rejected() {
    let spec = map(json!({"a": [1, 2]}));
    let options = GeneratorOptions::default()
        .with_fixed(map(json!({"group": {"b": [5, 6]}})), OnConflict::PreferExplicit);
    let err = ParameterGenerator::from_grid(&spec, &options).expect_err("list leaf");
    assert_eq!(err.info().code, "fixed-not-scalar");
    assert_eq!(err.info().context["parameter"], "group.b");
}
