use epirun_params::{expand_lockdown, ParamMap};
use serde_json::{json, Value};

fn lockdown_params() -> ParamMap {
    json!({
        "policies": {
            "close_schools": {"start_time": "2020-03-20"},
            "lockdown": {
                "soft_lockdown_date": "2020-03-16",
                "hard_lockdown_date": "2020-03-23",
                "lockdown_ratio": 0.5,
                "hard_lockdown_policy_parameters": {
                    "social_distancing": {"overall_beta_factor": 0.6},
                    "quarantine": {"overall_compliance": 0.3}
                }
            }
        }
    })
    .as_object()
    .cloned()
    .expect("object")
}

fn approx(value: &Value, expected: f64) -> bool {
    (value.as_f64().expect("number") - expected).abs() < 1e-12
}

#[test]
fn lockdown_expands_into_two_stages() {
    let mut params = lockdown_params();
    assert!(expand_lockdown(&mut params).expect("expand"));
    let policies = params["policies"].as_object().expect("policies");
    let names: Vec<_> = policies.keys().cloned().collect();
    assert_eq!(names, vec!["close_schools", "social_distancing", "quarantine"]);

    let distancing = &policies["social_distancing"];
    assert_eq!(distancing["1"]["start_time"], json!("2020-03-16"));
    assert_eq!(distancing["2"]["start_time"], json!("2020-03-23"));
    assert!(approx(&distancing["1"]["beta_factors"]["pub"], 0.8));
    assert!(approx(&distancing["2"]["beta_factors"]["pub"], 0.6));
    assert!(approx(&distancing["1"]["beta_factors"]["household"], 1.0));
    assert!(approx(&distancing["2"]["beta_factors"]["household"], 1.0));
    assert_eq!(distancing["1"]["beta_factors"].as_object().expect("betas").len(), 11);

    let quarantine = &policies["quarantine"];
    assert!(approx(&quarantine["1"]["compliance"], 0.15));
    assert!(approx(&quarantine["1"]["household_compliance"], 0.15));
    assert!(approx(&quarantine["2"]["compliance"], 0.3));
}

#[test]
fn rows_without_lockdown_are_untouched() {
    let mut params = json!({"policies": {"quarantine": {"start_time": "2020-03-01"}}})
        .as_object()
        .cloned()
        .expect("object");
    let before = params.clone();
    assert!(!expand_lockdown(&mut params).expect("expand"));
    assert_eq!(params, before);
}

#[test]
fn incomplete_lockdown_is_rejected() {
    let mut params = lockdown_params();
    params["policies"]["lockdown"]
        .as_object_mut()
        .expect("lockdown")
        .remove("lockdown_ratio");
    let err = expand_lockdown(&mut params).unwrap_err();
    assert_eq!(err.info().code, "lockdown-missing-field");
}
