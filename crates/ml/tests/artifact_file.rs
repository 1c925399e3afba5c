use ml::{Activation, MlpPolicy, PolicyArtifact, PolicyError, PolicyRunner};
use std::path::PathBuf;

fn temp_file(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("ml-test-{}-{name}", std::process::id()))
}

#[test]
fn saved_network_loads_and_scores_identically() -> anyhow::Result<()> {
    let mut original = MlpPolicy::random(&[6, 16, 3], Activation::Tanh, 11)?;
    let path = temp_file("policy.json");
    std::fs::write(&path, serde_json::to_string(&original)?)?;

    let mut loaded = MlpPolicy::from_file(&path)?;
    std::fs::remove_file(&path)?;

    let x = [0.5, -0.1, 0.0, 1.0, 2.0, -3.0];
    assert_eq!(original.score(&x)?, loaded.score(&x)?);
    Ok(())
}

#[test]
fn handwritten_artifact_parses() -> anyhow::Result<()> {
    let json = r#"{
        "layers": [
            { "weights": [1.0, -1.0], "bias": [0.0], "in_dim": 2, "out_dim": 1, "activation": "relu" }
        ]
    }"#;
    let mut runner = PolicyRunner::new(Box::new(MlpPolicy::from_json_str(json)?));
    assert_eq!(runner.infer(&[3.0, 1.0])?, vec![2.0]);
    assert_eq!(runner.infer(&[1.0, 3.0])?, vec![0.0]);
    Ok(())
}

#[test]
fn missing_file_is_a_load_error() {
    let err = MlpPolicy::from_file(&temp_file("does-not-exist.json")).unwrap_err();
    assert!(matches!(err, PolicyError::Load(_)));
}

#[test]
fn malformed_json_is_a_parse_error() {
    let err = MlpPolicy::from_json_str("{ \"layers\": 3 }").unwrap_err();
    assert!(matches!(err, PolicyError::Parse(_)));
}
