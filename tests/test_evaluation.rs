//! Integration test: model evaluation against a recording tracking client

mod common;

use std::fs;
use std::path::{Path, PathBuf};

use common::{write_wine_csv, Call, RecordingClient};
use mlproject::components::{ModelEvaluation, ModelTrainer, REGISTERED_MODEL_NAME};
use mlproject::config::{ModelEvaluationConfig, ModelTrainerConfig};
use mlproject::tracking::{LocalTracker, RunStatus, TrackingClient};
use mlproject::training::{ElasticNetParams, RegressionMetrics};
use mlproject::utils::load_json;
use mlproject::PipelineError;

const DAGSHUB_URI: &str = "https://dagshub.com/someone/wine.mlflow";
const REGISTRY_URI: &str = "http://localhost:5000";

struct Fixture {
    _dir: tempfile::TempDir,
    root: PathBuf,
}

/// Train a model on a synthetic split and return the evaluation config
fn fixture() -> (Fixture, ModelEvaluationConfig) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    let train = write_wine_csv(&root.join("data/train.csv"), 45);
    let test = write_wine_csv(&root.join("data/test.csv"), 15);

    let trainer = ModelTrainerConfig {
        root_dir: root.join("model_trainer"),
        train_data_path: train,
        test_data_path: test.clone(),
        model_name: "model.json".to_string(),
        target_column: "quality".to_string(),
        params: ElasticNetParams { alpha: 0.2, l1_ratio: 0.1, ..Default::default() },
    };
    ModelTrainer::new(trainer.clone()).train().unwrap();

    let evaluation = ModelEvaluationConfig {
        root_dir: root.join("model_evaluation"),
        test_data_path: test,
        model_path: trainer.model_path(),
        all_params: serde_yaml::from_str("alpha: 0.2\nl1_ratio: 0.1\n").unwrap(),
        metric_file_name: root.join("model_evaluation/metrics.json"),
        target_column: "quality".to_string(),
        mlflow_uri: String::new(),
    };
    (Fixture { _dir: dir, root }, evaluation)
}

fn scratch_dir(root: &Path) -> PathBuf {
    root.join("model_evaluation/temp_saved_model")
}

#[tokio::test]
async fn test_registry_backend_logs_model_to_registry() {
    let (fx, config) = fixture();
    let client = RecordingClient::new(REGISTRY_URI);

    let run_id = ModelEvaluation::new(config.clone())
        .log_into_tracking(&client)
        .await
        .unwrap();
    assert_eq!(run_id, "run-1");

    let calls = client.calls();
    assert_eq!(calls.first(), Some(&Call::CreateRun("model_evaluation".to_string())));
    assert_eq!(calls.last(), Some(&Call::EndRun(RunStatus::Finished)));
    assert_eq!(client.end_runs(), vec![RunStatus::Finished]);

    let model_calls: Vec<&Call> = calls
        .iter()
        .filter(|c| matches!(c, Call::LogModel { .. } | Call::LogArtifacts { .. }))
        .collect();
    assert_eq!(model_calls.len(), 1);
    match model_calls[0] {
        Call::LogModel { artifact_path, registered_name, files } => {
            assert_eq!(artifact_path, "model");
            assert_eq!(registered_name, REGISTERED_MODEL_NAME);
            assert_eq!(files, &vec!["MLmodel".to_string(), "model.json".to_string()]);
        }
        other => panic!("expected a registry call, got {:?}", other),
    }

    assert!(calls.contains(&Call::LogParam("alpha".into(), "0.2".into())));
    assert!(calls.contains(&Call::LogParam("l1_ratio".into(), "0.1".into())));

    let metrics: RegressionMetrics = load_json(&config.metric_file_name).unwrap();
    for (name, value) in metrics.as_pairs() {
        let logged = calls.iter().find_map(|c| match c {
            Call::LogMetric(key, v) if key == name => Some(*v),
            _ => None,
        });
        assert!((logged.unwrap() - value).abs() < 1e-12, "metric {} not logged", name);
    }
    assert!(!scratch_dir(&fx.root).exists());
}

#[tokio::test]
async fn test_artifact_only_backend_uploads_artifacts() {
    let (fx, config) = fixture();
    let client = RecordingClient::new(DAGSHUB_URI);

    ModelEvaluation::new(config).log_into_tracking(&client).await.unwrap();

    let calls = client.calls();
    assert!(!calls.iter().any(|c| matches!(c, Call::LogModel { .. })));
    let uploads: Vec<&Call> = calls
        .iter()
        .filter(|c| matches!(c, Call::LogArtifacts { .. }))
        .collect();
    assert_eq!(
        uploads,
        vec![&Call::LogArtifacts {
            artifact_path: "model".to_string(),
            files: vec!["MLmodel".to_string(), "model.json".to_string()],
        }]
    );
    assert_eq!(client.end_runs(), vec![RunStatus::Finished]);
    assert!(!scratch_dir(&fx.root).exists());
}

#[tokio::test]
async fn test_failure_after_open_closes_run_failed_once() {
    let (fx, mut config) = fixture();
    // Test partition without the target column: fails inside the open run
    let bad_test = fx.root.join("data/no_target.csv");
    fs::write(&bad_test, "fixed acidity,alcohol,pH\n7.0,10.0,3.2\n").unwrap();
    config.test_data_path = bad_test;

    let client = RecordingClient::new(REGISTRY_URI);
    let result = ModelEvaluation::new(config.clone()).log_into_tracking(&client).await;

    assert!(matches!(result, Err(PipelineError::FeatureNotFound(ref c)) if c == "quality"));
    assert_eq!(client.end_runs(), vec![RunStatus::Failed]);
    assert!(matches!(client.calls().first(), Some(Call::CreateRun(_))));
    assert!(!client.calls().iter().any(|c| matches!(c, Call::LogMetric(..))));
    assert!(!config.metric_file_name.exists());
}

#[tokio::test]
async fn test_missing_model_fails_before_opening_a_run() {
    let (fx, mut config) = fixture();
    config.model_path = fx.root.join("model_trainer/absent.json");

    let client = RecordingClient::new(REGISTRY_URI);
    assert!(ModelEvaluation::new(config).log_into_tracking(&client).await.is_err());
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn test_local_tracker_records_finished_run_and_version() {
    let (fx, mut config) = fixture();
    let store = fx.root.join("mlruns");
    config.mlflow_uri = store.display().to_string();

    let run_id = ModelEvaluation::new(config.clone()).log_into_mlflow().await.unwrap();

    let tracker = LocalTracker::new(&store).unwrap();
    let runs = tracker.list_runs().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].run_id, run_id);
    assert_eq!(runs[0].status, RunStatus::Finished);
    assert_eq!(runs[0].params.get("alpha").map(String::as_str), Some("0.2"));
    assert!(runs[0].artifacts.contains(&"model/MLmodel".to_string()));

    let metrics: RegressionMetrics = load_json(&config.metric_file_name).unwrap();
    assert_eq!(runs[0].metrics.get("rmse"), Some(&metrics.rmse));

    let versions = tracker.model_versions(REGISTERED_MODEL_NAME).unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].run_id, run_id);
    assert_eq!(tracker.tracking_uri(), store.display().to_string());
}
