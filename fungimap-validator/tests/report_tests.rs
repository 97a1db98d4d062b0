//! End-to-end: configuration file → batch validation → CSV report
//!
//! Tests that set FUNGIMAP_STORAGE_ROOT are marked #[serial].

mod helpers;

use fungimap_common::config::STORAGE_ROOT_ENV_VAR;
use fungimap_common::{ValidationEventBus, ValidatorConfig};
use fungimap_validator::services::report_generator::ReportRow;
use fungimap_validator::services::ResourceEstimator;
use fungimap_validator::{ValidationOrchestrator, ValidationReport};
use helpers::fixtures::{classification_report, complete_metadata};
use helpers::TestStorage;
use serial_test::serial;
use std::env;

fn write_config_file(storage: &TestStorage, local_path: &std::path::Path) -> std::path::PathBuf {
    let mut config = storage.config(2, 2);
    config.storage.local_path = local_path.to_path_buf();
    let path = storage.root().join("fungimap.json");
    std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
    path
}

#[tokio::test]
#[serial]
async fn test_report_written_for_every_accession() {
    env::remove_var(STORAGE_ROOT_ENV_VAR);
    let storage = TestStorage::new();
    storage.write_complete_metadata("SRR3");
    storage.write_complete_metadata("SRR1");
    storage.write_metadata("SRR2", &serde_json::json!({ "host": "Picea abies" }));
    storage.write_classification_report("SRR1", &classification_report(400, 100, 8));

    let config = ValidatorConfig::load(&write_config_file(&storage, storage.root())).unwrap();
    let orchestrator =
        ValidationOrchestrator::from_config(&config, ValidationEventBus::default()).unwrap();
    let input: Vec<String> = ["SRR3", "SRR2", "SRR1", "MISSING"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let outcome = orchestrator.validate_batch(&input).await.unwrap();

    let report = ValidationReport::from_results(&outcome.results);
    assert_eq!(report.summary.total, 4);
    assert_eq!(report.summary.passed, 2);
    assert_eq!(report.summary.failed, 2);
    assert_eq!(report.summary.pass_rate, 50.0);

    let output = storage.root().join("reports").join("validation.csv");
    report.write_to_path(&output).unwrap();

    let mut reader = csv::Reader::from_path(&output).unwrap();
    assert_eq!(
        reader.headers().unwrap().iter().collect::<Vec<_>>(),
        vec![
            "Accession",
            "Status",
            "metadata_completeness",
            "fungal_signal",
            "read_pairs",
            "host_contamination",
            "warnings_count"
        ]
    );
    let rows: Vec<ReportRow> = reader.deserialize().map(|r| r.unwrap()).collect();
    let order: Vec<&str> = rows.iter().map(|r| r.accession.as_str()).collect();
    assert_eq!(order, vec!["MISSING", "SRR1", "SRR2", "SRR3"]);

    assert_eq!(rows[0].status, "FAIL");
    assert_eq!(rows[0].warnings_count, 1);
    assert_eq!(rows[1].status, "PASS");
    assert_eq!(rows[1].fungal_signal, 25.0);
    assert_eq!(rows[1].host_contamination, 2.0);
    assert_eq!(rows[2].metadata_completeness, 30.0);
    assert_eq!(rows[3].warnings_count, 0);
}

#[tokio::test]
#[serial]
async fn test_storage_root_env_override_used_by_run() {
    let storage = TestStorage::new();
    let override_root = storage.root().join("override");
    let config_path = write_config_file(&storage, &storage.root().join("unused"));

    env::set_var(STORAGE_ROOT_ENV_VAR, &override_root);
    let config = ValidatorConfig::load(&config_path);
    env::remove_var(STORAGE_ROOT_ENV_VAR);
    let config = config.unwrap();

    let orchestrator =
        ValidationOrchestrator::from_config(&config, ValidationEventBus::default()).unwrap();
    assert!(override_root.is_dir());
    assert!(!storage.root().join("unused").exists());

    std::fs::create_dir_all(override_root.join("SRR9")).unwrap();
    std::fs::write(
        override_root.join("SRR9").join("metadata.json"),
        serde_json::to_string(&complete_metadata()).unwrap(),
    )
    .unwrap();

    let outcome = orchestrator
        .validate_batch(&["SRR9".to_string()])
        .await
        .unwrap();
    assert!(outcome.results["SRR9"].passes_all);
}

#[tokio::test]
async fn test_resource_estimates_for_batch() {
    let storage = TestStorage::new();
    // 0.5 GiB of raw reads
    storage.write_raw_reads("SRR1", 512 * 1024 * 1024);

    let estimator = ResourceEstimator::new(storage.layout());
    let estimates = estimator
        .estimate_all(&["SRR1".to_string(), "SRR2".to_string()])
        .await;

    assert_eq!(estimates[0].estimate.memory_gb, 1.5);
    assert_eq!(estimates[0].estimate.disk_gb, 2.5);
    assert_eq!(estimates[0].estimate.cpu_hours, 0.25);
    assert!(estimates[1].estimate.is_zero());
    assert!(estimates[1].warning.is_some());

    let total = ResourceEstimator::total(&estimates);
    assert_eq!(total.memory_gb, 1.5);
}
