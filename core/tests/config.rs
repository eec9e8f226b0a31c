use credit_audit_core::config::{AuditConfig, DEFAULT_SUSPICIOUS_LOCALITY_LIMIT};

fn write_config(name: &str, body: &str) -> String {
    let path = std::env::temp_dir().join(format!("credit_audit_{}_{name}", std::process::id()));
    std::fs::write(&path, body).unwrap();
    path.display().to_string()
}

#[test]
fn load_fills_optional_fields_with_defaults() {
    let path = write_config(
        "config_ok.json",
        r#"{
            "database_path": "banco.db",
            "predictions_path": "data.json",
            "consolidated_path": "out.json",
            "scoring_url": "https://scoring.example/predict_batch"
        }"#,
    );

    let config = AuditConfig::load(&path).unwrap();
    assert_eq!(config.database_path, "banco.db");
    assert_eq!(config.suspicious_locality_limit, DEFAULT_SUSPICIOUS_LOCALITY_LIMIT);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn load_rejects_non_http_scoring_url() {
    let path = write_config(
        "config_bad_url.json",
        r#"{
            "database_path": "banco.db",
            "predictions_path": "data.json",
            "consolidated_path": "out.json",
            "scoring_url": "ftp://scoring.example"
        }"#,
    );

    assert!(AuditConfig::load(&path).is_err());
    let _ = std::fs::remove_file(&path);
}

#[test]
fn load_reports_missing_file() {
    let err = AuditConfig::load("/nonexistent/audit.json").unwrap_err();
    assert!(err.to_string().contains("Cannot read"));
}

#[test]
fn test_defaults_are_valid() {
    let config = AuditConfig::default_test();
    config.validate().unwrap();
    assert_eq!(config.database_path, ":memory:");
}
