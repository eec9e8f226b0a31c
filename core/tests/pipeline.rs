//! End-to-end stages with in-memory SQLite, temp files and fake collaborators.

use credit_audit_core::{
    bias_analysis::BiasAnalyzer,
    error::{AuditError, AuditResult},
    pipeline::{run_analysis, run_consolidation, run_scoring},
    record::{ConsolidatedRecord, Prediction, SubjectRecord},
    report::{JsonRenderer, ReportRenderer, TextRenderer},
    scoring::{Scorer, ScoringFeatures},
    snapshot::JsonSnapshot,
    source::{DatasetStore, PredictionFile, PredictionSource, RecordSource},
    store::SubjectStore,
    types::Decision,
};
use std::cell::RefCell;
use std::path::PathBuf;

// ── Helpers ──────────────────────────────────────────────────────────────────

fn temp_path(name: &str) -> PathBuf {
    let _ = env_logger::builder().is_test(true).try_init();
    std::env::temp_dir().join(format!("credit_audit_{}_{name}", std::process::id()))
}

fn subject(id: i64, nationality: &str, locality: &str, age: i64, income: f64) -> SubjectRecord {
    SubjectRecord {
        subject_id: id,
        age,
        sex: if id % 2 == 0 { "F".into() } else { "M".into() },
        nationality: Some(nationality.into()),
        ethnicity: None,
        locality: locality.into(),
        monthly_income: income,
        total_debt: 100.0,
        credit_limit: 500.0,
        requested_amount: 2000.0,
        term_months: 12.0,
        annual_interest_rate: 20.0,
        years_employed: Some(2),
        contract_type: None,
        payment_behavior: None,
        product_type: Some("consumo".into()),
        origination_channel: Some("web".into()),
    }
}

fn prediction(id: i64, decision: Decision, score: f64) -> Prediction {
    Prediction {
        subject_id: id,
        risk_score: score,
        default_probability: 0.2,
        decision,
        message: String::new(),
    }
}

struct FakeRecords(Vec<SubjectRecord>);

impl RecordSource for FakeRecords {
    fn fetch_subjects(&self) -> AuditResult<Vec<SubjectRecord>> {
        Ok(self.0.clone())
    }
}

struct FakePredictions(Vec<Prediction>);

impl PredictionSource for FakePredictions {
    fn fetch_predictions(&self) -> AuditResult<Vec<Prediction>> {
        Ok(self.0.clone())
    }
}

struct FailingPredictions;

impl PredictionSource for FailingPredictions {
    fn fetch_predictions(&self) -> AuditResult<Vec<Prediction>> {
        Err(anyhow::anyhow!("prediction feed unavailable").into())
    }
}

#[derive(Default)]
struct MemoryDataset(RefCell<Vec<ConsolidatedRecord>>);

impl DatasetStore for MemoryDataset {
    fn write(&self, records: &[ConsolidatedRecord]) -> AuditResult<()> {
        *self.0.borrow_mut() = records.to_vec();
        Ok(())
    }

    fn read(&self) -> AuditResult<Vec<ConsolidatedRecord>> {
        Ok(self.0.borrow().clone())
    }
}

/// Answers every batch with one prediction per subject.
struct FakeScorer;

impl Scorer for FakeScorer {
    fn predict_batch(&self, batch: &[ScoringFeatures]) -> AuditResult<serde_json::Value> {
        let data: Vec<serde_json::Value> = batch
            .iter()
            .map(|f| {
                serde_json::json!({
                    "id_cliente": f.subject.subject_id,
                    "score_riesgo": 50.0,
                    "probabilidad_default": 0.5,
                    "decision_legacy": "RECHAZADO",
                    "mensaje": "ok"
                })
            })
            .collect();
        Ok(serde_json::json!({ "data": data }))
    }
}

struct DownScorer;

impl Scorer for DownScorer {
    fn predict_batch(&self, _batch: &[ScoringFeatures]) -> AuditResult<serde_json::Value> {
        Err(AuditError::ScoringRejected {
            status: 503,
            body: "maintenance".into(),
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn consolidation_writes_joined_dataset_and_reports_drops() {
    let records = FakeRecords(vec![
        subject(1, "CL", "Santiago", 30, 1000.0),
        subject(2, "PE", "Maipu", 45, 800.0),
    ]);
    let predictions = FakePredictions(vec![
        prediction(2, Decision::Rejected, 75.0),
        prediction(99, Decision::Approved, 10.0),
        prediction(1, Decision::Approved, 25.0),
    ]);
    let dataset = MemoryDataset::default();

    let outcome = run_consolidation(&records, &predictions, &dataset).unwrap();

    let written = dataset.read().unwrap();
    assert_eq!(written.len(), 2);
    assert_eq!(written[0].subject_id, 2);
    assert_eq!(written[1].subject_id, 1);
    assert_eq!(outcome.summary.total_records, 2);
    assert_eq!(outcome.summary.rejected, 1);
    assert_eq!(outcome.diagnostics.unmatched, 1);
}

#[test]
fn upstream_failure_aborts_without_writing() {
    let records = FakeRecords(vec![subject(1, "CL", "Santiago", 30, 1000.0)]);
    let dataset = MemoryDataset::default();
    dataset
        .write(&[])
        .expect("memory dataset write never fails");

    let result = run_consolidation(&records, &FailingPredictions, &dataset);

    assert!(result.is_err());
    assert!(dataset.read().unwrap().is_empty());
}

#[test]
fn snapshot_round_trips_with_stable_keys() {
    let path = temp_path("snapshot.json");
    let snapshot = JsonSnapshot::new(path.display().to_string());
    let subjects = credit_audit_core::consolidation::index_subjects(vec![subject(
        1, "CL", "Santiago", 30, 1000.0,
    )]);
    let records = credit_audit_core::consolidation::consolidate(
        &subjects,
        &[prediction(1, Decision::Rejected, 80.0)],
    );

    snapshot.write(&records).unwrap();
    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let first = &raw[0];
    for key in [
        "id_cliente",
        "comuna",
        "nacionalidad",
        "etnia",
        "sexo",
        "edad",
        "ingresos_mensuales",
        "deuda_total",
        "limite_tc",
        "monto_solicitado",
        "plazo_meses",
        "tasa_interes_anual",
        "anios_empleo",
        "tipo_contrato",
        "comportamiento_pago",
        "tipo_producto",
        "canal_origen",
        "score_riesgo",
        "probabilidad_default",
        "decision_legacy",
        "mensaje",
    ] {
        assert!(first.get(key).is_some(), "snapshot missing key {key}");
    }
    assert_eq!(first["decision_legacy"], "RECHAZADO");

    assert_eq!(snapshot.read().unwrap(), records);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn prediction_file_accepts_english_decision_labels() {
    let path = temp_path("predictions_en.json");
    std::fs::write(
        &path,
        r#"{"data": [
            {"id_cliente": 1, "score_riesgo": 80, "probabilidad_default": 0.7,
             "decision_legacy": "REJECTED", "mensaje": "high risk"},
            {"id_cliente": 2, "score_riesgo": 20.5, "probabilidad_default": 0.1,
             "decision_legacy": "APROBADO", "mensaje": "ok"}
        ]}"#,
    )
    .unwrap();

    let predictions = PredictionFile::new(path.display().to_string())
        .fetch_predictions()
        .unwrap();

    assert_eq!(predictions.len(), 2);
    assert_eq!(predictions[0].decision, Decision::Rejected);
    assert_eq!(predictions[0].risk_score, 80.0);
    assert_eq!(predictions[1].decision, Decision::Approved);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn missing_prediction_file_is_an_io_error() {
    let path = temp_path("does_not_exist.json");
    let err = PredictionFile::new(path.display().to_string())
        .fetch_predictions()
        .unwrap_err();
    assert!(matches!(err, AuditError::Io { .. }), "got {err:?}");
}

#[test]
fn scoring_then_consolidation_then_analysis() {
    let store = SubjectStore::in_memory().unwrap();
    store.migrate().unwrap();
    store
        .load_fixture(
            "INSERT INTO clientes VALUES
                (1, 1000.0, 24, 'F', 'CL', 'Santiago', NULL, 1, NULL, 0, 0, NULL),
                (2, 3000.0, 66, 'M', 'PE', 'Maipu',    NULL, 9, NULL, 0, 0, NULL);",
        )
        .unwrap();

    let predictions_path = temp_path("scored.json");
    let count = run_scoring(&store, &FakeScorer, &predictions_path.display().to_string())
        .unwrap();
    assert_eq!(count, 2);

    let snapshot_path = temp_path("consolidated.json");
    let snapshot = JsonSnapshot::new(snapshot_path.display().to_string());
    let predictions = PredictionFile::new(predictions_path.display().to_string());
    let outcome = run_consolidation(&store, &predictions, &snapshot).unwrap();
    assert_eq!(outcome.summary.total_records, 2);
    assert_eq!(outcome.summary.rejected_pct, 100.0);

    let report = run_analysis(&snapshot, &BiasAnalyzer::default()).unwrap();
    assert_eq!(report.total_records, 2);
    let ages: Vec<&str> = report.by_age.iter().map(|r| r.key.label()).collect();
    assert_eq!(ages, vec!["18-25", "66+"]);

    let _ = std::fs::remove_file(&predictions_path);
    let _ = std::fs::remove_file(&snapshot_path);
}

#[test]
fn scoring_failure_is_structured_and_writes_nothing() {
    let store = SubjectStore::in_memory().unwrap();
    store.migrate().unwrap();
    let path = temp_path("never_written.json");

    let err = run_scoring(&store, &DownScorer, &path.display().to_string()).unwrap_err();

    match err {
        AuditError::ScoringRejected { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("expected ScoringRejected, got {other:?}"),
    }
    assert!(!path.exists());
}

#[test]
fn renderers_cover_every_section() {
    let dataset = MemoryDataset::default();
    let subjects = credit_audit_core::consolidation::index_subjects(vec![
        subject(1, "CL", "Santiago", 30, 1000.0),
        subject(2, "PE", "Maipu", 50, 4000.0),
    ]);
    let records = credit_audit_core::consolidation::consolidate(
        &subjects,
        &[
            prediction(1, Decision::Approved, 20.0),
            prediction(2, Decision::Rejected, 85.0),
        ],
    );
    dataset.write(&records).unwrap();
    let report = run_analysis(&dataset, &BiasAnalyzer::default()).unwrap();

    let mut text = Vec::new();
    TextRenderer::default().render(&report, &mut text).unwrap();
    let text = String::from_utf8(text).unwrap();
    for heading in ["1. By nationality", "4. By age bracket", "5. By ethnicity", "7. Mean score"] {
        assert!(text.contains(heading), "missing {heading} in:\n{text}");
    }
    assert!(text.contains("No ethnicity data available"));
    assert!(text.contains("46-55"));

    let mut json = Vec::new();
    JsonRenderer.render(&report, &mut json).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&json).unwrap();
    assert_eq!(value["total_records"], 2);
    assert_eq!(value["by_ethnicity"]["status"], "no_data");
}
