//! Fixed-schema records flowing through the pipeline.
//!
//! Serialized names match the flat keys of the consolidated snapshot, which
//! the dashboard and any other downstream consumer read by name. Missing
//! categorical values stay `None` and are written as an explicit `null`.

use crate::types::{Decision, SubjectId};
use serde::{Deserialize, Serialize};

/// One customer row as read from the record source.
///
/// Numeric financial fields are already coerced (NULL → 0.0) by the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectRecord {
    #[serde(rename = "id_cliente")]
    pub subject_id: SubjectId,

    #[serde(rename = "edad")]
    pub age: i64,
    #[serde(rename = "sexo")]
    pub sex: String,
    #[serde(rename = "nacionalidad")]
    pub nationality: Option<String>,
    #[serde(rename = "etnia")]
    pub ethnicity: Option<String>,
    #[serde(rename = "comuna")]
    pub locality: String,

    #[serde(rename = "ingresos_mensuales")]
    pub monthly_income: f64,
    #[serde(rename = "deuda_total")]
    pub total_debt: f64,
    #[serde(rename = "limite_tc")]
    pub credit_limit: f64,
    #[serde(rename = "monto_solicitado")]
    pub requested_amount: f64,
    #[serde(rename = "plazo_meses")]
    pub term_months: f64,
    #[serde(rename = "tasa_interes_anual")]
    pub annual_interest_rate: f64,

    #[serde(rename = "anios_empleo")]
    pub years_employed: Option<i64>,
    #[serde(rename = "tipo_contrato")]
    pub contract_type: Option<String>,
    #[serde(rename = "comportamiento_pago")]
    pub payment_behavior: Option<String>,

    #[serde(rename = "tipo_producto")]
    pub product_type: Option<String>,
    #[serde(rename = "canal_origen")]
    pub origination_channel: Option<String>,
}

/// A single scoring event returned by the scoring service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(rename = "id_cliente")]
    pub subject_id: SubjectId,
    #[serde(rename = "score_riesgo")]
    pub risk_score: f64,
    #[serde(rename = "probabilidad_default")]
    pub default_probability: f64,
    #[serde(rename = "decision_legacy")]
    pub decision: Decision,
    #[serde(rename = "mensaje", default)]
    pub message: String,
}

/// Subject attributes joined with one prediction. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedRecord {
    #[serde(rename = "id_cliente")]
    pub subject_id: SubjectId,

    // Demographics
    #[serde(rename = "comuna")]
    pub locality: String,
    #[serde(rename = "nacionalidad")]
    pub nationality: Option<String>,
    #[serde(rename = "etnia")]
    pub ethnicity: Option<String>,
    #[serde(rename = "sexo")]
    pub sex: String,
    #[serde(rename = "edad")]
    pub age: i64,

    // Financial
    #[serde(rename = "ingresos_mensuales")]
    pub monthly_income: f64,
    #[serde(rename = "deuda_total")]
    pub total_debt: f64,
    #[serde(rename = "limite_tc")]
    pub credit_limit: f64,
    #[serde(rename = "monto_solicitado")]
    pub requested_amount: f64,
    #[serde(rename = "plazo_meses")]
    pub term_months: f64,
    #[serde(rename = "tasa_interes_anual")]
    pub annual_interest_rate: f64,

    // Employment
    #[serde(rename = "anios_empleo")]
    pub years_employed: Option<i64>,
    #[serde(rename = "tipo_contrato")]
    pub contract_type: Option<String>,
    #[serde(rename = "comportamiento_pago")]
    pub payment_behavior: Option<String>,

    // Product
    #[serde(rename = "tipo_producto")]
    pub product_type: Option<String>,
    #[serde(rename = "canal_origen")]
    pub origination_channel: Option<String>,

    // Model output
    #[serde(rename = "score_riesgo")]
    pub risk_score: f64,
    #[serde(rename = "probabilidad_default")]
    pub default_probability: f64,
    #[serde(rename = "decision_legacy")]
    pub decision: Decision,
    #[serde(rename = "mensaje")]
    pub message: String,
}

impl ConsolidatedRecord {
    /// Project a subject and one of its predictions into the flat view.
    pub fn join(subject: &SubjectRecord, prediction: &Prediction) -> Self {
        Self {
            subject_id: prediction.subject_id,
            locality: subject.locality.clone(),
            nationality: subject.nationality.clone(),
            ethnicity: subject.ethnicity.clone(),
            sex: subject.sex.clone(),
            age: subject.age,
            monthly_income: subject.monthly_income,
            total_debt: subject.total_debt,
            credit_limit: subject.credit_limit,
            requested_amount: subject.requested_amount,
            term_months: subject.term_months,
            annual_interest_rate: subject.annual_interest_rate,
            years_employed: subject.years_employed,
            contract_type: subject.contract_type.clone(),
            payment_behavior: subject.payment_behavior.clone(),
            product_type: subject.product_type.clone(),
            origination_channel: subject.origination_channel.clone(),
            risk_score: prediction.risk_score,
            default_probability: prediction.default_probability,
            decision: prediction.decision,
            message: prediction.message.clone(),
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.decision.is_rejected()
    }
}
