//! Remote scoring client.
//!
//! Sends every subject's feature vector to the scoring service in one batch
//! and keeps the raw response; the predictions file is that response as-is.

use crate::{
    error::{AuditError, AuditResult},
    record::{Prediction, SubjectRecord},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Label sent for subjects with no recorded ethnicity.
pub const ETHNICITY_NOT_REPORTED: &str = "No Informado";

/// Payment-history and real-estate aggregates for one subject.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryAggregates {
    #[serde(rename = "max_dias_mora_historico")]
    pub max_days_past_due: i64,
    #[serde(rename = "cantidad_atrasos")]
    pub late_payment_count: i64,
    #[serde(rename = "patrimonio_inmobiliario")]
    pub real_estate_value: f64,
    #[serde(rename = "tiene_propiedad_en_remate")]
    pub has_foreclosed_property: i64,
}

/// One entry of the `clientes` array in a scoring request.
///
/// `term_months` keeps the raw column value: the service receives the
/// integer term, or `null` when the customer has no request.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringFeatures {
    pub subject: SubjectRecord,
    pub term_months: Option<i64>,
    pub history: HistoryAggregates,
}

impl ScoringFeatures {
    pub fn new(
        mut subject: SubjectRecord,
        term_months: Option<i64>,
        history: HistoryAggregates,
    ) -> Self {
        if subject.ethnicity.is_none() {
            subject.ethnicity = Some(ETHNICITY_NOT_REPORTED.to_string());
        }
        Self {
            subject,
            term_months,
            history,
        }
    }
}

#[derive(Serialize)]
struct PayloadRow<'a> {
    id_cliente: i64,
    anios_empleo: Option<i64>,
    canal_origen: Option<&'a str>,
    cantidad_atrasos: i64,
    comportamiento_pago: Option<&'a str>,
    comuna: &'a str,
    deuda_total: f64,
    edad: i64,
    etnia: &'a str,
    ingresos_mensuales: f64,
    limite_tc: f64,
    max_dias_mora_historico: i64,
    monto_solicitado: f64,
    nacionalidad: Option<&'a str>,
    patrimonio_inmobiliario: f64,
    plazo_meses: Option<i64>,
    sexo: &'a str,
    tasa_interes_anual: f64,
    tiene_propiedad_en_remate: i64,
    tipo_contrato: Option<&'a str>,
    tipo_producto: Option<&'a str>,
}

impl Serialize for ScoringFeatures {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let s = &self.subject;
        let h = &self.history;
        PayloadRow {
            id_cliente: s.subject_id,
            anios_empleo: s.years_employed,
            canal_origen: s.origination_channel.as_deref(),
            cantidad_atrasos: h.late_payment_count,
            comportamiento_pago: s.payment_behavior.as_deref(),
            comuna: &s.locality,
            deuda_total: s.total_debt,
            edad: s.age,
            etnia: s.ethnicity.as_deref().unwrap_or(ETHNICITY_NOT_REPORTED),
            ingresos_mensuales: s.monthly_income,
            limite_tc: s.credit_limit,
            max_dias_mora_historico: h.max_days_past_due,
            monto_solicitado: s.requested_amount,
            nacionalidad: s.nationality.as_deref(),
            patrimonio_inmobiliario: h.real_estate_value,
            plazo_meses: self.term_months,
            sexo: &s.sex,
            tasa_interes_anual: s.annual_interest_rate,
            tiene_propiedad_en_remate: h.has_foreclosed_property,
            tipo_contrato: s.contract_type.as_deref(),
            tipo_producto: s.product_type.as_deref(),
        }
        .serialize(serializer)
    }
}

#[derive(Serialize)]
struct ScoringRequest<'a> {
    clientes: &'a [ScoringFeatures],
}

/// Batch scoring seam; `ScoringClient` is the HTTP implementation.
pub trait Scorer {
    /// Submit one batch, return the service's response body.
    fn predict_batch(&self, batch: &[ScoringFeatures]) -> AuditResult<serde_json::Value>;
}

pub struct ScoringClient {
    client: reqwest::blocking::Client,
    url: String,
}

impl ScoringClient {
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> AuditResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl Scorer for ScoringClient {
    fn predict_batch(&self, batch: &[ScoringFeatures]) -> AuditResult<serde_json::Value> {
        log::info!("Sending {} subjects to {}", batch.len(), self.url);

        let response = self
            .client
            .post(&self.url)
            .json(&ScoringRequest { clientes: batch })
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "Unknown error".to_string());
            log::error!("Scoring service returned {status}");
            return Err(AuditError::ScoringRejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json()?)
    }
}

/// Extract the predictions from a scoring response, checking its shape
/// before it is persisted.
pub fn predictions_in(response: &serde_json::Value) -> AuditResult<Vec<Prediction>> {
    let data = response
        .get("data")
        .ok_or_else(|| anyhow::anyhow!("scoring response has no \"data\" array"))?;
    Ok(serde_json::from_value(data.clone())?)
}
