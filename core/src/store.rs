//! SQLite record source.
//!
//! RULE: Only store.rs talks to the database.
//! Consolidation and scoring receive typed records, never rows.

use crate::{
    error::AuditResult,
    record::SubjectRecord,
    scoring::{HistoryAggregates, ScoringFeatures},
    source::RecordSource,
};
use rusqlite::{Connection, Row};

const SUBJECT_QUERY: &str = "
    SELECT
        c.id_cliente,
        c.ingresos_mensuales,
        c.edad,
        c.sexo,
        c.nacionalidad,
        c.comuna,
        c.etnia,
        c.anios_empleo,
        c.tipo_contrato,
        c.deuda_total,
        c.limite_tc,
        c.comportamiento_pago,
        s.monto_solicitado,
        s.plazo_meses,
        s.tipo_producto,
        s.canal_origen,
        s.tasa_interes_anual
    FROM clientes c
    LEFT JOIN solicitudes_credito s ON s.id_cliente = c.id_cliente
    ORDER BY c.id_cliente ASC, s.id_solicitud ASC";

// Aggregates use correlated subqueries so payment rows and property rows
// never multiply each other.
const SCORING_FEATURE_QUERY: &str = "
    SELECT
        c.id_cliente,
        c.ingresos_mensuales,
        c.edad,
        c.sexo,
        c.nacionalidad,
        c.comuna,
        c.etnia,
        c.anios_empleo,
        c.tipo_contrato,
        c.deuda_total,
        c.limite_tc,
        c.comportamiento_pago,
        s.monto_solicitado,
        s.plazo_meses,
        s.tipo_producto,
        s.canal_origen,
        s.tasa_interes_anual,
        (SELECT IFNULL(MAX(h.dias_atraso), 0)
           FROM historial_pagos h WHERE h.id_cliente = c.id_cliente),
        (SELECT IFNULL(SUM(CASE WHEN h.pagado = 0 OR h.dias_atraso > 0 THEN 1 ELSE 0 END), 0)
           FROM historial_pagos h WHERE h.id_cliente = c.id_cliente),
        (SELECT IFNULL(SUM(b.avaluo_fiscal), 0)
           FROM bienes_raices b WHERE b.id_cliente = c.id_cliente),
        (SELECT IFNULL(MAX(CASE WHEN b.en_remate = 1 THEN 1 ELSE 0 END), 0)
           FROM bienes_raices b WHERE b.id_cliente = c.id_cliente)
    FROM clientes c
    LEFT JOIN solicitudes_credito s ON s.id_cliente = c.id_cliente
    ORDER BY c.id_cliente ASC, s.id_solicitud ASC";

pub struct SubjectStore {
    conn: Connection,
}

impl SubjectStore {
    /// Open the source database at `path`. `:memory:` opens an empty one.
    pub fn open(path: &str) -> AuditResult<Self> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open_with_flags(
                path,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                    | rusqlite::OpenFlags::SQLITE_OPEN_URI,
            )?
        };
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        log::debug!("Opened record source at {path}");
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> AuditResult<Self> {
        Self::open(":memory:")
    }

    /// Create the source tables if they do not exist.
    pub fn migrate(&self) -> AuditResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_credit_source.sql"))?;
        Ok(())
    }

    /// Run a raw SQL script against the source (fixtures, local seeding).
    pub fn load_fixture(&self, sql: &str) -> AuditResult<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    // ── Subjects ───────────────────────────────────────────────

    /// One row per (customer, credit request); customers without a
    /// request appear once with empty product fields.
    pub fn subjects(&self) -> AuditResult<Vec<SubjectRecord>> {
        let mut stmt = self.conn.prepare(SUBJECT_QUERY)?;
        let rows = stmt
            .query_map([], subject_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        log::debug!("Fetched {} subject rows", rows.len());
        Ok(rows)
    }

    // ── Scoring features ───────────────────────────────────────

    pub fn scoring_features(&self) -> AuditResult<Vec<ScoringFeatures>> {
        let mut stmt = self.conn.prepare(SCORING_FEATURE_QUERY)?;
        let rows = stmt
            .query_map([], |row| {
                let subject = subject_from_row(row)?;
                let history = HistoryAggregates {
                    max_days_past_due: row.get(17)?,
                    late_payment_count: row.get(18)?,
                    real_estate_value: row.get(19)?,
                    has_foreclosed_property: row.get(20)?,
                };
                let term_months = row.get(13)?;
                Ok(ScoringFeatures::new(subject, term_months, history))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        log::debug!("Fetched {} scoring feature rows", rows.len());
        Ok(rows)
    }
}

impl RecordSource for SubjectStore {
    fn fetch_subjects(&self) -> AuditResult<Vec<SubjectRecord>> {
        self.subjects()
    }
}

fn subject_from_row(row: &Row<'_>) -> rusqlite::Result<SubjectRecord> {
    Ok(SubjectRecord {
        subject_id: row.get(0)?,
        monthly_income: amount(row, 1)?,
        age: row.get(2)?,
        sex: row.get(3)?,
        nationality: row.get(4)?,
        locality: row.get(5)?,
        ethnicity: row.get(6)?,
        years_employed: row.get(7)?,
        contract_type: row.get(8)?,
        total_debt: amount(row, 9)?,
        credit_limit: amount(row, 10)?,
        payment_behavior: row.get(11)?,
        requested_amount: amount(row, 12)?,
        term_months: amount(row, 13)?,
        product_type: row.get(14)?,
        origination_channel: row.get(15)?,
        annual_interest_rate: amount(row, 16)?,
    })
}

/// Numeric columns coerce NULL to 0.0.
fn amount(row: &Row<'_>, idx: usize) -> rusqlite::Result<f64> {
    Ok(row.get::<_, Option<f64>>(idx)?.unwrap_or(0.0))
}
