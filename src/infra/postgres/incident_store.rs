//! PostgreSQL-backed incident store
//!
//! Two tables: `companies` and `incidents`. Lifecycle transitions are
//! conditional `UPDATE`s keyed on the current `proof_status`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;

use crate::domain::{
    BlockchainStatus, Company, CompanyId, HexDigest, Incident, IncidentId, ProofStatus,
    ProofSummary, Severity,
};
use crate::infra::{IncidentStore, Result, ServiceError};

/// Incident row as selected by [`INCIDENT_COLUMNS`]
type IncidentRow = (
    String,
    String,
    Option<String>,
    DateTime<Utc>,
    String,
    String,
    Option<String>,
    Option<serde_json::Value>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<i32>,
    Option<String>,
);

const INCIDENT_COLUMNS: &str = r#"
    i.incident_id, i.company_id, c.name, i.detected_at, i.commitment,
    i.proof_status, i.proof_hash, i.public_inputs, i.transaction_hash,
    i.blockchain_status, i.severity, i.event_count, i.agent_version
"#;

/// PostgreSQL-backed incident store
pub struct PgIncidentStore {
    pool: PgPool,
}

impl PgIncidentStore {
    /// Create a new PostgreSQL incident store
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Initialize the database schema
    pub async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS companies (
                id VARCHAR(64) PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                wallet_address VARCHAR(128),
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(ServiceError::Database)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS incidents (
                incident_id VARCHAR(64) PRIMARY KEY,
                company_id VARCHAR(64) NOT NULL REFERENCES companies(id),
                detected_at TIMESTAMPTZ NOT NULL,
                commitment VARCHAR(66) NOT NULL,
                proof_status VARCHAR(16) NOT NULL DEFAULT 'need_proof',
                proof_hash VARCHAR(66),
                public_inputs JSONB,
                transaction_hash VARCHAR(66),
                blockchain_status VARCHAR(16),
                severity VARCHAR(16),
                event_count INTEGER,
                agent_version VARCHAR(32),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(ServiceError::Database)?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_incidents_company
            ON incidents (company_id, detected_at)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(ServiceError::Database)?;

        Ok(())
    }

    /// Convert a database row to an Incident
    fn row_to_incident(row: IncidentRow) -> Result<Incident> {
        let (
            incident_id,
            company_id,
            company_name,
            detected_at,
            commitment,
            proof_status,
            proof_hash,
            public_inputs,
            transaction_hash,
            blockchain_status,
            severity,
            event_count,
            agent_version,
        ) = row;

        let incident_id = IncidentId::new(incident_id);
        let corrupt = |reason: String| ServiceError::CorruptRecord {
            incident_id: incident_id.clone(),
            reason,
        };

        let commitment: HexDigest = commitment
            .parse()
            .map_err(|e| corrupt(format!("commitment: {e}")))?;
        let proof_status: ProofStatus = proof_status.parse().map_err(corrupt)?;

        let proof = if proof_status.has_proof() {
            let proof_hash: HexDigest = proof_hash
                .ok_or_else(|| corrupt("proof_hash missing".to_string()))?
                .parse()
                .map_err(|e| corrupt(format!("proof_hash: {e}")))?;
            let public_inputs: Vec<String> = match public_inputs {
                Some(value) => serde_json::from_value(value)
                    .map_err(|e| corrupt(format!("public_inputs: {e}")))?,
                None => Vec::new(),
            };
            let transaction_hash = transaction_hash
                .map(|h| h.parse::<HexDigest>())
                .transpose()
                .map_err(|e| corrupt(format!("transaction_hash: {e}")))?;
            let blockchain_status = blockchain_status
                .map(|s| s.parse::<BlockchainStatus>())
                .transpose()
                .map_err(corrupt)?;

            Some(ProofSummary {
                proof_hash,
                public_inputs,
                commitment,
                transaction_hash,
                blockchain_status,
            })
        } else {
            None
        };

        let severity = severity
            .map(|s| s.parse::<Severity>())
            .transpose()
            .map_err(corrupt)?;
        let event_count = event_count
            .map(u32::try_from)
            .transpose()
            .map_err(|e| corrupt(format!("event_count: {e}")))?;

        Ok(Incident {
            incident_id,
            company_id: CompanyId::new(company_id),
            company_name,
            detected_at,
            commitment,
            proof_status,
            proof,
            severity,
            event_count,
            agent_version,
        })
    }

    /// `event_count` as stored; the column is a signed INTEGER
    fn event_count_column(incident: &Incident) -> Result<Option<i32>> {
        incident
            .event_count
            .map(i32::try_from)
            .transpose()
            .map_err(|_| {
                ServiceError::Internal(format!(
                    "event_count {} of incident {} exceeds the stored range",
                    incident.event_count.unwrap_or_default(),
                    incident.incident_id
                ))
            })
    }

    fn rows_to_incidents(rows: Vec<IncidentRow>) -> Result<Vec<Incident>> {
        rows.into_iter().map(Self::row_to_incident).collect()
    }
}

#[async_trait]
impl IncidentStore for PgIncidentStore {
    async fn upsert_company(&self, company: Company) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO companies (id, name, wallet_address)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name, wallet_address = EXCLUDED.wallet_address
            "#,
        )
        .bind(company.company_id.as_str())
        .bind(&company.company_name)
        .bind(&company.wallet_address)
        .execute(&self.pool)
        .await
        .map_err(ServiceError::Database)?;

        Ok(())
    }

    async fn get_company(&self, company_id: &CompanyId) -> Result<Option<Company>> {
        let row: Option<(String, String, Option<String>)> =
            sqlx::query_as("SELECT id, name, wallet_address FROM companies WHERE id = $1")
                .bind(company_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(ServiceError::Database)?;

        Ok(row.map(|(id, name, wallet_address)| Company {
            company_id: CompanyId::new(id),
            company_name: name,
            wallet_address,
        }))
    }

    async fn list_companies(&self) -> Result<Vec<Company>> {
        let rows: Vec<(String, String, Option<String>)> =
            sqlx::query_as("SELECT id, name, wallet_address FROM companies ORDER BY id")
                .fetch_all(&self.pool)
                .await
                .map_err(ServiceError::Database)?;

        Ok(rows
            .into_iter()
            .map(|(id, name, wallet_address)| Company {
                company_id: CompanyId::new(id),
                company_name: name,
                wallet_address,
            })
            .collect())
    }

    async fn insert_incident(&self, incident: Incident) -> Result<()> {
        let event_count = Self::event_count_column(&incident)?;
        let proof = incident.proof.as_ref();
        let public_inputs = proof
            .map(|p| serde_json::to_value(&p.public_inputs))
            .transpose()
            .map_err(|e| ServiceError::Internal(e.to_string()))?;

        let result = sqlx::query(
            r#"
            INSERT INTO incidents (
                incident_id, company_id, detected_at, commitment, proof_status,
                proof_hash, public_inputs, transaction_hash, blockchain_status,
                severity, event_count, agent_version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(incident.incident_id.as_str())
        .bind(incident.company_id.as_str())
        .bind(incident.detected_at)
        .bind(incident.commitment.to_string())
        .bind(incident.proof_status.as_str())
        .bind(proof.map(|p| p.proof_hash.to_string()))
        .bind(public_inputs)
        .bind(proof.and_then(|p| p.transaction_hash).map(|h| h.to_string()))
        .bind(proof.and_then(|p| p.blockchain_status).map(|s| s.as_str()))
        .bind(incident.severity.map(|s| s.as_str()))
        .bind(event_count)
        .bind(&incident.agent_version)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(ServiceError::DuplicateIncident(incident.incident_id))
            }
            Err(e) => Err(ServiceError::Database(e)),
        }
    }

    async fn get_incident(&self, incident_id: &IncidentId) -> Result<Option<Incident>> {
        let sql = format!(
            "SELECT {INCIDENT_COLUMNS} FROM incidents i \
             LEFT JOIN companies c ON c.id = i.company_id \
             WHERE i.incident_id = $1"
        );
        let row: Option<IncidentRow> = sqlx::query_as(&sql)
            .bind(incident_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(ServiceError::Database)?;

        row.map(Self::row_to_incident).transpose()
    }

    async fn list_incidents(&self) -> Result<Vec<Incident>> {
        let sql = format!(
            "SELECT {INCIDENT_COLUMNS} FROM incidents i \
             LEFT JOIN companies c ON c.id = i.company_id \
             ORDER BY i.detected_at, i.incident_id"
        );
        let rows: Vec<IncidentRow> = sqlx::query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(ServiceError::Database)?;

        Self::rows_to_incidents(rows)
    }

    async fn list_company_incidents(&self, company_id: &CompanyId) -> Result<Vec<Incident>> {
        let sql = format!(
            "SELECT {INCIDENT_COLUMNS} FROM incidents i \
             LEFT JOIN companies c ON c.id = i.company_id \
             WHERE i.company_id = $1 \
             ORDER BY i.detected_at, i.incident_id"
        );
        let rows: Vec<IncidentRow> = sqlx::query_as(&sql)
            .bind(company_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(ServiceError::Database)?;

        Self::rows_to_incidents(rows)
    }

    async fn count_incidents(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM incidents")
            .fetch_one(&self.pool)
            .await
            .map_err(ServiceError::Database)?;

        Ok(count.max(0) as u64)
    }

    async fn update_incident(&self, incident: &Incident, expected: ProofStatus) -> Result<bool> {
        let proof = incident.proof.as_ref();
        let public_inputs = proof
            .map(|p| serde_json::to_value(&p.public_inputs))
            .transpose()
            .map_err(|e| ServiceError::Internal(e.to_string()))?;

        let result = sqlx::query(
            r#"
            UPDATE incidents
            SET proof_status = $2,
                proof_hash = $3,
                public_inputs = $4,
                transaction_hash = $5,
                blockchain_status = $6,
                updated_at = NOW()
            WHERE incident_id = $1 AND proof_status = $7
            "#,
        )
        .bind(incident.incident_id.as_str())
        .bind(incident.proof_status.as_str())
        .bind(proof.map(|p| p.proof_hash.to_string()))
        .bind(public_inputs)
        .bind(proof.and_then(|p| p.transaction_hash).map(|h| h.to_string()))
        .bind(proof.and_then(|p| p.blockchain_status).map(|s| s.as_str()))
        .bind(expected.as_str())
        .execute(&self.pool)
        .await
        .map_err(ServiceError::Database)?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        let exists: Option<(String,)> =
            sqlx::query_as("SELECT incident_id FROM incidents WHERE incident_id = $1")
                .bind(incident.incident_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(ServiceError::Database)?;

        match exists {
            Some(_) => Ok(false),
            None => Err(ServiceError::IncidentNotFound(incident.incident_id.clone())),
        }
    }
}
