//! Submission log: append-only record of every generated submission.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{error, info};

use crate::models::fields::FieldValues;
use crate::models::submission::SubmissionRecord;

/// Field names stored per record, in `INSERT_RECORD` bind order.
pub const RECORD_COLUMNS: [&str; 15] = [
    "entreprise",
    "poste",
    "source",
    "identifiant",
    "base_line",
    "salaire",
    "description",
    "skills_text",
    "skill1",
    "skill2",
    "skill3",
    "skill4",
    "skill5",
    "skill6",
    "url",
];

const INSERT_RECORD: &str = r#"
    INSERT INTO documents
        (entreprise, poste, source, identifiant, base_line, salaire, description,
         skills_text, skill1, skill2, skill3, skill4, skill5, skill6, url)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
    RETURNING id
"#;

/// Expands to the record SELECT followed by `$tail`, as one string literal.
macro_rules! select_records {
    ($tail:literal) => {
        concat!(
            r#"
    SELECT id, entreprise, poste,
           COALESCE(source, '') AS source,
           COALESCE(identifiant, '') AS identifiant,
           COALESCE(base_line, '') AS base_line,
           COALESCE(salaire, '') AS salaire,
           COALESCE(description, '') AS description,
           COALESCE(skills_text, '') AS skills_text,
           COALESCE(skill1, '') AS skill1,
           COALESCE(skill2, '') AS skill2,
           COALESCE(skill3, '') AS skill3,
           COALESCE(skill4, '') AS skill4,
           COALESCE(skill5, '') AS skill5,
           COALESCE(skill6, '') AS skill6,
           COALESCE(url, '') AS url,
           COALESCE(created_at, 'epoch'::timestamp) AS created_at
    FROM documents
    "#,
            $tail
        )
    };
}

const LIST_RECORDS: &str = select_records!("ORDER BY created_at DESC, id DESC");
const GET_RECORD: &str = select_records!("WHERE id = $1");

#[async_trait]
pub trait SubmissionLog: Send + Sync {
    /// Appends one record. `None` means it was not persisted; the cause is logged.
    async fn append_record(&self, values: &FieldValues) -> Option<i32>;

    /// Every record, newest first.
    async fn list_all(&self) -> Result<Vec<SubmissionRecord>, sqlx::Error>;

    async fn get_record(&self, id: i32) -> Result<Option<SubmissionRecord>, sqlx::Error>;
}

pub struct PgSubmissionLog {
    pool: PgPool,
}

impl PgSubmissionLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// One transaction per insert; dropping `tx` on error rolls it back.
    async fn insert(&self, values: &FieldValues) -> Result<i32, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let mut query = sqlx::query_scalar::<_, i32>(INSERT_RECORD);
        for column in RECORD_COLUMNS {
            query = query.bind(values.get_or_empty(column));
        }
        let id = query.fetch_one(&mut *tx).await?;

        tx.commit().await?;
        Ok(id)
    }
}

#[async_trait]
impl SubmissionLog for PgSubmissionLog {
    async fn append_record(&self, values: &FieldValues) -> Option<i32> {
        info!(
            "Saving submission for company: {}, position: {}",
            values.get_or_empty("entreprise"),
            values.get_or_empty("poste")
        );
        match self.insert(values).await {
            Ok(id) => {
                info!("Submission record {id} saved");
                Some(id)
            }
            Err(e) => {
                error!("Failed to save submission record: {e}");
                None
            }
        }
    }

    async fn list_all(&self) -> Result<Vec<SubmissionRecord>, sqlx::Error> {
        let records = sqlx::query_as::<_, SubmissionRecord>(LIST_RECORDS)
            .fetch_all(&self.pool)
            .await?;
        info!("Retrieved {} submission records", records.len());
        Ok(records)
    }

    async fn get_record(&self, id: i32) -> Result<Option<SubmissionRecord>, sqlx::Error> {
        sqlx::query_as::<_, SubmissionRecord>(GET_RECORD)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }
}
