use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One row of the append-only `documents` table.
/// Optional columns come back as empty strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct SubmissionRecord {
    pub id: i32,
    pub entreprise: String,
    pub poste: String,
    pub source: String,
    pub identifiant: String,
    pub base_line: String,
    pub salaire: String,
    pub description: String,
    pub skills_text: String,
    pub skill1: String,
    pub skill2: String,
    pub skill3: String,
    pub skill4: String,
    pub skill5: String,
    pub skill6: String,
    pub url: String,
    pub created_at: NaiveDateTime,
}
