//! Submission form: the user-facing input, converted into placeholder values.

use std::collections::HashSet;

use serde::Deserialize;
use thiserror::Error;

use crate::models::fields::FieldValues;
use crate::skills::{find_skill, MAX_SELECTED_SKILLS};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("Field '{0}' is required")]
    MissingField(&'static str),

    #[error("Unknown skill: {0}")]
    UnknownSkill(String),

    #[error("Skill selected twice: {0}")]
    DuplicateSkill(String),

    #[error("At most {max} skills can be selected, got {count}")]
    TooManySkills { count: usize, max: usize },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmissionForm {
    #[serde(default)]
    pub entreprise: String,
    #[serde(default)]
    pub poste: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub identifiant: String,
    #[serde(default)]
    pub base_line: String,
    #[serde(default)]
    pub salaire: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    /// Skill names from the catalog, in slot order.
    #[serde(default)]
    pub skills: Vec<String>,
}

impl SubmissionForm {
    /// Validates the form and maps it onto placeholder names.
    ///
    /// Every placeholder the templates may use gets a value, so unused skill
    /// slots render as empty text rather than as a raw token.
    pub fn into_field_values(self) -> Result<FieldValues, FormError> {
        if self.entreprise.trim().is_empty() {
            return Err(FormError::MissingField("entreprise"));
        }
        if self.poste.trim().is_empty() {
            return Err(FormError::MissingField("poste"));
        }
        if self.skills.len() > MAX_SELECTED_SKILLS {
            return Err(FormError::TooManySkills {
                count: self.skills.len(),
                max: MAX_SELECTED_SKILLS,
            });
        }

        let mut seen = HashSet::new();
        let mut descriptions = Vec::with_capacity(self.skills.len());
        for name in &self.skills {
            let skill = find_skill(name).ok_or_else(|| FormError::UnknownSkill(name.clone()))?;
            if !seen.insert(skill.name) {
                return Err(FormError::DuplicateSkill(name.clone()));
            }
            descriptions.push(skill.description);
        }

        let mut values = FieldValues::new();
        values.insert("entreprise", self.entreprise);
        values.insert("poste", self.poste);
        values.insert("source", self.source);
        values.insert("identifiant", self.identifiant);
        values.insert("base_line", self.base_line);
        values.insert("salaire", self.salaire);
        values.insert("description", self.description);
        values.insert("url", self.url);
        for slot in 0..MAX_SELECTED_SKILLS {
            let description = descriptions.get(slot).copied().unwrap_or_default();
            values.insert(format!("skill{}", slot + 1), description);
        }
        values.insert("skills_text", descriptions.join("\n"));
        Ok(values)
    }
}
