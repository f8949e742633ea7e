//! Placeholder substitution. Rewrites `{{ name }}` tokens in a working copy.
//!
//! Matching is literal and case-sensitive, with exactly one space inside each
//! brace pair. Tokens without a value stay in the document; values without a
//! token are ignored. Every replacement for a call goes out in one batch.

use serde::Serialize;
use tracing::{debug, error, info};

use crate::docs_client::{DocumentHandle, DocumentService, TextReplacement};
use crate::documents::DocumentError;
use crate::models::fields::FieldValues;

/// What one substitution call changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubstitutionReport {
    pub occurrences_changed: u32,
    /// Field names with no matching token in the document.
    pub unmatched_fields: Vec<String>,
}

/// The literal token replaced for field `name`.
pub fn placeholder(name: &str) -> String {
    format!("{{{{ {name} }}}}")
}

pub fn replacements_for(values: &FieldValues) -> Vec<TextReplacement> {
    values
        .iter()
        .map(|(name, value)| TextReplacement {
            pattern: placeholder(name),
            replacement: value.to_string(),
        })
        .collect()
}

/// Replaces every placeholder in `copy` with its value.
///
/// Refuses to run unless the service confirms `copy` is itself and is not `template`.
pub async fn substitute(
    service: &dyn DocumentService,
    copy: &DocumentHandle,
    values: &FieldValues,
    template: &DocumentHandle,
) -> Result<SubstitutionReport, DocumentError> {
    let resolved = service
        .get(copy)
        .await
        .map_err(|source| DocumentError::SubstitutionFailed {
            handle: copy.clone(),
            source,
        })?;

    if &resolved != copy {
        error!("Working copy {copy} resolved to {resolved}; aborting substitution");
        return Err(DocumentError::DocumentIdentityMismatch {
            expected: copy.clone(),
            actual: resolved,
        });
    }
    if &resolved == template {
        error!("Substitution was pointed at template {template}; rejecting");
        return Err(DocumentError::TemplateMutationRejected {
            template: template.clone(),
        });
    }

    if values.is_empty() {
        debug!("No field values for {copy}; nothing to substitute");
        return Ok(SubstitutionReport::default());
    }

    let replacements = replacements_for(values);
    debug!("Substituting {} field(s) in {copy}", values.len());
    let counts = service
        .batch_replace_text(copy, &replacements)
        .await
        .map_err(|source| DocumentError::SubstitutionFailed {
            handle: copy.clone(),
            source,
        })?;

    let unmatched_fields: Vec<String> = values
        .iter()
        .zip(&counts)
        .filter(|(_, count)| **count == 0)
        .map(|((name, _), _)| name.to_string())
        .collect();
    if !unmatched_fields.is_empty() {
        debug!("Fields without a placeholder in {copy}: {unmatched_fields:?}");
    }

    let report = SubstitutionReport {
        occurrences_changed: counts.iter().sum(),
        unmatched_fields,
    };
    info!(
        "Substituted {} placeholder occurrence(s) in {copy}",
        report.occurrences_changed
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs_client::fake::InMemoryDocumentService;

    const TEMPLATE_BODY: &str =
        "{{ entreprise }} recrute un {{ poste }} ({{ source }}). Merci {{ entreprise }} !";

    fn values(pairs: &[(&str, &str)]) -> FieldValues {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_placeholder_format() {
        assert_eq!(placeholder("poste"), "{{ poste }}");
        assert_eq!(placeholder("skill1"), "{{ skill1 }}");
    }

    #[tokio::test]
    async fn test_scenario_known_tokens_replaced_unknown_left() {
        let service = InMemoryDocumentService::with_document("tpl", TEMPLATE_BODY);
        service.add_document("copy", TEMPLATE_BODY);
        let fields = values(&[("entreprise", "Acme"), ("poste", "Engineer")]);

        let report = substitute(
            &service,
            &DocumentHandle::new("copy"),
            &fields,
            &DocumentHandle::new("tpl"),
        )
        .await
        .unwrap();

        assert_eq!(
            service.body("copy").unwrap(),
            "Acme recrute un Engineer ({{ source }}). Merci Acme !"
        );
        assert_eq!(report.occurrences_changed, 3);
        assert_eq!(service.body("tpl").unwrap(), TEMPLATE_BODY);
    }

    #[tokio::test]
    async fn test_extra_fields_are_ignored() {
        let service = InMemoryDocumentService::with_document("tpl", TEMPLATE_BODY);
        service.add_document("copy", TEMPLATE_BODY);
        let fields = values(&[
            ("poste", "Engineer"),
            ("salaire", "55k"),
            ("url", "https://jobs.example/1"),
        ]);

        let report = substitute(
            &service,
            &DocumentHandle::new("copy"),
            &fields,
            &DocumentHandle::new("tpl"),
        )
        .await
        .unwrap();

        assert_eq!(report.occurrences_changed, 1);
        assert_eq!(report.unmatched_fields, vec!["salaire", "url"]);
    }

    #[tokio::test]
    async fn test_matching_is_case_and_spacing_sensitive() {
        let body = "{{ Poste }} {{poste}} {{  poste  }} {{ poste }}";
        let service = InMemoryDocumentService::with_document("copy", body);

        substitute(
            &service,
            &DocumentHandle::new("copy"),
            &values(&[("poste", "X")]),
            &DocumentHandle::new("tpl"),
        )
        .await
        .unwrap();

        assert_eq!(
            service.body("copy").unwrap(),
            "{{ Poste }} {{poste}} {{  poste  }} X"
        );
    }

    #[tokio::test]
    async fn test_empty_value_removes_token() {
        let service = InMemoryDocumentService::with_document("copy", "[{{ salaire }}]");
        substitute(
            &service,
            &DocumentHandle::new("copy"),
            &values(&[("salaire", "")]),
            &DocumentHandle::new("tpl"),
        )
        .await
        .unwrap();
        assert_eq!(service.body("copy").unwrap(), "[]");
    }

    #[tokio::test]
    async fn test_all_replacements_sent_as_one_batch() {
        let service = InMemoryDocumentService::with_document("copy", TEMPLATE_BODY);
        substitute(
            &service,
            &DocumentHandle::new("copy"),
            &values(&[("entreprise", "Acme"), ("poste", "Engineer"), ("source", "LinkedIn")]),
            &DocumentHandle::new("tpl"),
        )
        .await
        .unwrap();
        assert_eq!(service.batch_calls(), 1);
    }

    #[tokio::test]
    async fn test_no_values_means_no_batch() {
        let service = InMemoryDocumentService::with_document("copy", TEMPLATE_BODY);
        let report = substitute(
            &service,
            &DocumentHandle::new("copy"),
            &FieldValues::new(),
            &DocumentHandle::new("tpl"),
        )
        .await
        .unwrap();
        assert_eq!(report, SubstitutionReport::default());
        assert_eq!(service.batch_calls(), 0);
    }

    #[tokio::test]
    async fn test_substituting_into_template_is_rejected() {
        let service = InMemoryDocumentService::with_document("tpl", TEMPLATE_BODY);
        let template = DocumentHandle::new("tpl");

        let err = substitute(&service, &template, &values(&[("poste", "X")]), &template)
            .await
            .unwrap_err();

        assert!(matches!(err, DocumentError::TemplateMutationRejected { .. }));
        assert_eq!(service.body("tpl").unwrap(), TEMPLATE_BODY);
        assert_eq!(service.batch_calls(), 0);
    }

    #[tokio::test]
    async fn test_identity_mismatch_is_rejected() {
        let service = InMemoryDocumentService::with_document("tpl", TEMPLATE_BODY);
        service.add_document("copy", TEMPLATE_BODY);
        service.misreport_identity_as("someone-else");

        let err = substitute(
            &service,
            &DocumentHandle::new("copy"),
            &values(&[("poste", "X")]),
            &DocumentHandle::new("tpl"),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DocumentError::DocumentIdentityMismatch { .. }));
        assert!(err.is_hard_stop());
        assert_eq!(service.body("copy").unwrap(), TEMPLATE_BODY);
    }

    #[tokio::test]
    async fn test_batch_failure_leaves_document_unchanged() {
        let service = InMemoryDocumentService::with_document("copy", TEMPLATE_BODY);
        service.fail_replace();

        let err = substitute(
            &service,
            &DocumentHandle::new("copy"),
            &values(&[("poste", "X")]),
            &DocumentHandle::new("tpl"),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DocumentError::SubstitutionFailed { .. }));
        assert_eq!(service.body("copy").unwrap(), TEMPLATE_BODY);
    }
}
