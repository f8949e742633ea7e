//! Working-copy lifecycle. Substitution only ever happens on a copy.

use tracing::{debug, error, info, warn};

use crate::docs_client::{DocumentHandle, DocumentService, ServiceError};
use crate::documents::DocumentError;

/// A disposable copy of a template, distinct from it by construction.
///
/// Not `Clone`: `delete_working_copy` consumes it, so a copy is deleted at most once.
#[derive(Debug)]
#[must_use = "working copies must be passed to delete_working_copy"]
pub struct WorkingCopy {
    handle: DocumentHandle,
    template: DocumentHandle,
}

impl WorkingCopy {
    pub fn handle(&self) -> &DocumentHandle {
        &self.handle
    }

    pub fn template(&self) -> &DocumentHandle {
        &self.template
    }
}

/// Verifies the template is reachable, copies it, and checks the copy is a new document.
pub async fn create_working_copy(
    service: &dyn DocumentService,
    template: &DocumentHandle,
) -> Result<WorkingCopy, DocumentError> {
    service
        .get(template)
        .await
        .map_err(|source| DocumentError::TemplateUnreachable {
            template: template.clone(),
            source,
        })?;

    let handle = service
        .copy(template)
        .await
        .map_err(|source| DocumentError::CopyCreationFailed {
            template: template.clone(),
            source,
        })?;

    // The returned handle is dropped here, never deleted: it is the template.
    if &handle == template {
        error!("Copy of template {template} came back with the template's own id");
        return Err(DocumentError::CopyIdentityViolation {
            template: template.clone(),
        });
    }

    info!("Created working copy {handle} from template {template}");
    Ok(WorkingCopy {
        handle,
        template: template.clone(),
    })
}

/// Deletes the working copy. Failures are logged and returned for reporting only.
pub async fn delete_working_copy(
    service: &dyn DocumentService,
    copy: WorkingCopy,
) -> Result<(), DocumentError> {
    discard(service, &copy.handle).await
}

/// Releases a working copy without deleting it. Used once the service has
/// resolved the copy to its template.
pub fn keep_working_copy(copy: WorkingCopy) {
    warn!(
        "Not deleting working copy {}: it resolved to template {}",
        copy.handle, copy.template
    );
}

/// Deletes a document; a document that is already gone counts as deleted.
async fn discard(service: &dyn DocumentService, handle: &DocumentHandle) -> Result<(), DocumentError> {
    match service.delete(handle).await {
        Ok(()) => {
            info!("Deleted working copy {handle}");
            Ok(())
        }
        Err(ServiceError::NotFound(_)) => {
            debug!("Working copy {handle} was already deleted");
            Ok(())
        }
        Err(source) => {
            warn!("Failed to delete working copy {handle}: {source}");
            Err(DocumentError::CleanupFailed {
                handle: handle.clone(),
                source,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs_client::fake::InMemoryDocumentService;

    const TEMPLATE_BODY: &str = "Candidature {{ poste }} chez {{ entreprise }}";

    #[tokio::test]
    async fn test_copy_handle_differs_from_template() {
        let service = InMemoryDocumentService::with_document("tpl", TEMPLATE_BODY);
        let template = DocumentHandle::new("tpl");

        let copy = create_working_copy(&service, &template).await.unwrap();
        assert_ne!(copy.handle(), &template);
        assert_eq!(copy.template(), &template);
        assert_eq!(service.body(copy.handle().as_str()).unwrap(), TEMPLATE_BODY);

        delete_working_copy(&service, copy).await.unwrap();
        assert!(service.live_copies().is_empty());
        assert!(service.exists("tpl"));
    }

    #[tokio::test]
    async fn test_unreachable_template() {
        let service = InMemoryDocumentService::default();
        let err = create_working_copy(&service, &DocumentHandle::new("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::TemplateUnreachable { .. }));
    }

    #[tokio::test]
    async fn test_copy_failure() {
        let service = InMemoryDocumentService::with_document("tpl", TEMPLATE_BODY);
        service.fail_copy();
        let err = create_working_copy(&service, &DocumentHandle::new("tpl"))
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::CopyCreationFailed { .. }));
        assert!(!err.is_hard_stop());
    }

    #[tokio::test]
    async fn test_copy_returning_template_id_is_a_violation() {
        let service = InMemoryDocumentService::with_document("tpl", TEMPLATE_BODY);
        service.copy_returns_source();

        let err = create_working_copy(&service, &DocumentHandle::new("tpl"))
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::CopyIdentityViolation { .. }));
        assert!(err.is_hard_stop());
        assert!(service.exists("tpl"));
        assert!(service.deleted().is_empty());
    }

    #[tokio::test]
    async fn test_deleting_twice_is_harmless() {
        let service = InMemoryDocumentService::with_document("tpl", TEMPLATE_BODY);
        let copy = create_working_copy(&service, &DocumentHandle::new("tpl"))
            .await
            .unwrap();
        let handle = copy.handle().clone();

        delete_working_copy(&service, copy).await.unwrap();
        discard(&service, &handle).await.unwrap();
        assert_eq!(service.deleted(), vec![handle.to_string()]);
    }

    #[tokio::test]
    async fn test_delete_failure_is_reported_as_cleanup_failure() {
        let service = InMemoryDocumentService::with_document("tpl", TEMPLATE_BODY);
        let copy = create_working_copy(&service, &DocumentHandle::new("tpl"))
            .await
            .unwrap();
        service.fail_delete();

        let err = delete_working_copy(&service, copy).await.unwrap_err();
        assert!(matches!(err, DocumentError::CleanupFailed { .. }));
    }
}
