//! In-memory `DocumentService` for tests. Documents are plain text bodies.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use super::{DocumentHandle, DocumentService, ExportFormat, ServiceError, TextReplacement};

#[derive(Default)]
struct FakeState {
    bodies: HashMap<String, String>,
    copied_from: HashMap<String, String>,
    next_copy: u32,
    deleted: Vec<String>,
    batch_calls: u32,
    fail_get: HashSet<String>,
    fail_copy: bool,
    copy_returns_source: bool,
    misreported_identity: Option<String>,
    fail_replace: bool,
    fail_export_all: bool,
    fail_export_of: HashSet<String>,
    fail_delete: bool,
}

#[derive(Default)]
pub struct InMemoryDocumentService {
    state: Mutex<FakeState>,
}

fn server_error(message: &str) -> ServiceError {
    ServiceError::Api {
        status: 500,
        message: message.to_string(),
    }
}

impl InMemoryDocumentService {
    pub fn with_document(id: &str, body: &str) -> Self {
        let service = Self::default();
        service.add_document(id, body);
        service
    }

    pub fn add_document(&self, id: &str, body: &str) {
        let mut state = self.state.lock().unwrap();
        state.bodies.insert(id.to_string(), body.to_string());
    }

    pub fn body(&self, id: &str) -> Option<String> {
        self.state.lock().unwrap().bodies.get(id).cloned()
    }

    pub fn exists(&self, id: &str) -> bool {
        self.state.lock().unwrap().bodies.contains_key(id)
    }

    /// Working copies created and not yet deleted.
    pub fn live_copies(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        let mut live: Vec<String> = state
            .copied_from
            .keys()
            .filter(|id| state.bodies.contains_key(*id))
            .cloned()
            .collect();
        live.sort();
        live
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted.clone()
    }

    pub fn batch_calls(&self) -> u32 {
        self.state.lock().unwrap().batch_calls
    }

    pub fn fail_get_of(&self, id: &str) {
        self.state.lock().unwrap().fail_get.insert(id.to_string());
    }

    pub fn fail_copy(&self) {
        self.state.lock().unwrap().fail_copy = true;
    }

    /// Makes `copy` answer with the source handle instead of a fresh one.
    pub fn copy_returns_source(&self) {
        self.state.lock().unwrap().copy_returns_source = true;
    }

    /// Makes `get` report `id` for every document.
    pub fn misreport_identity_as(&self, id: &str) {
        self.state.lock().unwrap().misreported_identity = Some(id.to_string());
    }

    pub fn fail_replace(&self) {
        self.state.lock().unwrap().fail_replace = true;
    }

    pub fn fail_export(&self) {
        self.state.lock().unwrap().fail_export_all = true;
    }

    /// Fails exports only for copies of the given template.
    pub fn fail_export_of(&self, template: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_export_of
            .insert(template.to_string());
    }

    pub fn fail_delete(&self) {
        self.state.lock().unwrap().fail_delete = true;
    }
}

#[async_trait]
impl DocumentService for InMemoryDocumentService {
    async fn get(&self, handle: &DocumentHandle) -> Result<DocumentHandle, ServiceError> {
        let state = self.state.lock().unwrap();
        if state.fail_get.contains(handle.as_str()) {
            return Err(server_error("backend unavailable"));
        }
        if !state.bodies.contains_key(handle.as_str()) {
            return Err(ServiceError::NotFound(handle.clone()));
        }
        Ok(state
            .misreported_identity
            .as_deref()
            .map_or_else(|| handle.clone(), DocumentHandle::new))
    }

    async fn copy(&self, handle: &DocumentHandle) -> Result<DocumentHandle, ServiceError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_copy {
            return Err(server_error("copy quota exceeded"));
        }
        let body = state
            .bodies
            .get(handle.as_str())
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(handle.clone()))?;
        if state.copy_returns_source {
            return Ok(handle.clone());
        }
        state.next_copy += 1;
        let id = format!("copy-{}", state.next_copy);
        state.bodies.insert(id.clone(), body);
        state.copied_from.insert(id.clone(), handle.to_string());
        Ok(DocumentHandle::new(id))
    }

    async fn batch_replace_text(
        &self,
        handle: &DocumentHandle,
        replacements: &[TextReplacement],
    ) -> Result<Vec<u32>, ServiceError> {
        let mut state = self.state.lock().unwrap();
        state.batch_calls += 1;
        if state.fail_replace {
            return Err(server_error("batchUpdate rejected"));
        }
        let mut body = state
            .bodies
            .get(handle.as_str())
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(handle.clone()))?;

        let mut counts = Vec::with_capacity(replacements.len());
        for r in replacements {
            counts.push(body.matches(r.pattern.as_str()).count() as u32);
            body = body.replace(r.pattern.as_str(), &r.replacement);
        }
        state.bodies.insert(handle.to_string(), body);
        Ok(counts)
    }

    async fn export_as(
        &self,
        handle: &DocumentHandle,
        _format: ExportFormat,
    ) -> Result<Bytes, ServiceError> {
        let state = self.state.lock().unwrap();
        let source = state.copied_from.get(handle.as_str());
        if state.fail_export_all || source.is_some_and(|t| state.fail_export_of.contains(t)) {
            return Err(server_error("export backend timeout"));
        }
        let body = state
            .bodies
            .get(handle.as_str())
            .ok_or_else(|| ServiceError::NotFound(handle.clone()))?;
        Ok(Bytes::from(format!("%PDF-1.4\n{body}")))
    }

    async fn delete(&self, handle: &DocumentHandle) -> Result<(), ServiceError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_delete {
            return Err(server_error("delete not permitted"));
        }
        if state.bodies.remove(handle.as_str()).is_none() {
            return Err(ServiceError::NotFound(handle.clone()));
        }
        state.deleted.push(handle.to_string());
        Ok(())
    }
}
