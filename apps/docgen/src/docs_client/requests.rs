//! Wire types for the Docs and Drive REST APIs.

use serde::{Deserialize, Serialize};

use super::TextReplacement;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct BatchUpdateRequest<'a> {
    requests: Vec<UpdateRequest<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    replace_all_text: ReplaceAllText<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplaceAllText<'a> {
    contains_text: SubstringMatchCriteria<'a>,
    replace_text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubstringMatchCriteria<'a> {
    text: &'a str,
    match_case: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct BatchUpdateResponse {
    #[serde(default)]
    replies: Vec<Reply>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Reply {
    replace_all_text: Option<ReplaceAllTextReply>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplaceAllTextReply {
    // Omitted by the API when nothing matched.
    #[serde(default)]
    occurrences_changed: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct DocumentMeta {
    pub document_id: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct DriveFile {
    pub id: String,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    error: GoogleErrorBody,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    message: String,
}

pub(super) fn batch_update_body(replacements: &[TextReplacement]) -> BatchUpdateRequest<'_> {
    BatchUpdateRequest {
        requests: replacements
            .iter()
            .map(|r| UpdateRequest {
                replace_all_text: ReplaceAllText {
                    contains_text: SubstringMatchCriteria {
                        text: &r.pattern,
                        match_case: true,
                    },
                    replace_text: &r.replacement,
                },
            })
            .collect(),
    }
}

/// One count per submitted replacement, in request order.
pub(super) fn occurrences_changed(response: &BatchUpdateResponse, expected: usize) -> Vec<u32> {
    let mut counts: Vec<u32> = response
        .replies
        .iter()
        .map(|reply| {
            reply
                .replace_all_text
                .as_ref()
                .map_or(0, |r| r.occurrences_changed)
        })
        .collect();
    counts.resize(expected, 0);
    counts
}

/// Extracts `error.message` from a Google error body, falling back to the raw body.
pub(super) fn api_error_message(body: &str) -> String {
    serde_json::from_str::<GoogleError>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}
