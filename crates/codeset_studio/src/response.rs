//! Parsing and validation of generation-service payloads.
//!
//! Every function here turns raw model text into a typed value or a
//! `MalformedResponse`. Nothing is ever coerced into a default object: empty
//! text, invalid JSON and JSON missing required fields are all failures.

use std::sync::OnceLock;

use jsonschema::JSONSchema;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{StudioError, StudioResult};
use crate::files::{FileRecord, FileSet, GeneratedSite, PREVIEW_FILE_NAME};
use crate::types::Proposal;

/// JSON Schema for a website proposal.
///
/// Sent to the service as the response constraint and used locally to
/// validate what comes back.
pub fn proposal_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "businessName": { "type": "string", "minLength": 1 },
            "targetAudience": { "type": "string" },
            "suggestedStyle": { "type": "string" },
            "pages": {
                "type": "array",
                "minItems": 1,
                "items": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string" },
                        "description": { "type": "string" },
                        "sections": { "type": "array", "items": { "type": "string" } }
                    },
                    "required": ["title", "description", "sections"]
                }
            },
            "colorPalette": { "type": "array", "items": { "type": "string" } },
            "copyConcepts": { "type": "array", "items": { "type": "string" } },
            "marketInsights": {
                "type": "string",
                "description": "Real-time market trends gathered from search grounding."
            }
        },
        "required": [
            "businessName",
            "targetAudience",
            "suggestedStyle",
            "pages",
            "colorPalette",
            "copyConcepts"
        ]
    })
}

fn proposal_validator() -> &'static Result<JSONSchema, String> {
    static VALIDATOR: OnceLock<Result<JSONSchema, String>> = OnceLock::new();
    VALIDATOR.get_or_init(|| {
        let schema = proposal_schema();
        JSONSchema::compile(&schema).map_err(|e| e.to_string())
    })
}

fn fence_pattern() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| Regex::new(r"(?s)^\s*```[A-Za-z0-9_-]*\s*\n(.*?)\n?\s*```\s*$").ok())
        .as_ref()
}

/// Strip a surrounding Markdown code fence, if present.
pub fn strip_code_fence(text: &str) -> &str {
    let inner = fence_pattern()
        .and_then(|re| re.captures(text))
        .and_then(|c| c.get(1));
    match inner {
        Some(inner) => inner.as_str(),
        None => text.trim(),
    }
}

/// Parse model text as a JSON value, failing on empty or invalid input.
pub fn parse_json_text(text: &str) -> StudioResult<Value> {
    let body = strip_code_fence(text);
    if body.trim().is_empty() {
        return Err(StudioError::malformed("empty response text"));
    }
    serde_json::from_str(body).map_err(|e| StudioError::malformed(format!("invalid JSON: {}", e)))
}

/// Parse and validate a website proposal.
pub fn parse_proposal(text: &str) -> StudioResult<Proposal> {
    let value = parse_json_text(text)?;

    let validator = proposal_validator()
        .as_ref()
        .map_err(|e| StudioError::malformed(format!("proposal schema unavailable: {}", e)))?;
    if let Err(errors) = validator.validate(&value) {
        let details: Vec<String> = errors
            .map(|e| {
                let path = e.instance_path.to_string();
                if path.is_empty() {
                    e.to_string()
                } else {
                    format!("{}: {}", path, e)
                }
            })
            .collect();
        return Err(StudioError::malformed(format!(
            "proposal failed validation: {}",
            details.join("; ")
        )));
    }

    serde_json::from_value(value)
        .map_err(|e| StudioError::malformed(format!("proposal has unexpected shape: {}", e)))
}

#[derive(Debug, Deserialize)]
struct FilesPayload {
    files: Vec<RawFile>,
}

#[derive(Debug, Deserialize)]
struct RawFile {
    name: String,
    content: String,
    #[serde(default)]
    language: Option<String>,
}

/// Parse a `{"files": [...]}` payload into a file set.
///
/// The preview document, if present, is kept in the set; callers decide
/// whether to split it out.
pub fn parse_file_set(text: &str) -> StudioResult<FileSet> {
    let value = parse_json_text(text)?;
    let payload: FilesPayload = serde_json::from_value(value)
        .map_err(|e| StudioError::malformed(format!("file payload has unexpected shape: {}", e)))?;

    let records = payload
        .files
        .into_iter()
        .map(|raw| {
            let mut record = FileRecord::new(raw.name, raw.content);
            if let Some(language) = raw.language.filter(|l| !l.trim().is_empty()) {
                record.language = language;
            }
            record
        })
        .collect();

    FileSet::new(records)
}

/// Parse the initial generation payload and separate the preview document.
pub fn parse_generated_site(text: &str) -> StudioResult<GeneratedSite> {
    let mut files = parse_file_set(text)?;
    let preview = files
        .take(PREVIEW_FILE_NAME)
        .ok_or_else(|| StudioError::malformed(format!("response is missing {}", PREVIEW_FILE_NAME)))?;

    if files.is_empty() {
        return Err(StudioError::malformed("response contains no source files"));
    }

    Ok(GeneratedSite {
        source_files: files,
        preview_document: preview.content,
    })
}
