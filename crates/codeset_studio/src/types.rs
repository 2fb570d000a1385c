//! Core types shared by the studio components.

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{StudioError, StudioResult};

/// A page in a website proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageOutline {
    pub title: String,
    pub description: String,
    pub sections: Vec<String>,
}

/// Structured website proposal produced by the planning step.
///
/// Immutable once created; a build session holds one for the lifetime of a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub business_name: String,
    pub target_audience: String,
    pub suggested_style: String,
    pub pages: Vec<PageOutline>,
    pub color_palette: Vec<String>,
    pub copy_concepts: Vec<String>,
    /// Market trends gathered with search grounding
    #[serde(default)]
    pub market_insights: String,
}

impl Proposal {
    /// Short human-readable summary, one line per page.
    pub fn outline(&self) -> String {
        let mut lines = vec![format!(
            "{} ({} / {})",
            self.business_name, self.target_audience, self.suggested_style
        )];
        for page in &self.pages {
            lines.push(format!("  - {}: {}", page.title, page.description));
        }
        lines.join("\n")
    }
}

/// Inline image returned by the asset synthesis capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRef {
    pub mime_type: String,
    /// Base64-encoded image bytes
    pub data: String,
}

impl ImageRef {
    /// `data:` URL suitable for embedding in a preview document.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    /// Decode the image bytes.
    pub fn bytes(&self) -> StudioResult<Vec<u8>> {
        BASE64_STANDARD
            .decode(&self.data)
            .map_err(|e| StudioError::malformed(format!("image payload is not base64: {}", e)))
    }
}

/// Inline audio returned by the narration capability (base64 16-bit PCM).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioClip {
    pub mime_type: String,
    pub data: String,
}

impl AudioClip {
    /// Decode to floating-point samples.
    pub fn samples(&self) -> StudioResult<Vec<f32>> {
        crate::pcm::decode_base64_pcm16(&self.data)
    }
}

/// A single line of operator-visible progress narration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl fmt::Display for ActivityLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.timestamp.format("%H:%M:%S"), self.message)
    }
}

/// Append-only activity log, ordered by submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityLog {
    entries: Vec<ActivityLogEntry>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry stamped with the current time.
    pub fn push(&mut self, message: impl Into<String>) {
        self.entries.push(ActivityLogEntry {
            timestamp: Utc::now(),
            message: message.into(),
        });
    }

    pub fn entries(&self) -> &[ActivityLogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&ActivityLogEntry> {
        self.entries.last()
    }
}

/// Lifecycle of a build session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    /// No build started yet
    #[default]
    Idle,
    /// Initial file generation in flight
    Generating,
    /// Files available (possibly empty after a lenient failure)
    Completed,
    /// Revision request in flight
    Revising,
    /// Initial generation failed under the strict policy
    Failed,
}

impl BuildStatus {
    /// True while an upstream request owned by the session is outstanding.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Generating | Self::Revising)
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "Idle",
            Self::Generating => "Generating",
            Self::Completed => "Completed",
            Self::Revising => "Revising",
            Self::Failed => "Failed",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_proposal() -> Proposal {
        Proposal {
            business_name: "Torra".to_string(),
            target_audience: "Specialty coffee lovers".to_string(),
            suggested_style: "Warm minimalism".to_string(),
            pages: vec![PageOutline {
                title: "Home".to_string(),
                description: "Landing page".to_string(),
                sections: vec!["Hero".to_string(), "Roasts".to_string()],
            }],
            color_palette: vec!["#3b2314".to_string()],
            copy_concepts: vec!["Roasted on the Tagus".to_string()],
            market_insights: String::new(),
        }
    }

    #[test]
    fn test_proposal_camel_case() {
        let json = serde_json::to_value(sample_proposal()).unwrap();
        assert!(json.get("businessName").is_some());
        assert!(json.get("colorPalette").is_some());
        assert!(json.get("business_name").is_none());
    }

    #[test]
    fn test_proposal_outline() {
        let outline = sample_proposal().outline();
        assert!(outline.starts_with("Torra"));
        assert!(outline.contains("Home: Landing page"));
    }

    #[test]
    fn test_activity_log_is_ordered() {
        let mut log = ActivityLog::new();
        log.push("first");
        log.push("second");

        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[0].message, "first");
        assert!(log.entries()[0].timestamp <= log.entries()[1].timestamp);
        assert!(log.last().unwrap().to_string().ends_with("] second"));
    }

    #[test]
    fn test_image_ref_data_url() {
        let image = ImageRef {
            mime_type: "image/png".to_string(),
            data: "aGk=".to_string(),
        };
        assert_eq!(image.data_url(), "data:image/png;base64,aGk=");
        assert_eq!(image.bytes().unwrap(), b"hi");
    }

    #[test]
    fn test_status_busy() {
        assert!(BuildStatus::Generating.is_busy());
        assert!(BuildStatus::Revising.is_busy());
        assert!(!BuildStatus::Completed.is_busy());
        assert_eq!(BuildStatus::Failed.to_string(), "Failed");
    }
}
