// Normalized Job Domain Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Adapter-specific metadata retained for diagnostics
pub type JobMetadata = BTreeMap<String, serde_json::Value>;

/// One scraped posting, the unit every site adapter yields.
///
/// `(source, external_id)` is the cross-run identity key. Adapters may leave
/// `source` empty: the run orchestrator overwrites it with the adapter slug.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedJob {
    /// Stable identifier from the upstream source
    pub external_id: String,
    pub title: String,
    pub company: String,
    /// HTML or plaintext description body
    pub description: String,
    /// Canonical URL for the posting
    pub source_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employment_type: Option<String>,

    /// Compensation bounds in minor currency units
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary_min: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary_max: Option<i64>,
    /// ISO-4217 code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posted_at: Option<DateTime<Utc>>,
    #[serde(default = "Utc::now")]
    pub scraped_at: DateTime<Utc>,

    /// Adapter slug, stamped by the orchestrator
    #[serde(default)]
    pub source: Option<String>,

    #[serde(default)]
    pub metadata: JobMetadata,
}

impl NormalizedJob {
    /// Create a job with the required fields; `scraped_at` is the capture time
    pub fn new(
        external_id: impl Into<String>,
        title: impl Into<String>,
        company: impl Into<String>,
        description: impl Into<String>,
        source_url: impl Into<String>,
    ) -> Self {
        Self {
            external_id: external_id.into(),
            title: title.into(),
            company: company.into(),
            description: description.into(),
            source_url: source_url.into(),
            location: None,
            remote: None,
            employment_type: None,
            salary_min: None,
            salary_max: None,
            currency: None,
            posted_at: None,
            scraped_at: Utc::now(),
            source: None,
            metadata: JobMetadata::new(),
        }
    }

    /// Fingerprint fallback chain: `external_id`, else `source_url`
    pub fn default_fingerprint(&self) -> &str {
        if self.external_id.is_empty() {
            &self.source_url
        } else {
            &self.external_id
        }
    }
}
