//! REST API request and response bodies.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::models::MetadataObject;
use crate::transform::pipeline::CreateMetadataReport;

/// Response to a metadata CSV upload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Job identifier; also the name of the output directory.
    pub job_id: Uuid,

    /// `"ready"` when nothing was reported, `"warning"` otherwise.
    pub status: String,

    pub report: CreateMetadataReport,
}

impl UploadResponse {
    pub fn new(job_id: Uuid, report: CreateMetadataReport) -> Self {
        let status = if report.is_clean() { "ready" } else { "warning" };
        Self {
            job_id,
            status: status.to_string(),
            report,
        }
    }
}

/// Body of `POST /api/validate`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRequest {
    pub objects: Vec<MetadataObject>,
    /// Attribute trait types every object is expected to carry.
    #[serde(default)]
    pub attributes: Vec<String>,
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
    })
}
