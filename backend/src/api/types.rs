//! REST API types for browser clients.
//!
//! Field names are camelCase. Each uploaded file gets its own entry so one
//! bad file is reported without hiding the others.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::FileFailure;
use crate::models::FileId;
use crate::transform::pipeline::{BatchReport, FileReport};

/// Overall or per-file status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Everything processed.
    Ready,
    /// Some files failed.
    Warning,
    /// Nothing could be processed.
    Error,
}

/// Response to `POST /api/upload`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Unique job identifier
    pub job_id: String,

    pub status: Status,

    /// One entry per uploaded file, in upload order
    pub files: Vec<FileEntry>,
}

/// Result for one uploaded file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub file_id: FileId,

    pub status: Status,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,

    /// Preview, cleaning report and chart data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<FileReport>,
}

/// Machine-readable error plus the message shown to the user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl From<&FileFailure> for ErrorBody {
    fn from(failure: &FileFailure) -> Self {
        Self {
            code: failure.error.code().to_string(),
            message: failure.to_string(),
        }
    }
}

impl From<Result<FileReport, FileFailure>> for FileEntry {
    fn from(result: Result<FileReport, FileFailure>) -> Self {
        match result {
            Ok(report) => FileEntry {
                file_id: report.file_id.clone(),
                status: Status::Ready,
                error: None,
                result: Some(report),
            },
            Err(failure) => FileEntry {
                file_id: failure.file_id.clone(),
                status: Status::Error,
                error: Some(ErrorBody::from(&failure)),
                result: None,
            },
        }
    }
}

/// Convert a batch into the upload response.
impl From<BatchReport> for UploadResponse {
    fn from(report: BatchReport) -> Self {
        let status = match (report.succeeded(), report.failed()) {
            (_, 0) => Status::Ready,
            (0, _) => Status::Error,
            _ => Status::Warning,
        };

        UploadResponse {
            job_id: Uuid::new_v4().to_string(),
            status,
            files: report.files.into_iter().map(FileEntry::from).collect(),
        }
    }
}

/// Create an error response
pub fn error_response(error: &str, code: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "code": code,
        "error": error,
        "files": []
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UploadedFile;
    use crate::transform::pipeline::{process_batch, PipelineOptions};

    #[test]
    fn test_mixed_batch_is_warning() {
        let files = vec![
            UploadedFile::new("data.txt", "x"),
            UploadedFile::new("ok.csv", "a,b\n1,2"),
        ];
        let response = UploadResponse::from(process_batch(&files, &PipelineOptions::default()));

        assert_eq!(response.status, Status::Warning);
        assert_eq!(response.files[0].status, Status::Error);
        assert_eq!(response.files[1].status, Status::Ready);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["files"][0]["error"]["code"], "UNSUPPORTED_FORMAT");
        assert!(json["files"][0]["error"]["message"]
            .as_str()
            .unwrap()
            .contains("data.txt"));
        assert!(json["files"][0].get("result").is_none());
        assert_eq!(json["files"][1]["result"]["preview"]["totalRows"], 1);
    }

    #[test]
    fn test_all_failed_is_error() {
        let files = vec![UploadedFile::new("a.pdf", "x")];
        let response = UploadResponse::from(process_batch(&files, &PipelineOptions::default()));
        assert_eq!(response.status, Status::Error);
    }

    #[test]
    fn test_error_response_shape() {
        let json = error_response("No file provided", "BAD_REQUEST");
        assert_eq!(json["status"], "error");
        assert_eq!(json["code"], "BAD_REQUEST");
        assert_eq!(json["error"], "No file provided");
        assert!(json["files"].as_array().unwrap().is_empty());
    }
}
