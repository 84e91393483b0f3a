//! HTTP Server for the Tabshift API.
//!
//! Provides REST endpoints for uploading, previewing and converting tables.
//! Rendering previews and charts is left to the browser client.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                                  |
//! |--------|-------------------|----------------------------------------------|
//! | GET    | `/health`         | Health check                                 |
//! | POST   | `/api/upload`     | Upload CSV/XLSX files for preview & cleaning |
//! | POST   | `/api/convert`    | Upload one file, download it converted       |
//! | GET    | `/api/logs`       | SSE stream for real-time logs                |
//!
//! Both POST endpoints take `multipart/form-data` with one or more `file`
//! fields, an optional `options` field holding [`CleaningOptions`] as JSON,
//! and (for `/api/convert`) a `format` field, `csv` or `xlsx`.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::LOG_BROADCASTER;
use super::types::{error_response, UploadResponse};
use crate::config::AppConfig;
use crate::error::{ExportError, LoadError, PipelineError, ServerError, ServerResult};
use crate::models::{CleaningOptions, ExportArtifact, ExportFormat, UploadedFile};
use crate::transform::pipeline::{process_batch, process_file, PipelineOptions};

/// Room for multipart boundaries and the non-file fields.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
}

/// Build the application router.
pub fn router(config: AppConfig) -> Router {
    let body_limit = config.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD);

    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/upload", post(upload))
        .route("/api/convert", post(convert))
        .route("/api/logs", get(sse_logs))
        .with_state(AppState {
            config: Arc::new(config),
        })
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
}

/// Start the HTTP server
pub async fn start_server(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let port = config.port;
    let max_mb = config.max_upload_bytes / (1024 * 1024);
    let app = router(config);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Tabshift server running on http://localhost:{}", port);
    println!("   POST /api/upload  - Upload CSV/XLSX files for preview");
    println!("   POST /api/convert - Convert one file to CSV or XLSX");
    println!("   GET  /api/logs    - SSE log stream");
    println!("   GET  /health      - Health check");
    println!("   Upload limit: {} MB", max_mb);
    println!();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "tabshift",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "upload": "POST /api/upload",
            "convert": "POST /api/convert",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        // Lagged receivers skip what they missed
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

// =============================================================================
// Multipart form
// =============================================================================

/// Fields collected from a multipart upload.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub files: Vec<UploadedFile>,
    pub options: CleaningOptions,
    pub format: Option<ExportFormat>,
}

impl UploadForm {
    /// Record one multipart field. Unknown field names are ignored.
    pub fn add_field(
        &mut self,
        name: &str,
        file_name: Option<&str>,
        data: Vec<u8>,
    ) -> ServerResult<()> {
        match name {
            "file" | "files" => {
                let file_name = file_name.unwrap_or("upload").to_string();
                self.files.push(UploadedFile::new(file_name, data));
            }
            "options" => {
                self.options = serde_json::from_slice(&data)
                    .map_err(|e| ServerError::BadRequest(format!("Invalid options: {}", e)))?;
            }
            "format" => {
                let value = String::from_utf8_lossy(&data);
                self.format = Some(value.parse().map_err(ServerError::BadRequest)?);
            }
            _ => {}
        }
        Ok(())
    }
}

async fn read_form(mut multipart: Multipart) -> ServerResult<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        let file_name = field.file_name().map(|s| s.to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
        form.add_field(&name, file_name.as_deref(), data.to_vec())?;
    }

    Ok(form)
}

// =============================================================================
// Handlers
// =============================================================================

/// Upload endpoint: preview every file
async fn upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, ServerError> {
    let form = read_form(multipart).await?;
    Ok(Json(upload_response(form, &state.config)?))
}

/// Convert endpoint: download one file in another format
async fn convert(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ServerError> {
    let form = read_form(multipart).await?;
    convert_response(form, &state.config)
}

/// Run the batch behind `/api/upload`.
pub fn upload_response(form: UploadForm, config: &AppConfig) -> ServerResult<UploadResponse> {
    if form.files.is_empty() {
        return Err(ServerError::BadRequest("No file provided".to_string()));
    }

    print_banner(&format!("📄 NEW UPLOAD: {} file(s)", form.files.len()));

    let options = PipelineOptions::from_config(config).with_cleaning(form.options);
    let report = process_batch(&form.files, &options);

    print_banner(&format!(
        "📊 SUMMARY: {} processed, {} failed",
        report.succeeded(),
        report.failed()
    ));

    Ok(UploadResponse::from(report))
}

/// Run the conversion behind `/api/convert`.
pub fn convert_response(form: UploadForm, config: &AppConfig) -> ServerResult<Response> {
    let format = form
        .format
        .ok_or_else(|| ServerError::BadRequest("No target format provided".to_string()))?;

    let file = match form.files.as_slice() {
        [file] => file,
        [] => return Err(ServerError::BadRequest("No file provided".to_string())),
        _ => {
            return Err(ServerError::BadRequest(
                "Convert one file per request".to_string(),
            ))
        }
    };

    print_banner(&format!("🔄 CONVERT: {} → {}", file.name, format));

    let options = PipelineOptions::from_config(config)
        .with_cleaning(form.options)
        .with_export(format);
    let report = process_file(file, 0, &options)?;
    let artifact = report
        .export
        .ok_or_else(|| ServerError::Internal("export produced no output".to_string()))?;

    download_response(artifact)
}

/// Attachment response carrying the export bytes.
pub fn download_response(artifact: ExportArtifact) -> ServerResult<Response> {
    let disposition = format!(
        "attachment; filename=\"{}\"",
        header_safe_file_name(&artifact.file_name)
    );
    let disposition = HeaderValue::from_str(&disposition)
        .map_err(|e| ServerError::Internal(format!("Invalid file name header: {}", e)))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(artifact.mime_type)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        artifact.bytes,
    )
        .into_response())
}

/// Printable ASCII only, without quotes or backslashes.
fn header_safe_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect()
}

fn print_banner(title: &str) {
    println!("\n{}", "=".repeat(70));
    println!("{}", title);
    println!("{}\n", "=".repeat(70));
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::File(failure) if failure.error.is_unsupported_format() => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            ServerError::File(failure) => match &failure.error {
                PipelineError::Load(LoadError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
                PipelineError::Export(ExportError::TooLarge { .. }) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                PipelineError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::UNPROCESSABLE_ENTITY,
            },
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        eprintln!("❌ {}", self);
        let body = error_response(&self.to_string(), self.code());
        (self.status_code(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CSV_MIME, XLSX_MIME};

    fn form_with(files: Vec<UploadedFile>) -> UploadForm {
        UploadForm {
            files,
            ..UploadForm::default()
        }
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[test]
    fn test_form_fields() {
        let mut form = UploadForm::default();
        form.add_field("file", Some("a.csv"), b"x\n1".to_vec()).unwrap();
        form.add_field("file", Some("a.csv"), b"y\n2".to_vec()).unwrap();
        form.add_field("options", None, br#"{"fillMissingNumeric":true}"#.to_vec())
            .unwrap();
        form.add_field("format", None, b"XLSX".to_vec()).unwrap();
        form.add_field("ignored", None, b"whatever".to_vec()).unwrap();

        assert_eq!(form.files.len(), 2);
        assert!(form.options.fill_missing_numeric);
        assert_eq!(form.format, Some(ExportFormat::Xlsx));
    }

    #[test]
    fn test_form_rejects_bad_values() {
        let mut form = UploadForm::default();
        assert!(matches!(
            form.add_field("options", None, b"{not json".to_vec()),
            Err(ServerError::BadRequest(_))
        ));
        assert!(matches!(
            form.add_field("format", None, b"pdf".to_vec()),
            Err(ServerError::BadRequest(_))
        ));
    }

    #[test]
    fn test_upload_requires_file() {
        let err = upload_response(UploadForm::default(), &AppConfig::default()).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_upload_batch() {
        let form = form_with(vec![
            UploadedFile::new("data.txt", "a\n1"),
            UploadedFile::new("scores.csv", "name,score\nAlice,10"),
        ]);
        let response = upload_response(form, &AppConfig::default()).unwrap();

        assert_eq!(response.files.len(), 2);
        assert!(response.files[0].error.is_some());
        assert!(response.files[1].result.is_some());
    }

    #[tokio::test]
    async fn test_convert_to_csv() {
        let mut form = form_with(vec![UploadedFile::new(
            "scores.csv",
            "name,score\nAlice,10\nBob,\nAlice,10",
        )]);
        form.options = CleaningOptions {
            remove_duplicates: true,
            fill_missing_numeric: true,
            keep_columns: None,
        };
        form.format = Some(ExportFormat::Csv);

        let response = convert_response(form, &AppConfig::default()).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], CSV_MIME);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"scores.csv\""
        );
        assert_eq!(body_bytes(response).await, b"name,score\nAlice,10\nBob,10\n");
    }

    #[tokio::test]
    async fn test_convert_to_xlsx() {
        let mut form = form_with(vec![UploadedFile::new("data.csv", "a,b\n1,x")]);
        form.format = Some(ExportFormat::Xlsx);

        let response = convert_response(form, &AppConfig::default()).unwrap();
        assert_eq!(response.headers()[header::CONTENT_TYPE], XLSX_MIME);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"data.xlsx\""
        );
        let bytes = body_bytes(response).await;
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_convert_errors() {
        let config = AppConfig::default();

        let mut no_format = form_with(vec![UploadedFile::new("a.csv", "a\n1")]);
        no_format.format = None;
        let err = convert_response(no_format, &config).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let mut unsupported = form_with(vec![UploadedFile::new("data.txt", "a\n1")]);
        unsupported.format = Some(ExportFormat::Csv);
        let err = convert_response(unsupported, &config).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(err.code(), "UNSUPPORTED_FORMAT");

        let mut two = form_with(vec![
            UploadedFile::new("a.csv", "a\n1"),
            UploadedFile::new("b.csv", "a\n1"),
        ]);
        two.format = Some(ExportFormat::Csv);
        assert!(matches!(
            convert_response(two, &config),
            Err(ServerError::BadRequest(_))
        ));
    }

    #[test]
    fn test_too_large_status() {
        let config = AppConfig {
            max_upload_bytes: 3,
            ..AppConfig::default()
        };
        let mut form = form_with(vec![UploadedFile::new("a.csv", "a\n1\n2")]);
        form.format = Some(ExportFormat::Csv);
        let err = convert_response(form, &config).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_header_safe_file_name() {
        assert_eq!(header_safe_file_name("my \"report\".csv"), "my _report_.csv");
        assert_eq!(header_safe_file_name("données.csv"), "donn_es.csv");
    }
}
