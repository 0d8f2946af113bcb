//! HTTP surface for the digest service.
//!
//! A compact Axum router acting as the presentation shell:
//!
//! - `GET /` – Minimal upload form for browsers.
//! - `POST /digest` – Multipart upload (`file`, PDF only). Runs the pipeline and returns the
//!   summary, the translated text, chunk gaps, and the artifact file names as JSON.
//! - `POST /digest/view` – Same upload; renders the summary and the translation as an HTML page
//!   with download buttons for both texts.
//! - `POST /download/summary`, `POST /download/translation` – Form field `text`; responds with it
//!   as a `summary_<lang>.txt` / `translation_<lang>.txt` attachment.
//! - `GET /metrics` – Run and chunk counters.
//! - `GET /commands` – Machine-readable command catalog.
//!
//! Nothing is stored between requests. The result page embeds both texts in its download forms,
//! so saving an artifact never starts another run.

use crate::extraction::looks_like_pdf;
use crate::metrics::MetricsSnapshot;
use crate::processing::{
    DigestApi, DigestOutcome, PipelineError, summary_file_name, translation_file_name,
};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Form, Multipart, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

const PDF_CONTENT_TYPE: &str = "application/pdf";
const UPLOAD_FIELD: &str = "file";

/// Build the HTTP router exposing the digest API surface.
pub fn create_router<S>(service: Arc<S>, max_upload_bytes: usize) -> Router
where
    S: DigestApi + 'static,
{
    Router::new()
        .route("/", get(upload_form))
        .route("/digest", post(digest_document::<S>))
        .route("/digest/view", post(view_digest::<S>))
        .route("/download/summary", post(download_summary::<S>))
        .route("/download/translation", post(download_translation::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(service)
}

async fn upload_form() -> Html<&'static str> {
    Html(
        r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>PDF digest</title></head>
<body>
<h1>PDF digest</h1>
<p>Upload a PDF to receive a translated summary.</p>
<form method="post" action="/digest/view" enctype="multipart/form-data">
<input type="file" name="file" accept="application/pdf,.pdf" required>
<button type="submit">Digest</button>
</form>
</body>
</html>"#,
    )
}

/// Success response for `POST /digest`.
#[derive(Serialize)]
struct DigestResponse {
    run_id: String,
    document_sha256: String,
    summary: String,
    translated_text: String,
    summary_file: String,
    translation_file: String,
    source_chunks: usize,
    summary_chunks: usize,
    translation_gaps: Vec<usize>,
    summary_gaps: Vec<usize>,
    partial: bool,
}

impl DigestResponse {
    fn new(outcome: DigestOutcome, language: &str) -> Self {
        let partial = outcome.is_partial();
        Self {
            run_id: outcome.run_id,
            document_sha256: outcome.document_sha256,
            summary: outcome.summary,
            translated_text: outcome.translated_text,
            summary_file: summary_file_name(language),
            translation_file: translation_file_name(language),
            source_chunks: outcome.source_chunks,
            summary_chunks: outcome.summary_chunks,
            translation_gaps: outcome.translation_gaps,
            summary_gaps: outcome.summary_gaps,
            partial,
        }
    }
}

/// Run the pipeline over an uploaded PDF and return both texts as JSON.
async fn digest_document<S>(
    State(service): State<Arc<S>>,
    multipart: Multipart,
) -> Result<Json<DigestResponse>, AppError>
where
    S: DigestApi,
{
    let upload = read_upload(multipart).await?;
    let outcome = service.digest(upload.bytes).await?;
    tracing::info!(
        file = %upload.file_name,
        run_id = %outcome.run_id,
        partial = outcome.is_partial(),
        "Digest request completed"
    );
    Ok(Json(DigestResponse::new(outcome, service.target_language())))
}

/// Run the pipeline once and render both texts with their download forms.
async fn view_digest<S>(
    State(service): State<Arc<S>>,
    multipart: Multipart,
) -> Result<Html<String>, AppError>
where
    S: DigestApi,
{
    let upload = read_upload(multipart).await?;
    let outcome = service.digest(upload.bytes).await?;
    tracing::info!(
        file = %upload.file_name,
        run_id = %outcome.run_id,
        partial = outcome.is_partial(),
        "Digest view rendered"
    );
    Ok(Html(render_result_page(
        &upload.file_name,
        &outcome,
        service.target_language(),
    )))
}

fn render_result_page(file_name: &str, outcome: &DigestOutcome, language: &str) -> String {
    let notice = if outcome.is_partial() {
        format!(
            "<p><strong>Partial result.</strong> Failed translation chunks: {:?}; failed summary chunks: {:?}.</p>\n",
            outcome.translation_gaps, outcome.summary_gaps
        )
    } else {
        String::new()
    };
    format!(
        r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>PDF digest</title></head>
<body>
<h1>{title}</h1>
{notice}<h2>Summary</h2>
<pre>{summary}</pre>
{summary_form}
<details>
<summary>Translation</summary>
<pre>{translation}</pre>
</details>
{translation_form}
<p><a href="/">Digest another document</a></p>
</body>
</html>"#,
        title = escape_html(file_name),
        summary = escape_html(&outcome.summary),
        summary_form = download_form(
            "/download/summary",
            &summary_file_name(language),
            &outcome.summary
        ),
        translation = escape_html(&outcome.translated_text),
        translation_form = download_form(
            "/download/translation",
            &translation_file_name(language),
            &outcome.translated_text
        ),
    )
}

fn download_form(action: &str, file_name: &str, text: &str) -> String {
    format!(
        r#"<form method="post" action="{action}"><input type="hidden" name="text" value="{text}"><button type="submit">Download {file_name}</button></form>"#,
        text = escape_html(text),
        file_name = escape_html(file_name),
    )
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Body of a download form: the text already produced by a run.
#[derive(Deserialize)]
struct DownloadForm {
    text: String,
}

/// Return submitted summary text as a named attachment.
async fn download_summary<S>(
    State(service): State<Arc<S>>,
    Form(form): Form<DownloadForm>,
) -> Response
where
    S: DigestApi,
{
    text_attachment(summary_file_name(service.target_language()), form.text)
}

/// Return submitted translation text as a named attachment.
async fn download_translation<S>(
    State(service): State<Arc<S>>,
    Form(form): Form<DownloadForm>,
) -> Response
where
    S: DigestApi,
{
    text_attachment(translation_file_name(service.target_language()), form.text)
}

fn text_attachment(file_name: String, body: String) -> Response {
    (
        [
            (
                header::CONTENT_TYPE,
                "text/plain; charset=utf-8".to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        body,
    )
        .into_response()
}

struct Upload {
    file_name: String,
    bytes: Vec<u8>,
}

/// Pull the `file` field out of the multipart body and check that it is a PDF.
async fn read_upload(mut multipart: Multipart) -> Result<Upload, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::upload(err.status(), format!("Multipart error: {err}")))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload.pdf").to_string();
        let declared_pdf = field.content_type() == Some(PDF_CONTENT_TYPE)
            || file_name.to_lowercase().ends_with(".pdf");
        if !declared_pdf {
            return Err(AppError::upload(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                format!("'{file_name}' is not a PDF; only PDF uploads are accepted"),
            ));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|err| AppError::upload(err.status(), format!("Failed to read file: {err}")))?;
        if !looks_like_pdf(&bytes) {
            return Err(AppError::upload(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                format!("'{file_name}' does not carry a PDF header"),
            ));
        }

        tracing::debug!(file = %file_name, bytes = bytes.len(), "Received upload");
        return Ok(Upload {
            file_name,
            bytes: bytes.to_vec(),
        });
    }

    Err(AppError::upload(
        StatusCode::BAD_REQUEST,
        format!("Missing multipart field '{UPLOAD_FIELD}'"),
    ))
}

/// Return run and chunk counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: DigestApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery by tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "digest",
                method: "POST",
                path: "/digest",
                description: "Upload a PDF as multipart field 'file'; extracts, chunks, translates, and summarizes it. Returns the summary and translated text as JSON.",
            },
            CommandDescriptor {
                name: "view_digest",
                method: "POST",
                path: "/digest/view",
                description: "Upload a PDF as multipart field 'file'; renders the summary and translation as HTML with download buttons.",
            },
            CommandDescriptor {
                name: "download_summary",
                method: "POST",
                path: "/download/summary",
                description: "Submit form field 'text' and receive it as a summary_<lang>.txt attachment. Does not run the pipeline.",
            },
            CommandDescriptor {
                name: "download_translation",
                method: "POST",
                path: "/download/translation",
                description: "Submit form field 'text' and receive it as a translation_<lang>.txt attachment. Does not run the pipeline.",
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return run and chunk counters.",
            },
        ],
    })
}

enum AppError {
    Upload { status: StatusCode, message: String },
    Pipeline(PipelineError),
}

impl AppError {
    fn upload(status: StatusCode, message: String) -> Self {
        Self::Upload { status, message }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::Upload { status, message } => {
                tracing::warn!(%status, reason = %message, "Rejected upload");
                (status, Json(json!({ "error": message }))).into_response()
            }
            Self::Pipeline(error) => {
                let status = match &error {
                    PipelineError::Extraction(_) | PipelineError::EmptyDocument => {
                        StatusCode::UNPROCESSABLE_ENTITY
                    }
                    PipelineError::StageExhausted { .. } => StatusCode::BAD_GATEWAY,
                    PipelineError::Chunking(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (
                    status,
                    Json(json!({
                        "error": error.to_string(),
                        "stage": error.stage(),
                    })),
                )
                    .into_response()
            }
        }
    }
}

impl From<PipelineError> for AppError {
    fn from(inner: PipelineError) -> Self {
        Self::Pipeline(inner)
    }
}
