/// Request handlers and the page template

use std::path::PathBuf;

use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use log::{error, info, warn};
use serde::Serialize;

use super::AppState;
use crate::core::analyzer::AnalysisOutcome;
use crate::core::error::AnalyzerError;
use crate::utils::file_utils::{is_safe_file_name, sanitize_filename};

pub const INDEX_TEMPLATE_NAME: &str = "index";

pub const INDEX_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Data Analyzer</title>
    <style>
        body {
            font-family: Arial, sans-serif;
            line-height: 1.6;
            color: #333;
            max-width: 960px;
            margin: 0 auto;
            padding: 20px;
        }
        h1 {
            color: #2c3e50;
            border-bottom: 2px solid #3498db;
            padding-bottom: 10px;
        }
        .flash {
            padding: 10px 15px;
            border-radius: 5px;
            margin-bottom: 20px;
        }
        .flash.success { background-color: #e8f8ee; }
        .flash.error { background-color: #fbeaea; }
        .reports li { padding: 5px 0; }
        .plot img { max-width: 100%; border: 1px solid #eee; }
    </style>
</head>
<body>
    <h1>Data Analyzer</h1>

    {{#if flash}}
    <div class="flash {{flash.kind}}">{{flash.message}}</div>
    {{/if}}

    <form action="/upload" method="post" enctype="multipart/form-data">
        <input type="file" name="file" accept=".csv,.xls,.xlsx,.json,.txt,.pdf">
        <button type="submit">Upload and analyze</button>
    </form>

    {{#if reports}}
    <h2>Reports</h2>
    <ul class="reports">
        {{#each reports}}
        <li><a href="/download/{{this}}">{{this}}</a></li>
        {{/each}}
    </ul>
    {{/if}}

    {{#if plot_url}}
    <h2>Missing Values</h2>
    <div class="plot"><img src="{{plot_url}}" alt="Missing value heatmap"></div>
    {{/if}}
</body>
</html>
"#;

const FLASH_COOKIE: &str = "flash";
const UPLOAD_SUCCESS: &str = "File uploaded and analyzed successfully!";

/// Messages carried across a redirect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flash {
    NoFilePart,
    NoFileSelected,
}

impl Flash {
    pub fn code(self) -> &'static str {
        match self {
            Flash::NoFilePart => "no_file_part",
            Flash::NoFileSelected => "no_file_selected",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "no_file_part" => Some(Flash::NoFilePart),
            "no_file_selected" => Some(Flash::NoFileSelected),
            _ => None,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Flash::NoFilePart => "No file part",
            Flash::NoFileSelected => "No file selected",
        }
    }
}

#[derive(Debug, Serialize)]
struct FlashView {
    message: String,
    kind: &'static str,
}

#[derive(Debug, Default, Serialize)]
struct PageContext {
    flash: Option<FlashView>,
    reports: Vec<String>,
    plot_url: Option<String>,
}

impl PageContext {
    fn success(message: &str) -> Self {
        Self {
            flash: Some(FlashView { message: message.to_string(), kind: "success" }),
            ..Self::default()
        }
    }

    fn error(message: String) -> Self {
        Self {
            flash: Some(FlashView { message, kind: "error" }),
            ..Self::default()
        }
    }
}

fn render_page(state: &AppState, status: StatusCode, context: &PageContext) -> Response {
    match state.templates.render(INDEX_TEMPLATE_NAME, context) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            error!("Failed to render page: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render page").into_response()
        }
    }
}

fn read_flash_cookie(headers: &HeaderMap) -> Option<Flash> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == FLASH_COOKIE)
        .and_then(|(_, code)| Flash::from_code(code))
}

fn flash_redirect(flash: Flash) -> Response {
    let cookie = format!("{}={}; Path=/; Max-Age=60; HttpOnly; SameSite=Lax", FLASH_COOKIE, flash.code());
    ([(header::SET_COOKIE, cookie)], Redirect::to("/")).into_response()
}

/// `GET /`: the upload form, with any pending flash message
pub async fn index(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(flash) = read_flash_cookie(&headers) else {
        return render_page(&state, StatusCode::OK, &PageContext::default());
    };

    let page = render_page(&state, StatusCode::OK, &PageContext::error(flash.message().to_string()));
    let clear = format!("{}=; Path=/; Max-Age=0", FLASH_COOKIE);
    ([(header::SET_COOKIE, clear)], page).into_response()
}

/// Pull the `file` part out of the form
///
/// `Ok(None)` when the form has no such part; `Err` carries the response
/// for a body that could not be read.
async fn take_file_part(multipart: &mut Multipart) -> Result<Option<(String, Bytes)>, Response> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Ok(None),
            Err(e) => {
                warn!("Malformed multipart body: {}", e);
                return Ok(None);
            }
        };

        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        return match field.bytes().await {
            Ok(bytes) => Ok(Some((file_name, bytes))),
            Err(e) => {
                warn!("Failed to read upload: {}", e);
                Err((e.status(), e.body_text()).into_response())
            }
        };
    }
}

fn plot_url(outcome: &AnalysisOutcome) -> Option<String> {
    let name = outcome.plot_path.file_name()?.to_string_lossy().to_string();
    // cache buster, the web flow always rewrites the same file
    Some(format!("/static/{}?v={}", name, outcome.metadata.sha256))
}

/// `POST /upload`: save the file, analyze it, show the results
pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(e) => {
            warn!("Upload without a multipart body: {}", e);
            return flash_redirect(Flash::NoFilePart);
        }
    };

    let (file_name, bytes) = match take_file_part(&mut multipart).await {
        Ok(Some(part)) => part,
        Ok(None) => return flash_redirect(Flash::NoFilePart),
        Err(response) => return response,
    };

    if file_name.is_empty() {
        return flash_redirect(Flash::NoFileSelected);
    }

    let safe_name = sanitize_filename(&file_name);
    let saved_path: PathBuf = state.config.upload_folder.join(&safe_name);
    if let Err(e) = tokio::fs::write(&saved_path, &bytes).await {
        error!("Failed to save upload {}: {}", saved_path.display(), e);
        let context = PageContext::error(format!("Failed to save upload: {}", e));
        return render_page(&state, StatusCode::INTERNAL_SERVER_ERROR, &context);
    }
    info!("Saved upload {} ({} bytes)", saved_path.display(), bytes.len());

    let analyzer = state.analyzer.clone();
    let analysis = tokio::task::spawn_blocking(move || analyzer.analyze_file(&saved_path)).await;

    match analysis {
        Ok(Ok(outcome)) => {
            let context = PageContext {
                reports: outcome.reports.file_names(),
                plot_url: plot_url(&outcome),
                ..PageContext::success(UPLOAD_SUCCESS)
            };
            render_page(&state, StatusCode::OK, &context)
        }
        Ok(Err(e)) => {
            let is_input_error = e
                .downcast_ref::<AnalyzerError>()
                .map_or(false, AnalyzerError::is_input_error);
            let status = if is_input_error {
                StatusCode::UNPROCESSABLE_ENTITY
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            error!("Analysis of {} failed: {:#}", safe_name, e);
            render_page(&state, status, &PageContext::error(format!("{:#}", e)))
        }
        Err(e) => {
            error!("Analysis task failed: {}", e);
            let context = PageContext::error("Analysis task failed".to_string());
            render_page(&state, StatusCode::INTERNAL_SERVER_ERROR, &context)
        }
    }
}

/// `GET /download/:filename`: a file from the upload folder, as an attachment
pub async fn download(State(state): State<AppState>, Path(filename): Path<String>) -> Response {
    if !is_safe_file_name(&filename) {
        warn!("Rejected download of {:?}", filename);
        return StatusCode::NOT_FOUND.into_response();
    }

    let path = state.config.upload_folder.join(&filename);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(_) => return StatusCode::NOT_FOUND.into_response(),
    };

    let content_type = mime_guess::from_path(&path).first_or_octet_stream().to_string();
    let disposition = format!("attachment; filename=\"{}\"", filename);

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type), (header::CONTENT_DISPOSITION, disposition)],
        bytes,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::web::router;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use axum::Router;
    use tower::ServiceExt;

    const BOUNDARY: &str = "----analyzer-test-boundary";

    fn test_app(root: &std::path::Path) -> (Router, AppConfig) {
        let config = AppConfig {
            upload_folder: root.join("uploads"),
            static_folder: root.join("static"),
            ..AppConfig::default()
        };
        config.ensure_dirs().unwrap();
        let app = router(AppState::new(config.clone()).unwrap());
        (app, config)
    }

    fn multipart_request(file_name: &str, content: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/upload")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn set_cookie(response: &Response) -> String {
        response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }

    #[test]
    fn test_flash_codes() {
        for flash in [Flash::NoFilePart, Flash::NoFileSelected] {
            assert_eq!(Flash::from_code(flash.code()), Some(flash));
        }
        assert_eq!(Flash::from_code("other"), None);
    }

    #[tokio::test]
    async fn test_index_renders_form() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = test_app(dir.path());

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(set_cookie(&response).is_empty());
        let html = body_text(response).await;
        assert!(html.contains("action=\"/upload\""));
        assert!(!html.contains("class=\"flash"));
    }

    #[tokio::test]
    async fn test_index_shows_and_clears_flash() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = test_app(dir.path());

        let request = Request::builder()
            .uri("/")
            .header(header::COOKIE, "theme=dark; flash=no_file_selected")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(set_cookie(&response).contains("Max-Age=0"));
        assert!(body_text(response).await.contains("No file selected"));
    }

    #[tokio::test]
    async fn test_upload_without_multipart_redirects() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = test_app(dir.path());

        let request = Request::builder()
            .method("POST")
            .uri("/upload")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/");
        assert!(set_cookie(&response).starts_with("flash=no_file_part"));
    }

    #[tokio::test]
    async fn test_upload_with_empty_file_name_redirects() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = test_app(dir.path());

        let response = app.oneshot(multipart_request("", b"")).await.unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(set_cookie(&response).starts_with("flash=no_file_selected"));
    }

    #[tokio::test]
    async fn test_upload_analyzes_file() {
        let dir = tempfile::tempdir().unwrap();
        let (app, config) = test_app(dir.path());

        let response = app
            .oneshot(multipart_request("my data.csv", b"a,b\n1,x\n2,\n"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains(UPLOAD_SUCCESS));
        assert!(html.contains("/download/report_"));
        assert!(html.contains("/static/plot.png"));
        assert!(config.upload_folder.join("my_data.csv").is_file());
        assert!(config.static_folder.join("plot.png").is_file());
    }

    #[tokio::test]
    async fn test_upload_unsupported_format() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = test_app(dir.path());

        let response = app.oneshot(multipart_request("tool.exe", b"MZ")).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_text(response).await.contains("Unsupported file format!"));
    }

    #[tokio::test]
    async fn test_download() {
        let dir = tempfile::tempdir().unwrap();
        let (app, config) = test_app(dir.path());
        std::fs::write(config.upload_folder.join("report_1.txt"), "Shape: (1, 1)\n").unwrap();

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/download/report_1.txt").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"report_1.txt\""
        );
        assert_eq!(body_text(response).await, "Shape: (1, 1)\n");

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/download/missing.txt").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .oneshot(Request::builder().uri("/download/..secret").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
