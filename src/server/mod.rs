//! Development server with on-demand generation and preview mode

use anyhow::Result;
use axum::{
    body::Body,
    extract::{Query, State},
    http::{Request, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use percent_encoding::percent_decode_str;
use serde::Deserialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, RwLock};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::cms::Backend;
use crate::error::BlogError;
use crate::generator::{Generator, RenderMode};
use crate::helpers::url_for;
use crate::Blog;

/// How long a request waits for on-demand generation before it gets the
/// fallback page
const ON_DEMAND_WAIT: Duration = Duration::from_secs(3);

/// Result of one on-demand generation
#[derive(Debug, Clone, PartialEq, Eq)]
enum Outcome {
    Ready,
    NotFound,
    Failed(StatusCode),
}

/// Server state
pub struct ServerState {
    generator: Generator<Backend>,
    /// Ref of the content being previewed, if preview mode is on
    preview: RwLock<Option<String>>,
    /// Slugs being generated, with the channel their outcome arrives on
    in_flight: Mutex<HashMap<String, watch::Receiver<Option<Outcome>>>>,
}

impl ServerState {
    pub fn new(generator: Generator<Backend>) -> Self {
        Self {
            generator,
            preview: RwLock::new(None),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Current preview ref
    pub async fn preview_ref(&self) -> Option<String> {
        self.preview.read().await.clone()
    }
}

/// Start the development server
pub async fn start(blog: &Blog, ip: &str, port: u16) -> Result<()> {
    let source = blog.content_source()?;
    let generator = Generator::new(blog, Arc::new(source))?;
    let state = Arc::new(ServerState::new(generator));

    let app = router(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    println!("Server running at http://{}:{}", ip, port);
    println!("Press Ctrl+C to stop.");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Routes of the development server
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/api/preview", get(preview_handler))
        .route("/api/exit-preview", get(exit_preview_handler))
        .fallback(fallback_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct PreviewParams {
    token: Option<String>,
    #[serde(rename = "documentId")]
    document_id: Option<String>,
}

/// Enter preview mode and redirect to the previewed document
async fn preview_handler(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<PreviewParams>,
) -> Response {
    let Some(token) = params.token.filter(|t| !t.is_empty()) else {
        return (StatusCode::BAD_REQUEST, "Missing preview token").into_response();
    };

    *state.preview.write().await = Some(token.clone());
    tracing::info!("Entered preview mode");

    let config = &state.generator.blog().config;
    let mut location = url_for(config, "");

    if let Some(id) = params.document_id.filter(|id| !id.is_empty()) {
        let loader = state.generator.loader(&RenderMode::preview(token));
        match loader.get_by_id(&id).await {
            Ok(post) => location = url_for(config, &post.path()),
            Err(e) => tracing::warn!("Could not resolve previewed document {}: {}", id, e),
        }
    }

    Redirect::temporary(&location).into_response()
}

/// Leave preview mode
async fn exit_preview_handler(State(state): State<Arc<ServerState>>) -> Response {
    *state.preview.write().await = None;
    tracing::info!("Exited preview mode");
    Redirect::temporary(&url_for(&state.generator.blog().config, "")).into_response()
}

/// Serves pages: previews on the fly, unbuilt posts on demand, the rest
/// from the public directory
async fn fallback_handler(
    State(state): State<Arc<ServerState>>,
    request: Request<Body>,
) -> Response {
    let path = request.uri().path().to_string();

    if let Some(reference) = state.preview_ref().await {
        let mode = RenderMode::preview(reference);
        if let Some(slug) = post_slug(&path) {
            return html_or_error(state.generator.render_post(&slug, &mode).await, &path);
        }
        if let Some(page) = listing_page(&path) {
            return html_or_error(state.generator.render_listing(page, &mode).await, &path);
        }
    }

    if let Some(slug) = post_slug(&path) {
        match state.generator.post_file(&slug) {
            Ok(file) if !file.exists() => return generate_on_demand(state.clone(), slug).await,
            Ok(_) => {}
            Err(_) => return (StatusCode::NOT_FOUND, "Not found").into_response(),
        }
    }

    serve_file(&state, request).await
}

/// Generate an unbuilt post, waiting a short while for it. Concurrent
/// requests for the same slug share one generation.
async fn generate_on_demand(state: Arc<ServerState>, slug: String) -> Response {
    let mut outcome_rx = {
        let mut in_flight = state.in_flight.lock().await;
        // a closed channel means the generation task died without reporting
        match in_flight.get(&slug).filter(|rx| rx.has_changed().is_ok()) {
            Some(rx) => rx.clone(),
            None => {
                let (tx, rx) = watch::channel(None);
                in_flight.insert(slug.clone(), rx.clone());

                let state = state.clone();
                let slug = slug.clone();
                tokio::spawn(async move {
                    let outcome = match state.generator.generate_post(&slug).await {
                        Ok(_) => Outcome::Ready,
                        Err(e) => {
                            tracing::warn!("On-demand generation of '{}' failed: {}", slug, e);
                            match status_for(&e) {
                                StatusCode::NOT_FOUND => Outcome::NotFound,
                                status => Outcome::Failed(status),
                            }
                        }
                    };
                    let _ = tx.send(Some(outcome));
                    state.in_flight.lock().await.remove(&slug);
                });
                rx
            }
        }
    };

    let waited = tokio::time::timeout(
        ON_DEMAND_WAIT,
        outcome_rx.wait_for(|outcome| outcome.is_some()),
    );

    let outcome = match waited.await {
        Ok(Ok(outcome)) => outcome.clone(),
        Ok(Err(_)) => Some(Outcome::Failed(StatusCode::INTERNAL_SERVER_ERROR)),
        Err(_) => {
            tracing::debug!("'{}' still generating, serving fallback page", slug);
            return html_or_error(state.generator.render_fallback(&RenderMode::published()), &slug);
        }
    };

    match outcome {
        Some(Outcome::Ready) => match state.generator.post_file(&slug) {
            Ok(file) => match tokio::fs::read_to_string(&file).await {
                Ok(html) => Html(html).into_response(),
                Err(_) => (StatusCode::NOT_FOUND, "Not found").into_response(),
            },
            Err(_) => (StatusCode::NOT_FOUND, "Not found").into_response(),
        },
        Some(Outcome::NotFound) => (StatusCode::NOT_FOUND, "Not found").into_response(),
        Some(Outcome::Failed(status)) => (status, "Failed to generate page").into_response(),
        None => (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response(),
    }
}

async fn serve_file(state: &ServerState, request: Request<Body>) -> Response {
    let mut service =
        ServeDir::new(&state.generator.blog().public_dir).append_index_html_on_directories(true);
    match service.try_call(request).await {
        Ok(response) => response.into_response(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response(),
    }
}

fn html_or_error(rendered: Result<String>, path: &str) -> Response {
    match rendered {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            let status = status_for(&e);
            if status == StatusCode::NOT_FOUND {
                tracing::debug!("{}: {}", path, e);
            } else {
                tracing::error!("Failed to render {}: {}", path, e);
            }
            (status, status.canonical_reason().unwrap_or("Error")).into_response()
        }
    }
}

/// HTTP status for a failed render
fn status_for(err: &anyhow::Error) -> StatusCode {
    match err.downcast_ref::<BlogError>() {
        Some(BlogError::NotFound { .. }) | Some(BlogError::NoMorePages) => StatusCode::NOT_FOUND,
        Some(BlogError::Fetch { .. }) | Some(BlogError::MalformedContent(_)) => {
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Slug of a `/post/{slug}/` request path
fn post_slug(path: &str) -> Option<String> {
    let rest = path.strip_prefix("/post/")?;
    let rest = rest.strip_suffix("index.html").unwrap_or(rest);
    let segment = rest.strip_suffix('/').unwrap_or(rest);
    if segment.is_empty() || segment.contains('/') {
        return None;
    }
    percent_decode_str(segment)
        .decode_utf8()
        .ok()
        .map(|slug| slug.into_owned())
}

/// Number of a listing request path: `/` is 1, `/page/{n}/` is n
fn listing_page(path: &str) -> Option<usize> {
    if path == "/" || path == "/index.html" {
        return Some(1);
    }
    let rest = path.strip_prefix("/page/")?;
    let rest = rest.strip_suffix("index.html").unwrap_or(rest);
    rest.strip_suffix('/')
        .unwrap_or(rest)
        .parse()
        .ok()
        .filter(|n| *n >= 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::{FixtureSource, RawDocument};
    use crate::config::SiteConfig;
    use serde_json::json;

    fn fixture() -> FixtureSource {
        let documents = (1..=3)
            .map(|i| RawDocument {
                id: Some(format!("id-{}", i)),
                uid: Some(format!("post-{}", i)),
                doc_type: Some("post".to_string()),
                first_publication_date: Some(format!("2021-0{}-10T12:00:00+0000", i)),
                last_publication_date: None,
                data: json!({ "title": format!("Post {}", i), "author": "Ana" }),
            })
            .collect();
        FixtureSource::new(documents)
    }

    fn server_state(dir: &std::path::Path) -> Arc<ServerState> {
        let blog = Blog::with_config(dir.to_path_buf(), SiteConfig::default());
        let generator = Generator::new(&blog, Arc::new(Backend::Fixture(fixture()))).unwrap();
        Arc::new(ServerState::new(generator))
    }

    async fn spawn_server(dir: &std::path::Path) -> String {
        serve(server_state(dir)).await
    }

    async fn serve(state: Arc<ServerState>) -> String {
        let app = router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client() -> reqwest::Client {
        reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_generates_unbuilt_post_on_demand() {
        let dir = tempfile::tempdir().unwrap();
        let base = spawn_server(dir.path()).await;

        let response = client().get(format!("{}/post/post-2/", base)).send().await.unwrap();
        assert_eq!(response.status(), 200);
        assert!(response.text().await.unwrap().contains("<h1>Post 2</h1>"));
        assert!(dir.path().join("public/post/post-2/index.html").exists());

        let response = client().get(format!("{}/post/missing/", base)).send().await.unwrap();
        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn test_dead_generation_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        let state = server_state(dir.path());
        {
            // sender gone without an outcome, as after a panicked task
            let (tx, rx) = watch::channel(None);
            drop(tx);
            state.in_flight.lock().await.insert("post-1".to_string(), rx);
        }
        let base = serve(state).await;

        let response = client().get(format!("{}/post/post-1/", base)).send().await.unwrap();
        assert_eq!(response.status(), 200);
        assert!(response.text().await.unwrap().contains("<h1>Post 1</h1>"));
    }

    #[tokio::test]
    async fn test_serves_built_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("public")).unwrap();
        std::fs::write(dir.path().join("public/index.html"), "built listing").unwrap();
        let base = spawn_server(dir.path()).await;

        let response = client().get(format!("{}/", base)).send().await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await.unwrap(), "built listing");
    }

    #[tokio::test]
    async fn test_preview_mode() {
        let dir = tempfile::tempdir().unwrap();
        let base = spawn_server(dir.path()).await;
        let client = client();

        let response = client
            .get(format!("{}/api/preview?token=preview-ref&documentId=id-3", base))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 307);
        assert_eq!(response.headers()["location"], "/post/post-3/");

        let html = client.get(format!("{}/", base)).send().await.unwrap().text().await.unwrap();
        assert!(html.contains("Sair do modo Preview"));
        assert!(html.contains("Post 3"));

        let response = client.get(format!("{}/post/post-1/", base)).send().await.unwrap();
        assert_eq!(response.status(), 200);
        assert!(!dir.path().join("public/post/post-1/index.html").exists());

        let response = client.get(format!("{}/api/exit-preview", base)).send().await.unwrap();
        assert_eq!(response.status(), 307);
        assert_eq!(response.headers()["location"], "/");

        let response = client.get(format!("{}/", base)).send().await.unwrap();
        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn test_preview_requires_token() {
        let dir = tempfile::tempdir().unwrap();
        let base = spawn_server(dir.path()).await;

        let response = client().get(format!("{}/api/preview", base)).send().await.unwrap();
        assert_eq!(response.status(), 400);
    }

    #[test]
    fn test_post_slug() {
        assert_eq!(post_slug("/post/hello/"), Some("hello".to_string()));
        assert_eq!(post_slug("/post/hello"), Some("hello".to_string()));
        assert_eq!(post_slug("/post/hello/index.html"), Some("hello".to_string()));
        assert_eq!(post_slug("/post/ol%C3%A1/"), Some("olá".to_string()));
        assert_eq!(post_slug("/post/"), None);
        assert_eq!(post_slug("/post/a/b/"), None);
        assert_eq!(post_slug("/about/"), None);
    }

    #[test]
    fn test_listing_page() {
        assert_eq!(listing_page("/"), Some(1));
        assert_eq!(listing_page("/page/3/"), Some(3));
        assert_eq!(listing_page("/page/0/"), None);
        assert_eq!(listing_page("/post/a/"), None);
    }

    #[test]
    fn test_status_for() {
        let not_found = anyhow::Error::from(BlogError::not_found("post", "x"));
        assert_eq!(status_for(&not_found), StatusCode::NOT_FOUND);

        let fetch = anyhow::Error::from(BlogError::fetch("http://cms", "timeout"));
        assert_eq!(status_for(&fetch), StatusCode::BAD_GATEWAY);

        assert_eq!(
            status_for(&anyhow::anyhow!("template error")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
