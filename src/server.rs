//! Static file server for the site.
//!
//! Serves `index.html` for every page route, the assets beside it, and a `/health` probe. Every
//! response carries the security headers and a cache policy picked from the requested path.

use axum::{
    extract::{Request, State},
    handler::Handler,
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::{
    any::Any,
    future::{Future, IntoFuture},
    net::SocketAddr,
    path::{Component, Path, PathBuf},
    sync::Arc,
    time::Instant,
};
use tokio::sync::oneshot;
use tower_http::{
    catch_panic::CatchPanicLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
    LatencyUnit,
};
use tracing::Level;

use crate::{
    config::ServerConfig,
    error::SiteError,
    section::{BUILTIN_SECTIONS, PRIVACY, TOS},
};

pub const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; \
script-src 'self' 'unsafe-inline'; \
style-src 'self' 'unsafe-inline'; \
img-src 'self' data: https:; \
font-src 'self'; \
connect-src 'self'; \
frame-ancestors 'none';";

const IMAGE_CACHE: &str = "public, max-age=31536000, immutable";
const ASSET_CACHE: &str = "public, max-age=604800, must-revalidate";
const NO_CACHE: &str = "no-cache, no-store, must-revalidate";

/// Shared, read-only request state.
#[derive(Debug)]
struct ServerState {
    root: PathBuf,
    environment: String,
    development: bool,
    started: Instant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    /// RFC 3339 UTC time with millisecond precision, e.g. `2024-05-01T12:00:00.000Z`.
    pub timestamp: String,
    /// Seconds since the server started.
    pub uptime: f64,
    pub environment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Build the site router for `config`. Exposed separately from [`serve`] so it can be driven
/// without a socket.
pub fn router(config: &ServerConfig) -> Router {
    let state = Arc::new(ServerState {
        root: config.root.clone(),
        environment: config.environment.clone(),
        development: config.is_development(),
        started: Instant::now(),
    });

    let assets = ServeDir::new(&config.root)
        .append_index_html_on_directories(false)
        .call_fallback_on_method_not_allowed(true)
        .fallback(not_found.with_state(state.clone()));

    let development = state.development;
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/", get(index));
    for section in [TOS, PRIVACY] {
        app = app.route(&format!("/{section}"), get(index));
    }
    app.fallback_service(assets)
        .layer(middleware::from_fn(hide_dotfiles))
        .layer(CatchPanicLayer::custom(
            move |err: Box<dyn Any + Send + 'static>| panic_response(err, development),
        ))
        .layer(middleware::from_fn(site_headers))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(LatencyUnit::Millis),
                ),
        )
        .with_state(state)
}

/// Bind and serve until `shutdown_signal` resolves. Open connections get
/// [`ServerConfig::shutdown_timeout`] to finish before the server gives up on them.
pub async fn serve(
    config: ServerConfig,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), SiteError> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| SiteError::Config(format!("Invalid listen address: {e}")))?;
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::AddrInUse {
            SiteError::Service(format!("Port {} is already in use", config.port))
        } else {
            SiteError::from(e)
        }
    })?;

    let app = router(&config);
    tracing::info!("Military Essentials server running on http://{addr}");
    tracing::info!("Environment: {}", config.environment);
    tracing::info!("Serving: {}", config.root.display());

    let (draining_tx, draining_rx) = oneshot::channel::<()>();
    let wrapped_shutdown = async move {
        shutdown_signal.await;
        tracing::info!("Shutdown signal received, starting graceful shutdown");
        let _ = draining_tx.send(());
    };
    let deadline = config.shutdown_timeout();
    let forced = async move {
        match draining_rx.await {
            Ok(()) => tokio::time::sleep(deadline).await,
            Err(_) => std::future::pending::<()>().await,
        }
    };

    let server = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(wrapped_shutdown)
        .into_future();
    tokio::select! {
        result = server => result?,
        _ = forced => {
            tracing::error!("Could not close connections in time, forcefully shutting down");
            return Err(SiteError::Service("Graceful shutdown timed out".to_string()));
        }
    }
    tracing::info!("Server closed");
    Ok(())
}

async fn health(State(state): State<Arc<ServerState>>) -> Json<HealthReport> {
    Json(HealthReport {
        status: "healthy".to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        uptime: state.started.elapsed().as_secs_f64(),
        environment: state.environment.clone(),
    })
}

async fn index(State(state): State<Arc<ServerState>>) -> Response {
    match tokio::fs::read(state.root.join("index.html")).await {
        Ok(body) => html_response(body),
        Err(e) => {
            tracing::error!("Error sending file: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

/// Reached when no route or static file matched.
async fn not_found(State(state): State<Arc<ServerState>>, method: Method, uri: Uri) -> Response {
    if let Some(page) = extensionless_page(&state.root, uri.path()).await {
        match tokio::fs::read(&page).await {
            Ok(body) => return html_response(body),
            Err(e) => tracing::warn!("Could not read {}: {e}", page.display()),
        }
    }
    missing(&method, &uri)
}

async fn hide_dotfiles(request: Request, next: Next) -> Response {
    let hidden = request
        .uri()
        .path()
        .split('/')
        .any(|segment| segment.starts_with('.'));
    if hidden {
        return missing(request.method(), request.uri());
    }
    next.run(request).await
}

fn missing(method: &Method, uri: &Uri) -> Response {
    let path = uri.path();
    tracing::warn!("404 - Route not found: {method} {path}");
    if path.starts_with("/api/") {
        let body = ErrorBody {
            error: "Not Found".to_string(),
            message: Some("The requested resource was not found".to_string()),
            path: Some(path.to_string()),
        };
        return (StatusCode::NOT_FOUND, Json(body)).into_response();
    }
    (StatusCode::FOUND, [(header::LOCATION, "/")]).into_response()
}

/// `/about` may be served by `about.html` or `about.htm`.
async fn extensionless_page(root: &Path, path: &str) -> Option<PathBuf> {
    let relative = Path::new(path.trim_start_matches('/'));
    if relative.as_os_str().is_empty() || relative.extension().is_some() {
        return None;
    }
    if !relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
    {
        return None;
    }
    for ext in ["html", "htm"] {
        let candidate = root.join(relative).with_extension(ext);
        if let Ok(meta) = tokio::fs::metadata(&candidate).await {
            if meta.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}

fn html_response(body: Vec<u8>) -> Response {
    (
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        body,
    )
        .into_response()
}

fn extension_of(path: &str) -> Option<String> {
    let name = path.rsplit('/').next()?;
    let (_, ext) = name.rsplit_once('.')?;
    Some(ext.to_ascii_lowercase())
}

fn cache_policy(path: &str) -> Option<&'static str> {
    if path == "/" || BUILTIN_SECTIONS.iter().any(|s| path == format!("/{s}")) {
        return Some(NO_CACHE);
    }
    match extension_of(path)?.as_str() {
        "jpg" | "jpeg" | "png" | "gif" | "ico" | "svg" | "webp" => Some(IMAGE_CACHE),
        "css" | "js" => Some(ASSET_CACHE),
        "html" => Some(NO_CACHE),
        _ => None,
    }
}

fn text_content_type(path: &str) -> Option<&'static str> {
    match extension_of(path)?.as_str() {
        "html" | "htm" => Some("text/html; charset=utf-8"),
        "css" => Some("text/css; charset=utf-8"),
        "js" => Some("application/javascript; charset=utf-8"),
        _ => None,
    }
}

fn set(headers: &mut HeaderMap, name: HeaderName, value: &'static str) {
    headers.insert(name, HeaderValue::from_static(value));
}

async fn site_headers(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let mut response = next.run(request).await;
    let succeeded = response.status().is_success();
    let headers = response.headers_mut();

    set(headers, header::X_CONTENT_TYPE_OPTIONS, "nosniff");
    set(headers, header::X_FRAME_OPTIONS, "DENY");
    set(headers, header::X_XSS_PROTECTION, "1; mode=block");
    set(headers, header::REFERRER_POLICY, "strict-origin-when-cross-origin");
    set(headers, header::CONTENT_SECURITY_POLICY, CONTENT_SECURITY_POLICY);

    if succeeded {
        if let Some(policy) = cache_policy(&path) {
            set(headers, header::CACHE_CONTROL, policy);
            if policy == NO_CACHE {
                set(headers, header::PRAGMA, "no-cache");
                set(headers, header::EXPIRES, "0");
            }
        }
        if let Some(content_type) = text_content_type(&path) {
            set(headers, header::CONTENT_TYPE, content_type);
        }
    }
    response
}

fn panic_response(err: Box<dyn Any + Send + 'static>, development: bool) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| err.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "unknown panic".to_string());
    tracing::error!("Server error: {detail}");
    let body = ErrorBody {
        error: "Internal Server Error".to_string(),
        message: development.then_some(detail),
        path: None,
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

impl IntoResponse for SiteError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error = status
            .canonical_reason()
            .unwrap_or("Internal Server Error")
            .to_string();
        let body = ErrorBody {
            error,
            message: Some(self.to_string()),
            path: None,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use tempfile::TempDir;
    use test_log::test;
    use tower::ServiceExt;

    fn site_root() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html>shell</html>").unwrap();
        std::fs::write(dir.path().join("style.css"), "body{}").unwrap();
        std::fs::write(dir.path().join("about.html"), "<p>about</p>").unwrap();
        std::fs::write(dir.path().join(".env"), "SECRET=1").unwrap();
        dir
    }

    fn config_for(dir: &TempDir) -> ServerConfig {
        ServerConfig {
            root: dir.path().to_path_buf(),
            ..Default::default()
        }
    }

    async fn get_path(app: Router, path: &str) -> Response {
        let request = axum::http::Request::builder()
            .uri(path)
            .body(Body::empty())
            .unwrap();
        app.oneshot(request).await.unwrap()
    }

    #[test]
    fn test_cache_policy_by_extension() {
        assert_eq!(cache_policy("/img/logo.PNG"), Some(IMAGE_CACHE));
        assert_eq!(cache_policy("/app.js"), Some(ASSET_CACHE));
        assert_eq!(cache_policy("/"), Some(NO_CACHE));
        assert_eq!(cache_policy("/tos"), Some(NO_CACHE));
        assert_eq!(cache_policy("/fonts/a.woff2"), None);
        assert_eq!(extension_of("/a.b/c"), None);
    }

    #[test(tokio::test)]
    async fn test_page_routes_serve_index() {
        let dir = site_root();
        for path in ["/", "/tos", "/privacy"] {
            let response = get_path(router(&config_for(&dir)), path).await;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.headers()[header::CACHE_CONTROL], NO_CACHE);
            let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            assert_eq!(&body[..], b"<html>shell</html>");
        }
    }

    #[test(tokio::test)]
    async fn test_dotfiles_are_hidden() {
        let dir = site_root();
        let response = get_path(router(&config_for(&dir)), "/.env").await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/");
    }

    #[test(tokio::test)]
    async fn test_extensionless_html_lookup() {
        let dir = site_root();
        let response = get_path(router(&config_for(&dir)), "/about").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"<p>about</p>");
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_requests_logged_at_info() {
        let dir = site_root();
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let response = get_path(router(&config_for(&dir)), "/style.css").await;
        assert_eq!(response.status(), StatusCode::OK);

        let logged = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(logged.contains("finished processing request"), "{logged}");
        assert!(logged.contains(" ms"), "{logged}");
        assert!(logged.contains("uri=/style.css"), "{logged}");
    }

    #[test]
    fn test_site_error_response_status() {
        let response = SiteError::NotFound("x".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
