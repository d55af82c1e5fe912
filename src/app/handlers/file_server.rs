use crate::app::handlers::text_response;
use crate::domain::ports::{IncomingRequest, RequestHandler};
use crate::utils::error::{HostError, Result};
use async_trait::async_trait;
use http::StatusCode;
use hyper::body::Bytes;
use std::path::{Component, Path, PathBuf};

/// 從 source 目錄伺服靜態檔案；萬用路由的尾段就是相對檔名
pub struct FileServerHandler {
    root: PathBuf,
    index: String,
}

impl FileServerHandler {
    pub fn new(id: &str, source: &Path, index: &str) -> Result<Self> {
        if !source.is_dir() {
            return Err(HostError::InvalidConfigValueError {
                field: format!("component.{}.files.source", id),
                value: source.display().to_string(),
                reason: "Source directory does not exist".to_string(),
            });
        }
        Ok(Self {
            root: source.to_path_buf(),
            index: index.to_string(),
        })
    }
}

#[async_trait]
impl RequestHandler for FileServerHandler {
    async fn handle(&self, req: IncomingRequest) -> Result<http::Response<Bytes>> {
        let Some(relative) = sanitize_request_path(&req.trailer) else {
            return Ok(text_response(StatusCode::NOT_FOUND, "Not found\n"));
        };

        let mut path = self.root.join(relative);
        if let Ok(metadata) = tokio::fs::metadata(&path).await {
            if metadata.is_dir() {
                path.push(&self.index);
            }
        }

        match tokio::fs::read(&path).await {
            Ok(data) => {
                let mut response = http::Response::new(Bytes::from(data));
                response.headers_mut().insert(
                    http::header::CONTENT_TYPE,
                    http::HeaderValue::from_static(content_type_for(&path)),
                );
                Ok(response)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(text_response(StatusCode::NOT_FOUND, "Not found\n"))
            }
            Err(e) => Err(HostError::IoError(e)),
        }
    }
}

/// 拒絕任何可能跳出 root 的路徑段
fn sanitize_request_path(trailer: &str) -> Option<PathBuf> {
    let mut sanitized = PathBuf::new();
    for component in Path::new(trailer).components() {
        match component {
            Component::Normal(segment) => sanitized.push(segment),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(sanitized)
}

fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();

    match extension {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" | "mjs" => "text/javascript",
        "json" => "application/json",
        "txt" => "text/plain",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        "pdf" => "application/pdf",
        "xml" => "application/xml",
        "woff2" => "font/woff2",
        "wasm" => "application/wasm",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use tempfile::TempDir;

    fn request(trailer: &str) -> IncomingRequest {
        IncomingRequest {
            method: Method::GET,
            path: format!("/assets/{}", trailer),
            query: None,
            trailer: trailer.to_string(),
            headers: http::HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    fn fixture() -> (TempDir, FileServerHandler) {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html>home</html>").unwrap();
        std::fs::write(dir.path().join("style.css"), "body {}").unwrap();
        std::fs::create_dir(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs/readme.txt"), "docs").unwrap();
        let handler = FileServerHandler::new("assets", dir.path(), "index.html").unwrap();
        (dir, handler)
    }

    #[test]
    fn test_sanitize_request_path() {
        assert_eq!(
            sanitize_request_path("a/b/c.txt"),
            Some(PathBuf::from("a/b/c.txt"))
        );
        assert_eq!(sanitize_request_path("./a/./b"), Some(PathBuf::from("a/b")));
        assert_eq!(sanitize_request_path(""), Some(PathBuf::new()));
        assert!(sanitize_request_path("../secret").is_none());
        assert!(sanitize_request_path("a/../../secret").is_none());
        assert!(sanitize_request_path("/etc/passwd").is_none());
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for(Path::new("a/index.html")), "text/html");
        assert_eq!(content_type_for(Path::new("s.css")), "text/css");
        assert_eq!(content_type_for(Path::new("blob")), "application/octet-stream");
    }

    #[test]
    fn test_missing_source_directory_rejected() {
        assert!(FileServerHandler::new("assets", Path::new("/no/such/dir"), "index.html").is_err());
    }

    #[tokio::test]
    async fn test_serves_files_and_index() {
        let (_dir, handler) = fixture();

        let response = handler.handle(request("style.css")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "text/css");
        assert_eq!(response.body().as_ref(), b"body {}");

        // 目錄命中時回 index
        let response = handler.handle(request("")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body().as_ref(), b"<html>home</html>");

        let response = handler.handle(request("docs/readme.txt")).await.unwrap();
        assert_eq!(response.body().as_ref(), b"docs");
    }

    #[tokio::test]
    async fn test_traversal_and_missing_files_are_404() {
        let (_dir, handler) = fixture();

        let response = handler.handle(request("../escape.txt")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = handler.handle(request("nope.txt")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
