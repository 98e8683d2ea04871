use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use axum::body::Body;
use axum::http::{Method, Request};
use axum::Router;
use crisisdesk::config::AppConfig;
use crisisdesk::routes;
use crisisdesk::state::AppState;
use crisisdesk::storage::DiskStorage;
use http_body_util::BodyExt;
use serde::Serialize;
use tempfile::TempDir;
use tower::util::ServiceExt;

static BOUNDARY_SEQ: AtomicU64 = AtomicU64::new(0);

pub struct TestApp {
    pub state: AppState,
    router: Router,
    _upload_dir: TempDir,
}

impl TestApp {
    pub fn new() -> Result<Self> {
        let upload_dir = tempfile::tempdir().context("failed to create upload dir")?;

        let config = AppConfig {
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            upload_dir: upload_dir.path().to_path_buf(),
            cors_allowed_origin: None,
        };

        let storage = Arc::new(DiskStorage::new(upload_dir.path()));
        let state = AppState::new(config, storage);
        let router = routes::create_router(state.clone());

        Ok(Self {
            state,
            router,
            _upload_dir: upload_dir,
        })
    }

    #[allow(dead_code)]
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    #[allow(dead_code)]
    pub async fn put_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        let request = Request::builder()
            .method(Method::PUT)
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    pub async fn get(&self, path: &str) -> Result<hyper::Response<Body>> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(path)
            .body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    #[allow(dead_code)]
    pub async fn post_empty(&self, path: &str) -> Result<hyper::Response<Body>> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    pub async fn delete(&self, path: &str) -> Result<hyper::Response<Body>> {
        let request = Request::builder()
            .method(Method::DELETE)
            .uri(path)
            .body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    #[allow(dead_code)]
    pub async fn upload_file(
        &self,
        path: &str,
        filename: &str,
        content_type: &str,
        data: &[u8],
        fields: &[(&str, &str)],
    ) -> Result<hyper::Response<Body>> {
        let boundary = next_boundary();
        let mut body = Vec::new();
        push_file_part(&mut body, &boundary, "file", filename, content_type, data);

        for (name, value) in fields {
            body.extend(format!("--{boundary}\r\n").as_bytes());
            body.extend(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
            );
            body.extend(value.as_bytes());
            body.extend(b"\r\n");
        }

        body.extend(format!("--{boundary}--\r\n").as_bytes());
        self.send_multipart(path, &boundary, body).await
    }

    #[allow(dead_code)]
    pub async fn post_fields(
        &self,
        path: &str,
        fields: &[(&str, &str)],
    ) -> Result<hyper::Response<Body>> {
        let boundary = next_boundary();
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend(format!("--{boundary}\r\n").as_bytes());
            body.extend(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
            );
            body.extend(value.as_bytes());
            body.extend(b"\r\n");
        }
        body.extend(format!("--{boundary}--\r\n").as_bytes());
        self.send_multipart(path, &boundary, body).await
    }

    #[allow(dead_code)]
    pub async fn upload_files(
        &self,
        path: &str,
        files: &[(&str, &str, &[u8])],
    ) -> Result<hyper::Response<Body>> {
        let boundary = next_boundary();
        let mut body = Vec::new();
        for (filename, content_type, data) in files {
            push_file_part(&mut body, &boundary, "files", filename, content_type, data);
        }
        body.extend(format!("--{boundary}--\r\n").as_bytes());
        self.send_multipart(path, &boundary, body).await
    }

    async fn send_multipart(
        &self,
        path: &str,
        boundary: &str,
        body: Vec<u8>,
    ) -> Result<hyper::Response<Body>> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }
}

fn next_boundary() -> String {
    format!("boundary-{}", BOUNDARY_SEQ.fetch_add(1, Ordering::Relaxed))
}

fn push_file_part(
    body: &mut Vec<u8>,
    boundary: &str,
    field: &str,
    filename: &str,
    content_type: &str,
    data: &[u8],
) {
    body.extend(format!("--{boundary}\r\n").as_bytes());
    body.extend(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend(data);
    body.extend(b"\r\n");
}

pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(collected.to_bytes().to_vec())
}
