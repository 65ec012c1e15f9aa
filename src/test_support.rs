//! Shared helpers for router-level tests: an app over temp databases and a
//! temp upload directory, plus a small multipart body builder.

use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use tempfile::TempDir;
use tower::ServiceExt;

use crate::config::AppConfig;
use crate::storage::ImageStore;
use crate::{create_app, db, AppState};

const BOUNDARY: &str = "annonces-test-boundary-7MA4YWxkTrZu0gW";

pub struct TestApp {
    pub state: AppState,
    router: Router,
    _dir: TempDir,
}

pub async fn app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let (annonces, drafts) = db::test_support::pools(&dir).await;

    let config = AppConfig::from_env();
    let state = AppState {
        annonces,
        drafts,
        images: ImageStore::new(dir.path().join("uploads"), config.max_image_size),
    };
    let router = create_app(state.clone(), &config);

    TestApp {
        state,
        router,
        _dir: dir,
    }
}

impl TestApp {
    async fn send(&self, req: Request<Body>) -> (StatusCode, Bytes) {
        let res = self.router.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Bytes) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn post(&self, uri: &str) -> (StatusCode, Bytes) {
        self.send(Request::post(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn post_multipart(&self, uri: &str, form: MultipartBody) -> (StatusCode, Bytes) {
        let req = Request::post(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(form.finish()))
            .unwrap();
        self.send(req).await
    }

    /// Number of files currently in the upload directory.
    pub fn stored_files(&self) -> usize {
        std::fs::read_dir(self.state.images.root())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

#[derive(Default)]
pub struct MultipartBody {
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        self.body
    }
}

/// A PNG signature padded to `size` bytes.
pub fn png_bytes(size: usize) -> Vec<u8> {
    let mut data = vec![0u8; size.max(8)];
    data[..8].copy_from_slice(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]);
    data
}
