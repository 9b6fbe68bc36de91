use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use codedrop_core::{create_app, AppConfig, AppState};
use rand::RngCore;
use serde_json::Value;
use std::path::PathBuf;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "codedrop-test-boundary-7MA4YWxkTrZu0gW";

struct TestApp {
    app: Router,
    root: TempDir,
    codes: TempDir,
}

impl TestApp {
    fn new() -> Self {
        let root = TempDir::new().unwrap();
        let codes = TempDir::new().unwrap();

        let mut config = AppConfig::default();
        config.storage.root_dir = root.path().to_path_buf();
        config.storage.static_dir = root.path().join("no-static-assets");
        config.codes.dir = codes.path().to_path_buf();

        let state = AppState::new(&config).unwrap();

        Self {
            app: create_app(state),
            root,
            codes,
        }
    }

    fn root_path(&self, relative: &str) -> PathBuf {
        self.root.path().join(relative)
    }

    fn add_code(&self, code: &str) {
        std::fs::write(self.codes.path().join(format!("{}.code", code)), format!("{}\n", code))
            .unwrap();
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.app.clone().oneshot(request).await.unwrap()
    }

    async fn get(&self, uri: &str) -> Response {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    async fn upload(&self, uri: &str, body: Vec<u8>) -> Response {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    async fn token_for(&self, code: &str, dir: &str) -> String {
        let response = self
            .get(&format!("/__fs_checkcode?code={}&dir={}", code, dir))
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["ok"], true);
        json["token"].as_str().unwrap().to_string()
    }
}

enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, file_name, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                        name, file_name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_code_token_upload_download_round_trip() {
    let test = TestApp::new();
    std::fs::create_dir(test.root_path("uploads")).unwrap();
    test.add_code("AB12CD34");

    let token = test.token_for("AB12CD34", "/uploads").await;
    assert_eq!(token.len(), 32);

    let mut payload = vec![0u8; 5 * 1024 * 1024];
    rand::thread_rng().fill_bytes(&mut payload);

    let body = multipart_body(&[Part::File("file", "x.bin", &payload)]);
    let response = test
        .upload(&format!("/__fs_upload?dir=/uploads&token={}", token), body)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["ok"], true);
    assert_eq!(json["saved_as"], "x.bin");
    assert_eq!(json["url"], "/__fs_download?path=/uploads/x.bin");

    let response = test.get("/__fs_download?path=/uploads/x.bin").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"x.bin\""
    );

    let downloaded = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(downloaded.len(), payload.len());
    assert!(downloaded[..] == payload[..]);
}

#[tokio::test]
async fn test_code_cannot_be_reused() {
    let test = TestApp::new();
    test.add_code("ONCE0001");

    test.token_for("ONCE0001", "/").await;

    let response = test.get("/__fs_checkcode?code=ONCE0001&dir=/").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let json = json_body(response).await;
    assert_eq!(json["ok"], false);
    assert_eq!(json["error"], "invalid code");
}

#[tokio::test]
async fn test_check_code_rejections() {
    let test = TestApp::new();
    test.add_code("KEEP0001");

    let missing = test.get("/__fs_checkcode?dir=/").await;
    assert_eq!(missing.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(missing).await["error"], "missing code");

    let traversal = test.get("/__fs_checkcode?code=KEEP0001&dir=../..").await;
    assert_eq!(traversal.status(), StatusCode::FORBIDDEN);

    // A rejected directory must not spend the code.
    assert!(test.codes.path().join("KEEP0001.code").exists());
    test.token_for("KEEP0001", "/").await;
}

#[tokio::test]
async fn test_token_is_single_use() {
    let test = TestApp::new();
    test.add_code("TOKEN001");
    let token = test.token_for("TOKEN001", "/").await;

    let first = test
        .upload(
            &format!("/__fs_upload?dir=/&token={}", token),
            multipart_body(&[Part::File("file", "a.txt", b"first")]),
        )
        .await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = test
        .upload(
            &format!("/__fs_upload?dir=/&token={}", token),
            multipart_body(&[Part::File("file", "b.txt", b"second")]),
        )
        .await;
    assert_eq!(second.status(), StatusCode::FORBIDDEN);
    assert!(!test.root_path("b.txt").exists());
}

#[tokio::test]
async fn test_failed_upload_still_spends_token() {
    let test = TestApp::new();
    test.add_code("SPEND001");
    let token = test.token_for("SPEND001", "/").await;

    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/__fs_upload?dir=/&token={}", token))
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("not multipart"))
        .unwrap();
    let response = test.send(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let retry = test
        .upload(
            &format!("/__fs_upload?dir=/&token={}", token),
            multipart_body(&[Part::File("file", "a.txt", b"data")]),
        )
        .await;
    assert_eq!(retry.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_upload_file_name_is_reduced_to_base_name() {
    let test = TestApp::new();
    std::fs::create_dir(test.root_path("uploads")).unwrap();
    test.add_code("EVIL0001");
    let token = test.token_for("EVIL0001", "/uploads").await;

    let response = test
        .upload(
            &format!("/__fs_upload?dir=/uploads&token={}", token),
            multipart_body(&[Part::File("file", "../../evil.sh", b"#!/bin/sh\necho pwned\n")]),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["saved_as"], "evil.sh");
    assert!(test.root_path("uploads/evil.sh").exists());
    assert!(!test.root.path().join("evil.sh").exists());
    assert!(!test.root.path().parent().unwrap().join("evil.sh").exists());
}

#[tokio::test]
async fn test_upload_precondition_failures() {
    let test = TestApp::new();

    let no_dir = test
        .upload("/__fs_upload?token=whatever", multipart_body(&[]))
        .await;
    assert_eq!(no_dir.status(), StatusCode::BAD_REQUEST);

    let bad_token = test
        .upload(
            "/__fs_upload?dir=/&token=0123456789abcdef0123456789abcdef",
            multipart_body(&[Part::File("file", "a.txt", b"data")]),
        )
        .await;
    assert_eq!(bad_token.status(), StatusCode::FORBIDDEN);
    assert!(!test.root_path("a.txt").exists());

    test.add_code("TRAV0001");
    let token = test.token_for("TRAV0001", "/").await;
    let traversal = test
        .upload(
            &format!("/__fs_upload?dir=../outside&token={}", token),
            multipart_body(&[Part::File("file", "a.txt", b"data")]),
        )
        .await;
    assert_eq!(traversal.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_upload_skips_other_fields_and_requires_file_field() {
    let test = TestApp::new();
    test.add_code("FIELD001");
    test.add_code("FIELD002");

    let token = test.token_for("FIELD001", "/").await;
    let response = test
        .upload(
            &format!("/__fs_upload?dir=/&token={}", token),
            multipart_body(&[
                Part::Text("note", "ignored"),
                Part::File("attachment", "other.txt", b"not the file field"),
                Part::File("file", "kept.txt", b"kept"),
                Part::File("file", "second.txt", b"ignored too"),
            ]),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(std::fs::read(test.root_path("kept.txt")).unwrap(), b"kept");
    assert!(!test.root_path("other.txt").exists());
    assert!(!test.root_path("second.txt").exists());

    let token = test.token_for("FIELD002", "/").await;
    let response = test
        .upload(
            &format!("/__fs_upload?dir=/&token={}", token),
            multipart_body(&[Part::Text("note", "no file here")]),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_directory_endpoint() {
    let test = TestApp::new();
    std::fs::write(test.root_path("ten.txt"), b"0123456789").unwrap();
    std::fs::create_dir(test.root_path("docs")).unwrap();
    std::fs::write(test.root_path("docs/inner.md"), b"# inner").unwrap();

    let response = test.get("/__fs_list").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["ok"], true);
    assert_eq!(json["cwd"], "/");

    let items = json["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["name"], "docs");
    assert_eq!(items[0]["type"], "dir");
    assert_eq!(items[0]["size"], 0);
    assert_eq!(items[1]["name"], "ten.txt");
    assert_eq!(items[1]["type"], "file");
    assert_eq!(items[1]["size"], 10);

    let nested = json_body(test.get("/__fs_list?dir=docs").await).await;
    assert_eq!(nested["cwd"], "/docs/");
    assert_eq!(nested["items"].as_array().unwrap().len(), 1);

    let traversal = test.get("/__fs_list?dir=../../etc").await;
    assert_eq!(traversal.status(), StatusCode::FORBIDDEN);

    let missing = test.get("/__fs_list?dir=/nope").await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_download_endpoint_failures() {
    let test = TestApp::new();

    let missing_path = test.get("/__fs_download").await;
    assert_eq!(missing_path.status(), StatusCode::BAD_REQUEST);

    let traversal = test.get("/__fs_download?path=../../etc/passwd").await;
    assert_eq!(traversal.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(traversal).await["ok"], false);

    let missing_file = test.get("/__fs_download?path=/absent.bin").await;
    assert_eq!(missing_file.status(), StatusCode::NOT_FOUND);
}
