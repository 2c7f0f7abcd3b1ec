use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use slotdex_core::stopwords::StopwordSet;
use slotdex_core::{index_directory, IndexConfig};
use std::fs;
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

fn build_tiny_index() -> (TempDir, TempDir) {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    fs::write(input.path().join("doc0.txt"), "Rust is great. rust systems programming.").unwrap();
    fs::write(input.path().join("doc1.txt"), "Learning rust, rust, RUST.").unwrap();
    let config = IndexConfig { doc_table_size: 101, global_table_size: 211, stopword_table_size: 31, ..Default::default() };
    index_directory(input.path(), output.path(), config, StopwordSet::empty(31)).unwrap();
    (input, output)
}

async fn call(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let req = Request::get(uri).body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, body)
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let (_input, output) = build_tiny_index();
    let app = server::build_app(output.path().to_path_buf()).unwrap();

    let (status, body) = call(app, "/search?q=rust&k=2").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 2);
    // doc1 is 3/4 rust, doc0 is 2/6
    assert_eq!(arr[0]["filename"], "doc1.txt");
    assert_eq!(arr[0]["rank"], 1);
    assert_eq!(arr[1]["filename"], "doc0.txt");
    assert_eq!(json["total_hits"], 2);
}

#[tokio::test]
async fn unknown_terms_give_empty_results() {
    let (_input, output) = build_tiny_index();
    let app = server::build_app(output.path().to_path_buf()).unwrap();

    let (status, body) = call(app, "/search?q=python").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["results"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn html_page_renders_results_table() {
    let (_input, output) = build_tiny_index();
    let app = server::build_app(output.path().to_path_buf()).unwrap();

    let (status, body) = call(app, "/?q=rust").await;
    assert_eq!(status, StatusCode::OK);
    let page = String::from_utf8(body).unwrap();
    assert!(page.contains("<table id=\"results\">"));
    assert!(page.contains("doc1.txt"));
}

#[tokio::test]
async fn health_is_ok() {
    let (_input, output) = build_tiny_index();
    let app = server::build_app(output.path().to_path_buf()).unwrap();
    let (status, body) = call(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
}

#[test]
fn missing_index_fails_at_startup() {
    assert!(server::build_app("/nonexistent/index".into()).is_err());
}
