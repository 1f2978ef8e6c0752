use std::path::PathBuf;

use pdfdesk_client::{ClientError, Desk};
use pdfdesk_core::{CompressionLevel, DeskConfig, DeskError, SplitMode, ValidationError};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn desk(server: &MockServer) -> Desk {
    let mut config = DeskConfig::default();
    config.base_url = server.uri();
    config.poll.interval_ms = 10;
    config.timing.download_delay_ms = 0;
    Desk::new(config).expect("client builds")
}

async fn write_files(dir: &TempDir, names: &[&str]) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for (i, name) in names.iter().enumerate() {
        let path = dir.path().join(name);
        let body = format!("%PDF-1.4 fixture {}", i);
        tokio::fs::write(&path, body).await.unwrap();
        paths.push(path);
    }
    paths
}

#[tokio::test]
async fn compress_submits_polls_and_downloads() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/compress"))
        .and(body_string_contains("name=\"compression\""))
        .and(body_string_contains("ebook"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"task_id": "t1"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/progress/t1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "percent": 100,
            "status": "done",
            "summary": {"files_count": 3, "input_mb": 6.0, "output_mb": 1.5,
                        "reduction_pct": 75.0, "time_s": 2.0}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/download/t1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-disposition", "attachment; filename=\"compressed.zip\"")
                .set_body_bytes(b"PK-archive".to_vec()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let paths = write_files(&dir, &["a.pdf", "b.pdf", "c.pdf"]).await;
    let mut statuses = Vec::new();

    let artifact = desk(&server)
        .compress(&paths, CompressionLevel::Ebook, &CancellationToken::new(), |t| {
            statuses.push(t.status().to_string())
        })
        .await
        .unwrap();

    assert_eq!(artifact.file_name, "compressed.zip");
    assert_eq!(artifact.bytes, b"PK-archive");
    assert_eq!(statuses, vec!["Compression complete".to_string()]);

    let saved = artifact.save_in(dir.path()).await.unwrap();
    assert_eq!(tokio::fs::read(saved).await.unwrap(), b"PK-archive");
}

#[tokio::test]
async fn compress_surfaces_submit_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/compress"))
        .respond_with(
            ResponseTemplate::new(413).set_body_json(serde_json::json!({"error": "Upload too large"})),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let paths = write_files(&dir, &["a.pdf"]).await;

    let err = desk(&server)
        .compress(&paths, CompressionLevel::Screen, &CancellationToken::new(), |_| {})
        .await
        .unwrap_err();

    match err {
        ClientError::Desk(DeskError::Server { status, message }) => {
            assert_eq!(status, 413);
            assert_eq!(message, "Upload too large");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn merge_with_one_file_never_reaches_the_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/merge"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let paths = write_files(&dir, &["only.pdf"]).await;

    let err = desk(&server).merge(&paths).await.unwrap_err();
    assert_eq!(err.to_string(), "Select at least 2 files to merge.");
}

#[tokio::test]
async fn merge_returns_the_merged_document() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/merge"))
        .and(body_string_contains("filename=\"b.pdf\""))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-merged".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let paths = write_files(&dir, &["a.pdf", "b.pdf"]).await;

    let artifact = desk(&server).merge(&paths).await.unwrap();
    assert_eq!(artifact.file_name, "merged.pdf");
    assert_eq!(artifact.bytes, b"%PDF-merged");
}

#[tokio::test]
async fn split_by_size_reports_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/split"))
        .and(body_string_contains("name=\"max_size_mb\""))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(serde_json::json!({"message": "Part too small"})),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let paths = write_files(&dir, &["big.pdf"]).await;

    let err = desk(&server)
        .split(&paths[0], SplitMode::Size { max_size_mb: 0.5 })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Server error (400): Part too small");
}

#[tokio::test]
async fn split_rejects_non_pdf_before_upload() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    tokio::fs::write(&path, "hello").await.unwrap();

    let err = desk(&server)
        .split(&path, SplitMode::Size { max_size_mb: 1.0 })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::Desk(DeskError::Validation(ValidationError::NoSelection(_)))
            | ClientError::Desk(DeskError::Validation(ValidationError::UnsupportedFile { .. }))
    ));
}

#[tokio::test]
async fn single_conversion_uploads_then_executes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload-conversion"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "filename": "letter.docx",
            "extension": "docx",
            "task_id": "c1",
            "options": ["pdf", "txt"]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/execute-conversion"))
        .and(body_string_contains("\"target_format\":\"pdf\""))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-converted".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("letter.docx");
    tokio::fs::write(&path, "docx bytes").await.unwrap();

    let artifact = desk(&server).convert(&[path], Some("pdf")).await.unwrap();
    assert_eq!(artifact.file_name, "converted.pdf");
}

#[tokio::test]
async fn batch_conversion_skips_unsupported_files() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload-conversion-batch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "batch_id": "b1",
            "items": [
                {"filename": "a.png", "extension": "png", "supported": true,
                 "task_id": "t1", "options": ["pdf"]},
                {"filename": "b.odt", "extension": "odt", "supported": false}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/execute-conversion-batch"))
        .and(body_string_contains("\"batch_id\":\"b1\""))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.png");
    let b = dir.path().join("b.odt");
    tokio::fs::write(&a, "png").await.unwrap();
    tokio::fs::write(&b, "odt").await.unwrap();

    let artifact = desk(&server).convert(&[a, b], Some("pdf")).await.unwrap();
    assert_eq!(artifact.file_name, "converted_files.zip");
}

#[tokio::test]
async fn convert_all_names_fields_by_index() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/convert_all"))
        .and(body_string_contains("name=\"file0\""))
        .and(body_string_contains("name=\"file1\""))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let paths = write_files(&dir, &["a.pdf", "b.pdf"]).await;

    let artifact = desk(&server).convert(&paths, None).await.unwrap();
    assert_eq!(artifact.file_name, "converted_files.zip");
}
