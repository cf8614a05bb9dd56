mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::*;
use doc2md_job_queue::JobStatus;
use doc2md_store::KvStore;
use doc2md_tasks::MISSING_FILE_MESSAGE;

#[tokio::test]
async fn unknown_task_is_not_found() {
    let app = spawn_app().await;
    let (status, body) = get(&app.router, "/task/00000000-0000-4000-8000-000000000000").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Task not found or expired");
}

#[tokio::test]
async fn queued_task_reports_queued() {
    let app = spawn_app().await;
    let task_id = queued_task(&app, "deck.pptx", b"slides").await;

    let (status, body) = get(&app.router, &format!("/task/{task_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["task_id"], task_id.as_str());
    assert_eq!(body["status"], "queued");
    assert!(body.get("markdown").is_none());
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn report_docx_converts_end_to_end() {
    let app = spawn_app().await;
    let task_id = queued_task(&app, "report.docx", &[42u8; 200]).await;

    let run = process_next(&app).await;
    assert_eq!(run.status, JobStatus::Completed);
    assert_eq!(app.converter.calls(), 1);

    let (status, body) = get(&app.router, &format!("/task/{task_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    let markdown = body["markdown"].as_str().expect("markdown");
    assert!(!markdown.is_empty());
    assert!(markdown.contains("Converted docx"));
    assert!(markdown.contains("200 bytes"));
    assert!(body.get("error").is_none());

    // the upload is no longer needed once converted
    assert!(app.tasks.file(&task_id).await.unwrap().is_none());
}

#[tokio::test]
async fn repeated_polls_return_identical_payloads() {
    let app = spawn_app().await;
    let task_id = queued_task(&app, "sheet.xlsx", b"cells").await;
    process_next(&app).await;

    let uri = format!("/task/{task_id}");
    let (_, first) = get(&app.router, &uri).await;
    for _ in 0..3 {
        let (status, again) = get(&app.router, &uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(again, first);
    }
}

#[tokio::test]
async fn evicted_upload_fails_the_task() {
    let app = spawn_app().await;
    let task_id = queued_task(&app, "paper.pdf", b"%PDF").await;
    app.store.delete(&format!("file:{task_id}")).await.unwrap();

    let run = process_next(&app).await;
    assert_eq!(run.status, JobStatus::Failed);
    assert_eq!(app.converter.calls(), 0);

    let (status, body) = get(&app.router, &format!("/task/{task_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "failed");
    assert_eq!(body["error"], MISSING_FILE_MESSAGE);
    assert!(body.get("markdown").is_none());
}

#[tokio::test]
async fn converter_failure_is_reported_on_poll() {
    let app = spawn_app_with(TestOptions {
        converter_error: Some("unsupported encryption".into()),
        ..TestOptions::default()
    })
    .await;
    let task_id = queued_task(&app, "locked.pdf", b"%PDF").await;
    process_next(&app).await;

    let (status, body) = get(&app.router, &format!("/task/{task_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "failed");
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("unsupported encryption"));
}

#[tokio::test]
async fn expired_markdown_is_omitted() {
    let app = spawn_app().await;
    let task_id = queued_task(&app, "page.html", b"<h1>x</h1>").await;
    process_next(&app).await;
    app.store
        .delete(&format!("markdown:{task_id}"))
        .await
        .unwrap();

    let (status, body) = get(&app.router, &format!("/task/{task_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert!(body.get("markdown").is_none());
}

#[tokio::test]
async fn task_expires_after_ttl_without_writes() {
    let app = spawn_app().await;
    let task_id = queued_task(&app, "memo.doc", b"memo").await;
    wait_for_conversions(&app.stats, 1).await;
    let uri = format!("/task/{task_id}");

    tokio::time::pause();
    tokio::time::advance(Duration::from_secs(290)).await;
    let (status, _) = get(&app.router, &uri).await;
    assert_eq!(status, StatusCode::OK);

    tokio::time::advance(Duration::from_secs(11)).await;
    let (status, body) = get(&app.router, &uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Task not found or expired");
}
