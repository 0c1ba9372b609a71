use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::NaiveDate;
use diary_app::errors::StoreError;
use diary_app::models::{Entry, UpsertOutcome};
use diary_app::remote::{GitHubContents, Remote};
use diary_app::storage::DiaryStore;
use mockito::{Matcher, Server};
use serde_json::json;

const CONTENTS_PATH: &str = "/repos/owner/diary/contents/diary.json";

fn github(server: &Server, token: Option<&str>) -> GitHubContents {
    GitHubContents::new(
        server.url(),
        "owner/diary".into(),
        "diary.json".into(),
        "main".into(),
        token.map(str::to_string),
    )
    .unwrap()
}

/// GitHub wraps base64 content at 60 columns.
fn contents_body(document: &str, sha: &str) -> String {
    let encoded = STANDARD.encode(document);
    let wrapped = encoded
        .as_bytes()
        .chunks(60)
        .map(|chunk| String::from_utf8_lossy(chunk).to_string())
        .collect::<Vec<_>>()
        .join("\n");
    json!({ "sha": sha, "content": wrapped, "encoding": "base64" }).to_string()
}

#[tokio::test]
async fn fetch_decodes_wrapped_base64_content() {
    let mut server = Server::new_async().await;
    let document = r#"[{"date":"2025-06-02","content":"今日は晴れ","rating":4}]"#;
    let mock = server
        .mock("GET", CONTENTS_PATH)
        .match_query(Matcher::UrlEncoded("ref".into(), "main".into()))
        .match_header("authorization", "Bearer secret")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(contents_body(document, "abc123"))
        .create_async()
        .await;

    let fetched = github(&server, Some("secret")).fetch().await.unwrap();
    assert_eq!(fetched.bytes, document.as_bytes());
    assert_eq!(fetched.revision.as_str(), "abc123");
    mock.assert_async().await;
}

#[tokio::test]
async fn missing_file_is_not_found_and_denied_is_unauthorized() {
    let mut server = Server::new_async().await;
    let _missing = server
        .mock("GET", CONTENTS_PATH)
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(r#"{"message":"Not Found"}"#)
        .create_async()
        .await;

    let result = github(&server, None).fetch().await;
    assert!(matches!(result, Err(StoreError::NotFound)));

    let mut server = Server::new_async().await;
    let _denied = server
        .mock("GET", CONTENTS_PATH)
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body(r#"{"message":"Bad credentials"}"#)
        .create_async()
        .await;

    let result = github(&server, Some("wrong")).fetch().await;
    assert!(matches!(result, Err(StoreError::Unauthorized)));
}

#[tokio::test]
async fn write_without_token_is_rejected_before_any_request() {
    let server = Server::new_async().await;
    let result = github(&server, None).put(b"[]".to_vec(), None, "init").await;
    assert!(matches!(result, Err(StoreError::MissingToken)));
}

#[tokio::test]
async fn upsert_sends_the_revision_it_read() {
    let mut server = Server::new_async().await;
    let document = r#"[{"date":"2025-06-02","content":"old","rating":2}]"#;
    let _get = server
        .mock("GET", CONTENTS_PATH)
        .match_query(Matcher::UrlEncoded("ref".into(), "main".into()))
        .with_status(200)
        .with_body(contents_body(document, "sha-read"))
        .create_async()
        .await;
    let put = server
        .mock("PUT", CONTENTS_PATH)
        .match_body(Matcher::PartialJson(json!({
            "sha": "sha-read",
            "branch": "main",
            "message": "Update diary entry 2025-06-02"
        })))
        .with_status(200)
        .with_body(r#"{"content":{"sha":"sha-written"}}"#)
        .create_async()
        .await;

    let store = DiaryStore::new(Remote::GitHub(github(&server, Some("secret"))));
    let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
    let outcome = store.upsert(Entry::new(date, "new", 5)).await.unwrap();

    assert_eq!(outcome, UpsertOutcome::Updated);
    put.assert_async().await;
}

#[tokio::test]
async fn conflicting_write_is_a_stale_revision() {
    let mut server = Server::new_async().await;
    let _get = server
        .mock("GET", CONTENTS_PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(contents_body("[]", "sha-read"))
        .create_async()
        .await;
    let _put = server
        .mock("PUT", CONTENTS_PATH)
        .with_status(409)
        .with_body(r#"{"message":"is at sha-other but expected sha-read"}"#)
        .create_async()
        .await;

    let store = DiaryStore::new(Remote::GitHub(github(&server, Some("secret"))));
    let date = NaiveDate::from_ymd_opt(2025, 6, 3).unwrap();
    let result = store.upsert(Entry::new(date, "lost update", 3)).await;

    match result {
        Err(StoreError::StaleRevision { expected }) => {
            assert_eq!(expected.as_deref(), Some("sha-read"));
        }
        other => panic!("expected a stale revision, got {other:?}"),
    }
}

#[tokio::test]
async fn first_write_creates_the_document_without_sha() {
    let mut server = Server::new_async().await;
    let _get = server
        .mock("GET", CONTENTS_PATH)
        .match_query(Matcher::Any)
        .with_status(404)
        .create_async()
        .await;
    let put = server
        .mock("PUT", CONTENTS_PATH)
        .match_body(Matcher::PartialJson(json!({ "branch": "main" })))
        .with_status(201)
        .with_body(r#"{"content":{"sha":"created"}}"#)
        .create_async()
        .await;

    let store = DiaryStore::new(Remote::GitHub(github(&server, Some("secret"))));
    let date = NaiveDate::from_ymd_opt(2025, 6, 4).unwrap();
    let outcome = store.upsert(Entry::new(date, "first", 4)).await.unwrap();

    assert_eq!(outcome, UpsertOutcome::Created);
    put.assert_async().await;
}

#[tokio::test]
async fn large_file_is_read_from_its_blob() {
    let mut server = Server::new_async().await;
    let document = r#"[{"date":"2025-06-05","content":"big","rating":3}]"#;
    let listing = server
        .mock("GET", CONTENTS_PATH)
        .match_query(Matcher::UrlEncoded("ref".into(), "main".into()))
        .match_header("accept", "application/vnd.github+json")
        .with_status(200)
        .with_body(json!({ "sha": "big-sha", "content": "", "encoding": "none" }).to_string())
        .create_async()
        .await;
    let blob = server
        .mock("GET", "/repos/owner/diary/git/blobs/big-sha")
        .match_header("accept", "application/vnd.github.raw")
        .with_status(200)
        .with_body(document)
        .create_async()
        .await;

    let fetched = github(&server, Some("secret")).fetch().await.unwrap();
    assert_eq!(fetched.bytes, document.as_bytes());
    assert_eq!(fetched.revision.as_str(), "big-sha");
    listing.assert_async().await;
    blob.assert_async().await;
}

#[tokio::test]
async fn rate_limited_read_is_a_remote_failure() {
    let mut server = Server::new_async().await;
    let _limited = server
        .mock("GET", CONTENTS_PATH)
        .match_query(Matcher::Any)
        .with_status(403)
        .with_header("x-ratelimit-remaining", "0")
        .with_body(r#"{"message":"API rate limit exceeded"}"#)
        .create_async()
        .await;

    let result = github(&server, None).fetch().await;
    assert!(matches!(result, Err(StoreError::Remote { status: 403, .. })));
}
