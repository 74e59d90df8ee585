//! File endpoint behavior: single-flight uploads and error mapping.

mod support;

use quarry_id::FileId;
use support::spawn_coordinator;

#[tokio::test]
async fn test_concurrent_duplicate_uploads_collapse() {
    let coord = spawn_coordinator().await;
    let client = reqwest::Client::new();

    let content = b"shared bytes".to_vec();
    let id = FileId::from_content(&content);
    let url = format!("{}/file?id={}", coord.base_url, id);

    let mut puts = Vec::new();
    for _ in 0..8 {
        let client = client.clone();
        let url = url.clone();
        let content = content.clone();
        puts.push(tokio::spawn(async move {
            client.put(url).body(content).send().await.unwrap().status()
        }));
    }

    // Every caller observes the same successful outcome.
    for put in puts {
        assert!(put.await.unwrap().is_success());
    }

    // Exactly one write happened: the entry is committed and intact.
    assert!(coord.state.file_cache().contains(id));
    let fetched = client
        .get(&url)
        .send()
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();
    assert_eq!(fetched.as_ref(), content.as_slice());
}

#[tokio::test]
async fn test_repeat_upload_after_success_is_a_noop() {
    let coord = spawn_coordinator().await;
    let client = reqwest::Client::new();

    let content = b"idempotent".to_vec();
    let id = FileId::from_content(&content);
    let url = format!("{}/file?id={}", coord.base_url, id);

    for _ in 0..2 {
        let status = client
            .put(&url)
            .body(content.clone())
            .send()
            .await
            .unwrap()
            .status();
        assert!(status.is_success());
    }
}

#[tokio::test]
async fn test_get_unknown_file_is_500() {
    let coord = spawn_coordinator().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!(
            "{}/file?id={}",
            coord.base_url,
            FileId::from_content(b"never uploaded")
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 500);
}

#[tokio::test]
async fn test_malformed_id_is_400() {
    let coord = spawn_coordinator().await;
    let client = reqwest::Client::new();

    let response = client
        .put(format!("{}/file?id=not-hex", coord.base_url))
        .body(Vec::from(&b"x"[..]))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let response = client
        .get(format!("{}/file", coord.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}
