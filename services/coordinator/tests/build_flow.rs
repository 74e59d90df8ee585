//! End-to-end build scenarios: one coordinator, real workers, real
//! processes.

mod support;

use std::collections::HashMap;

use quarry_api::StatusUpdate;
use quarry_graph::Graph;
use quarry_id::FileId;
use support::{bash_job, signal_upload_done, spawn_coordinator, spawn_worker, submit_build};

#[tokio::test]
async fn test_single_job_no_sources() {
    let coord = spawn_coordinator().await;
    let _worker = spawn_worker(&coord.base_url).await;

    let job = bash_job("noop", "exit 0", vec![]);
    let graph = Graph {
        source_files: HashMap::new(),
        jobs: vec![job.clone()],
    };

    let client = reqwest::Client::new();
    let (started, mut stream) = submit_build(&client, &coord.base_url, &graph).await;
    assert!(started.missing_files.is_empty());

    signal_upload_done(&client, &coord.base_url, started.id).await;

    match stream.next_frame::<StatusUpdate>().await.unwrap() {
        StatusUpdate::JobFinished(result) => {
            assert_eq!(result.id, job.id);
            assert_eq!(result.exit_code, 0);
            assert!(result.error.is_empty());
        }
        other => panic!("expected job_finished, got {other:?}"),
    }

    assert!(matches!(
        stream.next_frame::<StatusUpdate>().await.unwrap(),
        StatusUpdate::BuildFinished(_)
    ));
    assert!(stream.next_frame::<StatusUpdate>().await.is_none());
}

#[tokio::test]
async fn test_missing_source_is_uploaded_then_consumed() {
    let coord = spawn_coordinator().await;
    let _worker = spawn_worker(&coord.base_url).await;

    let content = b"hello quarry\n";
    let file_id = FileId::from_content(content);
    let mut job = bash_job("cat-src", "cat main.txt", vec![]);
    job.inputs.push("main.txt".to_string());

    let graph = Graph {
        source_files: HashMap::from([(file_id, "main.txt".to_string())]),
        jobs: vec![job.clone()],
    };

    let client = reqwest::Client::new();
    let (started, mut stream) = submit_build(&client, &coord.base_url, &graph).await;
    assert_eq!(started.missing_files, vec![file_id]);

    let response = client
        .put(format!("{}/file?id={}", coord.base_url, file_id))
        .body(content.to_vec())
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    signal_upload_done(&client, &coord.base_url, started.id).await;

    match stream.next_frame::<StatusUpdate>().await.unwrap() {
        StatusUpdate::JobFinished(result) => {
            assert_eq!(result.exit_code, 0);
            assert_eq!(result.stdout, content);
        }
        other => panic!("expected job_finished, got {other:?}"),
    }
    assert!(matches!(
        stream.next_frame::<StatusUpdate>().await.unwrap(),
        StatusUpdate::BuildFinished(_)
    ));

    // The file is cached now; a rebuild reports nothing missing.
    let (restarted, mut restream) = submit_build(&client, &coord.base_url, &graph).await;
    assert!(restarted.missing_files.is_empty());
    signal_upload_done(&client, &coord.base_url, restarted.id).await;
    assert!(matches!(
        restream.next_frame::<StatusUpdate>().await.unwrap(),
        StatusUpdate::JobFinished(_)
    ));
}

#[tokio::test]
async fn test_two_job_chain_streams_in_order() {
    let coord = spawn_coordinator().await;
    let _worker_a = spawn_worker(&coord.base_url).await;
    let _worker_b = spawn_worker(&coord.base_url).await;

    let job_a = bash_job("produce", "echo -n from-a > {{OUTPUT_DIR}}/out.txt", vec![]);
    let job_b = bash_job(
        "consume",
        &format!("cat {{{{DEP:{}}}}}/out.txt", job_a.id),
        vec![job_a.id],
    );

    let graph = Graph {
        source_files: HashMap::new(),
        jobs: vec![job_a.clone(), job_b.clone()],
    };

    let client = reqwest::Client::new();
    let (started, mut stream) = submit_build(&client, &coord.base_url, &graph).await;
    signal_upload_done(&client, &coord.base_url, started.id).await;

    match stream.next_frame::<StatusUpdate>().await.unwrap() {
        StatusUpdate::JobFinished(result) => {
            assert_eq!(result.id, job_a.id, "dep must finish first");
            assert_eq!(result.exit_code, 0);
        }
        other => panic!("expected job_finished, got {other:?}"),
    }

    // The artifact index now knows who executed A.
    assert!(coord.state.scheduler().locate_artifact(job_a.id).is_some());

    match stream.next_frame::<StatusUpdate>().await.unwrap() {
        StatusUpdate::JobFinished(result) => {
            assert_eq!(result.id, job_b.id);
            assert_eq!(result.exit_code, 0);
            assert_eq!(result.stdout, b"from-a", "B reads A's artifact");
        }
        other => panic!("expected job_finished, got {other:?}"),
    }

    assert!(matches!(
        stream.next_frame::<StatusUpdate>().await.unwrap(),
        StatusUpdate::BuildFinished(_)
    ));
}

#[tokio::test]
async fn test_command_failure_carries_exit_code_and_stderr() {
    let coord = spawn_coordinator().await;
    let _worker = spawn_worker(&coord.base_url).await;

    let job = bash_job("fails", "echo -n boom >&2; exit 7", vec![]);
    let graph = Graph {
        source_files: HashMap::new(),
        jobs: vec![job.clone()],
    };

    let client = reqwest::Client::new();
    let (started, mut stream) = submit_build(&client, &coord.base_url, &graph).await;
    signal_upload_done(&client, &coord.base_url, started.id).await;

    match stream.next_frame::<StatusUpdate>().await.unwrap() {
        StatusUpdate::JobFinished(result) => {
            assert_eq!(result.exit_code, 7);
            assert_eq!(result.stderr, b"boom");
            assert!(!result.error.is_empty());
        }
        other => panic!("expected job_finished, got {other:?}"),
    }

    // A failed job does not fail the stream's grammar.
    assert!(matches!(
        stream.next_frame::<StatusUpdate>().await.unwrap(),
        StatusUpdate::BuildFinished(_)
    ));
}

#[tokio::test]
async fn test_cyclic_graph_is_rejected_before_streaming() {
    let coord = spawn_coordinator().await;

    let mut job_a = bash_job("a", "exit 0", vec![]);
    let job_b = bash_job("b", "exit 0", vec![job_a.id]);
    job_a.deps.push(job_b.id);

    let graph = Graph {
        source_files: HashMap::new(),
        jobs: vec![job_a, job_b],
    };

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/build", coord.base_url))
        .json(&quarry_api::BuildRequest { graph })
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    assert!(response.text().await.unwrap().contains("cycle"));
}

#[tokio::test]
async fn test_signal_for_unknown_build_is_rejected() {
    let coord = spawn_coordinator().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!(
            "{}/signal?build_id={}",
            coord.base_url,
            quarry_id::BuildId::random()
        ))
        .json(&quarry_api::SignalRequest {
            upload_done: Some(quarry_api::UploadDone {}),
        })
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}
