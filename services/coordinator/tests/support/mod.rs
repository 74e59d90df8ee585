//! Test harness: spawns a real coordinator and workers on ephemeral
//! ports and reads build status streams frame by frame.

#![allow(dead_code)]

use std::time::Duration;

use quarry_api::{BuildRequest, BuildStarted, SignalRequest, UploadDone};
use quarry_cache::{ArtifactCache, FileCache};
use quarry_coordinator::{api, config::Config, state::AppState};
use quarry_graph::{Command, Graph, Job};
use quarry_id::{BuildId, JobId};
use serde::de::DeserializeOwned;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::time::timeout;

const FRAME_TIMEOUT: Duration = Duration::from_secs(10);

pub struct TestCoordinator {
    pub base_url: String,
    pub state: AppState,
    _cache_dir: TempDir,
}

pub async fn spawn_coordinator() -> TestCoordinator {
    let cache_dir = tempfile::tempdir().unwrap();
    let config = Config {
        listen_addr: "127.0.0.1:0".parse().unwrap(),
        cache_dir: cache_dir.path().join("files"),
        pick_timeout: Duration::from_millis(200),
        log_level: "info".into(),
    };
    let file_cache = FileCache::open(&config.cache_dir).unwrap();
    let state = AppState::new(config, file_cache);

    let app = api::create_router(state.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestCoordinator {
        base_url: format!("http://{addr}"),
        state,
        _cache_dir: cache_dir,
    }
}

pub struct TestWorker {
    pub endpoint: String,
    _cache_dir: TempDir,
}

pub async fn spawn_worker(coordinator_url: &str) -> TestWorker {
    let cache_dir = tempfile::tempdir().unwrap();
    let file_cache = FileCache::open(cache_dir.path().join("files")).unwrap();
    let artifacts = ArtifactCache::open(cache_dir.path().join("artifacts")).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let endpoint = format!("http://{addr}");

    let app = quarry_worker::api::create_router(artifacts.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let config = quarry_worker::config::Config {
        coordinator_url: coordinator_url.to_string(),
        listen_addr: addr,
        public_endpoint: endpoint.clone(),
        cache_dir: cache_dir.path().to_path_buf(),
        poll_interval: Duration::from_millis(50),
        log_level: "info".into(),
    };
    let worker = quarry_worker::Worker::new(config, file_cache, artifacts);
    tokio::spawn(async move {
        worker.run().await;
    });

    TestWorker {
        endpoint,
        _cache_dir: cache_dir,
    }
}

/// A job whose single command is a bash script.
pub fn bash_job(tag: &str, script: &str, deps: Vec<JobId>) -> Job {
    Job {
        id: JobId::from_content(format!("{tag}:{script}").as_bytes()),
        name: tag.to_string(),
        inputs: Vec::new(),
        deps,
        cmds: vec![Command {
            argv: vec!["bash".into(), "-c".into(), script.into()],
            ..Default::default()
        }],
    }
}

/// Reads a build's newline-delimited status stream.
pub struct StatusStream {
    response: reqwest::Response,
    buffer: Vec<u8>,
}

impl StatusStream {
    async fn next_line(&mut self) -> Option<String> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
                let rest = self.buffer.split_off(pos + 1);
                let mut line = std::mem::replace(&mut self.buffer, rest);
                line.pop();
                return Some(String::from_utf8(line).unwrap());
            }
            match self.response.chunk().await.unwrap() {
                Some(chunk) => self.buffer.extend_from_slice(&chunk),
                None => return None,
            }
        }
    }

    /// The next frame, parsed as `T`; `None` at end of stream.
    pub async fn next_frame<T: DeserializeOwned>(&mut self) -> Option<T> {
        let line = timeout(FRAME_TIMEOUT, self.next_line())
            .await
            .expect("timed out waiting for a status frame")?;
        Some(serde_json::from_str(&line).expect("unparsable status frame"))
    }
}

/// Submits a graph and returns the started frame plus the rest of the
/// stream.
pub async fn submit_build(
    client: &reqwest::Client,
    base_url: &str,
    graph: &Graph,
) -> (BuildStarted, StatusStream) {
    let response = client
        .post(format!("{base_url}/build"))
        .json(&BuildRequest {
            graph: graph.clone(),
        })
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let mut stream = StatusStream {
        response,
        buffer: Vec::new(),
    };
    let started = stream
        .next_frame::<BuildStarted>()
        .await
        .expect("missing started frame");
    (started, stream)
}

/// Signals upload-done for a build.
pub async fn signal_upload_done(client: &reqwest::Client, base_url: &str, build_id: BuildId) {
    let response = client
        .post(format!("{base_url}/signal?build_id={build_id}"))
        .json(&SignalRequest {
            upload_done: Some(UploadDone {}),
        })
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
}
