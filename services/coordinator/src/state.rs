//! Application state shared across request handlers.

use std::sync::Arc;

use quarry_cache::FileCache;

use crate::api::files::UploadGroup;
use crate::build::UploadGates;
use crate::config::Config;
use crate::scheduler::Scheduler;

/// Shared coordinator state, passed to handlers via axum's state
/// extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    scheduler: Scheduler,
    file_cache: FileCache,
    gates: UploadGates,
    uploads: UploadGroup,
}

impl AppState {
    pub fn new(config: Config, file_cache: FileCache) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                scheduler: Scheduler::new(),
                file_cache,
                gates: UploadGates::new(),
                uploads: UploadGroup::new(),
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }

    pub fn file_cache(&self) -> &FileCache {
        &self.inner.file_cache
    }

    pub fn gates(&self) -> &UploadGates {
        &self.inner.gates
    }

    pub fn uploads(&self) -> &UploadGroup {
        &self.inner.uploads
    }
}
