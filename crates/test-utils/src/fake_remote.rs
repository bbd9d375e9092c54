use std::sync::{Arc, Mutex};

use minipipe::errors::{MinipipeError, Result};
use minipipe::exec::{BoxFuture, CiRemote, PipelineStatus};

#[derive(Debug, Default)]
struct State {
    ready: bool,
    open_merge_request: bool,
    status: PipelineStatus,
    fail_run: bool,
    panic_on_run: bool,
    calls: Vec<String>,
}

/// A scripted CI remote that records every call as `"<op> <arg>"`.
#[derive(Debug, Clone)]
pub struct FakeRemote {
    state: Arc<Mutex<State>>,
}

impl Default for FakeRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeRemote {
    /// Ready, no open merge request, an empty successful pipeline.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                ready: true,
                ..State::default()
            })),
        }
    }

    pub fn not_ready(self) -> Self {
        self.lock().ready = false;
        self
    }

    pub fn with_open_merge_request(self) -> Self {
        self.lock().open_merge_request = true;
        self
    }

    pub fn with_failed_jobs(self, jobs: &[&str]) -> Self {
        self.lock().status.failed_jobs = jobs.iter().map(|j| j.to_string()).collect();
        self
    }

    pub fn running(self) -> Self {
        self.lock().status.running = true;
        self
    }

    pub fn with_url(self, url: &str) -> Self {
        self.lock().status.url = Some(url.to_string());
        self
    }

    pub fn failing_run(self) -> Self {
        self.lock().fail_run = true;
        self
    }

    pub fn panicking_run(self) -> Self {
        self.lock().panic_on_run = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: String) {
        self.lock().calls.push(call);
    }
}

impl CiRemote for FakeRemote {
    fn ensure_ready(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.record("ensure_ready".to_string());
            if self.lock().ready {
                Ok(())
            } else {
                Err(MinipipeError::Remote("glab is not logged in".to_string()))
            }
        })
    }

    fn pipeline_status<'a>(&'a self, reference: &'a str) -> BoxFuture<'a, Result<PipelineStatus>> {
        Box::pin(async move {
            self.record(format!("pipeline_status {reference}"));
            Ok(self.lock().status.clone())
        })
    }

    fn has_open_merge_request<'a>(&'a self, branch: &'a str) -> BoxFuture<'a, Result<bool>> {
        Box::pin(async move {
            self.record(format!("has_open_merge_request {branch}"));
            Ok(self.lock().open_merge_request)
        })
    }

    fn run_pipeline<'a>(&'a self, branch: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.record(format!("run_pipeline {branch}"));
            let (fail, panic) = {
                let state = self.lock();
                (state.fail_run, state.panic_on_run)
            };
            if panic {
                panic!("fake remote panicked while starting a pipeline");
            }
            if fail {
                return Err(MinipipeError::Remote("cannot start pipeline".to_string()));
            }
            Ok(())
        })
    }
}
