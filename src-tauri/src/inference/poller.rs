use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::gateway::types::{InferenceResult, JobStatus};
use crate::gateway::InferenceApi;

pub const RUN_FAILED_MESSAGE: &str = "Failed to run inference. Please try again.";
pub const JOB_FAILED_MESSAGE: &str = "Inference failed. Please try again.";
pub const TIMED_OUT_MESSAGE: &str = "Inference timed out. Please try again.";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Delay between status queries and optional bounds on a single run.
#[derive(Debug, Clone, PartialEq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: Option<u32>,
    pub timeout: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: None,
            timeout: None,
        }
    }
}

/// Client-side view of one inference run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum InferenceState {
    Idle,
    Starting,
    Polling {
        attempt: u32,
        last_status: Option<JobStatus>,
    },
    Completed {
        result: InferenceResult,
    },
    Failed {
        message: String,
    },
    Cancelled,
}

impl InferenceState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            InferenceState::Completed { .. } | InferenceState::Failed { .. } | InferenceState::Cancelled
        )
    }

    fn failed(message: &str) -> Self {
        InferenceState::Failed {
            message: message.to_string(),
        }
    }
}

/// Receives every state transition of a run, in order.
pub trait InferenceObserver: Send + Sync {
    fn on_state(&self, file_id: &str, state: &InferenceState);
}

impl<F> InferenceObserver for F
where
    F: Fn(&str, &InferenceState) + Send + Sync,
{
    fn on_state(&self, file_id: &str, state: &InferenceState) {
        self(file_id, state)
    }
}

/// Owner's side of a spawned run.
pub struct PollHandle {
    file_id: String,
    cancel: CancellationToken,
    task: JoinHandle<InferenceState>,
}

impl PollHandle {
    /// Stop the loop. Any in-flight response is discarded and no further
    /// query is issued.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the terminal state of the run.
    pub async fn outcome(self) -> InferenceState {
        match self.task.await {
            Ok(state) => state,
            Err(e) if e.is_cancelled() => InferenceState::Cancelled,
            Err(e) => {
                warn!("Inference task for {} panicked: {}", self.file_id, e);
                InferenceState::failed(RUN_FAILED_MESSAGE)
            }
        }
    }
}

/// Starts inference jobs and polls them to a terminal state.
#[derive(Clone)]
pub struct InferencePoller {
    api: Arc<dyn InferenceApi>,
    config: PollConfig,
}

impl InferencePoller {
    pub fn new(api: Arc<dyn InferenceApi>, config: PollConfig) -> Self {
        Self { api, config }
    }

    pub fn spawn(&self, file_id: &str, observer: Arc<dyn InferenceObserver>) -> PollHandle {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(
            self.api.clone(),
            file_id.to_string(),
            self.config.clone(),
            observer,
            cancel.clone(),
        ));
        PollHandle {
            file_id: file_id.to_string(),
            cancel,
            task,
        }
    }
}

async fn run(
    api: Arc<dyn InferenceApi>,
    file_id: String,
    config: PollConfig,
    observer: Arc<dyn InferenceObserver>,
    cancel: CancellationToken,
) -> InferenceState {
    let report = |state: InferenceState| {
        observer.on_state(&file_id, &state);
        state
    };
    let started = Instant::now();

    info!("Starting inference for {}", file_id);
    report(InferenceState::Starting);

    let start = tokio::select! {
        biased;
        _ = cancel.cancelled() => return report(InferenceState::Cancelled),
        r = api.start_inference(&file_id) => r,
    };
    if let Err(e) = start {
        warn!("Failed to start inference for {}: {}", file_id, e);
        return report(InferenceState::failed(RUN_FAILED_MESSAGE));
    }

    let mut attempt: u32 = 0;
    let mut last_status = None;
    loop {
        let out_of_attempts = config.max_attempts.is_some_and(|max| attempt >= max);
        let out_of_time = config.timeout.is_some_and(|t| started.elapsed() >= t);
        if out_of_attempts || out_of_time {
            warn!("Inference for {} gave up after {} status queries", file_id, attempt);
            return report(InferenceState::failed(TIMED_OUT_MESSAGE));
        }

        attempt += 1;
        report(InferenceState::Polling { attempt, last_status });

        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => return report(InferenceState::Cancelled),
            r = api.inference_status(&file_id) => r,
        };
        if cancel.is_cancelled() {
            return report(InferenceState::Cancelled);
        }
        let status = match status {
            Ok(status) => status,
            Err(e) => {
                warn!("Status query {} for {} failed: {}", attempt, file_id, e);
                return report(InferenceState::failed(RUN_FAILED_MESSAGE));
            }
        };
        debug!("Inference {} status {:?} (query {})", file_id, status.status, attempt);

        match status.status {
            JobStatus::Completed => {
                let results = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return report(InferenceState::Cancelled),
                    r = api.inference_results(&file_id) => r,
                };
                if cancel.is_cancelled() {
                    return report(InferenceState::Cancelled);
                }
                return match results {
                    Ok(result) => {
                        info!("Inference for {} completed", file_id);
                        report(InferenceState::Completed { result })
                    }
                    Err(e) => {
                        warn!("Failed to fetch results for {}: {}", file_id, e);
                        report(InferenceState::failed(RUN_FAILED_MESSAGE))
                    }
                };
            }
            JobStatus::Failed => {
                let message = status
                    .error
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| JOB_FAILED_MESSAGE.to_string());
                warn!("Inference for {} failed: {}", file_id, message);
                return report(InferenceState::Failed { message });
            }
            JobStatus::Pending | JobStatus::Processing => {
                last_status = Some(status.status);
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return report(InferenceState::Cancelled),
                    _ = tokio::time::sleep(config.interval) => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::gateway::types::{InferenceStatus, StartInferenceResponse};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct ScriptedApi {
        start_error: Option<ApiError>,
        statuses: Mutex<VecDeque<Result<InferenceStatus, ApiError>>>,
        result: Result<InferenceResult, ApiError>,
        status_calls: Mutex<Vec<Instant>>,
        result_calls: AtomicUsize,
    }

    impl ScriptedApi {
        fn new(statuses: Vec<Result<InferenceStatus, ApiError>>) -> Self {
            Self {
                start_error: None,
                statuses: Mutex::new(statuses.into()),
                result: Ok(nodule_result()),
                status_calls: Mutex::new(Vec::new()),
                result_calls: AtomicUsize::new(0),
            }
        }

        fn status_count(&self) -> usize {
            self.status_calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl InferenceApi for ScriptedApi {
        async fn start_inference(&self, file_id: &str) -> Result<StartInferenceResponse, ApiError> {
            match &self.start_error {
                Some(e) => Err(e.clone()),
                None => Ok(StartInferenceResponse {
                    file_id: file_id.to_string(),
                }),
            }
        }

        async fn inference_status(&self, _file_id: &str) -> Result<InferenceStatus, ApiError> {
            self.status_calls.lock().unwrap().push(Instant::now());
            // Once the script runs out the job stays in processing
            self.statuses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(status(JobStatus::Processing, None)))
        }

        async fn inference_results(&self, _file_id: &str) -> Result<InferenceResult, ApiError> {
            self.result_calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    fn status(status: JobStatus, error: Option<&str>) -> InferenceStatus {
        InferenceStatus {
            status,
            started_at: None,
            completed_at: None,
            results: None,
            error: error.map(str::to_string),
        }
    }

    fn nodule_result() -> InferenceResult {
        InferenceResult {
            findings: vec!["nodule".to_string()],
            confidence: 0.92,
            measurements: None,
            recommendations: None,
        }
    }

    #[derive(Default)]
    struct Recorder {
        states: Mutex<Vec<(String, InferenceState)>>,
    }

    impl InferenceObserver for Recorder {
        fn on_state(&self, file_id: &str, state: &InferenceState) {
            self.states
                .lock()
                .unwrap()
                .push((file_id.to_string(), state.clone()));
        }
    }

    impl Recorder {
        fn terminal_states(&self) -> Vec<InferenceState> {
            self.states
                .lock()
                .unwrap()
                .iter()
                .map(|(_, s)| s.clone())
                .filter(InferenceState::is_terminal)
                .collect()
        }
    }

    fn spawn(api: &Arc<ScriptedApi>, config: PollConfig) -> (PollHandle, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let poller = InferencePoller::new(api.clone(), config);
        let handle = poller.spawn("abc123", recorder.clone());
        (handle, recorder)
    }

    #[tokio::test(start_paused = true)]
    async fn test_processing_then_completed_delivers_results_once() {
        let api = Arc::new(ScriptedApi::new(vec![
            Ok(status(JobStatus::Processing, None)),
            Ok(status(JobStatus::Completed, None)),
        ]));
        let (handle, recorder) = spawn(&api, PollConfig::default());

        let outcome = handle.outcome().await;
        assert_eq!(outcome, InferenceState::Completed { result: nodule_result() });
        assert_eq!(api.status_count(), 2, "no third status query after completion");
        assert_eq!(api.result_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            recorder.terminal_states(),
            vec![InferenceState::Completed { result: nodule_result() }],
            "completion reported exactly once"
        );

        let states = recorder.states.lock().unwrap();
        assert!(states.iter().all(|(id, _)| id == "abc123"));
        assert_eq!(states[0].1, InferenceState::Starting);
        assert_eq!(
            states[2].1,
            InferenceState::Polling {
                attempt: 2,
                last_status: Some(JobStatus::Processing)
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_failure_never_queries_status() {
        let mut api = ScriptedApi::new(vec![]);
        api.start_error = Some(ApiError::server("Internal error", 500, None));
        let api = Arc::new(api);
        let (handle, recorder) = spawn(&api, PollConfig::default());

        assert_eq!(handle.outcome().await, InferenceState::failed(RUN_FAILED_MESSAGE));
        assert_eq!(api.status_count(), 0);
        assert_eq!(recorder.terminal_states().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_requeries_after_interval() {
        let api = Arc::new(ScriptedApi::new(vec![
            Ok(status(JobStatus::Pending, None)),
            Ok(status(JobStatus::Processing, None)),
            Ok(status(JobStatus::Completed, None)),
        ]));
        let (handle, _) = spawn(&api, PollConfig::default());
        handle.outcome().await;

        let calls = api.status_calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        for pair in calls.windows(2) {
            assert!(
                pair[1] - pair[0] >= Duration::from_millis(2000),
                "re-query came sooner than the poll interval"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_status_uses_server_error() {
        let api = Arc::new(ScriptedApi::new(vec![Ok(status(
            JobStatus::Failed,
            Some("Model could not read pixel data"),
        ))]));
        let (handle, _) = spawn(&api, PollConfig::default());

        assert_eq!(
            handle.outcome().await,
            InferenceState::failed("Model could not read pixel data")
        );
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(api.status_count(), 1, "no polling after failure");
        assert_eq!(api.result_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_status_without_error_uses_fallback() {
        let api = Arc::new(ScriptedApi::new(vec![Ok(status(JobStatus::Failed, None))]));
        let (handle, _) = spawn(&api, PollConfig::default());
        assert_eq!(handle.outcome().await, InferenceState::failed(JOB_FAILED_MESSAGE));
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_error_fails_without_retry() {
        let api = Arc::new(ScriptedApi::new(vec![
            Ok(status(JobStatus::Processing, None)),
            Err(ApiError::network("Failed to get inference status")),
        ]));
        let (handle, _) = spawn(&api, PollConfig::default());

        assert_eq!(handle.outcome().await, InferenceState::failed(RUN_FAILED_MESSAGE));
        assert_eq!(api.status_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_error_fails_generic() {
        let mut api = ScriptedApi::new(vec![Ok(status(JobStatus::Completed, None))]);
        api.result = Err(ApiError::server("Results missing", 404, None));
        let api = Arc::new(api);
        let (handle, _) = spawn(&api, PollConfig::default());

        assert_eq!(handle.outcome().await, InferenceState::failed(RUN_FAILED_MESSAGE));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_polling() {
        let api = Arc::new(ScriptedApi::new(vec![]));
        let (handle, recorder) = spawn(&api, PollConfig::default());

        tokio::time::sleep(Duration::from_millis(5000)).await;
        handle.cancel();
        assert_eq!(handle.outcome().await, InferenceState::Cancelled);

        let queried = api.status_count();
        assert!(queried >= 1);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(api.status_count(), queried, "no queries after cancel");
        assert_eq!(recorder.terminal_states(), vec![InferenceState::Cancelled]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_attempts_times_out() {
        let api = Arc::new(ScriptedApi::new(vec![]));
        let config = PollConfig {
            max_attempts: Some(3),
            ..PollConfig::default()
        };
        let (handle, _) = spawn(&api, config);

        assert_eq!(handle.outcome().await, InferenceState::failed(TIMED_OUT_MESSAGE));
        assert_eq!(api.status_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overall_timeout() {
        let api = Arc::new(ScriptedApi::new(vec![]));
        let config = PollConfig {
            timeout: Some(Duration::from_secs(5)),
            ..PollConfig::default()
        };
        let (handle, _) = spawn(&api, config);

        assert_eq!(handle.outcome().await, InferenceState::failed(TIMED_OUT_MESSAGE));
        // Queries at 0s, 2s, 4s; the check at 6s gives up
        assert_eq!(api.status_count(), 3);
    }

    #[test]
    fn test_state_serializes_tagged() {
        let json = serde_json::to_value(InferenceState::Polling {
            attempt: 2,
            last_status: Some(JobStatus::Pending),
        })
        .unwrap();
        assert_eq!(json["state"], "polling");
        assert_eq!(json["lastStatus"], "pending");

        let json = serde_json::to_value(InferenceState::failed("boom")).unwrap();
        assert_eq!(json["state"], "failed");
        assert_eq!(json["message"], "boom");
    }
}
