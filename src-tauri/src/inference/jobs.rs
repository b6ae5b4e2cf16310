use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info};

use super::poller::{InferenceObserver, InferencePoller, PollHandle};
use crate::error::{ApiError, DicomViewError};

/// Live poll loops keyed by file identifier. At most one unfinished loop
/// exists per identifier.
pub struct InferenceJobs {
    poller: InferencePoller,
    jobs: Mutex<HashMap<String, PollHandle>>,
}

impl InferenceJobs {
    pub fn new(poller: InferencePoller) -> Self {
        Self {
            poller,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    pub fn start(
        &self,
        file_id: &str,
        observer: Arc<dyn InferenceObserver>,
    ) -> Result<(), DicomViewError> {
        let file_id = file_id.trim();
        if file_id.is_empty() {
            return Err(ApiError::validation("File ID is required").into());
        }

        let mut jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
        jobs.retain(|_, handle| !handle.is_finished());
        if jobs.contains_key(file_id) {
            return Err(DicomViewError::AlreadyRunning(file_id.to_string()));
        }

        let handle = self.poller.spawn(file_id, observer);
        jobs.insert(file_id.to_string(), handle);
        debug!("{} inference loop(s) active", jobs.len());
        Ok(())
    }

    /// Cancel and forget the loop for `file_id`. Returns whether one existed.
    pub fn cancel(&self, file_id: &str) -> bool {
        let removed = self
            .jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(file_id);
        match removed {
            Some(handle) => {
                handle.cancel();
                info!("Cancelled inference loop for {}", file_id);
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self, file_id: &str) -> bool {
        self.jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(file_id)
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Cancel every loop.
    pub fn dispose(&self) {
        let drained: Vec<PollHandle> = self
            .jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, handle)| handle)
            .collect();
        if !drained.is_empty() {
            info!("Cancelling {} inference loop(s)", drained.len());
        }
        for handle in drained {
            handle.cancel();
        }
    }
}
