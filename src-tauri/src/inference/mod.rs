//! Asynchronous inference: start a job, poll its status until it settles,
//! and keep at most one live loop per file.

pub mod jobs;
pub mod poller;

pub use jobs::InferenceJobs;
pub use poller::{
    InferenceObserver, InferencePoller, InferenceState, PollConfig, PollHandle,
    JOB_FAILED_MESSAGE, RUN_FAILED_MESSAGE, TIMED_OUT_MESSAGE,
};
