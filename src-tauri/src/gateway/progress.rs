use std::sync::{Arc, Mutex, PoisonError};

/// Callback receiving upload percentages.
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

/// Converts byte counts into rounded, non-decreasing percentages and forwards
/// each new value to a callback at most once.
pub struct ProgressTracker {
    total: u64,
    sent: Mutex<(u64, Option<u8>)>,
    callback: ProgressFn,
}

/// `round(sent * 100 / total)` in integer arithmetic, capped at 100.
pub fn percent_of(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let sent = sent.min(total) as u128;
    let total = total as u128;
    ((sent * 200 + total) / (2 * total)) as u8
}

impl ProgressTracker {
    pub fn new(total: u64, callback: ProgressFn) -> Self {
        Self {
            total,
            sent: Mutex::new((0, None)),
            callback,
        }
    }

    /// Record `bytes` more handed to the connection.
    pub fn advance(&self, bytes: u64) {
        let report = {
            let mut guard = self.sent.lock().unwrap_or_else(PoisonError::into_inner);
            guard.0 = guard.0.saturating_add(bytes);
            let percent = percent_of(guard.0, self.total);
            if guard.1.map_or(true, |last| percent > last) {
                guard.1 = Some(percent);
                Some(percent)
            } else {
                None
            }
        };
        if let Some(percent) = report {
            (self.callback)(percent);
        }
    }

    /// Report 100 unless it was already reported.
    pub fn finish(&self) {
        let report = {
            let mut guard = self.sent.lock().unwrap_or_else(PoisonError::into_inner);
            if guard.1 == Some(100) {
                false
            } else {
                guard.1 = Some(100);
                true
            }
        };
        if report {
            (self.callback)(100);
        }
    }
}
