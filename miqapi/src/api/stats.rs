//! Request accounting shared by every clone of a client

use std::time::Instant;
use tokio::sync::Mutex;

/// Counters over every request the client issued, including expected failures.
#[derive(Debug, Default, Clone)]
pub struct RequestStats {
    pub total_requests: u64,
    pub failed_requests: u64,
    pub retried_requests: u64,
    pub last_request: Option<Instant>,
}

#[derive(Debug, Default)]
pub(crate) struct StatsRecorder(Mutex<RequestStats>);

impl StatsRecorder {
    pub(crate) async fn request(&self, success: bool) {
        let mut stats = self.0.lock().await;
        stats.total_requests += 1;
        if !success {
            stats.failed_requests += 1;
        }
        stats.last_request = Some(Instant::now());
    }

    pub(crate) async fn retry(&self) {
        self.0.lock().await.retried_requests += 1;
    }

    pub(crate) async fn snapshot(&self) -> RequestStats {
        self.0.lock().await.clone()
    }
}
