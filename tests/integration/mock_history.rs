//! Mock crash history source for integration testing.
//!
//! Serves a fixed history newest-first, the way the Stake API pages it,
//! and records every request it receives.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crash_analytics::history::HistoryFetcher;
use crash_analytics::types::{CrashRecord, GatewayError, HeaderBlob};

/// A deterministic history fetcher.
pub struct MockHistory {
    /// Newest round first.
    rounds: Vec<CrashRecord>,
    requests: Arc<Mutex<Vec<(u32, u32)>>>,
    /// If set, every page request fails with this upstream status.
    force_status: Arc<Mutex<Option<u16>>>,
}

impl MockHistory {
    /// Build from crash points listed oldest first.
    pub fn from_chronological(points: &[f64]) -> Self {
        let rounds = points
            .iter()
            .enumerate()
            .rev()
            .map(|(i, &p)| CrashRecord {
                id: format!("round-{i}"),
                ..CrashRecord::from_crashpoint(p)
            })
            .collect();
        Self {
            rounds,
            requests: Arc::new(Mutex::new(Vec::new())),
            force_status: Arc::new(Mutex::new(None)),
        }
    }

    pub fn fail_with(&self, status: u16) {
        *self.force_status.lock().unwrap() = Some(status);
    }

    /// `(limit, offset)` of every request so far.
    pub fn requests(&self) -> Vec<(u32, u32)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HistoryFetcher for MockHistory {
    async fn fetch_page(
        &self,
        limit: u32,
        offset: u32,
        headers: &HeaderBlob,
    ) -> Result<Vec<CrashRecord>, GatewayError> {
        self.requests.lock().unwrap().push((limit, offset));

        if let Some(status) = *self.force_status.lock().unwrap() {
            return Err(GatewayError::Upstream {
                status,
                message: "forced failure".into(),
            });
        }
        if !headers.contains_key("x-access-token") {
            return Err(GatewayError::Upstream {
                status: 403,
                message: "missing access token".into(),
            });
        }

        let start = (offset as usize).min(self.rounds.len());
        let end = (start + limit as usize).min(self.rounds.len());
        Ok(self.rounds[start..end].to_vec())
    }
}
