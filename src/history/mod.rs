//! Crash history retrieval.
//!
//! Defines the `HistoryFetcher` trait and the paginated download helper.
//! The production implementation is the Stake GraphQL client in
//! [`stake`]; tests substitute in-memory fetchers.

pub mod stake;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::types::{CrashRecord, GatewayError, HeaderBlob};

/// Default page size (the Stake API rejects larger pages).
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Default number of records to download.
pub const DEFAULT_TARGET_COUNT: usize = 1000;

/// Source of crash history pages.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistoryFetcher: Send + Sync {
    /// Fetch up to `limit` records starting `offset` records back from the
    /// newest round, authenticated with `headers`.
    async fn fetch_page(
        &self,
        limit: u32,
        offset: u32,
        headers: &HeaderBlob,
    ) -> Result<Vec<CrashRecord>, GatewayError>;
}

/// Download up to `target_count` records in pages of `page_size`.
///
/// Stops early on an empty page. The offset advances by the number of
/// records actually received, and the result is truncated to
/// `target_count`. Records are returned in API order (newest first).
pub async fn fetch_history(
    fetcher: &dyn HistoryFetcher,
    headers: &HeaderBlob,
    target_count: usize,
    page_size: u32,
) -> Result<Vec<CrashRecord>, GatewayError> {
    if page_size == 0 {
        return Err(GatewayError::Malformed("page size must be positive".into()));
    }

    let mut records: Vec<CrashRecord> = Vec::with_capacity(target_count.min(page_size as usize));
    let mut offset: u32 = 0;

    while records.len() < target_count {
        let remaining = target_count - records.len();
        let limit = page_size.min(u32::try_from(remaining).unwrap_or(u32::MAX));

        debug!(offset, limit, "Fetching history page");
        let page = fetcher.fetch_page(limit, offset, headers).await?;
        if page.is_empty() {
            info!(fetched = records.len(), "No more history available");
            break;
        }

        offset = offset.saturating_add(u32::try_from(page.len()).unwrap_or(u32::MAX));
        records.extend(page);
        debug!(fetched = records.len(), target = target_count, "History page received");
    }

    records.truncate(target_count);
    info!(count = records.len(), "History download complete");
    Ok(records)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
