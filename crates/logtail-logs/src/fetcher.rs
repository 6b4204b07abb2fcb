use std::sync::Arc;

use logtail_api::{FetchError, LogQuery, LogSource};
use logtail_types::{LogEntry, LogFilters, ResourceRef, TimeWindow};

use crate::config::EngineConfig;
use crate::dedup::Deduplicator;
use crate::error::SessionError;
use crate::order;

/// Fetch consecutive pages of one query, in backend order
///
/// Stops at an empty or short page, once `total_count` lines are in hand, or
/// after `max_pages` requests.
pub(crate) async fn fetch_pages<S: LogSource>(
    source: &S,
    mut query: LogQuery,
    max_pages: usize,
) -> Result<Vec<LogEntry>, FetchError> {
    let mut entries = Vec::new();

    for _ in 0..max_pages.max(1) {
        let page = source.fetch(&query).await?;
        let received = page.entries.len();
        entries.extend(page.entries);

        if received == 0 || received < query.limit || entries.len() >= page.total_count {
            break;
        }
        query.offset += received;
    }

    Ok(entries)
}

/// Single-shot log fetch over a fixed time range
pub struct LogFetcher<S: LogSource> {
    source: Arc<S>,
    resource: ResourceRef,
    window: TimeWindow,
    filters: LogFilters,
    config: EngineConfig,
}

impl<S: LogSource> LogFetcher<S> {
    pub fn new(
        source: Arc<S>,
        resource: ResourceRef,
        window: TimeWindow,
        filters: LogFilters,
        config: EngineConfig,
    ) -> Result<Self, SessionError> {
        if let Some(field) = resource.missing_field() {
            return Err(SessionError::InvalidInput(format!("{} is required", field)));
        }
        if let Some(reason) = config.invalid_setting() {
            return Err(SessionError::InvalidInput(reason.to_string()));
        }
        window.ensure_within(config.max_query_range)?;

        Ok(Self {
            source,
            resource,
            window,
            filters,
            config,
        })
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    /// All lines in the window, oldest first, each `(timestamp, message)` once
    pub async fn fetch_logs(&self) -> Result<Vec<LogEntry>, FetchError> {
        let query = LogQuery::new(self.resource.clone(), self.window)
            .with_filters(self.filters.clone())
            .with_log_type(self.config.log_type)
            .with_limit(self.config.page_size)
            .with_interval(self.config.interval_secs);

        let entries = match fetch_pages(self.source.as_ref(), query, self.config.max_pages).await {
            Ok(entries) => entries,
            Err(e) if e.is_resource_not_found() && self.config.missing_resource_is_empty => {
                tracing::debug!(resource = %self.resource, "resource absent from response");
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let total = entries.len();
        let entries = Deduplicator::new().retain_new(order::chronological(entries));
        tracing::debug!(
            resource = %self.resource,
            received = total,
            unique = entries.len(),
            "fetched logs"
        );
        Ok(entries)
    }
}
