use std::collections::HashMap;

use serde::Deserialize;

use logtail_types::{
    LogEntry, LogFilters, ResourceRef, TimeWindow, format_api_time, null_as_default,
};

use crate::error::FetchError;
use crate::resources::ResourceRegistry;

/// Lines requested per page
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Bucketing hint the API requires; the client does not use the buckets
pub const DEFAULT_INTERVAL_SECS: u64 = 14400;

/// Which log stream to query
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LogType {
    #[default]
    All,
    Build,
}

impl LogType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Build => "build",
        }
    }
}

/// One bounded time-window query against the log API
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogQuery {
    pub resource: ResourceRef,
    pub window: TimeWindow,
    pub filters: LogFilters,
    pub log_type: LogType,
    pub offset: usize,
    pub limit: usize,
    pub interval_secs: u64,
}

impl LogQuery {
    pub fn new(resource: ResourceRef, window: TimeWindow) -> Self {
        Self {
            resource,
            window,
            filters: LogFilters::default(),
            log_type: LogType::All,
            offset: 0,
            limit: DEFAULT_PAGE_SIZE,
            interval_secs: DEFAULT_INTERVAL_SECS,
        }
    }

    pub fn with_filters(mut self, filters: LogFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_log_type(mut self, log_type: LogType) -> Self {
        self.log_type = log_type;
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_interval(mut self, interval_secs: u64) -> Self {
        self.interval_secs = interval_secs;
        self
    }

    /// Query-string pairs in the order the API documents them
    pub fn query_pairs(&self, registry: &ResourceRegistry) -> Vec<(&'static str, String)> {
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();
        vec![
            ("start", format_api_time(self.window.start())),
            ("end", format_api_time(self.window.end())),
            ("resourceType", registry.plural_for(&self.resource.kind)),
            ("workloadIds", self.resource.name.clone()),
            ("type", self.log_type.as_str().to_string()),
            ("traceId", opt(&self.filters.trace_id)),
            ("limit", self.limit.to_string()),
            ("offset", self.offset.to_string()),
            ("severity", self.filters.severity_param()),
            ("search", opt(&self.filters.search)),
            ("taskId", opt(&self.filters.task_id)),
            ("executionId", opt(&self.filters.execution_id)),
            ("interval", self.interval_secs.to_string()),
            ("workspace", self.resource.workspace.clone()),
        ]
    }
}

/// One page of results for the queried resource, in backend order (newest first)
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogPage {
    pub entries: Vec<LogEntry>,
    pub total_count: usize,
}

#[derive(Debug, Default, Deserialize)]
struct ResourceLogs {
    #[serde(default, deserialize_with = "null_as_default")]
    logs: Vec<LogEntry>,
    #[serde(default, rename = "totalCount", deserialize_with = "null_as_default")]
    total_count: usize,
}

/// Parse a response body keyed by resource name
pub fn parse_response(body: &str, resource_name: &str) -> Result<LogPage, FetchError> {
    let mut response: HashMap<String, Option<ResourceLogs>> = serde_json::from_str(body)?;

    match response.remove(resource_name) {
        Some(data) => {
            let data = data.unwrap_or_default();
            Ok(LogPage {
                entries: data.logs,
                total_count: data.total_count,
            })
        }
        None => {
            let mut keys: Vec<String> = response.into_keys().collect();
            keys.sort();
            Err(FetchError::ResourceNotFound {
                resource: resource_name.to_string(),
                keys,
            })
        }
    }
}
