//! In-memory log source for engine tests

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use logtail_api::{FetchError, LogPage, LogQuery, LogSource};

/// Answers each query with `respond(call_index, query)`
pub struct FnSource<F> {
    respond: F,
    calls: AtomicUsize,
    queries: Mutex<Vec<LogQuery>>,
}

impl<F> FnSource<F>
where
    F: Fn(usize, &LogQuery) -> Result<LogPage, FetchError> + Send + Sync + 'static,
{
    pub fn new(respond: F) -> Self {
        Self {
            respond,
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<LogQuery> {
        self.queries.lock().clone()
    }
}

impl<F> LogSource for FnSource<F>
where
    F: Fn(usize, &LogQuery) -> Result<LogPage, FetchError> + Send + Sync + 'static,
{
    fn fetch(&self, query: &LogQuery) -> impl Future<Output = Result<LogPage, FetchError>> + Send {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().push(query.clone());
        let result = (self.respond)(call, query);
        async move { result }
    }
}
