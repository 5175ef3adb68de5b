//! Scripted transport and logging setup shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use query::{HttpRequest, HttpResponse, HttpTransport, TransportFailure};
use serde_json::{json, Value};

type Outcome = Result<HttpResponse, TransportFailure>;

/// Answers requests from per-path queues and records every request.
///
/// The last queued outcome for a path is repeated once the queue drains.
/// Paths without a script answer 404.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<Outcome>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Queues `outcome` for requests to `path`.
    pub(crate) fn respond(&self, path: &str, outcome: Outcome) {
        self.scripts
            .lock()
            .unwrap()
            .entry(path.to_owned())
            .or_default()
            .push_back(outcome);
    }

    /// Queues a `200` JSON response.
    pub(crate) fn ok(&self, path: &str, body: Value) {
        self.respond(path, Ok(HttpResponse { status: 200, body }));
    }

    /// Queues an error status.
    pub(crate) fn status(&self, path: &str, status: u16) {
        self.respond(
            path,
            Ok(HttpResponse {
                status,
                body: json!({ "error": format!("status {status}") }),
            }),
        );
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub(crate) fn requests_to(&self, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.path == path)
            .count()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn get(&self, request: &HttpRequest) -> Result<HttpResponse, TransportFailure> {
        self.requests.lock().unwrap().push(request.clone());
        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(&request.path) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if !queue.is_empty() => queue[0].clone(),
            _ => Ok(HttpResponse {
                status: 404,
                body: json!({ "error": "no script" }),
            }),
        }
    }
}

/// Routes log output through the test harness; safe to call repeatedly.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A listing page with `ids` as items.
pub(crate) fn page(ids: &[&str], count: u64, next_cursor: Option<&str>) -> Value {
    json!({
        "results": ids.iter().map(|id| json!({ "id": id })).collect::<Vec<_>>(),
        "meta": { "count": count, "next_cursor": next_cursor },
    })
}
