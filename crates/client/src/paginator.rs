//! Lazy, forward-only batch traversal of a listing query.
//!
//! A [`Paginator`] borrows its client mutably for the whole run and works on
//! a snapshot of the client's query. Each call to
//! [`next_batch`](Paginator::next_batch) issues at most one request. Once the
//! run ends, or after a failure, every further call returns `Ok(None)`.

use query::{ListPayload, PaginationRunId, QueryError, QuerySpec};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::resource::ResourceClient;

/// Initial cursor value of a cursor-mode run.
pub const CURSOR_START: &str = "*";

/// How the paginator advances between batches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PageMode {
    /// Follow the server-issued `meta.next_cursor`.
    #[default]
    Cursor,
    /// Count pages from 1.
    Page,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginateOptions {
    pub mode: PageMode,
    pub per_page: u32,
    /// Total item budget; `None` is unbounded.
    pub n_max: Option<u64>,
    /// Hard cap on the number of batches.
    pub max_pages: u32,
}

impl Default for PaginateOptions {
    fn default() -> Self {
        Self {
            mode: PageMode::Cursor,
            per_page: 25,
            n_max: Some(10_000),
            max_pages: 100,
        }
    }
}

pub struct Paginator<'a, T> {
    client: &'a mut ResourceClient<T>,
    spec: QuerySpec,
    options: PaginateOptions,
    run_id: PaginationRunId,
    page: u32,
    cursor: String,
    total_fetched: u64,
    page_count: u32,
    finished: bool,
}

impl<'a, T: DeserializeOwned> Paginator<'a, T> {
    pub(crate) fn new(client: &'a mut ResourceClient<T>, options: PaginateOptions) -> Self {
        let mut spec = client.query().clone();
        match options.mode {
            PageMode::Cursor => spec.page = None,
            PageMode::Page => spec.cursor = None,
        }
        spec.per_page(options.per_page);

        let run_id = PaginationRunId::new_random();
        debug!(resource = %client.kind(), %run_id, ?options, "Pagination started");
        Self {
            client,
            spec,
            options,
            run_id,
            page: 1,
            cursor: CURSOR_START.to_owned(),
            total_fetched: 0,
            page_count: 0,
            finished: false,
        }
    }

    pub fn run_id(&self) -> PaginationRunId {
        self.run_id
    }

    /// Items fetched so far.
    pub fn total_fetched(&self) -> u64 {
        self.total_fetched
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    fn caps_reached(&self) -> bool {
        self.options.n_max.is_some_and(|n_max| self.total_fetched >= n_max)
            || self.page_count >= self.options.max_pages
    }

    fn finish(&mut self, reason: &str) {
        debug!(
            resource = %self.client.kind(),
            run_id = %self.run_id,
            total_fetched = self.total_fetched,
            page_count = self.page_count,
            reason,
            "Pagination stopped"
        );
        self.finished = true;
    }

    /// Fetches the next batch, or `None` once the run is over.
    ///
    /// A failed fetch is raised as [`QueryError::Pagination`] and ends the
    /// run.
    pub async fn next_batch(&mut self) -> Result<Option<Vec<T>>, QueryError> {
        if self.finished {
            return Ok(None);
        }
        if self.caps_reached() {
            self.finish("limit reached");
            return Ok(None);
        }

        let mut spec = self.spec.clone();
        match self.options.mode {
            PageMode::Cursor => spec.cursor(self.cursor.clone()),
            PageMode::Page => spec.page(self.page),
        };

        let path = self.client.list_path();
        let payload = match self.client.fetch_payload(&path, &spec).await {
            Ok(payload) => payload,
            Err(QueryError::Transport(record)) => {
                error!(
                    resource = %self.client.kind(),
                    run_id = %self.run_id,
                    status = record.status,
                    message = %record.message,
                    "Pagination error"
                );
                self.finished = true;
                return Err(QueryError::pagination(record));
            }
            Err(other) => {
                self.finished = true;
                return Err(other);
            }
        };
        let payload: ListPayload = match serde_json::from_value(payload) {
            Ok(payload) => payload,
            Err(e) => {
                self.finished = true;
                return Err(e.into());
            }
        };

        if payload.results.is_empty() || payload.meta.count == 0 {
            self.finish("empty batch");
            return Ok(None);
        }

        let len = payload.results.len();
        self.total_fetched += len as u64;
        self.page_count += 1;
        let short = len < self.options.per_page as usize;

        match self.options.mode {
            PageMode::Cursor => {
                self.cursor = payload.meta.next_cursor.clone().unwrap_or_default();
                debug!(
                    resource = %self.client.kind(),
                    run_id = %self.run_id,
                    page = self.page_count,
                    cursor = %self.cursor,
                    results = len,
                    count = payload.meta.count,
                    "Batch fetched"
                );
                if self.cursor.is_empty() || short || self.caps_reached() {
                    self.finish("last cursor page");
                }
            }
            PageMode::Page => {
                self.page += 1;
                debug!(
                    resource = %self.client.kind(),
                    run_id = %self.run_id,
                    page = self.page_count,
                    results = len,
                    "Batch fetched"
                );
                if short || self.caps_reached() {
                    self.finish("last page");
                }
            }
        }

        match self.client.shaper().shape_items(payload.results) {
            Ok(items) => Ok(Some(items)),
            Err(e) => {
                self.finished = true;
                Err(e)
            }
        }
    }

    /// Drains the run into one vector of batches.
    pub async fn collect_all(mut self) -> Result<Vec<Vec<T>>, QueryError> {
        let mut batches = Vec::new();
        while let Some(batch) = self.next_batch().await? {
            batches.push(batch);
        }
        Ok(batches)
    }
}
