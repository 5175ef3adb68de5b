//! The generic resource client.
//!
//! One [`ResourceClient`] exists per resource kind. It owns the accumulated
//! [`QuerySpec`], a [`RetryingTransport`] (and through it the connection
//! state), and the [`ResponseShaper`] for its kind. Builder calls mutate the
//! spec and return the client for chaining; terminal calls render the spec,
//! fetch, and shape the response.

use std::marker::PhantomData;
use std::sync::Arc;

use query::{
    codec, shape::NGRAMS_SUB_RESOURCE, AutocompleteResponse, ClientConfig, ConnectionState,
    EntityId, FilterMap, HttpTransport, ListPayload, Listing, Meta, QueryError, QuerySpec,
    ResourceKind, ResponseShaper, SearchField, SortDirection, WithMeta, MAX_BATCH_IDENTIFIERS,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::paginator::{PaginateOptions, Paginator};
use crate::retrying::RetryingTransport;

/// Filter field matched by a batch identifier lookup.
pub const IDENTIFIER_FILTER_FIELD: &str = "openalex_id";

/// Path segment of the random-item endpoint.
const RANDOM_SEGMENT: &str = "random";

/// Query client for one resource kind, decoding items into `T`.
pub struct ResourceClient<T = Value> {
    kind: ResourceKind,
    transport: RetryingTransport,
    shaper: ResponseShaper,
    spec: QuerySpec,
    _item: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> ResourceClient<T> {
    pub fn new(
        kind: ResourceKind,
        transport: Arc<dyn HttpTransport>,
        config: Arc<ClientConfig>,
    ) -> Self {
        info!(resource = %kind, "Connection initialized");
        Self {
            kind,
            transport: RetryingTransport::new(kind, transport, config),
            shaper: ResponseShaper::new(kind),
            spec: QuerySpec::new(),
            _item: PhantomData,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// The accumulated query.
    pub fn query(&self) -> &QuerySpec {
        &self.spec
    }

    pub fn connection(&self) -> &ConnectionState {
        self.transport.connection()
    }

    // -----------------------------------------------------------------------
    // Builder
    // -----------------------------------------------------------------------

    pub fn filter(&mut self, filter: impl Into<FilterMap>) -> &mut Self {
        self.spec.filter(filter);
        self
    }

    pub fn filter_and(&mut self, filter: impl Into<FilterMap>) -> &mut Self {
        self.spec.filter_and(filter);
        self
    }

    pub fn filter_or(&mut self, filter: impl Into<FilterMap>) -> &mut Self {
        self.spec.filter_or(filter);
        self
    }

    pub fn filter_not(&mut self, filter: impl Into<FilterMap>) -> &mut Self {
        self.spec.filter_not(filter);
        self
    }

    pub fn filter_gt(&mut self, filter: impl Into<FilterMap>) -> &mut Self {
        self.spec.filter_gt(filter);
        self
    }

    pub fn filter_lt(&mut self, filter: impl Into<FilterMap>) -> &mut Self {
        self.spec.filter_lt(filter);
        self
    }

    pub fn search(&mut self, term: impl Into<String>) -> &mut Self {
        self.spec.search(term);
        self
    }

    pub fn search_field(&mut self, field: SearchField) -> &mut Self {
        self.spec.search_field(field);
        self
    }

    pub fn search_filter(&mut self, field: &str, term: impl Into<String>) -> &mut Self {
        self.spec.search_filter(field, term);
        self
    }

    pub fn sort(&mut self, field: &str, direction: SortDirection) -> &mut Self {
        self.spec.sort(field, direction);
        self
    }

    pub fn select<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec.select(fields);
        self
    }

    pub fn sample(&mut self, count: u32, seed: Option<u64>) -> &mut Self {
        self.spec.sample(count, seed);
        self
    }

    pub fn group_by(&mut self, field: impl Into<String>) -> &mut Self {
        self.spec.group_by(field);
        self
    }

    pub fn page(&mut self, page: u32) -> &mut Self {
        self.spec.page(page);
        self
    }

    pub fn per_page(&mut self, per_page: u32) -> &mut Self {
        self.spec.per_page(per_page);
        self
    }

    pub fn cursor(&mut self, cursor: impl Into<String>) -> &mut Self {
        self.spec.cursor(cursor);
        self
    }

    pub fn reset_query(&mut self) -> &mut Self {
        self.spec.reset();
        self
    }

    // -----------------------------------------------------------------------
    // Terminal operations
    // -----------------------------------------------------------------------

    /// Renders `spec` and fetches `path` through the retrying transport.
    ///
    /// The filter is compiled before the connection is touched, so shape
    /// errors never cost a request.
    pub(crate) async fn fetch_payload(
        &mut self,
        path: &str,
        spec: &QuerySpec,
    ) -> Result<Value, QueryError> {
        let params = spec.wire_params(self.transport.config().api_key.as_deref())?;
        self.transport
            .fetch(path, params)
            .await
            .map_err(QueryError::Transport)
    }

    pub(crate) fn shaper(&self) -> ResponseShaper {
        self.shaper
    }

    pub(crate) fn list_path(&self) -> String {
        format!("/{}", self.kind.endpoint())
    }

    async fn fetch_listing(&mut self, spec: &QuerySpec) -> Result<(Listing<T>, Meta), QueryError> {
        let path = self.list_path();
        let payload = self.fetch_payload(&path, spec).await?;
        self.shaper.shape_listing(payload, spec.group_by.is_some())
    }

    /// Shaped items, or group tuples when the query aggregates.
    pub async fn get(&mut self) -> Result<Listing<T>, QueryError> {
        let spec = self.spec.clone();
        let (listing, _) = self.fetch_listing(&spec).await?;
        Ok(listing)
    }

    /// Like [`get`](Self::get), with the response metadata.
    pub async fn get_with_meta(&mut self) -> Result<WithMeta<T>, QueryError> {
        let spec = self.spec.clone();
        let (listing, meta) = self.fetch_listing(&spec).await?;
        Ok(WithMeta::new(listing, meta))
    }

    /// Number of entities matching the query.
    pub async fn count(&mut self) -> Result<u64, QueryError> {
        let spec = self.spec.clone();
        let path = self.list_path();
        let payload = self.fetch_payload(&path, &spec).await?;
        let payload: ListPayload = serde_json::from_value(payload)?;
        Ok(payload.meta.count)
    }

    /// One random entity.
    pub async fn random(&mut self) -> Result<T, QueryError> {
        let spec = self.spec.clone();
        let path = format!("/{}/{RANDOM_SEGMENT}", self.kind.endpoint());
        let payload = self.fetch_payload(&path, &spec).await?;
        self.shaper.shape_item(payload)
    }

    /// One entity by identifier.
    pub async fn fetch_by_id(&mut self, id: &EntityId) -> Result<T, QueryError> {
        let spec = self.spec.clone();
        let path = format!("/{}/{}", self.kind.endpoint(), id.as_str());
        let payload = self.fetch_payload(&path, &spec).await?;
        self.shaper.shape_item(payload)
    }

    /// Up to 100 entities in one request, as an OR filter over the
    /// identifier field. The client's own query is left untouched.
    pub async fn fetch_by_ids(&mut self, ids: &[EntityId]) -> Result<Listing<T>, QueryError> {
        if ids.len() > MAX_BATCH_IDENTIFIERS {
            return Err(QueryError::TooManyIdentifiers {
                count: ids.len(),
                limit: MAX_BATCH_IDENTIFIERS,
            });
        }
        let mut spec = self.spec.clone();
        let values: Vec<String> = ids.iter().map(|id| id.as_str().to_owned()).collect();
        spec.filter_or(FilterMap::new().with(IDENTIFIER_FILTER_FIELD, values));
        let (listing, _) = self.fetch_listing(&spec).await?;
        Ok(listing)
    }

    /// The n-gram sub-resource of a work.
    pub async fn ngrams(&mut self, id: &EntityId) -> Result<Value, QueryError> {
        let path = self.shaper.sub_resource_path(id, NGRAMS_SUB_RESOURCE)?;
        self.fetch_payload(&path, &QuerySpec::new()).await
    }

    /// Type-ahead suggestions for `term`.
    pub async fn autocomplete(&mut self, term: &str) -> Result<AutocompleteResponse, QueryError> {
        let path = format!("/autocomplete/{}", self.kind.endpoint());
        let params = vec![("q".to_owned(), term.to_owned())];
        let payload = self
            .transport
            .fetch(&path, params)
            .await
            .map_err(QueryError::Transport)?;
        Ok(serde_json::from_value(payload)?)
    }

    /// Starts a lazy batch traversal of the current query.
    pub fn paginate(&mut self, options: PaginateOptions) -> Paginator<'_, T> {
        Paginator::new(self, options)
    }

    // -----------------------------------------------------------------------
    // Serialisation and lifecycle
    // -----------------------------------------------------------------------

    pub fn serialize<V: Serialize + ?Sized>(&self, value: &V) -> Result<String, QueryError> {
        codec::serialize(value)
    }

    pub fn deserialize<V: DeserializeOwned>(&self, text: &str) -> Result<V, QueryError> {
        codec::deserialize(text)
    }

    /// Clears the query and marks the connection stale.
    pub fn close(&mut self) {
        info!(resource = %self.kind, "Closing connection");
        self.spec.reset();
        self.transport.close();
    }
}
