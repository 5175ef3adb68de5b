//! Request engine for the scholarly API.
//!
//! Drives the `query` domain types over HTTP: one [`ResourceClient`] per
//! resource kind, each with its own query, connection state and retry loop,
//! all owned by an application-level [`Registry`].
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Transport selection, connection health probing,
//! retry with back-off, and pagination live here. The [`query`] crate sees
//! only its [`query::HttpTransport`] port.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`http`] | `ReqwestTransport`, the production transport |
//! | [`health`] | `ConnectionHealthMonitor` |
//! | [`retrying`] | `RetryingTransport` |
//! | [`resource`] | `ResourceClient` builder and terminal operations |
//! | [`paginator`] | `Paginator` and its options |
//! | [`registry`] | `Registry` and configuration updates |
//!
//! ## Example
//!
//! ```no_run
//! use client::{PaginateOptions, Registry};
//! use query::{ClientConfig, FilterMap, SortDirection};
//!
//! # async fn run() -> Result<(), query::QueryError> {
//! let mut registry = Registry::new(ClientConfig::default())?;
//! let works = registry.works();
//! works
//!     .filter(FilterMap::new().with("publication_year", 2020))
//!     .sort("cited_by_count", SortDirection::Desc);
//!
//! let mut pages = works.paginate(PaginateOptions::default());
//! while let Some(batch) = pages.next_batch().await? {
//!     println!("{} works", batch.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod health;
pub mod http;
pub mod paginator;
pub mod registry;
pub mod resource;
pub mod retrying;

#[cfg(test)]
mod test_support;

pub use health::{ConnectionHealthMonitor, HealthCheck};
pub use http::ReqwestTransport;
pub use paginator::{PageMode, PaginateOptions, Paginator, CURSOR_START};
pub use registry::{Registry, TransportFactory};
pub use resource::{ResourceClient, IDENTIFIER_FILTER_FIELD};
pub use retrying::RetryingTransport;
