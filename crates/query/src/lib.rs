//! Query domain for the scholarly API client.
//!
//! This crate contains every value the request engine manipulates: the
//! filter model and its compiler, the accumulated [`QuerySpec`], the retry
//! policy, connection bookkeeping, response shaping and the error taxonomy.
//! The `client` crate implements the [`HttpTransport`] port defined here and
//! drives these types over the network.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate performs no network
//! I/O. It defines *what* a request looks like; infrastructure defines *how*
//! it is sent.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | `ResourceKind`, `EntityId`, `SearchField`, `PaginationRunId` |
//! | [`types`] | `Timestamp`, `Meta`, `GroupByTuple`, `Listing`, `WithMeta` |
//! | [`filter`] | Filter model and the filter-expression compiler |
//! | [`spec`] | `QuerySpec` and its chainable builder operations |
//! | [`config`] | `ClientConfig` and default headers |
//! | [`connection`] | `ConnectionState` liveness bookkeeping |
//! | [`shape`] | `ResponseShaper` and per-resource augmentation |
//! | [`codec`] | Item serialisation |
//! | [`transport`] | The `HttpTransport` port |
//! | [`errors`] | `QueryError`, `ErrorRecord`, `RetryPolicy` |

pub mod codec;
pub mod config;
pub mod connection;
pub mod errors;
pub mod filter;
pub mod identifiers;
pub mod shape;
pub mod spec;
pub mod transport;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use config::{ClientConfig, DefaultHeaders};
pub use connection::ConnectionState;
pub use errors::{
    ErrorRecord, QueryError, RetryDecision, RetryPolicy, MAX_BATCH_IDENTIFIERS,
    MAX_RETRIES_MESSAGE,
};
pub use filter::{
    compile_clauses, compile_filter, FilterMap, FilterValue, LogicalExpression, LogicalOp,
    Operand, Scalar,
};
pub use identifiers::{EntityId, PaginationRunId, ResourceKind, SearchField};
pub use shape::ResponseShaper;
pub use spec::{QuerySpec, Sample, SortDirection};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, TransportFailure};
pub use types::{
    AutocompleteHit, AutocompleteResponse, GroupByTuple, ListPayload, Listing, Meta, Timestamp,
    WithMeta,
};
