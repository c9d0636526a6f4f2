//! # workflow-sdk-resources
//!
//! Resource clients for the workflow service, built on the JSON exchange of
//! `workflow-sdk-http`.
//!
//! - **[`CronsClient`]**: Schedule, search and delete cron jobs
//! - **[`StoreClient`]**: Put, get, delete and search items; list namespaces
//!
//! Request payloads are pruned with [`prune_empty`] before sending, and
//! replies deserialize straight into the typed results in [`types`].

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod crons;
pub mod error;
pub mod payload;
pub mod store;
pub mod types;

// Re-exports
pub use crons::CronsClient;
pub use error::{ResourceError, ResourceResult};
pub use payload::prune_empty;
pub use store::StoreClient;
pub use types::{
    CreateCron, Cron, CronSearch, Item, ListNamespaceResponse, ListNamespaces, MultitaskStrategy,
    PutItem, Run, RunStatus, SearchItems, SearchItemsResponse, DEFAULT_NAMESPACE_LIMIT,
    DEFAULT_SEARCH_LIMIT,
};
