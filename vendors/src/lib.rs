//! Target-service clients for osbench
//!
//! This crate provides the HTTP implementation of
//! [`osbench_core::TargetClient`] for OpenSearch-compatible clusters:
//!
//! - [`ClientConfig`]: endpoint, credentials, timeouts and pool size
//! - [`OpenSearchClient`]: `_bulk` writes and `_search` queries over reqwest

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod opensearch;
mod wire;

pub use config::{ClientConfig, ClientConfigError, DEFAULT_URL};
pub use opensearch::{ClientError, OpenSearchClient};
pub use wire::{ClusterInfo, ClusterVersion};
