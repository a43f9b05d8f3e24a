//! Host-side adapters for the Vitrine pipeline.
//!
//! Provides environment configuration, a JSON-over-HTTP
//! [`GenerationClient`](vitrine_core::GenerationClient) and an HTTP
//! [`RemoteFetcher`](vitrine_core::RemoteFetcher). Nothing here is
//! required by the core; a host may supply its own implementations.

pub mod api;
pub mod config;
pub mod fetch;
pub mod wire;

pub use api::HttpGenerationClient;
pub use config::{ConfigError, GenerationConfig};
pub use fetch::HttpFetcher;
