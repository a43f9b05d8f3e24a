//! Domain core of the Vitrine generative-media fan-out pipeline.
//!
//! Everything in this crate is vendor-neutral and free of network code:
//!
//! - [`media`]: the canonical [`Media`](media::Media) value and its
//!   data-URI / file / remote codec.
//! - [`request`]: pure builders for every generation use case.
//! - [`task`] and [`batch`]: the per-target lifecycle and the batch that
//!   owns it.
//! - [`result`]: final outcome summary and wall-clock timing.
//! - [`client`] and [`observer`]: the boundary traits a host implements.

pub mod batch;
pub mod client;
pub mod error;
pub mod media;
pub mod observer;
pub mod request;
pub mod result;
pub mod task;
pub mod types;

pub use batch::{create_batch, Batch, BatchStatus, Recipe, Seed, Target};
pub use client::{FetchedBody, GenerationClient, RemoteFetcher};
pub use error::{BatchError, GenerationError, MediaError};
pub use media::Media;
pub use observer::{BatchObserver, BatchProgress, Callbacks, NoopObserver};
pub use request::GenerationRequest;
pub use result::{BatchClock, BatchResult};
pub use task::{ItemTask, TaskInput, TaskState};
