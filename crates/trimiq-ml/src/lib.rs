//! Client for the CLIP embedding sidecar and similarity ranking.
//!
//! CLIP inference runs out of process; this crate talks to the serving
//! endpoint over HTTP and orders candidate clips against the narration text
//! by embedding similarity.

pub mod client;
pub mod error;
pub mod rank;

pub use client::EmbeddingClient;
pub use error::{MlError, MlResult};
pub use rank::{cosine_similarity, rank_clips};
