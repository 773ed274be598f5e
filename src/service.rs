//! The abstract model-call service boundary.
//!
//! The core never talks to a concrete LLM backend. It hands a
//! [`TurnRequest`] to a [`ModelService`] and consumes the finite,
//! non-restartable sequence of text deltas the service yields. Delivery is
//! in-order within a turn; the stream either terminates normally or yields
//! one terminal error. Retries, timeouts, and transport concerns all live on
//! the service side of this boundary.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by a model-call service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request could not be started at all.
    #[error("model request failed: {0}")]
    RequestFailed(String),

    /// The stream broke after it had started.
    #[error("stream interrupted: {0}")]
    Interrupted(String),

    /// I/O error while talking to the backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An opaque upstream cause the core treats as unrecoverable for this
    /// turn.
    #[error(transparent)]
    Upstream(#[from] anyhow::Error),
}

/// One entry of the rolling conversation window sent upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Display name of whoever spoke ("User" or a persona name).
    pub speaker: String,

    /// What was said.
    pub text: String,
}

impl TranscriptEntry {
    /// Creates a transcript entry.
    pub fn new(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
        }
    }
}

/// Everything a service needs to produce one turn's reply stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRequest {
    /// Rendered system instruction: personas, wire contract, valid ids.
    pub system_instruction: String,

    /// Rolling window of closed records, oldest first, ending with the
    /// user's new message.
    pub transcript: Vec<TranscriptEntry>,
}

/// A finite stream of text fragments for one turn.
///
/// Yields fragments in order; a fragment may split markers, persona ids, or
/// multi-byte characters' worth of text at any point. Reassembly is the
/// accumulator's job. An `Err` item is terminal: nothing follows it.
pub type DeltaStream = BoxStream<'static, Result<String, ServiceError>>;

/// The upstream language-model call, reduced to the one capability the core
/// needs.
#[async_trait]
pub trait ModelService: Send + Sync {
    /// Starts one turn and returns its delta stream.
    async fn stream_turn(&self, request: TurnRequest) -> Result<DeltaStream, ServiceError>;
}
