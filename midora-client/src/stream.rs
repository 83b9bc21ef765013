//! Incremental `text/event-stream` consumption.
//!
//! The parser is chunk-boundary agnostic: bytes may split lines, frames,
//! or UTF-8 sequences anywhere and events still come out whole and in
//! order.

use midora_shared::models::StreamEvent;
use std::time::{Duration, Instant};

use crate::error::ClientError;

/// Transport-level terminator emitted after the last event.
pub const STREAM_DONE: &str = "[DONE]";

/// One parsed SSE frame before JSON decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// Value of the `event:` field, when present.
    pub event: Option<String>,
    /// Concatenated `data:` payload.
    pub data: String,
}

/// Line-oriented SSE parser fed with arbitrary byte chunks.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    event: Option<String>,
    data: String,
}

impl SseParser {
    /// A parser with empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk and returns every frame completed by it.
    ///
    /// Only complete lines are decoded, so a chunk boundary inside a
    /// multi-byte character cannot corrupt text.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();

        while let Some(newline) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);

            if let Some(value) = line.strip_prefix("event:") {
                self.event = Some(value.trim().to_string());
            } else if let Some(value) = line.strip_prefix("data:") {
                self.data.push_str(value.trim());
            } else if line.starts_with(':') {
                // Comment line; keepalive chatter from some proxies.
            } else if line.is_empty() {
                if !self.data.is_empty() {
                    frames.push(SseFrame {
                        event: self.event.take(),
                        data: std::mem::take(&mut self.data),
                    });
                } else {
                    self.event = None;
                }
            }
        }

        frames
    }
}

/// Decodes a frame's data payload into a typed stream event.
///
/// # Errors
/// Returns a stream error when the payload is not a known event shape.
pub fn decode_event(frame: &SseFrame) -> Result<StreamEvent, ClientError> {
    serde_json::from_str(&frame.data)
        .map_err(|err| ClientError::Stream(format!("undecodable stream frame: {err}")))
}

/// Timer gate bounding how often accumulated content reaches observers.
///
/// The first flush passes immediately; later ones only after the
/// configured interval has elapsed. Terminal flushes bypass the gate.
#[derive(Debug)]
pub struct FlushGate {
    interval: Duration,
    last: Option<Instant>,
}

impl FlushGate {
    /// A gate with the given minimum interval between flushes.
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Whether a flush may happen now.
    pub fn ready(&mut self) -> bool {
        self.ready_at(Instant::now())
    }

    /// Deterministic variant of [`FlushGate::ready`].
    pub fn ready_at(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}
