//! Event types, listener hooks and channel helpers for the RX pipeline.

use core_parse::DecodingMode;
use core_text::AnnotatedText;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::UnboundedSender;
use tracing::trace;

// -------------------------------------------------------------------------------------------------
// Channel Policy
// -------------------------------------------------------------------------------------------------
// Producers (the transport reader, UI setters) feed the ingest service through a bounded mpsc
// channel sized by `EVENT_CHANNEL_CAP`. A full channel parks the producer: received bytes are never
// dropped. Output flows the other way through an unbounded channel because observers run inside
// the processing task and must not block it.
// -------------------------------------------------------------------------------------------------
pub const EVENT_CHANNEL_CAP: usize = 1024;

// -------------------------------------------------------------------------------------------------
// Telemetry
// -------------------------------------------------------------------------------------------------
pub static CHUNKS_INGESTED: AtomicU64 = AtomicU64::new(0);
pub static BYTES_INGESTED: AtomicU64 = AtomicU64::new(0);
pub static FILTER_REPLAYS: AtomicU64 = AtomicU64::new(0);
pub static OUTPUT_DROPPED: AtomicU64 = AtomicU64::new(0); // observer channel closed

/// Commands accepted by the ingest service, processed strictly in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RxEvent {
    /// Raw bytes from the transport.
    Chunk(Vec<u8>),
    SetDecodingMode(DecodingMode),
    SetLineBreak(String),
    /// Also replays retained history through the filter.
    SetFilterPattern(String),
    SetControlCharSubstitution(bool),
    SetAnsiEnabled(bool),
    SetTimestamps(bool),
    SetHistorySize(usize),
    Shutdown,
}

/// What an observer receives, in channel form.
#[derive(Debug, Clone)]
pub enum RxOutput {
    RawData(String),
    Output(Arc<AnnotatedText>),
}

/// Listener notified synchronously after each processing call.
///
/// Both hooks run on the processing task. They must return quickly; anything
/// slow belongs on the other side of a channel (see [`ChannelObserver`]).
pub trait RxObserver: Send + 'static {
    /// Decoded text of one ingested chunk, before any parsing.
    fn on_raw_data(&mut self, _text: &str) {}
    /// Newly released, fully processed output. The snapshot is an independent
    /// copy; holding on to it never affects pipeline state.
    fn on_output(&mut self, _snapshot: Arc<AnnotatedText>) {}
}

/// Default no-op observer.
#[derive(Debug, Default)]
pub struct NoopObserver;

impl RxObserver for NoopObserver {}

/// Forwards notifications into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: UnboundedSender<RxOutput>,
    raw: bool,
}

impl ChannelObserver {
    /// Forward output snapshots only.
    pub fn new(tx: UnboundedSender<RxOutput>) -> Self {
        Self { tx, raw: false }
    }

    /// Forward raw decoded text as well.
    pub fn with_raw_data(tx: UnboundedSender<RxOutput>) -> Self {
        Self { tx, raw: true }
    }

    fn forward(&self, out: RxOutput) {
        if self.tx.send(out).is_err() {
            OUTPUT_DROPPED.fetch_add(1, Ordering::Relaxed);
            trace!(target: "rx.observer", "receiver_closed");
        }
    }
}

impl RxObserver for ChannelObserver {
    fn on_raw_data(&mut self, text: &str) {
        if self.raw {
            self.forward(RxOutput::RawData(text.to_string()));
        }
    }

    fn on_output(&mut self, snapshot: Arc<AnnotatedText>) {
        self.forward(RxOutput::Output(snapshot));
    }
}
