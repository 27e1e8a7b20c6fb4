use crate::RxEngine;
use core_events::RxEvent;
use tokio::sync::mpsc::Receiver;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ExitReason {
    ShutdownSignal,
    ChannelClosed,
}

impl ExitReason {
    fn as_str(&self) -> &'static str {
        match self {
            ExitReason::ShutdownSignal => "shutdown_signal",
            ExitReason::ChannelClosed => "channel_closed",
        }
    }
}

/// Move `engine` into a Tokio task that applies [`RxEvent`]s one at a time, in
/// arrival order. The task stops on [`RxEvent::Shutdown`] or once every sender
/// is dropped, and hands the engine back through its `JoinHandle`.
pub fn spawn_ingest_service(
    mut engine: RxEngine,
    mut receiver: Receiver<RxEvent>,
) -> JoinHandle<RxEngine> {
    tokio::spawn(async move {
        info!(target: "rx.service", "ingest_service_started");
        let mut exit_reason = ExitReason::ChannelClosed;
        while let Some(event) = receiver.recv().await {
            if !apply_event(&mut engine, event) {
                exit_reason = ExitReason::ShutdownSignal;
                break;
            }
        }
        info!(target: "rx.service", reason = exit_reason.as_str(), "ingest_service_stopped");
        engine
    })
}

/// Returns `false` when the service should stop.
fn apply_event(engine: &mut RxEngine, event: RxEvent) -> bool {
    match event {
        RxEvent::Chunk(bytes) => {
            engine.ingest(&bytes);
        }
        RxEvent::SetDecodingMode(mode) => engine.set_decoding_mode(mode),
        RxEvent::SetLineBreak(token) => {
            if let Err(err) = engine.set_line_break_token(&token) {
                warn!(target: "rx.service", error = %err, "line_break_rejected");
            }
        }
        RxEvent::SetFilterPattern(pattern) => {
            if let Err(err) = engine.set_filter_pattern(&pattern) {
                warn!(target: "rx.service", error = %err, "filter_pattern_rejected");
            }
        }
        RxEvent::SetControlCharSubstitution(enabled) => {
            engine.set_control_char_substitution(enabled)
        }
        RxEvent::SetAnsiEnabled(enabled) => engine.set_ansi_enabled(enabled),
        RxEvent::SetTimestamps(enabled) => engine.set_timestamps(enabled),
        RxEvent::SetHistorySize(size) => engine.set_history_size(size),
        RxEvent::Shutdown => return false,
    }
    true
}
