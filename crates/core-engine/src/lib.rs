//! RX processing engine: wires the streaming parsers together, owns the
//! inter-stage buffers and retained history, and notifies observers.

mod engine;
mod service;

pub use engine::RxEngine;
pub use service::spawn_ingest_service;
