use core_config::RxSettings;
use core_events::{BYTES_INGESTED, CHUNKS_INGESTED, FILTER_REPLAYS, RxObserver};
use core_parse::{
    AnsiParser, ConfigError, ControlCharParser, Decoder, DecodingMode, NewLineParser,
    PatternError, StreamingFilter,
};
use core_text::AnnotatedText;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{debug, info};

/// The RX processing pipeline.
///
/// Data flows `Decoder -> AnsiParser -> NewLineParser -> StreamingFilter ->
/// ControlCharParser -> observers`. Each stage may keep an undecided suffix
/// between calls; the buffers between stages are owned here and never handed
/// out. Not safe for concurrent use: callers serialize access, normally by
/// running the engine inside [`spawn_ingest_service`](crate::spawn_ingest_service).
pub struct RxEngine {
    decoder: Decoder,
    ansi: AnsiParser,
    newline: NewLineParser,
    filter: StreamingFilter,
    control: ControlCharParser,

    ansi_to_newline: AnnotatedText,
    newline_to_filter: AnnotatedText,
    filter_to_control: AnnotatedText,

    /// Decoded text as received, trimmed to `history_size`.
    raw_history: AnnotatedText,
    /// Everything the line-break stage has released, trimmed to `history_size`.
    /// Filter replays start from a copy of this.
    replay: AnnotatedText,
    history_size: usize,

    observers: Vec<Box<dyn RxObserver>>,
}

impl Default for RxEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RxEngine {
    pub fn new() -> Self {
        Self {
            decoder: Decoder::default(),
            ansi: AnsiParser::new(),
            newline: NewLineParser::default(),
            filter: StreamingFilter::new(),
            control: ControlCharParser::default(),
            ansi_to_newline: AnnotatedText::new(),
            newline_to_filter: AnnotatedText::new(),
            filter_to_control: AnnotatedText::new(),
            raw_history: AnnotatedText::new(),
            replay: AnnotatedText::new(),
            history_size: core_config::DEFAULT_HISTORY_SIZE,
            observers: Vec::new(),
        }
    }

    /// Build an engine from validated settings. Fails if the configured line
    /// break or filter pattern is rejected.
    pub fn from_settings(settings: &RxSettings) -> Result<Self, ConfigError> {
        let mut engine = Self::new();
        engine.set_decoding_mode(settings.decoding_mode);
        engine.set_line_break_token(&settings.line_break)?;
        engine.filter.set_pattern(&settings.filter_pattern)?;
        engine.set_ansi_enabled(settings.ansi_enabled);
        engine.set_timestamps(settings.timestamps);
        engine.set_history_size(settings.history_size);
        info!(
            target: "rx.engine",
            mode = ?settings.decoding_mode,
            filtering = !settings.filter_pattern.is_empty(),
            history_size = engine.history_size,
            "engine_configured"
        );
        Ok(engine)
    }

    pub fn add_observer<O: RxObserver>(&mut self, observer: O) {
        self.observers.push(Box::new(observer));
    }

    /// Process one chunk of raw bytes through every stage and notify observers.
    /// Returns the output snapshot handed to them.
    pub fn ingest(&mut self, bytes: &[u8]) -> Arc<AnnotatedText> {
        CHUNKS_INGESTED.fetch_add(1, Ordering::Relaxed);
        BYTES_INGESTED.fetch_add(bytes.len() as u64, Ordering::Relaxed);

        let text = self.decoder.decode(bytes);
        self.raw_history.append(&text);
        self.raw_history.trim_front_to(self.history_size);

        self.ansi.parse(&text, &mut self.ansi_to_newline);

        let mut released = AnnotatedText::new();
        self.newline
            .parse(&mut self.ansi_to_newline, &mut released);
        let new_chars = released.len_chars();
        released.copy_into(&mut self.replay, new_chars);
        released.shift_into(&mut self.newline_to_filter, new_chars);
        self.replay.trim_front_to(self.history_size);

        let output = self.run_filter_stages();
        debug!(
            target: "rx.engine",
            bytes = bytes.len(),
            decoded = text.len(),
            line_released = new_chars,
            output = output.len_chars(),
            "chunk_processed"
        );

        for observer in &mut self.observers {
            observer.on_raw_data(&text);
        }
        self.notify_output(&output);
        output
    }

    /// Replay retained history through the filter and control-character
    /// stages, e.g. after the filter pattern changed. Observers receive the
    /// replayed output as one snapshot.
    pub fn rerun_filter(&mut self) -> Arc<AnnotatedText> {
        FILTER_REPLAYS.fetch_add(1, Ordering::Relaxed);
        self.filter.reset();
        self.filter_to_control.clear();
        self.newline_to_filter = self.replay.clone();
        let output = self.run_filter_stages();
        debug!(
            target: "rx.engine",
            replayed = self.replay.len_chars(),
            output = output.len_chars(),
            "filter_rerun"
        );
        self.notify_output(&output);
        output
    }

    /// Install a new filter pattern and replay history through it. An invalid
    /// pattern is rejected and the previous one stays active.
    pub fn set_filter_pattern(&mut self, pattern: &str) -> Result<(), PatternError> {
        self.filter.set_pattern(pattern)?;
        self.rerun_filter();
        Ok(())
    }

    pub fn set_line_break_token(&mut self, token: &str) -> Result<(), ConfigError> {
        self.newline.set_token(token)?;
        self.filter.set_line_break(token);
        self.control.set_line_break(token);
        Ok(())
    }

    /// Switch decoding. ASCII modes also select control-character handling.
    pub fn set_decoding_mode(&mut self, mode: DecodingMode) {
        self.decoder.set_mode(mode);
        if let Some(substitute) = mode.control_char_substitution() {
            self.control.set_substitute(substitute);
        }
    }

    pub fn set_control_char_substitution(&mut self, enabled: bool) {
        self.control.set_substitute(enabled);
    }

    pub fn set_ansi_enabled(&mut self, enabled: bool) {
        self.ansi.set_enabled(enabled);
    }

    pub fn set_timestamps(&mut self, enabled: bool) {
        self.newline.set_timestamps(enabled);
    }

    /// Limit retained history to `size` characters (minimum 1), trimming now.
    pub fn set_history_size(&mut self, size: usize) {
        self.history_size = size.max(1);
        self.raw_history.trim_front_to(self.history_size);
        self.replay.trim_front_to(self.history_size);
        self.trim_held_line();
    }

    pub fn history_size(&self) -> usize {
        self.history_size
    }

    pub fn decoding_mode(&self) -> DecodingMode {
        self.decoder.mode()
    }

    pub fn filter_pattern(&self) -> &str {
        self.filter.pattern()
    }

    pub fn line_break_token(&self) -> &str {
        self.newline.token()
    }

    pub fn control_char_substitution(&self) -> bool {
        self.control.substitute()
    }

    /// Retained decoded text, oldest characters trimmed first.
    pub fn raw_history(&self) -> String {
        self.raw_history.text()
    }

    /// Retained line-break output that a filter replay would start from.
    pub fn replay_history(&self) -> &AnnotatedText {
        &self.replay
    }

    pub fn unsupported_sequences(&self) -> u64 {
        self.ansi.unsupported_count()
    }

    fn run_filter_stages(&mut self) -> Arc<AnnotatedText> {
        self.filter
            .parse(&mut self.newline_to_filter, &mut self.filter_to_control);
        self.trim_held_line();
        let mut output = AnnotatedText::new();
        self.control
            .parse(&mut self.filter_to_control, &mut output);
        Arc::new(output)
    }

    /// An unterminated line the filter has not matched yet waits in
    /// `newline_to_filter`. Keep at most `history_size` characters of it.
    fn trim_held_line(&mut self) {
        let excess = self
            .newline_to_filter
            .len_chars()
            .saturating_sub(self.history_size);
        if excess > 0 {
            self.newline_to_filter.remove_front_carrying_color(excess);
            debug!(target: "rx.engine", trimmed = excess, "held_line_trimmed");
        }
    }

    fn notify_output(&mut self, output: &Arc<AnnotatedText>) {
        for observer in &mut self.observers {
            observer.on_output(Arc::clone(output));
        }
    }
}
