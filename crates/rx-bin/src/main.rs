//! rxterm entrypoint: stream bytes from stdin (or a capture file) through the
//! RX pipeline and print the released text.
use anyhow::{Context, Result};
use clap::Parser;
use core_config::{RxSettings, load_from};
use core_engine::{RxEngine, spawn_ingest_service};
use core_events::{ChannelObserver, EVENT_CHANNEL_CAP, RxEvent, RxOutput};
use core_parse::DecodingMode;
use core_text::{AnnotatedText, MarkerKind};
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

/// CLI arguments. Flags override values from `rxterm.toml`.
#[derive(Parser, Debug)]
#[command(name = "rxterm", version, about = "Annotate a received serial byte stream")]
struct Args {
    /// Read from this file instead of stdin.
    pub input: Option<PathBuf>,
    /// Optional configuration file path (overrides discovery of `rxterm.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Only show lines matching this regex.
    #[arg(long = "filter")]
    pub filter: Option<String>,
    /// Line-break token. `\n`, `\r` and `\t` escapes are understood.
    #[arg(long = "line-break")]
    pub line_break: Option<String>,
    /// Show every byte as hex.
    #[arg(long = "hex", conflicts_with = "control_chars")]
    pub hex: bool,
    /// Show control characters as visible glyphs instead of dropping them.
    #[arg(long = "control-chars")]
    pub control_chars: bool,
    /// Prefix each line with its arrival time (UTC).
    #[arg(long = "timestamps")]
    pub timestamps: bool,
    /// Bytes read per chunk.
    #[arg(long = "chunk-size", default_value_t = 256)]
    pub chunk_size: usize,
}

struct AppStartup {
    log_guard: Option<WorkerGuard>,
}

impl AppStartup {
    fn new() -> Self {
        Self { log_guard: None }
    }

    fn run(&mut self, args: &Args) -> Result<RxEngine> {
        self.configure_logging()?;
        Self::install_panic_hook();
        info!(target: "runtime", "startup");

        let config = load_from(args.config.clone())?;
        let settings = apply_overrides(config.settings(), args);
        let engine = RxEngine::from_settings(&settings).context("invalid RX settings")?;
        info!(
            target: "runtime.startup",
            input = ?args.input,
            config_override = args.config.is_some(),
            chunk_size = args.chunk_size,
            "bootstrap_complete"
        );
        Ok(engine)
    }

    fn configure_logging(&mut self) -> Result<()> {
        let log_dir = Path::new(".");
        let file_appender = tracing_appender::rolling::never(log_dir, "rxterm.log");
        let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
        match tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_ansi(false)
            .with_writer(nb_writer)
            .try_init()
        {
            Ok(_) => {
                self.log_guard = Some(guard);
            }
            Err(_err) => {
                // Global tracing subscriber already installed; drop guard so writer shuts down.
            }
        }
        Ok(())
    }

    fn install_panic_hook() {
        static HOOK: Once = Once::new();
        HOOK.call_once(|| {
            let default_panic = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                tracing::error!(target: "runtime.panic", ?info, "panic");
                default_panic(info);
            }));
        });
    }
}

fn apply_overrides(mut settings: RxSettings, args: &Args) -> RxSettings {
    if let Some(filter) = &args.filter {
        settings.filter_pattern = filter.clone();
    }
    if let Some(token) = &args.line_break {
        settings.line_break = unescape(token);
    }
    if args.hex {
        settings.decoding_mode = DecodingMode::Hex;
    } else if args.control_chars {
        settings.decoding_mode = DecodingMode::AsciiWithControlChars;
    }
    settings.timestamps |= args.timestamps;
    settings
}

fn unescape(token: &str) -> String {
    token
        .replace("\\r", "\r")
        .replace("\\n", "\n")
        .replace("\\t", "\t")
}

/// Plain-text rendering: released characters, with an arrival-time prefix
/// wherever a timestamp marker sits. Colors are not rendered.
fn render_plain(snapshot: &AnnotatedText) -> String {
    let text = snapshot.text();
    let mut out = String::with_capacity(text.len());
    let mut stamps = snapshot
        .markers()
        .iter()
        .filter_map(|m| match m.kind {
            MarkerKind::Timestamp(at) => Some((m.char_pos, at)),
            _ => None,
        })
        .peekable();
    for (idx, c) in text.chars().enumerate() {
        while let Some((_, at)) = stamps.next_if(|(pos, _)| *pos == idx) {
            out.push_str(&format_time(at));
        }
        out.push(c);
    }
    out
}

fn format_time(at: SystemTime) -> String {
    let since = at.duration_since(UNIX_EPOCH).unwrap_or_default();
    let day_secs = since.as_secs() % 86_400;
    format!(
        "[{:02}:{:02}:{:02}.{:03}] ",
        day_secs / 3600,
        (day_secs / 60) % 60,
        day_secs % 60,
        since.subsec_millis()
    )
}

async fn pump_input(
    input: Option<&Path>,
    chunk_size: usize,
    tx: &mpsc::Sender<RxEvent>,
) -> Result<u64> {
    let mut reader: Box<dyn AsyncRead + Unpin + Send> = match input {
        Some(path) => Box::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("opening {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdin()),
    };
    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut total = 0u64;
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        total += n as u64;
        tx.send(RxEvent::Chunk(buf[..n].to_vec())).await?;
    }
    Ok(total)
}

async fn print_output(mut rx: mpsc::UnboundedReceiver<RxOutput>) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    while let Some(out) = rx.recv().await {
        if let RxOutput::Output(snapshot) = out {
            stdout.write_all(render_plain(&snapshot).as_bytes()).await?;
            stdout.flush().await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut startup = AppStartup::new();
    let mut engine = startup.run(&args)?;

    let (out_tx, out_rx) = mpsc::unbounded_channel();
    engine.add_observer(ChannelObserver::new(out_tx));
    let printer = tokio::spawn(print_output(out_rx));

    let (tx, rx) = mpsc::channel::<RxEvent>(EVENT_CHANNEL_CAP);
    let service = spawn_ingest_service(engine, rx);

    let pumped = pump_input(args.input.as_deref(), args.chunk_size, &tx).await;
    if let Err(e) = &pumped {
        warn!(target: "runtime", error = %e, "input_failed");
    }
    tx.send(RxEvent::Shutdown).await?;
    let engine = service.await?;
    info!(
        target: "runtime",
        bytes = pumped.as_ref().ok().copied(),
        retained = engine.raw_history().chars().count(),
        unsupported_sequences = engine.unsupported_sequences(),
        "shutdown"
    );
    drop(engine);
    printer.await??;
    pumped.map(|_| ())
}
