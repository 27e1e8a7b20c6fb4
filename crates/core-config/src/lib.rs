//! Configuration loading and parsing.
//!
//! Parses `rxterm.toml` (or an override path provided by the binary) into a
//! [`ConfigFile`], then validates it into [`RxSettings`] that the engine is
//! built from. Every key is optional. Unknown fields are ignored so older
//! binaries tolerate newer files; a file that fails to parse falls back to
//! defaults rather than aborting startup.

use anyhow::Result;
use core_parse::DecodingMode;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::{info, warn};

pub const CONFIG_FILE_NAME: &str = "rxterm.toml";
pub const DEFAULT_HISTORY_SIZE: usize = 20_000;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct DecodingConfig {
    #[serde(default)]
    pub mode: DecodingMode,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LineBreakConfig {
    #[serde(default = "LineBreakConfig::default_token")]
    pub token: String,
}

impl Default for LineBreakConfig {
    fn default() -> Self {
        Self {
            token: Self::default_token(),
        }
    }
}

impl LineBreakConfig {
    fn default_token() -> String {
        "\n".to_string()
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct FilterConfig {
    #[serde(default)]
    pub pattern: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnsiConfig {
    #[serde(default = "AnsiConfig::default_enabled")]
    pub enabled: bool,
}

impl Default for AnsiConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
        }
    }
}

impl AnsiConfig {
    const fn default_enabled() -> bool {
        true
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct TimestampConfig {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BufferConfig {
    #[serde(default = "BufferConfig::default_history_size")]
    pub history_size: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            history_size: Self::default_history_size(),
        }
    }
}

impl BufferConfig {
    const fn default_history_size() -> usize {
        DEFAULT_HISTORY_SIZE
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ConfigFile {
    #[serde(default)]
    pub decoding: DecodingConfig,
    #[serde(default)]
    pub line_break: LineBreakConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub ansi: AnsiConfig,
    #[serde(default)]
    pub timestamps: TimestampConfig,
    #[serde(default)]
    pub buffer: BufferConfig,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub raw: Option<String>, // original file string (optional)
    pub file: ConfigFile,    // parsed (or default) data
}

/// Validated settings the RX engine is constructed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RxSettings {
    pub decoding_mode: DecodingMode,
    pub line_break: String,
    pub filter_pattern: String,
    pub ansi_enabled: bool,
    pub timestamps: bool,
    pub history_size: usize,
}

impl Default for RxSettings {
    fn default() -> Self {
        Config::default().settings()
    }
}

/// Best-effort config path following platform conventions (XDG / AppData Roaming).
pub fn discover() -> PathBuf {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("rxterm").join(CONFIG_FILE_NAME);
    }
    PathBuf::from(CONFIG_FILE_NAME)
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        return Ok(Config::default());
    };
    match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => Ok(Config {
            raw: Some(content),
            file,
        }),
        Err(e) => {
            warn!(target: "config", path = %path.display(), error = %e, "parse_failed_using_defaults");
            Ok(Config::default())
        }
    }
}

impl Config {
    /// Validate the parsed file into engine settings. Out-of-range values are
    /// clamped (and logged) instead of rejected.
    pub fn settings(&self) -> RxSettings {
        let file = &self.file;
        let mut line_break = file.line_break.token.clone();
        if line_break.is_empty() {
            warn!(target: "config", "empty_line_break_using_default");
            line_break = LineBreakConfig::default_token();
        }
        let raw_history = file.buffer.history_size;
        let history_size = raw_history.max(1);
        if history_size != raw_history {
            info!(
                target: "config",
                raw = raw_history,
                clamped = history_size,
                "history_size_clamped"
            );
        }
        RxSettings {
            decoding_mode: file.decoding.mode,
            line_break,
            filter_pattern: file.filter.pattern.clone(),
            ansi_enabled: file.ansi.enabled,
            timestamps: file.timestamps.enabled,
            history_size,
        }
    }
}
