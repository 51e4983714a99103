//! Configuration loading and parsing
//!
//! Parses `edit.toml` (or an override path supplied by the caller) with two
//! tables:
//!
//! ```toml
//! [history]
//! max = 200
//! [validation]
//! noop_batches = "warning"
//! ```
//!
//! `history.max` is clamped to `1..=HISTORY_MAX_LIMIT` when the config is
//! loaded; the raw value is kept in `file` and the clamped one in
//! `effective_history_max`. Unknown fields are ignored so older builds keep
//! reading newer files.

use anyhow::Result;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::{debug, info};

pub const DEFAULT_HISTORY_MAX: usize = 200;
pub const HISTORY_MAX_LIMIT: usize = 10_000;

const FILE_NAME: &str = "edit.toml";

/// How a batch that changes no text is reported by validation.
#[derive(Debug, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoopSeverity {
    Ok,
    #[default]
    Warning,
    Error,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HistoryConfig {
    #[serde(default = "HistoryConfig::default_max")]
    pub max: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max: Self::default_max(),
        }
    }
}

impl HistoryConfig {
    const fn default_max() -> usize {
        DEFAULT_HISTORY_MAX
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ValidationConfig {
    #[serde(default)]
    pub noop_batches: NoopSeverity,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ConfigFile {
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub raw: Option<String>,          // original file string (optional)
    pub file: ConfigFile,             // parsed (or default) data
    pub effective_history_max: usize, // clamped to 1..=HISTORY_MAX_LIMIT
}

impl Default for Config {
    fn default() -> Self {
        Self::from_file(None, ConfigFile::default())
    }
}

/// Config path: `edit.toml` in the working directory, else the platform
/// config dir (XDG / AppData Roaming).
pub fn discover() -> PathBuf {
    let local = PathBuf::from(FILE_NAME);
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("edit").join(FILE_NAME);
    }
    local
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        debug!(target: "config", path = %path.display(), "config_missing_using_defaults");
        return Ok(Config::default());
    };
    match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => Ok(Config::from_file(Some(content), file)),
        Err(err) => {
            info!(target: "config", path = %path.display(), %err, "config_parse_failed_using_defaults");
            Ok(Config::default())
        }
    }
}

impl Config {
    fn from_file(raw: Option<String>, file: ConfigFile) -> Self {
        let mut cfg = Self {
            raw,
            file,
            effective_history_max: DEFAULT_HISTORY_MAX,
        };
        cfg.clamp_history();
        cfg
    }

    /// Clamp `history.max` into range. Returns the effective value.
    pub fn clamp_history(&mut self) -> usize {
        let raw = self.file.history.max;
        let clamped = raw.clamp(1, HISTORY_MAX_LIMIT);
        if clamped != raw {
            info!(
                target: "config",
                raw,
                clamped,
                max = HISTORY_MAX_LIMIT,
                "history_max_clamped"
            );
        }
        self.effective_history_max = clamped;
        clamped
    }

    pub fn noop_batches(&self) -> NoopSeverity {
        self.file.validation.noop_batches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex, MutexGuard};
    use tracing::Level;
    use tracing::subscriber::with_default;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone)]
    struct BufferWriter {
        inner: Arc<Mutex<Vec<u8>>>,
    }

    impl BufferWriter {
        fn new() -> (Self, Arc<Mutex<Vec<u8>>>) {
            let buf = Arc::new(Mutex::new(Vec::new()));
            (Self { inner: buf.clone() }, buf)
        }
    }

    struct LockedWriter<'a> {
        guard: MutexGuard<'a, Vec<u8>>,
    }

    impl Write for LockedWriter<'_> {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.guard.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for BufferWriter {
        type Writer = LockedWriter<'a>;

        fn make_writer(&'a self) -> Self::Writer {
            LockedWriter {
                guard: self.inner.lock().expect("log buffer poisoned"),
            }
        }
    }

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), content).unwrap();
        tmp
    }

    #[test]
    fn default_config_when_missing_file() {
        let cfg = load_from(Some(PathBuf::from("__nonexistent_hopefully__.toml"))).unwrap();
        assert!(cfg.raw.is_none());
        assert_eq!(cfg.file.history.max, DEFAULT_HISTORY_MAX);
        assert_eq!(cfg.effective_history_max, DEFAULT_HISTORY_MAX);
        assert_eq!(cfg.noop_batches(), NoopSeverity::Warning);
    }

    #[test]
    fn parses_history_and_validation() {
        let tmp = write_config("[history]\nmax = 32\n[validation]\nnoop_batches = \"error\"\n");
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.file.history.max, 32);
        assert_eq!(cfg.effective_history_max, 32);
        assert_eq!(cfg.noop_batches(), NoopSeverity::Error);
        assert!(cfg.raw.is_some());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let tmp = write_config("[validation]\nnoop_batches = \"ok\"\n");
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.noop_batches(), NoopSeverity::Ok);
        assert_eq!(cfg.effective_history_max, DEFAULT_HISTORY_MAX);
    }

    #[test]
    fn parse_error_falls_back_to_defaults() {
        let tmp = write_config("[history]\nmax = \"lots\"\n");
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert!(cfg.raw.is_none());
        assert_eq!(cfg.effective_history_max, DEFAULT_HISTORY_MAX);
    }

    #[test]
    fn clamps_history_into_range() {
        let tmp = write_config("[history]\nmax = 0\n");
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.file.history.max, 0);
        assert_eq!(cfg.effective_history_max, 1);

        let tmp = write_config("[history]\nmax = 50000\n");
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.effective_history_max, HISTORY_MAX_LIMIT);
    }

    #[test]
    fn clamp_logging_uses_config_target() {
        let tmp = write_config("[history]\nmax = 123456\n");
        let (writer, buffer) = BufferWriter::new();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::INFO)
            .with_target(true)
            .with_ansi(false)
            .without_time()
            .with_writer(writer)
            .finish();

        let cfg = with_default(subscriber, || load_from(Some(tmp.path().to_path_buf())).unwrap());

        let log_output = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        assert!(log_output.contains("INFO config:"));
        assert!(log_output.contains("history_max_clamped"));
        assert_eq!(cfg.effective_history_max, HISTORY_MAX_LIMIT);
    }
}
