//! Airspace Copilot — tool-calling agents over live regional flight snapshots.
//!
//! Layers, bottom-up:
//! - [`flight_data`]: snapshot model and the HTTP fetcher
//! - [`tools`]: region snapshot, callsign lookup, anomaly detection, registry
//! - [`inference`]: OpenAI-compatible completion client
//! - [`agent_core`]: agent loop, Traveler/Ops roles, orchestrator
//! - [`mcp`]: the flight tools served over MCP (JSON-RPC on `POST /mcp`)
//! - [`config`]: YAML config with env overrides

pub mod agent_core;
pub mod config;
pub mod flight_data;
pub mod inference;
pub mod mcp;
pub mod tools;

#[cfg(test)]
mod test_support;

use std::path::{Path, PathBuf};

/// Return the platform-standard data directory for Airspace Copilot.
///
/// - macOS: `~/Library/Application Support/airspace-copilot/`
/// - Windows: `{FOLDERID_RoamingAppData}\airspace-copilot\`
/// - Linux: `$XDG_DATA_HOME/airspace-copilot/` (fallback `~/.local/share/...`)
///
/// Falls back to `~/.airspace-copilot/` only if none of the above can be resolved.
pub fn data_dir() -> PathBuf {
    if let Some(dir) = dirs::data_dir() {
        return dir.join("airspace-copilot");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".airspace-copilot")
}

/// Where tracing output goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogOptions {
    /// Write to `<data_dir>/airspace-copilot.log` instead of stderr.
    pub to_file: bool,
    /// Emit one JSON object per event.
    pub json: bool,
}

/// Initialize the tracing subscriber.
///
/// Stderr by default so stdout stays clean for command output. With
/// `to_file`, existing logs are rotated (keeping 3) and a fresh log is opened
/// with a line-flushing writer. Returns the log file path when one is used.
///
/// The filter comes from `RUST_LOG`, defaulting to `airspace_copilot=info,warn`.
pub fn init_tracing(options: LogOptions) -> std::io::Result<Option<PathBuf>> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::fmt::writer::BoxMakeWriter;
    use tracing_subscriber::EnvFilter;

    let (writer, log_path, ansi) = if options.to_file {
        let log_dir = data_dir();
        std::fs::create_dir_all(&log_dir)?;
        let log_path = log_dir.join("airspace-copilot.log");
        rotate_log_file(&log_path, 3);

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;
        (BoxMakeWriter::new(FlushingWriter::new(file)), Some(log_path), false)
    } else {
        (BoxMakeWriter::new(std::io::stderr), None, true)
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("airspace_copilot=info,warn"));

    let builder = fmt::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi && !options.json)
        .with_target(true)
        .with_thread_ids(false);

    let installed = if options.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| std::io::Error::other(format!("tracing already initialized: {e}")))?;

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        log_file = ?log_path.as_ref().map(|p| p.display().to_string()),
        pid = std::process::id(),
        "airspace-copilot starting"
    );

    Ok(log_path)
}

/// Rotate log files: `x.log` → `x.log.1` → `.2` → … → `.{keep}`.
///
/// Oldest file beyond `keep` is deleted. Missing files in the chain are skipped.
fn rotate_log_file(base_path: &Path, keep: u32) {
    // Delete the oldest
    let oldest = format!("{}.{keep}", base_path.display());
    let _ = std::fs::remove_file(&oldest);

    // Shift: .{n-1} → .{n}
    for i in (1..keep).rev() {
        let from = format!("{}.{i}", base_path.display());
        let to = format!("{}.{}", base_path.display(), i + 1);
        let _ = std::fs::rename(&from, &to);
    }

    // Current → .1
    if base_path.exists() {
        let to = format!("{}.1", base_path.display());
        let _ = std::fs::rename(base_path, &to);
    }
}

/// A writer that wraps `std::fs::File` and flushes after every write.
///
/// Log lines reach disk even if the process is killed mid-request.
#[derive(Clone)]
struct FlushingWriter {
    file: std::sync::Arc<std::sync::Mutex<std::fs::File>>,
}

impl FlushingWriter {
    fn new(file: std::fs::File) -> Self {
        Self {
            file: std::sync::Arc::new(std::sync::Mutex::new(file)),
        }
    }
}

impl std::io::Write for FlushingWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut f = self
            .file
            .lock()
            .map_err(|e| std::io::Error::other(format!("lock poisoned: {e}")))?;
        let n = std::io::Write::write(&mut *f, buf)?;
        std::io::Write::flush(&mut *f)?;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut f = self
            .file
            .lock()
            .map_err(|e| std::io::Error::other(format!("lock poisoned: {e}")))?;
        std::io::Write::flush(&mut *f)
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for FlushingWriter {
    type Writer = FlushingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
