//! Diagnostic log
//!
//! Every run writes a timestamped log file capturing debug-level events.
//! With `--verbose` the same records are mirrored to stderr. `RUST_LOG`
//! overrides the level as usual.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use log::error;

/// `hsa-patcher-YYYYMMDD-HHMMSS.log`
pub fn log_file_name(started: DateTime<Local>) -> String {
    format!("hsa-patcher-{}.log", started.format("%Y%m%d-%H%M%S"))
}

/// `<local data dir>/hsa-patcher/logs`, or the temp dir when there is none
pub fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("hsa-patcher").join("logs"))
        .unwrap_or_else(std::env::temp_dir)
}

/// Install the global logger and panic hook; returns the log file path.
pub fn init(verbose: bool) -> Result<PathBuf> {
    let dir = log_dir();
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let path = dir.join(log_file_name(Local::now()));
    let file = File::create(&path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;

    env_logger::Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {} {}:{}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .filter_level(log::LevelFilter::Debug)
        // quieter HTTP internals unless asked for
        .filter_module("hyper_util", log::LevelFilter::Info)
        .filter_module("reqwest", log::LevelFilter::Info)
        .parse_env(env_logger::Env::default())
        .target(env_logger::Target::Pipe(Box::new(LogSink::new(file, verbose))))
        .try_init()
        .context("Failed to initialize logger")?;

    install_panic_hook();
    Ok(path)
}

fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        error!("Unexpected panic: {info}");
        default_hook(info);
    }));
}

/// Log file, optionally mirrored to stderr
struct LogSink {
    file: File,
    mirror: bool,
}

impl LogSink {
    fn new(file: File, mirror: bool) -> Self {
        Self { file, mirror }
    }
}

impl Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write_all(buf)?;
        if self.mirror {
            // a closed stderr must not break file logging
            let _ = io::stderr().write_all(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()?;
        if self.mirror {
            let _ = io::stderr().flush();
        }
        Ok(())
    }
}
