//! Logging setup on top of `tracing-subscriber`
//!
//! Console output (ANSI only on a TTY) and/or a size-rotated file in
//! full, compact or JSON format.

pub mod config;
pub mod rotation;
pub(crate) mod writer;

pub use config::*;

use std::io::IsTerminal;

use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use writer::RotatingFileWriter;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Installs the global subscriber.
pub fn init_logger(config: LoggerConfig) -> anyhow::Result<()> {
    config.validate()?;
    let filter = config.env_filter().unwrap_or_else(|_| EnvFilter::new("info"));

    let mut layers: Vec<BoxedLayer> = Vec::new();

    // File layer goes first so console ANSI settings do not leak into it
    // (tokio-rs/tracing#1817).
    if config.file.enabled {
        layers.push(file_layer(&config.file)?);
    }
    if config.console.enabled {
        layers.push(console_layer(&config.console));
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()?;

    Ok(())
}

fn console_layer(config: &ConsoleConfig) -> BoxedLayer {
    let use_ansi = config.colored && std::io::stdout().is_terminal();
    fmt::layer()
        .with_ansi(use_ansi)
        .with_target(true)
        .with_level(true)
        .boxed()
}

fn file_layer(config: &FileConfig) -> anyhow::Result<BoxedLayer> {
    let writer = RotatingFileWriter::new(config)?;
    let base = fmt::layer().with_ansi(false).with_target(true).with_writer(writer);

    Ok(match config.format {
        LogFormat::Full => base.boxed(),
        LogFormat::Compact => base.compact().boxed(),
        LogFormat::Json => base.json().boxed(),
    })
}
