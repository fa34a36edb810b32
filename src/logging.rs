//! Level-split log files
//!
//! The console is filtered by verbosity; the log files are not. Each file
//! layer takes this crate's events of exactly one level, plus the crate's
//! spans so every line carries its page and item context.

use crate::config::LoggingConfig;
use crate::Result;
use std::path::Path;
use tracing::{Level, Metadata, Subscriber};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, Layer};

pub use tracing_appender::non_blocking::WorkerGuard;

const CRATE_TARGET: &str = "fang_comments";

/// A type-erased layer over subscriber `S`
pub type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// Whether a file layer for `level` records this callsite
pub fn accepts(metadata: &Metadata<'_>, level: Level) -> bool {
    if !metadata.target().starts_with(CRATE_TARGET) {
        return false;
    }
    metadata.is_span() || *metadata.level() == level
}

/// Builds a non-blocking file layer recording exactly one level
///
/// The file is opened in append mode and never rotated. The returned guard
/// flushes pending lines when dropped and must outlive every event.
pub fn level_file_layer<S>(
    directory: &Path,
    file_name: &str,
    level: Level,
) -> Result<(BoxedLayer<S>, WorkerGuard)>
where
    S: Subscriber + for<'a> LookupSpan<'a> + 'static,
{
    std::fs::create_dir_all(directory)?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(directory)?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .with_thread_names(true)
        .with_filter(filter_fn(move |metadata| accepts(metadata, level)))
        .boxed();

    Ok((layer, guard))
}

/// Builds the INFO and ERROR file layers described by `config`
///
/// Returns no layers when file output is disabled.
pub fn file_layers<S>(config: &LoggingConfig) -> Result<(Vec<BoxedLayer<S>>, Vec<WorkerGuard>)>
where
    S: Subscriber + for<'a> LookupSpan<'a> + 'static,
{
    if !config.file_output {
        return Ok((Vec::new(), Vec::new()));
    }

    let (info_layer, info_guard) =
        level_file_layer(&config.directory, &config.info_file, Level::INFO)?;
    let (error_layer, error_guard) =
        level_file_layer(&config.directory, &config.error_file, Level::ERROR)?;

    Ok((vec![info_layer, error_layer], vec![info_guard, error_guard]))
}
