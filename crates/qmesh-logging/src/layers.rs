//! Output layers
//!
//! Every output is built as a boxed layer over the registry so any
//! combination of console and file output can be stacked without spelling
//! out each combination's type.

use std::fs::{self, File};

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::MakeWriter;
use tracing_subscriber::fmt::{self, TestWriter};
use tracing_subscriber::{Layer, Registry};

use crate::LoggingError;
use crate::config::{ConsoleConfig, FileConfig, JsonlConfig, RotationStrategy};

/// A layer stacked directly on the registry
pub type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// JSON-lines layer writing to `writer`
pub fn jsonl_layer<W>(writer: W, config: &JsonlConfig) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::layer()
        .json()
        .with_current_span(config.include_current_span)
        .with_span_list(config.include_spans)
        .flatten_event(config.flatten_events)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_thread_ids(config.include_thread_info)
        .with_thread_names(config.include_thread_info)
        .with_writer(writer)
        .boxed()
}

/// Console layer: pretty or JSONL, on stdout or the test harness
pub fn console_layer(console: &ConsoleConfig, jsonl: &JsonlConfig) -> BoxedLayer {
    match (console.pretty, console.test_writer) {
        (true, true) => fmt::layer()
            .with_ansi(console.ansi)
            .with_target(true)
            .with_writer(TestWriter::default())
            .boxed(),
        (true, false) => fmt::layer()
            .with_ansi(console.ansi)
            .with_target(true)
            .boxed(),
        (false, true) => jsonl_layer(TestWriter::default(), jsonl),
        (false, false) => jsonl_layer(std::io::stdout, jsonl),
    }
}

impl RotationStrategy {
    fn appender_rotation(self) -> Option<Rotation> {
        match self {
            RotationStrategy::Daily => Some(Rotation::DAILY),
            RotationStrategy::Hourly => Some(Rotation::HOURLY),
            RotationStrategy::Never => None,
        }
    }
}

/// Non-blocking file writer; the guard must outlive all logging
///
/// `Never` truncates a single `<prefix>.log`; the other strategies append to
/// rolling `<prefix>.<date>.log` files.
pub fn file_writer(config: &FileConfig) -> Result<(NonBlocking, WorkerGuard), LoggingError> {
    fs::create_dir_all(&config.directory)?;

    let Some(rotation) = config.rotation.appender_rotation() else {
        let file = File::create(config.directory.join(format!("{}.log", config.prefix)))?;
        return Ok(tracing_appender::non_blocking(file));
    };

    let mut builder = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(&config.prefix)
        .filename_suffix("log");
    if let Some(max_files) = config.max_files {
        builder = builder.max_log_files(max_files);
    }
    let appender = builder.build(&config.directory)?;
    Ok(tracing_appender::non_blocking(appender))
}
