use std::sync::Once;

use tracing::Level;
use tracing_appender::rolling;
use tracing_subscriber::fmt::writer::MakeWriterExt;

static INIT: Once = Once::new();

/// Where log events go: a human operator's terminal, or a daily-rolling file
/// for unattended batch runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputType {
    Stdout,
    File,
}

#[derive(Debug, Clone)]
pub struct TracingFactoryOptions {
    debug: bool,
    output_type: OutputType,
    log_dir: Option<String>,
}

impl TracingFactoryOptions {
    pub fn new(debug: bool, output_type: OutputType, log_dir: Option<String>) -> Self {
        TracingFactoryOptions {
            debug,
            output_type,
            log_dir,
        }
    }

    fn level(&self) -> Level {
        if self.debug {
            Level::DEBUG
        } else {
            Level::INFO
        }
    }

    fn log_dir(&self) -> &str {
        self.log_dir.as_deref().unwrap_or("/tmp/cdc-consolidate/logs")
    }
}

impl Default for TracingFactoryOptions {
    fn default() -> Self {
        TracingFactoryOptions::new(false, OutputType::Stdout, None)
    }
}

/// Installs the global `tracing` subscriber exactly once per process.
///
/// Calling this more than once (the CLI does it once at startup, tests may do
/// it per-case) is harmless: every call after the first is a no-op.
#[derive(Debug, Clone, Default)]
pub struct TracingFactory {
    options: TracingFactoryOptions,
}

impl TracingFactory {
    pub fn init(options: TracingFactoryOptions) -> Self {
        INIT.call_once(|| {
            let format = tracing_subscriber::fmt::format()
                .with_file(true)
                .with_line_number(false)
                .with_target(false)
                .with_thread_ids(false)
                .compact();

            match options.output_type {
                OutputType::Stdout => {
                    let _ = tracing_subscriber::fmt()
                        .with_max_level(options.level())
                        .event_format(format)
                        .try_init();
                }
                OutputType::File => {
                    let file_appender = rolling::daily(options.log_dir(), "cdc-consolidate.log");
                    let writer = file_appender.and(std::io::stdout);

                    let _ = tracing_subscriber::fmt()
                        .with_max_level(options.level())
                        .event_format(format)
                        .with_writer(writer)
                        .try_init();
                }
            }
        });

        TracingFactory { options }
    }

    pub fn log_dir(&self) -> &str {
        self.options.log_dir()
    }
}

#[cfg(test)]
mod test {
    use tracing::{debug, error, info, warn};

    use super::*;

    #[test]
    fn init_is_idempotent_and_emits_events_without_panicking() {
        let factory = TracingFactory::init(TracingFactoryOptions::new(true, OutputType::Stdout, None));
        let _ = TracingFactory::init(TracingFactoryOptions::new(true, OutputType::Stdout, None));

        assert!(!factory.log_dir().is_empty());

        debug!("tracing factory test: {:?}", "test");
        info!("tracing factory test: {:?}", "test");
        warn!("tracing factory test: {:?}", "test");
        error!("tracing factory test: {:?}", "test");
    }
}
