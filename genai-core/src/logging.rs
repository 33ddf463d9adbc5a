use std::path::PathBuf;
use std::fmt;
use tracing_subscriber::{
    EnvFilter, fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt,
    fmt::{format::Writer, FormatEvent, FormatFields},
    registry::LookupSpan,
};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing::{Event, Subscriber};

/// Targets emitted by the genai crates, each one gets the configured level
const GENAI_TARGETS: &[&str] = &[
    "genai_core",
    "genai_llm",
    "genai_cli",
    "genai::http",
    "genai::rag",
    "genai::container",
    "genai::tools",
    "genai::chat",
];

/// Colors the target so http traffic, retrieval and containers stand apart
struct ColoredFormatter;

fn target_color(target: &str) -> (&'static str, &'static str) {
    match target {
        "genai::http" => ("\x1b[38;5;51m", ""),       // cyan, request dumps
        "genai::rag" => ("\x1b[38;5;226m", ""),       // yellow
        "genai::container" => ("\x1b[38;5;213m", ""), // pink
        "genai::tools" => ("\x1b[38;5;82m", ""),      // lime
        _ => ("\x1b[2m", "\x1b[2m"),
    }
}

impl<S, N> FormatEvent<S, N> for ColoredFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        let (target_color, message_color) = target_color(metadata.target());

        let level_color = match *metadata.level() {
            tracing::Level::ERROR => "\x1b[31m",
            tracing::Level::WARN => "\x1b[33m",
            tracing::Level::INFO => "\x1b[32m",
            tracing::Level::DEBUG => "\x1b[34m",
            tracing::Level::TRACE => "\x1b[35m",
        };

        // [timestamp] [level] [target] message
        write!(writer, "{} ", chrono::Local::now().format("%Y/%m/%d %H:%M:%S"))?;
        write!(writer, "{}{:5}\x1b[0m ", level_color, metadata.level())?;
        write!(writer, "{}[{}]\x1b[0m ", target_color, metadata.target())?;
        write!(writer, "{}", message_color)?;
        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer, "\x1b[0m")?;

        Ok(())
    }
}

/// Logging configuration for the example programs
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "debug", "info", "warn", "error")
    pub level: String,
    /// Optional file path for log output. If None, logs to stderr
    pub file_path: Option<PathBuf>,
    /// Whether to include spans in logs
    pub include_spans: bool,
    /// JSON format instead of human-readable
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_path: None,
            include_spans: false,
            json_format: false,
        }
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name).map(|v| v == "true").unwrap_or(false)
}

impl LoggingConfig {
    /// Create config from GENAI_LOG_LEVEL, GENAI_LOG_FILE, GENAI_LOG_SPANS and GENAI_LOG_JSON
    pub fn from_env() -> Self {
        Self {
            level: std::env::var("GENAI_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            file_path: std::env::var("GENAI_LOG_FILE").ok().map(PathBuf::from),
            include_spans: env_flag("GENAI_LOG_SPANS"),
            json_format: env_flag("GENAI_LOG_JSON"),
        }
    }

    pub fn level<S: Into<String>>(mut self, level: S) -> Self {
        self.level = level.into();
        self
    }

    pub fn file_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.file_path = Some(path.into());
        self
    }

    pub fn with_spans(mut self, enable: bool) -> Self {
        self.include_spans = enable;
        self
    }

    pub fn json_format(mut self, enable: bool) -> Self {
        self.json_format = enable;
        self
    }

    /// Filter: warn for dependencies, the configured level for every genai target
    pub fn filter(&self) -> Result<EnvFilter, Box<dyn std::error::Error + Send + Sync>> {
        let mut filter = EnvFilter::from_default_env().add_directive("warn".parse()?);
        for target in GENAI_TARGETS {
            filter = filter.add_directive(format!("{}={}", target, self.level).parse()?);
        }
        Ok(filter)
    }

    /// Initialize the global tracing subscriber (safe for multiple calls)
    pub fn init(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let filter = self.filter()?;

        let span_events = if self.include_spans {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };

        match self.file_path {
            Some(path) => {
                let file_appender = RollingFileAppender::new(Rotation::DAILY,
                    path.parent().unwrap_or_else(|| std::path::Path::new(".")),
                    path.file_name().unwrap_or_else(|| std::ffi::OsStr::new("genai.log"))
                );

                if self.json_format {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(tracing_subscriber::fmt::layer()
                            .json()
                            .with_writer(file_appender)
                            .with_span_events(span_events)
                        )
                        .try_init()
                        .map_err(|_| "Failed to initialize subscriber (already set)")?;
                } else {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(tracing_subscriber::fmt::layer()
                            .with_writer(file_appender)
                            .with_span_events(span_events)
                            .with_ansi(false)
                        )
                        .try_init()
                        .map_err(|_| "Failed to initialize subscriber (already set)")?;
                }
            }
            None => {
                // stdout carries the model answers, logs go to stderr
                if self.json_format {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(tracing_subscriber::fmt::layer()
                            .json()
                            .with_writer(std::io::stderr)
                            .with_span_events(span_events)
                        )
                        .try_init()
                        .map_err(|_| "Failed to initialize subscriber (already set)")?;
                } else {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(tracing_subscriber::fmt::layer()
                            .event_format(ColoredFormatter)
                            .with_writer(std::io::stderr)
                            .with_ansi(true)
                        )
                        .try_init()
                        .map_err(|_| "Failed to initialize subscriber (already set)")?;
                }
            }
        }

        Ok(())
    }
}
