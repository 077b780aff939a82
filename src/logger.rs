//! Logger configuration and installation.
//!
//! Nothing here is global until `init_logging` runs: a `LoggerConfig` is a
//! plain value that can be built in code or read from the environment, and
//! `subscriber` turns it plus a sink into a `tracing` subscriber that tests
//! can scope with `tracing::subscriber::with_default`.

use std::env;
use std::fmt;
use std::fs::OpenOptions;
use std::panic::Location;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::level_filters::LevelFilter;
use tracing::{Level, Subscriber};

use crate::error::{Error, Result};
use crate::format::{AnsiEventFormatter, LogFormat};
use crate::sink::{AnsiSink, LevelPalette};
use crate::{AnsiMode, WriteAnsi};

/// Environment variable holding a `Verbosity`.
pub const LEVEL_ENV: &str = "TERMLOG_LEVEL";
/// Environment variable holding an `AnsiMode`.
pub const COLOR_ENV: &str = "TERMLOG_COLOR";
/// Environment variable holding a `LogFormat`.
pub const FORMAT_ENV: &str = "TERMLOG_FORMAT";

/// The least severe level that still gets logged.
///
/// Defaults to `Trace` in debug builds and to `Warn` otherwise.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Verbosity {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    /// Nothing is logged.
    Off,
}

impl Default for Verbosity {
    fn default() -> Verbosity {
        if cfg!(debug_assertions) { Verbosity::Trace } else { Verbosity::Warn }
    }
}

impl From<Verbosity> for LevelFilter {
    fn from(verbosity: Verbosity) -> LevelFilter {
        match verbosity {
            Verbosity::Trace => LevelFilter::TRACE,
            Verbosity::Debug => LevelFilter::DEBUG,
            Verbosity::Info => LevelFilter::INFO,
            Verbosity::Warn => LevelFilter::WARN,
            Verbosity::Error => LevelFilter::ERROR,
            Verbosity::Off => LevelFilter::OFF,
        }
    }
}

impl FromStr for Verbosity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Verbosity> {
        match &*s.to_lowercase() {
            "trace" => Ok(Verbosity::Trace),
            "debug" => Ok(Verbosity::Debug),
            "info" => Ok(Verbosity::Info),
            "warn" | "warning" => Ok(Verbosity::Warn),
            "error" => Ok(Verbosity::Error),
            "off" => Ok(Verbosity::Off),
            _ => Err(Error::Verbosity(s.to_string())),
        }
    }
}

/// Where log records go.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    /// Appended to this file, which is created if missing.
    File(PathBuf),
}

/// Everything `init_logging` needs to know.
#[derive(Clone, Debug)]
pub struct LoggerConfig {
    name: String,
    name_gradient: Option<((u8, u8, u8), (u8, u8, u8))>,
    verbosity: Verbosity,
    mode: AnsiMode,
    output: LogOutput,
    format: LogFormat,
    palette: LevelPalette,
}

impl Default for LoggerConfig {
    fn default() -> LoggerConfig {
        LoggerConfig {
            name: "main".to_string(),
            name_gradient: Some(((0, 255, 255), (255, 100, 255))),
            verbosity: Verbosity::default(),
            mode: AnsiMode::default(),
            output: LogOutput::default(),
            format: LogFormat::default(),
            palette: LevelPalette::default(),
        }
    }
}

impl LoggerConfig {
    /// The default configuration, with verbosity, ANSI mode and format taken
    /// from `TERMLOG_LEVEL`, `TERMLOG_COLOR` and `TERMLOG_FORMAT` when set.
    ///
    /// A variable that is set but can't be parsed is an error.
    pub fn from_env() -> Result<LoggerConfig> {
        let mut config = LoggerConfig::default();
        if let Some(level) = env_value(LEVEL_ENV) {
            config.set_verbosity(level.parse()?);
        }
        if let Some(mode) = env_value(COLOR_ENV) {
            config.set_mode(mode.parse()?);
        }
        if let Some(format) = env_value(FORMAT_ENV) {
            config.set_format(format.parse()?);
        }
        Ok(config)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn mode(&self) -> AnsiMode {
        self.mode
    }

    pub fn output(&self) -> &LogOutput {
        &self.output
    }

    pub fn format(&self) -> LogFormat {
        self.format
    }

    pub fn palette(&self) -> &LevelPalette {
        &self.palette
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> &mut LoggerConfig {
        self.name = name.into();
        self
    }

    /// Set the gradient the logger name is painted with, or `None` for plain
    /// text.
    pub fn set_name_gradient(
        &mut self,
        gradient: Option<((u8, u8, u8), (u8, u8, u8))>,
    ) -> &mut LoggerConfig {
        self.name_gradient = gradient;
        self
    }

    pub fn set_verbosity(&mut self, verbosity: Verbosity) -> &mut LoggerConfig {
        self.verbosity = verbosity;
        self
    }

    pub fn set_mode(&mut self, mode: AnsiMode) -> &mut LoggerConfig {
        self.mode = mode;
        self
    }

    pub fn set_output(&mut self, output: LogOutput) -> &mut LoggerConfig {
        self.output = output;
        self
    }

    pub fn set_format(&mut self, format: LogFormat) -> &mut LoggerConfig {
        self.format = format;
        self
    }

    pub fn set_palette(&mut self, palette: LevelPalette) -> &mut LoggerConfig {
        self.palette = palette;
        self
    }

    /// The event formatter this configuration describes.
    pub fn formatter(&self) -> AnsiEventFormatter {
        let formatter = AnsiEventFormatter::new(self.name.clone())
            .format(self.format)
            .palette(self.palette.clone());
        match self.name_gradient {
            Some((first, last)) => formatter.name_gradient(first, last),
            None => formatter,
        }
    }
}

fn env_value(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

/// Build a subscriber that formats events per `config` and writes them to
/// `sink`.
///
/// The output destination in `config` is ignored; `sink` is used instead.
pub fn subscriber<W>(
    config: &LoggerConfig,
    sink: AnsiSink<W>,
) -> impl Subscriber + Send + Sync + use<W>
where
    W: WriteAnsi + Send + 'static,
{
    let ansi = sink.is_ansi_enabled();
    tracing_subscriber::fmt()
        .with_writer(sink)
        .with_ansi(ansi)
        .with_max_level(config.verbosity)
        .event_format(config.formatter())
        .finish()
}

/// Install a global subscriber configured by `config`.
///
/// This can succeed only once per process.
pub fn init_logging(config: &LoggerConfig) -> Result<()> {
    let ansi = match config.output {
        LogOutput::Stdout => install(config, AnsiSink::stdout(config.mode))?,
        LogOutput::Stderr => install(config, AnsiSink::stderr(config.mode))?,
        LogOutput::File(ref path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            install(config, AnsiSink::file(file, config.mode)?)?
        }
    };
    tracing::debug!(
        name = %config.name,
        ansi,
        verbosity = ?config.verbosity,
        "logging initialised"
    );
    Ok(())
}

fn install<W>(config: &LoggerConfig, sink: AnsiSink<W>) -> Result<bool>
where
    W: WriteAnsi + Send + 'static,
{
    let ansi = sink.is_ansi_enabled();
    tracing::subscriber::set_global_default(subscriber(config, sink))?;
    Ok(ansi)
}

/// A log message that remembers where it was created.
///
/// ```
/// use termlog::Message;
///
/// let msg = Message::warn(format!("disk {}% full", 93));
/// assert_eq!(msg.to_string(), "disk 93% full");
/// msg.emit();
/// ```
#[derive(Clone, Debug)]
pub struct Message {
    level: Level,
    text: String,
    location: &'static Location<'static>,
}

impl Message {
    #[track_caller]
    pub fn new(level: Level, text: impl Into<String>) -> Message {
        Message { level, text: text.into(), location: Location::caller() }
    }

    #[track_caller]
    pub fn trace(text: impl Into<String>) -> Message {
        Message::new(Level::TRACE, text)
    }

    #[track_caller]
    pub fn debug(text: impl Into<String>) -> Message {
        Message::new(Level::DEBUG, text)
    }

    #[track_caller]
    pub fn info(text: impl Into<String>) -> Message {
        Message::new(Level::INFO, text)
    }

    #[track_caller]
    pub fn warn(text: impl Into<String>) -> Message {
        Message::new(Level::WARN, text)
    }

    #[track_caller]
    pub fn error(text: impl Into<String>) -> Message {
        Message::new(Level::ERROR, text)
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Where the message was created.
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    /// Log this message through the current `tracing` subscriber, reporting
    /// its creation site as the source location.
    pub fn emit(&self) {
        let file = self.location.file();
        let line = self.location.line();
        let text = &self.text;
        match self.level {
            Level::TRACE => {
                tracing::trace!(caller.file = file, caller.line = line, "{text}")
            }
            Level::DEBUG => {
                tracing::debug!(caller.file = file, caller.line = line, "{text}")
            }
            Level::INFO => {
                tracing::info!(caller.file = file, caller.line = line, "{text}")
            }
            Level::WARN => {
                tracing::warn!(caller.file = file, caller.line = line, "{text}")
            }
            Level::ERROR => {
                tracing::error!(caller.file = file, caller.line = line, "{text}")
            }
        }
    }
}

/// Logs `text` as a warning from the caller's location when `cond` is
/// false. Returns `cond`, so it can guard a fallback:
///
/// ```
/// let width = 0;
/// let width = if termlog::check(width > 0, "zero width, using 80") { width } else { 80 };
/// assert_eq!(width, 80);
/// ```
#[track_caller]
pub fn check(cond: bool, text: impl Into<String>) -> bool {
    if !cond {
        Message::warn(text).emit();
    }
    cond
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn verbosity_parses() {
        assert_eq!("WARNING".parse::<Verbosity>().unwrap(), Verbosity::Warn);
        assert_eq!("off".parse::<Verbosity>().unwrap(), Verbosity::Off);
        match "loud".parse::<Verbosity>() {
            Err(Error::Verbosity(s)) => assert_eq!(s, "loud"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn verbosity_maps_to_filters() {
        assert_eq!(LevelFilter::from(Verbosity::Info), LevelFilter::INFO);
        assert_eq!(LevelFilter::from(Verbosity::Off), LevelFilter::OFF);
    }

    #[cfg(debug_assertions)]
    #[test]
    fn debug_builds_log_everything() {
        assert_eq!(Verbosity::default(), Verbosity::Trace);
    }

    #[test]
    fn setters_chain() {
        let mut config = LoggerConfig::default();
        config
            .set_name("svc")
            .set_verbosity(Verbosity::Info)
            .set_mode(AnsiMode::Never)
            .set_output(LogOutput::Stderr)
            .set_format(LogFormat::Message);
        assert_eq!(config.name(), "svc");
        assert_eq!(config.verbosity(), Verbosity::Info);
        assert_eq!(config.mode(), AnsiMode::Never);
        assert_eq!(config.output(), &LogOutput::Stderr);
        assert_eq!(config.format(), LogFormat::Message);
    }

    #[test]
    fn messages_remember_their_origin() {
        let line = line!() + 1;
        let msg = Message::error("bad");
        assert_eq!(msg.location().file(), file!());
        assert_eq!(msg.location().line(), line);
        assert_eq!(msg.level(), Level::ERROR);
        assert_eq!(msg.text(), "bad");
    }
}
