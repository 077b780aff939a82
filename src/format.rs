//! Event formatting for `tracing-subscriber`.
//!
//! A detailed record looks like this, with the level, location and target
//! highlighted when the writer accepts escapes:
//!
//! ```text
//! [14:03:59.120][app][INFO] from src/main.rs:12 -> app::net :
//! > connected peer=10.0.0.7
//! --------------------------------------------------------------------------------
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::Local;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

use crate::error::Error;
use crate::escape::{self, CYAN, DEFAULT_FG, MAGENTA, RESET, UNDERLINE};
use crate::sink::LevelPalette;
use crate::{ColorTarget, Style};

/// Width of the line closing a detailed record.
pub const SEPARATOR_WIDTH: usize = 80;

const CALLER_FILE: &str = "caller.file";
const CALLER_LINE: &str = "caller.line";

#[cfg(windows)]
const NAME_STYLES: &[Style] = &[Style::Bold];
#[cfg(not(windows))]
const NAME_STYLES: &[Style] = &[Style::Bold, Style::Italic];

/// How much of each event is written.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum LogFormat {
    /// Timestamp, logger name, level, location and target, then the message
    /// on its own line and a separator.
    #[default]
    Detailed,
    /// The message and its fields, nothing else.
    Message,
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<LogFormat, Error> {
        match &*s.to_lowercase() {
            "detailed" => Ok(LogFormat::Detailed),
            "message" => Ok(LogFormat::Message),
            _ => Err(Error::Format(s.to_string())),
        }
    }
}

/// Formats events as described in the module documentation.
#[derive(Clone, Debug)]
pub struct AnsiEventFormatter {
    name: String,
    gradient: Option<((u8, u8, u8), (u8, u8, u8))>,
    format: LogFormat,
    palette: LevelPalette,
}

impl AnsiEventFormatter {
    pub fn new(name: impl Into<String>) -> AnsiEventFormatter {
        AnsiEventFormatter {
            name: name.into(),
            gradient: None,
            format: LogFormat::default(),
            palette: LevelPalette::default(),
        }
    }

    pub fn format(mut self, format: LogFormat) -> AnsiEventFormatter {
        self.format = format;
        self
    }

    pub fn palette(mut self, palette: LevelPalette) -> AnsiEventFormatter {
        self.palette = palette;
        self
    }

    /// Paint the logger name with a color gradient when escapes are enabled.
    pub fn name_gradient(
        mut self,
        first: (u8, u8, u8),
        last: (u8, u8, u8),
    ) -> AnsiEventFormatter {
        self.gradient = Some((first, last));
        self
    }

    fn write_name(&self, f: &mut Writer<'_>) -> fmt::Result {
        match self.gradient {
            Some((first, last)) if f.has_ansi_escapes() => {
                let painted = escape::text_gradient(
                    &self.name,
                    ColorTarget::Foreground,
                    first,
                    last,
                    false,
                );
                write!(f, "{}", escape::modify(&painted, NAME_STYLES, true))
            }
            _ => write!(f, "{}", self.name),
        }
    }
}

impl<S, N> FormatEvent<S, N> for AnsiEventFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut f: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut fields = EventFields::default();
        event.record(&mut fields);

        if self.format == LogFormat::Message {
            return writeln!(f, "{fields}");
        }

        let meta = event.metadata();
        let ansi = f.has_ansi_escapes();
        write!(f, "[{}][", Local::now().format("%H:%M:%S%.3f"))?;
        self.write_name(&mut f)?;

        let level = meta.level();
        if ansi {
            let color = self.palette.get(level);
            write!(f, "][{color}{level}{RESET}]")?;
        } else {
            write!(f, "][{level}]")?;
        }

        let file = fields.file.as_deref().or(meta.file()).unwrap_or("<unknown>");
        let location = match fields.line.or(meta.line()) {
            Some(line) => format!("{file}:{line}"),
            None => file.to_string(),
        };
        let target = meta.target();
        if ansi {
            write!(
                f,
                " from {UNDERLINE}{CYAN}{location}{RESET} -> \
                 {MAGENTA}{target}{DEFAULT_FG} :"
            )?;
        } else {
            write!(f, " from {location} -> {target} :")?;
        }

        writeln!(f, "\n> {fields}")?;
        writeln!(f, "{}", "-".repeat(SEPARATOR_WIDTH))
    }
}

/// Collects the message, caller location and remaining fields of an event.
#[derive(Default)]
struct EventFields {
    message: String,
    file: Option<String>,
    line: Option<u32>,
    rest: Vec<(&'static str, String)>,
}

impl Visit for EventFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            CALLER_FILE => self.file = Some(value.to_string()),
            "message" => self.message = value.to_string(),
            _ => self.record_debug(field, &value),
        }
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        if field.name() == CALLER_LINE {
            if let Ok(line) = u32::try_from(value) {
                self.line = Some(line);
                return;
            }
        }
        self.record_debug(field, &value)
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.rest.push((field.name(), format!("{value:?}")));
        }
    }
}

impl fmt::Display for EventFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        let mut sep = if self.message.is_empty() { "" } else { " " };
        for (name, value) in &self.rest {
            write!(f, "{sep}{name}={value}")?;
            sep = " ";
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AnsiSink, AnsiStream};
    use pretty_assertions::assert_eq;

    fn capture(
        formatter: AnsiEventFormatter,
        ansi: bool,
        log: impl FnOnce(),
    ) -> String {
        let sink = AnsiSink::new(AnsiStream::new(ansi, vec![]));
        let subscriber = tracing_subscriber::fmt()
            .with_writer(sink.clone())
            .with_ansi(ansi)
            .with_max_level(tracing::Level::TRACE)
            .event_format(formatter)
            .finish();
        tracing::subscriber::with_default(subscriber, log);
        let bytes = sink.lock().get_ref().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn message_format_is_just_the_message() {
        let out = capture(
            AnsiEventFormatter::new("app").format(LogFormat::Message),
            false,
            || tracing::info!(port = 8080, "listening"),
        );
        assert_eq!(out, "listening port=8080\n");
    }

    #[test]
    fn detailed_format_without_escapes() {
        let out = capture(AnsiEventFormatter::new("app"), false, || {
            tracing::warn!(caller.file = "src/net.rs", caller.line = 42u32, "slow")
        });
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3, "{out:?}");
        // [HH:MM:SS.mmm]
        assert_eq!(&lines[0][..1], "[");
        assert_eq!(&lines[0][13..14], "]");
        assert_eq!(
            &lines[0][14..],
            format!("[app][WARN] from src/net.rs:42 -> {} :", module_path!())
        );
        assert_eq!(lines[1], "> slow");
        assert_eq!(lines[2], "-".repeat(SEPARATOR_WIDTH));
        assert!(!escape::contains_escape(out.as_bytes()));
    }

    #[test]
    fn detailed_format_highlights_when_enabled() {
        let out = capture(
            AnsiEventFormatter::new("app").name_gradient((0, 255, 255), (255, 100, 255)),
            true,
            || tracing::error!("boom"),
        );
        assert!(out.contains("[\x1b[1m\x1b[31mERROR\x1b[0m]"), "{out:?}");
        assert!(out.contains("\x1b[38;2;0;255;255ma"), "{out:?}");
        assert!(out.contains("\n> boom\n"));
    }

    #[test]
    fn levels_are_painted_by_the_palette_alone() {
        let out = capture(AnsiEventFormatter::new("app"), true, || {
            tracing::info!("plain");
            tracing::warn!("loud");
        });
        assert!(out.contains("][\x1b[32mINFO\x1b[0m]"), "{out:?}");
        assert!(out.contains("][\x1b[1m\x1b[33mWARN\x1b[0m]"), "{out:?}");
        assert!(!out.contains("\x1b[1m\x1b[1m"), "{out:?}");
    }

    #[test]
    fn location_falls_back_to_metadata() {
        let out = capture(AnsiEventFormatter::new("app"), false, || {
            tracing::info!("here")
        });
        assert!(out.contains(&format!(" from {}:", file!())), "{out:?}");
    }

    #[test]
    fn formats_parse() {
        assert_eq!("Detailed".parse::<LogFormat>().unwrap(), LogFormat::Detailed);
        assert_eq!("message".parse::<LogFormat>().unwrap(), LogFormat::Message);
        assert!("fancy".parse::<LogFormat>().is_err());
    }
}
