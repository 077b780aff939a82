use std::io;

use thiserror::Error;

use crate::types::{AnsiModeParseError, ParseColorError, ParseStyleError};

/// Everything that can go wrong outside of plain stream I/O.
///
/// Stream types report failures as `io::Error`, like any other writer. This
/// type covers escape filtering, parsing of configuration values and logger
/// installation.
#[derive(Debug, Error)]
pub enum Error {
    /// An escape sequence was started but never properly terminated.
    ///
    /// This means the formatting pipeline produced something it shouldn't
    /// have, and is not a condition worth recovering from.
    #[error(
        "missing escape sequence termination or unsupported sequence at \
         byte {offset}: {text:?}"
    )]
    MalformedEscape { offset: usize, text: String },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("could not install the global log subscriber: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error(transparent)]
    Mode(#[from] AnsiModeParseError),

    #[error(transparent)]
    Color(#[from] ParseColorError),

    #[error(transparent)]
    Style(#[from] ParseStyleError),

    #[error(
        "unrecognized verbosity '{0}': valid values are: trace, debug, \
         info, warn, error, off"
    )]
    Verbosity(String),

    #[error("unrecognized log format '{0}': valid formats are: detailed, message")]
    Format(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for io::Error {
    fn from(err: Error) -> io::Error {
        match err {
            Error::Io(err) => err,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
