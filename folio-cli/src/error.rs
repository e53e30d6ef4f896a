use colored::Colorize;
use std::fmt;
use std::process;

/// Exit codes for the CLI.
pub const EXIT_ERROR: i32 = 1;
pub const EXIT_USAGE: i32 = 2;

/// Unified error type for CLI operations.
pub enum CliError {
    /// Error from the access engine.
    Access(folio_access::AccessError),
    /// Catalog file could not be read, parsed or validated.
    Config(folio_access::ConfigError),
    /// No catalog file given and none found.
    NoCatalog,
    /// Argument / usage errors.
    Usage(String),
    /// Output could not be produced.
    Output(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Access(e) => write!(f, "{} {e}", "error:".red().bold()),
            CliError::Config(e) => write!(f, "{} {e}", "error:".red().bold()),
            CliError::NoCatalog => write!(
                f,
                "{} no access catalog found\n  {} pass --config <file> or create folio.toml",
                "error:".red().bold(),
                "help:".cyan().bold(),
            ),
            CliError::Usage(msg) => write!(f, "{} {msg}", "error:".red().bold()),
            CliError::Output(msg) => write!(f, "{} {msg}", "error:".red().bold()),
        }
    }
}

impl fmt::Debug for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl From<folio_access::AccessError> for CliError {
    fn from(e: folio_access::AccessError) -> Self {
        match e {
            folio_access::AccessError::InvalidArgument { message } => CliError::Usage(message),
            other => CliError::Access(other),
        }
    }
}

impl From<folio_access::ConfigError> for CliError {
    fn from(e: folio_access::ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Output(format!("JSON encode error: {e}"))
    }
}

/// Print error and exit with the appropriate code.
pub fn exit_with_error(err: CliError) -> ! {
    eprintln!("{err}");
    let code = match &err {
        CliError::Usage(_) => EXIT_USAGE,
        _ => EXIT_ERROR,
    };
    process::exit(code)
}

pub type CliResult<T> = std::result::Result<T, CliError>;
