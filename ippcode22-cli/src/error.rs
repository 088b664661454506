use std::fmt;
use std::io;

/// Everything that can end an `ippcode22` run, layered over the lower crates' own error
/// types with the two failure modes that only make sense at this level: a bad command line,
/// and I/O faults opening the files the command line named.
#[derive(Debug)]
pub enum CliError {
    Argument(String),
    Io(io::Error),
    /// The statistics file named by `--stats` could not be created or written.
    OutputFile(io::Error),
    Xml(ippcode22_xml::Error),
    Runtime(ippcode22::RuntimeError),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Argument(_) => 10,
            CliError::Io(_) => 11,
            CliError::OutputFile(_) => 12,
            CliError::Xml(err) => err.exit_code(),
            CliError::Runtime(err) => err.exit_code(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CliError::Argument(msg) => write!(f, "{}", msg),
            CliError::Io(err) => write!(f, "{}", err),
            CliError::OutputFile(err) => write!(f, "{}", err),
            CliError::Xml(err) => write!(f, "{}", err),
            CliError::Runtime(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(err: io::Error) -> CliError {
        CliError::Io(err)
    }
}

impl From<ippcode22_xml::Error> for CliError {
    fn from(err: ippcode22_xml::Error) -> CliError {
        CliError::Xml(err)
    }
}

impl From<ippcode22::RuntimeError> for CliError {
    fn from(err: ippcode22::RuntimeError) -> CliError {
        CliError::Runtime(err)
    }
}
