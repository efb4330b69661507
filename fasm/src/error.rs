use std::error::Error as StdError;
use std::fmt;

use pest::error::Error as PestError;

use crate::parser::Rule;

/// The assembled program does not fit into memory.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LayoutError {
    pub required: usize,
    pub capacity: usize,
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "program needs {} bytes but the machine has {} bytes of memory",
            self.required, self.capacity
        )
    }
}

impl StdError for LayoutError {}

#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// Parse or compile error, carrying the offending span.
    Parse(PestError<Rule>),
    /// The program overflows memory.
    Layout(LayoutError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Parse(error) => write!(f, "{}", error),
            Error::Layout(error) => write!(f, "{}", error),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Parse(error) => Some(error),
            Error::Layout(error) => Some(error),
        }
    }
}

impl From<PestError<Rule>> for Error {
    fn from(error: PestError<Rule>) -> Error {
        Error::Parse(error)
    }
}

impl From<LayoutError> for Error {
    fn from(error: LayoutError) -> Error {
        Error::Layout(error)
    }
}
