//! Purpose: Error model shared by the boundary layer, the value API, and the CLI.
//! Exports: `Error`, `ErrorKind`, `to_exit_code`, `not_implemented`.
//! Role: Single error type surfaced to callers; engine failures are folded into it.
//! Invariants: Kinds map 1:1 with stable CLI exit codes.
//! Invariants: `Range`/`Type`/`Generic` mirror the standard's RangeError/TypeError/Error.
use std::error::Error as StdError;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// Value outside its valid domain (bad unit, bad increment, missing relativeTo).
    Range,
    /// Wrong shape or kind of input, or a disallowed numeric coercion.
    Type,
    /// Engine failure whose message matched no known class.
    Generic,
    /// Surface member that exists but is intentionally unimplemented.
    NotImplemented,
    /// Host-side failure at the FFI edge (trap, missing export, memory access).
    Boundary,
    Io,
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
        }
    }

    pub fn range(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Range).with_message(message)
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Type).with_message(message)
    }

    pub fn boundary(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Boundary).with_message(message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

pub fn not_implemented(name: &str) -> Error {
    Error::new(ErrorKind::NotImplemented).with_message(format!("{name} is not implemented yet"))
}

pub fn to_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Generic => 1,
        ErrorKind::Range => 2,
        ErrorKind::Type => 3,
        ErrorKind::NotImplemented => 4,
        ErrorKind::Boundary => 5,
        ErrorKind::Io => 6,
    }
}
