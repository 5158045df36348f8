use std::fmt;

use crate::ty::TypeRef;

/// A guest-level throwable surfaced to the embedder.
///
/// Carries the guest class of the throwable, an optional message, and an
/// optional cause chain. Guest errors are values, not host panics: the
/// embedder decides how to materialize them on the guest heap.
#[derive(Debug, Clone)]
pub struct GuestError {
    class: TypeRef,
    message: Option<String>,
    cause: Option<Box<GuestError>>,
}

impl GuestError {
    pub(crate) fn new(class: TypeRef, message: Option<String>, cause: Option<GuestError>) -> Self {
        Self {
            class,
            message,
            cause: cause.map(Box::new),
        }
    }

    pub fn class(&self) -> &TypeRef {
        &self.class
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn cause(&self) -> Option<&GuestError> {
        self.cause.as_deref()
    }
}

impl fmt::Display for GuestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.class.name())?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        Ok(())
    }
}

impl std::error::Error for GuestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.as_ref().map(|c| c.as_ref() as _)
    }
}

/// Linkage-class failures that permanently poison a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkageKind {
    Verify,
    ClassFormat,
    IncompatibleClassChange,
    NoClassDefFound,
}

impl fmt::Display for LinkageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LinkageKind::Verify => "verify error",
            LinkageKind::ClassFormat => "class format error",
            LinkageKind::IncompatibleClassChange => "incompatible class change",
            LinkageKind::NoClassDefFound => "no class definition found",
        })
    }
}

/// Failure signalled by the external linking/initialization sequence.
#[derive(Debug, thiserror::Error)]
pub enum InitFailure {
    /// The guest static initializer threw.
    #[error(transparent)]
    GuestException(GuestError),
    /// Linking-time failure; the type becomes permanently erroneous.
    #[error("{kind}: {message}")]
    Linkage { kind: LinkageKind, message: String },
}
