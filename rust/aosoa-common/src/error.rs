use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn out_of_range(name: impl Into<String>, index: usize, bound: usize) -> Error {
        Error(
            ErrorKind::OutOfRange {
                name: name.into(),
                index,
                bound,
            }
            .into(),
        )
    }

    pub fn invalid_format(element: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidFormat {
                element: element.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_operation(name: impl Into<String>) -> Error {
        Error(ErrorKind::InvalidOperation { name: name.into() }.into())
    }

    pub fn alloc_failed(context: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::AllocationFailed {
                context: context.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn buffer_too_small(required: usize, available: usize) -> Error {
        Error(
            ErrorKind::DestBufferTooSmall {
                required,
                available,
            }
            .into(),
        )
    }

    /// Returns `true` if the error reports a failed memory allocation.
    pub fn is_alloc_failure(&self) -> bool {
        matches!(self.kind(), ErrorKind::AllocationFailed { .. })
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("{name} out of range: {index} (bound {bound})")]
    OutOfRange {
        name: String,
        index: usize,
        bound: usize,
    },

    #[error("invalid operation {name}")]
    InvalidOperation { name: String },

    #[error("invalid format for '{element}': {message}")]
    InvalidFormat { element: String, message: String },

    #[error("allocation failed for '{context}': {message}")]
    AllocationFailed { context: String, message: String },

    #[error("destination buffer is too small: {required} bytes required, {available} available")]
    DestBufferTooSmall { required: usize, available: usize },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

impl From<std::collections::TryReserveError> for Error {
    fn from(e: std::collections::TryReserveError) -> Self {
        Error::alloc_failed("reserve", e.to_string())
    }
}
