use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors raised by the operation algebra and the sync protocol.
///
/// Length conflicts (`CannotCompose` / `CannotTransform`) and protocol violations
/// (`NoPendingOp`) indicate a bug upstream or a coordinator that has lost sync
/// with this client. They are fatal for the editing session; callers should
/// surface them and reconstruct rather than try to recover in place.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[non_exhaustive]
pub enum OtError {
    /// The operation was applied to a document of the wrong length.
    LengthMismatch { expected: usize, actual: usize },
    /// A retain or delete ran past the end of the document.
    DocumentTooShort,
    /// The second operation's base length doesn't match the first's target length.
    CannotCompose,
    /// The two operations were not built against the same base document.
    CannotTransform,
    /// An acknowledgement or retry arrived while nothing was outstanding.
    NoPendingOp,
    /// A malformed operation or cursor was received from the coordinator;
    /// produced by the `from_json` decode entry points.
    InvalidOperation,
    NothingToUndo,
    NothingToRedo,
    /// The object was disposed; only `dispose` may be called again.
    Disposed,
}

impl Display for OtError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OtError::LengthMismatch { expected, actual } => {
                write!(f, "operation expects a document of length {expected}, got {actual}")
            }
            OtError::DocumentTooShort => write!(f, "operation ran past the end of the document"),
            OtError::CannotCompose => write!(f, "operations cannot be composed: lengths don't chain"),
            OtError::CannotTransform => {
                write!(f, "operations cannot be transformed: different base lengths")
            }
            OtError::NoPendingOp => write!(f, "server acknowledged but no operation is outstanding"),
            OtError::InvalidOperation => write!(f, "received a malformed operation"),
            OtError::NothingToUndo => write!(f, "undo stack is empty"),
            OtError::NothingToRedo => write!(f, "redo stack is empty"),
            OtError::Disposed => write!(f, "object has been disposed"),
        }
    }
}

impl Error for OtError {}
