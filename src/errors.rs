//! Error types for oemkey.
//!
//! Errors fall into two groups:
//! - **Fatal**: the key cannot be obtained (`QueryFailed`, `NotFound`,
//!   `MalformedTable`) or nothing could be shown to the user. The program
//!   reports them and exits with status 1.
//! - **Recoverable**: `ClipboardFailed` and `TextConversionFailed` only
//!   degrade the run to an alternate path; the key is still displayed.

use std::fmt;

use thiserror::Error;

use crate::firmware::{Signature, TableProvider};

/// Result alias used throughout the crate.
pub type OemKeyResult<T> = Result<T, OemKeyError>;

/// Why a sized platform query failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryFailure {
    /// The size query reported zero bytes.
    ZeroSize,
    /// The fetch returned a different byte count than the size query declared.
    SizeMismatch { declared: u32, returned: u32 },
}

/// The clipboard step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardStep {
    /// No clipboard is available on this platform.
    Unavailable,
    Open,
    Empty,
    Allocate,
    Lock,
    SetData,
}

impl fmt::Display for ClipboardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ClipboardStep::Unavailable => "no clipboard available",
            ClipboardStep::Open => "could not open clipboard",
            ClipboardStep::Empty => "could not empty clipboard",
            ClipboardStep::Allocate => "could not allocate clipboard memory",
            ClipboardStep::Lock => "could not lock clipboard memory",
            ClipboardStep::SetData => "could not set clipboard data",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Error)]
pub enum OemKeyError {
    /// A platform size query or fetch returned zero or a mismatched size.
    #[error("{}", query_message(.call, .reason))]
    QueryFailed {
        call: &'static str,
        reason: QueryFailure,
    },

    /// The provider reported its tables but the wanted one is absent.
    #[error("{} table not found in {provider} firmware tables", table_name(.signature))]
    NotFound {
        provider: TableProvider,
        signature: Signature,
    },

    /// The table is too short for the headers or the key it declares.
    #[error("{signature} table is malformed: {needed} bytes required, {actual} available")]
    MalformedTable {
        signature: Signature,
        needed: usize,
        actual: usize,
    },

    #[error("clipboard transfer failed: {step}")]
    ClipboardFailed { step: ClipboardStep },

    #[error("key has no text to display")]
    TextConversionFailed,

    /// No presenter in the chain could show a notice.
    #[error("could not display a notice to the user")]
    PresentationFailed,

    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl OemKeyError {
    /// Returns true if the run cannot continue after this error.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            OemKeyError::ClipboardFailed { .. } | OemKeyError::TextConversionFailed
        )
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        if self.is_fatal() {
            1
        } else {
            0
        }
    }
}

fn query_message(call: &str, reason: &QueryFailure) -> String {
    match reason {
        QueryFailure::ZeroSize => format!("{call} failed to return a size"),
        QueryFailure::SizeMismatch { declared, returned } => {
            format!("{call} failed: returned {returned} bytes, expected {declared}")
        }
    }
}

fn table_name(signature: &Signature) -> String {
    if *signature == Signature::MSDM {
        "Microsoft Licensing".to_string()
    } else {
        signature.to_string()
    }
}
