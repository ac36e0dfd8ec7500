//! Error types reported by the CAS engine.
//!
//! None of these errors abort a whole compile: they are handed to the
//! compiler's error hook (see [`crate::cas_compile::Compiler::on_error`]),
//! logged, and processing continues with whatever result is available.

use thiserror::Error;

/// Errors that can occur while parsing a sheet or applying it to a document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CasError {
    /// `parse` was given an empty sheet. Nothing is produced for that call.
    #[error("no CAS source was given to parse")]
    EmptyInput,

    /// `on_error` was given no handler. The previous handler stays installed.
    #[error("error handler must be a callable function")]
    InvalidErrorHandler,

    /// The host could not interpret a selector. Only the declaration that
    /// carries it is skipped.
    #[error("invalid selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },
}

impl CasError {
    pub(crate) fn invalid_selector(selector: &str, reason: impl Into<String>) -> Self {
        CasError::InvalidSelector {
            selector: selector.to_string(),
            reason: reason.into(),
        }
    }
}

/// Callback invoked for every reported [`CasError`].
pub type ErrorHandler = Box<dyn Fn(&CasError) + Send + Sync>;
