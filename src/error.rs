//! Error taxonomy for the synchronizer.
//!
//! Per-item errors never escape [`crate::sync::run`]; they are folded into the
//! report. Only [`SyncError`] aborts a run.

use crate::report::SyncReport;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Machine-readable failure kinds reported by the remote translation service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    #[error("rate limited by translation service")]
    RateLimited,

    #[error("translation service rejected credentials ({status})")]
    AuthFailure { status: u16 },

    #[error("translation service rejected input ({status}): {message}")]
    MalformedInput { status: u16, message: String },

    #[error("translation service error ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("translation request timed out after {0:?}")]
    Timeout(Duration),

    #[error("translation service unreachable: {0}")]
    Unreachable(String),

    #[error("malformed translation response: {0}")]
    MalformedResponse(String),
}

impl TranslateError {
    /// 429, 5xx, timeouts and transport errors are worth another attempt.
    /// Auth and input errors will fail the same way every time.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TranslateError::RateLimited
                | TranslateError::ServerError { .. }
                | TranslateError::Timeout(_)
                | TranslateError::Unreachable(_)
        )
    }

    /// Errors that mean no item in this run can possibly succeed.
    pub fn is_configuration_fatal(&self) -> bool {
        matches!(self, TranslateError::AuthFailure { .. })
    }
}

/// Front matter that cannot be translated safely.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrontMatterError {
    #[error("front matter block is not terminated")]
    Unterminated,

    #[error("front matter is not valid YAML: {0}")]
    InvalidYaml(String),

    #[error("front matter must be a mapping of keys to values")]
    NotAMapping,

    #[error("front matter key must be a string, found {0}")]
    NonStringKey(String),

    #[error("front matter field `{key}` must be {expected}")]
    WrongType { key: String, expected: &'static str },

    #[error("front matter field `date` is not a timestamp: {0}")]
    InvalidDate(String),

    #[error("failed to render front matter: {0}")]
    Render(String),
}

/// Why a file under a language root does not follow the naming convention.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathConventionError {
    #[error("file name is not valid UTF-8")]
    NonUtf8,

    #[error("primary-language file must not carry the `.{0}` suffix")]
    UnexpectedSuffix(String),

    #[error("translated file must end in `.{0}.md`")]
    MissingSuffix(String),

    #[error("path is outside the {0} content root")]
    OutsideRoot(String),

    #[error("not a markdown file")]
    NotMarkdown,
}

/// Outcome-shaping failure of a single content item.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("language undetermined: {0}")]
    UndeterminedLanguage(String),

    #[error("translation failed: {0}")]
    TranslationFailure(#[from] TranslateError),

    #[error("target already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("malformed front matter: {0}")]
    MalformedFrontMatter(#[from] FrontMatterError),

    #[error("cancelled before the translation was written")]
    Cancelled,

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Run-level failure.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Detected before any item was attempted; nothing was written.
    #[error("configuration error: {0}")]
    ConfigurationFatal(String),

    /// The service refused or could not be reached mid-run. `partial` holds
    /// the outcome of every item, including those already written.
    #[error("run aborted: {reason}")]
    Aborted {
        reason: String,
        partial: Box<SyncReport>,
    },
}

impl SyncError {
    /// Outcomes gathered before the run stopped, if it got that far.
    pub fn partial_report(&self) -> Option<&SyncReport> {
        match self {
            SyncError::ConfigurationFatal(_) => None,
            SyncError::Aborted { partial, .. } => Some(&**partial),
        }
    }
}
