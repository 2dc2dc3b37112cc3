pub mod config;
pub mod content;
pub mod error;
pub mod i18n;
pub mod report;
pub mod retry;
pub mod sync;
pub mod translation;

pub use config::Config;
pub use error::{ItemError, SyncError, TranslateError};
pub use report::{ItemOutcome, SyncReport};
pub use sync::{run, translate_file};
pub use translation::{ChatTranslator, SegmentRequest, Translator};
