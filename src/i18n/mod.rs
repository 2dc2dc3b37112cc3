//! Language support: the registry of content languages, body-text language
//! detection, and structural checks on translated Markdown.
//!
//! - `registry`: fixed table of supported languages and their scripts
//! - `language`: type-safe `Language` handle validated against the registry
//! - `detect`: fail-closed script-frequency language identification
//! - `validator`: compares source and translated Markdown structure

mod detect;
mod language;
mod registry;
mod validator;

pub use detect::{Detection, DetectorConfig, LanguageDetector};
pub use language::Language;
pub use registry::{LanguageConfig, LanguageRegistry, Script};
pub use validator::{StructureValidator, ValidationReport};
