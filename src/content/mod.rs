//! On-disk content: front matter, Markdown bodies, and the file naming
//! convention that pairs the two language trees.

pub mod front_matter;
pub mod markdown;
pub mod paths;

pub use front_matter::{Document, Field, FrontMatter, Timestamp};
pub use paths::PathConvention;
