//! Language type: a validated handle into the registry.

use crate::i18n::registry::{LanguageConfig, LanguageRegistry, Script};
use anyhow::{bail, Result};
use std::fmt;

/// A supported language.
///
/// Only constructible from the registry, so every `Language` has a config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Language {
    code: &'static str,
}

impl Language {
    pub const ENGLISH: Language = Language { code: "en" };

    pub const SIMPLIFIED_CHINESE: Language = Language { code: "zh-cn" };

    /// Create a Language from a code or alias.
    ///
    /// # Example
    /// ```ignore
    /// let zh = Language::from_code("zh")?;
    /// assert_eq!(zh.code(), "zh-cn");
    /// ```
    pub fn from_code(code: &str) -> Result<Language> {
        match LanguageRegistry::get_by_code(code) {
            Some(config) => Ok(Language { code: config.code }),
            None => {
                let supported: Vec<&str> =
                    LanguageRegistry::list_all().iter().map(|l| l.code).collect();
                bail!(
                    "Unknown language code: '{}' (supported: {})",
                    code,
                    supported.join(", ")
                )
            }
        }
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Full registry entry for this language.
    ///
    /// # Panics
    /// Never in practice: a `Language` can only be built from a registry code.
    pub fn config(&self) -> &'static LanguageConfig {
        LanguageRegistry::get_by_code(self.code).expect("Language code should always be valid")
    }

    /// English name of the language, as used in prompts.
    pub fn name(&self) -> &'static str {
        self.config().name
    }

    pub fn native_name(&self) -> &'static str {
        self.config().native_name
    }

    pub fn script(&self) -> Script {
        self.config().script
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code)
    }
}
