//! Language registry: the fixed table of languages the content trees may use.
//!
//! The table is immutable data, not runtime state. Which two of these
//! languages a run synchronizes is decided by [`crate::config::Config`].

/// Writing system a language's prose is dominated by.
///
/// Detection works on script statistics, so two languages sharing a script
/// cannot be told apart and must not be configured as a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Script {
    Latin,
    Han,
}

/// Configuration for a supported language.
#[derive(Debug, Clone)]
pub struct LanguageConfig {
    /// Code used for the content directory and file suffix (e.g. "en", "zh-cn")
    pub code: &'static str,

    /// English name, used in translation prompts
    pub name: &'static str,

    /// Native name of the language
    pub native_name: &'static str,

    /// Additional codes accepted on the command line and in env vars
    pub aliases: &'static [&'static str],

    /// Script used by language detection
    pub script: Script,
}

static LANGUAGES: &[LanguageConfig] = &[
    LanguageConfig {
        code: "en",
        name: "English",
        native_name: "English",
        aliases: &["en-us", "english"],
        script: Script::Latin,
    },
    LanguageConfig {
        code: "zh-cn",
        name: "Simplified Chinese",
        native_name: "简体中文",
        aliases: &["zh", "zh-hans", "zh_cn"],
        script: Script::Han,
    },
];

/// Read-only view over the supported languages.
#[derive(Debug, Clone, Copy)]
pub struct LanguageRegistry;

impl LanguageRegistry {
    /// Look up a language by its code or one of its aliases (case-insensitive).
    pub fn get_by_code(code: &str) -> Option<&'static LanguageConfig> {
        let code = code.trim().to_ascii_lowercase();
        LANGUAGES
            .iter()
            .find(|lang| lang.code == code || lang.aliases.contains(&code.as_str()))
    }

    /// All supported languages, in table order.
    pub fn list_all() -> &'static [LanguageConfig] {
        LANGUAGES
    }
}
