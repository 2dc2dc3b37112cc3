//! Body-text language identification.
//!
//! Counts words per writing system after removing everything that is not
//! prose (code, URLs, HTML tags) and picks the language whose script
//! dominates. A run of Latin letters counts as one word and so does each Han
//! character, so English product names inside Chinese prose weigh as much as
//! a word each rather than one per letter. The detector fails closed: short
//! or mixed text yields [`Detection::Undetermined`] instead of a guess.

use crate::content::markdown::code_ranges;
use crate::i18n::{Language, Script};
use regex::Regex;
use std::sync::OnceLock;

static URL_REGEX: OnceLock<Regex> = OnceLock::new();
static HTML_TAG_REGEX: OnceLock<Regex> = OnceLock::new();

/// Thresholds below which detection refuses to answer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorConfig {
    /// Minimum number of letters (any candidate script) required
    pub min_letters: usize,
    /// Minimum share of words in the dominant script, in `0.0..=1.0`
    pub min_confidence: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_letters: 4,
            min_confidence: 0.6,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    Detected {
        language: Language,
        confidence: f64,
    },
    Undetermined {
        reason: String,
    },
}

/// Detector restricted to the languages of one synchronized pair.
#[derive(Debug, Clone)]
pub struct LanguageDetector {
    candidates: Vec<Language>,
    config: DetectorConfig,
}

impl LanguageDetector {
    pub fn new(candidates: &[Language], config: DetectorConfig) -> Self {
        Self {
            candidates: candidates.to_vec(),
            config,
        }
    }

    /// Identify the language of a Markdown body. Front matter must already be
    /// removed.
    pub fn detect(&self, body: &str) -> Detection {
        let prose = strip_non_prose(body);

        let mut latin_letters = 0usize;
        let mut latin_words = 0usize;
        let mut han = 0usize;
        let mut in_word = false;
        for c in prose.chars() {
            match script_of(c) {
                Some(Script::Latin) => {
                    latin_letters += 1;
                    if !in_word {
                        latin_words += 1;
                        in_word = true;
                    }
                }
                Some(Script::Han) => {
                    han += 1;
                    in_word = false;
                }
                None => in_word = false,
            }
        }

        let letters = latin_letters + han;
        if letters < self.config.min_letters {
            return Detection::Undetermined {
                reason: format!(
                    "text too short ({} letters, need {})",
                    letters, self.config.min_letters
                ),
            };
        }

        let total = (latin_words + han) as f64;
        let (script, score) = if han > latin_words {
            (Script::Han, han as f64)
        } else {
            (Script::Latin, latin_words as f64)
        };
        let confidence = score / total;

        if confidence < self.config.min_confidence {
            return Detection::Undetermined {
                reason: format!(
                    "mixed scripts (confidence {:.2} below {:.2})",
                    confidence, self.config.min_confidence
                ),
            };
        }

        match self.candidates.iter().find(|lang| lang.script() == script) {
            Some(language) => Detection::Detected {
                language: *language,
                confidence,
            },
            None => Detection::Undetermined {
                reason: format!("{:?} script matches no configured language", script),
            },
        }
    }
}

fn script_of(c: char) -> Option<Script> {
    match c as u32 {
        0x4E00..=0x9FFF | 0x3400..=0x4DBF | 0xF900..=0xFAFF | 0x20000..=0x2A6DF => {
            Some(Script::Han)
        }
        0x41..=0x5A | 0x61..=0x7A => Some(Script::Latin),
        0xC0..=0x24F if c.is_alphabetic() => Some(Script::Latin),
        _ => None,
    }
}

/// Drop code blocks, inline code, URLs and HTML tags.
fn strip_non_prose(body: &str) -> String {
    let url = URL_REGEX.get_or_init(|| Regex::new(r"(?:https?|ftp)://[^\s)\]>]+").unwrap());
    let html = HTML_TAG_REGEX.get_or_init(|| Regex::new(r"</?[A-Za-z][^>]*>").unwrap());

    let code = code_ranges(body);
    let mut ranges: Vec<_> = code.blocks.into_iter().chain(code.spans).collect();
    ranges.sort_by_key(|range| range.start);

    let mut prose = String::with_capacity(body.len());
    let mut cursor = 0;
    for range in ranges {
        if range.start < cursor {
            continue;
        }
        prose.push_str(&body[cursor..range.start]);
        prose.push(' ');
        cursor = range.end;
    }
    prose.push_str(&body[cursor..]);

    let prose = url.replace_all(&prose, " ");
    html.replace_all(&prose, " ").into_owned()
}
