//! Structural validation of translated Markdown.
//!
//! Translation is done by a language model asked to keep Markdown syntax
//! intact. This module checks that it did: headings, list items and link
//! targets should survive one-to-one. Findings are warnings; the translation
//! is still written.

use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationReport {
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

pub struct StructureValidator;

static HEADING_REGEX: OnceLock<Regex> = OnceLock::new();
static LIST_ITEM_REGEX: OnceLock<Regex> = OnceLock::new();
static LINK_TARGET_REGEX: OnceLock<Regex> = OnceLock::new();
static URL_REGEX: OnceLock<Regex> = OnceLock::new();

impl StructureValidator {
    /// Compare a source prose chunk with its translation.
    pub fn validate(original: &str, translated: &str) -> ValidationReport {
        let mut report = ValidationReport::default();

        let orig_headings = Self::heading_levels(original);
        let trans_headings = Self::heading_levels(translated);
        if orig_headings != trans_headings {
            report.warnings.push(format!(
                "Heading mismatch: original has levels {:?}, translation has {:?}",
                orig_headings, trans_headings
            ));
        }

        let orig_items = Self::count_list_items(original);
        let trans_items = Self::count_list_items(translated);
        if orig_items != trans_items {
            report.warnings.push(format!(
                "List item count mismatch: original has {}, translation has {}",
                orig_items, trans_items
            ));
        }

        let orig_links = Self::extract_link_targets(original);
        let trans_links = Self::extract_link_targets(translated);
        if orig_links != trans_links {
            report.warnings.push(format!(
                "Link target mismatch: original has {:?}, translation has {:?}",
                orig_links, trans_links
            ));
        }

        let orig_urls = Self::extract_urls(original);
        let trans_urls = Self::extract_urls(translated);
        if orig_urls != trans_urls {
            report.warnings.push(format!(
                "URL mismatch: original has {} URLs, translation has {} URLs",
                orig_urls.len(),
                trans_urls.len()
            ));
        }

        report
    }

    /// ATX heading levels in document order
    fn heading_levels(text: &str) -> Vec<usize> {
        let regex = HEADING_REGEX.get_or_init(|| Regex::new(r"(?m)^ {0,3}(#{1,6})(?:[ \t]|$)").unwrap());

        regex
            .captures_iter(text)
            .filter_map(|cap| cap.get(1).map(|m| m.as_str().len()))
            .collect()
    }

    fn count_list_items(text: &str) -> usize {
        let regex = LIST_ITEM_REGEX
            .get_or_init(|| Regex::new(r"(?m)^[ \t]*(?:[-*+]|\d{1,9}[.)])[ \t]+\S").unwrap());

        regex.find_iter(text).count()
    }

    /// Targets of inline Markdown links and images
    fn extract_link_targets(text: &str) -> Vec<String> {
        let regex =
            LINK_TARGET_REGEX.get_or_init(|| Regex::new(r"\]\(([^)\s]+)(?:\s+[^)]*)?\)").unwrap());

        regex
            .captures_iter(text)
            .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
            .collect()
    }

    fn extract_urls(text: &str) -> Vec<String> {
        let regex = URL_REGEX.get_or_init(|| Regex::new(r"https?://[^\s)\]>]+").unwrap());

        regex
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect()
    }
}
