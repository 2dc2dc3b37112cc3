//! Markdown body segmentation.
//!
//! Code blocks (fenced or indented, at any nesting depth) are never sent for
//! translation. Everything between them is prose, handed to the translator
//! whole so headings, lists and links keep their surrounding syntax. Inline
//! code spans inside prose are swapped for placeholders before sending and
//! swapped back afterwards.

use pulldown_cmark::{Event, Options, Parser, Tag};
use std::ops::Range;

/// A slice of the body, in document order. Concatenating all segments
/// reproduces the input byte for byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Prose(&'a str),
    Verbatim(&'a str),
}

/// Byte ranges of code in a Markdown text, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeRanges {
    /// Fenced and indented code blocks
    pub blocks: Vec<Range<usize>>,
    /// Inline code spans, delimiting backticks included
    pub spans: Vec<Range<usize>>,
}

fn parser_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
}

/// Locate every code block and inline code span in `markdown`.
pub fn code_ranges(markdown: &str) -> CodeRanges {
    let mut ranges = CodeRanges::default();
    for (event, range) in Parser::new_ext(markdown, parser_options()).into_offset_iter() {
        match event {
            Event::Start(Tag::CodeBlock(_)) if !range.is_empty() => ranges.blocks.push(range),
            Event::Code(_) => ranges.spans.push(range),
            _ => {}
        }
    }
    ranges
}

/// Split a body into prose and verbatim (code block) segments.
///
/// An unterminated fence runs to the end of the document.
pub fn split_segments(body: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut cursor = 0;

    for block in code_ranges(body).blocks {
        if block.start < cursor {
            continue;
        }
        if block.start > cursor {
            segments.push(Segment::Prose(&body[cursor..block.start]));
        }
        segments.push(Segment::Verbatim(&body[block.start..block.end]));
        cursor = block.end;
    }

    if cursor < body.len() {
        segments.push(Segment::Prose(&body[cursor..]));
    }
    segments
}

/// Prose with inline code spans replaced by placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskedProse {
    pub text: String,
    spans: Vec<String>,
}

fn placeholder(index: usize) -> String {
    format!("⟦{}⟧", index)
}

/// Replace each inline code span with a numbered placeholder.
pub fn mask_inline_code(prose: &str) -> MaskedProse {
    let mut text = String::with_capacity(prose.len());
    let mut spans = Vec::new();
    let mut cursor = 0;

    for span in code_ranges(prose).spans {
        if span.start < cursor {
            continue;
        }
        text.push_str(&prose[cursor..span.start]);
        text.push_str(&placeholder(spans.len()));
        spans.push(prose[span.start..span.end].to_string());
        cursor = span.end;
    }
    text.push_str(&prose[cursor..]);

    MaskedProse { text, spans }
}

impl MaskedProse {
    /// Whether anything but placeholders and punctuation is left to translate.
    pub fn is_translatable(&self) -> bool {
        let mut text = self.text.clone();
        for index in 0..self.spans.len() {
            text = text.replace(&placeholder(index), " ");
        }
        has_translatable_text(&text)
    }

    /// Put the original code spans back into translated text.
    ///
    /// Fails with a description when a placeholder was dropped or duplicated
    /// by the translator.
    pub fn restore(&self, translated: &str) -> Result<String, String> {
        let mut restored = translated.to_string();
        for (index, span) in self.spans.iter().enumerate() {
            let token = placeholder(index);
            match restored.matches(&token).count() {
                1 => restored = restored.replacen(&token, span, 1),
                0 => return Err(format!("inline code placeholder {} was lost", token)),
                n => {
                    return Err(format!(
                        "inline code placeholder {} appears {} times",
                        token, n
                    ))
                }
            }
        }
        Ok(restored)
    }
}

/// Split a prose chunk into (leading whitespace, core, trailing whitespace).
pub fn trim_parts(prose: &str) -> (&str, &str, &str) {
    let core_start = prose.len() - prose.trim_start().len();
    let core_end = prose.trim_end().len();
    if core_end <= core_start {
        return (prose, "", "");
    }
    (
        &prose[..core_start],
        &prose[core_start..core_end],
        &prose[core_end..],
    )
}

/// Whether a prose chunk contains anything worth translating.
pub fn has_translatable_text(prose: &str) -> bool {
    prose.chars().any(|c| c.is_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn joined(segments: &[Segment<'_>]) -> String {
        segments
            .iter()
            .map(|s| match s {
                Segment::Prose(text) | Segment::Verbatim(text) => *text,
            })
            .collect()
    }

    fn prose(segments: &[Segment<'_>]) -> String {
        segments
            .iter()
            .filter_map(|s| match s {
                Segment::Prose(text) => Some(*text),
                Segment::Verbatim(_) => None,
            })
            .collect()
    }

    fn verbatim<'a>(segments: &[Segment<'a>]) -> Vec<&'a str> {
        segments
            .iter()
            .filter_map(|s| match s {
                Segment::Verbatim(text) => Some(*text),
                Segment::Prose(_) => None,
            })
            .collect()
    }

    // ==================== Segmentation Tests ====================

    #[test]
    fn test_plain_prose_is_one_segment() {
        let body = "# Hi\n\nText.\n";
        assert_eq!(split_segments(body), vec![Segment::Prose(body)]);
    }

    #[test]
    fn test_backtick_fence_is_verbatim() {
        let body = "Intro\n\n```rust\nfn main() {}\n```\n\nOutro\n";
        let segments = split_segments(body);

        let code = verbatim(&segments);
        assert_eq!(code.len(), 1);
        assert!(code[0].starts_with("```rust\nfn main() {}\n```"));
        assert!(prose(&segments).contains("Intro"));
        assert!(prose(&segments).contains("Outro"));
        assert!(!prose(&segments).contains("fn main"));
        assert_eq!(joined(&segments), body);
    }

    #[test]
    fn test_tilde_fence_in_list_item_is_verbatim() {
        let body = "Steps to follow here:\n\n10. Configure it:\n\n    ~~~toml\n    name = \"cargo thing\"\n    ~~~\n";
        let segments = split_segments(body);

        assert!(verbatim(&segments)
            .iter()
            .any(|code| code.contains("name = \"cargo thing\"")));
        assert!(!prose(&segments).contains("cargo"));
        assert!(prose(&segments).contains("Configure it:"));
        assert_eq!(joined(&segments), body);
    }

    #[test]
    fn test_fence_in_blockquote_is_verbatim() {
        let body = "> Note:\n>\n> ~~~\n> rm -rf build\n> ~~~\n\nAfter.\n";
        let segments = split_segments(body);

        assert!(verbatim(&segments).iter().any(|code| code.contains("rm -rf build")));
        assert!(!prose(&segments).contains("rm -rf"));
        assert!(prose(&segments).contains("After."));
        assert_eq!(joined(&segments), body);
    }

    #[test]
    fn test_indented_code_block_is_verbatim() {
        let body = "Run this:\n\n    cargo install --path .\n\nDone.\n";
        let segments = split_segments(body);

        assert!(verbatim(&segments)
            .iter()
            .any(|code| code.contains("cargo install --path .")));
        assert!(!prose(&segments).contains("cargo install"));
        assert_eq!(joined(&segments), body);
    }

    #[test]
    fn test_shorter_closing_run_does_not_close() {
        let body = "````\n```\ninner\n```\n````\n";
        let segments = split_segments(body);
        assert_eq!(verbatim(&segments).len(), 1);
        assert!(!prose(&segments).contains("inner"));
        assert_eq!(joined(&segments), body);
    }

    #[test]
    fn test_unterminated_fence_runs_to_end() {
        let body = "text\n\n```\ncode without end";
        let segments = split_segments(body);
        match segments.last() {
            Some(Segment::Verbatim(code)) => assert!(code.ends_with("code without end")),
            other => panic!("expected trailing code block, got {:?}", other),
        }
        assert_eq!(joined(&segments), body);
    }

    #[test]
    fn test_crlf_lines() {
        let body = "a\r\n\r\n```\r\ncode\r\n```\r\nb\r\n";
        let segments = split_segments(body);
        assert!(verbatim(&segments).iter().any(|code| code.contains("code")));
        assert_eq!(joined(&segments), body);
    }

    #[test]
    fn test_empty_body() {
        assert!(split_segments("").is_empty());
    }

    // ==================== Inline Code Tests ====================

    #[test]
    fn test_mask_and_restore_inline_code() {
        let masked = mask_inline_code("Run `cargo build` then ``a`b``.");
        assert_eq!(masked.text, "Run ⟦0⟧ then ⟦1⟧.");
        let restored = masked.restore("运行 ⟦0⟧ 然后 ⟦1⟧。").unwrap();
        assert_eq!(restored, "运行 `cargo build` 然后 ``a`b``。");
    }

    #[test]
    fn test_code_only_prose_is_not_translatable() {
        assert!(!mask_inline_code("`make build`.").is_translatable());
        assert!(mask_inline_code("Run `make`.").is_translatable());
    }

    #[test]
    fn test_unmatched_backtick_is_literal() {
        let masked = mask_inline_code("a ` lone tick");
        assert_eq!(masked.text, "a ` lone tick");
        assert_eq!(masked.restore("一个 ` 反引号").unwrap(), "一个 ` 反引号");
    }

    #[test]
    fn test_restore_detects_lost_placeholder() {
        let masked = mask_inline_code("Use `x`.");
        let err = masked.restore("使用。").unwrap_err();
        assert!(err.contains("lost"));
    }

    #[test]
    fn test_restore_detects_duplicated_placeholder() {
        let masked = mask_inline_code("Use `x`.");
        assert!(masked.restore("⟦0⟧ ⟦0⟧").is_err());
    }

    #[test]
    fn test_code_ranges_cover_blocks_and_spans() {
        let body = "Use `x` here.\n\n```\ny\n```\n";
        let ranges = code_ranges(body);
        assert_eq!(ranges.spans.len(), 1);
        assert_eq!(&body[ranges.spans[0].clone()], "`x`");
        assert_eq!(ranges.blocks.len(), 1);
        assert!(body[ranges.blocks[0].clone()].contains("y"));
    }

    // ==================== Whitespace Tests ====================

    #[test]
    fn test_trim_parts() {
        assert_eq!(trim_parts("\n\nHello\n"), ("\n\n", "Hello", "\n"));
        assert_eq!(trim_parts("  \n"), ("  \n", "", ""));
    }

    #[test]
    fn test_has_translatable_text() {
        assert!(has_translatable_text("Hi"));
        assert!(has_translatable_text("你好"));
        assert!(!has_translatable_text("---\n* * *\n"));
    }

    // ==================== Properties ====================

    proptest! {
        #[test]
        fn prop_segments_reassemble_input(body in "[a-z`~ \n#*>\\-1.\\[\\]()]{0,200}") {
            let segments = split_segments(&body);
            prop_assert_eq!(joined(&segments), body);
        }

        #[test]
        fn prop_fenced_block_survives_intact(
            before in "[a-zA-Z .\n]{0,40}",
            code in "[a-zA-Z0-9=;{}()][a-zA-Z0-9 =;{}()]{0,40}",
        ) {
            let block = format!("```\n{}\n```", code);
            let body = format!("{}\n\n{}\n", before, block);
            let segments = split_segments(&body);
            prop_assert!(verbatim(&segments).iter().any(|v| v.contains(&block)));
            prop_assert_eq!(joined(&segments), body);
        }
    }
}
