//! The suffix convention mapping content files to language-neutral
//! relative paths and back.
//!
//! ```text
//! <primary_root>/posts/welcome.md             -> posts/welcome.md (primary)
//! <secondary_root>/posts/welcome.zh-cn.md     -> posts/welcome.md (secondary)
//! ```

use crate::error::PathConventionError;
use crate::i18n::Language;
use std::path::{Path, PathBuf};

const EXTENSION: &str = "md";

/// Layout of the two language trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathConvention {
    pub primary: Language,
    pub secondary: Language,
    pub primary_root: PathBuf,
    pub secondary_root: PathBuf,
    /// Marker inserted before `.md` in secondary file names, without dots
    pub suffix: String,
}

impl PathConvention {
    pub fn root(&self, language: Language) -> &Path {
        if language == self.primary {
            &self.primary_root
        } else {
            &self.secondary_root
        }
    }

    /// The other language of the pair.
    pub fn counterpart(&self, language: Language) -> Language {
        if language == self.primary {
            self.secondary
        } else {
            self.primary
        }
    }

    fn secondary_ending(&self) -> String {
        format!(".{}.{}", self.suffix, EXTENSION)
    }

    /// Compute the relative path of a file given as a path under the root of
    /// `language`.
    pub fn relative_path(
        &self,
        language: Language,
        under_root: &Path,
    ) -> Result<PathBuf, PathConventionError> {
        let file_name = under_root
            .file_name()
            .ok_or(PathConventionError::NotMarkdown)?
            .to_str()
            .ok_or(PathConventionError::NonUtf8)?;

        if Path::new(file_name).extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
            return Err(PathConventionError::NotMarkdown);
        }

        let ending = self.secondary_ending();
        let has_suffix = file_name.len() > ending.len() && file_name.ends_with(&ending);

        let neutral_name = if language == self.primary {
            if has_suffix {
                return Err(PathConventionError::UnexpectedSuffix(self.suffix.clone()));
            }
            file_name.to_string()
        } else {
            if !has_suffix {
                return Err(PathConventionError::MissingSuffix(self.suffix.clone()));
            }
            let stem = &file_name[..file_name.len() - ending.len()];
            format!("{}.{}", stem, EXTENSION)
        };

        Ok(under_root.with_file_name(neutral_name))
    }

    /// Classify an on-disk path under one of the two roots.
    pub fn classify(&self, path: &Path) -> Result<(Language, PathBuf), PathConventionError> {
        // The longer root wins so nested layouts resolve to the inner tree.
        let mut roots = [
            (self.primary, &self.primary_root),
            (self.secondary, &self.secondary_root),
        ];
        roots.sort_by_key(|(_, root)| std::cmp::Reverse(root.components().count()));

        for (language, root) in roots {
            if let Ok(under_root) = path.strip_prefix(root) {
                let relative = self.relative_path(language, under_root)?;
                return Ok((language, relative));
            }
        }
        Err(PathConventionError::OutsideRoot(format!(
            "{} or {}",
            self.primary, self.secondary
        )))
    }

    /// File path of `relative` in the tree of `language`.
    pub fn item_path(&self, language: Language, relative: &Path) -> PathBuf {
        let root = self.root(language);
        if language == self.primary {
            return root.join(relative);
        }
        let stem = relative
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        root.join(relative.with_file_name(format!("{}.{}.{}", stem, self.suffix, EXTENSION)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn convention() -> PathConvention {
        PathConvention {
            primary: Language::ENGLISH,
            secondary: Language::SIMPLIFIED_CHINESE,
            primary_root: PathBuf::from("content/en"),
            secondary_root: PathBuf::from("content/zh-cn"),
            suffix: "zh-cn".to_string(),
        }
    }

    // ==================== relative_path Tests ====================

    #[test]
    fn test_primary_file_keeps_name() {
        let rel = convention()
            .relative_path(Language::ENGLISH, Path::new("posts/welcome.md"))
            .unwrap();
        assert_eq!(rel, PathBuf::from("posts/welcome.md"));
    }

    #[test]
    fn test_secondary_suffix_is_stripped() {
        let rel = convention()
            .relative_path(Language::SIMPLIFIED_CHINESE, Path::new("posts/welcome.zh-cn.md"))
            .unwrap();
        assert_eq!(rel, PathBuf::from("posts/welcome.md"));
    }

    #[test]
    fn test_primary_with_suffix_is_rejected() {
        let err = convention()
            .relative_path(Language::ENGLISH, Path::new("posts/welcome.zh-cn.md"))
            .unwrap_err();
        assert_eq!(err, PathConventionError::UnexpectedSuffix("zh-cn".to_string()));
    }

    #[test]
    fn test_secondary_without_suffix_is_rejected() {
        let err = convention()
            .relative_path(Language::SIMPLIFIED_CHINESE, Path::new("posts/我的文章.md"))
            .unwrap_err();
        assert_eq!(err, PathConventionError::MissingSuffix("zh-cn".to_string()));
    }

    #[test]
    fn test_bare_suffix_file_is_rejected() {
        // ".zh-cn.md" has no stem left after stripping
        let err = convention()
            .relative_path(Language::SIMPLIFIED_CHINESE, Path::new(".zh-cn.md"))
            .unwrap_err();
        assert_eq!(err, PathConventionError::MissingSuffix("zh-cn".to_string()));
    }

    #[test]
    fn test_non_markdown_is_rejected() {
        let err = convention()
            .relative_path(Language::ENGLISH, Path::new("images/cover.png"))
            .unwrap_err();
        assert_eq!(err, PathConventionError::NotMarkdown);
    }

    // ==================== item_path Tests ====================

    #[test]
    fn test_item_path_secondary() {
        let path = convention().item_path(Language::SIMPLIFIED_CHINESE, Path::new("posts/welcome.md"));
        assert_eq!(path, PathBuf::from("content/zh-cn/posts/welcome.zh-cn.md"));
    }

    #[test]
    fn test_item_path_primary() {
        let path = convention().item_path(Language::ENGLISH, Path::new("posts/welcome.md"));
        assert_eq!(path, PathBuf::from("content/en/posts/welcome.md"));
    }

    // ==================== classify Tests ====================

    #[test]
    fn test_classify_secondary_file() {
        let (lang, rel) = convention()
            .classify(Path::new("content/zh-cn/posts/welcome.zh-cn.md"))
            .unwrap();
        assert_eq!(lang, Language::SIMPLIFIED_CHINESE);
        assert_eq!(rel, PathBuf::from("posts/welcome.md"));
    }

    #[test]
    fn test_classify_outside_roots() {
        assert!(matches!(
            convention().classify(Path::new("static/readme.md")),
            Err(PathConventionError::OutsideRoot(_))
        ));
    }

    #[test]
    fn test_counterpart() {
        let c = convention();
        assert_eq!(c.counterpart(Language::ENGLISH), Language::SIMPLIFIED_CHINESE);
        assert_eq!(c.counterpart(Language::SIMPLIFIED_CHINESE), Language::ENGLISH);
    }

    // ==================== Round-Trip Properties ====================

    proptest! {
        #[test]
        fn prop_path_mapping_round_trip(
            dirs in proptest::collection::vec("[a-z0-9_-]{1,8}", 0..3),
            stem in "[a-zA-Z0-9_-]{1,12}",
        ) {
            let c = convention();
            let mut relative = PathBuf::new();
            for d in &dirs {
                relative.push(d);
            }
            relative.push(format!("{}.md", stem));

            for language in [Language::ENGLISH, Language::SIMPLIFIED_CHINESE] {
                let generated = c.item_path(language, &relative);
                let (classified, back) = c.classify(&generated).unwrap();
                prop_assert_eq!(classified, language);
                prop_assert_eq!(&back, &relative);

                // re-suffixing for the opposite language points at the source
                let other = c.counterpart(language);
                let source = c.item_path(other, &back);
                prop_assert_eq!(c.classify(&source).unwrap().1, relative.clone());
            }
        }
    }
}
