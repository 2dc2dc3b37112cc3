//! The translation synchronizer.
//!
//! A run is five stages with plain data between them:
//!
//! ```text
//! discover_items -> Inventory -> plan_sync -> [PendingPair]
//!     -> for each pair: detect_language, translate_item, write_item -> SyncReport
//! ```
//!
//! Per-item failures end up in the report. Invalid configuration stops a run
//! before anything is attempted. Credentials the service rejects stop it
//! midway, with the outcomes gathered so far attached to the error.

use crate::config::Config;
use crate::content::front_matter::{Document, Field};
use crate::content::markdown::{
    has_translatable_text, mask_inline_code, split_segments, trim_parts, Segment,
};
use crate::content::paths::PathConvention;
use crate::error::{ItemError, PathConventionError, SyncError, TranslateError};
use crate::i18n::{Detection, Language, LanguageDetector, StructureValidator};
use crate::report::{ItemOutcome, SyncReport};
use crate::retry::{with_retry_if, RetryConfig};
use crate::translation::{SegmentRequest, Translator};
use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

// ==================== Data ====================

/// One Markdown document identified by relative path and language.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentItem {
    pub relative_path: PathBuf,
    pub language: Language,
    pub document: Document,
}

/// A file under a language root that could not be keyed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedPath {
    pub path: PathBuf,
    pub reason: String,
}

/// Which languages exist for every relative path found on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    pub items: BTreeMap<PathBuf, BTreeSet<Language>>,
    pub rejected: Vec<RejectedPath>,
}

/// A relative path present in one language only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPair {
    pub relative_path: PathBuf,
    pub source: Language,
    pub target: Language,
    pub source_path: PathBuf,
    pub target_path: PathBuf,
}

// ==================== Discovery ====================

/// Walk both language trees and key every Markdown file by its relative path.
///
/// Files that break the naming convention are recorded in
/// [`Inventory::rejected`], never fatal. A missing root is an empty tree.
pub fn discover_items(convention: &PathConvention) -> Inventory {
    let mut inventory = Inventory::default();
    for language in [convention.primary, convention.secondary] {
        scan_tree(convention, language, &mut inventory);
    }
    debug!(
        "Discovered {} relative paths, rejected {} files",
        inventory.items.len(),
        inventory.rejected.len()
    );
    inventory
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with('.'))
            .unwrap_or(false)
}

fn scan_tree(convention: &PathConvention, language: Language, inventory: &mut Inventory) {
    let root = convention.root(language);
    // Hugo-style layouts nest the translated tree inside the primary one.
    let other_root = convention.root(convention.counterpart(language));
    if !root.is_dir() {
        warn!("Content root for {} does not exist: {}", language, root.display());
        return;
    }

    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e) && (e.depth() == 0 || e.path() != other_root))
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                warn!("Skipping unreadable entry {}: {}", path.display(), e);
                inventory.rejected.push(RejectedPath {
                    path,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("md") {
            continue;
        }

        let under_root = path.strip_prefix(root).unwrap_or(path);
        match convention.relative_path(language, under_root) {
            Ok(relative) => {
                inventory.items.entry(relative).or_default().insert(language);
            }
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                inventory.rejected.push(RejectedPath {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                });
            }
        }
    }
}

// ==================== Planning ====================

/// Every relative path present in exactly one language, ordered by path.
pub fn plan_sync(inventory: &Inventory, convention: &PathConvention) -> Vec<PendingPair> {
    inventory
        .items
        .iter()
        .filter(|(_, languages)| languages.len() == 1)
        .filter_map(|(relative, languages)| {
            let source = *languages.iter().next()?;
            let target = convention.counterpart(source);
            Some(PendingPair {
                relative_path: relative.clone(),
                source,
                target,
                source_path: convention.item_path(source, relative),
                target_path: convention.item_path(target, relative),
            })
        })
        .collect()
}

// ==================== Detection ====================

/// Language of a body, required to match the tree the file lives in.
///
/// Undetermined text and a mismatch both fail closed: translating in the
/// wrong direction would create a duplicate in the wrong tree.
pub fn detect_language(
    detector: &LanguageDetector,
    body: &str,
    expected: Language,
) -> Result<Language, ItemError> {
    match detector.detect(body) {
        Detection::Detected { language, .. } if language == expected => Ok(language),
        Detection::Detected {
            language,
            confidence,
        } => Err(ItemError::UndeterminedLanguage(format!(
            "body reads as {} (confidence {:.2}) but the file lives in the {} tree",
            language, confidence, expected
        ))),
        Detection::Undetermined { reason } => Err(ItemError::UndeterminedLanguage(reason)),
    }
}

// ==================== Writing ====================

/// Write a translated item to its place in the target tree.
///
/// The content is rendered in memory, written to a temporary file next to
/// the target and moved into place without replacing anything. An existing
/// target is reported as [`ItemError::AlreadyExists`] and left untouched.
///
/// This does blocking filesystem I/O; async callers run it on the blocking
/// thread pool.
pub fn write_item(item: &ContentItem, convention: &PathConvention) -> Result<PathBuf, ItemError> {
    let path = convention.item_path(item.language, &item.relative_path);
    if path.exists() {
        return Err(ItemError::AlreadyExists(path));
    }

    let content = item.document.render()?;
    let io_err = |source: std::io::Error| ItemError::Io {
        path: path.clone(),
        source,
    };

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(io_err)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".translate-sync-")
        .suffix(".tmp")
        .tempfile_in(&dir)
        .map_err(io_err)?;
    tmp.write_all(content.as_bytes()).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;

    match tmp.persist_noclobber(&path) {
        Ok(_) => Ok(path),
        Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
            Err(ItemError::AlreadyExists(path))
        }
        Err(e) => Err(io_err(e.error)),
    }
}

// ==================== Translation ====================

/// Per-run state shared by all items: the translator, policies, and the
/// signals that end a run early.
pub struct Synchronizer<'a, T> {
    convention: PathConvention,
    detector: LanguageDetector,
    translator: &'a T,
    retry: RetryConfig,
    translate_tags: bool,
    cancel: CancellationToken,
    fatal: OnceLock<TranslateError>,
    attempted: AtomicUsize,
    unreachable: AtomicUsize,
}

impl<'a, T: Translator> Synchronizer<'a, T> {
    pub fn new(config: &Config, translator: &'a T, cancel: CancellationToken) -> Self {
        let convention = config.path_convention();
        let detector = LanguageDetector::new(
            &[convention.primary, convention.secondary],
            config.detection,
        );
        Self {
            convention,
            detector,
            translator,
            retry: config.retry.clone(),
            translate_tags: config.translate_tags,
            cancel,
            fatal: OnceLock::new(),
            attempted: AtomicUsize::new(0),
            unreachable: AtomicUsize::new(0),
        }
    }

    async fn translate_text(
        &self,
        text: &str,
        source: Language,
        target: Language,
        what: &str,
    ) -> Result<String, TranslateError> {
        let request = SegmentRequest {
            source,
            target,
            text,
        };
        with_retry_if(
            &self.retry,
            what,
            || self.translator.translate(request),
            |e: &TranslateError| e.is_retryable(),
        )
        .await
    }

    async fn translate_body(
        &self,
        body: &str,
        source: Language,
        target: Language,
        label: &str,
    ) -> Result<String, TranslateError> {
        let mut out = String::with_capacity(body.len() * 2);

        for segment in split_segments(body) {
            let prose = match segment {
                Segment::Verbatim(code) => {
                    out.push_str(code);
                    continue;
                }
                Segment::Prose(prose) => prose,
            };

            let (leading, core, trailing) = trim_parts(prose);
            let masked = mask_inline_code(core);
            if !masked.is_translatable() {
                out.push_str(prose);
                continue;
            }

            let translated = self
                .translate_text(&masked.text, source, target, &format!("{} body", label))
                .await?;
            let restored = masked
                .restore(&translated)
                .map_err(TranslateError::MalformedResponse)?;

            let validation = StructureValidator::validate(core, &restored);
            if !validation.is_clean() {
                warn!(
                    "Translation structure warnings for {}: {:?}",
                    label, validation.warnings
                );
            }

            out.push_str(leading);
            out.push_str(&restored);
            out.push_str(trailing);
        }

        Ok(out)
    }

    /// Produce the counterpart of `item` in `target`.
    ///
    /// Only `title` and `description` are translated (plus `tags` when
    /// enabled); every other field is copied in place.
    pub async fn translate_item(
        &self,
        item: &ContentItem,
        target: Language,
    ) -> Result<ContentItem, TranslateError> {
        let source = item.language;
        let label = item.relative_path.display().to_string();
        let mut document = item.document.clone();

        if let Some(front_matter) = document.front_matter.as_mut() {
            for field in front_matter.fields_mut() {
                match field {
                    Field::Title(text) | Field::Description(text) => {
                        if has_translatable_text(text) {
                            let what = format!("{} front matter", label);
                            *text = self.translate_text(text, source, target, &what).await?;
                        }
                    }
                    Field::Tags(tags) if self.translate_tags => {
                        for tag in tags.iter_mut() {
                            if has_translatable_text(tag) {
                                *tag = self
                                    .translate_text(tag, source, target, &format!("{} tag", label))
                                    .await?;
                            }
                        }
                    }
                    _ => {}
                }
            }
        }

        document.body = self
            .translate_body(&item.document.body, source, target, &label)
            .await?;

        Ok(ContentItem {
            relative_path: item.relative_path.clone(),
            language: target,
            document,
        })
    }

    async fn sync_pair(&self, pair: &PendingPair) -> Result<PathBuf, ItemError> {
        if self.cancel.is_cancelled() {
            return Err(ItemError::Cancelled);
        }

        let text = tokio::fs::read_to_string(&pair.source_path)
            .await
            .map_err(|source| ItemError::Io {
                path: pair.source_path.clone(),
                source,
            })?;
        let document = Document::parse(&text)?;
        let language = detect_language(&self.detector, &document.body, pair.source)?;

        if tokio::fs::try_exists(&pair.target_path).await.unwrap_or(false) {
            return Err(ItemError::AlreadyExists(pair.target_path.clone()));
        }

        let item = ContentItem {
            relative_path: pair.relative_path.clone(),
            language,
            document,
        };

        info!("Translating {} ({} -> {})", pair.source_path.display(), pair.source, pair.target);
        self.attempted.fetch_add(1, Ordering::SeqCst);
        let translated = tokio::select! {
            _ = self.cancel.cancelled() => return Err(ItemError::Cancelled),
            result = self.translate_item(&item, pair.target) => result,
        };
        let translated = match translated {
            Ok(translated) => translated,
            Err(e) => {
                if e.is_configuration_fatal() {
                    let _ = self.fatal.set(e.clone());
                    self.cancel.cancel();
                }
                if matches!(e, TranslateError::Unreachable(_)) {
                    self.unreachable.fetch_add(1, Ordering::SeqCst);
                }
                return Err(e.into());
            }
        };

        if self.cancel.is_cancelled() {
            return Err(ItemError::Cancelled);
        }
        let convention = self.convention.clone();
        tokio::task::spawn_blocking(move || write_item(&translated, &convention))
            .await
            .map_err(|e| ItemError::Io {
                path: pair.target_path.clone(),
                source: std::io::Error::other(e),
            })?
    }

    /// Translate and write one pending pair, folding the result into an
    /// outcome.
    pub async fn process(&self, pair: &PendingPair) -> ItemOutcome {
        match self.sync_pair(pair).await {
            Ok(target) => {
                info!("✓ Created: {}", target.display());
                ItemOutcome::Translated { target }
            }
            Err(e) => outcome_for_error(&pair.source_path, e),
        }
    }

    /// Why this run has to stop, if the service refused it or could not be
    /// reached for any item.
    fn abort_reason(&self) -> Option<String> {
        if let Some(e) = self.fatal.get() {
            return Some(e.to_string());
        }
        let attempted = self.attempted.load(Ordering::SeqCst);
        let unreachable = self.unreachable.load(Ordering::SeqCst);
        if attempted > 0 && unreachable == attempted {
            return Some(format!(
                "translation service unreachable for all {} attempted items",
                attempted
            ));
        }
        None
    }
}

/// Turn a finished report into [`SyncError::Aborted`], logging every file
/// that was written before the run stopped.
fn aborted(reason: String, report: SyncReport) -> SyncError {
    error!("Aborting run: {}", reason);
    for item in &report.items {
        if let ItemOutcome::Translated { target } = &item.outcome {
            warn!("Written before abort: {}", target.display());
        }
    }
    SyncError::Aborted {
        reason,
        partial: Box::new(report),
    }
}

fn outcome_for_error(path: &Path, error: ItemError) -> ItemOutcome {
    match error {
        ItemError::UndeterminedLanguage(reason) => {
            warn!("⊘ Skipping {}: language undetermined ({})", path.display(), reason);
            ItemOutcome::SkippedUndetermined { reason }
        }
        ItemError::AlreadyExists(target) => {
            info!("⊘ Skipping {}: {} already exists", path.display(), target.display());
            ItemOutcome::SkippedExisting { target }
        }
        ItemError::MalformedFrontMatter(e) => {
            warn!("⊘ Skipping {}: malformed front matter ({})", path.display(), e);
            ItemOutcome::SkippedMalformed {
                reason: e.to_string(),
            }
        }
        ItemError::Cancelled => {
            debug!("Cancelled {}", path.display());
            ItemOutcome::Cancelled
        }
        e @ (ItemError::TranslationFailure(_) | ItemError::Io { .. }) => {
            error!("✗ Error processing {}: {}", path.display(), e);
            ItemOutcome::Failed {
                reason: e.to_string(),
            }
        }
    }
}

// ==================== Orchestration ====================

/// Discover, plan, then translate and write every pending pair.
///
/// In a dry run the plan is reported and neither the translator nor the
/// filesystem is touched.
pub async fn run<T: Translator>(
    config: &Config,
    translator: &T,
    cancel: CancellationToken,
) -> Result<SyncReport, SyncError> {
    config.validate()?;
    let convention = config.path_convention();

    info!(
        "Scanning {} ({}) and {} ({})",
        convention.primary_root.display(),
        convention.primary,
        convention.secondary_root.display(),
        convention.secondary
    );
    let inventory = discover_items(&convention);
    let pending = plan_sync(&inventory, &convention);

    let mut report = SyncReport::new(config.dry_run);
    for rejected in &inventory.rejected {
        report.push(
            rejected.path.clone(),
            ItemOutcome::SkippedNonconforming {
                reason: rejected.reason.clone(),
            },
        );
    }

    info!(
        "Found {} content items, {} pending translation",
        inventory.items.len(),
        pending.len()
    );
    if pending.is_empty() {
        return Ok(report.finish());
    }

    if config.dry_run {
        for pair in pending {
            info!(
                "Would translate {} -> {}",
                pair.source_path.display(),
                pair.target_path.display()
            );
            report.push(
                pair.source_path,
                ItemOutcome::Planned {
                    target: pair.target_path,
                },
            );
        }
        return Ok(report.finish());
    }

    // A child token lets an auth failure stop this run without cancelling
    // the caller's token.
    let synchronizer = Synchronizer::new(config, translator, cancel.child_token());
    let synchronizer = &synchronizer;
    let outcomes: Vec<(PathBuf, ItemOutcome)> = stream::iter(pending.iter())
        .map(|pair| async move {
            let outcome = synchronizer.process(pair).await;
            (pair.source_path.clone(), outcome)
        })
        .buffer_unordered(config.concurrency.max(1))
        .collect()
        .await;

    for (path, outcome) in outcomes {
        report.push(path, outcome);
    }
    let report = report.finish();

    match synchronizer.abort_reason() {
        Some(reason) => Err(aborted(reason, report)),
        None => Ok(report),
    }
}

fn without_cur_dir(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// The spellings of `path` worth matching against the language roots: as
/// given, and relative to or joined with the working directory.
fn path_candidates(path: &Path) -> Vec<PathBuf> {
    let mut candidates = vec![without_cur_dir(path)];
    if let Ok(cwd) = std::env::current_dir() {
        if path.is_absolute() {
            if let Ok(relative) = path.strip_prefix(&cwd) {
                candidates.push(without_cur_dir(relative));
            }
        } else {
            candidates.push(without_cur_dir(&cwd.join(path)));
        }
    }
    candidates
}

/// Translate a single file into its counterpart, as a run with one item.
///
/// The file must live under one of the two language roots and follow the
/// naming convention.
pub async fn translate_file<T: Translator>(
    config: &Config,
    translator: &T,
    path: &Path,
    cancel: CancellationToken,
) -> Result<SyncReport, SyncError> {
    config.validate()?;
    let convention = config.path_convention();

    if !path.is_file() {
        return Err(SyncError::ConfigurationFatal(format!(
            "file not found: {}",
            path.display()
        )));
    }

    let mut classified = Err(PathConventionError::NotMarkdown);
    for candidate in path_candidates(path) {
        classified = convention.classify(&candidate);
        if !matches!(classified, Err(PathConventionError::OutsideRoot(_))) {
            break;
        }
    }
    let (source, relative_path) = classified.map_err(|e| {
        SyncError::ConfigurationFatal(format!("{} is not a content file: {}", path.display(), e))
    })?;
    let target = convention.counterpart(source);
    let pair = PendingPair {
        source_path: path.to_path_buf(),
        target_path: convention.item_path(target, &relative_path),
        relative_path,
        source,
        target,
    };

    let mut report = SyncReport::new(config.dry_run);
    if config.dry_run {
        let outcome = if pair.target_path.exists() {
            ItemOutcome::SkippedExisting {
                target: pair.target_path,
            }
        } else {
            ItemOutcome::Planned {
                target: pair.target_path,
            }
        };
        report.push(pair.source_path, outcome);
        return Ok(report);
    }

    let synchronizer = Synchronizer::new(config, translator, cancel.child_token());
    let outcome = synchronizer.process(&pair).await;
    report.push(pair.source_path, outcome);

    match synchronizer.abort_reason() {
        Some(reason) => Err(aborted(reason, report)),
        None => Ok(report),
    }
}
