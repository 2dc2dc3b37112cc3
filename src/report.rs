//! Per-item outcomes of a run and the summary built from them.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    Translated { target: PathBuf },
    Planned { target: PathBuf },
    SkippedUndetermined { reason: String },
    SkippedExisting { target: PathBuf },
    SkippedMalformed { reason: String },
    SkippedNonconforming { reason: String },
    Failed { reason: String },
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemReport {
    /// Source file (or the rejected file for non-conforming paths)
    pub path: PathBuf,
    #[serde(flatten)]
    pub outcome: ItemOutcome,
}

/// Counts per outcome. `skipped` is the sum of all `skipped_*` counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Summary {
    pub translated: usize,
    pub skipped: usize,
    pub skipped_undetermined: usize,
    pub skipped_existing: usize,
    pub skipped_malformed: usize,
    pub skipped_nonconforming: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub planned: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "translated: {}, skipped: {} (undetermined {}, existing {}, malformed {}, nonconforming {}), failed: {}",
            self.translated,
            self.skipped,
            self.skipped_undetermined,
            self.skipped_existing,
            self.skipped_malformed,
            self.skipped_nonconforming,
            self.failed
        )?;
        if self.cancelled > 0 {
            write!(f, ", cancelled: {}", self.cancelled)?;
        }
        if self.planned > 0 {
            write!(f, ", planned: {}", self.planned)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SyncReport {
    pub dry_run: bool,
    pub items: Vec<ItemReport>,
}

impl SyncReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            items: Vec::new(),
        }
    }

    pub fn push(&mut self, path: impl Into<PathBuf>, outcome: ItemOutcome) {
        self.items.push(ItemReport {
            path: path.into(),
            outcome,
        });
    }

    /// Sort items by path so reports are reproducible regardless of the order
    /// concurrent work finished in.
    pub fn finish(mut self) -> Self {
        self.items.sort_by(|a, b| a.path.cmp(&b.path));
        self
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for item in &self.items {
            match item.outcome {
                ItemOutcome::Translated { .. } => summary.translated += 1,
                ItemOutcome::Planned { .. } => summary.planned += 1,
                ItemOutcome::SkippedUndetermined { .. } => summary.skipped_undetermined += 1,
                ItemOutcome::SkippedExisting { .. } => summary.skipped_existing += 1,
                ItemOutcome::SkippedMalformed { .. } => summary.skipped_malformed += 1,
                ItemOutcome::SkippedNonconforming { .. } => summary.skipped_nonconforming += 1,
                ItemOutcome::Failed { .. } => summary.failed += 1,
                ItemOutcome::Cancelled => summary.cancelled += 1,
            }
        }
        summary.skipped = summary.skipped_undetermined
            + summary.skipped_existing
            + summary.skipped_malformed
            + summary.skipped_nonconforming;
        summary
    }

    /// 0 when nothing failed or was cancelled, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        let summary = self.summary();
        if summary.failed > 0 || summary.cancelled > 0 {
            1
        } else {
            0
        }
    }

    pub fn write_json(&self, path: &Path) -> std::io::Result<()> {
        #[derive(Serialize)]
        struct JsonReport<'a> {
            summary: Summary,
            #[serde(flatten)]
            report: &'a SyncReport,
        }

        let json = serde_json::to_string_pretty(&JsonReport {
            summary: self.summary(),
            report: self,
        })
        .map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}
