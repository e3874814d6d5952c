// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch placement — apply one rule list to every PDF under a directory tree.
//
// A document is saved only when every rule applied; any failure discards the
// in-memory changes for that document and the batch moves on.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use bildwerk_core::error::{BildwerkError, Result};
use bildwerk_core::geometry::resolve_rect;
use bildwerk_core::rule::{PlacementRule, RejectedRule, validate_rules};
use bildwerk_core::types::YOrigin;
use bildwerk_core::units::Unit;
use glob::{MatchOptions, Pattern};
use tracing::{debug, info, instrument, warn};

use crate::pdf::{PageImageSource, PdfSession};
use crate::progress::{CancelFlag, ProgressEvent, ProgressObserver};

/// Suffix appended to output file names when requested.
pub const OUTPUT_SUFFIX: &str = "_signed";

/// One input document and where its result goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchJob {
    pub input: PathBuf,
    pub output: PathBuf,
}

/// A document that could not be processed.
#[derive(Debug)]
pub struct DocumentFailure {
    pub path: PathBuf,
    pub error: BildwerkError,
}

/// Outcome of a batch run.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<DocumentFailure>,
    /// Set when the run stopped early on a cancellation request.
    pub cancelled: bool,
}

impl BatchSummary {
    /// `(success_count, failure_count)`.
    pub fn counts(&self) -> (usize, usize) {
        (self.succeeded, self.failed)
    }

    fn record(&mut self, path: &Path, outcome: Result<()>) {
        match outcome {
            Ok(()) => self.succeeded += 1,
            Err(error) => {
                self.failed += 1;
                self.failures.push(DocumentFailure {
                    path: path.to_path_buf(),
                    error,
                });
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Input discovery
// ---------------------------------------------------------------------------

/// Every `*.pdf` (any case) below `root`, sorted, skipping `output_root` and
/// everything inside it.
pub fn discover_documents(root: &Path, output_root: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}/**/*.pdf", Pattern::escape(&root.to_string_lossy()));
    let options = MatchOptions {
        case_sensitive: false,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };
    let excluded = std::path::absolute(output_root)?;

    let entries = glob::glob_with(&pattern, options)
        .map_err(|err| BildwerkError::Config(format!("invalid input directory {}: {}", root.display(), err)))?;

    let mut documents = Vec::new();
    for entry in entries {
        let path = match entry {
            Ok(path) => path,
            Err(err) => {
                warn!(%err, "skipping unreadable directory entry");
                continue;
            }
        };
        if !path.is_file() {
            continue;
        }
        if std::path::absolute(&path).is_ok_and(|abs| abs.starts_with(&excluded)) {
            continue;
        }
        documents.push(path);
    }
    documents.sort();

    debug!(root = %root.display(), count = documents.len(), "documents discovered");
    Ok(documents)
}

/// Output location for `input`: its path relative to `root`, re-rooted at
/// `output_root`, with [`OUTPUT_SUFFIX`] before the extension if requested.
pub fn output_path_for(input: &Path, root: &Path, output_root: &Path, add_suffix: bool) -> PathBuf {
    let relative = match input.strip_prefix(root) {
        Ok(relative) => relative.to_path_buf(),
        Err(_) => input.file_name().map(PathBuf::from).unwrap_or_default(),
    };
    let file_name = relative
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let split = file_name.len().checked_sub(4).filter(|&at| {
        file_name.is_char_boundary(at) && file_name[at..].eq_ignore_ascii_case(".pdf")
    });
    let (stem, extension) = match split {
        Some(at) => (&file_name[..at], &file_name[at..]),
        None => (file_name.as_str(), ".pdf"),
    };
    let suffix = if add_suffix { OUTPUT_SUFFIX } else { "" };

    let directory = relative.parent().map(|p| output_root.join(p)).unwrap_or_else(|| output_root.to_path_buf());
    directory.join(format!("{}{}{}", stem, suffix, extension))
}

/// Discover the documents under `root` and pair each with its output path.
pub fn plan_jobs(root: &Path, output_root: &Path, add_suffix: bool) -> Result<Vec<BatchJob>> {
    Ok(discover_documents(root, output_root)?
        .into_iter()
        .map(|input| {
            let output = output_path_for(&input, root, output_root, add_suffix);
            BatchJob { input, output }
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Applies an ordered, pre-validated list of placement rules to documents.
pub struct BatchPlacementRunner {
    rules: Vec<PlacementRule>,
    rejected: Vec<RejectedRule>,
    unit: Unit,
    y_origin: YOrigin,
}

impl BatchPlacementRunner {
    /// Validate `rules` once; rejected rules never reach a document.
    pub fn new(rules: &[PlacementRule], unit: Unit, y_origin: YOrigin) -> Self {
        let (rules, rejected) = validate_rules(rules);
        Self {
            rules,
            rejected,
            unit,
            y_origin,
        }
    }

    /// The rules that will run, in order.
    pub fn rules(&self) -> &[PlacementRule] {
        &self.rules
    }

    /// Rules dropped by validation, with the reason.
    pub fn rejected(&self) -> &[RejectedRule] {
        &self.rejected
    }

    // -- Per document ---------------------------------------------------------

    /// Apply every rule to an open session, in order. The first failure stops
    /// the document. Returns the number of rules applied.
    pub fn run_document(&self, session: &mut PdfSession, observer: &dyn ProgressObserver) -> Result<usize> {
        let page_count = session.page_count();
        let path = session.source_path().map(Path::to_path_buf).unwrap_or_default();
        let mut sources: HashMap<PathBuf, PageImageSource> = HashMap::new();

        for (rule_index, rule) in self.rules.iter().enumerate() {
            let page = rule
                .page
                .resolve(page_count)
                .ok_or_else(|| BildwerkError::PdfError("document has no pages".to_string()))?;
            let page_height = session.page_height(page)?;
            let rect = resolve_rect(rule, self.unit, self.y_origin, page_height);

            if !sources.contains_key(&rule.image) {
                sources.insert(rule.image.clone(), PageImageSource::load(&rule.image)?);
            }
            session.insert_image(page, &rect, &sources[&rule.image])?;

            debug!(rule_index, page = page + 1, ?rect, "rule applied");
            observer.on_event(&ProgressEvent::RuleApplied {
                path: path.clone(),
                rule_index,
                page: page + 1,
            });
        }
        Ok(self.rules.len())
    }

    /// Open `job.input`, apply every rule, save to `job.output`.
    #[instrument(skip_all, fields(input = %job.input.display()))]
    pub fn process(&self, job: &BatchJob, observer: &dyn ProgressObserver) -> Result<()> {
        let mut session = PdfSession::open(&job.input)?;
        let applied = self.run_document(&mut session, observer)?;
        session.save(&job.output)?;
        info!(output = %job.output.display(), applied, "document processed");
        Ok(())
    }

    // -- Whole batch ----------------------------------------------------------

    /// Process `jobs` one after another. A failing document is recorded and
    /// the batch continues; `cancel` is checked before each document.
    pub fn run_batch(&self, jobs: &[BatchJob], observer: &dyn ProgressObserver, cancel: &CancelFlag) -> BatchSummary {
        info!(documents = jobs.len(), rules = self.rules.len(), "batch started");
        let mut summary = BatchSummary::default();

        for (index, job) in jobs.iter().enumerate() {
            if cancel.is_cancelled() {
                info!(remaining = jobs.len() - index, "batch cancelled");
                summary.cancelled = true;
                break;
            }
            let outcome = self.process_observed(job, index, jobs.len(), observer);
            summary.record(&job.input, outcome);
        }

        info!(succeeded = summary.succeeded, failed = summary.failed, "batch finished");
        summary
    }

    /// Like [`run_batch`](Self::run_batch), spreading whole documents over
    /// the current rayon pool. Each worker owns its own session.
    #[cfg(feature = "parallel")]
    pub fn run_batch_parallel(
        &self,
        jobs: &[BatchJob],
        observer: &dyn ProgressObserver,
        cancel: &CancelFlag,
    ) -> BatchSummary {
        use rayon::prelude::*;

        info!(documents = jobs.len(), rules = self.rules.len(), "parallel batch started");
        let outcomes: Vec<Option<Result<()>>> = jobs
            .par_iter()
            .enumerate()
            .map(|(index, job)| {
                if cancel.is_cancelled() {
                    return None;
                }
                Some(self.process_observed(job, index, jobs.len(), observer))
            })
            .collect();

        let mut summary = BatchSummary::default();
        for (job, outcome) in jobs.iter().zip(outcomes) {
            match outcome {
                Some(outcome) => summary.record(&job.input, outcome),
                None => summary.cancelled = true,
            }
        }
        info!(succeeded = summary.succeeded, failed = summary.failed, "parallel batch finished");
        summary
    }

    fn process_observed(
        &self,
        job: &BatchJob,
        index: usize,
        total: usize,
        observer: &dyn ProgressObserver,
    ) -> Result<()> {
        observer.on_event(&ProgressEvent::DocumentStarted {
            path: job.input.clone(),
            index,
            total,
        });
        let outcome = self.process(job, observer);
        if let Err(err) = &outcome {
            warn!(input = %job.input.display(), %err, "document failed");
        }
        observer.on_event(&ProgressEvent::DocumentFinished {
            path: job.input.clone(),
            succeeded: outcome.is_ok(),
        });
        outcome
    }
}
