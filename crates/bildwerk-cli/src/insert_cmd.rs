// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `bildwerk insert`

use std::path::Path;

use bildwerk_core::config::RuleSet;
use bildwerk_core::types::YOrigin;
use bildwerk_core::units::Unit;
use bildwerk_document::{BatchPlacementRunner, CancelFlag, ProgressEvent, plan_jobs};
use tracing::info;

use crate::{EXIT_CONFIG, EXIT_FAILED};

/// Parsed `insert` arguments. `None` / `false` leave the rule file's value.
pub struct InsertArgs<'a> {
    pub root: &'a Path,
    pub config: &'a Path,
    pub out: Option<&'a Path>,
    pub unit: Option<Unit>,
    pub y_origin: Option<YOrigin>,
    pub suffix: bool,
    pub jobs: usize,
}

pub fn run(args: &InsertArgs<'_>) -> Result<(), i32> {
    let mut rule_set = RuleSet::load(args.config).map_err(|err| {
        eprintln!("Error: {err}");
        EXIT_CONFIG
    })?;
    apply_overrides(&mut rule_set, args);

    if !args.root.is_dir() {
        eprintln!("Error: {} is not a directory", args.root.display());
        return Err(EXIT_CONFIG);
    }

    let runner = BatchPlacementRunner::new(&rule_set.rules, rule_set.unit, rule_set.y_origin);
    for rejected in runner.rejected() {
        eprintln!("Skipping rule #{}: {}", rejected.index + 1, rejected.reason);
    }
    if runner.rules().is_empty() {
        eprintln!("Error: no valid rules in {}", args.config.display());
        return Err(EXIT_CONFIG);
    }

    let output_root = rule_set.output_root(args.root);
    let jobs = plan_jobs(args.root, &output_root, rule_set.add_suffix).map_err(|err| {
        eprintln!("Error: {err}");
        EXIT_CONFIG
    })?;
    info!(
        documents = jobs.len(),
        unit = rule_set.unit.as_str(),
        y_origin = rule_set.y_origin.label(),
        output = %output_root.display(),
        "placement run"
    );

    let observer = |event: &ProgressEvent| {
        if let ProgressEvent::DocumentFinished { path, succeeded } = event {
            println!("{}\t{}", if *succeeded { "ok" } else { "FAILED" }, path.display());
        }
    };
    let cancel = CancelFlag::new();

    let summary = if args.jobs > 1 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(args.jobs)
            .build()
            .map_err(|err| {
                eprintln!("Error: cannot start {} workers: {err}", args.jobs);
                EXIT_CONFIG
            })?;
        pool.install(|| runner.run_batch_parallel(&jobs, &observer, &cancel))
    } else {
        runner.run_batch(&jobs, &observer, &cancel)
    };

    for failure in &summary.failures {
        eprintln!("{}: {}", failure.path.display(), failure.error);
    }
    println!("{} succeeded, {} failed", summary.succeeded, summary.failed);

    if summary.failed > 0 {
        return Err(EXIT_FAILED);
    }
    Ok(())
}

fn apply_overrides(rule_set: &mut RuleSet, args: &InsertArgs<'_>) {
    if let Some(unit) = args.unit {
        rule_set.unit = unit;
    }
    if let Some(y_origin) = args.y_origin {
        rule_set.y_origin = y_origin;
    }
    if args.suffix {
        rule_set.add_suffix = true;
    }
    if let Some(out) = args.out {
        rule_set.output_dir = out.to_string_lossy().into_owned();
    }
}
