// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `bildwerk extract`

use std::path::Path;

use bildwerk_core::error::BildwerkError;
use bildwerk_core::types::YOrigin;
use bildwerk_core::units::Unit;
use bildwerk_document::{ExtractOptions, ExtractionRunner, ProgressEvent};

use crate::{EXIT_CONFIG, EXIT_FAILED};

pub fn run(
    file: &Path,
    out: Option<&Path>,
    unit: Unit,
    y_origin: YOrigin,
    pages: Option<&str>,
    flatten: bool,
) -> Result<(), i32> {
    if !file.is_file() {
        eprintln!("Error: {} is not a file", file.display());
        return Err(EXIT_CONFIG);
    }

    let runner = ExtractionRunner::new(ExtractOptions {
        output_dir: out.map(Path::to_path_buf),
        unit,
        y_origin,
        pages: pages.unwrap_or_default().to_string(),
        flatten,
    });

    let observer = |event: &ProgressEvent| {
        if let ProgressEvent::ImageExtracted { page, .. } = event {
            tracing::debug!(page, "extracted");
        }
    };

    let report = runner.run(file, &observer).map_err(|err| {
        eprintln!("Error: {err}");
        match err {
            BildwerkError::Config(_) | BildwerkError::InvalidRule { .. } => EXIT_CONFIG,
            _ => EXIT_FAILED,
        }
    })?;

    for (image, rule) in report.images.iter().zip(&report.rules.rules) {
        println!(
            "{}\tpage={}\tx={}\ty={}\tw={}\th={}\t{}",
            image.display(),
            rule.page,
            rule.x,
            rule.y,
            rule.width,
            rule.height,
            unit.as_str(),
        );
    }
    println!("{} image(s) written, rules in {}", report.images.len(), report.config_path.display());

    if report.skipped > 0 {
        eprintln!("{} image(s) could not be extracted", report.skipped);
        return Err(EXIT_FAILED);
    }
    Ok(())
}
