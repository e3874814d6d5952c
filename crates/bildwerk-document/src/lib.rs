// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// bildwerk-document — PDF image engines for Bildwerk.
//
// Decodes embedded images into RGB(+alpha) rasters, finds where each image is
// drawn on a page, places raster files onto pages, and drives the two batch
// workflows: extraction (PDF to PNG plus rule file) and placement (rule file
// applied to a directory tree of PDFs).

pub mod batch;
pub mod extract;
pub mod image;
pub mod pdf;
pub mod progress;

// Re-export the primary types so callers can use `bildwerk_document::PdfSession` etc.
pub use batch::{
    BatchJob, BatchPlacementRunner, BatchSummary, DocumentFailure, discover_documents, output_path_for,
    plan_jobs,
};
pub use extract::{ExtractOptions, ExtractionReport, ExtractionRunner};
pub use image::DecodedImage;
pub use pdf::{ImagePlacement, PageBox, PageImageSource, PdfSession, is_decode_inverted, materialize};
pub use progress::{CancelFlag, ProgressEvent, ProgressObserver, Silent};
