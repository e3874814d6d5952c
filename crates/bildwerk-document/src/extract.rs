// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Extraction — save every placed image of a PDF as PNG and write the rule
// file that puts them back where they were.

use std::fs;
use std::path::{Path, PathBuf};

use bildwerk_core::config::RuleSet;
use bildwerk_core::error::{BildwerkError, Result};
use bildwerk_core::geometry::placement_from_rect;
use bildwerk_core::pages::parse_page_selection;
use bildwerk_core::types::{PageToken, YOrigin};
use bildwerk_core::units::Unit;
use tracing::{info, instrument, warn};

use crate::pdf::PdfSession;
use crate::progress::{ProgressEvent, ProgressObserver};

/// Directory created next to the PDF when no output directory is given.
pub const DEFAULT_OUTPUT_DIR: &str = "pic";

/// Decimal places kept in emitted rule values.
const RULE_DECIMALS: i32 = 6;

#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Where PNGs and the rule file go; `<pdf dir>/pic` when `None`.
    pub output_dir: Option<PathBuf>,
    pub unit: Unit,
    pub y_origin: YOrigin,
    /// Page selection such as `"1,3-5"`; blank means every page.
    pub pages: String,
    /// Composite transparent images onto white before saving.
    pub flatten: bool,
}

/// What one extraction run produced.
#[derive(Debug)]
pub struct ExtractionReport {
    pub output_dir: PathBuf,
    pub images: Vec<PathBuf>,
    pub rules: RuleSet,
    pub config_path: PathBuf,
    /// Images that could not be materialized or written.
    pub skipped: usize,
}

pub struct ExtractionRunner {
    options: ExtractOptions,
}

impl ExtractionRunner {
    pub fn new(options: ExtractOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Extract from the PDF at `pdf_path`.
    #[instrument(skip(self, observer), fields(pdf = %pdf_path.display()))]
    pub fn run(&self, pdf_path: &Path, observer: &dyn ProgressObserver) -> Result<ExtractionReport> {
        let session = PdfSession::open(pdf_path)?;

        let output_dir = match &self.options.output_dir {
            Some(dir) => dir.clone(),
            None => pdf_path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(DEFAULT_OUTPUT_DIR),
        };
        let output_dir = std::path::absolute(&output_dir)?;
        let base = pdf_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());

        self.extract(&session, &base, &output_dir, observer)
    }

    /// Extract from an open session. PNGs are named `<base>_NNNN.png`.
    pub fn extract(
        &self,
        session: &PdfSession,
        base: &str,
        output_dir: &Path,
        observer: &dyn ProgressObserver,
    ) -> Result<ExtractionReport> {
        fs::create_dir_all(output_dir).map_err(|err| {
            BildwerkError::Save(format!("cannot create {}: {}", output_dir.display(), err))
        })?;

        let page_count = session.page_count();
        let mut pages = parse_page_selection(&self.options.pages, page_count);
        if pages.is_empty() {
            pages = (0..page_count).collect();
        }
        info!(pages = pages.len(), unit = self.options.unit.as_str(), "extraction started");

        let source = session.source_path().map(Path::to_path_buf).unwrap_or_default();
        let mut rule_set = RuleSet {
            unit: self.options.unit,
            y_origin: self.options.y_origin,
            ..RuleSet::default()
        };
        let mut images = Vec::new();
        let mut skipped = 0;

        for page in pages {
            let page_height = session.page_height(page)?;
            for placement in session.locate_images(page)? {
                let image_path = output_dir.join(format!("{}_{:04}.png", base, images.len() + 1));

                let written = session.materialize(placement.object_id).and_then(|image| {
                    let image = if self.options.flatten { image.flatten() } else { image };
                    image.save_png(&image_path)
                });
                if let Err(err) = written {
                    warn!(page = page + 1, object = ?placement.object_id, %err, "image skipped");
                    skipped += 1;
                    continue;
                }

                let mut rule = placement_from_rect(&placement.rect, self.options.unit, self.options.y_origin, page_height)
                    .rounded(RULE_DECIMALS)
                    .into_rule(&image_path);
                rule.page = PageToken::Number(page as i64 + 1);
                rule.unit = Some(self.options.unit);

                info!(
                    page = page + 1,
                    image = %image_path.display(),
                    x = rule.x, y = rule.y, width = rule.width, height = rule.height,
                    "image extracted"
                );
                observer.on_event(&ProgressEvent::ImageExtracted {
                    path: source.clone(),
                    page: page + 1,
                });
                rule_set.rules.push(rule);
                images.push(image_path);
            }
        }

        let config_path = output_dir.join(format!("{}_config.json", base));
        rule_set.save(&config_path)?;
        info!(images = images.len(), skipped, config = %config_path.display(), "extraction finished");

        Ok(ExtractionReport {
            output_dir: output_dir.to_path_buf(),
            images,
            rules: rule_set,
            config_path,
            skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::DecodedImage;
    use crate::pdf::PageImageSource;
    use crate::pdf::session::tests::blank_document;
    use crate::progress::Silent;
    use bildwerk_core::PageRect;
    use bildwerk_core::geometry::resolve_rect;
    use lopdf::{Object, Stream, dictionary};

    fn semi_transparent() -> PageImageSource {
        let mut image = DecodedImage::from_rgb(2, 2, vec![10; 12]).unwrap();
        image.set_alpha(vec![0, 64, 128, 255]).unwrap();
        PageImageSource::from_image("logo.png", image)
    }

    fn saved_pdf(dir: &Path, placements: &[(usize, PageRect)]) -> PathBuf {
        let mut session = PdfSession::from_document(blank_document(3, [0, 0, 612, 792])).unwrap();
        let source = semi_transparent();
        for (page, rect) in placements {
            session.insert_image(*page, rect, &source).unwrap();
        }
        let path = dir.join("Contract.pdf");
        session.save(&path).unwrap();
        path
    }

    #[test]
    fn extracted_rules_reproduce_the_rectangles() {
        let dir = tempfile::tempdir().unwrap();
        let original = [
            (0, PageRect::new(72.0, 648.0, 216.0, 720.0)),
            (2, PageRect::new(300.5, 10.25, 410.0, 95.0)),
        ];
        let pdf = saved_pdf(dir.path(), &original);

        for y_origin in [YOrigin::BottomUp, YOrigin::TopDown] {
            for unit in [Unit::Pt, Unit::Inch, Unit::Cm] {
                let runner = ExtractionRunner::new(ExtractOptions {
                    output_dir: Some(dir.path().join(format!("{:?}-{}", y_origin, unit.as_str()))),
                    unit,
                    y_origin,
                    ..ExtractOptions::default()
                });
                let report = runner.run(&pdf, &Silent).unwrap();
                assert_eq!(report.rules.rules.len(), 2);

                for ((page, rect), rule) in original.iter().zip(&report.rules.rules) {
                    let resolved_page = rule.page.resolve(3).unwrap();
                    assert_eq!(resolved_page, *page);
                    let back = resolve_rect(rule, unit, y_origin, 792.0);
                    assert!(back.approx_eq(rect, 1e-3), "{unit:?} {y_origin:?}: {back:?} vs {rect:?}");
                }
            }
        }
    }

    #[test]
    fn files_are_numbered_and_config_written() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = saved_pdf(
            dir.path(),
            &[
                (0, PageRect::new(0.0, 0.0, 10.0, 10.0)),
                (1, PageRect::new(0.0, 0.0, 20.0, 20.0)),
                (1, PageRect::new(50.0, 50.0, 60.0, 60.0)),
            ],
        );

        let report = ExtractionRunner::new(ExtractOptions::default()).run(&pdf, &Silent).unwrap();
        assert_eq!(report.output_dir, std::path::absolute(dir.path().join("pic")).unwrap());
        let names: Vec<String> = report
            .images
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["Contract_0001.png", "Contract_0002.png", "Contract_0003.png"]);
        assert!(report.images.iter().all(|p| p.is_absolute() && p.is_file()));

        let reloaded = RuleSet::load(&report.config_path).unwrap();
        assert_eq!(reloaded.rules.len(), 3);
        assert!(!reloaded.add_suffix);
        assert!(reloaded.output_dir.is_empty());
        assert_eq!(reloaded.rules[2].page, PageToken::Number(2));
        assert_eq!(reloaded.rules[0].unit, Some(Unit::Cm));
    }

    #[test]
    fn page_selection_and_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = saved_pdf(
            dir.path(),
            &[(0, PageRect::new(0.0, 0.0, 1.0, 1.0)), (2, PageRect::new(0.0, 0.0, 1.0, 1.0))],
        );

        let only_third = ExtractionRunner::new(ExtractOptions {
            output_dir: Some(dir.path().join("third")),
            pages: "3".to_string(),
            ..ExtractOptions::default()
        });
        let report = only_third.run(&pdf, &Silent).unwrap();
        assert_eq!(report.rules.rules.len(), 1);
        assert_eq!(report.rules.rules[0].page, PageToken::Number(3));

        // Nothing usable selected: every page.
        let nonsense = ExtractionRunner::new(ExtractOptions {
            output_dir: Some(dir.path().join("all")),
            pages: "9-12,x".to_string(),
            ..ExtractOptions::default()
        });
        assert_eq!(nonsense.run(&pdf, &Silent).unwrap().images.len(), 2);
    }

    #[test]
    fn flatten_drops_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = saved_pdf(dir.path(), &[(0, PageRect::new(0.0, 0.0, 10.0, 10.0))]);

        let keep = ExtractionRunner::new(ExtractOptions {
            output_dir: Some(dir.path().join("keep")),
            ..ExtractOptions::default()
        });
        let flat = ExtractionRunner::new(ExtractOptions {
            output_dir: Some(dir.path().join("flat")),
            flatten: true,
            ..ExtractOptions::default()
        });

        let kept = image::open(&keep.run(&pdf, &Silent).unwrap().images[0]).unwrap();
        let flattened = image::open(&flat.run(&pdf, &Silent).unwrap().images[0]).unwrap();
        assert!(kept.color().has_alpha());
        assert!(!flattened.color().has_alpha());
    }

    #[test]
    fn broken_image_is_skipped() {
        let mut doc = blank_document(1, [0, 0, 612, 792]);
        let broken = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject", "Subtype" => "Image",
                "Width" => 8, "Height" => 8,
                "ColorSpace" => "DeviceRGB", "BitsPerComponent" => 8,
            },
            vec![0; 5],
        ));
        let page_id = doc.page_iter().next().unwrap();
        let content = doc.add_object(Stream::new(dictionary! {}, b"q 10 0 0 10 0 0 cm /Im0 Do Q\n".to_vec()));
        let page = doc.get_object_mut(page_id).and_then(Object::as_dict_mut).unwrap();
        page.set("Resources", dictionary! { "XObject" => dictionary! { "Im0" => broken } });
        page.set("Contents", content);

        let session = PdfSession::from_document(doc).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let report = ExtractionRunner::new(ExtractOptions::default())
            .extract(&session, "broken", dir.path(), &Silent)
            .unwrap();
        assert_eq!(report.skipped, 1);
        assert!(report.images.is_empty());
        assert!(report.config_path.is_file());
    }
}
