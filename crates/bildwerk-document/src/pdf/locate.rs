// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page image locator — every image XObject drawn on a page and where.

use std::collections::HashSet;

use bildwerk_core::error::{BildwerkError, Result};
use bildwerk_core::types::PageRect;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, warn};

use super::objects::{
    content_bytes, dict_get, dict_owned, effective_resources, matrix_values, name_of, page_content_streams,
    resolve,
};

/// Form XObjects nested deeper than this are not entered.
const MAX_FORM_DEPTH: usize = 12;

/// One drawing of an image object on a page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagePlacement {
    pub object_id: ObjectId,
    /// Bounding box in default user space (not yet shifted to the page box).
    pub rect: PageRect,
}

/// Current transformation matrix `[a b c d e f]`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix([f64; 6]);

impl Matrix {
    const IDENTITY: Self = Self([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    /// `m x self`: the effect of a `cm` or `/Matrix` applied under `self`.
    fn pre_concat(self, m: [f64; 6]) -> Self {
        let c = self.0;
        Self([
            m[0] * c[0] + m[1] * c[2],
            m[0] * c[1] + m[1] * c[3],
            m[2] * c[0] + m[3] * c[2],
            m[2] * c[1] + m[3] * c[3],
            m[4] * c[0] + m[5] * c[2] + c[4],
            m[4] * c[1] + m[5] * c[3] + c[5],
        ])
    }

    fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let [a, b, c, d, e, f] = self.0;
        (a * x + c * y + e, b * x + d * y + f)
    }

    /// Bounding box of the unit square, i.e. where an image lands.
    fn unit_square_bounds(&self) -> Option<PageRect> {
        PageRect::bounding(&[
            self.apply(0.0, 0.0),
            self.apply(1.0, 0.0),
            self.apply(0.0, 1.0),
            self.apply(1.0, 1.0),
        ])
    }
}

/// Every image placement on the page, in drawing order.
///
/// The page content is interpreted in full, following nested form XObjects.
/// If the page content cannot be interpreted at all, each content stream is
/// scanned on its own for the images in the page resources instead.
pub fn locate_images(doc: &Document, page_id: ObjectId) -> Vec<ImagePlacement> {
    match interpret_page(doc, page_id) {
        Ok(placements) => placements,
        Err(err) => {
            warn!(page = ?page_id, %err, "page content not interpretable, scanning streams individually");
            scan_streams(doc, page_id)
        }
    }
}

// -- Primary: full content interpretation -------------------------------------

fn interpret_page(doc: &Document, page_id: ObjectId) -> Result<Vec<ImagePlacement>> {
    let bytes = doc
        .get_page_content(page_id)
        .map_err(|err| BildwerkError::PdfError(format!("page content unreadable: {}", err)))?;
    let content = Content::decode(&bytes)
        .map_err(|err| BildwerkError::PdfError(format!("page content unparsable: {}", err)))?;
    let resources = effective_resources(doc, page_id).unwrap_or_default();

    let mut walker = Walker {
        doc,
        placements: Vec::new(),
        open_forms: HashSet::new(),
    };
    walker.walk(&content.operations, &resources, Matrix::IDENTITY, 0);
    Ok(walker.placements)
}

struct Walker<'a> {
    doc: &'a Document,
    placements: Vec<ImagePlacement>,
    /// Forms currently being walked, to stop self-referencing forms.
    open_forms: HashSet<ObjectId>,
}

impl Walker<'_> {
    fn walk(&mut self, operations: &[Operation], resources: &Dictionary, ctm: Matrix, depth: usize) {
        let mut ctm = ctm;
        let mut saved = Vec::new();

        for op in operations {
            match op.operator.as_str() {
                "q" => saved.push(ctm),
                "Q" => {
                    if let Some(previous) = saved.pop() {
                        ctm = previous;
                    }
                }
                "cm" => {
                    if let Some(m) = matrix_values(&op.operands) {
                        ctm = ctm.pre_concat(m);
                    }
                }
                "Do" => {
                    if let Some(name) = op.operands.first().and_then(name_of) {
                        self.draw(name, resources, ctm, depth);
                    }
                }
                _ => {}
            }
        }
    }

    fn draw(&mut self, name: &[u8], resources: &Dictionary, ctm: Matrix, depth: usize) {
        let doc = self.doc;
        let Some(id) = xobject_id(doc, resources, name) else {
            debug!(name = %String::from_utf8_lossy(name), "Do without a matching XObject");
            return;
        };
        let Ok(stream) = doc.get_object(id).and_then(Object::as_stream) else {
            return;
        };

        match dict_get(&stream.dict, b"Subtype").and_then(name_of) {
            Some(b"Image") => {
                if let Some(rect) = ctm.unit_square_bounds() {
                    self.placements.push(ImagePlacement { object_id: id, rect });
                }
            }
            Some(b"Form") => {
                if depth >= MAX_FORM_DEPTH || !self.open_forms.insert(id) {
                    warn!(form = ?id, depth, "skipping nested form XObject");
                    return;
                }
                let form_ctm = dict_get(&stream.dict, b"Matrix")
                    .and_then(|m| match resolve(doc, m) {
                        Object::Array(values) => matrix_values(values),
                        _ => None,
                    })
                    .map_or(ctm, |m| ctm.pre_concat(m));
                let form_resources = dict_get(&stream.dict, b"Resources")
                    .and_then(|obj| dict_owned(obj, doc))
                    .unwrap_or_else(|| resources.clone());

                match content_bytes(stream).and_then(|bytes| {
                    Content::decode(&bytes)
                        .map_err(|err| BildwerkError::PdfError(format!("form content unparsable: {}", err)))
                }) {
                    Ok(content) => self.walk(&content.operations, &form_resources, form_ctm, depth + 1),
                    Err(err) => warn!(form = ?id, %err, "skipping unreadable form XObject"),
                }
                self.open_forms.remove(&id);
            }
            _ => {}
        }
    }
}

fn xobject_id(doc: &Document, resources: &Dictionary, name: &[u8]) -> Option<ObjectId> {
    let xobjects = dict_get(resources, b"XObject").map(|obj| resolve(doc, obj))?;
    match xobjects.as_dict().ok()?.get(name).ok()? {
        Object::Reference(id) => Some(*id),
        _ => None,
    }
}

// -- Fallback: per-stream scan --------------------------------------------------

/// Image XObjects listed in the page resources, in resource order.
fn page_images(doc: &Document, page_id: ObjectId) -> Vec<(Vec<u8>, ObjectId)> {
    let Some(resources) = effective_resources(doc, page_id) else {
        return Vec::new();
    };
    let Some(Object::Dictionary(xobjects)) = dict_get(&resources, b"XObject").map(|obj| resolve(doc, obj)) else {
        return Vec::new();
    };

    xobjects
        .iter()
        .filter_map(|(name, value)| {
            let Object::Reference(id) = value else {
                return None;
            };
            let stream = doc.get_object(*id).and_then(Object::as_stream).ok()?;
            match dict_get(&stream.dict, b"Subtype").and_then(name_of) {
                Some(b"Image") => Some((name.clone(), *id)),
                _ => None,
            }
        })
        .collect()
}

/// For each image of the page resources, the rectangles it is drawn at,
/// tracking the CTM across the page's content streams one stream at a time.
/// Streams that do not parse are skipped.
fn scan_streams(doc: &Document, page_id: ObjectId) -> Vec<ImagePlacement> {
    let images = page_images(doc, page_id);
    if images.is_empty() {
        return Vec::new();
    }
    let streams = match page_content_streams(doc, page_id) {
        Ok(streams) => streams,
        Err(err) => {
            warn!(page = ?page_id, %err, "page contents unreadable");
            return Vec::new();
        }
    };

    let mut draws: Vec<(Vec<u8>, PageRect)> = Vec::new();
    let mut ctm = Matrix::IDENTITY;
    let mut saved = Vec::new();

    for stream in streams {
        let Ok(content) = content_bytes(stream).and_then(|bytes| {
            Content::decode(&bytes).map_err(|err| BildwerkError::PdfError(err.to_string()))
        }) else {
            debug!(page = ?page_id, "skipping unparsable content stream");
            continue;
        };
        for op in &content.operations {
            match op.operator.as_str() {
                "q" => saved.push(ctm),
                "Q" => ctm = saved.pop().unwrap_or(ctm),
                "cm" => {
                    if let Some(m) = matrix_values(&op.operands) {
                        ctm = ctm.pre_concat(m);
                    }
                }
                "Do" => {
                    if let (Some(name), Some(rect)) =
                        (op.operands.first().and_then(name_of), ctm.unit_square_bounds())
                    {
                        draws.push((name.to_vec(), rect));
                    }
                }
                _ => {}
            }
        }
    }

    images
        .iter()
        .flat_map(|(name, id)| {
            draws
                .iter()
                .filter(move |(drawn, _)| drawn == name)
                .map(move |(_, rect)| ImagePlacement { object_id: *id, rect: *rect })
        })
        .collect()
}
