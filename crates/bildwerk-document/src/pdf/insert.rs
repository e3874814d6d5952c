// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image insertion — embed a raster as an image XObject and draw it on a page.

use std::path::{Path, PathBuf};

use bildwerk_core::error::{BildwerkError, Result};
use bildwerk_core::types::PageRect;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use tracing::{debug, instrument};

use super::filters::flate_encode;
use super::objects::{dict_get, dict_owned, effective_resources, page_contents};
use crate::image::DecodedImage;

/// Prefix of the XObject resource names this crate adds to pages.
const XOBJECT_PREFIX: &str = "BwImg";

/// A raster loaded from disk, ready to be placed on pages.
#[derive(Debug, Clone)]
pub struct PageImageSource {
    path: PathBuf,
    image: DecodedImage,
}

impl PageImageSource {
    /// Load and decode an image file (PNG, JPEG, ...).
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let decoded = image::open(path)
            .map_err(|err| BildwerkError::ImageDecode(format!("cannot read {}: {}", path.display(), err)))?;
        let image = DecodedImage::from_dynamic(&decoded);
        debug!(width = image.width(), height = image.height(), alpha = image.has_alpha(), "image loaded");
        Ok(Self {
            path: path.to_path_buf(),
            image,
        })
    }

    pub fn from_image(path: impl Into<PathBuf>, image: DecodedImage) -> Self {
        Self {
            path: path.into(),
            image,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn image(&self) -> &DecodedImage {
        &self.image
    }
}

/// Add `image` to the document as a Flate-compressed DeviceRGB XObject, with
/// its alpha plane (if any) as a DeviceGray soft mask.
pub(crate) fn embed_image(doc: &mut Document, image: &DecodedImage) -> Result<ObjectId> {
    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => i64::from(image.width()),
        "Height" => i64::from(image.height()),
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
        "Filter" => "FlateDecode",
    };

    if let Some(alpha) = image.alpha() {
        let mask_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(image.width()),
                "Height" => i64::from(image.height()),
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
                "Filter" => "FlateDecode",
            },
            flate_encode(alpha)?,
        ));
        dict.set("SMask", mask_id);
    }

    Ok(doc.add_object(Stream::new(dict, flate_encode(image.rgb())?)))
}

/// Draw the XObject `xobject` on the page so that it fills `rect`
/// (user-space coordinates).
///
/// The first insertion on a page wraps the existing content in `q ... Q` so
/// that a graphics state left modified by the page cannot move the image.
/// Callers track the wrapped pages in `wrapped`.
pub(crate) fn draw_on_page(
    doc: &mut Document,
    page_id: ObjectId,
    xobject: ObjectId,
    rect: &PageRect,
    first_on_page: bool,
) -> Result<()> {
    let name = register_xobject(doc, page_id, xobject)?;

    let mut contents = page_contents(doc, page_id)?;
    if first_on_page && !contents.is_empty() {
        let open = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        let close = doc.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));
        contents.insert(0, Object::Reference(open));
        contents.push(Object::Reference(close));
    }

    let draw = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(rect.width() as f32),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(rect.height() as f32),
                    Object::Real(rect.x0 as f32),
                    Object::Real(rect.y0 as f32),
                ],
            ),
            Operation::new("Do", vec![Object::Name(name.clone().into_bytes())]),
            Operation::new("Q", vec![]),
        ],
    }
    .encode()
    .map_err(|err| BildwerkError::PdfError(format!("cannot encode drawing operators: {}", err)))?;
    let draw_id = doc.add_object(Stream::new(Dictionary::new(), draw));
    contents.push(Object::Reference(draw_id));

    page_mut(doc, page_id)?.set("Contents", Object::Array(contents));
    debug!(page = ?page_id, name, "image drawn");
    Ok(())
}

/// Give the page its own `/Resources` and `/XObject` dictionaries (copied from
/// whatever it inherited) and add `xobject` under a fresh name.
fn register_xobject(doc: &mut Document, page_id: ObjectId, xobject: ObjectId) -> Result<String> {
    let mut resources = effective_resources(doc, page_id).unwrap_or_default();
    let mut xobjects = dict_get(&resources, b"XObject")
        .and_then(|obj| dict_owned(obj, doc))
        .unwrap_or_default();

    let name = (0..)
        .map(|n| format!("{}{}", XOBJECT_PREFIX, n))
        .find(|candidate| !xobjects.has(candidate.as_bytes()))
        .unwrap_or_else(|| XOBJECT_PREFIX.to_string());

    xobjects.set(name.clone(), xobject);
    resources.set("XObject", xobjects);
    page_mut(doc, page_id)?.set("Resources", resources);
    Ok(name)
}

fn page_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary> {
    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|err| BildwerkError::PdfError(format!("page {:?} is not writable: {}", page_id, err)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::locate::locate_images;
    use crate::pdf::materialize::materialize;

    fn shared_resources_doc() -> (Document, ObjectId, ObjectId) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let shared = doc.add_object(dictionary! { "XObject" => dictionary! {} });
        let content = doc.add_object(Stream::new(Dictionary::new(), b"1 0 0 1 50 50 cm".to_vec()));
        let first = doc.add_object(dictionary! {
            "Type" => "Page", "Parent" => pages_id, "Resources" => shared, "Contents" => content,
        });
        let second = doc.add_object(dictionary! {
            "Type" => "Page", "Parent" => pages_id, "Resources" => shared,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(first), Object::Reference(second)],
                "Count" => 2,
                "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(612), Object::Integer(792)],
            }),
        );
        (doc, first, second)
    }

    #[test]
    fn drawn_image_is_found_at_its_rect() {
        let (mut doc, page, _) = shared_resources_doc();
        let image = DecodedImage::from_rgb(2, 1, vec![255, 0, 0, 0, 0, 255]).unwrap();
        let xobject = embed_image(&mut doc, &image).unwrap();
        let rect = PageRect::new(72.0, 648.0, 216.0, 720.0);
        draw_on_page(&mut doc, page, xobject, &rect, true).unwrap();

        // The page's dangling `cm` is isolated by the q/Q wrap.
        let placements = locate_images(&doc, page);
        assert_eq!(placements.len(), 1);
        assert_eq!(placements[0].object_id, xobject);
        assert!(placements[0].rect.approx_eq(&rect, 1e-3));
        assert_eq!(materialize(&doc, xobject).unwrap(), image);
    }

    #[test]
    fn sibling_pages_keep_their_resources() {
        let (mut doc, first, second) = shared_resources_doc();
        let image = DecodedImage::from_rgb(1, 1, vec![1, 2, 3]).unwrap();
        let xobject = embed_image(&mut doc, &image).unwrap();
        draw_on_page(&mut doc, first, xobject, &PageRect::new(0.0, 0.0, 10.0, 10.0), true).unwrap();

        let untouched = effective_resources(&doc, second).unwrap();
        let xobjects = dict_get(&untouched, b"XObject").and_then(|o| dict_owned(o, &doc)).unwrap();
        assert!(xobjects.is_empty());
        assert!(locate_images(&doc, second).is_empty());
    }

    #[test]
    fn repeated_draws_use_fresh_names() {
        let (mut doc, page, _) = shared_resources_doc();
        let image = DecodedImage::from_rgb(1, 1, vec![9, 9, 9]).unwrap();
        let xobject = embed_image(&mut doc, &image).unwrap();
        draw_on_page(&mut doc, page, xobject, &PageRect::new(0.0, 0.0, 10.0, 10.0), true).unwrap();
        draw_on_page(&mut doc, page, xobject, &PageRect::new(20.0, 20.0, 30.0, 30.0), false).unwrap();

        let resources = effective_resources(&doc, page).unwrap();
        let xobjects = dict_get(&resources, b"XObject").and_then(|o| dict_owned(o, &doc)).unwrap();
        assert!(xobjects.has(b"BwImg0") && xobjects.has(b"BwImg1"));
        // open q, original, close Q, two draws
        assert_eq!(page_contents(&doc, page).unwrap().len(), 5);
        assert_eq!(locate_images(&doc, page).len(), 2);
    }

    #[test]
    fn alpha_is_embedded_as_soft_mask() {
        let (mut doc, page, _) = shared_resources_doc();
        let mut image = DecodedImage::from_rgb(2, 1, vec![0; 6]).unwrap();
        image.set_alpha(vec![0, 200]).unwrap();
        let xobject = embed_image(&mut doc, &image).unwrap();
        draw_on_page(&mut doc, page, xobject, &PageRect::new(0.0, 0.0, 1.0, 1.0), true).unwrap();

        let round_trip = materialize(&doc, xobject).unwrap();
        assert_eq!(round_trip.alpha(), Some(&[0u8, 200][..]));
    }

    #[test]
    fn missing_image_file_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PageImageSource::load(dir.path().join("absent.png")).unwrap_err();
        assert!(matches!(err, BildwerkError::ImageDecode(_)));
    }
}
