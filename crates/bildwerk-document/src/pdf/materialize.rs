// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image materializer — image XObject to RGB(+alpha) raster.

use bildwerk_core::error::Result;
use lopdf::{Document, Object, ObjectId, Stream};
use tracing::{debug, instrument, warn};

use super::inspect::is_decode_inverted;
use super::objects::dict_get;
use super::samples::{decode_samples, image_stream};
use crate::image::DecodedImage;

/// Decode the image object `id` into a finished raster.
///
/// CMYK is converted to RGB, an inverted `/Decode` array is applied to the
/// color samples, and a `/SMask` of identical size becomes the alpha plane.
/// A soft mask that cannot be used is dropped with a warning; only a failure
/// to decode the image itself is an error.
#[instrument(skip(doc), fields(object = ?id))]
pub fn materialize(doc: &Document, id: ObjectId) -> Result<DecodedImage> {
    let stream = image_stream(doc, id)?;
    let samples = decode_samples(doc, stream)?;
    let (width, height) = (samples.width, samples.height);
    let mut image = DecodedImage::from_rgb(width, height, samples.into_rgb())?;

    if is_decode_inverted(doc, id) {
        image.invert_colors();
    }

    if let Some(mask_id) = soft_mask_ref(stream) {
        attach_soft_mask(doc, mask_id, &mut image);
    }

    debug!(width, height, alpha = image.has_alpha(), "image materialized");
    Ok(image)
}

fn soft_mask_ref(stream: &Stream) -> Option<ObjectId> {
    match dict_get(&stream.dict, b"SMask") {
        Some(Object::Reference(id)) => Some(*id),
        _ => None,
    }
}

fn attach_soft_mask(doc: &Document, mask_id: ObjectId, image: &mut DecodedImage) {
    let mask = match image_stream(doc, mask_id).and_then(|stream| decode_samples(doc, stream)) {
        Ok(mask) => mask,
        Err(err) => {
            warn!(mask = ?mask_id, %err, "soft mask unreadable, continuing without alpha");
            return;
        }
    };

    if (mask.width, mask.height) != (image.width(), image.height()) {
        warn!(
            mask = ?mask_id,
            image_size = ?(image.width(), image.height()),
            mask_size = ?(mask.width, mask.height),
            "soft mask size differs from image, dropping it"
        );
        return;
    }

    let mut alpha = mask.into_gray();
    if is_decode_inverted(doc, mask_id) {
        for value in &mut alpha {
            *value = u8::MAX - *value;
        }
    }
    if let Err(err) = image.set_alpha(alpha) {
        warn!(mask = ?mask_id, %err, "soft mask rejected");
    }
}
