// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Small lopdf object helpers shared by the PDF modules.

use bildwerk_core::error::{BildwerkError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// Upper bound on `/Parent` hops, guards against cyclic page trees.
const MAX_PARENT_HOPS: usize = 64;

pub(crate) fn dict_get<'a>(dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    dict.get(key).ok()
}

/// Follow a single indirect reference; anything else is returned as is.
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Owned copy of a dictionary given inline or by reference.
pub(crate) fn dict_owned(obj: &Object, doc: &Document) -> Option<Dictionary> {
    match resolve(doc, obj) {
        Object::Dictionary(dict) => Some(dict.clone()),
        _ => None,
    }
}

pub(crate) fn as_f64(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

pub(crate) fn name_of(obj: &Object) -> Option<&[u8]> {
    match obj {
        Object::Name(name) => Some(name.as_slice()),
        _ => None,
    }
}

/// Six numbers of a matrix array (`/Matrix`, `cm` operands).
pub(crate) fn matrix_values(values: &[Object]) -> Option<[f64; 6]> {
    if values.len() != 6 {
        return None;
    }
    let mut out = [0.0; 6];
    for (slot, value) in out.iter_mut().zip(values) {
        *slot = as_f64(value)?;
    }
    Some(out)
}

/// Non-negative integer entry of an image dictionary.
pub(crate) fn dict_get_u32(doc: &Document, dict: &Dictionary, key: &[u8]) -> Result<u32> {
    let value = dict_get(dict, key).map(|obj| resolve(doc, obj)).ok_or_else(|| {
        BildwerkError::ImageDecode(format!(
            "missing required key /{}",
            String::from_utf8_lossy(key)
        ))
    })?;
    let number = match value {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    };
    match number {
        Some(n) if (0.0..=f64::from(u32::MAX)).contains(&n) => Ok(n as u32),
        _ => Err(BildwerkError::ImageDecode(format!(
            "/{} is not a valid size: {:?}",
            String::from_utf8_lossy(key),
            value
        ))),
    }
}

/// Page dictionary for `page_id`.
pub(crate) fn page_dict(doc: &Document, page_id: ObjectId) -> Result<&Dictionary> {
    doc.get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|err| BildwerkError::PdfError(format!("page {:?} is unreadable: {}", page_id, err)))
}

/// Resources of a page, inherited through the `/Parent` chain when the page
/// has none of its own.
pub(crate) fn effective_resources(doc: &Document, page_id: ObjectId) -> Option<Dictionary> {
    let mut current = doc.get_object(page_id).ok()?.as_dict().ok()?;
    for _ in 0..MAX_PARENT_HOPS {
        if let Some(obj) = dict_get(current, b"Resources") {
            return dict_owned(obj, doc);
        }
        match dict_get(current, b"Parent") {
            Some(Object::Reference(parent_id)) => {
                current = doc.get_object(*parent_id).ok()?.as_dict().ok()?;
            }
            _ => break,
        }
    }
    None
}

/// MediaBox of a page as `(llx, lly, urx, ury)`, inherited through `/Parent`.
/// Corners are normalised so that `llx <= urx` and `lly <= ury`.
pub(crate) fn effective_mediabox(doc: &Document, page_id: ObjectId) -> Option<(f64, f64, f64, f64)> {
    let mut current = doc.get_object(page_id).ok()?.as_dict().ok()?;
    for _ in 0..MAX_PARENT_HOPS {
        if let Some(Object::Array(values)) = dict_get(current, b"MediaBox").map(|obj| resolve(doc, obj)) {
            if values.len() != 4 {
                return None;
            }
            let x0 = as_f64(resolve(doc, &values[0]))?;
            let y0 = as_f64(resolve(doc, &values[1]))?;
            let x1 = as_f64(resolve(doc, &values[2]))?;
            let y1 = as_f64(resolve(doc, &values[3]))?;
            return Some((x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)));
        }
        match dict_get(current, b"Parent") {
            Some(Object::Reference(parent_id)) => {
                current = doc.get_object(*parent_id).ok()?.as_dict().ok()?;
            }
            _ => break,
        }
    }
    None
}

/// Entries of a page's `/Contents`, flattened to a list of objects (normally
/// references to content streams).
pub(crate) fn page_contents(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>> {
    let page = page_dict(doc, page_id)?;
    Ok(match dict_get(page, b"Contents") {
        None | Some(Object::Null) => Vec::new(),
        Some(Object::Array(items)) => items.clone(),
        Some(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Some(other) => vec![other.clone()],
    })
}

/// The individual content streams of a page, in drawing order.
pub(crate) fn page_content_streams<'a>(doc: &'a Document, page_id: ObjectId) -> Result<Vec<&'a Stream>> {
    let page = page_dict(doc, page_id)?;
    let mut streams = Vec::new();
    let mut push = |obj: &'a Object| {
        if let Object::Stream(stream) = resolve(doc, obj) {
            streams.push(stream);
        }
    };
    match dict_get(page, b"Contents").map(|obj| resolve(doc, obj)) {
        Some(Object::Array(items)) => items.iter().for_each(&mut push),
        Some(other) => push(other),
        None => {}
    }
    Ok(streams)
}

/// Plain bytes of a content stream (decompressed if the stream is filtered).
pub(crate) fn content_bytes(stream: &Stream) -> Result<Vec<u8>> {
    if stream.dict.get(b"Filter").is_ok() {
        stream
            .decompressed_content()
            .map_err(|err| BildwerkError::PdfError(format!("content stream decompression failed: {}", err)))
    } else {
        Ok(stream.content.clone())
    }
}
