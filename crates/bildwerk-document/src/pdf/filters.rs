// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stream filter decoding for image XObjects.

use std::io::Write;

use bildwerk_core::error::{BildwerkError, Result};
use flate2::Compression;
use flate2::write::ZlibEncoder;
use lopdf::{Dictionary, Document, Object, Stream, dictionary};

use super::objects::{dict_get, dict_owned, name_of, resolve};

/// Image stream data after every non-image filter has been undone.
#[derive(Debug)]
pub(crate) enum FilteredData {
    /// Raw samples, packed as described by the image dictionary.
    Samples(Vec<u8>),
    /// A complete JPEG file (`/DCTDecode`).
    Jpeg(Vec<u8>),
}

/// Apply the stream's filter chain. `/DCTDecode` may only come last and is
/// handed back undecoded; everything before it goes through lopdf.
pub(crate) fn decode_filters(doc: &Document, stream: &Stream) -> Result<FilteredData> {
    let filters = filter_names(doc, &stream.dict);
    let (chain, jpeg) = match filters.split_last() {
        Some((last, rest)) if is_dct(last) => (rest, true),
        _ => (filters.as_slice(), false),
    };
    if chain.iter().any(|filter| is_dct(filter)) {
        return Err(BildwerkError::ImageDecode(
            "DCTDecode must be the last filter".to_string(),
        ));
    }

    let mut params = decode_parms(doc, &stream.dict, filters.len()).into_iter();
    let mut data = stream.content.clone();
    for filter in chain {
        data = decompress(filter, params.next().flatten(), data)?;
    }

    Ok(if jpeg {
        FilteredData::Jpeg(data)
    } else {
        FilteredData::Samples(data)
    })
}

fn is_dct(filter: &[u8]) -> bool {
    matches!(filter, b"DCTDecode" | b"DCT")
}

/// Undo one filter. lopdf only knows the full names of the filters it
/// decodes (Flate with predictors, LZW, ASCII85).
fn decompress(filter: &[u8], parms: Option<Dictionary>, data: Vec<u8>) -> Result<Vec<u8>> {
    let name: &[u8] = match filter {
        b"FlateDecode" | b"Fl" => b"FlateDecode",
        b"LZWDecode" | b"LZW" => b"LZWDecode",
        b"ASCII85Decode" | b"A85" => b"ASCII85Decode",
        other => {
            return Err(BildwerkError::ImageDecode(format!(
                "unsupported image filter /{}",
                String::from_utf8_lossy(other)
            )));
        }
    };

    let mut dict = dictionary! { "Filter" => Object::Name(name.to_vec()) };
    if let Some(parms) = parms {
        dict.set("DecodeParms", parms);
    }
    Stream::new(dict, data).decompressed_content().map_err(|err| {
        BildwerkError::ImageDecode(format!("/{} data: {}", String::from_utf8_lossy(name), err))
    })
}

fn filter_names(doc: &Document, dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict_get(dict, b"Filter").map(|obj| resolve(doc, obj)) {
        Some(Object::Name(name)) => vec![name.clone()],
        Some(Object::Array(items)) => items
            .iter()
            .filter_map(|item| name_of(resolve(doc, item)).map(<[u8]>::to_vec))
            .collect(),
        _ => Vec::new(),
    }
}

/// `/DecodeParms` per filter position. A single dictionary belongs to the
/// first filter.
fn decode_parms(doc: &Document, dict: &Dictionary, count: usize) -> Vec<Option<Dictionary>> {
    match dict_get(dict, b"DecodeParms").map(|obj| resolve(doc, obj)) {
        Some(Object::Array(items)) => items.iter().map(|item| dict_owned(item, doc)).collect(),
        Some(single @ Object::Dictionary(_)) => {
            let mut parms = vec![None; count.max(1)];
            parms[0] = dict_owned(single, doc);
            parms
        }
        _ => Vec::new(),
    }
}

/// Zlib-compress `data` for a `/FlateDecode` stream.
pub(crate) fn flate_encode(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|err| BildwerkError::PdfError(format!("flate encode failed: {}", err)))?;
    encoder
        .finish()
        .map_err(|err| BildwerkError::PdfError(format!("flate encode failed: {}", err)))
}
