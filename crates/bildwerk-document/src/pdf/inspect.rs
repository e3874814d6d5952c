// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image dictionary inspection: /Decode polarity.

use std::sync::LazyLock;

use lopdf::{Document, Object, ObjectId};
use regex::Regex;
use tracing::{debug, warn};

/// `/Decode [a b ...]`, capturing the first two numeric operands.
static DECODE_PAIR: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"/Decode\s*\[\s*([+-]?(?:\d+\.?\d*|\.\d+))\s+([+-]?(?:\d+\.?\d*|\.\d+))").ok()
});

/// Whether the image object `id` maps samples through an inverted
/// `/Decode [1 0 ...]` array.
///
/// Reads the object's uncompressed dictionary text. An object that cannot be
/// read counts as not inverted.
pub fn is_decode_inverted(doc: &Document, id: ObjectId) -> bool {
    match doc.get_object(id) {
        Ok(object) => {
            let inverted = decode_text_is_inverted(&dictionary_text(object));
            if inverted {
                debug!(object = ?id, "inverted /Decode array");
            }
            inverted
        }
        Err(err) => {
            warn!(object = ?id, %err, "cannot read image dictionary, assuming normal polarity");
            false
        }
    }
}

/// Whether a dictionary's text contains a `/Decode` entry whose first two
/// operands are exactly 1 and 0. Whitespace and decimal spelling (`1.0`,
/// `0.00`) do not matter.
pub fn decode_text_is_inverted(text: &str) -> bool {
    let Some(pattern) = DECODE_PAIR.as_ref() else {
        return false;
    };
    pattern.captures(text).is_some_and(|caps| {
        let first = caps[1].parse::<f64>().ok();
        let second = caps[2].parse::<f64>().ok();
        first == Some(1.0) && second == Some(0.0)
    })
}

/// PDF text of an object, as lopdf prints it. Streams contribute their
/// dictionary only.
pub fn dictionary_text(object: &Object) -> String {
    match object {
        Object::Stream(stream) => format!("{:?}", stream.dict),
        other => format!("{:?}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{Stream, dictionary};

    #[test]
    fn detects_inverted_spellings() {
        for text in [
            "<</Decode[1 0]>>",
            "<< /Decode [ 1 0 ] >>",
            "<</Width 4/Decode[1.0 0.0]/Height 4>>",
            "<</Decode\n[\n1.00\t0\n1 0 1 0]>>",
        ] {
            assert!(decode_text_is_inverted(text), "{text}");
        }
    }

    #[test]
    fn normal_or_missing_decode_is_not_inverted() {
        assert!(!decode_text_is_inverted("<</Decode[0 1]>>"));
        assert!(!decode_text_is_inverted("<</Decode[10 0]>>"));
        assert!(!decode_text_is_inverted("<</DecodeParms<</Predictor 15>>>>"));
        assert!(!decode_text_is_inverted("<</Width 1/Height 1>>"));
        assert!(!decode_text_is_inverted("<</Decode 7 0 R>>"));
    }

    #[test]
    fn stream_text_is_the_dictionary() {
        let stream = Object::Stream(Stream::new(
            dictionary! { "Subtype" => "Image", "Decode" => vec![Object::Integer(1), Object::Integer(0)] },
            b"BI binary".to_vec(),
        ));
        assert_eq!(dictionary_text(&stream), "<</Subtype /Image/Decode [1 0]>>");
    }

    #[test]
    fn inspects_image_objects() {
        let mut doc = lopdf::Document::with_version("1.5");
        let inverted = doc.add_object(Stream::new(
            dictionary! {
                "Subtype" => "Image",
                "Decode" => vec![Object::Real(1.0), Object::Integer(0)],
            },
            vec![0],
        ));
        let normal = doc.add_object(Stream::new(
            dictionary! { "Subtype" => "Image", "Decode" => vec![Object::Integer(0), Object::Integer(1)] },
            vec![0],
        ));
        assert!(is_decode_inverted(&doc, inverted));
        assert!(!is_decode_inverted(&doc, normal));
        assert!(!is_decode_inverted(&doc, (999, 0)));
    }
}
