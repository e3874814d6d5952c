// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raw sample decoding for image XObjects: filters, bit depths, color spaces.

use bildwerk_core::error::{BildwerkError, Result};
use image::ImageFormat;
use lopdf::{Document, Object, ObjectId, Stream};
use tracing::{debug, warn};

use super::filters::{FilteredData, decode_filters};
use super::objects::{content_bytes, dict_get, dict_get_u32, name_of, resolve};

/// Nesting limit for color space definitions (`/Indexed` over `/ICCBased` ...).
const MAX_COLOR_SPACE_DEPTH: usize = 4;

/// Color model of a decoded sample buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorModel {
    Gray,
    Rgb,
    Cmyk,
}

impl ColorModel {
    pub fn components(self) -> usize {
        match self {
            Self::Gray => 1,
            Self::Rgb => 3,
            Self::Cmyk => 4,
        }
    }
}

/// One byte per sample, interleaved, in the image's native color model.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSamples {
    pub width: u32,
    pub height: u32,
    pub model: ColorModel,
    pub data: Vec<u8>,
}

impl RawSamples {
    fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// RGB bytes. CMYK uses the plain subtractive model, gray is replicated.
    pub fn into_rgb(self) -> Vec<u8> {
        match self.model {
            ColorModel::Rgb => self.data,
            ColorModel::Gray => self.data.iter().flat_map(|&v| [v, v, v]).collect(),
            ColorModel::Cmyk => {
                let mut rgb = Vec::with_capacity(self.pixel_count() * 3);
                for px in self.data.chunks_exact(4) {
                    let white = 255 - u16::from(px[3]);
                    for &ink in &px[..3] {
                        rgb.push(((255 - u16::from(ink)) * white / 255) as u8);
                    }
                }
                rgb
            }
        }
    }

    /// Single-channel bytes, as used for soft masks.
    pub fn into_gray(self) -> Vec<u8> {
        match self.model {
            ColorModel::Gray => self.data,
            _ => {
                let rgb = self.into_rgb();
                rgb.chunks_exact(3)
                    .map(|px| {
                        let luma = 299 * u32::from(px[0]) + 587 * u32::from(px[1]) + 114 * u32::from(px[2]);
                        (luma / 1000) as u8
                    })
                    .collect()
            }
        }
    }
}

/// The image XObject stream behind `id`.
pub fn image_stream(doc: &Document, id: ObjectId) -> Result<&Stream> {
    let stream = doc
        .get_object(id)
        .and_then(Object::as_stream)
        .map_err(|err| BildwerkError::ImageDecode(format!("object {:?} is not a stream: {}", id, err)))?;
    match dict_get(&stream.dict, b"Subtype").and_then(name_of) {
        Some(b"Image") => Ok(stream),
        _ => Err(BildwerkError::ImageDecode(format!("object {:?} is not an image XObject", id))),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ColorSpace {
    Device(ColorModel),
    /// A single colorant where tint 1 means full ink.
    Tint,
    Indexed {
        base: Box<ColorSpace>,
        hival: usize,
        lookup: Vec<u8>,
    },
}

impl ColorSpace {
    fn components(&self) -> usize {
        match self {
            Self::Device(model) => model.components(),
            Self::Tint | Self::Indexed { .. } => 1,
        }
    }

    fn output_model(&self) -> ColorModel {
        match self {
            Self::Device(model) => *model,
            Self::Tint => ColorModel::Gray,
            Self::Indexed { base, .. } => base.output_model(),
        }
    }
}

/// Decode an image stream into native-model samples.
pub fn decode_samples(doc: &Document, stream: &Stream) -> Result<RawSamples> {
    let dict = &stream.dict;
    let width = dict_get_u32(doc, dict, b"Width")?;
    let height = dict_get_u32(doc, dict, b"Height")?;
    if width == 0 || height == 0 {
        return Err(BildwerkError::ImageDecode(format!("empty image {}x{}", width, height)));
    }

    let data = match decode_filters(doc, stream)? {
        FilteredData::Jpeg(jpeg) => return decode_jpeg(&jpeg, width, height),
        FilteredData::Samples(data) => data,
    };

    let is_mask = matches!(dict_get(dict, b"ImageMask").map(|obj| resolve(doc, obj)), Some(Object::Boolean(true)));
    let (space, bits) = if is_mask {
        (ColorSpace::Device(ColorModel::Gray), 1)
    } else {
        let space_obj = dict_get(dict, b"ColorSpace")
            .ok_or_else(|| BildwerkError::ImageDecode("image has no /ColorSpace".to_string()))?;
        let bits = match dict_get(dict, b"BitsPerComponent") {
            Some(_) => dict_get_u32(doc, dict, b"BitsPerComponent")?,
            None => 8,
        };
        (resolve_color_space(doc, space_obj, 0)?, bits)
    };

    let components = space.components();
    let scale = !matches!(space, ColorSpace::Indexed { .. });
    let unpacked = unpack(&data, width, height, components, bits, scale)?;

    let model = space.output_model();
    let samples = match &space {
        ColorSpace::Device(_) => unpacked,
        ColorSpace::Tint => unpacked.into_iter().map(|v| 255 - v).collect(),
        ColorSpace::Indexed { base, hival, lookup } => expand_indexed(&unpacked, base, *hival, lookup),
    };

    debug!(width, height, bits, ?model, "image samples decoded");
    Ok(RawSamples {
        width,
        height,
        model,
        data: samples,
    })
}

fn decode_jpeg(jpeg: &[u8], width: u32, height: u32) -> Result<RawSamples> {
    let decoded = image::load_from_memory_with_format(jpeg, ImageFormat::Jpeg)
        .map_err(|err| BildwerkError::ImageDecode(format!("JPEG decode error: {}", err)))?;
    if decoded.width() != width || decoded.height() != height {
        warn!(
            declared = ?(width, height),
            actual = ?(decoded.width(), decoded.height()),
            "JPEG size differs from image dictionary, using JPEG size"
        );
    }
    let (model, data) = if decoded.color().has_color() {
        (ColorModel::Rgb, decoded.to_rgb8().into_raw())
    } else {
        (ColorModel::Gray, decoded.to_luma8().into_raw())
    };
    Ok(RawSamples {
        width: decoded.width(),
        height: decoded.height(),
        model,
        data,
    })
}

fn resolve_color_space(doc: &Document, obj: &Object, depth: usize) -> Result<ColorSpace> {
    if depth > MAX_COLOR_SPACE_DEPTH {
        return Err(BildwerkError::ImageDecode("color space nesting too deep".to_string()));
    }
    let unsupported = |name: &[u8]| {
        BildwerkError::ImageDecode(format!(
            "unsupported color space /{}",
            String::from_utf8_lossy(name)
        ))
    };

    match resolve(doc, obj) {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"G" | b"CalGray" => Ok(ColorSpace::Device(ColorModel::Gray)),
            b"DeviceRGB" | b"RGB" | b"CalRGB" => Ok(ColorSpace::Device(ColorModel::Rgb)),
            b"DeviceCMYK" | b"CMYK" => Ok(ColorSpace::Device(ColorModel::Cmyk)),
            other => Err(unsupported(other)),
        },
        Object::Array(items) => {
            let family = items.first().map(|item| resolve(doc, item)).and_then(name_of).unwrap_or_default();
            match family {
                b"DeviceGray" | b"CalGray" => Ok(ColorSpace::Device(ColorModel::Gray)),
                b"DeviceRGB" | b"CalRGB" => Ok(ColorSpace::Device(ColorModel::Rgb)),
                b"DeviceCMYK" => Ok(ColorSpace::Device(ColorModel::Cmyk)),
                b"ICCBased" => icc_based(doc, items.get(1), depth),
                b"Indexed" | b"I" => indexed(doc, items, depth),
                b"Separation" => Ok(ColorSpace::Tint),
                b"DeviceN" => match items.get(1).map(|names| resolve(doc, names)) {
                    Some(Object::Array(names)) => match names.len() {
                        1 => Ok(ColorSpace::Tint),
                        3 => Ok(ColorSpace::Device(ColorModel::Rgb)),
                        4 => Ok(ColorSpace::Device(ColorModel::Cmyk)),
                        n => Err(BildwerkError::ImageDecode(format!(
                            "DeviceN with {} colorants is not supported",
                            n
                        ))),
                    },
                    _ => Err(BildwerkError::ImageDecode("malformed /DeviceN".to_string())),
                },
                other => Err(unsupported(other)),
            }
        }
        other => Err(BildwerkError::ImageDecode(format!("malformed /ColorSpace {:?}", other))),
    }
}

fn icc_based(doc: &Document, profile: Option<&Object>, depth: usize) -> Result<ColorSpace> {
    let Some(Object::Stream(profile)) = profile.map(|obj| resolve(doc, obj)) else {
        return Err(BildwerkError::ImageDecode("/ICCBased without a profile stream".to_string()));
    };
    match dict_get(&profile.dict, b"N").and_then(|n| resolve(doc, n).as_i64().ok()) {
        Some(1) => Ok(ColorSpace::Device(ColorModel::Gray)),
        Some(3) => Ok(ColorSpace::Device(ColorModel::Rgb)),
        Some(4) => Ok(ColorSpace::Device(ColorModel::Cmyk)),
        _ => match dict_get(&profile.dict, b"Alternate") {
            Some(alternate) => resolve_color_space(doc, alternate, depth + 1),
            None => Err(BildwerkError::ImageDecode("/ICCBased profile without /N".to_string())),
        },
    }
}

fn indexed(doc: &Document, items: &[Object], depth: usize) -> Result<ColorSpace> {
    let (Some(base), Some(hival), Some(lookup)) = (items.get(1), items.get(2), items.get(3)) else {
        return Err(BildwerkError::ImageDecode("malformed /Indexed color space".to_string()));
    };
    let base = resolve_color_space(doc, base, depth + 1)?;
    if matches!(base, ColorSpace::Indexed { .. }) {
        return Err(BildwerkError::ImageDecode("/Indexed over /Indexed".to_string()));
    }
    let hival = resolve(doc, hival)
        .as_i64()
        .map_err(|_| BildwerkError::ImageDecode("/Indexed hival is not an integer".to_string()))?
        .clamp(0, 255) as usize;
    let lookup = match resolve(doc, lookup) {
        Object::String(bytes, _) => bytes.clone(),
        Object::Stream(stream) => content_bytes(stream)
            .map_err(|err| BildwerkError::ImageDecode(format!("/Indexed lookup: {}", err)))?,
        other => {
            return Err(BildwerkError::ImageDecode(format!("malformed /Indexed lookup {:?}", other)));
        }
    };
    Ok(ColorSpace::Indexed {
        base: Box::new(base),
        hival,
        lookup,
    })
}

fn expand_indexed(indices: &[u8], base: &ColorSpace, hival: usize, lookup: &[u8]) -> Vec<u8> {
    let n = base.components();
    let tint = matches!(base, ColorSpace::Tint);
    let mut out = Vec::with_capacity(indices.len() * n);
    for &index in indices {
        let start = usize::from(index).min(hival) * n;
        for offset in 0..n {
            let value = lookup.get(start + offset).copied().unwrap_or(0);
            out.push(if tint { 255 - value } else { value });
        }
    }
    out
}

/// Unpack `bits`-per-sample rows into one byte per sample. With `scale`, values
/// are stretched to 0..=255; otherwise they are kept as is (palette indices).
fn unpack(data: &[u8], width: u32, height: u32, components: usize, bits: u32, scale: bool) -> Result<Vec<u8>> {
    // Dimensions come straight from the file.
    let too_large = || BildwerkError::ImageDecode(format!("image {}x{} is too large", width, height));
    let samples_per_row = (width as usize).checked_mul(components).ok_or_else(too_large)?;
    let row_bytes = samples_per_row
        .checked_mul(bits as usize)
        .ok_or_else(too_large)?
        .div_ceil(8);
    let needed = row_bytes.checked_mul(height as usize).ok_or_else(too_large)?;
    if data.len() < needed {
        return Err(BildwerkError::ImageDecode(format!(
            "sample buffer too short: expected {} bytes, got {}",
            needed,
            data.len()
        )));
    }

    let rows = data[..needed].chunks_exact(row_bytes);
    match bits {
        8 => Ok(data[..needed].to_vec()),
        16 => Ok(rows.flat_map(|row| row.iter().step_by(2).copied()).collect()),
        1 | 2 | 4 => {
            let max = (1u16 << bits) - 1;
            let per_byte = 8 / bits as usize;
            let mut out = Vec::with_capacity(samples_per_row * height as usize);
            for row in rows {
                for i in 0..samples_per_row {
                    let byte = row[i / per_byte];
                    let shift = 8 - bits as usize * (i % per_byte + 1);
                    let value = u16::from(byte >> shift) & max;
                    out.push(if scale { (value * 255 / max) as u8 } else { value as u8 });
                }
            }
            Ok(out)
        }
        other => Err(BildwerkError::ImageDecode(format!(
            "unsupported bits per component: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn image(dict: lopdf::Dictionary, data: Vec<u8>) -> (Document, Stream) {
        (Document::with_version("1.5"), Stream::new(dict, data))
    }

    #[test]
    fn huge_dimensions_are_an_image_error() {
        let (doc, stream) = image(
            dictionary! {
                "Width" => u32::MAX as i64, "Height" => u32::MAX as i64,
                "ColorSpace" => "DeviceCMYK", "BitsPerComponent" => 16,
            },
            vec![0; 16],
        );
        assert!(matches!(decode_samples(&doc, &stream), Err(BildwerkError::ImageDecode(_))));
    }

    #[test]
    fn rgb_8_bit() {
        let (doc, stream) = image(
            dictionary! {
                "Subtype" => "Image", "Width" => 2, "Height" => 1,
                "ColorSpace" => "DeviceRGB", "BitsPerComponent" => 8,
            },
            vec![255, 0, 0, 0, 0, 255],
        );
        let samples = decode_samples(&doc, &stream).unwrap();
        assert_eq!(samples.model, ColorModel::Rgb);
        assert_eq!(samples.data, vec![255, 0, 0, 0, 0, 255]);
    }

    #[test]
    fn one_bit_gray_rows_are_byte_aligned() {
        // 3 pixels per row: 101xxxxx, 010xxxxx
        let (doc, stream) = image(
            dictionary! {
                "Width" => 3, "Height" => 2,
                "ColorSpace" => "DeviceGray", "BitsPerComponent" => 1,
            },
            vec![0b1010_0000, 0b0100_0000],
        );
        let samples = decode_samples(&doc, &stream).unwrap();
        assert_eq!(samples.data, vec![255, 0, 255, 0, 255, 0]);
    }

    #[test]
    fn sixteen_bit_keeps_high_byte() {
        let (doc, stream) = image(
            dictionary! {
                "Width" => 2, "Height" => 1,
                "ColorSpace" => "DeviceGray", "BitsPerComponent" => 16,
            },
            vec![0x12, 0x34, 0xAB, 0xCD],
        );
        assert_eq!(decode_samples(&doc, &stream).unwrap().data, vec![0x12, 0xAB]);
    }

    #[test]
    fn indexed_palette_lookup() {
        let palette = vec![255, 0, 0, 0, 255, 0];
        let (doc, stream) = image(
            dictionary! {
                "Width" => 3, "Height" => 1, "BitsPerComponent" => 8,
                "ColorSpace" => vec![
                    Object::Name(b"Indexed".to_vec()),
                    Object::Name(b"DeviceRGB".to_vec()),
                    1.into(),
                    Object::string_literal(palette),
                ],
            },
            vec![1, 0, 9],
        );
        let samples = decode_samples(&doc, &stream).unwrap();
        assert_eq!(samples.model, ColorModel::Rgb);
        // Index 9 clamps to hival.
        assert_eq!(samples.data, vec![0, 255, 0, 255, 0, 0, 0, 255, 0]);
    }

    #[test]
    fn icc_based_uses_n() {
        let mut doc = Document::with_version("1.5");
        let profile = doc.add_object(Stream::new(dictionary! { "N" => 4 }, vec![]));
        let stream = Stream::new(
            dictionary! {
                "Width" => 1, "Height" => 1, "BitsPerComponent" => 8,
                "ColorSpace" => vec![Object::Name(b"ICCBased".to_vec()), profile.into()],
            },
            vec![0, 0, 0, 255],
        );
        let samples = decode_samples(&doc, &stream).unwrap();
        assert_eq!(samples.model, ColorModel::Cmyk);
        assert_eq!(samples.into_rgb(), vec![0, 0, 0]);
    }

    #[test]
    fn separation_is_subtractive() {
        let (doc, stream) = image(
            dictionary! {
                "Width" => 2, "Height" => 1, "BitsPerComponent" => 8,
                "ColorSpace" => vec![
                    Object::Name(b"Separation".to_vec()),
                    Object::Name(b"Spot".to_vec()),
                    Object::Name(b"DeviceGray".to_vec()),
                    Object::Null,
                ],
            },
            vec![0, 255],
        );
        assert_eq!(decode_samples(&doc, &stream).unwrap().data, vec![255, 0]);
    }

    #[test]
    fn image_mask_is_one_bit_gray() {
        let (doc, stream) = image(
            dictionary! { "Width" => 8, "Height" => 1, "ImageMask" => true },
            vec![0b1111_0000],
        );
        let samples = decode_samples(&doc, &stream).unwrap();
        assert_eq!(samples.model, ColorModel::Gray);
        assert_eq!(samples.data, vec![255, 255, 255, 255, 0, 0, 0, 0]);
    }

    #[test]
    fn short_buffer_is_rejected() {
        let (doc, stream) = image(
            dictionary! {
                "Width" => 4, "Height" => 4,
                "ColorSpace" => "DeviceRGB", "BitsPerComponent" => 8,
            },
            vec![0; 10],
        );
        assert!(matches!(
            decode_samples(&doc, &stream),
            Err(BildwerkError::ImageDecode(_))
        ));
    }

    #[test]
    fn cmyk_to_rgb_subtractive() {
        let samples = RawSamples {
            width: 2,
            height: 1,
            model: ColorModel::Cmyk,
            data: vec![0, 0, 0, 0, 255, 0, 0, 0],
        };
        assert_eq!(samples.into_rgb(), vec![255, 255, 255, 0, 255, 255]);
    }

    #[test]
    fn non_image_objects_are_refused() {
        let mut doc = Document::with_version("1.5");
        let form = doc.add_object(Stream::new(dictionary! { "Subtype" => "Form" }, vec![]));
        assert!(image_stream(&doc, form).is_err());
    }
}
