// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Decoded RGB(+alpha) raster produced by the materializer.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use bildwerk_core::error::{BildwerkError, Result};
use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};
use tracing::{debug, instrument};

/// A width x height raster in RGB with an optional separate alpha plane,
/// one byte per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    width: u32,
    height: u32,
    rgb: Vec<u8>,
    alpha: Option<Vec<u8>>,
}

impl DecodedImage {
    // -- Construction ---------------------------------------------------------

    /// Wrap `rgb` (3 bytes per pixel). Fails when the buffer does not match the
    /// dimensions.
    pub fn from_rgb(width: u32, height: u32, rgb: Vec<u8>) -> Result<Self> {
        let expected = pixel_count(width, height) * 3;
        if rgb.len() != expected {
            return Err(BildwerkError::ImageDecode(format!(
                "RGB buffer holds {} bytes, {}x{} needs {}",
                rgb.len(),
                width,
                height,
                expected
            )));
        }
        Ok(Self {
            width,
            height,
            rgb,
            alpha: None,
        })
    }

    /// Convert any decoded raster. An alpha channel that is fully opaque is
    /// dropped.
    pub fn from_dynamic(image: &DynamicImage) -> Self {
        let (width, height) = (image.width(), image.height());
        if !image.color().has_alpha() {
            return Self {
                width,
                height,
                rgb: image.to_rgb8().into_raw(),
                alpha: None,
            };
        }

        let rgba = image.to_rgba8().into_raw();
        let mut rgb = Vec::with_capacity(pixel_count(width, height) * 3);
        let mut alpha = Vec::with_capacity(pixel_count(width, height));
        for px in rgba.chunks_exact(4) {
            rgb.extend_from_slice(&px[..3]);
            alpha.push(px[3]);
        }
        let alpha = alpha.iter().any(|&a| a != u8::MAX).then_some(alpha);
        Self {
            width,
            height,
            rgb,
            alpha,
        }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn has_alpha(&self) -> bool {
        self.alpha.is_some()
    }

    /// Channels per pixel: 3, or 4 with alpha.
    pub fn components(&self) -> usize {
        if self.has_alpha() { 4 } else { 3 }
    }

    pub fn rgb(&self) -> &[u8] {
        &self.rgb
    }

    pub fn alpha(&self) -> Option<&[u8]> {
        self.alpha.as_deref()
    }

    // -- Pixel operations -----------------------------------------------------

    /// Invert every color sample (255 - v). Alpha is left alone.
    pub fn invert_colors(&mut self) {
        for value in &mut self.rgb {
            *value = u8::MAX - *value;
        }
    }

    /// Attach `alpha` as the opacity plane, replacing any previous one.
    pub fn set_alpha(&mut self, alpha: Vec<u8>) -> Result<()> {
        if alpha.len() != pixel_count(self.width, self.height) {
            return Err(BildwerkError::ImageDecode(format!(
                "alpha plane holds {} bytes, {}x{} needs {}",
                alpha.len(),
                self.width,
                self.height,
                pixel_count(self.width, self.height)
            )));
        }
        self.alpha = Some(alpha);
        Ok(())
    }

    /// Composite onto opaque white, leaving a 3-channel image.
    pub fn flatten(mut self) -> Self {
        if let Some(alpha) = self.alpha.take() {
            for (px, &a) in self.rgb.chunks_exact_mut(3).zip(&alpha) {
                let a = u32::from(a);
                for channel in px {
                    *channel = ((u32::from(*channel) * a + 255 * (255 - a)) / 255) as u8;
                }
            }
        }
        self
    }

    // -- Export ---------------------------------------------------------------

    /// `Rgb8`, or `Rgba8` when an alpha plane is present.
    pub fn to_dynamic(&self) -> Result<DynamicImage> {
        let invalid = || BildwerkError::ImageDecode("pixel buffer does not match dimensions".to_string());
        match &self.alpha {
            None => RgbImage::from_raw(self.width, self.height, self.rgb.clone())
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(invalid),
            Some(alpha) => {
                let mut rgba = Vec::with_capacity(alpha.len() * 4);
                for (px, &a) in self.rgb.chunks_exact(3).zip(alpha) {
                    rgba.extend_from_slice(px);
                    rgba.push(a);
                }
                RgbaImage::from_raw(self.width, self.height, rgba)
                    .map(DynamicImage::ImageRgba8)
                    .ok_or_else(invalid)
            }
        }
    }

    /// Write a PNG file. The file handle is closed on every path.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let image = self.to_dynamic()?;
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        image
            .write_to(&mut writer, ImageFormat::Png)
            .map_err(|err| BildwerkError::Save(format!("cannot write {}: {}", path.display(), err)))?;
        debug!(width = self.width, height = self.height, alpha = self.has_alpha(), "PNG written");
        Ok(())
    }
}

fn pixel_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}
