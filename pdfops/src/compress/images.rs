//! Lossy resampling of embedded raster images.
//!
//! Only images that can be decoded and re-encoded without changing their
//! meaning are touched: 8-bit DeviceRGB or DeviceGray samples, either raw,
//! Flate-compressed without predictors, or JPEG, with no masks or decode
//! arrays. Everything else is left as it is.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::{Dictionary, Document, Object, Stream};
use tracing::{debug, warn};

use crate::config::Quality;

#[derive(Debug, thiserror::Error)]
enum ResampleError {
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    #[error("failed to inflate image stream: {0}")]
    Inflate(String),

    #[error("sample buffer holds {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColorSpace {
    Rgb,
    Gray,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Raw,
    Flate,
    Jpeg,
}

/// An image XObject this module knows how to resample.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    width: u32,
    height: u32,
    color: ColorSpace,
    encoding: Encoding,
}

/// Resample every eligible image in `doc`. Returns how many were replaced.
pub(crate) fn resample_images(doc: &mut Document, quality: Quality) -> usize {
    let mut replaced = 0;

    for (id, object) in doc.objects.iter_mut() {
        let Object::Stream(stream) = object else {
            continue;
        };
        let Some(candidate) = candidate(&stream.dict) else {
            continue;
        };

        match resample(stream, candidate, quality) {
            Ok(resampled) if resampled.content.len() < stream.content.len() => {
                debug!(
                    object = ?id,
                    before = stream.content.len(),
                    after = resampled.content.len(),
                    "resampled image"
                );
                *stream = resampled;
                replaced += 1;
            }
            Ok(_) => debug!(object = ?id, "resampled image is not smaller, kept original"),
            Err(e) => warn!(object = ?id, error = %e, "image left unchanged"),
        }
    }

    replaced
}

fn candidate(dict: &Dictionary) -> Option<Candidate> {
    if dict.get(b"Subtype").and_then(Object::as_name).ok()? != b"Image" {
        return None;
    }
    if dict.has(b"SMask") || dict.has(b"Mask") || dict.has(b"Decode") {
        return None;
    }
    if matches!(dict.get(b"ImageMask"), Ok(Object::Boolean(true))) {
        return None;
    }
    if dict.get(b"BitsPerComponent").and_then(Object::as_i64).ok()? != 8 {
        return None;
    }

    let color = match dict.get(b"ColorSpace").and_then(Object::as_name).ok()? {
        b"DeviceRGB" => ColorSpace::Rgb,
        b"DeviceGray" => ColorSpace::Gray,
        _ => return None,
    };

    let encoding = match single_filter(dict)? {
        None => Encoding::Raw,
        Some(b"FlateDecode") if !dict.has(b"DecodeParms") => Encoding::Flate,
        Some(b"DCTDecode") => Encoding::Jpeg,
        Some(_) => return None,
    };

    let width = u32::try_from(dict.get(b"Width").and_then(Object::as_i64).ok()?).ok()?;
    let height = u32::try_from(dict.get(b"Height").and_then(Object::as_i64).ok()?).ok()?;
    if width == 0 || height == 0 {
        return None;
    }

    Some(Candidate {
        width,
        height,
        color,
        encoding,
    })
}

/// `Some(None)` for no filter, `Some(Some(name))` for exactly one filter,
/// `None` for filter chains or malformed entries.
fn single_filter(dict: &Dictionary) -> Option<Option<&[u8]>> {
    match dict.get(b"Filter") {
        Err(_) => Some(None),
        Ok(Object::Name(name)) => Some(Some(name.as_slice())),
        Ok(Object::Array(filters)) => match filters.as_slice() {
            [] => Some(None),
            [only] => only.as_name().ok().map(Some),
            _ => None,
        },
        Ok(_) => None,
    }
}

fn resample(stream: &Stream, candidate: Candidate, quality: Quality) -> Result<Stream, ResampleError> {
    let image = decode(stream, candidate)?;

    let scale = quality.scale_factor();
    let width = scaled(candidate.width, scale);
    let height = scaled(candidate.height, scale);
    let resized = image.resize_exact(width, height, FilterType::Lanczos3);

    let mut jpeg = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut jpeg, quality.get());
    resized
        .write_with_encoder(encoder)
        .map_err(ResampleError::Encode)?;

    let mut dict = stream.dict.clone();
    dict.remove(b"DecodeParms");
    dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
    dict.set("Width", i64::from(width));
    dict.set("Height", i64::from(height));

    Ok(Stream::new(dict, jpeg).with_compression(false))
}

fn decode(stream: &Stream, candidate: Candidate) -> Result<DynamicImage, ResampleError> {
    if candidate.encoding == Encoding::Jpeg {
        let image = image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg)
            .map_err(ResampleError::Decode)?;
        return Ok(match candidate.color {
            ColorSpace::Rgb => DynamicImage::ImageRgb8(image.to_rgb8()),
            ColorSpace::Gray => DynamicImage::ImageLuma8(image.to_luma8()),
        });
    }

    let samples = match candidate.encoding {
        Encoding::Flate => stream
            .decompressed_content()
            .map_err(|e| ResampleError::Inflate(e.to_string()))?,
        _ => stream.content.clone(),
    };

    let channels = match candidate.color {
        ColorSpace::Rgb => 3,
        ColorSpace::Gray => 1,
    };
    let expected = candidate.width as usize * candidate.height as usize * channels;
    if samples.len() < expected {
        return Err(ResampleError::BufferSize {
            expected,
            actual: samples.len(),
        });
    }
    let samples = samples[..expected].to_vec();

    let image = match candidate.color {
        ColorSpace::Rgb => RgbImage::from_raw(candidate.width, candidate.height, samples)
            .map(DynamicImage::ImageRgb8),
        ColorSpace::Gray => GrayImage::from_raw(candidate.width, candidate.height, samples)
            .map(DynamicImage::ImageLuma8),
    };

    image.ok_or(ResampleError::BufferSize {
        expected,
        actual: expected,
    })
}

fn scaled(dimension: u32, scale: f32) -> u32 {
    ((dimension as f32 * scale).round() as u32).max(1)
}
