use dicom::object::from_reader;
use dicom::pixeldata::{PhotometricInterpretation, PixelDecoder};
use image::{ImageBuffer, Luma};
use rayon::prelude::*;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("missing DICM marker in file data")]
    NotDicom,

    #[error("failed to read DICOM object: {0}")]
    Read(#[from] dicom::object::ReadError),

    #[error("failed to decode pixel data: {0}")]
    Pixels(#[from] dicom::pixeldata::Error),
}

/// In-memory raster representation of a single decoded DICOM image.
///
/// Only the first frame of multiframe objects is materialized. The pixel
/// buffer always holds `rows * columns * samples_per_pixel` values.
pub struct DecodedImage {
    rows: u32,
    columns: u32,
    samples_per_pixel: u16,
    bits_allocated: u16,
    photometric: PhotometricInterpretation,
    pixels: Vec<u16>,
}

impl std::fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedImage")
            .field("rows", &self.rows)
            .field("columns", &self.columns)
            .field("samples_per_pixel", &self.samples_per_pixel)
            .field("bits_allocated", &self.bits_allocated)
            .field("photometric", &self.photometric)
            .field("pixels", &self.pixels.len())
            .finish()
    }
}

impl DecodedImage {
    /// Decode a DICOM file from raw bytes.
    ///
    /// Accepts both full files (128-byte preamble followed by the `DICM`
    /// marker) and bare streams starting at the marker.
    pub fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        let dataset = dataset_bytes(data).ok_or(DecodeError::NotDicom)?;
        let object = from_reader(dataset)?;
        let decoded = object.decode_pixel_data()?;

        let pixels = decoded.to_vec_frame::<u16>(0)?;

        Ok(Self {
            rows: decoded.rows(),
            columns: decoded.columns(),
            samples_per_pixel: decoded.samples_per_pixel(),
            bits_allocated: decoded.bits_allocated(),
            photometric: decoded.photometric_interpretation().clone(),
            pixels,
        })
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn samples_per_pixel(&self) -> u16 {
        self.samples_per_pixel
    }

    pub fn bits_allocated(&self) -> u16 {
        self.bits_allocated
    }

    pub fn photometric_interpretation(&self) -> &PhotometricInterpretation {
        &self.photometric
    }

    pub fn pixels(&self) -> &[u16] {
        &self.pixels
    }

    /// Render a monochrome image to an 8-bit grayscale buffer, stretching
    /// the observed value range to full contrast. MONOCHROME1 data is
    /// inverted. Returns `None` for color images.
    pub fn to_luma8(&self) -> Option<ImageBuffer<Luma<u8>, Vec<u8>>> {
        if !self.photometric.is_monochrome() {
            return None;
        }

        let (min, max) = min_max_u16(&self.pixels)?;
        let invert = matches!(self.photometric, PhotometricInterpretation::Monochrome1);

        let pixel_data: Vec<u8> = self
            .pixels
            .par_iter()
            .map(|&value| {
                let gray = normalize_u16(value, min, max);
                if invert { 255 - gray } else { gray }
            })
            .collect();

        ImageBuffer::from_raw(self.columns, self.rows, pixel_data)
    }
}

/// Locate the start of the file meta group, skipping the preamble when
/// present.
pub(crate) fn dataset_bytes(data: &[u8]) -> Option<&[u8]> {
    if data.len() >= 132 && &data[128..132] == b"DICM" {
        return Some(&data[128..]);
    }
    if data.len() >= 4 && &data[..4] == b"DICM" {
        return Some(data);
    }
    None
}

pub(crate) fn min_max_u16(values: &[u16]) -> Option<(u16, u16)> {
    values.iter().copied().fold(None, |acc, value| match acc {
        None => Some((value, value)),
        Some((min, max)) => Some((min.min(value), max.max(value))),
    })
}

#[inline]
pub(crate) fn normalize_u16(value: u16, min: u16, max: u16) -> u8 {
    if max <= min {
        return 0;
    }

    let range = (max - min) as f32;
    let normalized = (value.saturating_sub(min)) as f32 / range;
    (normalized * 255.0).clamp(0.0, 255.0).round() as u8
}
