use crate::decoded_image::{min_max_u16, normalize_u16};
use crate::enums::Orientation;

use image::ImageBuffer;
use image::Luma;
use ndarray::Array3;
use ndarray::ArrayView2;
use ndarray::s;
use rayon::prelude::*;

/// Reconstructed volumetric scan: a stack of slices with voxel spacing.
///
/// The array is indexed as (depth, height, width).
#[derive(Debug, Default)]
pub struct Volume {
    data: Array3<u16>,
    spacing: (f32, f32, f32),
}

impl Volume {
    pub fn new(data: Array3<u16>, spacing: (f32, f32, f32)) -> Self {
        Self { data, spacing }
    }

    /// Get the dimensions of the volume (depth, height, width)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Get a reference to the underlying data
    pub fn data(&self) -> &Array3<u16> {
        &self.data
    }

    /// Voxel spacing as (row spacing, column spacing, slice thickness)
    pub fn spacing(&self) -> (f32, f32, f32) {
        self.spacing
    }

    pub fn slice_from_axis(
        &self,
        index: usize,
        orientation: Orientation,
    ) -> Option<ArrayView2<'_, u16>> {
        if !self.is_valid_index(index, orientation) {
            return None;
        }
        let slice = match orientation {
            Orientation::Axial => self.data.slice(s![index, .., ..]),
            Orientation::Coronal => self.data.slice(s![.., index, ..]),
            Orientation::Sagittal => self.data.slice(s![.., .., index]),
        };
        Some(slice)
    }

    /// Render a slice as an 8-bit grayscale image, stretching the slice's
    /// value range to full contrast.
    pub fn slice_image(
        &self,
        index: usize,
        orientation: Orientation,
    ) -> Option<ImageBuffer<Luma<u8>, Vec<u8>>> {
        let slice = self.slice_from_axis(index, orientation)?;
        Self::slice_to_image(&slice)
    }

    fn slice_to_image(slice: &ArrayView2<'_, u16>) -> Option<ImageBuffer<Luma<u8>, Vec<u8>>> {
        let (height, width) = slice.dim();
        let (min, max) = min_max_u16(slice.as_slice().unwrap_or(&[]))
            .or_else(|| min_max_view(slice))?;
        let pixel_data: Vec<u8> = slice
            .into_par_iter()
            .map(|&value| normalize_u16(value, min, max))
            .collect();
        ImageBuffer::from_raw(width as u32, height as u32, pixel_data)
    }

    fn is_valid_index(&self, index: usize, orientation: Orientation) -> bool {
        let dim = self.data.dim();
        let max_index = match orientation {
            Orientation::Axial => dim.0,
            Orientation::Coronal => dim.1,
            Orientation::Sagittal => dim.2,
        };
        index < max_index
    }
}

// Coronal and sagittal views are not contiguous, so the slice fast path
// falls back to an element walk.
fn min_max_view(slice: &ArrayView2<'_, u16>) -> Option<(u16, u16)> {
    slice.iter().copied().fold(None, |acc, value| match acc {
        None => Some((value, value)),
        Some((min, max)) => Some((min.min(value), max.max(value))),
    })
}
