use crate::decoded_image::dataset_bytes;
use crate::{enums::SortBy, volume::Volume};

use dicom::{
    object::{FileDicomObject, InMemDicomObject, from_reader},
    pixeldata::{ConvertOptions, PixelDecoder, VoiLutOption},
};
use dicom_dictionary_std::tags;
use ndarray::{Array2, Array3, s};
use rayon::prelude::*;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SeriesReadError {
    #[error("series payload contains no files")]
    EmptyPayload,

    #[error("no valid DICOM images found in series")]
    NoValidImages,

    #[error("inconsistent image dimensions across series")]
    InconsistentDimensions,

    #[error("missing spacing information")]
    MissingSpacing,

    #[error("missing DICM marker in series file")]
    NotDicom,

    #[error("failed to read series file: {0}")]
    Read(#[from] dicom::object::ReadError),
}

/// Raw bytes of a multi-file DICOM series, passed by value into the
/// background decoder. No shared state crosses the worker boundary.
pub struct SeriesPayload {
    pub files: Vec<Vec<u8>>,
    pub sort_by: SortBy,
}

impl SeriesPayload {
    pub fn new(files: Vec<Vec<u8>>) -> Self {
        Self {
            files,
            sort_by: SortBy::default(),
        }
    }

    pub fn with_sort_by(mut self, sort_by: SortBy) -> Self {
        self.sort_by = sort_by;
        self
    }
}

pub struct SeriesReader;

impl SeriesReader {
    /// Reconstruct a volume from a series payload.
    ///
    /// Files are parsed in parallel, sorted by the requested order and
    /// stacked into a (depth, height, width) array. Slices whose pixel
    /// data cannot be decoded are skipped; a series with no decodable
    /// slice is an error.
    pub fn read(payload: &SeriesPayload) -> Result<Volume, SeriesReadError> {
        if payload.files.is_empty() {
            return Err(SeriesReadError::EmptyPayload);
        }

        let objects: Result<Vec<_>, _> = payload
            .files
            .par_iter()
            .map(|bytes| Self::open_bytes(bytes))
            .collect();

        Self::from_dicom_objects(&objects?, payload.sort_by)
    }

    /// Build a volume from already parsed DICOM objects.
    pub fn from_dicom_objects(
        dicom_objects: &[FileDicomObject<InMemDicomObject>],
        sort_by: SortBy,
    ) -> Result<Volume, SeriesReadError> {
        let mut images_with_order: Vec<_> = dicom_objects
            .iter()
            .filter_map(|dicom_object| Self::extract_image_with_order(dicom_object, sort_by))
            .collect();

        if images_with_order.is_empty() {
            return Err(SeriesReadError::NoValidImages);
        }

        Self::sort_images(&mut images_with_order, sort_by);

        let images: Vec<_> = images_with_order
            .into_iter()
            .map(|(_, image)| image)
            .collect();

        Self::validate_dimensions(&images)?;

        let volume_array = Self::build_volume_array(&images);
        let spacing = Self::get_spacing(dicom_objects).ok_or(SeriesReadError::MissingSpacing)?;

        Ok(Volume::new(volume_array, spacing))
    }

    fn open_bytes(bytes: &[u8]) -> Result<FileDicomObject<InMemDicomObject>, SeriesReadError> {
        let dataset = dataset_bytes(bytes).ok_or(SeriesReadError::NotDicom)?;
        Ok(from_reader(dataset)?)
    }

    fn extract_image_with_order(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        sort_by: SortBy,
    ) -> Option<(Option<f32>, Array2<u16>)> {
        let order = Self::get_sort_order(dicom_object, sort_by)?;
        let image_2d = Self::decode_image(dicom_object)?;
        Some((order, image_2d))
    }

    fn get_sort_order(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        sort_by: SortBy,
    ) -> Option<Option<f32>> {
        match sort_by {
            SortBy::ImagePositionPatient => {
                let pos = dicom_object
                    .element(tags::IMAGE_POSITION_PATIENT)
                    .ok()?
                    .to_multi_float32()
                    .ok()?;
                Some(pos.get(2).copied())
            }
            SortBy::TablePosition => {
                let pos = dicom_object
                    .element(tags::TABLE_POSITION)
                    .ok()?
                    .to_float32()
                    .ok();
                Some(pos)
            }
            SortBy::InstanceNumber => {
                let num = dicom_object
                    .element(tags::INSTANCE_NUMBER)
                    .ok()?
                    .to_int::<i32>()
                    .ok()
                    .map(|n| n as f32);
                Some(num)
            }
            SortBy::None => Some(Some(0.0)),
        }
    }

    fn decode_image(dicom_object: &FileDicomObject<InMemDicomObject>) -> Option<Array2<u16>> {
        let pixel_data = dicom_object.decode_pixel_data().ok()?;
        let options = ConvertOptions::new().with_voi_lut(VoiLutOption::First);
        pixel_data
            .to_ndarray_with_options::<u16>(&options)
            .ok()
            .map(|arr| arr.slice_move(s![0, .., .., 0]))
    }

    fn sort_images(images_with_order: &mut [(Option<f32>, Array2<u16>)], sort_by: SortBy) {
        if !matches!(sort_by, SortBy::None) {
            images_with_order
                .sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        }

        if matches!(sort_by, SortBy::ImagePositionPatient) {
            images_with_order.reverse();
        }
    }

    fn validate_dimensions(images: &[Array2<u16>]) -> Result<(), SeriesReadError> {
        let first_dim = images[0].dim();
        if images.iter().any(|img| img.dim() != first_dim) {
            return Err(SeriesReadError::InconsistentDimensions);
        }
        Ok(())
    }

    fn build_volume_array(images: &[Array2<u16>]) -> Array3<u16> {
        let (height, width) = images[0].dim();
        let depth = images.len();
        let mut volume = Array3::<u16>::zeros((depth, height, width));

        for (i, image) in images.iter().enumerate() {
            volume.slice_mut(s![i, .., ..]).assign(image);
        }

        volume
    }

    fn get_spacing(dicom_objects: &[FileDicomObject<InMemDicomObject>]) -> Option<(f32, f32, f32)> {
        dicom_objects.iter().find_map(|dicom_object| {
            let pixel_spacing = dicom_object
                .element(tags::PIXEL_SPACING)
                .ok()?
                .to_multi_float32()
                .ok()?;
            let row_spacing = pixel_spacing.first().copied()?;
            let column_spacing = pixel_spacing.get(1).copied()?;

            let slice_thickness = dicom_object
                .element(tags::SLICE_THICKNESS)
                .ok()?
                .to_float32()
                .ok()?;

            Some((row_spacing, column_spacing, slice_thickness))
        })
    }
}
