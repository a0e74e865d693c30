//! # DICOM-acquire library
//!
//! This crate implements the acquisition pipeline that turns raw DICOM
//! bytes into displayable images and volumes.
//!
//! This library is part of the dicom-rs ecosystem and leverages its
//! components for parsing and pixel decoding. Two independent paths are
//! provided:
//!  - a foreground loader that registers a file handle in a
//!    session-scoped registry, decodes it into a [`DecodedImage`] and
//!    caches the result per registry entry
//!  - a background series decoder that receives the raw bytes of a
//!    multi-file series over a channel, reconstructs a [`Volume`] and
//!    always answers with exactly one tagged reply, even when decoding
//!    fails
//!
//! Heavy decoding is moved off the calling task with `spawn_blocking`
//! when the host has more than one execution unit; otherwise it runs
//! inline. Series files are parsed in parallel using rayon. DICOM files
//! are assumed to have the following attributes:
//!   - Axial data set
//!   - No multiframe (always the first frame is used)
//!   - Images from the same series (Series Instance UID)
//!
//! # Examples
//!
//! ## Loading a single image in the foreground
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use dicom_acquire::image_loader::ImageLoader;
//! # use dicom_acquire::registry::{FileHandle, ImageRegistry};
//! # async fn demo() {
//! let loader = ImageLoader::new(Arc::new(ImageRegistry::new()));
//! let handle = FileHandle::from_path("slice.dcm").expect("should have read file");
//! let image = loader
//!     .load_image(Some(handle))
//!     .await
//!     .expect("should have decoded image");
//! println!("{}x{}", image.columns(), image.rows());
//! # }
//! ```
//!
//! ## Decoding a series in the background
//!
//! ```no_run
//! # use dicom_acquire::series_reader::SeriesPayload;
//! # use dicom_acquire::worker::SeriesDecoder;
//! # async fn demo(files: Vec<Vec<u8>>) {
//! let decoder = SeriesDecoder::spawn();
//! let volume = decoder
//!     .decode(SeriesPayload::new(files))
//!     .await
//!     .expect("should have reconstructed volume");
//! println!("{} slices", volume.dim().0);
//! # }
//! ```
//!
//! [`DecodedImage`]: crate::decoded_image::DecodedImage
//! [`Volume`]: crate::volume::Volume

pub mod decoded_image;
pub mod enums;
pub mod image_loader;
pub mod registry;
pub mod series_reader;
pub mod volume;
pub mod worker;

#[cfg(test)]
mod testdata;
