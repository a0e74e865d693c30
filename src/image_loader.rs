use crate::decoded_image::{DecodeError, DecodedImage};
use crate::registry::{FileHandle, ImageId, ImageRegistry};

use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no file provided")]
    NoFileProvided,

    #[error("image {0} is not registered")]
    UnknownImageId(ImageId),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("decode task did not complete: {0}")]
    TaskFailed(String),
}

/// Loader configuration, established once at construction.
///
/// `use_worker_threads` asks for decoding off the calling task. It is a
/// best-effort hint: it is only honored when the host reports more than
/// one unit of available parallelism.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub use_worker_threads: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            use_worker_threads: true,
        }
    }
}

/// Foreground loader: registers file handles and decodes them into
/// displayable images, caching each decode result in the registry.
pub struct ImageLoader {
    registry: Arc<ImageRegistry>,
    offload: bool,
}

impl ImageLoader {
    pub fn new(registry: Arc<ImageRegistry>) -> Self {
        Self::with_config(registry, LoaderConfig::default())
    }

    pub fn with_config(registry: Arc<ImageRegistry>, config: LoaderConfig) -> Self {
        let offload = config.use_worker_threads && supports_offload();
        Self { registry, offload }
    }

    pub fn registry(&self) -> &Arc<ImageRegistry> {
        &self.registry
    }

    /// Register a file handle and decode it into an image.
    ///
    /// A missing handle fails with [`LoadError::NoFileProvided`] before
    /// any registry mutation. Decode failures are logged and returned
    /// unchanged; no retry is attempted and no image is cached for the
    /// failed entry.
    pub async fn load_image(
        &self,
        handle: Option<FileHandle>,
    ) -> Result<Arc<DecodedImage>, LoadError> {
        let Some(handle) = handle else {
            return Err(LoadError::NoFileProvided);
        };

        let id = self.registry.add(handle);
        tracing::debug!(image_id = %id, "registered file handle");

        match self.decode_and_cache(&id).await {
            Ok(image) => Ok(image),
            Err(err) => {
                tracing::error!(image_id = %id, error = %err, "failed to decode DICOM image");
                Err(err)
            }
        }
    }

    /// Decode an already registered image, returning the cached result on
    /// repeat calls.
    pub async fn load_cached(&self, id: &ImageId) -> Result<Arc<DecodedImage>, LoadError> {
        self.decode_and_cache(id).await
    }

    async fn decode_and_cache(&self, id: &ImageId) -> Result<Arc<DecodedImage>, LoadError> {
        if let Some(image) = self.registry.cached_image(id) {
            return Ok(image);
        }

        let handle = self
            .registry
            .handle(id)
            .ok_or_else(|| LoadError::UnknownImageId(id.clone()))?;

        let image = if self.offload {
            tokio::task::spawn_blocking(move || DecodedImage::from_bytes(handle.data()))
                .await
                .map_err(|err| LoadError::TaskFailed(err.to_string()))??
        } else {
            DecodedImage::from_bytes(handle.data())?
        };

        let image = Arc::new(image);
        self.registry.store_image(id, Arc::clone(&image));
        Ok(image)
    }
}

/// Hardware capability check: offloading decode work only pays off when
/// more than one execution unit is available.
fn supports_offload() -> bool {
    std::thread::available_parallelism()
        .map(|count| count.get() > 1)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdata;

    fn loader() -> ImageLoader {
        ImageLoader::new(Arc::new(ImageRegistry::new()))
    }

    #[tokio::test]
    async fn missing_handle_fails_before_registration() {
        let loader = loader();
        let err = loader.load_image(None).await.unwrap_err();

        assert!(matches!(err, LoadError::NoFileProvided));
        assert!(loader.registry().is_empty());
    }

    #[tokio::test]
    async fn valid_slice_decodes_with_expected_buffer_length() {
        let loader = loader();
        let handle = FileHandle::from_bytes(testdata::synthetic_ct_slice(8, 12, 1));

        let image = loader
            .load_image(Some(handle))
            .await
            .expect("slice should decode");

        assert_eq!(image.rows(), 8);
        assert_eq!(image.columns(), 12);
        assert_eq!(image.pixels().len(), 8 * 12);
        assert_eq!(loader.registry().len(), 1);
    }

    #[tokio::test]
    async fn truncated_slice_is_never_served_as_valid() {
        let registry = Arc::new(ImageRegistry::new());
        let loader = ImageLoader::new(Arc::clone(&registry));
        let mut bytes = testdata::synthetic_ct_slice(8, 8, 1);
        bytes.truncate(bytes.len() / 2);
        let id = registry.add(FileHandle::from_bytes(bytes));

        let err = loader.load_cached(&id).await.unwrap_err();
        assert!(matches!(err, LoadError::Decode(_)));

        // the entry stays registered but no decoded image was cached
        assert_eq!(registry.len(), 1);
        assert!(registry.cached_image(&id).is_none());
        assert!(loader.load_cached(&id).await.is_err());
    }

    #[tokio::test]
    async fn concurrent_loads_do_not_cross_contaminate() {
        let loader = loader();
        let first = FileHandle::from_bytes(testdata::synthetic_ct_slice(4, 4, 1));
        let second = FileHandle::from_bytes(testdata::synthetic_ct_slice(6, 6, 2));

        let (left, right) = tokio::join!(
            loader.load_image(Some(first)),
            loader.load_image(Some(second)),
        );

        let left = left.expect("first slice should decode");
        let right = right.expect("second slice should decode");

        assert_eq!((left.rows(), left.columns()), (4, 4));
        assert_eq!((right.rows(), right.columns()), (6, 6));
    }

    #[tokio::test]
    async fn repeat_load_returns_cached_image() {
        let registry = Arc::new(ImageRegistry::new());
        let loader = ImageLoader::new(Arc::clone(&registry));
        let id = registry.add(FileHandle::from_bytes(testdata::synthetic_ct_slice(4, 4, 1)));

        let first = loader.load_cached(&id).await.expect("decode should succeed");
        let second = loader.load_cached(&id).await.expect("cache hit should succeed");

        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn unknown_identifier_is_reported() {
        let registry = Arc::new(ImageRegistry::new());
        let loader = ImageLoader::new(Arc::clone(&registry));
        let id = registry.add(FileHandle::from_bytes(vec![0]));
        registry.clear();

        let err = loader.load_cached(&id).await.unwrap_err();
        assert!(matches!(err, LoadError::UnknownImageId(_)));
    }

    #[tokio::test]
    async fn inline_decode_path_matches_offloaded_path() {
        let loader = ImageLoader::with_config(
            Arc::new(ImageRegistry::new()),
            LoaderConfig {
                use_worker_threads: false,
            },
        );
        let handle = FileHandle::from_bytes(testdata::synthetic_ct_slice(4, 4, 1));

        let image = loader
            .load_image(Some(handle))
            .await
            .expect("inline decode should succeed");
        assert_eq!(image.pixels().len(), 16);
    }
}
