use std::path::PathBuf;
use std::sync::Arc;

use dicom_acquire::{
    enums::Orientation,
    image_loader::ImageLoader,
    registry::{FileHandle, ImageRegistry},
    series_reader::SeriesPayload,
    worker::SeriesDecoder,
};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let dir = PathBuf::from("dicom");
    let mut paths: Vec<_> = std::fs::read_dir(&dir)
        .expect("should have read the dicom directory")
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|s| s.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("dcm"))
        })
        .collect();
    paths.sort();

    // foreground path: decode the first file as a single image
    let registry = Arc::new(ImageRegistry::new());
    let loader = ImageLoader::new(Arc::clone(&registry));
    let first = paths.first().expect("directory should contain .dcm files");
    let handle = FileHandle::from_path(first).expect("should have read file");
    let image = loader
        .load_image(Some(handle))
        .await
        .expect("should have decoded image");
    tracing::info!(
        rows = image.rows(),
        columns = image.columns(),
        "decoded single image"
    );

    // background path: reconstruct the whole series and save the center slice
    let files: Vec<_> = paths
        .iter()
        .map(|path| std::fs::read(path).expect("should have read series file"))
        .collect();
    let decoder = SeriesDecoder::spawn();
    let volume = decoder
        .decode(SeriesPayload::new(files))
        .await
        .expect("should have reconstructed volume");
    let slice = volume
        .slice_image(volume.dim().0 / 2, Orientation::Axial)
        .expect("should have rendered center slice");
    slice
        .save("result.png")
        .expect("should have saved result image");
}
