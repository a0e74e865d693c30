//! Synthetic Explicit-VR-Little-Endian CT slices for tests.

use dicom::core::{DataElement, PrimitiveValue, VR};
use dicom::object::{FileMetaTableBuilder, InMemDicomObject};
use dicom_dictionary_std::{tags, uids};

/// Encode a minimal monochrome CT slice with a deterministic gradient.
pub(crate) fn synthetic_ct_slice(rows: u16, columns: u16, instance_number: i32) -> Vec<u8> {
    let pixel_count = rows as usize * columns as usize;
    let pixels = (0..pixel_count)
        .map(|i| (i % usize::from(u16::MAX)) as u16)
        .collect();
    encode_slice(rows, columns, instance_number, pixels)
}

/// Encode a gradient slice whose PixelSpacing carries the given values,
/// for exercising malformed spacing attributes.
pub(crate) fn synthetic_ct_slice_with_spacing(
    rows: u16,
    columns: u16,
    instance_number: i32,
    spacing: &[&str],
) -> Vec<u8> {
    let pixel_count = rows as usize * columns as usize;
    let pixels = (0..pixel_count)
        .map(|i| (i % usize::from(u16::MAX)) as u16)
        .collect();
    encode_slice_with_spacing(rows, columns, instance_number, pixels, spacing)
}

/// Encode a monochrome CT slice with the given 16-bit pixel values.
pub(crate) fn encode_slice(
    rows: u16,
    columns: u16,
    instance_number: i32,
    pixels: Vec<u16>,
) -> Vec<u8> {
    encode_slice_with_spacing(rows, columns, instance_number, pixels, &["1.0", "1.0"])
}

fn encode_slice_with_spacing(
    rows: u16,
    columns: u16,
    instance_number: i32,
    pixels: Vec<u16>,
    spacing: &[&str],
) -> Vec<u8> {
    assert_eq!(pixels.len(), rows as usize * columns as usize);

    let sop_instance_uid = format!("1.2.826.0.1.3680043.2.1143.{instance_number}");
    let z_position = format!("{:.1}", instance_number as f32);

    let mut object = InMemDicomObject::new_empty();
    object.put(DataElement::new(
        tags::SOP_CLASS_UID,
        VR::UI,
        PrimitiveValue::from(uids::CT_IMAGE_STORAGE),
    ));
    object.put(DataElement::new(
        tags::SOP_INSTANCE_UID,
        VR::UI,
        PrimitiveValue::from(sop_instance_uid.as_str()),
    ));
    object.put(DataElement::new(
        tags::MODALITY,
        VR::CS,
        PrimitiveValue::from("CT"),
    ));
    object.put(DataElement::new(
        tags::INSTANCE_NUMBER,
        VR::IS,
        PrimitiveValue::from(instance_number.to_string()),
    ));
    object.put(DataElement::new(
        tags::IMAGE_POSITION_PATIENT,
        VR::DS,
        PrimitiveValue::Strs(vec!["0.0".to_string(), "0.0".to_string(), z_position].into()),
    ));
    object.put(DataElement::new(
        tags::PIXEL_SPACING,
        VR::DS,
        PrimitiveValue::Strs(spacing.iter().map(|s| s.to_string()).collect::<Vec<_>>().into()),
    ));
    object.put(DataElement::new(
        tags::SLICE_THICKNESS,
        VR::DS,
        PrimitiveValue::from("1.0"),
    ));
    object.put(DataElement::new(
        tags::SAMPLES_PER_PIXEL,
        VR::US,
        PrimitiveValue::from(1_u16),
    ));
    object.put(DataElement::new(
        tags::PHOTOMETRIC_INTERPRETATION,
        VR::CS,
        PrimitiveValue::from("MONOCHROME2"),
    ));
    object.put(DataElement::new(
        tags::ROWS,
        VR::US,
        PrimitiveValue::from(rows),
    ));
    object.put(DataElement::new(
        tags::COLUMNS,
        VR::US,
        PrimitiveValue::from(columns),
    ));
    object.put(DataElement::new(
        tags::BITS_ALLOCATED,
        VR::US,
        PrimitiveValue::from(16_u16),
    ));
    object.put(DataElement::new(
        tags::BITS_STORED,
        VR::US,
        PrimitiveValue::from(16_u16),
    ));
    object.put(DataElement::new(
        tags::HIGH_BIT,
        VR::US,
        PrimitiveValue::from(15_u16),
    ));
    object.put(DataElement::new(
        tags::PIXEL_REPRESENTATION,
        VR::US,
        PrimitiveValue::from(0_u16),
    ));
    object.put(DataElement::new(
        tags::PIXEL_DATA,
        VR::OW,
        PrimitiveValue::U16(pixels.into()),
    ));

    let file_object = object
        .with_meta(
            FileMetaTableBuilder::new()
                .transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN)
                .media_storage_sop_class_uid(uids::CT_IMAGE_STORAGE)
                .media_storage_sop_instance_uid(sop_instance_uid),
        )
        .expect("file meta table should build");

    let mut bytes = Vec::new();
    file_object
        .write_all(&mut bytes)
        .expect("synthetic slice should encode");
    bytes
}
