#[derive(Clone, Copy)]
pub enum Orientation {
    Axial,
    Coronal,
    Sagittal,
}

#[derive(Clone, Copy, Default)]
pub enum SortBy {
    #[default]
    ImagePositionPatient,
    TablePosition,
    InstanceNumber,
    None,
}
