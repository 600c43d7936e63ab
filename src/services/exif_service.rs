use exif::{In, Tag};
use std::io::Cursor;

/// Most cameras put EXIF in the first 64KB; read a bit more to be safe.
const EXIF_SCAN_BYTES: usize = 128 * 1024;

/// Reads the EXIF orientation tag from an encoded image, defaulting to 1.
pub fn orientation_from_bytes(bytes: &[u8]) -> u32 {
    let header = &bytes[..bytes.len().min(EXIF_SCAN_BYTES)];
    let exif = match exif::Reader::new().read_from_container(&mut Cursor::new(header)) {
        Ok(e) => e,
        Err(_) => return 1,
    };

    match exif.get_field(Tag::Orientation, In::PRIMARY) {
        Some(field) => match field.value {
            exif::Value::Short(ref v) => *v.first().unwrap_or(&1) as u32,
            exif::Value::Long(ref v) => *v.first().unwrap_or(&1),
            _ => 1,
        },
        None => 1,
    }
}

/// Apply EXIF orientation to the image.
pub fn apply_orientation(img: image::DynamicImage, orientation: u32) -> image::DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.fliph().rotate90(),
        6 => img.rotate90(),
        7 => img.fliph().rotate270(),
        8 => img.rotate270(),
        _ => img,
    }
}

/// Orientations 5..=8 swap width and height when displayed.
pub fn swaps_dimensions(orientation: u32) -> bool {
    (5..=8).contains(&orientation)
}
