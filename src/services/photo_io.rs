use crate::error::AppError;
use crate::models::photo_types::PhotoDescriptor;
use base64::Engine;
use std::path::{Path, PathBuf};
use url::Url;

/// Accepts `file://` URLs and plain filesystem paths.
pub fn uri_to_path(uri: &str) -> Result<PathBuf, AppError> {
    if uri.starts_with("file:") {
        let url = Url::parse(uri).map_err(|e| AppError::Io(format!("Invalid photo URI {}: {}", uri, e)))?;
        return url
            .to_file_path()
            .map_err(|_| AppError::Io(format!("Photo URI is not a local file: {}", uri)));
    }
    if uri.contains("://") || uri.starts_with("data:") {
        return Err(AppError::Io(format!("Unsupported photo URI: {}", uri)));
    }
    Ok(PathBuf::from(uri))
}

pub fn path_to_uri(path: &Path) -> String {
    Url::from_file_path(path)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| path.to_string_lossy().to_string())
}

/// Decodes either raw base64 or a `data:<mime>;base64,<payload>` URL.
pub fn decode_base64_payload(payload: &str) -> Result<Vec<u8>, AppError> {
    let data = match payload.strip_prefix("data:") {
        Some(rest) => {
            let (meta, data) = rest
                .split_once(',')
                .ok_or_else(|| AppError::Decode("data URL without payload".to_string()))?;
            if !meta.ends_with(";base64") {
                return Err(AppError::Decode("data URL is not base64 encoded".to_string()));
            }
            data
        }
        None => payload,
    };
    let cleaned: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    Ok(base64::engine::general_purpose::STANDARD.decode(cleaned)?)
}

pub fn encode_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// The encoded bytes behind a descriptor: the inline payload when present,
/// otherwise the file its URI points at.
pub async fn read_photo_bytes(photo: &PhotoDescriptor) -> Result<Vec<u8>, AppError> {
    if let Some(payload) = photo.base64.as_deref() {
        return decode_base64_payload(payload);
    }
    let path = uri_to_path(&photo.uri)?;
    tokio::fs::read(&path)
        .await
        .map_err(|e| AppError::io(format!("Failed to read photo {}", path.display()), e))
}

/// Width and height from the image header, without decoding pixels.
pub fn probe_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    image::ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_uri_and_plain_path() {
        let path = std::env::temp_dir().join("photo.jpg");
        let uri = path_to_uri(&path);
        assert!(uri.starts_with("file://"));
        assert_eq!(uri_to_path(&uri).unwrap(), path);
        assert_eq!(uri_to_path("relative/photo.png").unwrap(), PathBuf::from("relative/photo.png"));
    }

    #[test]
    fn remote_uri_rejected() {
        assert_eq!(uri_to_path("https://example.com/a.jpg").unwrap_err().kind(), "io");
    }

    #[test]
    fn data_url_and_raw_base64() {
        assert_eq!(decode_base64_payload("data:image/png;base64,aGVsbG8=").unwrap(), b"hello");
        assert_eq!(decode_base64_payload("aGVs\nbG8=").unwrap(), b"hello");
        assert_eq!(decode_base64_payload("data:text/plain,hello").unwrap_err().kind(), "decode");
        assert_eq!(decode_base64_payload("%%%").unwrap_err().kind(), "decode");
    }

    #[test]
    fn probe_reads_png_header() {
        let img = image::RgbImage::new(5, 3);
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        assert_eq!(probe_dimensions(&bytes), Some((5, 3)));
        assert_eq!(probe_dimensions(b"garbage"), None);
    }
}
