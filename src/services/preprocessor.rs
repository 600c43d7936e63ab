use crate::error::AppError;
use crate::models::photo_types::PhotoDescriptor;
use crate::services::classifier::Tensor3D;
use crate::services::exif_service;
use crate::services::photo_io;
use image::imageops::FilterType;
use image::DynamicImage;
use ndarray::Array3;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Resizes photos to the classifier's square input and decodes them into tensors.
pub struct Preprocessor {
    scratch_dir: PathBuf,
    counter: AtomicU64,
}

impl Preprocessor {
    pub fn new(scratch_dir: PathBuf) -> Self {
        Self {
            scratch_dir,
            counter: AtomicU64::new(0),
        }
    }

    /// Writes a `target_size`×`target_size` PNG of the photo into the scratch
    /// directory and returns its path.
    pub async fn resize(&self, photo: &PhotoDescriptor, target_size: u32) -> Result<PathBuf, AppError> {
        if target_size == 0 {
            return Err(AppError::Internal("target size must be greater than zero".into()));
        }

        let bytes = photo_io::read_photo_bytes(photo).await?;

        tokio::fs::create_dir_all(&self.scratch_dir)
            .await
            .map_err(|e| AppError::io(format!("Failed to create {}", self.scratch_dir.display()), e))?;
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let dest = self
            .scratch_dir
            .join(format!("resized-{}-{}.png", std::process::id(), n));

        let out = dest.clone();
        tokio::task::spawn_blocking(move || -> Result<(), AppError> {
            let img = image::load_from_memory(&bytes)?;
            let img = exif_service::apply_orientation(img, exif_service::orientation_from_bytes(&bytes));
            let square = resize_and_center_crop(&img, target_size);
            square
                .save_with_format(&out, image::ImageFormat::Png)
                .map_err(|e| match e {
                    image::ImageError::IoError(io) => {
                        AppError::io(format!("Failed to write {}", out.display()), io)
                    }
                    other => AppError::Decode(other.to_string()),
                })
        })
        .await??;

        log::debug!("Resized {} to {}", photo.uri, dest.display());
        Ok(dest)
    }

    /// Reads a resized file back into an `(h, w, 3)` tensor.
    pub async fn decode(&self, resized: &Path) -> Result<Tensor3D, AppError> {
        let bytes = tokio::fs::read(resized)
            .await
            .map_err(|e| AppError::io(format!("Failed to read {}", resized.display()), e))?;
        tokio::task::spawn_blocking(move || decode_bytes(&bytes)).await?
    }

    /// Same as [`Preprocessor::decode`] for a base64 payload or `data:` URL.
    pub fn decode_base64(&self, payload: &str) -> Result<Tensor3D, AppError> {
        let bytes = photo_io::decode_base64_payload(payload)?;
        decode_bytes(&bytes)
    }

    /// The file behind `photo` when it lives in the scratch directory, i.e. a
    /// camera capture this app wrote. Library picks are never returned.
    pub fn scratch_file(&self, photo: &PhotoDescriptor) -> Option<PathBuf> {
        photo_io::uri_to_path(&photo.uri)
            .ok()
            .filter(|path| path.starts_with(&self.scratch_dir))
    }

    pub async fn discard(&self, resized: &Path) {
        if let Err(e) = tokio::fs::remove_file(resized).await {
            log::debug!("Could not remove {}: {}", resized.display(), e);
        }
    }
}

/// Removes files left in the scratch directory by a previous run.
pub fn purge_scratch_dir(dir: &Path) -> Result<usize, AppError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(AppError::io(format!("Failed to read {}", dir.display()), e)),
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => log::warn!("Could not remove {}: {}", path.display(), e),
        }
    }
    Ok(removed)
}

/// Shortest edge to `size`, then a centered `size`×`size` crop.
pub fn resize_and_center_crop(img: &DynamicImage, size: u32) -> DynamicImage {
    let (w, h) = (img.width().max(1), img.height().max(1));
    let (new_w, new_h) = if w < h {
        (size, ((h as f32 / w as f32) * size as f32).round().max(size as f32) as u32)
    } else {
        (((w as f32 / h as f32) * size as f32).round().max(size as f32) as u32, size)
    };
    let resized = img.resize_exact(new_w, new_h, FilterType::Triangle);

    let crop_x = new_w.saturating_sub(size) / 2;
    let crop_y = new_h.saturating_sub(size) / 2;
    resized.crop_imm(crop_x, crop_y, size, size)
}

pub fn decode_bytes(bytes: &[u8]) -> Result<Tensor3D, AppError> {
    let img = image::load_from_memory(bytes).map_err(|e| AppError::Decode(e.to_string()))?;
    let rgb = img.to_rgb8();
    let (w, h) = rgb.dimensions();
    if w == 0 || h == 0 {
        return Err(AppError::Decode("image has no pixels".to_string()));
    }
    let data: Vec<f32> = rgb.into_raw().into_iter().map(f32::from).collect();
    Array3::from_shape_vec((h as usize, w as usize, 3), data)
        .map_err(|e| AppError::Decode(format!("Failed to shape tensor: {}", e)))
}
