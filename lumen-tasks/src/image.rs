//! Save/load/checkpoint for the render target (spec.md §3's "Image buffer"
//! component; spec.md §6's "image-file interface" stub; spec.md §7's
//! "checkpoints are atomic at the whole-file level: write to temp,
//! rename").
//!
//! The raster type itself is `lumen_scene::Image` — reused rather than
//! duplicated, since a camera's output raster and a texture's input raster
//! are the same "named-channel float grid" (spec.md §3). This module only
//! adds what the *output* side needs: a binary snapshot format and an
//! atomic, periodic checkpoint write.

use lumen_scene::Image;
use serde::{Deserialize, Serialize};
use std::io::Write as _;
use std::path::Path;

use crate::error::TaskError;

/// A flattened, serializable mirror of an [`Image`]; `Image` itself has no
/// `serde` impl (its raster is an internal implementation detail of the
/// texture-sampling crate), so checkpointing goes through this snapshot.
#[derive(Serialize, Deserialize)]
struct ImageSnapshot {
    width: usize,
    height: usize,
    channel_names: Vec<String>,
    data: Vec<f32>,
}

impl ImageSnapshot {
    fn from_image(image: &Image) -> Self {
        let channels = image.channel_count();
        let mut data = Vec::with_capacity(image.width() * image.height() * channels);
        for y in 0..image.height() {
            for x in 0..image.width() {
                data.extend_from_slice(image.pixel(x, y));
            }
        }
        Self {
            width: image.width(),
            height: image.height(),
            channel_names: (0..channels).map(|i| image.channel_name(i).to_string()).collect(),
            data,
        }
    }

    fn into_image(self) -> Image {
        let mut image = Image::new(self.width, self.height, self.channel_names);
        let channels = image.channel_count();
        for y in 0..self.height {
            for x in 0..self.width {
                let offset = (y * self.width + x) * channels;
                image.set_pixel(x, y, &self.data[offset..offset + channels]);
            }
        }
        image
    }
}

/// Serializes `image` to `path` atomically: write to a sibling temp file,
/// then rename over the destination, so a process killed mid-write never
/// leaves a corrupt or partial output (spec.md §7).
pub fn save_checkpoint(image: &Image, path: &Path) -> Result<(), TaskError> {
    let snapshot = ImageSnapshot::from_image(image);
    let bytes = bincode::serialize(&snapshot).expect("in-memory image snapshot always serializes");
    let tmp_path = path.with_extension("tmp");
    (|| -> std::io::Result<()> {
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    })()
    .map_err(|source| TaskError::CheckpointWrite { path: path.to_path_buf(), source })
}

/// Loads a previously checkpointed image, for `--overwrite`-less resume.
pub fn load_checkpoint(path: &Path) -> Result<Image, TaskError> {
    let bytes = std::fs::read(path).map_err(|source| TaskError::ResumeLoad { path: path.to_path_buf(), source })?;
    let snapshot: ImageSnapshot = bincode::deserialize(&bytes).map_err(|e| TaskError::ResumeLoad {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
    })?;
    Ok(snapshot.into_image())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoint_round_trips() {
        let dir = std::env::temp_dir().join(format!("lumen-tasks-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("checkpoint.bin");

        let mut image = Image::new(2, 2, vec!["R".into(), "G".into(), "B".into()]);
        image.set_pixel(0, 0, &[1.0, 0.0, 0.0]);
        image.set_pixel(1, 1, &[0.0, 1.0, 0.5]);

        save_checkpoint(&image, &path).unwrap();
        let loaded = load_checkpoint(&path).unwrap();

        assert_eq!(loaded.width(), 2);
        assert_eq!(loaded.height(), 2);
        assert_eq!(loaded.pixel(0, 0), [1.0, 0.0, 0.0]);
        assert_eq!(loaded.pixel(1, 1), [0.0, 1.0, 0.5]);

        std::fs::remove_file(&path).ok();
        std::fs::remove_dir(&dir).ok();
    }
}
