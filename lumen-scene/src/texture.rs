//! Multichannel float raster and the texture sampling policies layered
//! over it. Grounded on `original_source/sources/include/structures/
//! Image.hpp` (channel-named float raster, bilinear `getInterpolatedPixel`
//! with black outside the image) and the repeat/alpha-mode vocabulary
//! implied by `original_source/sources/include/materials/TextureBRDF.hpp`
//! (`TEXTURE_REPEAT_MODE`, `ALPHA_MODE`, per-axis tiling factors).

use lumen_core::prelude::*;

/// A raster of `width * height` pixels, each a fixed-length float vector
/// with named channels (spec.md §3).
#[derive(Clone, Debug)]
pub struct Image {
    width: usize,
    height: usize,
    channel_names: Vec<String>,
    data: Vec<f32>,
}

impl Image {
    pub fn new(width: usize, height: usize, channel_names: Vec<String>) -> Self {
        let channels = channel_names.len();
        Self {
            width,
            height,
            channel_names,
            data: vec![0.0; width * height * channels],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channel_count(&self) -> usize {
        self.channel_names.len()
    }

    pub fn channel_name(&self, i: usize) -> &str {
        &self.channel_names[i]
    }

    pub fn clear(&mut self) {
        self.data.iter_mut().for_each(|v| *v = 0.0);
    }

    pub fn pixel(&self, x: usize, y: usize) -> &[f32] {
        let c = self.channel_count();
        let offset = (y * self.width + x) * c;
        &self.data[offset..offset + c]
    }

    pub fn pixel_mut(&mut self, x: usize, y: usize) -> &mut [f32] {
        let c = self.channel_count();
        let offset = (y * self.width + x) * c;
        &mut self.data[offset..offset + c]
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, values: &[f32]) {
        self.pixel_mut(x, y).copy_from_slice(values);
    }

    fn pixel_or_black(&self, x: i64, y: i64) -> Vec<f32> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            vec![0.0; self.channel_count()]
        } else {
            self.pixel(x as usize, y as usize).to_vec()
        }
    }

    /// Bilinear sample in pixel space; coordinates outside the raster
    /// contribute black, matching `Image::getInterpolatedPixel`.
    pub fn interpolated_pixel(&self, x: f32, y: f32) -> Vec<f32> {
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let x0 = x0 as i64;
        let y0 = y0 as i64;
        let p00 = self.pixel_or_black(x0, y0);
        let p10 = self.pixel_or_black(x0 + 1, y0);
        let p01 = self.pixel_or_black(x0, y0 + 1);
        let p11 = self.pixel_or_black(x0 + 1, y0 + 1);
        (0..self.channel_count())
            .map(|i| {
                let top = p00[i] * (1.0 - fx) + p10[i] * fx;
                let bottom = p01[i] * (1.0 - fx) + p11[i] * fx;
                top * (1.0 - fy) + bottom * fy
            })
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RepeatMode {
    Off,
    Repeat,
    Mirror,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlphaMode {
    Off,
    Channel(usize),
}

/// A texture: an [`Image`] plus the policies needed to resolve a
/// spectrum at arbitrary surface `(u, v)`.
#[derive(Clone, Debug)]
pub struct Texture {
    image: Image,
    tile_u: f32,
    tile_v: f32,
    repeat_u: RepeatMode,
    repeat_v: RepeatMode,
    alpha: AlphaMode,
}

impl Texture {
    pub fn new(
        image: Image,
        tile_u: f32,
        tile_v: f32,
        repeat_u: RepeatMode,
        repeat_v: RepeatMode,
        alpha: AlphaMode,
    ) -> Self {
        Self {
            image,
            tile_u,
            tile_v,
            repeat_u,
            repeat_v,
            alpha,
        }
    }

    fn wrap(coordinate: f32, mode: RepeatMode) -> Option<f32> {
        match mode {
            RepeatMode::Off => {
                if (0.0..1.0).contains(&coordinate) {
                    Some(coordinate)
                } else {
                    None
                }
            }
            RepeatMode::Repeat => Some(coordinate.rem_euclid(1.0)),
            RepeatMode::Mirror => {
                let period = coordinate.rem_euclid(2.0);
                Some(if period > 1.0 { 2.0 - period } else { period })
            }
        }
    }

    /// Raw channel values at `(u, v)`, or `None` when a `RepeatMode::Off`
    /// axis is sampled outside `[0, 1)`.
    pub fn sample_raw(&self, u: f32, v: f32) -> Option<Vec<f32>> {
        let u = Self::wrap(u * self.tile_u, self.repeat_u)?;
        let v = Self::wrap(v * self.tile_v, self.repeat_v)?;
        let px = u * self.image.width() as f32;
        let py = (1.0 - v) * self.image.height() as f32;
        Some(self.image.interpolated_pixel(px, py))
    }

    pub fn alpha_at(&self, u: f32, v: f32) -> f32 {
        match self.alpha {
            AlphaMode::Off => 1.0,
            AlphaMode::Channel(i) => self
                .sample_raw(u, v)
                .map(|p| p.get(i).copied().unwrap_or(1.0))
                .unwrap_or(0.0),
        }
    }

    /// Resolves a full spectrum at `(u, v)`. When the texture carries
    /// exactly as many channels as the grid, the channels are used
    /// directly as spectral samples. Otherwise a deliberately naive
    /// 3-to-N upsampling splits the grid into three contiguous thirds and
    /// fills each third with one of the texture's first three channels —
    /// the same spirit of naivety as `SimpleRGB`'s band selection (spec
    /// §4.5), just run in reverse.
    pub fn resolve_spectrum(&self, grid: &WavelengthGrid, u: f32, v: f32) -> Option<Spectrum> {
        let raw = self.sample_raw(u, v)?;
        let n = grid.len();
        if raw.len() == n {
            return Some(Spectrum::from_values(raw));
        }
        let mut values = vec![0.0f32; n];
        let thirds = [raw[2.min(raw.len() - 1)], raw[1.min(raw.len() - 1)], raw[0]];
        let third_len = (n + 2) / 3;
        for (i, value) in values.iter_mut().enumerate() {
            let band = (i / third_len.max(1)).min(2);
            *value = thirds[band];
        }
        Some(Spectrum::from_values(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker() -> Image {
        let mut image = Image::new(2, 2, vec!["r".into(), "g".into(), "b".into()]);
        image.set_pixel(0, 0, &[1.0, 0.0, 0.0]);
        image.set_pixel(1, 0, &[0.0, 1.0, 0.0]);
        image.set_pixel(0, 1, &[0.0, 0.0, 1.0]);
        image.set_pixel(1, 1, &[1.0, 1.0, 1.0]);
        image
    }

    #[test]
    fn out_of_bounds_pixel_is_black() {
        let image = checker();
        let pixel = image.interpolated_pixel(-5.0, -5.0);
        assert_eq!(pixel, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn repeat_off_rejects_outside_unit_square() {
        let texture = Texture::new(checker(), 1.0, 1.0, RepeatMode::Off, RepeatMode::Off, AlphaMode::Off);
        assert!(texture.sample_raw(1.5, 0.5).is_none());
    }

    #[test]
    fn repeat_on_wraps_around() {
        let texture = Texture::new(checker(), 1.0, 1.0, RepeatMode::Repeat, RepeatMode::Repeat, AlphaMode::Off);
        assert!(texture.sample_raw(1.5, 0.5).is_some());
    }

    #[test]
    fn upsampling_fills_full_grid_length() {
        let texture = Texture::new(checker(), 1.0, 1.0, RepeatMode::Off, RepeatMode::Off, AlphaMode::Off);
        let grid = WavelengthGrid::uniform(400.0, 700.0, 16).unwrap();
        let spectrum = texture.resolve_spectrum(&grid, 0.25, 0.25).unwrap();
        assert_eq!(spectrum.len(), 16);
    }
}
