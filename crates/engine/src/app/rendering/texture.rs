use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use image::ImageReader;
use thiserror::Error;
use tracing::warn;

use super::frame::Color;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    Nearest,
    Linear,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TextureError {
    #[error("texture data length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("texture has zero area ({width}x{height})")]
    Empty { width: u32, height: u32 },
}

/// An RGBA8 image sampled with clamp-to-edge addressing.
#[derive(Debug, Clone)]
pub struct Texture {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
    filter: Filter,
}

impl Texture {
    pub fn from_rgba(
        width: u32,
        height: u32,
        rgba: Vec<u8>,
        filter: Filter,
    ) -> Result<Self, TextureError> {
        if width == 0 || height == 0 {
            return Err(TextureError::Empty { width, height });
        }
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(TextureError::LengthMismatch {
                expected,
                actual: rgba.len(),
            });
        }
        Ok(Self {
            width,
            height,
            rgba,
            filter,
        })
    }

    /// A transparent texture of the given size; zero dimensions become 1.
    pub fn new_blank(width: u32, height: u32, filter: Filter) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            rgba: vec![0; width as usize * height as usize * 4],
            filter,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    /// Replaces the texel data in place, keeping the allocation.
    pub fn upload(&mut self, rgba: &[u8], filter: Filter) -> Result<(), TextureError> {
        if rgba.len() != self.rgba.len() {
            return Err(TextureError::LengthMismatch {
                expected: self.rgba.len(),
                actual: rgba.len(),
            });
        }
        self.rgba.copy_from_slice(rgba);
        self.filter = filter;
        Ok(())
    }

    /// Samples at normalized `(u, v)`; `v` grows downward.
    pub fn sample(&self, u: f32, v: f32) -> Color {
        match self.filter {
            Filter::Nearest => {
                let x = (u * self.width as f32).floor() as i64;
                let y = (v * self.height as f32).floor() as i64;
                self.texel(x, y)
            }
            Filter::Linear => {
                let fx = u * self.width as f32 - 0.5;
                let fy = v * self.height as f32 - 0.5;
                let x0 = fx.floor();
                let y0 = fy.floor();
                let tx = fx - x0;
                let ty = fy - y0;
                let (x0, y0) = (x0 as i64, y0 as i64);
                let top = mix(self.texel(x0, y0), self.texel(x0 + 1, y0), tx);
                let bottom = mix(self.texel(x0, y0 + 1), self.texel(x0 + 1, y0 + 1), tx);
                mix(top, bottom, ty)
            }
        }
    }

    fn texel(&self, x: i64, y: i64) -> Color {
        let x = x.clamp(0, self.width as i64 - 1) as usize;
        let y = y.clamp(0, self.height as i64 - 1) as usize;
        let offset = (y * self.width as usize + x) * 4;
        let px = &self.rgba[offset..offset + 4];
        [
            px[0] as f32 / 255.0,
            px[1] as f32 / 255.0,
            px[2] as f32 / 255.0,
            px[3] as f32 / 255.0,
        ]
    }
}

fn mix(a: Color, b: Color, t: f32) -> Color {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
        a[3] + (b[3] - a[3]) * t,
    ]
}

/// Loads PNG textures from `<asset_root>/textures` on first use.
///
/// Failed loads are remembered as `None` so a missing file is reported once
/// and never retried.
#[derive(Debug)]
pub struct TextureCache {
    texture_dir: PathBuf,
    textures: HashMap<String, Option<Texture>>,
    warned_missing: HashSet<String>,
}

impl TextureCache {
    pub fn new(asset_root: &Path) -> Self {
        Self {
            texture_dir: asset_root.join("textures"),
            textures: HashMap::new(),
            warned_missing: HashSet::new(),
        }
    }

    pub fn get(&mut self, name: &str) -> Option<&Texture> {
        if !self.textures.contains_key(name) {
            let loaded = match load_png(&self.texture_dir.join(name)) {
                Ok(texture) => Some(texture),
                Err(reason) => {
                    if self.warned_missing.insert(name.to_string()) {
                        warn!(texture = name, reason = %reason, "texture_load_failed");
                    }
                    None
                }
            };
            self.textures.insert(name.to_string(), loaded);
        }
        self.textures.get(name).and_then(Option::as_ref)
    }
}

fn load_png(path: &Path) -> Result<Texture, String> {
    let reader = ImageReader::open(path).map_err(|error| error.to_string())?;
    let image = reader.decode().map_err(|error| error.to_string())?;
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    Texture::from_rgba(width, height, rgba.into_raw(), Filter::Linear)
        .map_err(|error| error.to_string())
}
