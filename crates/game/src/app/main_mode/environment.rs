use std::time::Instant;

use engine::app::rendering::{Filter, Frame, GfxDetail, Texture, BLACK};
use glam::Vec3;
use tracing::{debug, warn};

use super::camera::{aspect_ratio, CameraState};
use super::scene_view;
use crate::app::level::DrawPass;
use crate::app::session::GameSession;

/// Side of the sphere-map texture the ball samples.
pub(crate) const ENV_TEXTURE_SIZE: u32 = 128;
pub(crate) const MAX_RESOLUTION: u32 = 512;
pub(crate) const MIN_RESOLUTION: u32 = 128;
const SLOW_RENDER_SECONDS: f32 = 0.05;
const FAST_RENDER_SECONDS: f32 = 0.0125;
/// The reflection is drawn from cells ahead of the ball.
const CELL_OFFSET: i32 = 10;
const PROJECTION_HEIGHT: f32 = 0.05;
const MAX_SPREAD: f32 = 0.5;
const EDGE_MARGIN: f32 = 0.99;

/// Offscreen resolution for the next render given how long the last took.
pub(crate) fn next_resolution(current: u32, last_seconds: f32) -> u32 {
    if last_seconds > SLOW_RENDER_SECONDS {
        (current / 2).max(MIN_RESOLUTION)
    } else if last_seconds < FAST_RENDER_SECONDS {
        (current * 2).min(MAX_RESOLUTION)
    } else {
        current
    }
}

/// Maps each sphere-map texel to the offscreen pixel it reflects.
#[derive(Debug, Clone, Default)]
pub(crate) struct FisheyeTable {
    resolution: u32,
    entries: Vec<Option<(u32, u32)>>,
}

impl FisheyeTable {
    #[cfg(test)]
    pub(crate) fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Rebuilds the table for `resolution`; returns whether it was rebuilt.
    pub(crate) fn ensure(&mut self, resolution: u32) -> bool {
        if resolution == self.resolution && !self.entries.is_empty() {
            return false;
        }
        self.resolution = resolution;
        self.entries.clear();
        for y in 0..ENV_TEXTURE_SIZE {
            for x in 0..ENV_TEXTURE_SIZE {
                self.entries.push(fisheye_source(x, y, resolution));
            }
        }
        debug!(resolution, "fisheye_table_rebuilt");
        true
    }

    /// `None` outside the reflecting disc.
    pub(crate) fn lookup(&self, x: u32, y: u32) -> Option<(u32, u32)> {
        self.entries
            .get((y * ENV_TEXTURE_SIZE + x) as usize)
            .copied()
            .flatten()
    }
}

fn fisheye_source(x: u32, y: u32, resolution: u32) -> Option<(u32, u32)> {
    let half = ENV_TEXTURE_SIZE as f32 / 2.0;
    let nx = (x as f32 - half) * 2.0 / ENV_TEXTURE_SIZE as f32;
    let ny = (y as f32 - half) * 2.0 / ENV_TEXTURE_SIZE as f32;
    let radius_sq = nx * nx + ny * ny;
    if radius_sq >= 1.0 {
        return None;
    }

    // Reflect the view ray off the sphere normal and project onto a plane
    // just in front of the eye.
    let nz = (1.0 - radius_sq).sqrt();
    let reflected = Vec3::new(-2.0 * nx, -2.0 * ny, 1.0 - 2.0 * nz);
    let dot = 2.0 * nz;
    let vz = if reflected.z.abs() < 1e-6 {
        1e-6f32.copysign(reflected.z)
    } else {
        reflected.z
    };
    let h = PROJECTION_HEIGHT / vz;
    let (mut fx, mut fy) = (-h * reflected.x, h * reflected.y);
    if dot < 1.0 {
        fx = -fx;
        fy = -fy;
    }
    let spread = fx.abs().max(fy.abs());
    if spread > MAX_SPREAD {
        let scale = MAX_SPREAD / spread;
        fx *= scale;
        fy *= scale;
    }

    let last = resolution.saturating_sub(1) as f32;
    let to_pixel = |f: f32| {
        (resolution as f32 * (f * EDGE_MARGIN + 0.5))
            .round()
            .clamp(0.0, last) as u32
    };
    Some((to_pixel(fx), to_pixel(fy)))
}

/// Renders what the ball reflects into a sphere-map texture each frame,
/// scaling the offscreen resolution to keep the cost bounded.
#[derive(Debug)]
pub(crate) struct EnvironmentMapper {
    resolution: u32,
    last_seconds: f32,
    table: FisheyeTable,
    readback: Vec<u8>,
    texels: Vec<u8>,
    texture: Option<Texture>,
}

impl Default for EnvironmentMapper {
    fn default() -> Self {
        Self {
            resolution: MAX_RESOLUTION,
            last_seconds: 0.0,
            table: FisheyeTable::default(),
            readback: Vec::new(),
            texels: Vec::new(),
            texture: None,
        }
    }
}

impl EnvironmentMapper {
    pub(crate) fn texture(&self) -> Option<&Texture> {
        self.texture.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn table(&self) -> &FisheyeTable {
        &self.table
    }

    /// Resolution actually used: the adaptive value, capped by a short
    /// window.
    fn effective_resolution(&self, screen_height: u32) -> u32 {
        if screen_height < MAX_RESOLUTION {
            self.resolution.min(screen_height).max(1)
        } else {
            self.resolution
        }
    }

    /// Draws the reflected scene into the top-left of `frame`, then remaps it
    /// into the sphere-map texture. `detail` is lowered for the pass and
    /// restored before returning; the caller clears `frame` afterwards.
    pub(crate) fn render(
        &mut self,
        frame: &mut Frame,
        session: &GameSession,
        camera: &CameraState,
        focus: Vec3,
        detail: &mut GfxDetail,
    ) {
        self.resolution = next_resolution(self.resolution, self.last_seconds);
        let (screen_width, screen_height) = frame.size();
        let size = self.effective_resolution(screen_height);
        let started = Instant::now();

        let previous_detail = *detail;
        *detail = GfxDetail::Minimal;
        let mut view = scene_view(session, *detail, (size, size));
        camera.apply_environment_view(&mut view, aspect_ratio(screen_width, screen_height), focus);
        frame.clear(if session.fog_thickness != 0.0 {
            session.fog_color
        } else {
            BLACK
        });
        let cell = (focus.x as i32 + CELL_OFFSET, focus.y as i32 + CELL_OFFSET);
        session.level.draw(DrawPass::Background, cell, frame, &view);
        session.draw_reflection(frame, &view);
        *detail = previous_detail;

        frame.read_rgb_square(size, &mut self.readback);
        self.table.ensure(size);
        self.remap(size);

        let texture = self.texture.get_or_insert_with(|| {
            Texture::new_blank(ENV_TEXTURE_SIZE, ENV_TEXTURE_SIZE, Filter::Linear)
        });
        if let Err(error) = texture.upload(&self.texels, Filter::Linear) {
            warn!(error = %error, "environment_upload_failed");
        }
        self.last_seconds = started.elapsed().as_secs_f32();
    }

    fn remap(&mut self, size: u32) {
        let texel_count = (ENV_TEXTURE_SIZE * ENV_TEXTURE_SIZE) as usize;
        self.texels.clear();
        self.texels.resize(texel_count * 4, 0);
        for y in 0..ENV_TEXTURE_SIZE {
            for x in 0..ENV_TEXTURE_SIZE {
                let Some((sx, sy)) = self.table.lookup(x, y) else {
                    continue;
                };
                let src = ((sy * size + sx) * 3) as usize;
                let dst = ((y * ENV_TEXTURE_SIZE + x) * 4) as usize;
                if let Some(rgb) = self.readback.get(src..src + 3) {
                    self.texels[dst..dst + 3].copy_from_slice(rgb);
                    self.texels[dst + 3] = 255;
                }
            }
        }
    }

    /// Frees the per-frame buffers; the next render reallocates them.
    pub(crate) fn release(&mut self) {
        self.readback = Vec::new();
        self.texels = Vec::new();
        self.texture = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::level::LevelLibrary;
    use crate::app::settings::Difficulty;

    #[test]
    fn resolution_halves_when_slow_and_doubles_when_fast() {
        assert_eq!(next_resolution(512, 0.06), 256);
        assert_eq!(next_resolution(128, 0.2), MIN_RESOLUTION);
        assert_eq!(next_resolution(128, 0.01), 256);
        assert_eq!(next_resolution(512, 0.0), MAX_RESOLUTION);
        assert_eq!(next_resolution(256, 0.03), 256);
    }

    #[test]
    fn table_centre_and_rim() {
        let mut table = FisheyeTable::default();
        table.ensure(256);
        assert_eq!(table.lookup(64, 64), Some((128, 128)));
        assert_eq!(table.lookup(0, 0), None);
        assert_eq!(table.lookup(0, 64), None);
        for y in 0..ENV_TEXTURE_SIZE {
            for x in 0..ENV_TEXTURE_SIZE {
                if let Some((sx, sy)) = table.lookup(x, y) {
                    assert!(sx < 256 && sy < 256);
                }
            }
        }
    }

    #[test]
    fn table_is_rebuilt_only_on_resolution_change() {
        let mut table = FisheyeTable::default();
        assert!(table.ensure(256));
        assert!(!table.ensure(256));
        assert!(table.ensure(128));
        assert_eq!(table.resolution(), 128);
    }

    #[test]
    fn short_windows_cap_the_resolution() {
        let mapper = EnvironmentMapper::default();
        assert_eq!(mapper.effective_resolution(300), 300);
        assert_eq!(mapper.effective_resolution(720), MAX_RESOLUTION);
    }

    #[test]
    fn render_restores_detail_and_fills_texture() {
        let level = LevelLibrary::builtin().load("lv1").expect("lv1");
        let session = GameSession::new(level, Difficulty::Normal);
        let mut mapper = EnvironmentMapper::default();
        let mut frame = Frame::new(200, 150);
        let mut detail = GfxDetail::Everything;
        let focus = session.player.position;
        mapper.render(&mut frame, &session, &CameraState::default(), focus, &mut detail);

        assert_eq!(detail, GfxDetail::Everything);
        assert_eq!(mapper.table().resolution(), 150);
        let texture = mapper.texture().expect("texture");
        assert_eq!((texture.width(), texture.height()), (ENV_TEXTURE_SIZE, ENV_TEXTURE_SIZE));
        let centre = ((64 * ENV_TEXTURE_SIZE + 64) * 4) as usize;
        assert_eq!(texture.rgba()[centre + 3], 255);
        assert_eq!(texture.rgba()[3], 0);

        mapper.release();
        assert!(mapper.texture().is_none());
    }
}
