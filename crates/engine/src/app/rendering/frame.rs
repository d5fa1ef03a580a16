use std::path::Path;

use super::texture::Texture;

/// Linear RGBA colour with components in `0.0..=1.0`.
pub type Color = [f32; 4];

pub const BLACK: Color = [0.0, 0.0, 0.0, 1.0];
pub const TRANSPARENT: Color = [0.0, 0.0, 0.0, 0.0];

/// CPU-side colour and depth target.
///
/// Rows are stored top to bottom, four bytes per pixel. Depth holds window
/// depth in `0.0..=1.0`, cleared to `f32::INFINITY`.
#[derive(Debug, Clone)]
pub struct Frame {
    width: u32,
    height: u32,
    color: Vec<u8>,
    depth: Vec<f32>,
}

impl Frame {
    pub fn new(width: u32, height: u32) -> Self {
        let pixel_count = width as usize * height as usize;
        Self {
            width,
            height,
            color: vec![0; pixel_count * 4],
            depth: vec![f32::INFINITY; pixel_count],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.color
    }

    /// Reallocates both planes. A no-op when the size is unchanged.
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.width == width && self.height == height {
            return;
        }
        *self = Self::new(width, height);
    }

    pub fn clear(&mut self, color: Color) {
        let rgba = to_rgba8(color);
        for chunk in self.color.chunks_exact_mut(4) {
            chunk.copy_from_slice(&rgba);
        }
        self.depth.fill(f32::INFINITY);
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let offset = self.byte_offset(x as i32, y as i32)?;
        let mut rgba = [0u8; 4];
        rgba.copy_from_slice(&self.color[offset..offset + 4]);
        Some(rgba)
    }

    /// Depth test with `<=` semantics; stores `depth` when it passes and
    /// `write` is set.
    pub(crate) fn depth_test(&mut self, x: i32, y: i32, depth: f32, write: bool) -> bool {
        let Some(index) = self.pixel_index(x, y) else {
            return false;
        };
        if depth > self.depth[index] {
            return false;
        }
        if write {
            self.depth[index] = depth;
        }
        true
    }

    pub fn put_pixel(&mut self, x: i32, y: i32, color: [u8; 4]) {
        if let Some(offset) = self.byte_offset(x, y) {
            self.color[offset..offset + 4].copy_from_slice(&color);
        }
    }

    /// Source-over blend of `color` onto the pixel at `(x, y)`.
    pub fn blend_pixel(&mut self, x: i32, y: i32, color: Color) {
        let Some(offset) = self.byte_offset(x, y) else {
            return;
        };
        let alpha = color[3].clamp(0.0, 1.0);
        if alpha <= 0.0 {
            return;
        }
        for channel in 0..3 {
            let dst = self.color[offset + channel] as f32 / 255.0;
            let out = color[channel] * alpha + dst * (1.0 - alpha);
            self.color[offset + channel] = unit_to_u8(out);
        }
        let dst_alpha = self.color[offset + 3] as f32 / 255.0;
        self.color[offset + 3] = unit_to_u8(alpha + dst_alpha * (1.0 - alpha));
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, width: i32, height: i32, color: Color) {
        let Some((x0, y0, x1, y1)) = self.clip_rect(x, y, width, height) else {
            return;
        };
        for py in y0..y1 {
            for px in x0..x1 {
                self.blend_pixel(px, py, color);
            }
        }
    }

    /// Fills a rectangle whose colour runs from `left` to `right`.
    pub fn fill_horizontal_gradient(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        left: Color,
        right: Color,
    ) {
        let Some((x0, y0, x1, y1)) = self.clip_rect(x, y, width, height) else {
            return;
        };
        let span = (width - 1).max(1) as f32;
        for px in x0..x1 {
            let t = (px - x) as f32 / span;
            let color = lerp_color(left, right, t);
            for py in y0..y1 {
                self.blend_pixel(px, py, color);
            }
        }
    }

    /// Draws `texture` stretched over the rectangle, modulated by `tint`.
    pub fn draw_textured_rect(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        texture: &Texture,
        tint: Color,
    ) {
        let Some((x0, y0, x1, y1)) = self.clip_rect(x, y, width, height) else {
            return;
        };
        for py in y0..y1 {
            let v = ((py - y) as f32 + 0.5) / height as f32;
            for px in x0..x1 {
                let u = ((px - x) as f32 + 0.5) / width as f32;
                let texel = texture.sample(u, v);
                self.blend_pixel(
                    px,
                    py,
                    [
                        texel[0] * tint[0],
                        texel[1] * tint[1],
                        texel[2] * tint[2],
                        texel[3] * tint[3],
                    ],
                );
            }
        }
    }

    /// Copies the top-left `size`×`size` square as packed RGB into `out`.
    ///
    /// Rows outside the frame read as black so a square larger than a short
    /// window still yields `size * size * 3` bytes.
    pub fn read_rgb_square(&self, size: u32, out: &mut Vec<u8>) {
        let size = size as usize;
        out.clear();
        out.resize(size * size * 3, 0);
        let width = self.width as usize;
        let height = self.height as usize;
        for y in 0..size.min(height) {
            for x in 0..size.min(width) {
                let src = (y * width + x) * 4;
                let dst = (y * size + x) * 3;
                out[dst..dst + 3].copy_from_slice(&self.color[src..src + 3]);
            }
        }
    }

    pub fn save_png(&self, path: &Path) -> Result<(), image::ImageError> {
        image::save_buffer(
            path,
            &self.color,
            self.width,
            self.height,
            image::ExtendedColorType::Rgba8,
        )
    }

    fn clip_rect(&self, x: i32, y: i32, width: i32, height: i32) -> Option<(i32, i32, i32, i32)> {
        let start_x = x.max(0);
        let start_y = y.max(0);
        let end_x = x.saturating_add(width).min(self.width as i32);
        let end_y = y.saturating_add(height).min(self.height as i32);
        if end_x <= start_x || end_y <= start_y {
            return None;
        }
        Some((start_x, start_y, end_x, end_y))
    }

    fn pixel_index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    fn byte_offset(&self, x: i32, y: i32) -> Option<usize> {
        self.pixel_index(x, y).map(|index| index * 4)
    }
}

pub fn to_rgba8(color: Color) -> [u8; 4] {
    [
        unit_to_u8(color[0]),
        unit_to_u8(color[1]),
        unit_to_u8(color[2]),
        unit_to_u8(color[3]),
    ]
}

pub fn lerp_color(a: Color, b: Color, t: f32) -> Color {
    let t = t.clamp(0.0, 1.0);
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
        a[3] + (b[3] - a[3]) * t,
    ]
}

fn unit_to_u8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_sets_every_pixel_and_resets_depth() {
        let mut frame = Frame::new(4, 3);
        assert!(frame.depth_test(1, 1, 0.5, true));
        frame.clear([1.0, 0.0, 0.0, 1.0]);
        assert!(frame
            .pixels()
            .chunks_exact(4)
            .all(|px| px == [255, 0, 0, 255]));
        assert!(frame.depth_test(1, 1, 0.9, false));
    }

    #[test]
    fn depth_test_rejects_farther_fragments() {
        let mut frame = Frame::new(2, 2);
        assert!(frame.depth_test(0, 0, 0.4, true));
        assert!(!frame.depth_test(0, 0, 0.6, true));
        assert!(frame.depth_test(0, 0, 0.4, true));
        assert!(!frame.depth_test(5, 0, 0.1, true));
    }

    #[test]
    fn half_alpha_blend_mixes_with_destination() {
        let mut frame = Frame::new(1, 1);
        frame.clear([1.0, 1.0, 1.0, 1.0]);
        frame.blend_pixel(0, 0, [0.0, 0.0, 0.0, 0.5]);
        let px = frame.pixel(0, 0).expect("pixel");
        assert!((127..=128).contains(&px[0]));
        assert_eq!(px[3], 255);
    }

    #[test]
    fn fill_rect_clips_to_frame() {
        let mut frame = Frame::new(4, 4);
        frame.clear(BLACK);
        frame.fill_rect(-2, -2, 4, 4, [0.0, 1.0, 0.0, 1.0]);
        assert_eq!(frame.pixel(1, 1), Some([0, 255, 0, 255]));
        assert_eq!(frame.pixel(2, 2), Some([0, 0, 0, 255]));
    }

    #[test]
    fn gradient_runs_from_left_to_right() {
        let mut frame = Frame::new(5, 1);
        frame.clear(BLACK);
        frame.fill_horizontal_gradient(0, 0, 5, 1, [1.0, 0.0, 0.0, 1.0], [0.0, 0.0, 1.0, 1.0]);
        assert_eq!(frame.pixel(0, 0), Some([255, 0, 0, 255]));
        assert_eq!(frame.pixel(4, 0), Some([0, 0, 255, 255]));
    }

    #[test]
    fn rgb_readback_is_packed_and_padded() {
        let mut frame = Frame::new(3, 2);
        frame.clear([0.0, 0.0, 1.0, 1.0]);
        frame.put_pixel(1, 0, [10, 20, 30, 255]);
        let mut out = Vec::new();
        frame.read_rgb_square(3, &mut out);
        assert_eq!(out.len(), 27);
        assert_eq!(&out[3..6], &[10, 20, 30]);
        assert_eq!(&out[0..3], &[0, 0, 255]);
        assert_eq!(&out[18..21], &[0, 0, 0]);
    }

    #[test]
    fn resize_reallocates_planes() {
        let mut frame = Frame::new(2, 2);
        frame.resize(8, 4);
        assert_eq!(frame.size(), (8, 4));
        assert_eq!(frame.pixels().len(), 8 * 4 * 4);
    }
}
