use glam::Vec3;

use super::frame::{Color, Frame};
use super::texture::Texture;
use super::view::View;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub color: Color,
}

/// Culling of counter-clockwise-from-behind faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cull {
    Back,
    None,
}

/// Gouraud-shaded, depth-tested triangle.
///
/// Translucent vertices (alpha below 1) are blended and leave depth untouched.
/// Triangles crossing the near plane are dropped whole.
pub fn draw_triangle(frame: &mut Frame, view: &View, triangle: &[Vertex; 3], cull: Cull) {
    let mut projected = [(0.0f32, 0.0f32, 0.0f32); 3];
    let mut colors = [[0.0f32; 4]; 3];
    for (index, vertex) in triangle.iter().enumerate() {
        let Some(point) = view.project(vertex.position) else {
            return;
        };
        projected[index] = (point.x, point.y, point.depth);
        colors[index] = view.shade(vertex.position, vertex.normal, vertex.color);
    }

    let [(x0, y0, z0), (x1, y1, z1), (x2, y2, z2)] = projected;
    let area = edge(x0, y0, x1, y1, x2, y2);
    if area.abs() <= f32::EPSILON {
        return;
    }
    // Window y grows downward, so front faces have negative signed area.
    if cull == Cull::Back && area > 0.0 {
        return;
    }

    let width = frame.width() as f32;
    let height = frame.height() as f32;
    let min_x = x0.min(x1).min(x2).floor().max(0.0) as i32;
    let max_x = x0.max(x1).max(x2).ceil().min(width - 1.0) as i32;
    let min_y = y0.min(y1).min(y2).floor().max(0.0) as i32;
    let max_y = y0.max(y1).max(y2).ceil().min(height - 1.0) as i32;
    if min_x > max_x || min_y > max_y {
        return;
    }

    let translucent = colors.iter().any(|color| color[3] < 1.0);
    for py in min_y..=max_y {
        let sample_y = py as f32 + 0.5;
        for px in min_x..=max_x {
            let sample_x = px as f32 + 0.5;
            let w0 = edge(x1, y1, x2, y2, sample_x, sample_y) / area;
            let w1 = edge(x2, y2, x0, y0, sample_x, sample_y) / area;
            let w2 = 1.0 - w0 - w1;
            if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                continue;
            }
            let depth = w0 * z0 + w1 * z1 + w2 * z2;
            if !frame.depth_test(px, py, depth, !translucent) {
                continue;
            }
            let mut color = [0.0f32; 4];
            for (channel, value) in color.iter_mut().enumerate() {
                *value = w0 * colors[0][channel] + w1 * colors[1][channel] + w2 * colors[2][channel];
            }
            frame.blend_pixel(px, py, color);
        }
    }
}

/// Draws a quad as two triangles; corners in counter-clockwise order.
pub fn draw_quad(frame: &mut Frame, view: &View, corners: &[Vertex; 4], cull: Cull) {
    draw_triangle(frame, view, &[corners[0], corners[1], corners[2]], cull);
    draw_triangle(frame, view, &[corners[0], corners[2], corners[3]], cull);
}

/// Draws a lit sphere as a screen-facing disc.
///
/// With an environment texture the disc is sphere mapped: each pixel's
/// screen-space normal picks the texel at `((nx + 1) / 2, (ny + 1) / 2)` and
/// blends it over the shaded base by `reflectivity` times the texel alpha.
pub fn draw_sphere(
    frame: &mut Frame,
    view: &View,
    center: Vec3,
    radius: f32,
    base: Color,
    environment: Option<&Texture>,
    reflectivity: f32,
) {
    let Some(projected) = view.project(center) else {
        return;
    };
    let screen_radius = radius * view.projection.y_axis.y * view.viewport.1 as f32
        / (2.0 * projected.clip_w);
    if screen_radius < 0.5 {
        return;
    }
    let light_dir = (view.lighting.position - center).normalize_or_zero();
    let eye_light = view.modelview.transform_vector3(light_dir).normalize_or_zero();
    let depth_scale = radius / projected.clip_w * 0.01;

    let min_x = (projected.x - screen_radius).floor() as i32;
    let max_x = (projected.x + screen_radius).ceil() as i32;
    let min_y = (projected.y - screen_radius).floor() as i32;
    let max_y = (projected.y + screen_radius).ceil() as i32;
    for py in min_y..=max_y {
        let ny = (py as f32 + 0.5 - projected.y) / screen_radius;
        for px in min_x..=max_x {
            let nx = (px as f32 + 0.5 - projected.x) / screen_radius;
            let rim = nx * nx + ny * ny;
            if rim >= 1.0 {
                continue;
            }
            let nz = (1.0 - rim).sqrt();
            if !frame.depth_test(px, py, projected.depth - nz * depth_scale, true) {
                continue;
            }
            let normal = Vec3::new(nx, -ny, nz);
            let lambert = normal.dot(eye_light).max(0.0);
            let mut color = base;
            for channel in 0..3 {
                color[channel] = (base[channel]
                    * (view.lighting.ambient[channel] + view.lighting.diffuse[channel] * lambert))
                    .clamp(0.0, 1.0);
            }
            if let Some(texture) = environment {
                let texel = texture.sample((nx + 1.0) * 0.5, (ny + 1.0) * 0.5);
                let weight = reflectivity * texel[3];
                for channel in 0..3 {
                    color[channel] += (texel[channel] - color[channel]) * weight;
                }
            }
            frame.blend_pixel(px, py, view.apply_fog(center, color));
        }
    }
}

fn edge(ax: f32, ay: f32, bx: f32, by: f32, px: f32, py: f32) -> f32 {
    (bx - ax) * (py - ay) - (by - ay) * (px - ax)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::rendering::frame::BLACK;
    use crate::app::rendering::texture::Filter;

    fn top_down_view(size: u32) -> View {
        let mut view = View {
            viewport: (size, size),
            ..View::default()
        };
        view.set_perspective(60.0, 1.0, 0.1, 100.0);
        view.set_look_at(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y);
        view
    }

    fn floor_quad(color: Color) -> [Vertex; 4] {
        let corner = |x: f32, y: f32| Vertex {
            position: Vec3::new(x, y, 0.0),
            normal: Vec3::Z,
            color,
        };
        [
            corner(-2.0, -2.0),
            corner(2.0, -2.0),
            corner(2.0, 2.0),
            corner(-2.0, 2.0),
        ]
    }

    #[test]
    fn front_facing_quad_covers_center() {
        let view = top_down_view(64);
        let mut frame = Frame::new(64, 64);
        frame.clear(BLACK);
        draw_quad(&mut frame, &view, &floor_quad([1.0, 1.0, 1.0, 1.0]), Cull::Back);
        let center = frame.pixel(32, 32).expect("pixel");
        assert!(center[0] > 0);
        assert_eq!(frame.pixel(0, 0), Some([0, 0, 0, 255]));
    }

    #[test]
    fn back_facing_quad_is_culled() {
        let view = top_down_view(32);
        let mut frame = Frame::new(32, 32);
        frame.clear(BLACK);
        let mut quad = floor_quad([1.0, 1.0, 1.0, 1.0]);
        quad.reverse();
        draw_quad(&mut frame, &view, &quad, Cull::Back);
        assert_eq!(frame.pixel(16, 16), Some([0, 0, 0, 255]));
        draw_quad(&mut frame, &view, &quad, Cull::None);
        assert_ne!(frame.pixel(16, 16), Some([0, 0, 0, 255]));
    }

    #[test]
    fn nearer_surface_wins_depth_test() {
        let view = top_down_view(32);
        let mut frame = Frame::new(32, 32);
        frame.clear(BLACK);
        let mut raised = floor_quad([0.0, 1.0, 0.0, 1.0]);
        for vertex in &mut raised {
            vertex.position.z = 1.0;
        }
        draw_quad(&mut frame, &view, &raised, Cull::Back);
        draw_quad(&mut frame, &view, &floor_quad([1.0, 0.0, 0.0, 1.0]), Cull::Back);
        let center = frame.pixel(16, 16).expect("pixel");
        assert_eq!(center[0], 0);
        assert!(center[1] > 0);
    }

    #[test]
    fn sphere_samples_environment_texture() {
        let view = top_down_view(64);
        let mut frame = Frame::new(64, 64);
        frame.clear(BLACK);
        let env = Texture::from_rgba(1, 1, vec![0, 0, 255, 255], Filter::Linear).expect("env");
        draw_sphere(&mut frame, &view, Vec3::ZERO, 1.0, [1.0, 0.0, 0.0, 1.0], Some(&env), 1.0);
        let center = frame.pixel(32, 32).expect("pixel");
        assert_eq!(center[2], 255);
        assert_eq!(center[0], 0);
    }
}
