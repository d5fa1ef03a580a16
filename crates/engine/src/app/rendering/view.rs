use glam::{Mat4, Vec3, Vec4};

use super::frame::{Color, BLACK};
use super::texture::Filter;

/// Graphics detail level, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum GfxDetail {
    None,
    Minimal,
    Simple,
    Normal,
    #[default]
    Extra,
    Everything,
}

impl GfxDetail {
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(Self::None),
            1 => Some(Self::Minimal),
            2 => Some(Self::Simple),
            3 => Some(Self::Normal),
            4 => Some(Self::Extra),
            5 => Some(Self::Everything),
            _ => None,
        }
    }

    /// Only the highest detail level filters textures linearly.
    pub fn texture_filter(self) -> Filter {
        if self == Self::Everything {
            Filter::Linear
        } else {
            Filter::Nearest
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fog {
    pub enabled: bool,
    pub color: Color,
    pub start: f32,
    pub end: f32,
}

impl Default for Fog {
    fn default() -> Self {
        Self {
            enabled: false,
            color: BLACK,
            start: 0.0,
            end: 1.0,
        }
    }
}

impl Fog {
    /// Visibility factor: 1.0 unfogged, 0.0 fully fogged.
    pub fn visibility(&self, eye_distance: f32) -> f32 {
        if !self.enabled {
            return 1.0;
        }
        let span = self.end - self.start;
        if span <= f32::EPSILON {
            return if eye_distance <= self.start { 1.0 } else { 0.0 };
        }
        ((self.end - eye_distance) / span).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lighting {
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
    pub ambient: [f32; 3],
    pub global_ambient: [f32; 3],
    pub position: Vec3,
    pub quadratic_attenuation: f32,
}

impl Lighting {
    /// Distant sun used for daytime tracks.
    pub fn sun() -> Self {
        Self {
            diffuse: [0.8, 0.8, 0.8],
            specular: [0.8, 0.8, 0.8],
            ambient: [0.2, 0.2, 0.2],
            global_ambient: [0.0, 0.0, 0.0],
            position: Vec3::new(-100.0, -50.0, 450.0),
            quadratic_attenuation: 0.0,
        }
    }

    /// Point light hovering above `carrier`, used on night tracks.
    pub fn lantern(carrier: Vec3) -> Self {
        Self {
            diffuse: [0.9, 0.9, 0.9],
            specular: [0.9, 0.9, 0.9],
            ambient: [0.0, 0.0, 0.0],
            global_ambient: [0.0, 0.0, 0.0],
            position: carrier + Vec3::new(0.0, 0.0, 2.0),
            quadratic_attenuation: 0.25,
        }
    }

    /// Lambert shading of `base` at `position` with surface `normal`.
    pub fn shade(&self, position: Vec3, normal: Vec3, base: Color) -> Color {
        let to_light = self.position - position;
        let distance_sq = to_light.length_squared();
        let attenuation = 1.0 / (1.0 + self.quadratic_attenuation * distance_sq);
        let lambert = normal
            .normalize_or_zero()
            .dot(to_light.normalize_or_zero())
            .max(0.0)
            * attenuation;
        let mut out = base;
        for channel in 0..3 {
            let light = self.global_ambient[channel]
                + self.ambient[channel]
                + self.diffuse[channel] * lambert;
            out[channel] = (base[channel] * light).clamp(0.0, 1.0);
        }
        out
    }
}

impl Default for Lighting {
    fn default() -> Self {
        Self::sun()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedVertex {
    pub x: f32,
    pub y: f32,
    pub depth: f32,
    pub clip_w: f32,
}

/// The transform, fog and lighting state shared by every draw in a pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct View {
    pub modelview: Mat4,
    pub projection: Mat4,
    pub fog: Fog,
    pub lighting: Lighting,
    pub detail: GfxDetail,
    pub viewport: (u32, u32),
}

impl Default for View {
    fn default() -> Self {
        Self {
            modelview: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            fog: Fog::default(),
            lighting: Lighting::default(),
            detail: GfxDetail::default(),
            viewport: (1, 1),
        }
    }
}

impl View {
    pub fn set_perspective(&mut self, fov_y_degrees: f32, aspect: f32, near: f32, far: f32) {
        self.projection =
            Mat4::perspective_rh_gl(fov_y_degrees.to_radians(), aspect.max(1e-3), near, far);
    }

    pub fn set_look_at(&mut self, eye: Vec3, center: Vec3, up: Vec3) {
        self.modelview = Mat4::look_at_rh(eye, center, up);
    }

    pub fn texture_filter(&self) -> Filter {
        self.detail.texture_filter()
    }

    pub fn eye_space(&self, world: Vec3) -> Vec3 {
        self.modelview.transform_point3(world)
    }

    pub fn eye_position(&self) -> Vec3 {
        self.modelview.inverse().transform_point3(Vec3::ZERO)
    }

    /// Projects a world point to window pixels, or `None` behind the near plane.
    pub fn project(&self, world: Vec3) -> Option<ProjectedVertex> {
        let clip = self.projection * self.modelview * Vec4::new(world.x, world.y, world.z, 1.0);
        if clip.w <= 1e-4 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        let (width, height) = self.viewport;
        Some(ProjectedVertex {
            x: (ndc.x * 0.5 + 0.5) * width as f32,
            y: (0.5 - ndc.y * 0.5) * height as f32,
            depth: ndc.z * 0.5 + 0.5,
            clip_w: clip.w,
        })
    }

    /// Lighting followed by fog for a surface point.
    pub fn shade(&self, position: Vec3, normal: Vec3, base: Color) -> Color {
        let lit = self.lighting.shade(position, normal, base);
        self.apply_fog(position, lit)
    }

    pub fn apply_fog(&self, position: Vec3, color: Color) -> Color {
        if !self.fog.enabled {
            return color;
        }
        let visibility = self.fog.visibility(self.eye_space(position).length());
        let mut out = color;
        for channel in 0..3 {
            out[channel] =
                self.fog.color[channel] + (color[channel] - self.fog.color[channel]) * visibility;
        }
        out
    }
}
