mod frame;
mod presenter;
mod raster;
mod text;
mod texture;
mod view;

pub use frame::{lerp_color, to_rgba8, Color, Frame, BLACK, TRANSPARENT};
pub use presenter::Presenter;
pub use raster::{draw_quad, draw_sphere, draw_triangle, Cull, Vertex};
pub use text::{draw_text, glyph_advance, line_height, text_width, Align};
pub use texture::{Filter, Texture, TextureCache, TextureError};
pub use view::{Fog, GfxDetail, Lighting, ProjectedVertex, View};
