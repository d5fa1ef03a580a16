use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use engine::app::rendering::{draw_quad, Color, Cull, Frame, GfxDetail, Vertex, View, BLACK};
use glam::Vec3;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

/// Height of one elevation step in a level row (`'1'..='9'`).
pub(crate) const HEIGHT_STEP: f32 = 0.25;
pub(crate) const WATER_SURFACE: f32 = 0.0;
const WATER_BED: f32 = -0.75;
const DEFAULT_TIME_LIMIT_SECONDS: f32 = 180.0;
/// Cells farther than this from the camera cell are not drawn.
const DRAW_RADIUS: i32 = 14;
const VOID_WALL_DEPTH: f32 = 2.0;

const BUILTIN_LEVELS: &[(&str, &str)] = &[
    ("lv1", include_str!("../../../../assets/levels/lv1.json")),
    ("lv2", include_str!("../../../../assets/levels/lv2.json")),
    ("bonus1", include_str!("../../../../assets/levels/bonus1.json")),
    ("lv3", include_str!("../../../../assets/levels/lv3.json")),
];

#[derive(Debug, Error)]
pub(crate) enum LevelLoadError {
    #[error("invalid level id {0:?}: only letters, digits, '-' and '_' are allowed")]
    InvalidId(String),
    #[error("level {0:?} not found on disk or among built-in levels")]
    NotFound(String),
    #[error("failed to read level file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse level {id:?} at {location}: {source}")]
    Parse {
        id: String,
        location: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("level {id:?} is malformed: {reason}")]
    Malformed { id: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DrawPass {
    /// Opaque floor and walls.
    Background,
    /// Translucent water surfaces and goal markers.
    Foreground,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CellKind {
    Void,
    Floor,
    Water,
    Ice,
    Frost,
    Goal,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Cell {
    pub(crate) kind: CellKind,
    pub(crate) height: f32,
}

impl Cell {
    const VOID: Cell = Cell {
        kind: CellKind::Void,
        height: 0.0,
    };
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LevelInfo {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) author: String,
    pub(crate) start_position: Vec3,
    pub(crate) fog_color: Color,
    pub(crate) fog_thickness: f32,
    pub(crate) is_night: bool,
    pub(crate) is_bonus: bool,
    pub(crate) next_level: Option<String>,
    pub(crate) return_level: Option<String>,
    pub(crate) time_limit: f32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LevelFile {
    name: String,
    #[serde(default)]
    author: String,
    start: [f32; 3],
    #[serde(default)]
    fog: FogFile,
    #[serde(default)]
    night: bool,
    #[serde(default)]
    bonus: bool,
    #[serde(default)]
    next_level: Option<String>,
    #[serde(default)]
    return_level: Option<String>,
    #[serde(default = "default_time_limit")]
    time_limit: f32,
    rows: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FogFile {
    color: [f32; 4],
    thickness: f32,
}

impl Default for FogFile {
    fn default() -> Self {
        Self {
            color: BLACK,
            thickness: 0.0,
        }
    }
}

fn default_time_limit() -> f32 {
    DEFAULT_TIME_LIMIT_SECONDS
}

/// A height-field track of unit cells.
///
/// Rows are listed north to south: the first row is the highest `y`. Cell
/// `(x, y)` covers `[x, x + 1) × [y, y + 1)`.
#[derive(Debug, Clone)]
pub(crate) struct Level {
    pub(crate) info: LevelInfo,
    width: i32,
    height: i32,
    cells: Vec<Cell>,
    diamond_cells: Vec<(i32, i32)>,
}

impl Level {
    pub(crate) fn from_json(id: &str, raw: &str) -> Result<Self, LevelLoadError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let file: LevelFile =
            serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
                let location = error.path().to_string();
                LevelLoadError::Parse {
                    id: id.to_string(),
                    location: if location.is_empty() {
                        ".".to_string()
                    } else {
                        location
                    },
                    source: error.into_inner(),
                }
            })?;
        Self::from_file(id, file)
    }

    fn from_file(id: &str, file: LevelFile) -> Result<Self, LevelLoadError> {
        let malformed = |reason: String| LevelLoadError::Malformed {
            id: id.to_string(),
            reason,
        };
        let height = file.rows.len();
        let width = file.rows.first().map(|row| row.chars().count()).unwrap_or(0);
        if width == 0 || height == 0 {
            return Err(malformed("level has no cells".to_string()));
        }

        let mut cells = vec![Cell::VOID; width * height];
        let mut diamond_cells = Vec::new();
        for (row_index, row) in file.rows.iter().enumerate() {
            if row.chars().count() != width {
                return Err(malformed(format!(
                    "row {row_index} has {} cells, expected {width}",
                    row.chars().count()
                )));
            }
            let y = height - 1 - row_index;
            for (x, symbol) in row.chars().enumerate() {
                let cell = parse_cell(symbol).ok_or_else(|| {
                    malformed(format!("unknown cell {symbol:?} at row {row_index}, column {x}"))
                })?;
                if symbol == 'D' {
                    diamond_cells.push((x as i32, y as i32));
                }
                cells[y * width + x] = cell;
            }
        }

        if !file.fog.thickness.is_finite() || file.fog.thickness < 0.0 {
            return Err(malformed("fog thickness must be a non-negative number".to_string()));
        }

        Ok(Self {
            info: LevelInfo {
                id: id.to_string(),
                name: file.name,
                author: file.author,
                start_position: Vec3::from_array(file.start),
                fog_color: file.fog.color,
                fog_thickness: file.fog.thickness,
                is_night: file.night,
                is_bonus: file.bonus,
                next_level: file.next_level.filter(|next| !next.is_empty()),
                return_level: file.return_level.filter(|level| !level.is_empty()),
                time_limit: file.time_limit.max(1.0),
            },
            width: width as i32,
            height: height as i32,
            cells,
            diamond_cells,
        })
    }

    #[cfg(test)]
    pub(crate) fn size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    pub(crate) fn cell(&self, x: i32, y: i32) -> Cell {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return Cell::VOID;
        }
        self.cells[(y * self.width + x) as usize]
    }

    pub(crate) fn cell_at(&self, position: Vec3) -> Cell {
        let (x, y) = cell_coords(position);
        self.cell(x, y)
    }

    /// Floor height under `position`, or `None` above the void.
    pub(crate) fn floor_height(&self, position: Vec3) -> Option<f32> {
        let cell = self.cell_at(position);
        (cell.kind != CellKind::Void).then_some(cell.height)
    }

    pub(crate) fn diamond_cells(&self) -> &[(i32, i32)] {
        &self.diamond_cells
    }

    pub(crate) fn set_start_position(&mut self, position: Vec3) {
        self.info.start_position = position;
    }

    pub(crate) fn draw(&self, pass: DrawPass, camera_cell: (i32, i32), frame: &mut Frame, view: &View) {
        let (cx, cy) = camera_cell;
        let min_x = (cx - DRAW_RADIUS).max(0);
        let max_x = (cx + DRAW_RADIUS).min(self.width - 1);
        let min_y = (cy - DRAW_RADIUS).max(0);
        let max_y = (cy + DRAW_RADIUS).min(self.height - 1);
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let cell = self.cell(x, y);
                if cell.kind == CellKind::Void {
                    continue;
                }
                match pass {
                    DrawPass::Background => self.draw_cell_body(x, y, cell, frame, view),
                    DrawPass::Foreground => draw_cell_overlay(x, y, cell, frame, view),
                }
            }
        }
    }

    fn draw_cell_body(&self, x: i32, y: i32, cell: Cell, frame: &mut Frame, view: &View) {
        let color = floor_color(x, y, cell);
        let (x0, y0) = (x as f32, y as f32);
        let (x1, y1) = (x0 + 1.0, y0 + 1.0);
        let z = cell.height;
        draw_quad(
            frame,
            view,
            &[
                vertex(x0, y0, z, Vec3::Z, color),
                vertex(x1, y0, z, Vec3::Z, color),
                vertex(x1, y1, z, Vec3::Z, color),
                vertex(x0, y1, z, Vec3::Z, color),
            ],
            Cull::Back,
        );
        if view.detail <= GfxDetail::Minimal {
            return;
        }

        let wall = shade(color, 0.75);
        let low = |nx: i32, ny: i32| {
            let neighbour = self.cell(nx, ny);
            if neighbour.kind == CellKind::Void {
                z - VOID_WALL_DEPTH
            } else {
                neighbour.height
            }
        };
        let south = low(x, y - 1);
        if south < z {
            draw_quad(
                frame,
                view,
                &[
                    vertex(x0, y0, south, Vec3::NEG_Y, wall),
                    vertex(x1, y0, south, Vec3::NEG_Y, wall),
                    vertex(x1, y0, z, Vec3::NEG_Y, wall),
                    vertex(x0, y0, z, Vec3::NEG_Y, wall),
                ],
                Cull::Back,
            );
        }
        let north = low(x, y + 1);
        if north < z {
            draw_quad(
                frame,
                view,
                &[
                    vertex(x1, y1, north, Vec3::Y, wall),
                    vertex(x0, y1, north, Vec3::Y, wall),
                    vertex(x0, y1, z, Vec3::Y, wall),
                    vertex(x1, y1, z, Vec3::Y, wall),
                ],
                Cull::Back,
            );
        }
        let west = low(x - 1, y);
        if west < z {
            draw_quad(
                frame,
                view,
                &[
                    vertex(x0, y1, west, Vec3::NEG_X, wall),
                    vertex(x0, y0, west, Vec3::NEG_X, wall),
                    vertex(x0, y0, z, Vec3::NEG_X, wall),
                    vertex(x0, y1, z, Vec3::NEG_X, wall),
                ],
                Cull::Back,
            );
        }
        let east = low(x + 1, y);
        if east < z {
            draw_quad(
                frame,
                view,
                &[
                    vertex(x1, y0, east, Vec3::X, wall),
                    vertex(x1, y1, east, Vec3::X, wall),
                    vertex(x1, y1, z, Vec3::X, wall),
                    vertex(x1, y0, z, Vec3::X, wall),
                ],
                Cull::Back,
            );
        }
    }
}

fn draw_cell_overlay(x: i32, y: i32, cell: Cell, frame: &mut Frame, view: &View) {
    let (x0, y0) = (x as f32, y as f32);
    let (x1, y1) = (x0 + 1.0, y0 + 1.0);
    let (z, color) = match cell.kind {
        CellKind::Water => (WATER_SURFACE, [0.2, 0.35, 0.8, 0.45]),
        CellKind::Goal => (cell.height + 0.02, [1.0, 0.9, 0.2, 0.35]),
        _ => return,
    };
    draw_quad(
        frame,
        view,
        &[
            vertex(x0, y0, z, Vec3::Z, color),
            vertex(x1, y0, z, Vec3::Z, color),
            vertex(x1, y1, z, Vec3::Z, color),
            vertex(x0, y1, z, Vec3::Z, color),
        ],
        Cull::None,
    );
}

pub(crate) fn cell_coords(position: Vec3) -> (i32, i32) {
    (position.x.floor() as i32, position.y.floor() as i32)
}

fn parse_cell(symbol: char) -> Option<Cell> {
    let floor = |kind: CellKind, height: f32| Some(Cell { kind, height });
    match symbol {
        '.' | ' ' => Some(Cell::VOID),
        '#' | 'D' | '0' => floor(CellKind::Floor, 0.0),
        '1'..='9' => {
            let steps = symbol.to_digit(10)? as f32;
            floor(CellKind::Floor, steps * HEIGHT_STEP)
        }
        '~' => floor(CellKind::Water, WATER_BED),
        'I' => floor(CellKind::Ice, 0.0),
        'F' => floor(CellKind::Frost, 0.0),
        'G' => floor(CellKind::Goal, 0.0),
        _ => None,
    }
}

fn floor_color(x: i32, y: i32, cell: Cell) -> Color {
    let base = match cell.kind {
        CellKind::Water => [0.3, 0.3, 0.45, 1.0],
        CellKind::Ice => [0.75, 0.85, 0.95, 1.0],
        CellKind::Frost => [0.55, 0.8, 1.0, 1.0],
        CellKind::Goal => [0.9, 0.8, 0.2, 1.0],
        CellKind::Floor | CellKind::Void => [0.5, 0.6, 0.5, 1.0],
    };
    let checker = if (x + y) % 2 == 0 { 1.0 } else { 0.9 };
    let lift = 1.0 + cell.height.max(0.0) * 0.1;
    shade(base, checker * lift)
}

fn shade(color: Color, factor: f32) -> Color {
    [
        (color[0] * factor).min(1.0),
        (color[1] * factor).min(1.0),
        (color[2] * factor).min(1.0),
        color[3],
    ]
}

fn vertex(x: f32, y: f32, z: f32, normal: Vec3, color: Color) -> Vertex {
    Vertex {
        position: Vec3::new(x, y, z),
        normal,
        color,
    }
}

/// Resolves level ids to levels, preferring `assets/levels/<id>.json` and
/// falling back to the levels compiled into the binary.
#[derive(Debug, Clone)]
pub(crate) struct LevelLibrary {
    level_dir: Option<PathBuf>,
}

impl LevelLibrary {
    pub(crate) fn new(level_dir: &Path) -> Self {
        if level_dir.is_dir() {
            Self {
                level_dir: Some(level_dir.to_path_buf()),
            }
        } else {
            info!(
                level_dir = %level_dir.display(),
                "level_dir_missing_using_builtin"
            );
            Self::builtin()
        }
    }

    pub(crate) fn builtin() -> Self {
        Self { level_dir: None }
    }

    pub(crate) fn load(&self, id: &str) -> Result<Level, LevelLoadError> {
        if id.is_empty()
            || !id
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
        {
            return Err(LevelLoadError::InvalidId(id.to_string()));
        }

        if let Some(dir) = &self.level_dir {
            let path = dir.join(format!("{id}.json"));
            if path.is_file() {
                let raw = fs::read_to_string(&path).map_err(|source| LevelLoadError::Read {
                    path: path.clone(),
                    source,
                })?;
                let level = Level::from_json(id, &raw)?;
                info!(level = id, path = %path.display(), "level_loaded");
                return Ok(level);
            }
        }

        let (_, raw) = BUILTIN_LEVELS
            .iter()
            .find(|(builtin_id, _)| *builtin_id == id)
            .ok_or_else(|| LevelLoadError::NotFound(id.to_string()))?;
        let level = Level::from_json(id, raw)?;
        debug!(level = id, "builtin_level_loaded");
        Ok(level)
    }
}
