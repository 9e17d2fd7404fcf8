//! In-memory map graph.
//!
//! Entities refer to each other by index into the owning lists of `Map`,
//! the same way the file does.

use ndarray::Array2;

use crate::format;
use crate::format::TilemapKind;
use crate::services::SampleId;
use crate::services::TextureId;

pub use crate::format::Color;
pub use crate::format::MapItemEnvpointBezier as Bezier;
pub use crate::format::Point;
pub use crate::format::Quad;
pub use crate::format::SpeedupTile;
pub use crate::format::SwitchTile;
pub use crate::format::TeleTile;
pub use crate::format::Tile;
pub use crate::format::TuneTile;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Map {
    pub info: Info,
    pub images: Vec<Image>,
    pub sounds: Vec<Sound>,
    pub groups: Vec<Group>,
    pub envelopes: Vec<Envelope>,
    /// Set by editing code, cleared by loading.
    pub modified: bool,
}

impl Map {
    pub fn new() -> Map {
        Default::default()
    }
    /// Drops everything, leaving an empty map.
    pub fn clean(&mut self) {
        *self = Map::new();
    }
    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.groups.iter().flat_map(|g| g.layers.iter())
    }
    pub fn tile_layers(&self) -> impl Iterator<Item = &TileLayer> {
        self.layers().filter_map(|l| l.kind.tiles())
    }
    pub fn game_layer(&self) -> Option<&TileLayer> {
        self.tile_layers().find(|t| t.kind() == TilemapKind::Game)
    }
}

/// Empty strings are not stored.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Info {
    pub author: String,
    pub version: String,
    pub credits: String,
    pub license: String,
    /// Server commands executed when the map is loaded.
    pub settings: Vec<String>,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ImageFormat {
    Rgb,
    Rgba,
}

impl ImageFormat {
    pub fn from_i32(format: i32) -> Option<ImageFormat> {
        match format {
            format::IMAGE_FORMAT_RGB => Some(ImageFormat::Rgb),
            format::IMAGE_FORMAT_RGBA => Some(ImageFormat::Rgba),
            _ => None,
        }
    }
    pub fn pixel_size(self) -> usize {
        match self {
            ImageFormat::Rgb => 3,
            ImageFormat::Rgba => 4,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    /// Loaded from `mapres/<name>.png` instead of being embedded.
    pub external: bool,
    /// `None` for external images that couldn't be resolved.
    pub data: Option<Vec<u8>>,
    pub texture: Option<TextureId>,
}

impl Image {
    pub fn is_tileable(&self) -> bool {
        self.width % 16 == 0 && self.height % 16 == 0
    }
    /// Pixel data converted to RGBA.
    pub fn rgba_data(&self) -> Option<Vec<u8>> {
        let data = self.data.as_ref()?;
        Some(match self.format {
            ImageFormat::Rgba => data.clone(),
            ImageFormat::Rgb => data
                .chunks_exact(3)
                .flat_map(|p| [p[0], p[1], p[2], 255])
                .collect(),
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Sound {
    pub name: String,
    pub external: bool,
    /// Opus file contents.
    pub data: Option<Vec<u8>>,
    pub sample: Option<SampleId>,
}

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Clipping {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Group {
    pub name: String,
    pub offset_x: i32,
    pub offset_y: i32,
    pub parallax_x: i32,
    pub parallax_y: i32,
    /// `None` if the zoom follows the parallax.
    pub parallax_zoom: Option<i32>,
    pub use_clipping: bool,
    pub clipping: Clipping,
    pub layers: Vec<Layer>,
}

impl Default for Group {
    fn default() -> Group {
        Group {
            name: String::new(),
            offset_x: 0,
            offset_y: 0,
            parallax_x: 100,
            parallax_y: 100,
            parallax_zoom: None,
            use_clipping: false,
            clipping: Clipping::default(),
            layers: Vec::new(),
        }
    }
}

pub fn default_parallax_zoom(parallax_x: i32, parallax_y: i32) -> i32 {
    parallax_x.max(parallax_y).clamp(0, 100)
}

impl Group {
    pub fn parallax_zoom(&self) -> i32 {
        self.parallax_zoom
            .unwrap_or_else(|| default_parallax_zoom(self.parallax_x, self.parallax_y))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Layer {
    pub name: String,
    /// Only shown with high detail settings.
    pub detail: bool,
    pub kind: LayerKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LayerKind {
    Tiles(TileLayer),
    Quads(QuadLayer),
    Sounds(SoundLayer),
}

impl LayerKind {
    pub fn tiles(&self) -> Option<&TileLayer> {
        match *self {
            LayerKind::Tiles(ref t) => Some(t),
            _ => None,
        }
    }
    pub fn tiles_mut(&mut self) -> Option<&mut TileLayer> {
        match *self {
            LayerKind::Tiles(ref mut t) => Some(t),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TileLayer {
    pub color: Color,
    /// Envelope index, -1 for none.
    pub color_env: i32,
    pub color_env_offset: i32,
    pub image: Option<usize>,
    /// Rows by columns. For physics layers other than game and front, this
    /// is derived from the side array.
    pub tiles: Array2<Tile>,
    pub physics: Physics,
    pub automapper: AutoMapperConfig,
}

/// Side arrays of physics layers, with the same shape as `TileLayer::tiles`.
#[derive(Clone, Debug, PartialEq)]
pub enum Physics {
    None,
    Game,
    Teleport(Array2<TeleTile>),
    Speedup(Array2<SpeedupTile>),
    Front,
    Switch(Array2<SwitchTile>),
    Tune(Array2<TuneTile>),
}

impl Physics {
    pub fn kind(&self) -> TilemapKind {
        match *self {
            Physics::None => TilemapKind::Tiles,
            Physics::Game => TilemapKind::Game,
            Physics::Teleport(_) => TilemapKind::Teleport,
            Physics::Speedup(_) => TilemapKind::Speedup,
            Physics::Front => TilemapKind::Front,
            Physics::Switch(_) => TilemapKind::Switch,
            Physics::Tune(_) => TilemapKind::Tune,
        }
    }
    /// Empty side data of the given kind.
    pub fn empty(kind: TilemapKind, height: usize, width: usize) -> Physics {
        let shape = (height, width);
        match kind {
            TilemapKind::Tiles => Physics::None,
            TilemapKind::Game => Physics::Game,
            TilemapKind::Teleport => Physics::Teleport(Array2::default(shape)),
            TilemapKind::Speedup => Physics::Speedup(Array2::default(shape)),
            TilemapKind::Front => Physics::Front,
            TilemapKind::Switch => Physics::Switch(Array2::default(shape)),
            TilemapKind::Tune => Physics::Tune(Array2::default(shape)),
        }
    }
}

impl TileLayer {
    pub fn new(width: usize, height: usize) -> TileLayer {
        TileLayer::with_kind(TilemapKind::Tiles, width, height)
    }
    pub fn with_kind(kind: TilemapKind, width: usize, height: usize) -> TileLayer {
        TileLayer {
            color: Color::default(),
            color_env: -1,
            color_env_offset: 0,
            image: None,
            tiles: Array2::default((height, width)),
            physics: Physics::empty(kind, height, width),
            automapper: AutoMapperConfig::default(),
        }
    }
    pub fn width(&self) -> usize {
        self.tiles.ncols()
    }
    pub fn height(&self) -> usize {
        self.tiles.nrows()
    }
    pub fn kind(&self) -> TilemapKind {
        self.physics.kind()
    }
    pub fn is_physics(&self) -> bool {
        self.kind() != TilemapKind::Tiles
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct AutoMapperConfig {
    /// Rule set of the image's automapper, -1 for none.
    pub config: i32,
    pub seed: i32,
    /// Reapply the rules after each edit.
    pub automatic: bool,
}

impl Default for AutoMapperConfig {
    fn default() -> AutoMapperConfig {
        AutoMapperConfig {
            config: -1,
            seed: 0,
            automatic: false,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QuadLayer {
    pub image: Option<usize>,
    pub quads: Vec<Quad>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SoundLayer {
    pub sound: Option<usize>,
    pub sources: Vec<SoundSource>,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SoundShape {
    Rectangle { width: i32, height: i32 },
    Circle { radius: i32 },
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct SoundSource {
    pub position: Point,
    pub looped: bool,
    pub pan: bool,
    /// In seconds.
    pub time_delay: i32,
    pub falloff: i32,
    pub position_env: i32,
    pub position_env_offset: i32,
    pub sound_env: i32,
    pub sound_env_offset: i32,
    pub shape: SoundShape,
}

impl SoundSource {
    pub fn from_raw(raw: &format::SoundSourceV1) -> SoundSource {
        let shape = match raw.shape_type {
            format::SOUND_SHAPE_CIRCLE => SoundShape::Circle { radius: raw.shape[0] },
            _ => SoundShape::Rectangle {
                width: raw.shape[0],
                height: raw.shape[1],
            },
        };
        SoundSource {
            position: raw.position,
            looped: raw.looped != 0,
            pan: raw.pan != 0,
            time_delay: raw.time_delay,
            falloff: raw.falloff,
            position_env: raw.position_env,
            position_env_offset: raw.position_env_offset,
            sound_env: raw.sound_env,
            sound_env_offset: raw.sound_env_offset,
            shape,
        }
    }
    /// Upgrades a source of the deprecated sound layer type: it pans, has
    /// no falloff, and is a circle of the old falloff distance.
    pub fn from_legacy(raw: &format::SoundSourceLegacy) -> SoundSource {
        SoundSource {
            position: raw.position,
            looped: raw.looped != 0,
            pan: true,
            time_delay: raw.time_delay,
            falloff: 0,
            position_env: raw.position_env,
            position_env_offset: raw.position_env_offset,
            sound_env: raw.sound_env,
            sound_env_offset: raw.sound_env_offset,
            shape: SoundShape::Circle {
                radius: raw.falloff_distance,
            },
        }
    }
    pub fn to_raw(&self) -> format::SoundSourceV1 {
        let (shape_type, shape) = match self.shape {
            SoundShape::Rectangle { width, height } => {
                (format::SOUND_SHAPE_RECTANGLE, [width, height])
            }
            SoundShape::Circle { radius } => (format::SOUND_SHAPE_CIRCLE, [radius, 0]),
        };
        format::SoundSourceV1 {
            position: self.position,
            looped: self.looped as i32,
            pan: self.pan as i32,
            time_delay: self.time_delay,
            falloff: self.falloff,
            position_env: self.position_env,
            position_env_offset: self.position_env_offset,
            sound_env: self.sound_env,
            sound_env_offset: self.sound_env_offset,
            shape_type,
            shape,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CurveType {
    Step,
    Linear,
    Slow,
    Fast,
    Smooth,
    Bezier,
}

impl CurveType {
    pub fn from_i32(curve_type: i32) -> Option<CurveType> {
        Some(match curve_type {
            format::CURVETYPE_STEP => CurveType::Step,
            format::CURVETYPE_LINEAR => CurveType::Linear,
            format::CURVETYPE_SLOW => CurveType::Slow,
            format::CURVETYPE_FAST => CurveType::Fast,
            format::CURVETYPE_SMOOTH => CurveType::Smooth,
            format::CURVETYPE_BEZIER => CurveType::Bezier,
            _ => return None,
        })
    }
    pub fn to_i32(self) -> i32 {
        match self {
            CurveType::Step => format::CURVETYPE_STEP,
            CurveType::Linear => format::CURVETYPE_LINEAR,
            CurveType::Slow => format::CURVETYPE_SLOW,
            CurveType::Fast => format::CURVETYPE_FAST,
            CurveType::Smooth => format::CURVETYPE_SMOOTH,
            CurveType::Bezier => format::CURVETYPE_BEZIER,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct EnvPoint {
    /// In milliseconds.
    pub time: i32,
    pub curve: CurveType,
    /// Fixed point values, one per channel.
    pub values: [i32; 4],
    /// Tangents, all zero unless this or the previous point is a bezier
    /// point.
    pub bezier: Bezier,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    pub name: String,
    /// 1 for sounds, 3 for positions, 4 for colors.
    pub channels: i32,
    pub synchronized: bool,
    pub points: Vec<EnvPoint>,
}
