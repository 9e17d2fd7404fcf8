use common::num::LeI16;
use common::str::truncated_arraystring;
use datafile::format::ex_type_uuid;
use std::fmt;
use uuid::Uuid;
use zerocopy::AsBytes;
use zerocopy::FromBytes;
use zerocopy::FromZeroes;
use zerocopy::Unaligned;

pub trait MapItem: AsBytes + FromBytes + Copy {
    fn version() -> i32;
    fn offset() -> usize;
    fn ignore_version() -> bool;
}

pub trait MapItemExt: MapItem {
    fn len() -> usize {
        std::mem::size_of::<Self>() / std::mem::size_of::<i32>()
    }
    fn sum_len() -> usize {
        Self::offset() + Self::len()
    }
    fn from_slice(slice: &[i32]) -> Result<Option<&Self>, TooShort> {
        if !Self::ignore_version() && slice.is_empty() {
            return Err(TooShort);
        }
        Self::from_slice_version(slice, slice.first().copied().unwrap_or(0))
    }
    /// Like `from_slice`, but gates on `version` instead of the version
    /// stored in the item.
    fn from_slice_version(slice: &[i32], version: i32) -> Result<Option<&Self>, TooShort> {
        if !Self::ignore_version() && version < Self::version() {
            return Ok(None);
        }
        if slice.len() < Self::sum_len() {
            return Err(TooShort);
        }
        let item = &slice[Self::offset()..Self::sum_len()];
        Self::ref_from(item.as_bytes()).map(Some).ok_or(TooShort)
    }
    fn extend_i32s(&self, out: &mut Vec<i32>) {
        out.extend(records_to_i32s(std::slice::from_ref(self)));
    }
}

impl<T: MapItem> MapItemExt for T {}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TooShort;

pub fn i32s_to_bytes(result: &mut [u8], input: &[i32]) {
    assert!(result.len() == input.len() * 4);
    for (output, input) in result.chunks_mut(4).zip(input) {
        output[0] = (((input >> 24) & 0xff) - 0x80) as u8;
        output[1] = (((input >> 16) & 0xff) - 0x80) as u8;
        output[2] = (((input >>  8) & 0xff) - 0x80) as u8;
        output[3] = (((input >>  0) & 0xff) - 0x80) as u8;
    }
}

pub fn bytes_to_i32s(result: &mut [i32], input: &[u8]) {
    assert!(input.len() == result.len() * 4);
    for (output, input) in result.iter_mut().zip(input.chunks(4)) {
        let b = |i: usize| i32::from(input[i].wrapping_add(0x80));
        *output = (b(0) << 24) | (b(1) << 16) | (b(2) << 8) | b(3);
    }
}

pub fn bytes_to_string(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|&b| b == 0) {
        Some(i) => &bytes[..i],
        None => bytes,
    }
}

/// Decodes a name packed into an integer array.
pub fn i32s_to_string(input: &[i32]) -> String {
    let mut bytes = vec![0; input.len() * 4];
    i32s_to_bytes(&mut bytes, input);
    if let Some(last) = bytes.last_mut() {
        *last = 0;
    }
    String::from_utf8_lossy(bytes_to_string(&bytes)).into_owned()
}

/// Packs a name into 3 integers (11 bytes plus terminator).
pub fn string_to_name3(s: &str) -> [i32; 3] {
    let mut bytes = [0; 12];
    let truncated = truncated_arraystring::<[u8; 11]>(s);
    bytes[..truncated.len()].copy_from_slice(truncated.as_bytes());
    let mut result = [0; 3];
    bytes_to_i32s(&mut result, &bytes);
    result[2] &= !0xff;
    result
}

/// Packs a name into 8 integers (31 bytes plus terminator).
pub fn string_to_name8(s: &str) -> [i32; 8] {
    let mut bytes = [0; 32];
    let truncated = truncated_arraystring::<[u8; 31]>(s);
    bytes[..truncated.len()].copy_from_slice(truncated.as_bytes());
    let mut result = [0; 8];
    bytes_to_i32s(&mut result, &bytes);
    result[7] &= !0xff;
    result
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Error {
    MissingVersion,
    UnsupportedVersion(i32),
    MalformedInfo,
    MalformedImage(u16),
    MalformedSound(u16),
    MalformedGroup(u16),
    MalformedLayer(u16),
    MalformedTilemap(u16),
    MalformedQuads(u16),
    MalformedSounds(u16),
    MalformedEnvelope(u16),
    MalformedAutoMapper(u16),
    /// A data block is shorter than the item referencing it claims.
    TooShort,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::MissingVersion => f.write_str("map has no version item"),
            Error::UnsupportedVersion(v) => write!(f, "unsupported map version {}", v),
            Error::MalformedInfo => f.write_str("malformed info item"),
            Error::MalformedImage(i) => write!(f, "malformed image item {}", i),
            Error::MalformedSound(i) => write!(f, "malformed sound item {}", i),
            Error::MalformedGroup(i) => write!(f, "malformed group item {}", i),
            Error::MalformedLayer(i) => write!(f, "malformed layer item {}", i),
            Error::MalformedTilemap(i) => write!(f, "malformed tile layer {}", i),
            Error::MalformedQuads(i) => write!(f, "malformed quad layer {}", i),
            Error::MalformedSounds(i) => write!(f, "malformed sound layer {}", i),
            Error::MalformedEnvelope(i) => write!(f, "malformed envelope item {}", i),
            Error::MalformedAutoMapper(i) => write!(f, "malformed automapper config item {}", i),
            Error::TooShort => f.write_str("data block too short"),
        }
    }
}

pub const MAP_ITEMTYPE_VERSION: u16 = 0;
pub const MAP_ITEMTYPE_INFO: u16 = 1;
pub const MAP_ITEMTYPE_IMAGE: u16 = 2;
pub const MAP_ITEMTYPE_ENVELOPE: u16 = 3;
pub const MAP_ITEMTYPE_GROUP: u16 = 4;
pub const MAP_ITEMTYPE_LAYER: u16 = 5;
pub const MAP_ITEMTYPE_ENVPOINTS: u16 = 6;
pub const MAP_ITEMTYPE_SOUND: u16 = 7;

pub const MAP_ITEMTYPE_EX_GROUP: &str = "mapitemtype-group@ddnet.tw";
pub const MAP_ITEMTYPE_EX_ENVPOINTS_BEZIER: &str = "mapitemtype-envpoints-bezier@ddnet.tw";
pub const MAP_ITEMTYPE_EX_AUTOMAPPER_CONFIG: &str = "mapitemtype-automapper-config@ddnet.tw";

pub fn group_ex_uuid() -> Uuid { ex_type_uuid(MAP_ITEMTYPE_EX_GROUP) }
pub fn envpoints_bezier_uuid() -> Uuid { ex_type_uuid(MAP_ITEMTYPE_EX_ENVPOINTS_BEZIER) }
pub fn automapper_config_uuid() -> Uuid { ex_type_uuid(MAP_ITEMTYPE_EX_AUTOMAPPER_CONFIG) }

pub const MAP_VERSION: i32 = 1;
pub const MAP_ITEMTYPE_INFO_VERSION: i32 = 1;
pub const MAP_ITEMTYPE_IMAGE_VERSION: i32 = 1;
pub const MAP_ITEMTYPE_SOUND_VERSION: i32 = 1;
pub const MAP_ITEMTYPE_GROUP_VERSION: i32 = 3;
pub const MAP_ITEMTYPE_GROUP_EX_VERSION: i32 = 1;
pub const MAP_ITEMTYPE_ENVELOPE_VERSION: i32 = 2;
pub const MAP_ITEMTYPE_AUTOMAPPER_CONFIG_VERSION: i32 = 1;

pub const MAP_ITEMTYPE_LAYER_V1_TILEMAP: i32 = 2;
pub const MAP_ITEMTYPE_LAYER_V1_QUADS: i32 = 3;
pub const MAP_ITEMTYPE_LAYER_V1_DDRACE_SOUNDS_LEGACY: i32 = 9;
pub const MAP_ITEMTYPE_LAYER_V1_DDRACE_SOUNDS: i32 = 10;

pub const TILEMAP_VERSION: i32 = 3;
/// From this version on, tile data is run-length encoded using `Tile::skip`.
pub const TILEMAP_VERSION_TILE_SKIP: i32 = 4;
/// Written by pre-release versions: `(1 << 16) + size of the tilemap item`.
/// Game layers of this version store entity indices without `ENTITY_OFFSET`.
pub const TILEMAP_VERSION_PRERELEASE: i32 = (1 << 16) + 23 * 4;
pub const QUADS_VERSION: i32 = 2;
pub const SOUNDS_VERSION: i32 = 2;

pub const IMAGE_FORMAT_RGB: i32 = 0;
pub const IMAGE_FORMAT_RGBA: i32 = 1;

pub const LAYERFLAG_DETAIL: i32 = 1;

pub const TILELAYERFLAG_GAME: i32 = 1;
pub const TILELAYERFLAG_TELEPORT: i32 = 2;
pub const TILELAYERFLAG_SPEEDUP: i32 = 4;
pub const TILELAYERFLAG_FRONT: i32 = 8;
pub const TILELAYERFLAG_SWITCH: i32 = 16;
pub const TILELAYERFLAG_TUNE: i32 = 32;

pub const AUTOMAPPER_FLAG_AUTOMATIC: i32 = 1;

pub const CURVETYPE_STEP: i32 = 0;
pub const CURVETYPE_LINEAR: i32 = 1;
pub const CURVETYPE_SLOW: i32 = 2;
pub const CURVETYPE_FAST: i32 = 3;
pub const CURVETYPE_SMOOTH: i32 = 4;
pub const CURVETYPE_BEZIER: i32 = 5;

pub const SOUND_SHAPE_RECTANGLE: i32 = 0;
pub const SOUND_SHAPE_CIRCLE: i32 = 1;

/// What a tile layer holds, determined from its `TILELAYERFLAG_*` bits.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TilemapKind {
    Tiles,
    Game,
    Teleport,
    Speedup,
    Front,
    Switch,
    Tune,
}

impl TilemapKind {
    /// The flags are exclusive in well-formed files; if several are set,
    /// the first match in the order below wins.
    pub fn from_flags(flags: i32) -> TilemapKind {
        if flags & TILELAYERFLAG_TELEPORT != 0 {
            TilemapKind::Teleport
        } else if flags & TILELAYERFLAG_SPEEDUP != 0 {
            TilemapKind::Speedup
        } else if flags & TILELAYERFLAG_FRONT != 0 {
            TilemapKind::Front
        } else if flags & TILELAYERFLAG_SWITCH != 0 {
            TilemapKind::Switch
        } else if flags & TILELAYERFLAG_TUNE != 0 {
            TilemapKind::Tune
        } else if flags & TILELAYERFLAG_GAME != 0 {
            TilemapKind::Game
        } else {
            TilemapKind::Tiles
        }
    }
    pub fn flags(self) -> i32 {
        match self {
            TilemapKind::Tiles => 0,
            TilemapKind::Game => TILELAYERFLAG_GAME,
            TilemapKind::Teleport => TILELAYERFLAG_TELEPORT,
            TilemapKind::Speedup => TILELAYERFLAG_SPEEDUP,
            TilemapKind::Front => TILELAYERFLAG_FRONT,
            TilemapKind::Switch => TILELAYERFLAG_SWITCH,
            TilemapKind::Tune => TILELAYERFLAG_TUNE,
        }
    }
    /// Position of this kind's data reference among the DDNet extra fields
    /// of a tilemap item.
    fn extra_index(self) -> Option<usize> {
        Some(match self {
            TilemapKind::Teleport => 0,
            TilemapKind::Speedup => 1,
            TilemapKind::Front => 2,
            TilemapKind::Switch => 3,
            TilemapKind::Tune => 4,
            TilemapKind::Tiles | TilemapKind::Game => return None,
        })
    }
}

#[derive(Clone, Copy, Debug, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct MapItemCommonV0 {
    pub version: i32,
}

#[derive(Clone, Copy, Debug, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct MapItemInfoV1 {
    pub author: i32,
    pub version: i32,
    pub credits: i32,
    pub license: i32,
}

#[derive(Clone, Copy, Debug, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct MapItemInfoV1ExtraRace {
    pub settings: i32,
}

#[derive(Clone, Copy, Debug, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct MapItemImageV1 {
    pub width: i32,
    pub height: i32,
    pub external: i32,
    pub name: i32,
    pub data: i32,
}

#[derive(Clone, Copy, Debug, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct MapItemImageV2 {
    pub format: i32,
}

#[derive(Clone, Copy, Debug, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct MapItemEnvelopeV1 {
    pub channels: i32,
    pub start_points: i32,
    pub num_points: i32,
    pub name: [i32; 8],
}

#[derive(Clone, Copy, Debug, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct MapItemEnvelopeV2 {
    pub synchronized: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct MapItemGroupV1 {
    pub offset_x: i32,
    pub offset_y: i32,
    pub parallax_x: i32,
    pub parallax_y: i32,
    pub start_layer: i32,
    pub num_layers: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct MapItemGroupV2 {
    pub use_clipping: i32,
    pub clip_x: i32,
    pub clip_y: i32,
    pub clip_w: i32,
    pub clip_h: i32,
}

#[derive(Clone, Copy, Debug, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct MapItemGroupV3 {
    pub name: [i32; 3],
}

#[derive(Clone, Copy, Debug, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct MapItemGroupExV1 {
    pub parallax_zoom: i32,
}

#[derive(Clone, Copy, Debug, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct MapItemLayerV1 {
    pub type_: i32,
    pub flags: i32,
}

#[derive(Clone, Copy, Debug, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct MapItemSoundV1 {
    pub external: i32,
    pub name: i32,
    pub data: i32,
    pub data_size: i32,
}

#[derive(Clone, Copy, Debug, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct MapItemAutoMapperConfigV1 {
    pub group_id: i32,
    pub layer_id: i32,
    pub automapper_config: i32,
    pub automapper_seed: i32,
    pub flags: i32,
}

impl MapItem for MapItemCommonV0 { fn version() -> i32 { 0 } fn offset() -> usize { 0 } fn ignore_version() -> bool { true } }
impl MapItem for MapItemInfoV1 { fn version() -> i32 { 1 } fn offset() -> usize { 1 } fn ignore_version() -> bool { false } }
impl MapItem for MapItemInfoV1ExtraRace { fn version() -> i32 { 1 } fn offset() -> usize { 5 } fn ignore_version() -> bool { false } }
impl MapItem for MapItemImageV1 { fn version() -> i32 { 1 } fn offset() -> usize { 1 } fn ignore_version() -> bool { false } }
impl MapItem for MapItemImageV2 { fn version() -> i32 { 2 } fn offset() -> usize { 6 } fn ignore_version() -> bool { false } }
impl MapItem for MapItemEnvelopeV1 { fn version() -> i32 { 1 } fn offset() -> usize { 1 } fn ignore_version() -> bool { false } }
impl MapItem for MapItemEnvelopeV2 { fn version() -> i32 { 2 } fn offset() -> usize { 12 } fn ignore_version() -> bool { false } }
impl MapItem for MapItemGroupV1 { fn version() -> i32 { 1 } fn offset() -> usize { 1 } fn ignore_version() -> bool { false } }
impl MapItem for MapItemGroupV2 { fn version() -> i32 { 2 } fn offset() -> usize { 7 } fn ignore_version() -> bool { false } }
impl MapItem for MapItemGroupV3 { fn version() -> i32 { 3 } fn offset() -> usize { 12 } fn ignore_version() -> bool { false } }
impl MapItem for MapItemGroupExV1 { fn version() -> i32 { 1 } fn offset() -> usize { 1 } fn ignore_version() -> bool { false } }
impl MapItem for MapItemLayerV1 { fn version() -> i32 { 1 } fn offset() -> usize { 1 } fn ignore_version() -> bool { true } }
impl MapItem for MapItemSoundV1 { fn version() -> i32 { 1 } fn offset() -> usize { 1 } fn ignore_version() -> bool { false } }
impl MapItem for MapItemAutoMapperConfigV1 { fn version() -> i32 { 1 } fn offset() -> usize { 1 } fn ignore_version() -> bool { false } }

// Layer items: the common layer header (version, type, flags) is followed by
// the type specific part, which starts with its own version. The structs
// below are relative to that part, i.e. `&item[MapItemLayerV1::sum_len()..]`.

#[derive(Clone, Copy, Debug, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct MapItemLayerV1TilemapV2 {
    pub width: i32,
    pub height: i32,
    pub flags: i32,
    pub color_red: i32,
    pub color_green: i32,
    pub color_blue: i32,
    pub color_alpha: i32,
    pub color_env: i32,
    pub color_env_offset: i32,
    pub image: i32,
    pub data: i32,
}

#[derive(Clone, Copy, Debug, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct MapItemLayerV1TilemapV3 {
    pub name: [i32; 3],
}

/// DDNet's physics data references, in `TilemapKind::extra_index` order.
#[derive(Clone, Copy, Debug, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct MapItemLayerV1TilemapExtraRace {
    pub data: [i32; 5],
}

#[derive(Clone, Copy, Debug, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct MapItemLayerV1QuadsV1 {
    pub num_quads: i32,
    pub data: i32,
    pub image: i32,
}

#[derive(Clone, Copy, Debug, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct MapItemLayerV1QuadsV2 {
    pub name: [i32; 3],
}

#[derive(Clone, Copy, Debug, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct MapItemLayerV1DdraceSoundsV1 {
    pub num_sources: i32,
    pub data: i32,
    pub sound: i32,
    pub name: [i32; 3],
}

impl MapItem for MapItemLayerV1TilemapV2 { fn version() -> i32 { 2 } fn offset() -> usize { 1 } fn ignore_version() -> bool { false } }
impl MapItem for MapItemLayerV1TilemapV3 { fn version() -> i32 { 3 } fn offset() -> usize { 12 } fn ignore_version() -> bool { false } }
impl MapItem for MapItemLayerV1QuadsV1 { fn version() -> i32 { 1 } fn offset() -> usize { 1 } fn ignore_version() -> bool { false } }
impl MapItem for MapItemLayerV1QuadsV2 { fn version() -> i32 { 2 } fn offset() -> usize { 4 } fn ignore_version() -> bool { false } }
impl MapItem for MapItemLayerV1DdraceSoundsV1 { fn version() -> i32 { 1 } fn offset() -> usize { 1 } fn ignore_version() -> bool { false } }

impl MapItemLayerV1TilemapExtraRace {
    /// Offset of the data reference of a physics layer.
    ///
    /// Up to version 2, the DDNet fields directly follow `data`; they were
    /// added without a version bump. From version 3 on, they follow the
    /// name.
    pub fn offset(version: i32, kind: TilemapKind) -> Option<usize> {
        let base = if version <= 2 {
            MapItemLayerV1TilemapV2::sum_len()
        } else {
            MapItemLayerV1TilemapV3::sum_len()
        };
        Some(base + kind.extra_index()?)
    }
    /// Data reference of a physics layer, `None` if the item is too short
    /// to contain it.
    pub fn from_slice(slice: &[i32], version: i32, kind: TilemapKind) -> Option<i32> {
        slice.get(MapItemLayerV1TilemapExtraRace::offset(version, kind)?).copied()
    }
    pub fn new(kind: TilemapKind, data: i32) -> MapItemLayerV1TilemapExtraRace {
        let mut result = MapItemLayerV1TilemapExtraRace { data: [-1; 5] };
        if let Some(i) = kind.extra_index() {
            result.data[i] = data;
        }
        result
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct MapItemEnvpointV1 {
    pub time: i32,
    pub curve_type: i32,
    pub values: [i32; 4],
}

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct MapItemEnvpointBezier {
    pub in_tangent_dx: [i32; 4],
    pub in_tangent_dy: [i32; 4],
    pub out_tangent_dx: [i32; 4],
    pub out_tangent_dy: [i32; 4],
}

/// Point layout of envelope version 3 files, with the tangents inline.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct MapItemEnvpointV2 {
    pub v1: MapItemEnvpointV1,
    pub bezier: MapItemEnvpointBezier,
}

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct Color {
    pub red: i32,
    pub green: i32,
    pub blue: i32,
    pub alpha: i32,
}

impl Default for Color {
    fn default() -> Color {
        Color { red: 255, green: 255, blue: 255, alpha: 255 }
    }
}

/// Quad as stored in the data block of a quad layer.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct Quad {
    /// Four corners followed by the pivot.
    pub points: [Point; 5],
    pub colors: [Color; 4],
    pub texture_coords: [Point; 4],
    pub position_env: i32,
    pub position_env_offset: i32,
    pub color_env: i32,
    pub color_env_offset: i32,
}

/// Sound source as stored in the data block of a sound layer.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct SoundSourceV1 {
    pub position: Point,
    pub looped: i32,
    pub pan: i32,
    pub time_delay: i32,
    pub falloff: i32,
    pub position_env: i32,
    pub position_env_offset: i32,
    pub sound_env: i32,
    pub sound_env_offset: i32,
    pub shape_type: i32,
    /// Width and height for rectangles, radius and padding for circles.
    pub shape: [i32; 2],
}

/// Sound source of the deprecated sound layer type.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct SoundSourceLegacy {
    pub position: Point,
    pub looped: i32,
    pub time_delay: i32,
    pub falloff_distance: i32,
    pub position_env: i32,
    pub position_env_offset: i32,
    pub sound_env: i32,
    pub sound_env_offset: i32,
}

/// Reinterprets a block of integers as records, ignoring a trailing partial
/// record.
pub fn records<T: AsBytes + FromBytes>(ints: &[i32]) -> &[T] {
    let bytes = ints.as_bytes();
    let whole = bytes.len() - bytes.len() % std::mem::size_of::<T>();
    T::slice_from(&bytes[..whole]).unwrap_or(&[])
}

pub fn records_to_i32s<T: AsBytes>(records: &[T]) -> Vec<i32> {
    records
        .as_bytes()
        .chunks_exact(4)
        .map(|c| i32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, AsBytes, FromBytes, FromZeroes, Unaligned)]
#[repr(C)]
pub struct Tile {
    pub index: u8,
    pub flags: u8,
    pub skip: u8,
    pub reserved: u8,
}

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, AsBytes, FromBytes, FromZeroes, Unaligned)]
#[repr(C)]
pub struct TeleTile {
    pub number: u8,
    pub index: u8,
}

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, AsBytes, FromBytes, FromZeroes, Unaligned)]
#[repr(C)]
pub struct SpeedupTile {
    pub force: u8,
    pub max_speed: u8,
    pub index: u8,
    pub padding: u8,
    pub angle: LeI16,
}

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, AsBytes, FromBytes, FromZeroes, Unaligned)]
#[repr(C)]
pub struct SwitchTile {
    pub number: u8,
    pub index: u8,
    pub flags: u8,
    pub delay: u8,
}

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, AsBytes, FromBytes, FromZeroes, Unaligned)]
#[repr(C)]
pub struct TuneTile {
    pub number: u8,
    pub index: u8,
}

pub const TILEFLAG_VFLIP: u8 = 1 << 0;
pub const TILEFLAG_HFLIP: u8 = 1 << 1;
pub const TILEFLAG_OPAQUE: u8 = 1 << 2;
pub const TILEFLAG_ROTATE: u8 = 1 << 3;

/// Expands tile data of `TILEMAP_VERSION_TILE_SKIP` items: a tile with
/// `skip = n` stands for `n + 1` copies of itself. Stops once `len` tiles
/// are produced; missing tiles are left empty.
pub fn extract_skipped_tiles(saved: &[Tile], len: usize) -> Vec<Tile> {
    let mut result = Vec::with_capacity(len);
    for &tile in saved {
        let copy = Tile { skip: 0, ..tile };
        let count = usize::from(tile.skip) + 1;
        let remaining = len - result.len();
        result.extend(std::iter::repeat(copy).take(count.min(remaining)));
        if result.len() == len {
            break;
        }
    }
    result.resize(len, Tile::default());
    result
}

#[cfg(test)]
mod test {
    use super::*;
    use quickcheck::quickcheck;

    #[test]
    fn layouts() {
        assert_eq!(MapItemGroupV1::sum_len(), MapItemGroupV2::offset());
        assert_eq!(MapItemGroupV2::sum_len(), MapItemGroupV3::offset());
        assert_eq!(MapItemGroupV3::sum_len(), 15);
        assert_eq!(MapItemEnvelopeV1::sum_len(), MapItemEnvelopeV2::offset());
        assert_eq!(MapItemImageV1::sum_len(), MapItemImageV2::offset());
        assert_eq!(MapItemLayerV1TilemapV2::sum_len(), MapItemLayerV1TilemapV3::offset());
        assert_eq!(MapItemLayerV1QuadsV1::sum_len(), MapItemLayerV1QuadsV2::offset());
        assert_eq!(MapItemLayerV1::sum_len() + MapItemLayerV1TilemapV3::sum_len() + 5, (TILEMAP_VERSION_PRERELEASE - (1 << 16)) as usize);
        assert_eq!(std::mem::size_of::<Quad>(), 38 * 4);
        assert_eq!(std::mem::size_of::<SoundSourceV1>(), 13 * 4);
        assert_eq!(std::mem::size_of::<SoundSourceLegacy>(), 9 * 4);
        assert_eq!(std::mem::size_of::<MapItemEnvpointV2>(), 22 * 4);
        assert_eq!(std::mem::size_of::<SpeedupTile>(), 6);
    }

    #[test]
    fn version_gating() {
        let group = [2, 0, 0, 100, 100, 0, 1, 0, 0, 0, 0, 0];
        assert!(MapItemGroupV1::from_slice(&group).unwrap().is_some());
        assert!(MapItemGroupV2::from_slice(&group).unwrap().is_some());
        assert!(MapItemGroupV3::from_slice(&group).unwrap().is_none());
        assert_eq!(MapItemGroupV2::from_slice(&group[..11]), Err(TooShort));
        assert_eq!(MapItemGroupV1::from_slice(&[]), Err(TooShort));
        let v1 = MapItemGroupV1::from_slice(&group).unwrap().unwrap();
        assert_eq!(v1.parallax_x, 100);
        assert_eq!(v1.num_layers, 1);
    }

    #[test]
    fn legacy_race_offsets() {
        // Relative to the tilemap part, which starts 3 ints into the item.
        let o = |v, k| MapItemLayerV1TilemapExtraRace::offset(v, k).unwrap() + 3;
        assert_eq!(o(2, TilemapKind::Teleport), 15);
        assert_eq!(o(2, TilemapKind::Tune), 19);
        assert_eq!(o(3, TilemapKind::Teleport), 18);
        assert_eq!(o(4, TilemapKind::Switch), 21);
        assert_eq!(MapItemLayerV1TilemapExtraRace::offset(3, TilemapKind::Game), None);
        let item = [3, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        assert_eq!(MapItemLayerV1TilemapExtraRace::from_slice(&item, 3, TilemapKind::Front), None);
    }

    #[test]
    fn kind_priority() {
        assert_eq!(TilemapKind::from_flags(TILELAYERFLAG_GAME | TILELAYERFLAG_TUNE), TilemapKind::Tune);
        assert_eq!(TilemapKind::from_flags(TILELAYERFLAG_SWITCH | TILELAYERFLAG_TELEPORT), TilemapKind::Teleport);
        assert_eq!(TilemapKind::from_flags(0), TilemapKind::Tiles);
        for &k in &[TilemapKind::Game, TilemapKind::Speedup, TilemapKind::Front] {
            assert_eq!(TilemapKind::from_flags(k.flags()), k);
        }
    }

    #[test]
    fn known_name_encoding() {
        // "Game" as written by the reference editor.
        let packed = string_to_name3("Game");
        assert_eq!(packed[0], ((b'G' as i32 + 128) << 24) | ((b'a' as i32 + 128) << 16) | ((b'm' as i32 + 128) << 8) | (b'e' as i32 + 128));
        assert_eq!(packed[1], (128 << 24) | (128 << 16) | (128 << 8) | 128);
        assert_eq!(packed[2] & 0xff, 0);
        assert_eq!(i32s_to_string(&packed), "Game");
        assert_eq!(i32s_to_string(&string_to_name3("a very long layer name")), "a very long");
    }

    #[test]
    fn skipped_tiles() {
        let t = |index, skip| Tile { index, flags: 0, skip, reserved: 0 };
        let tiles = extract_skipped_tiles(&[t(1, 2), t(0, 0), t(5, 10)], 6);
        let indices: Vec<_> = tiles.iter().map(|t| t.index).collect();
        assert_eq!(indices, [1, 1, 1, 0, 5, 5]);
        assert!(tiles.iter().all(|t| t.skip == 0));
        assert_eq!(extract_skipped_tiles(&[t(3, 0)], 2)[1], Tile::default());
    }

    #[test]
    fn record_slicing() {
        let mut ints = vec![0; 38 * 2 + 3];
        ints[38] = 7;
        let quads: &[Quad] = records(&ints);
        assert_eq!(quads.len(), 2);
        assert_eq!(quads[1].points[0].x, 7);
        assert_eq!(records_to_i32s(quads), &ints[..76]);
    }

    quickcheck! {
        fn name3_roundtrip(s: String) -> bool {
            let s: String = s.chars().filter(|&c| c != '\0').collect();
            let decoded = i32s_to_string(&string_to_name3(&s));
            s.starts_with(&decoded) && decoded.len() <= 11
        }
        fn name8_roundtrip(s: String) -> bool {
            let s: String = s.chars().filter(|&c| c != '\0').collect();
            let decoded = i32s_to_string(&string_to_name8(&s));
            s.starts_with(&decoded) && (s.len() > 31 || decoded == s)
        }
    }
}
