//! Maps written by older editors, built item by item.

extern crate mapio_map as map;

use datafile as df;
use map::format;
use map::format::MapItemExt;
use map::tiles;
use map::*;
use std::path::Path;
use std::path::PathBuf;
use tempfile::TempDir;
use zerocopy::AsBytes;

fn writer(dir: &TempDir, name: &str) -> (PathBuf, df::Writer) {
    let path = dir.path().join(name);
    let mut writer = df::Writer::open(&path).unwrap();
    writer.add_item(format::MAP_ITEMTYPE_VERSION, 0, &[format::MAP_VERSION]).unwrap();
    (path, writer)
}

fn add_group(writer: &mut df::Writer, num_layers: i32) {
    // Version 1 groups have neither clipping nor a name.
    let mut item = vec![1];
    format::MapItemGroupV1 {
        offset_x: 0,
        offset_y: 0,
        parallax_x: 100,
        parallax_y: 100,
        start_layer: 0,
        num_layers,
    }
    .extend_i32s(&mut item);
    writer.add_item(format::MAP_ITEMTYPE_GROUP, 0, &item).unwrap();
}

fn tilemap_item(version: i32, width: i32, height: i32, flags: i32, data: i32, extra: &[i32]) -> Vec<i32> {
    let mut item = vec![0, format::MAP_ITEMTYPE_LAYER_V1_TILEMAP, 0, version];
    item.extend_from_slice(&[width, height, flags, 255, 255, 255, 255, -1, 0, -1, data]);
    if version >= 3 {
        item.extend_from_slice(&format::string_to_name3("Legacy"));
    }
    item.extend_from_slice(extra);
    item
}

fn load(path: &Path) -> Map {
    let mut defaults = Defaults::new(path.parent().unwrap());
    Map::load(path, &mut defaults.options()).unwrap()
}

#[test]
fn legacy_sound_layer() {
    logger::init_test();
    let dir = TempDir::new().unwrap();
    let (path, mut writer) = writer(&dir, "sounds.map");
    let source = format::SoundSourceLegacy {
        position: format::Point { x: 32, y: 64 },
        looped: 1,
        time_delay: 2,
        falloff_distance: 700,
        position_env: -1,
        position_env_offset: 0,
        sound_env: -1,
        sound_env_offset: 0,
    };
    let data = writer.add_data_swapped(format::records_to_i32s(&[source]));
    let mut item = vec![0, format::MAP_ITEMTYPE_LAYER_V1_DDRACE_SOUNDS_LEGACY, 0, 1, 1, data as i32, -1];
    item.extend_from_slice(&format::string_to_name3("Old sounds"));
    writer.add_item(format::MAP_ITEMTYPE_LAYER, 0, &item).unwrap();
    add_group(&mut writer, 1);
    writer.finish().unwrap();

    let map = load(&path);
    let group = &map.groups[0];
    assert_eq!(group.name, "");
    assert!(!group.use_clipping);
    assert_eq!(group.layers[0].name, "Old sounds");
    let sounds = match group.layers[0].kind {
        LayerKind::Sounds(ref s) => s,
        _ => panic!("not a sound layer"),
    };
    assert_eq!(sounds.sound, None);
    assert_eq!(
        sounds.sources,
        [SoundSource {
            position: Point { x: 32, y: 64 },
            looped: true,
            pan: true,
            time_delay: 2,
            falloff: 0,
            position_env: -1,
            position_env_offset: 0,
            sound_env: -1,
            sound_env_offset: 0,
            shape: SoundShape::Circle { radius: 700 },
        }],
    );

    // Resaving upgrades the layer type.
    let resaved = dir.path().join("resaved.map");
    map.save_sync(&resaved).unwrap();
    let df = df::Reader::open(&resaved).unwrap();
    let item = df.find_item(format::MAP_ITEMTYPE_LAYER, 0).unwrap();
    assert_eq!(item.data[1], format::MAP_ITEMTYPE_LAYER_V1_DDRACE_SOUNDS);
    assert_eq!(item.data[3], format::SOUNDS_VERSION);
    drop(df);
    assert_eq!(load(&resaved), map);
}

#[test]
fn version_2_tele_layer() {
    logger::init_test();
    let dir = TempDir::new().unwrap();
    let (path, mut writer) = writer(&dir, "tele.map");
    let data = writer.add_data(vec![0; 2 * 4]);
    let side = [
        TeleTile { number: 1, index: tiles::TILE_TELEIN },
        TeleTile { number: 7, index: 5 },
    ];
    let tele = writer.add_data(side.as_bytes().to_vec());
    let item = tilemap_item(2, 2, 1, format::TILELAYERFLAG_TELEPORT, data as i32, &[tele as i32, -1, -1, -1, -1]);
    // The reference directly follows the data reference.
    assert_eq!(item[15], tele as i32);
    writer.add_item(format::MAP_ITEMTYPE_LAYER, 0, &item).unwrap();
    add_group(&mut writer, 1);
    writer.finish().unwrap();

    let map = load(&path);
    let layer = &map.groups[0].layers[0];
    assert_eq!(layer.name, "");
    let tele = layer.kind.tiles().unwrap();
    match tele.physics {
        Physics::Teleport(ref s) => assert_eq!(s.iter().copied().collect::<Vec<_>>(), side),
        ref p => panic!("unexpected physics {:?}", p),
    }
    let indices: Vec<_> = tele.tiles.iter().map(|t| t.index).collect();
    assert_eq!(indices, [tiles::TILE_TELEIN, 0]);
}

#[test]
fn skipped_tiles() {
    logger::init_test();
    let dir = TempDir::new().unwrap();
    let (path, mut writer) = writer(&dir, "skip.map");
    let saved = [
        Tile { index: 1, flags: 0, skip: 2, reserved: 0 },
        Tile { index: 3, flags: 4, skip: 0, reserved: 0 },
    ];
    let data = writer.add_data(saved.as_bytes().to_vec());
    let item = tilemap_item(4, 4, 1, format::TILELAYERFLAG_GAME, data as i32, &[-1; 5]);
    writer.add_item(format::MAP_ITEMTYPE_LAYER, 0, &item).unwrap();
    add_group(&mut writer, 1);
    writer.finish().unwrap();

    let map = load(&path);
    let layer = &map.groups[0].layers[0];
    assert_eq!(layer.name, "Legacy");
    let game = layer.kind.tiles().unwrap();
    assert_eq!(game.kind(), format::TilemapKind::Game);
    let loaded: Vec<_> = game.tiles.iter().map(|t| (t.index, t.flags, t.skip)).collect();
    assert_eq!(loaded, [(1, 0, 0), (1, 0, 0), (1, 0, 0), (3, 4, 0)]);
}

#[test]
fn prerelease_game_layer() {
    logger::init_test();
    let dir = TempDir::new().unwrap();
    let (path, mut writer) = writer(&dir, "prerelease.map");
    let saved = [Tile::default(), Tile { index: 1, ..Tile::default() }, Tile { index: 2, ..Tile::default() }];
    let data = writer.add_data(saved.as_bytes().to_vec());
    let item = tilemap_item(format::TILEMAP_VERSION_PRERELEASE, 3, 1, format::TILELAYERFLAG_GAME, data as i32, &[-1; 5]);
    writer.add_item(format::MAP_ITEMTYPE_LAYER, 0, &item).unwrap();
    add_group(&mut writer, 1);
    writer.finish().unwrap();

    let map = load(&path);
    let game = map.game_layer().unwrap();
    let indices: Vec<_> = game.tiles.iter().map(|t| t.index).collect();
    assert_eq!(indices, [0, 192, 193]);
}

#[test]
fn envelope_slices_truncated() {
    logger::init_test();
    let dir = TempDir::new().unwrap();
    let (path, mut writer) = writer(&dir, "envelopes.map");
    let points = [
        format::MapItemEnvpointV1 { time: 0, curve_type: format::CURVETYPE_LINEAR, values: [0; 4] },
        format::MapItemEnvpointV1 { time: 100, curve_type: format::CURVETYPE_SMOOTH, values: [1; 4] },
    ];
    writer.add_item(format::MAP_ITEMTYPE_ENVPOINTS, 0, &format::records_to_i32s(&points)).unwrap();
    // Version 1 envelopes aren't synchronized. The first one has no name.
    let mut first = vec![1, 3, 0, 1];
    first.extend_from_slice(&[-1; 8]);
    writer.add_item(format::MAP_ITEMTYPE_ENVELOPE, 0, &first).unwrap();
    let mut second = vec![1, 4, 1, 5];
    second.extend_from_slice(&format::string_to_name8("Broken"));
    writer.add_item(format::MAP_ITEMTYPE_ENVELOPE, 1, &second).unwrap();
    writer.finish().unwrap();

    let map = load(&path);
    assert_eq!(map.envelopes.len(), 2);
    assert_eq!(map.envelopes[0].name, "");
    assert_eq!(map.envelopes[0].points.len(), 1);
    assert!(!map.envelopes[0].synchronized);
    assert_eq!(map.envelopes[1].name, "Broken");
    assert_eq!(map.envelopes[1].channels, 4);
    assert_eq!(map.envelopes[1].points.len(), 1);
    assert_eq!(map.envelopes[1].points[0].time, 100);
    assert_eq!(map.envelopes[1].points[0].curve, CurveType::Smooth);
}

#[test]
fn missing_physics_data() {
    logger::init_test();
    let dir = TempDir::new().unwrap();
    let (path, mut writer) = writer(&dir, "switch.map");
    let data = writer.add_data(vec![0; 4 * 4]);
    let item = tilemap_item(3, 2, 2, format::TILELAYERFLAG_SWITCH, data as i32, &[]);
    writer.add_item(format::MAP_ITEMTYPE_LAYER, 0, &item).unwrap();
    add_group(&mut writer, 1);
    writer.finish().unwrap();

    let map = load(&path);
    let switch = map.groups[0].layers[0].kind.tiles().unwrap();
    assert_eq!(switch.kind(), format::TilemapKind::Switch);
    assert!(switch.tiles.iter().all(|t| *t == Tile::default()));
}

#[test]
fn unknown_layers_skipped() {
    logger::init_test();
    let dir = TempDir::new().unwrap();
    let (path, mut writer) = writer(&dir, "unknown.map");
    let data = writer.add_data(vec![0; 4]);
    writer.add_item(format::MAP_ITEMTYPE_LAYER, 0, &[0, 42, 0, 1]).unwrap();
    writer.add_item(format::MAP_ITEMTYPE_LAYER, 1, &tilemap_item(1, 1, 1, 0, data as i32, &[])).unwrap();
    writer.add_item(format::MAP_ITEMTYPE_LAYER, 2, &tilemap_item(3, 1, 1, 0, data as i32, &[-1; 5])).unwrap();
    add_group(&mut writer, 3);
    writer.finish().unwrap();

    let map = load(&path);
    let layers = &map.groups[0].layers;
    assert_eq!(layers.len(), 1);
    assert_eq!(layers[0].name, "Legacy");
}

#[test]
fn oversized_tilemap_rejected() {
    logger::init_test();
    let dir = TempDir::new().unwrap();
    let (path, mut writer) = writer(&dir, "huge.map");
    let data = writer.add_data(vec![0; 4]);
    let item = tilemap_item(3, 1 << 20, 1 << 20, 0, data as i32, &[-1; 5]);
    writer.add_item(format::MAP_ITEMTYPE_LAYER, 0, &item).unwrap();
    add_group(&mut writer, 1);
    writer.finish().unwrap();

    let mut defaults = Defaults::new(dir.path());
    match Map::load(&path, &mut defaults.options()) {
        Err(Error::Map(format::Error::MalformedTilemap(0))) => {}
        other => panic!("unexpected result {:?}", other),
    }
}
