use common::num::Cast;
use common::num::Widen;
use datafile as df;
use ndarray::Array2;
use std::mem;
use std::path::Path;
use zerocopy::AsBytes;
use zerocopy::FromBytes;

use crate::format;
use crate::format::Error as MapError;
use crate::format::MapItem;
use crate::format::MapItemExt;
use crate::format::TilemapKind;
use crate::model::*;
use crate::sanity;
use crate::services::LoadOptions;
use crate::services::TextureLoad;
use crate::tiles;
use crate::Error;

impl Map {
    /// Reads a map file. External images and sounds are resolved and
    /// registered through `options`.
    pub fn load<P: AsRef<Path>>(path: P, options: &mut LoadOptions) -> Result<Map, Error> {
        let path = path.as_ref();
        let mut df = df::Reader::open(path)?;
        let mut map = load(&mut df, options)?;
        sanity::check(&mut map, &mut *options.errors);
        map.modified = false;
        debug!(
            "loaded {}: {} images, {} sounds, {} groups, {} envelopes",
            path.display(),
            map.images.len(),
            map.sounds.len(),
            map.groups.len(),
            map.envelopes.len(),
        );
        Ok(map)
    }
    /// Replaces this map by the one at `path`. Leaves it untouched if
    /// loading fails.
    pub fn load_into<P: AsRef<Path>>(&mut self, path: P, options: &mut LoadOptions) -> Result<(), Error> {
        *self = Map::load(path, options)?;
        Ok(())
    }
}

fn load(df: &mut df::Reader, options: &mut LoadOptions) -> Result<Map, Error> {
    let version = df
        .find_item(format::MAP_ITEMTYPE_VERSION, 0)
        .and_then(|item| item.data.first().copied())
        .ok_or(MapError::MissingVersion)?;
    if version != format::MAP_VERSION {
        error!("unsupported map version {}", version);
        return Err(MapError::UnsupportedVersion(version).into());
    }
    let info = load_info(df)?;
    let images = load_images(df, options)?;
    let sounds = load_sounds(df, options)?;
    let mut groups = load_groups(df, images.len(), sounds.len())?;
    let envelopes = load_envelopes(df)?;
    apply_automapper_configs(df, &mut groups);
    Ok(Map {
        info,
        images,
        sounds,
        groups,
        envelopes,
        modified: false,
    })
}

/// Copies an item out of the reader so that data can be read while looking
/// at it.
fn item_data(df: &df::Reader, index: usize) -> (u16, Vec<i32>) {
    let item = df.item(index);
    (item.id, item.data.to_vec())
}

fn data_index(index: i32) -> Option<usize> {
    if index < 0 {
        return None;
    }
    index.try_usize()
}

fn read_string(df: &mut df::Reader, index: i32) -> Result<Option<String>, Error> {
    let index = unwrap_or_return!(data_index(index), Ok(None));
    let result = String::from_utf8_lossy(format::bytes_to_string(df.read_data(index)?)).into_owned();
    df.unload_data(index);
    Ok(Some(result))
}

/// Turns an image or sound reference into an index, dropping references to
/// entries that don't exist.
fn checked_ref(index: i32, count: usize, what: &str, layer: u16) -> Option<usize> {
    if index == -1 {
        return None;
    }
    let result = index.try_usize().filter(|&i| i < count);
    if result.is_none() {
        warn!("layer {} references nonexistent {} {}, removing", layer, what, index);
    }
    result
}

fn load_info(df: &mut df::Reader) -> Result<Info, Error> {
    let raw = match df.find_item(format::MAP_ITEMTYPE_INFO, 0) {
        Some(item) => item.data.to_vec(),
        None => return Ok(Info::default()),
    };
    let v1 = match format::MapItemInfoV1::from_slice(&raw) {
        Ok(Some(v1)) => *v1,
        Ok(None) => return Ok(Info::default()),
        Err(format::TooShort) => return Err(MapError::MalformedInfo.into()),
    };
    let mut info = Info {
        author: read_string(df, v1.author)?.unwrap_or_default(),
        version: read_string(df, v1.version)?.unwrap_or_default(),
        credits: read_string(df, v1.credits)?.unwrap_or_default(),
        license: read_string(df, v1.license)?.unwrap_or_default(),
        settings: Vec::new(),
    };
    // Later versions of the info item don't have settings.
    if raw[0] != format::MAP_ITEMTYPE_INFO_VERSION {
        return Ok(info);
    }
    let extra = unwrap_or_return!(format::MapItemInfoV1ExtraRace::from_slice(&raw).ok().flatten(), Ok(info));
    if let Some(index) = data_index(extra.settings) {
        info.settings = split_settings(df.read_data(index)?);
        df.unload_data(index);
    }
    Ok(info)
}

fn split_settings(data: &[u8]) -> Vec<String> {
    if data.is_empty() {
        return Vec::new();
    }
    let data = data.strip_suffix(&[0]).unwrap_or(data);
    data.split(|&b| b == 0)
        .map(|s| String::from_utf8_lossy(s).into_owned())
        .collect()
}

fn upload_texture(image: &mut Image, options: &mut LoadOptions) {
    let data = unwrap_or_return!(image.data.as_ref(), ());
    let load = if image.is_tileable() {
        TextureLoad::Tiled
    } else {
        TextureLoad::Plain
    };
    image.texture = options.textures.load_texture_raw(
        image.width,
        image.height,
        image.format,
        data,
        load,
        &image.name,
    );
    if image.texture.is_none() {
        warn!("couldn't create texture for image {:?}", image.name);
    }
}

fn load_images(df: &mut df::Reader, options: &mut LoadOptions) -> Result<Vec<Image>, Error> {
    let mut images = Vec::new();
    for index in df.item_type_indices(format::MAP_ITEMTYPE_IMAGE) {
        let (id, raw) = item_data(df, index);
        let e = || Error::from(MapError::MalformedImage(id));
        let v1 = *format::MapItemImageV1::from_slice(&raw).map_err(|_| e())?.ok_or_else(e)?;
        let v2 = format::MapItemImageV2::from_slice(&raw).map_err(|_| e())?.copied();
        let name = read_string(df, v1.name)?.unwrap_or_default();
        let image_format = match v2 {
            Some(v2) => ImageFormat::from_i32(v2.format),
            None => Some(ImageFormat::Rgba),
        };
        let width = v1.width.try_u32().ok_or_else(e)?;
        let height = v1.height.try_u32().ok_or_else(e)?;
        let mut image = match image_format {
            Some(image_format) if v1.external == 0 => {
                let block = data_index(v1.data).ok_or_else(e)?;
                let len = (width.usize())
                    .checked_mul(height.usize())
                    .and_then(|n| n.checked_mul(image_format.pixel_size()))
                    .ok_or_else(e)?;
                let data = df.read_data(block)?;
                if data.len() < len {
                    error!("image data too short, image={} wanted={} got={}", id, len, data.len());
                    return Err(MapError::TooShort.into());
                }
                let data = data[..len].to_vec();
                df.unload_data(block);
                Image {
                    name,
                    width,
                    height,
                    format: image_format,
                    external: false,
                    data: Some(data),
                    texture: None,
                }
            }
            _ => load_external_image(name, width, height, image_format, options),
        };
        upload_texture(&mut image, options);
        images.push(image);
    }
    Ok(images)
}

fn load_external_image(
    name: String,
    width: u32,
    height: u32,
    image_format: Option<ImageFormat>,
    options: &mut LoadOptions,
) -> Image {
    let path = options.external_image_path(&name);
    let decoded = options
        .storage
        .read_file(&path)
        .and_then(|data| options.images.decode_png(&data));
    match decoded {
        Ok(decoded) => Image {
            name,
            width: decoded.width,
            height: decoded.height,
            format: decoded.format,
            external: true,
            data: Some(decoded.data),
            texture: None,
        },
        Err(err) => {
            warn!("couldn't load external image {}: {}", path.display(), err);
            Image {
                name,
                width,
                height,
                format: image_format.unwrap_or(ImageFormat::Rgba),
                external: true,
                data: None,
                texture: None,
            }
        }
    }
}

fn load_sounds(df: &mut df::Reader, options: &mut LoadOptions) -> Result<Vec<Sound>, Error> {
    let mut sounds = Vec::new();
    for index in df.item_type_indices(format::MAP_ITEMTYPE_SOUND) {
        let (id, raw) = item_data(df, index);
        let e = || Error::from(MapError::MalformedSound(id));
        let v1 = *format::MapItemSoundV1::from_slice(&raw).map_err(|_| e())?.ok_or_else(e)?;
        let name = read_string(df, v1.name)?.unwrap_or_default();
        let external = v1.external != 0;
        let data = if external {
            let path = options.external_sound_path(&name);
            match options.storage.read_file(&path) {
                Ok(data) => Some(data),
                Err(err) => {
                    warn!("couldn't load external sound {}: {}", path.display(), err);
                    None
                }
            }
        } else {
            let block = data_index(v1.data).ok_or_else(e)?;
            let len = v1.data_size.try_usize().ok_or_else(e)?;
            let data = df.read_data(block)?;
            if data.len() < len {
                error!("sound data too short, sound={} wanted={} got={}", id, len, data.len());
                return Err(MapError::TooShort.into());
            }
            let data = data[..len].to_vec();
            df.unload_data(block);
            Some(data)
        };
        let sample = data.as_ref().and_then(|d| options.audio.load_opus(d));
        if data.is_some() && sample.is_none() {
            warn!("couldn't register sound {:?}", name);
        }
        sounds.push(Sound {
            name,
            external,
            data,
            sample,
        });
    }
    Ok(sounds)
}

fn load_groups(df: &mut df::Reader, num_images: usize, num_sounds: usize) -> Result<Vec<Group>, Error> {
    let layer_indices = df.item_type_indices(format::MAP_ITEMTYPE_LAYER);
    let group_ex = format::group_ex_uuid();
    let mut groups = Vec::new();
    for index in df.item_type_indices(format::MAP_ITEMTYPE_GROUP) {
        let (id, raw) = item_data(df, index);
        let e = || Error::from(MapError::MalformedGroup(id));
        let version = *raw.first().ok_or_else(e)?;
        if !(1..=format::MAP_ITEMTYPE_GROUP_VERSION).contains(&version) {
            warn!("skipping group {} of unknown version {}", id, version);
            continue;
        }
        let v1 = *format::MapItemGroupV1::from_slice(&raw).map_err(|_| e())?.ok_or_else(e)?;
        let v2 = format::MapItemGroupV2::from_slice(&raw).map_err(|_| e())?.copied();
        let v3 = format::MapItemGroupV3::from_slice(&raw).map_err(|_| e())?.copied();
        let zoom = df
            .find_item_ex(&group_ex, id)
            .and_then(|item| format::MapItemGroupExV1::from_slice(item.data).ok().flatten())
            .map(|ex| ex.parallax_zoom);
        let default_zoom = default_parallax_zoom(v1.parallax_x, v1.parallax_y);
        let mut group = Group {
            name: v3.map(|v3| format::i32s_to_string(&v3.name)).unwrap_or_default(),
            offset_x: v1.offset_x,
            offset_y: v1.offset_y,
            parallax_x: v1.parallax_x,
            parallax_y: v1.parallax_y,
            parallax_zoom: zoom.filter(|&z| z != default_zoom),
            use_clipping: v2.map(|v2| v2.use_clipping != 0).unwrap_or(false),
            clipping: v2
                .map(|v2| Clipping {
                    x: v2.clip_x,
                    y: v2.clip_y,
                    width: v2.clip_w,
                    height: v2.clip_h,
                })
                .unwrap_or_default(),
            layers: Vec::new(),
        };
        for i in 0..v1.num_layers.max(0) {
            let layer_index = v1
                .start_layer
                .checked_add(i)
                .and_then(|l| l.try_usize())
                .map(|l| layer_indices.start + l)
                .filter(|l| layer_indices.contains(l));
            let layer_index = match layer_index {
                Some(l) => l,
                None => {
                    warn!("group {} references nonexistent layer {}", id, v1.start_layer.saturating_add(i));
                    continue;
                }
            };
            if let Some(layer) = load_layer(df, layer_index, num_images, num_sounds)? {
                group.layers.push(layer);
            }
        }
        groups.push(group);
    }
    Ok(groups)
}

/// Returns `None` for layers that are skipped.
fn load_layer(df: &mut df::Reader, index: usize, num_images: usize, num_sounds: usize) -> Result<Option<Layer>, Error> {
    let (id, raw) = item_data(df, index);
    let header = *format::MapItemLayerV1::from_slice(&raw)
        .ok()
        .flatten()
        .ok_or(MapError::MalformedLayer(id))?;
    let rest = &raw[format::MapItemLayerV1::sum_len()..];
    let loaded = match header.type_ {
        format::MAP_ITEMTYPE_LAYER_V1_TILEMAP => load_tilemap(df, rest, id, num_images)?,
        format::MAP_ITEMTYPE_LAYER_V1_QUADS => load_quads(df, rest, id, num_images)?,
        format::MAP_ITEMTYPE_LAYER_V1_DDRACE_SOUNDS => load_sound_layer(df, rest, id, num_sounds, false)?,
        format::MAP_ITEMTYPE_LAYER_V1_DDRACE_SOUNDS_LEGACY => load_sound_layer(df, rest, id, num_sounds, true)?,
        t => {
            warn!("skipping layer {} of unknown type {}", id, t);
            None
        }
    };
    Ok(loaded.map(|(name, kind)| Layer {
        name,
        detail: header.flags & format::LAYERFLAG_DETAIL != 0,
        kind,
    }))
}

/// Reads the tile array of a generic, game or front layer.
fn read_tiles(df: &mut df::Reader, index: usize, version: i32, width: usize, height: usize) -> Result<Option<Array2<Tile>>, Error> {
    let len = width * height;
    let data = df.read_data(index)?;
    let saved = Tile::slice_from(&data[..data.len() / 4 * 4]).unwrap_or(&[]);
    let tiles = if version >= format::TILEMAP_VERSION_TILE_SKIP {
        Some(format::extract_skipped_tiles(saved, len))
    } else if saved.len() >= len {
        Some(saved[..len].to_vec())
    } else {
        warn!("tile data {} too short, wanted={} got={}", index, len, saved.len());
        None
    };
    df.unload_data(index);
    Ok(tiles.and_then(|t| Array2::from_shape_vec((height, width), t).ok()))
}

/// Upper bound of the number of cells the main data block can describe.
fn tile_capacity(df: &mut df::Reader, index: usize, version: i32) -> Result<usize, Error> {
    let saved = df.read_data(index)?.len() / mem::size_of::<Tile>();
    Ok(if version >= format::TILEMAP_VERSION_TILE_SKIP {
        saved.saturating_mul(usize::from(u8::MAX) + 1)
    } else {
        saved
    })
}

/// Reads the side array of a physics layer. Short blocks are ignored.
fn read_side<T: FromBytes + Clone>(df: &mut df::Reader, index: usize, width: usize, height: usize) -> Result<Option<Array2<T>>, Error> {
    let size = width * height * mem::size_of::<T>();
    let data = df.read_data(index)?;
    let side = data.get(..size).and_then(T::slice_from).map(|s| s.to_vec());
    if side.is_none() {
        warn!("physics data {} too short, wanted={} got={}", index, size, data.len());
    }
    df.unload_data(index);
    Ok(side.and_then(|s| Array2::from_shape_vec((height, width), s).ok()))
}

fn load_tilemap(df: &mut df::Reader, rest: &[i32], id: u16, num_images: usize) -> Result<Option<(String, LayerKind)>, Error> {
    let e = || Error::from(MapError::MalformedTilemap(id));
    let version = *rest.first().ok_or_else(e)?;
    if version < format::MapItemLayerV1TilemapV2::version() {
        warn!("skipping tile layer {} of unknown version {}", id, version);
        return Ok(None);
    }
    let v2 = *format::MapItemLayerV1TilemapV2::from_slice(rest).map_err(|_| e())?.ok_or_else(e)?;
    let v3 = format::MapItemLayerV1TilemapV3::from_slice(rest).map_err(|_| e())?.copied();
    let width = v2.width.try_usize().ok_or_else(e)?;
    let height = v2.height.try_usize().ok_or_else(e)?;
    // Every tilemap has a main data block, even physics layers. Checking the
    // dimensions against it bounds the allocations below by the file size.
    let block = data_index(v2.data).ok_or_else(e)?;
    let cells = width.checked_mul(height).ok_or_else(e)?;
    let capacity = tile_capacity(df, block, version)?;
    if cells > capacity {
        error!("tile layer {} is {}x{}, but its data holds at most {} tiles", id, width, height, capacity);
        df.unload_data(block);
        return Err(e());
    }
    let kind = TilemapKind::from_flags(v2.flags);
    let mut layer = TileLayer::with_kind(kind, width, height);
    layer.color = Color {
        red: v2.color_red,
        green: v2.color_green,
        blue: v2.color_blue,
        alpha: v2.color_alpha,
    };
    layer.color_env = v2.color_env;
    layer.color_env_offset = v2.color_env_offset;
    layer.image = checked_ref(v2.image, num_images, "image", id);

    let side_index = format::MapItemLayerV1TilemapExtraRace::from_slice(rest, version, kind).and_then(data_index);
    match kind {
        TilemapKind::Tiles | TilemapKind::Game => {
            if let Some(tiles) = read_tiles(df, block, version, width, height)? {
                layer.tiles = tiles;
            }
            if kind == TilemapKind::Game && version == format::TILEMAP_VERSION_PRERELEASE {
                tiles::add_entity_offset(&mut layer.tiles);
            }
        }
        TilemapKind::Front => match side_index {
            Some(data) => {
                if let Some(tiles) = read_tiles(df, data, version, width, height)? {
                    layer.tiles = tiles;
                }
            }
            None => warn!("front layer {} has no data", id),
        },
        _ => match side_index {
            Some(data) => {
                let side = match kind {
                    TilemapKind::Teleport => read_side(df, data, width, height)?.map(Physics::Teleport),
                    TilemapKind::Speedup => read_side(df, data, width, height)?.map(Physics::Speedup),
                    TilemapKind::Switch => read_side(df, data, width, height)?.map(Physics::Switch),
                    TilemapKind::Tune => read_side(df, data, width, height)?.map(Physics::Tune),
                    _ => None,
                };
                if let Some(physics) = side {
                    layer.physics = physics;
                }
                tiles::project(&layer.physics, &mut layer.tiles);
            }
            None => warn!("physics layer {} has no data", id),
        },
    }
    df.unload_data(block);
    let name = v3.map(|v3| format::i32s_to_string(&v3.name)).unwrap_or_default();
    Ok(Some((name, LayerKind::Tiles(layer))))
}

fn read_records<T: AsBytes + FromBytes + Clone>(df: &mut df::Reader, index: i32, num: usize) -> Result<Vec<T>, Error> {
    if num == 0 {
        return Ok(Vec::new());
    }
    let index = data_index(index).ok_or(MapError::TooShort)?;
    let ints = df.read_data_swapped(index)?;
    df.unload_data(index);
    let records = format::records::<T>(&ints);
    if records.len() < num {
        error!("data {} holds {} records, wanted {}", index, records.len(), num);
        return Err(MapError::TooShort.into());
    }
    Ok(records[..num].to_vec())
}

fn load_quads(df: &mut df::Reader, rest: &[i32], id: u16, num_images: usize) -> Result<Option<(String, LayerKind)>, Error> {
    let e = || Error::from(MapError::MalformedQuads(id));
    let v1 = *format::MapItemLayerV1QuadsV1::from_slice(rest).map_err(|_| e())?.ok_or_else(e)?;
    let v2 = format::MapItemLayerV1QuadsV2::from_slice(rest).map_err(|_| e())?.copied();
    let num = v1.num_quads.try_usize().ok_or_else(e)?;
    let layer = QuadLayer {
        image: checked_ref(v1.image, num_images, "image", id),
        quads: read_records(df, v1.data, num)?,
    };
    let name = v2.map(|v2| format::i32s_to_string(&v2.name)).unwrap_or_default();
    Ok(Some((name, LayerKind::Quads(layer))))
}

fn load_sound_layer(df: &mut df::Reader, rest: &[i32], id: u16, num_sounds: usize, legacy: bool) -> Result<Option<(String, LayerKind)>, Error> {
    let e = || Error::from(MapError::MalformedSounds(id));
    let version = *rest.first().ok_or_else(e)?;
    if !(1..=format::SOUNDS_VERSION).contains(&version) {
        warn!("skipping sound layer {} of unknown version {}", id, version);
        return Ok(None);
    }
    let v1 = *format::MapItemLayerV1DdraceSoundsV1::from_slice(rest).map_err(|_| e())?.ok_or_else(e)?;
    let num = v1.num_sources.try_usize().ok_or_else(e)?;
    let sources = if legacy {
        let raw: Vec<format::SoundSourceLegacy> = read_records(df, v1.data, num)?;
        raw.iter().map(SoundSource::from_legacy).collect()
    } else {
        let raw: Vec<format::SoundSourceV1> = read_records(df, v1.data, num)?;
        raw.iter().map(SoundSource::from_raw).collect()
    };
    let layer = SoundLayer {
        sound: checked_ref(v1.sound, num_sounds, "sound", id),
        sources,
    };
    Ok(Some((format::i32s_to_string(&v1.name), LayerKind::Sounds(layer))))
}

fn env_point(id: usize, raw: &format::MapItemEnvpointV1, bezier: Option<&Bezier>) -> EnvPoint {
    let curve = CurveType::from_i32(raw.curve_type).unwrap_or_else(|| {
        warn!("envelope point {} has unknown curve type {}", id, raw.curve_type);
        CurveType::Linear
    });
    EnvPoint {
        time: raw.time,
        curve,
        values: raw.values,
        bezier: bezier.copied().unwrap_or_default(),
    }
}

fn load_envelopes(df: &df::Reader) -> Result<Vec<Envelope>, Error> {
    let envelope_indices = df.item_type_indices(format::MAP_ITEMTYPE_ENVELOPE);
    if envelope_indices.is_empty() {
        return Ok(Vec::new());
    }
    let points_raw = df
        .find_item(format::MAP_ITEMTYPE_ENVPOINTS, 0)
        .map(|item| item.data)
        .unwrap_or(&[]);
    // Files with version 3 envelopes store the tangents inline.
    let inline_bezier = df.item(envelope_indices.start).data.first().map_or(false, |&v| v >= 3);
    let points: Vec<EnvPoint> = if inline_bezier {
        format::records::<format::MapItemEnvpointV2>(points_raw)
            .iter()
            .enumerate()
            .map(|(i, p)| env_point(i, &p.v1, Some(&p.bezier)))
            .collect()
    } else {
        let plain = format::records::<format::MapItemEnvpointV1>(points_raw);
        let bezier = df
            .find_item_ex(&format::envpoints_bezier_uuid(), 0)
            .map(|item| format::records::<Bezier>(item.data))
            .filter(|b| b.len() == plain.len());
        plain
            .iter()
            .enumerate()
            .map(|(i, p)| env_point(i, p, bezier.and_then(|b| b.get(i))))
            .collect()
    };

    let mut envelopes = Vec::new();
    for index in envelope_indices {
        let item = df.item(index);
        let e = || Error::from(MapError::MalformedEnvelope(item.id));
        let v1 = *format::MapItemEnvelopeV1::from_slice(item.data).map_err(|_| e())?.ok_or_else(e)?;
        let v2 = format::MapItemEnvelopeV2::from_slice(item.data).map_err(|_| e())?.copied();
        let start = v1.start_points.try_usize().ok_or_else(e)?;
        let num = v1.num_points.try_usize().ok_or_else(e)?;
        let end = start.checked_add(num).ok_or_else(e)?;
        let slice = points.get(start.min(points.len())..end.min(points.len())).unwrap_or(&[]);
        if slice.len() != num {
            warn!("envelope {} references nonexistent points, start={} num={} total={}", item.id, start, num, points.len());
        }
        envelopes.push(Envelope {
            // Old maps have no name.
            name: if v1.name[0] == -1 {
                String::new()
            } else {
                format::i32s_to_string(&v1.name)
            },
            channels: v1.channels,
            synchronized: v2.map(|v2| v2.synchronized != 0).unwrap_or(false),
            points: slice.to_vec(),
        });
    }
    Ok(envelopes)
}

fn apply_automapper_configs(df: &df::Reader, groups: &mut [Group]) {
    let uuid = format::automapper_config_uuid();
    for index in df.item_type_ex_indices(&uuid) {
        let item = df.item(index);
        let config = match format::MapItemAutoMapperConfigV1::from_slice(item.data) {
            Ok(Some(c)) if item.data[0] == format::MAP_ITEMTYPE_AUTOMAPPER_CONFIG_VERSION => *c,
            _ => {
                warn!("skipping malformed automapper config {}", item.id);
                continue;
            }
        };
        let layer = config
            .group_id
            .try_usize()
            .and_then(|g| groups.get_mut(g))
            .zip(config.layer_id.try_usize())
            .and_then(|(g, l)| g.layers.get_mut(l))
            .and_then(|l| l.kind.tiles_mut());
        let layer = match layer {
            Some(l) => l,
            None => {
                warn!("automapper config {} references nonexistent tile layer {}/{}", item.id, config.group_id, config.layer_id);
                continue;
            }
        };
        if layer.is_physics() {
            debug!("ignoring automapper config {} of a physics layer", item.id);
            continue;
        }
        layer.automapper = AutoMapperConfig {
            config: config.automapper_config,
            seed: config.automapper_seed,
            automatic: config.flags & format::AUTOMAPPER_FLAG_AUTOMATIC != 0,
        };
    }
}

#[cfg(test)]
mod test {
    use super::split_settings;

    #[test]
    fn settings() {
        assert!(split_settings(b"").is_empty());
        assert_eq!(split_settings(b"sv_a 1\0sv_b 2\0"), ["sv_a 1", "sv_b 2"]);
        assert_eq!(split_settings(b"x\0\0"), ["x", ""]);
        assert_eq!(split_settings(b"unterminated"), ["unterminated"]);
    }
}
