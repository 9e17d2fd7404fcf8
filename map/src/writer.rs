use common::num::Cast;
use datafile as df;
use ndarray::Array2;
use std::path::Path;
use zerocopy::AsBytes;

use crate::format;
use crate::format::Error as MapError;
use crate::format::MapItemExt;
use crate::format::TilemapKind;
use crate::model::*;
use crate::Error;

impl Map {
    /// Serializes the map and hands the file to `jobs`, which writes it in
    /// the background. The map can be modified again right away.
    pub fn save<P: AsRef<Path>>(&self, path: P, jobs: &mut df::Jobs) -> Result<(), Error> {
        let writer = self.to_writer(path)?;
        jobs.submit(writer)?;
        Ok(())
    }
    /// Like `save`, but writes the file on the calling thread.
    pub fn save_sync<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        self.to_writer(path)?.finish()?;
        Ok(())
    }
    /// Creates a datafile writer holding the serialized map, ready to be
    /// finished.
    pub fn to_writer<P: AsRef<Path>>(&self, path: P) -> Result<df::Writer, Error> {
        let mut writer = df::Writer::open(path)?;
        save(self, &mut writer)?;
        Ok(writer)
    }
}

fn too_large() -> Error {
    df::Error::Df(df::format::Error::TooLarge).into()
}

fn to_i32(value: usize) -> Result<i32, Error> {
    value.try_i32().ok_or_else(too_large)
}

fn to_id(value: usize) -> Result<u16, Error> {
    value.try_u16().ok_or_else(too_large)
}

fn opt_index(index: Option<usize>) -> Result<i32, Error> {
    index.map_or(Ok(-1), to_i32)
}

fn add_string(writer: &mut df::Writer, s: &str) -> Result<i32, Error> {
    let mut data = Vec::with_capacity(s.len() + 1);
    data.extend_from_slice(s.as_bytes());
    data.push(0);
    to_i32(writer.add_data(data))
}

fn add_optional_string(writer: &mut df::Writer, s: &str) -> Result<i32, Error> {
    if s.is_empty() {
        return Ok(-1);
    }
    add_string(writer, s)
}

fn array_bytes<T: AsBytes>(array: &Array2<T>) -> Vec<u8> {
    array.iter().flat_map(|t| t.as_bytes().iter().copied()).collect()
}

fn save(map: &Map, writer: &mut df::Writer) -> Result<(), Error> {
    writer.add_item(format::MAP_ITEMTYPE_VERSION, 0, &[format::MAP_VERSION])?;
    save_info(&map.info, writer)?;
    for (i, image) in map.images.iter().enumerate() {
        save_image(image, to_id(i)?, writer)?;
    }
    for (i, sound) in map.sounds.iter().enumerate() {
        save_sound(sound, to_id(i)?, writer)?;
    }
    save_groups(&map.groups, writer)?;
    save_envelopes(&map.envelopes, writer)?;
    debug!(
        "serialized {} items, {} data blocks",
        writer.directory().num_items(),
        writer.num_data(),
    );
    Ok(())
}

fn save_info(info: &Info, writer: &mut df::Writer) -> Result<(), Error> {
    let v1 = format::MapItemInfoV1 {
        author: add_optional_string(writer, &info.author)?,
        version: add_optional_string(writer, &info.version)?,
        credits: add_optional_string(writer, &info.credits)?,
        license: add_optional_string(writer, &info.license)?,
    };
    let settings = if info.settings.is_empty() {
        -1
    } else {
        let mut data = Vec::new();
        for setting in &info.settings {
            data.extend_from_slice(setting.as_bytes());
            data.push(0);
        }
        to_i32(writer.add_data(data))?
    };
    let mut item = vec![format::MAP_ITEMTYPE_INFO_VERSION];
    v1.extend_i32s(&mut item);
    format::MapItemInfoV1ExtraRace { settings }.extend_i32s(&mut item);
    writer.add_item(format::MAP_ITEMTYPE_INFO, 0, &item)?;
    Ok(())
}

fn save_image(image: &Image, id: u16, writer: &mut df::Writer) -> Result<(), Error> {
    // Embedded images are always stored as RGBA.
    let data = if image.external { None } else { image.rgba_data() };
    if !image.external && data.is_none() {
        warn!("image {:?} has no pixel data, saving as external", image.name);
    }
    let v1 = format::MapItemImageV1 {
        width: image.width.try_i32().ok_or_else(too_large)?,
        height: image.height.try_i32().ok_or_else(too_large)?,
        external: data.is_none() as i32,
        name: add_string(writer, &image.name)?,
        data: match data {
            Some(d) => to_i32(writer.add_data(d))?,
            None => -1,
        },
    };
    let mut item = vec![format::MAP_ITEMTYPE_IMAGE_VERSION];
    v1.extend_i32s(&mut item);
    writer.add_item(format::MAP_ITEMTYPE_IMAGE, id, &item)?;
    Ok(())
}

fn save_sound(sound: &Sound, id: u16, writer: &mut df::Writer) -> Result<(), Error> {
    let v1 = match sound.data {
        Some(ref data) => format::MapItemSoundV1 {
            external: 0,
            name: add_string(writer, &sound.name)?,
            data_size: to_i32(data.len())?,
            data: to_i32(writer.add_data(data.clone()))?,
        },
        None => format::MapItemSoundV1 {
            external: 1,
            name: add_string(writer, &sound.name)?,
            data: -1,
            data_size: 0,
        },
    };
    let mut item = vec![format::MAP_ITEMTYPE_SOUND_VERSION];
    v1.extend_i32s(&mut item);
    writer.add_item(format::MAP_ITEMTYPE_SOUND, id, &item)?;
    Ok(())
}

fn layer_header(layer: &Layer, type_: i32) -> Vec<i32> {
    let mut item = vec![0];
    format::MapItemLayerV1 {
        type_,
        flags: if layer.detail { format::LAYERFLAG_DETAIL } else { 0 },
    }
    .extend_i32s(&mut item);
    item
}

fn save_groups(groups: &[Group], writer: &mut df::Writer) -> Result<(), Error> {
    let mut layer_count = 0;
    let mut automapper_count = 0;
    for (group_index, group) in groups.iter().enumerate() {
        let group_id = to_id(group_index)?;
        let start_layer = layer_count;
        let mut num_layers = 0;
        for layer in &group.layers {
            let layer_id = to_id(layer_count)?;
            let item = match layer.kind {
                LayerKind::Tiles(ref tiles) => {
                    let item = tilemap_item(layer, tiles, layer_id, writer)?;
                    if !tiles.is_physics() {
                        let config = format::MapItemAutoMapperConfigV1 {
                            group_id: to_i32(group_index)?,
                            layer_id: to_i32(num_layers)?,
                            automapper_config: tiles.automapper.config,
                            automapper_seed: tiles.automapper.seed,
                            flags: if tiles.automapper.automatic { format::AUTOMAPPER_FLAG_AUTOMATIC } else { 0 },
                        };
                        let mut config_item = vec![format::MAP_ITEMTYPE_AUTOMAPPER_CONFIG_VERSION];
                        config.extend_i32s(&mut config_item);
                        writer.add_item_ex(format::automapper_config_uuid(), to_id(automapper_count)?, &config_item)?;
                        automapper_count += 1;
                    }
                    item
                }
                LayerKind::Quads(ref quads) if !quads.quads.is_empty() => {
                    let mut item = layer_header(layer, format::MAP_ITEMTYPE_LAYER_V1_QUADS);
                    item.push(format::QUADS_VERSION);
                    format::MapItemLayerV1QuadsV1 {
                        num_quads: to_i32(quads.quads.len())?,
                        data: to_i32(writer.add_data_swapped(format::records_to_i32s(&quads.quads)))?,
                        image: opt_index(quads.image)?,
                    }
                    .extend_i32s(&mut item);
                    format::MapItemLayerV1QuadsV2 {
                        name: format::string_to_name3(&layer.name),
                    }
                    .extend_i32s(&mut item);
                    item
                }
                LayerKind::Sounds(ref sounds) if !sounds.sources.is_empty() => {
                    let raw: Vec<format::SoundSourceV1> = sounds.sources.iter().map(SoundSource::to_raw).collect();
                    let mut item = layer_header(layer, format::MAP_ITEMTYPE_LAYER_V1_DDRACE_SOUNDS);
                    item.push(format::SOUNDS_VERSION);
                    format::MapItemLayerV1DdraceSoundsV1 {
                        num_sources: to_i32(raw.len())?,
                        data: to_i32(writer.add_data_swapped(format::records_to_i32s(&raw)))?,
                        sound: opt_index(sounds.sound)?,
                        name: format::string_to_name3(&layer.name),
                    }
                    .extend_i32s(&mut item);
                    item
                }
                LayerKind::Quads(_) | LayerKind::Sounds(_) => {
                    debug!("dropping empty layer {:?}", layer.name);
                    continue;
                }
            };
            writer.add_item(format::MAP_ITEMTYPE_LAYER, layer_id, &item)?;
            num_layers += 1;
            layer_count += 1;
        }

        let mut item = vec![format::MAP_ITEMTYPE_GROUP_VERSION];
        format::MapItemGroupV1 {
            offset_x: group.offset_x,
            offset_y: group.offset_y,
            parallax_x: group.parallax_x,
            parallax_y: group.parallax_y,
            start_layer: to_i32(start_layer)?,
            num_layers: to_i32(num_layers)?,
        }
        .extend_i32s(&mut item);
        format::MapItemGroupV2 {
            use_clipping: group.use_clipping as i32,
            clip_x: group.clipping.x,
            clip_y: group.clipping.y,
            clip_w: group.clipping.width,
            clip_h: group.clipping.height,
        }
        .extend_i32s(&mut item);
        format::MapItemGroupV3 {
            name: format::string_to_name3(&group.name),
        }
        .extend_i32s(&mut item);
        writer.add_item(format::MAP_ITEMTYPE_GROUP, group_id, &item)?;

        let mut ex = vec![format::MAP_ITEMTYPE_GROUP_EX_VERSION];
        format::MapItemGroupExV1 {
            parallax_zoom: group.parallax_zoom(),
        }
        .extend_i32s(&mut ex);
        writer.add_item_ex(format::group_ex_uuid(), group_id, &ex)?;
    }
    Ok(())
}

fn side_bytes<T: AsBytes>(side: &Array2<T>, tiles: &TileLayer, id: u16) -> Result<Vec<u8>, Error> {
    if side.dim() != tiles.tiles.dim() {
        error!("physics data of layer {} has shape {:?}, tiles have {:?}", id, side.dim(), tiles.tiles.dim());
        return Err(MapError::MalformedTilemap(id).into());
    }
    Ok(array_bytes(side))
}

fn tilemap_item(layer: &Layer, tiles: &TileLayer, id: u16, writer: &mut df::Writer) -> Result<Vec<i32>, Error> {
    let kind = tiles.kind();
    let (data, side) = match tiles.physics {
        Physics::None | Physics::Game => (array_bytes(&tiles.tiles), None),
        ref physics => {
            // Physics layers keep their data in the side array. The generic
            // tiles are written empty.
            let empty = vec![0; tiles.tiles.len() * std::mem::size_of::<Tile>()];
            let side = match *physics {
                Physics::Teleport(ref s) => side_bytes(s, tiles, id)?,
                Physics::Speedup(ref s) => side_bytes(s, tiles, id)?,
                Physics::Switch(ref s) => side_bytes(s, tiles, id)?,
                Physics::Tune(ref s) => side_bytes(s, tiles, id)?,
                _ => array_bytes(&tiles.tiles),
            };
            (empty, Some(side))
        }
    };
    let data = to_i32(writer.add_data(data))?;
    let side = match side {
        Some(side) => to_i32(writer.add_data(side))?,
        None => -1,
    };
    let mut item = layer_header(layer, format::MAP_ITEMTYPE_LAYER_V1_TILEMAP);
    item.push(format::TILEMAP_VERSION);
    format::MapItemLayerV1TilemapV2 {
        width: to_i32(tiles.width())?,
        height: to_i32(tiles.height())?,
        flags: kind.flags(),
        color_red: tiles.color.red,
        color_green: tiles.color.green,
        color_blue: tiles.color.blue,
        color_alpha: tiles.color.alpha,
        color_env: tiles.color_env,
        color_env_offset: tiles.color_env_offset,
        image: opt_index(tiles.image)?,
        data,
    }
    .extend_i32s(&mut item);
    format::MapItemLayerV1TilemapV3 {
        name: format::string_to_name3(&layer.name),
    }
    .extend_i32s(&mut item);
    let extra = if kind == TilemapKind::Tiles || kind == TilemapKind::Game {
        format::MapItemLayerV1TilemapExtraRace { data: [-1; 5] }
    } else {
        format::MapItemLayerV1TilemapExtraRace::new(kind, side)
    };
    item.extend(format::records_to_i32s(std::slice::from_ref(&extra)));
    Ok(item)
}

fn save_envelopes(envelopes: &[Envelope], writer: &mut df::Writer) -> Result<(), Error> {
    let mut point_count = 0;
    for (i, envelope) in envelopes.iter().enumerate() {
        let mut item = vec![format::MAP_ITEMTYPE_ENVELOPE_VERSION];
        format::MapItemEnvelopeV1 {
            channels: envelope.channels,
            start_points: to_i32(point_count)?,
            num_points: to_i32(envelope.points.len())?,
            name: format::string_to_name8(&envelope.name),
        }
        .extend_i32s(&mut item);
        format::MapItemEnvelopeV2 {
            synchronized: envelope.synchronized as i32,
        }
        .extend_i32s(&mut item);
        writer.add_item(format::MAP_ITEMTYPE_ENVELOPE, to_id(i)?, &item)?;
        point_count += envelope.points.len();
    }

    let points: Vec<format::MapItemEnvpointV1> = envelopes
        .iter()
        .flat_map(|e| e.points.iter())
        .map(|p| format::MapItemEnvpointV1 {
            time: p.time,
            curve_type: p.curve.to_i32(),
            values: p.values,
        })
        .collect();
    writer.add_item(format::MAP_ITEMTYPE_ENVPOINTS, 0, &format::records_to_i32s(&points))?;

    let bezier_used = envelopes
        .iter()
        .flat_map(|e| e.points.iter())
        .any(|p| p.curve == CurveType::Bezier);
    if !bezier_used {
        return Ok(());
    }
    // A point's outgoing tangent matters if it is a bezier point, its
    // incoming one if the previous point is.
    let mut bezier = Vec::with_capacity(points.len());
    for envelope in envelopes {
        let mut previous: Option<&EnvPoint> = None;
        for point in &envelope.points {
            let mut b = Bezier::default();
            if point.curve == CurveType::Bezier {
                b.out_tangent_dx = point.bezier.out_tangent_dx;
                b.out_tangent_dy = point.bezier.out_tangent_dy;
            }
            if previous.map_or(false, |p| p.curve == CurveType::Bezier) {
                b.in_tangent_dx = point.bezier.in_tangent_dx;
                b.in_tangent_dy = point.bezier.in_tangent_dy;
            }
            bezier.push(b);
            previous = Some(point);
        }
    }
    writer.add_item_ex(format::envpoints_bezier_uuid(), 0, &format::records_to_i32s(&bezier))?;
    Ok(())
}
