#![cfg(not(test))]

extern crate mapio_map as map;

use map::Defaults;
use map::LayerKind;
use map::Map;
use std::env;
use std::path::Path;

fn dump(map: &Map) {
    let info = &map.info;
    println!("author={:?} version={:?} credits={:?} license={:?}", info.author, info.version, info.credits, info.license);
    for setting in &info.settings {
        println!("setting {:?}", setting);
    }
    for (i, image) in map.images.iter().enumerate() {
        println!(
            "image #{} {:?} {}x{} {:?}{}",
            i,
            image.name,
            image.width,
            image.height,
            image.format,
            if image.external { " external" } else { "" },
        );
    }
    for (i, sound) in map.sounds.iter().enumerate() {
        let size = sound.data.as_ref().map_or(0, |d| d.len());
        println!("sound #{} {:?} {} bytes{}", i, sound.name, size, if sound.external { " external" } else { "" });
    }
    for (i, group) in map.groups.iter().enumerate() {
        println!(
            "group #{} {:?} offset=({}, {}) parallax=({}, {}) zoom={}",
            i,
            group.name,
            group.offset_x,
            group.offset_y,
            group.parallax_x,
            group.parallax_y,
            group.parallax_zoom(),
        );
        for (j, layer) in group.layers.iter().enumerate() {
            match layer.kind {
                LayerKind::Tiles(ref t) => println!(
                    "  layer #{} {:?} {:?} {}x{} image={:?}",
                    j,
                    layer.name,
                    t.kind(),
                    t.width(),
                    t.height(),
                    t.image,
                ),
                LayerKind::Quads(ref q) => {
                    println!("  layer #{} {:?} quads={} image={:?}", j, layer.name, q.quads.len(), q.image)
                }
                LayerKind::Sounds(ref s) => {
                    println!("  layer #{} {:?} sources={} sound={:?}", j, layer.name, s.sources.len(), s.sound)
                }
            }
        }
    }
    for (i, envelope) in map.envelopes.iter().enumerate() {
        println!(
            "envelope #{} {:?} channels={} points={}{}",
            i,
            envelope.name,
            envelope.channels,
            envelope.points.len(),
            if envelope.synchronized { " synchronized" } else { "" },
        );
    }
}

fn main() {
    logger::init();

    let mut args = env::args_os();
    let program_name = args.next().unwrap();
    let paths: Vec<_> = args.collect();
    if paths.is_empty() {
        println!("USAGE: {} <MAP>...", program_name.to_string_lossy());
        return;
    }
    let mut defaults = Defaults::new(".");
    for path in paths {
        let path = Path::new(&path);
        match Map::load(path, &mut defaults.options()) {
            Ok(map) => {
                println!("{}:", path.display());
                dump(&map);
            }
            Err(e) => println!("{}: {}", path.display(), e),
        }
    }
}
