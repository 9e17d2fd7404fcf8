use crate::model::Map;
use crate::services::ErrorSink;

/// Detaches images whose dimensions aren't multiples of 16 from tile
/// layers. Such images can't be split into tiles.
pub fn check(map: &mut Map, errors: &mut dyn ErrorSink) {
    for (image_index, image) in map.images.iter().enumerate() {
        if image.is_tileable() {
            continue;
        }
        for (group_index, group) in map.groups.iter_mut().enumerate() {
            for (layer_index, layer) in group.layers.iter_mut().enumerate() {
                let tiles = unwrap_or!(layer.kind.tiles_mut(), continue);
                if tiles.image != Some(image_index) {
                    continue;
                }
                tiles.image = None;
                errors.report(&format!(
                    "Error: The image '{}' (size {}x{}) has a width or height that is not divisible by 16 \
                     and therefore cannot be used for tile layers. The image of layer #{} '{}' in group #{} '{}' \
                     has been unset.",
                    image.name, image.width, image.height, layer_index, layer.name, group_index, group.name,
                ));
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::check;
    use crate::model::*;

    fn image(width: u32, height: u32) -> Image {
        Image {
            name: format!("{}x{}", width, height),
            width,
            height,
            format: ImageFormat::Rgba,
            external: true,
            data: None,
            texture: None,
        }
    }

    fn tile_layer(image: Option<usize>) -> Layer {
        let mut tiles = TileLayer::new(2, 2);
        tiles.image = image;
        Layer {
            name: "Tiles".into(),
            detail: false,
            kind: LayerKind::Tiles(tiles),
        }
    }

    #[test]
    fn detaches_untileable_images() {
        let mut map = Map::new();
        map.images = vec![image(16, 16), image(17, 16)];
        map.groups.push(Group {
            layers: vec![
                tile_layer(Some(0)),
                tile_layer(Some(1)),
                Layer {
                    name: "Quads".into(),
                    detail: false,
                    kind: LayerKind::Quads(QuadLayer {
                        image: Some(1),
                        quads: vec![Quad::default()],
                    }),
                },
            ],
            ..Group::default()
        });
        let mut errors: Vec<String> = Vec::new();
        check(&mut map, &mut errors);
        let layers = &map.groups[0].layers;
        assert_eq!(layers[0].kind.tiles().unwrap().image, Some(0));
        assert_eq!(layers[1].kind.tiles().unwrap().image, None);
        match layers[2].kind {
            LayerKind::Quads(ref q) => assert_eq!(q.image, Some(1)),
            _ => unreachable!(),
        }
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("17x16"));
    }
}
