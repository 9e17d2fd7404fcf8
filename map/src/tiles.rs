//! Entity indices of physics layers and the display projection of their
//! side arrays.

use ndarray::Array2;

use crate::model::Physics;
use crate::model::Tile;

/// Game layers written by pre-release versions store entities without this
/// offset.
pub const ENTITY_OFFSET: u8 = 255 - 16 * 4;

pub const TILE_JUMP: u8 = 7;
pub const TILE_FREEZE: u8 = 9;
pub const TILE_TELEINEVIL: u8 = 10;
pub const TILE_DFREEZE: u8 = 12;
pub const TILE_DUNFREEZE: u8 = 13;
pub const TILE_TELEINWEAPON: u8 = 14;
pub const TILE_TELEINHOOK: u8 = 15;
pub const TILE_HIT_ENABLE: u8 = 19;
pub const TILE_HIT_DISABLE: u8 = 20;
pub const TILE_SWITCHTIMEDOPEN: u8 = 22;
pub const TILE_SWITCHCLOSE: u8 = 25;
pub const TILE_TELEIN: u8 = 26;
pub const TILE_TELEOUT: u8 = 27;
pub const TILE_BOOST: u8 = 28;
pub const TILE_TELECHECK: u8 = 29;
pub const TILE_TELECHECKOUT: u8 = 30;
pub const TILE_TELECHECKIN: u8 = 31;
pub const TILE_TELECHECKINEVIL: u8 = 63;
pub const TILE_TUNE: u8 = 68;
pub const TILE_ADD_TIME: u8 = 79;
pub const TILE_SUBTRACT_TIME: u8 = 95;
pub const TILE_ALLOW_TELE_GUN: u8 = 98;
pub const TILE_ALLOW_BLUE_TELE_GUN: u8 = 99;
pub const TILE_LFREEZE: u8 = 144;
pub const TILE_LUNFREEZE: u8 = 145;

const ENTITY_LASER_O_FAST: u8 = 27;
const ENTITY_CRAZY_SHOTGUN: u8 = 34;
const ENTITY_ARMOR_1: u8 = 6;
const ENTITY_DRAGGER_WEAK: u8 = 42;
const ENTITY_DOOR: u8 = 49;

pub fn is_valid_tele_tile(index: u8) -> bool {
    matches!(
        index,
        TILE_TELEINEVIL
            | TILE_TELEINWEAPON
            | TILE_TELEINHOOK
            | TILE_TELEIN
            | TILE_TELEOUT
            | TILE_TELECHECK
            | TILE_TELECHECKOUT
            | TILE_TELECHECKIN
            | TILE_TELECHECKINEVIL
    )
}

pub fn is_valid_speedup_tile(index: u8) -> bool {
    index == TILE_BOOST
}

pub fn is_valid_tune_tile(index: u8) -> bool {
    index == TILE_TUNE
}

pub fn is_valid_switch_tile(index: u8) -> bool {
    let entity = |e: u8| e + ENTITY_OFFSET;
    // Unused entity numbers between the shotguns and the draggers, and the
    // one after the last laser modifier.
    if (index > entity(ENTITY_CRAZY_SHOTGUN) && index < entity(ENTITY_DRAGGER_WEAK))
        || index == entity(ENTITY_LASER_O_FAST + 1)
    {
        return false;
    }
    if index >= entity(ENTITY_ARMOR_1) && index <= entity(ENTITY_DOOR) {
        return true;
    }
    matches!(
        index,
        TILE_JUMP
            | TILE_FREEZE
            | TILE_DFREEZE
            | TILE_DUNFREEZE
            | TILE_LFREEZE
            | TILE_LUNFREEZE
            | TILE_HIT_ENABLE
            | TILE_HIT_DISABLE
            | TILE_SWITCHTIMEDOPEN..=TILE_SWITCHCLOSE
            | TILE_ADD_TIME
            | TILE_SUBTRACT_TIME
            | TILE_ALLOW_TELE_GUN
            | TILE_ALLOW_BLUE_TELE_GUN
    )
}

fn index_only(index: u8) -> Tile {
    Tile {
        index,
        ..Tile::default()
    }
}

/// Rebuilds the generic tiles of a physics layer from its side array.
/// Entries not accepted by the layer kind show up as empty tiles. Layers
/// without a side array are left alone.
pub fn project(physics: &Physics, tiles: &mut Array2<Tile>) {
    match *physics {
        Physics::None | Physics::Game | Physics::Front => {}
        Physics::Teleport(ref side) => {
            *tiles = side.map(|t| {
                index_only(if is_valid_tele_tile(t.index) { t.index } else { 0 })
            });
        }
        Physics::Speedup(ref side) => {
            *tiles = side.map(|t| {
                let valid = is_valid_speedup_tile(t.index) && t.force > 0;
                index_only(if valid { t.index } else { 0 })
            });
        }
        Physics::Switch(ref side) => {
            *tiles = side.map(|t| {
                if is_valid_switch_tile(t.index) {
                    Tile {
                        index: t.index,
                        flags: t.flags,
                        ..Tile::default()
                    }
                } else {
                    Tile::default()
                }
            });
        }
        Physics::Tune(ref side) => {
            *tiles = side.map(|t| {
                index_only(if is_valid_tune_tile(t.index) { t.index } else { 0 })
            });
        }
    }
}

/// Shifts the entity indices of a pre-release game layer.
pub fn add_entity_offset(tiles: &mut Array2<Tile>) {
    for tile in tiles.iter_mut().filter(|t| t.index != 0) {
        tile.index = tile.index.wrapping_add(ENTITY_OFFSET);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::SpeedupTile;
    use crate::model::SwitchTile;
    use crate::model::TeleTile;

    #[test]
    fn switch_ranges() {
        assert_eq!(ENTITY_OFFSET, 191);
        assert!(is_valid_switch_tile(197));
        assert!(is_valid_switch_tile(240));
        assert!(!is_valid_switch_tile(241));
        assert!(is_valid_switch_tile(225));
        for i in 226..=232 {
            assert!(!is_valid_switch_tile(i));
        }
        assert!(is_valid_switch_tile(233));
        assert!(!is_valid_switch_tile(219));
        assert!(is_valid_switch_tile(TILE_FREEZE));
        assert!(is_valid_switch_tile(23));
        assert!(!is_valid_switch_tile(TILE_TELEIN));
        assert!(!is_valid_switch_tile(0));
    }

    #[test]
    fn tele_projection() {
        let side = Array2::from_shape_vec(
            (1, 3),
            vec![
                TeleTile { number: 1, index: TILE_TELEIN },
                TeleTile { number: 1, index: 200 },
                TeleTile { number: 0, index: TILE_TELECHECKINEVIL },
            ],
        )
        .unwrap();
        let mut tiles = Array2::default((1, 3));
        project(&Physics::Teleport(side), &mut tiles);
        let indices: Vec<_> = tiles.iter().map(|t| t.index).collect();
        assert_eq!(indices, [TILE_TELEIN, 0, TILE_TELECHECKINEVIL]);
    }

    #[test]
    fn speedup_needs_force() {
        let boost = |force| SpeedupTile { force, index: TILE_BOOST, ..SpeedupTile::default() };
        let side = Array2::from_shape_vec((2, 1), vec![boost(0), boost(5)]).unwrap();
        let mut tiles = Array2::default((2, 1));
        project(&Physics::Speedup(side), &mut tiles);
        assert_eq!(tiles[(0, 0)].index, 0);
        assert_eq!(tiles[(1, 0)].index, TILE_BOOST);
    }

    #[test]
    fn switch_copies_flags() {
        let side = Array2::from_shape_vec(
            (1, 2),
            vec![
                SwitchTile { number: 3, index: TILE_FREEZE, flags: 2, delay: 0 },
                SwitchTile { number: 3, index: 228, flags: 2, delay: 0 },
            ],
        )
        .unwrap();
        let mut tiles = Array2::default((1, 2));
        project(&Physics::Switch(side), &mut tiles);
        assert_eq!(tiles[(0, 0)], Tile { index: TILE_FREEZE, flags: 2, skip: 0, reserved: 0 });
        assert_eq!(tiles[(0, 1)], Tile::default());
    }

    #[test]
    fn entity_offset() {
        let mut tiles = Array2::from_shape_vec((1, 2), vec![index_only(0), index_only(1)]).unwrap();
        add_entity_offset(&mut tiles);
        assert_eq!(tiles[(0, 0)].index, 0);
        assert_eq!(tiles[(0, 1)].index, 192);
    }
}
