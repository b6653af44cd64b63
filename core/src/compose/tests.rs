//! Tests for the state composer

#![cfg(test)]

use std::sync::Arc;

use serde_json::json;

use super::*;
use crate::emulator::MemoryImage;
use crate::schema::{Label, RegistryDocuments};

const MEMORY: usize = 0x200;

const ADDRESSES: &str = r#"{
    "flags.battle": {"address": "0x00", "kind": "scalar", "valueTable": "battle_kinds"},
    "flags.menu": {"address": "0x01", "kind": "scalar", "idle": 255},
    "flags.transition": {"address": "0x02", "kind": "scalar"},
    "flags.debug": {"address": "0x03", "kind": "scalar"},

    "map.id": {"address": "0x10", "kind": "pointer-index", "valueTable": "maps"},
    "map.width": {"address": "0x11", "kind": "scalar", "scale": 2},
    "map.height": {"address": "0x12", "kind": "scalar", "scale": 2},
    "map.music": {"address": "0x13", "kind": "scalar"},
    "map.warp_count": {"address": "0x14", "kind": "scalar"},
    "map.warps.y": {"address": "0x15", "kind": "array", "count": 4, "stride": 4},
    "map.warps.x": {"address": "0x16", "kind": "array", "count": 4, "stride": 4},
    "map.warps.destination": {"address": "0x18", "kind": "array", "count": 4, "stride": 4, "valueTable": "maps"},

    "player.x": {"address": "0x30", "kind": "scalar"},
    "player.y": {"address": "0x31", "kind": "scalar"},
    "player.facing": {"address": "0x32", "kind": "scalar", "valueTable": "facing"},
    "player.money": {"address": "0x33", "kind": "bcd", "width": 3},
    "player.badges": {"address": "0x36", "kind": "bitflags", "valueTable": "badges"},
    "player.name": {"address": "0x37", "kind": "text", "length": 4, "valueTable": "charset"},

    "team.count": {"address": "0x40", "kind": "scalar"},
    "team.species": {"address": "0x41", "kind": "array", "count": 3, "stride": 8, "valueTable": "species"},
    "team.level": {"address": "0x42", "kind": "array", "count": 3, "stride": 8},
    "team.hp": {"address": "0x43", "kind": "array", "count": 3, "stride": 8, "width": 2, "endian": "big"},
    "team.moves": {"address": "0x45", "kind": "array", "count": 3, "stride": 8, "lanes": 2, "valueTable": "moves"},
    "team.exp": {"address": "0x47", "kind": "array", "count": 3, "stride": 8},

    "battle.enemy.species": {"address": "0x60", "kind": "pointer-index", "valueTable": "species"},
    "battle.enemy.hp": {"address": "0x61", "kind": "scalar", "width": 2, "endian": "big"},
    "battle.enemy.max_hp": {"address": "0x63", "kind": "scalar", "width": 2, "endian": "big"},
    "battle.player.species": {"address": "0x65", "kind": "pointer-index", "valueTable": "species"},
    "battle.turn": {"address": "0x66", "kind": "scalar"},

    "viewport.tiles": {"address": "0xC0", "kind": "tile-grid", "width": 4, "height": 3},
    "viewport.sprite.picture": {"address": "0x80", "kind": "array", "count": 4, "stride": 16, "valueTable": "sprites"},
    "viewport.sprite.status": {"address": "0x81", "kind": "array", "count": 4, "stride": 16},
    "viewport.sprite.image": {"address": "0x82", "kind": "array", "count": 4, "stride": 16},
    "viewport.sprite.grid_y": {"address": "0x84", "kind": "array", "count": 4, "stride": 16},
    "viewport.sprite.grid_x": {"address": "0x85", "kind": "array", "count": 4, "stride": 16},

    "text.screen": {"address": "0x100", "kind": "tile-grid", "width": 6, "height": 18, "valueTable": "charset"},
    "text.menu_item": {"address": "0x170", "kind": "scalar"}
}"#;

const VALUES: &str = r#"{
    "battle_kinds": {"1": "Wild", "2": "Trainer"},
    "maps": {"0": "PALLET TOWN", "1": "VIRIDIAN CITY", "37": "RED'S HOUSE 1F"},
    "facing": {"0": "Null", "1": "Right", "2": "Left", "4": "Down", "8": "Up"},
    "badges": ["Boulder Badge", "Cascade Badge"],
    "species": {"0x99": "BULBASAUR", "0xB0": "CHARMANDER"},
    "moves": {"33": "TACKLE", "45": "GROWL"},
    "sprites": {"1": "RED", "2": "OAK"},
    "charset": {"0x50": "@", "0x7F": " ", "0x80": "A", "0x81": "B", "0xED": "▶", "0xEE": "▼"}
}"#;

const SCREEN: u32 = 0x100;
const SCREEN_WIDTH: u32 = 6;

fn composer(priority: StatePriority) -> Composer {
    let docs = RegistryDocuments::from_json_str(ADDRESSES, VALUES).unwrap();
    Composer::new(Arc::new(Registry::load(&docs, MEMORY).unwrap()), priority)
}

fn compose(image: &MemoryImage) -> Snapshot {
    composer(StatePriority::default())
        .compose(image, FrameContext::default())
        .unwrap()
}

fn screen_row(image: &mut MemoryImage, row: u32, tiles: &[u8]) {
    image.poke_slice(SCREEN + row * SCREEN_WIDTH, tiles);
}

#[test]
fn test_overworld_position() {
    let mut image = MemoryImage::new(MEMORY);
    image.poke_slice(0x30, &[10, 12, 4]);

    let snapshot = compose(&image);
    assert_eq!(snapshot.state, GameState::Overworld);
    assert_eq!(
        snapshot.player.position,
        Some(Position(10, 12, Label::Name("Down".into())))
    );

    let value = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(value["state"], json!("overworld"));
    assert_eq!(value["player"]["position"], json!([10, 12, "Down"]));
    assert!(value.get("battle").is_none());
    assert!(value.get("unavailable").is_none());
}

#[test]
fn test_map_section() {
    let mut image = MemoryImage::new(MEMORY);
    image.poke_slice(0x10, &[1, 10, 9, 7, 2]);
    // y, x, -, destination
    image.poke_slice(0x15, &[5, 3, 0, 37, 6, 4, 0, 0, 9, 9, 0, 1]);

    let map = compose(&image).map;
    assert_eq!(map.name, Some(Label::Name("VIRIDIAN CITY".into())));
    assert_eq!(map.dimensions, Some([20, 18]));
    assert_eq!(map.warps.len(), 2);
    assert_eq!(
        map.warps[0],
        Warp {
            x: 3,
            y: 5,
            destination: Some(Label::Name("RED'S HOUSE 1F".into())),
        }
    );
    assert_eq!(map.extra.get("music"), Some(&json!(7)));
}

#[test]
fn test_player_section() {
    let mut image = MemoryImage::new(MEMORY);
    image.poke_slice(0x33, &[0x00, 0x30, 0x00, 0b0000_0011, 0x81, 0x80, 0x50, 0x80]);

    let player = compose(&image).player;
    assert_eq!(player.money, Some(3000));
    assert_eq!(
        player.badges,
        [
            Label::Name("Boulder Badge".into()),
            Label::Name("Cascade Badge".into())
        ]
    );
    assert_eq!(player.name.as_deref(), Some("BA"));
}

#[test]
fn test_team_rules() {
    let mut image = MemoryImage::new(MEMORY);
    image.poke(0x40, 2);
    // slot 1: species, level, hp(be), moves, exp
    image.poke_slice(0x41, &[0x99, 5, 0x01, 0x2C, 33, 0, 9]);
    // slot 2 has level 0
    image.poke_slice(0x49, &[0xB0, 0]);
    // slot 3 is past the count
    image.poke_slice(0x51, &[0x99, 7]);

    let team = compose(&image).team;
    assert_eq!(team.len(), 1);

    let member = &team[0];
    assert_eq!(member.slot, 1);
    assert_eq!(member.species, Label::Name("BULBASAUR".into()));
    assert_eq!(member.level, Some(5));
    assert_eq!(member.hp, Some(300));
    assert_eq!(member.moves, [Label::Name("TACKLE".into())]);

    let value = serde_json::to_value(member).unwrap();
    assert_eq!(value["exp"], json!(9));
    assert!(value.get("stats").is_none());
}

#[test]
fn test_battle_section() {
    let mut image = MemoryImage::new(MEMORY);
    image.poke(0x00, 2);
    image.poke_slice(0x60, &[0x99, 0, 20, 0, 40]);
    image.poke(0x66, 3);

    let snapshot = compose(&image);
    assert_eq!(snapshot.state, GameState::Battle);

    let battle = snapshot.battle.unwrap();
    assert!(battle.trainer);
    assert_eq!(battle.kind, Label::Name("Trainer".into()));
    assert_eq!(battle.turn, Some(3));
    // Our side has no species loaded yet
    assert!(battle.active.is_none());

    let opponent = battle.opponent.unwrap();
    assert_eq!(opponent.species, Label::Name("BULBASAUR".into()));
    assert_eq!(opponent.hp_percent, Some(50));
}

#[test]
fn test_battle_skipped_when_flag_idle() {
    let mut image = MemoryImage::new(MEMORY);
    image.poke(0x60, 0x99);

    let snapshot = compose(&image);
    assert!(snapshot.battle.is_none());
    assert_ne!(snapshot.state, GameState::Battle);
}

#[test]
fn test_wild_battle_opponent_empty() {
    let mut image = MemoryImage::new(MEMORY);
    image.poke(0x00, 1);

    let battle = compose(&image).battle.unwrap();
    assert!(!battle.trainer);
    assert_eq!(battle.kind, Label::Name("Wild".into()));
    assert!(battle.opponent.is_none());
}

#[test]
fn test_menu_and_dialog() {
    let mut image = MemoryImage::new(MEMORY);
    // menu item 0 is not idle
    image.poke(0x01, 0);
    screen_row(&mut image, 2, &[0x7F, 0xED, 0x80, 0x81, 0x7F, 0x80]);

    let snapshot = compose(&image);
    assert_eq!(snapshot.state, GameState::Menu);
    assert_eq!(snapshot.text.context, TextContext::Menu);
    assert_eq!(snapshot.text.menu.cursor, Some([1, 2]));
    assert_eq!(snapshot.text.menu.selection.as_deref(), Some("AB"));
    assert_eq!(snapshot.text.lines, [" ▶AB A"]);

    // Dialog outranks menu by default
    screen_row(&mut image, 13, &[0x80, 0x81, 0x7F, 0x80]);
    screen_row(&mut image, 14, &[0x7F, 0x7F, 0x7F, 0x7F, 0x7F, 0xEE]);
    let snapshot = compose(&image);
    assert_eq!(snapshot.text.dialog, ["AB A"]);
    assert_eq!(snapshot.state, GameState::Dialog);

    // ...unless the priority says otherwise
    let menu_first = composer(StatePriority::new([
        GameState::Battle,
        GameState::Menu,
        GameState::Dialog,
    ]));
    let snapshot = menu_first.compose(&image, FrameContext::default()).unwrap();
    assert_eq!(snapshot.state, GameState::Menu);
}

#[test]
fn test_cursor_ignored_when_menu_idle() {
    let mut image = MemoryImage::new(MEMORY);
    image.poke(0x01, 255);
    screen_row(&mut image, 2, &[0xED, 0x80]);

    let snapshot = compose(&image);
    assert_eq!(snapshot.text.menu.cursor, None);
    assert_eq!(snapshot.state, GameState::Overworld);
    assert_eq!(snapshot.text.context, TextContext::None);
}

#[test]
fn test_transition() {
    let mut image = MemoryImage::new(MEMORY);
    image.poke(0x02, 1);
    assert_eq!(compose(&image).state, GameState::Transition);
}

#[test]
fn test_viewport_entities() {
    let mut image = MemoryImage::new(MEMORY);
    // picture, status, image, -, grid_y, grid_x
    image.poke_slice(0x80, &[1, 1, 0, 0, 8, 8]);
    image.poke_slice(0x90, &[2, 1, 0, 0, 8, 9]);
    image.poke_slice(0xA0, &[2, 0, 0, 0, 8, 9]);
    image.poke_slice(0xB0, &[2, 3, 0xFF, 0, 8, 9]);
    image.poke_slice(0xC0, &[1, 2, 3, 4]);

    let viewport = compose(&image).viewport;
    assert_eq!((viewport.width, viewport.height), (4, 3));
    assert_eq!(viewport.tiles[0], [json!(1), json!(2), json!(3), json!(4)]);

    assert_eq!(viewport.entities.len(), 1);
    let entity = &viewport.entities[0];
    assert_eq!(entity.slot, 1);
    assert_eq!(entity.sprite, Label::Name("OAK".into()));
    assert_eq!(entity.position, [5, 4]);
    assert!(!entity.moving);
}

const TERRAIN_ADDRESSES: &str = r#"{
    "map.tileset": {"address": "0x00", "kind": "pointer-index", "valueTable": "tilesets"},
    "viewport.tiles": {"address": "0x10", "kind": "tile-grid", "width": 4, "height": 3, "valueTable": "terrain"}
}"#;

const TERRAIN_VALUES: &str = r##"{
    "tilesets": {
        "0": {"name": "OVERWORLD", "grass_tile": 82, "animation": "WATER_FLOWER"},
        "1": {"name": "HOUSE", "animation": "NONE"}
    },
    "terrain": {"0x10": "#", "0x14": "W", "0x3D": "T", "0x37": "v", "0x27": "<", "0x0D": ">"}
}"##;

fn terrain(tileset: u8, rows: [[u8; 4]; 3]) -> Snapshot {
    let docs = RegistryDocuments::from_json_str(TERRAIN_ADDRESSES, TERRAIN_VALUES).unwrap();
    let composer = Composer::new(
        Arc::new(Registry::load(&docs, 0x40).unwrap()),
        StatePriority::default(),
    );
    let mut image = MemoryImage::new(0x40);
    image.poke(0x00, tileset);
    for (y, row) in rows.iter().enumerate() {
        image.poke_slice(0x10 + 4 * y as u32, row);
    }
    composer.compose(&image, FrameContext::default()).unwrap()
}

#[test]
fn test_viewport_terrain() {
    let snapshot = terrain(
        0,
        [
            [0x2C, 0x14, 0x52, 0x10],
            [0x37, 0x37, 0x3D, 0x01],
            [0x0D, 0x39, 0x27, 0x2C],
        ],
    );
    let tileset = serde_json::to_value(&snapshot.map.tileset).unwrap();
    assert_eq!(tileset["grass_tile"], 82);

    let tiles = &snapshot.viewport.tiles;
    assert_eq!(tiles[0], [json!(0x2C), json!("W"), json!("G"), json!("#")]);
    // only the ledge below a standing tile counts
    assert_eq!(tiles[1], [json!("v"), json!(0x37), json!("T"), json!(1)]);
    assert_eq!(tiles[2], [json!(0x0D), json!(0x39), json!("<"), json!(0x2C)]);
}

#[test]
fn test_viewport_terrain_follows_tileset() {
    let snapshot = terrain(
        1,
        [
            [0x14, 0x52, 0x3D, 0x10],
            [0x00, 0x00, 0x00, 0x00],
            [0x00, 0x00, 0x00, 0x00],
        ],
    );
    assert_eq!(
        snapshot.viewport.tiles[0],
        [json!(0x14), json!(0x52), json!(0x3D), json!("#")]
    );
}

#[test]
fn test_tileset_traits() {
    let record = Label::Record(json!({"name": "CAVERN", "animation": "WATER"}));
    assert_eq!(
        TilesetTraits::from_label(&record),
        Some(TilesetTraits {
            water: true,
            grass_tile: None,
        })
    );
    assert_eq!(TilesetTraits::from_label(&Label::Name("CAVERN".into())), None);
    assert_eq!(TilesetTraits::from_label(&Label::Unknown(0x30)), None);
}

#[test]
fn test_unavailable_fields() {
    let mut image = MemoryImage::new(0x100);
    image.poke(0x01, 255);

    let snapshot = compose(&image);
    assert_eq!(snapshot.unavailable, ["text.menu_item", "text.screen"]);
    assert_eq!(snapshot.state, GameState::Overworld);
    assert!(snapshot.text.lines.is_empty());
}

#[test]
fn test_extra_flags_and_context() {
    let mut image = MemoryImage::new(MEMORY);
    image.poke(0x03, 42);

    let context = FrameContext {
        frame: 99,
        screen: Some(ScreenHandle("abc".into())),
        last_button: Some(Button::A),
    };
    let snapshot = composer(StatePriority::default())
        .compose(&image, context)
        .unwrap();
    let value = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(value["flags"]["debug"], json!(42));
    assert_eq!(value["frame"], json!(99));
    assert_eq!(value["screen"], json!("abc"));
    assert_eq!(value["last_button"], json!("a"));
}

#[test]
fn test_compose_is_deterministic() {
    let mut image = MemoryImage::new(MEMORY);
    image.poke_slice(0x30, &[3, 4, 8]);
    image.poke_slice(0x41, &[0xB0, 12]);
    image.poke(0x40, 1);
    let composer = composer(StatePriority::default());

    let first = composer
        .compose(&image, FrameContext { frame: 1, ..Default::default() })
        .unwrap();
    let second = composer
        .compose(&image, FrameContext { frame: 2, ..Default::default() })
        .unwrap();
    assert_ne!(first, second);
    assert_eq!(first.without_frame(), second.without_frame());
    assert_eq!(
        serde_json::to_string(&first.without_frame()).unwrap(),
        serde_json::to_string(&second.without_frame()).unwrap()
    );
}
