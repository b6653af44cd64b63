//! Viewport section: the on-screen tile window and visible sprites
//!
//! When the tile grid declares a terrain table, tiles are classified into
//! one-character codes (`W` water, `T` tree, `G` grass, `v` `<` `>` ledges,
//! `#` off-map). Tiles the table does not know pass through as raw numbers.

use serde_json::Value;

use super::section::{Column, Section};
use super::snapshot::{Entity, Viewport};
use crate::decode::{RawValue, Translated};
use crate::schema::Label;

/// Sprite image index of a hidden sprite
pub const HIDDEN_SPRITE: u32 = 0xFF;
/// Movement status of a sprite mid-step
pub const STATUS_MOVING: u32 = 3;
/// Sprite grid coordinates are offset by this from map coordinates
pub const GRID_OFFSET: i32 = 4;
/// Tiles the player can stand on to jump a ledge
pub const LEDGE_STANDING_TILES: [u8; 2] = [0x2C, 0x39];

pub const WATER: &str = "W";
pub const TREE: &str = "T";
pub const GRASS: &str = "G";
pub const LEDGE_DOWN: &str = "v";
pub const LEDGE_LEFT: &str = "<";
pub const LEDGE_RIGHT: &str = ">";

/// What the current tileset enables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TilesetTraits {
    pub water: bool,
    pub grass_tile: Option<u8>,
}

impl TilesetTraits {
    /// Read `animation` and `grass_tile` from a tileset record.
    ///
    /// A plain name or unknown id yields no traits; a record without
    /// `animation` has no water.
    pub fn from_label(label: &Label) -> Option<Self> {
        let Label::Record(record) = label else {
            return None;
        };
        let water = record
            .get("animation")
            .and_then(Value::as_str)
            .is_some_and(|animation| animation.split('_').any(|part| part == "WATER"));
        let grass_tile = record
            .get("grass_tile")
            .and_then(Value::as_u64)
            .and_then(|tile| u8::try_from(tile).ok());
        Some(Self { water, grass_tile })
    }
}

/// Terrain code of the tile at (`x`, `y`), if it has one.
///
/// Ledges only count with a standing tile on their approach side. Without
/// tileset traits every table code is taken as is.
fn classify<'l>(
    tiles: &[Vec<u8>],
    labels: &'l [Vec<Label>],
    x: usize,
    y: usize,
    tileset: Option<TilesetTraits>,
) -> Option<&'l str> {
    let tile = tiles[y][x];
    let standing = |tx: usize, ty: usize| {
        tiles
            .get(ty)
            .and_then(|row| row.get(tx))
            .is_some_and(|t| LEDGE_STANDING_TILES.contains(t))
    };

    if let Some(traits) = tileset
        && traits.grass_tile == Some(tile)
    {
        return Some(GRASS);
    }

    let code = labels.get(y)?.get(x)?.as_name()?;
    match code {
        LEDGE_DOWN => (y > 0 && standing(x, y - 1)).then_some(code),
        LEDGE_LEFT => standing(x + 1, y).then_some(code),
        LEDGE_RIGHT => (x > 0 && standing(x - 1, y)).then_some(code),
        WATER => match tileset {
            Some(traits) if !traits.water => None,
            _ => Some(code),
        },
        TREE | GRASS => match tileset {
            Some(traits) if traits.grass_tile.is_none() => None,
            _ => Some(code),
        },
        _ => Some(code),
    }
}

fn terrain_grid(
    tiles: &[Vec<u8>],
    labels: &[Vec<Label>],
    tileset: Option<TilesetTraits>,
) -> Vec<Vec<Value>> {
    tiles
        .iter()
        .enumerate()
        .map(|(y, row)| {
            row.iter()
                .enumerate()
                .map(|(x, &tile)| match classify(tiles, labels, x, y, tileset) {
                    Some(code) => Value::String(code.to_string()),
                    None => Value::from(tile),
                })
                .collect()
        })
        .collect()
}

pub(super) fn build(mut section: Section<'_>, tileset: Option<&Label>) -> Viewport {
    let tileset = tileset.and_then(TilesetTraits::from_label);
    let tiles: Vec<Vec<Value>> = match section.take("tiles").map(|entry| entry.field) {
        Some(field) => match (field.translated, field.raw) {
            (Some(Translated::Rows(labels)), RawValue::Grid(rows)) => {
                terrain_grid(&rows, &labels, tileset)
            }
            (_, RawValue::Grid(rows)) => rows
                .into_iter()
                .map(|row| row.into_iter().map(Value::from).collect())
                .collect(),
            _ => Vec::new(),
        },
        None => Vec::new(),
    };

    let pictures = section.column("sprite.picture");
    let statuses = section.column("sprite.status");
    let images = section.column("sprite.image");
    let facing = section.column("sprite.facing");
    let grid_x = section.column("sprite.grid_x");
    let grid_y = section.column("sprite.grid_y");
    let movement = section.column("sprite.movement");
    let delay = section.column("sprite.delay");

    let mut entities = Vec::new();
    if let Some(pictures) = &pictures {
        // Slot 0 is the player
        for slot in 1..pictures.len() {
            let status = statuses.as_ref().and_then(|c| c.raw(slot)).unwrap_or(0);
            if status == 0 {
                continue;
            }
            if images.as_ref().and_then(|c| c.raw(slot)) == Some(HIDDEN_SPRITE) {
                continue;
            }

            let coordinate = |column: &Option<Column>| {
                column.as_ref().and_then(|c| c.raw(slot)).unwrap_or(0) as i32 - GRID_OFFSET
            };
            let labelled =
                |column: &Option<Column>| column.as_ref().and_then(|c| c.label_or_unknown(slot));

            entities.push(Entity {
                slot,
                sprite: pictures
                    .label_or_unknown(slot)
                    .unwrap_or(Label::Unknown(0)),
                position: [coordinate(&grid_x), coordinate(&grid_y)],
                facing: labelled(&facing),
                movement: labelled(&movement),
                moving: status == STATUS_MOVING,
                delay: delay.as_ref().and_then(|c| c.raw(slot)),
            });
        }
    }

    Viewport {
        width: tiles.first().map_or(0, Vec::len),
        height: tiles.len(),
        tiles,
        entities,
        extra: section.into_extra(),
    }
}
