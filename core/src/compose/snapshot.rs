//! Snapshot tree
//!
//! Every value here is owned; nothing refers back into emulator memory.
//! Fields the builders do not recognise are carried in the flattened
//! `extra` maps.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use statecast_shared::Button;

use super::state::GameState;
use crate::emulator::ScreenHandle;
use crate::schema::Label;

/// Decoded game state at one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub frame: u64,
    pub state: GameState,
    pub map: MapInfo,
    pub player: PlayerInfo,
    pub team: Vec<TeamMember>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battle: Option<BattleInfo>,
    pub viewport: Viewport,
    pub text: TextInfo,
    pub screen: Option<ScreenHandle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_button: Option<Button>,
    /// Flag fields other than the state flags
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub flags: BTreeMap<String, Value>,
    /// Names of fields that could not be read, sorted
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unavailable: Vec<String>,
}

impl Snapshot {
    /// The snapshot without its per-frame parts
    pub fn without_frame(&self) -> Snapshot {
        Snapshot {
            frame: 0,
            screen: None,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MapInfo {
    pub name: Option<Label>,
    pub tileset: Option<Label>,
    pub dimensions: Option<[u32; 2]>,
    pub warps: Vec<Warp>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Warp {
    pub x: u32,
    pub y: u32,
    pub destination: Option<Label>,
}

/// `[x, y, facing]`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position(pub u32, pub u32, pub Label);

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlayerInfo {
    pub position: Option<Position>,
    pub money: Option<u32>,
    pub badges: Vec<Label>,
    pub pokedex: Option<Pokedex>,
    pub bag: Vec<BagItem>,
    pub party_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Pokedex {
    pub owned: u32,
    pub seen: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BagItem {
    pub item: Label,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamMember {
    /// 1-based party slot
    pub slot: usize,
    pub species: Label,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    pub level: Option<u32>,
    pub hp: Option<u32>,
    pub max_hp: Option<u32>,
    pub status: Option<Label>,
    pub types: Vec<Label>,
    pub moves: Vec<Label>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<Stats>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Stats {
    pub attack: Option<u32>,
    pub defense: Option<u32>,
    pub speed: Option<u32>,
    pub special: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BattleInfo {
    pub kind: Label,
    pub trainer: bool,
    pub opponent: Option<Combatant>,
    pub active: Option<Combatant>,
    pub active_move: Option<Label>,
    pub turn: Option<u32>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// One side of a battle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Combatant {
    pub species: Label,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    pub level: Option<u32>,
    pub hp: Option<u32>,
    pub max_hp: Option<u32>,
    pub hp_percent: Option<u32>,
    pub status: Option<Label>,
    pub types: Vec<Label>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Viewport {
    pub width: usize,
    pub height: usize,
    /// Row-major; terrain codes where the grid's table classifies a tile,
    /// raw tile numbers elsewhere
    pub tiles: Vec<Vec<Value>>,
    pub entities: Vec<Entity>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A visible sprite other than the player
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    pub slot: usize,
    pub sprite: Label,
    /// Map coordinates `[x, y]`
    pub position: [i32; 2],
    pub facing: Option<Label>,
    pub movement: Option<Label>,
    pub moving: bool,
    pub delay: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextContext {
    #[default]
    None,
    Menu,
    Dialog,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TextInfo {
    /// Non-empty rows of on-screen text
    pub lines: Vec<String>,
    /// Rows of the dialog box
    pub dialog: Vec<String>,
    pub menu: MenuState,
    pub context: TextContext,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MenuState {
    pub current_item: Option<u32>,
    pub max_item: Option<u32>,
    /// `[column, row]` of the cursor glyph
    pub cursor: Option<[usize; 2]>,
    /// First word after the cursor
    pub selection: Option<String>,
}
