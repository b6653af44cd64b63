//! State composer
//!
//! Builds one [`Snapshot`] per tick by decoding the registry category by
//! category:
//!
//! flags → map → player → team → battle → viewport → text → screen
//!
//! Each category builder consumes the keys it knows. Anything left over is
//! emitted under its own key, so a schema can add fields without code
//! changes here.
//!
//! The battle category is only decoded while the battle flag is raised.

mod battle;
mod map;
mod player;
mod section;
mod snapshot;
mod state;
mod team;
mod tests;
mod text;
mod viewport;

pub use battle::{TRAINER_BATTLE, hp_percent};
pub use snapshot::{
    BagItem, BattleInfo, Combatant, Entity, MapInfo, MenuState, PlayerInfo, Pokedex, Position,
    Snapshot, Stats, TeamMember, TextContext, TextInfo, Viewport, Warp,
};
pub use state::{ActiveFlags, GameState, StatePriority};
pub use team::MAX_PARTY;
pub use text::{CURSOR, DIALOG_ROWS};
pub use viewport::{GRID_OFFSET, HIDDEN_SPRITE, LEDGE_STANDING_TILES, TilesetTraits};

use std::sync::Arc;

use statecast_shared::Button;

use crate::emulator::{EmulatorFault, MemoryReader, ScreenHandle};
use crate::schema::{Category, Registry};
use section::Section;

/// Per-frame inputs that do not come from memory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameContext {
    pub frame: u64,
    pub screen: Option<ScreenHandle>,
    pub last_button: Option<Button>,
}

/// Snapshot builder over a shared registry
#[derive(Debug, Clone)]
pub struct Composer {
    registry: Arc<Registry>,
    priority: StatePriority,
}

impl Composer {
    pub fn new(registry: Arc<Registry>, priority: StatePriority) -> Self {
        Self { registry, priority }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn priority(&self) -> &StatePriority {
        &self.priority
    }

    /// Decode `memory` into a snapshot.
    ///
    /// Unreadable fields are listed in [`Snapshot::unavailable`]; only a
    /// reader failure aborts.
    pub fn compose(
        &self,
        memory: &impl MemoryReader,
        context: FrameContext,
    ) -> Result<Snapshot, EmulatorFault> {
        let registry = self.registry.as_ref();
        let mut unavailable = Vec::new();
        let mut load = |category| Section::load(registry, category, memory, &mut unavailable);

        let mut flags = load(Category::Flags)?;
        let battle_flag = flags.flag("battle");
        let dialog_flag = flags.flag("dialog");
        let menu_flag = flags.flag("menu");
        let transition_flag = flags.flag("transition");
        let other_flags = flags.into_extra();

        let map = map::build(load(Category::Map)?);
        let player = player::build(load(Category::Player)?);
        let team = team::build(load(Category::Team)?);
        let battle = match &battle_flag {
            Some(flag) if flag.active => Some(battle::build(load(Category::Battle)?, flag)),
            _ => None,
        };
        let viewport = viewport::build(load(Category::Viewport)?, map.tileset.as_ref());
        let (text, signals) = text::build(
            load(Category::Text)?,
            menu_flag.as_ref().map(|f| f.active),
            dialog_flag.as_ref().map(|f| f.active),
        );

        let active = ActiveFlags {
            battle: battle.is_some(),
            dialog: signals.dialog,
            menu: signals.menu,
            transition: transition_flag.is_some_and(|f| f.active),
        };
        let state = self.priority.resolve(&active);
        let battle = battle.filter(|_| state == GameState::Battle);

        unavailable.sort();

        Ok(Snapshot {
            frame: context.frame,
            state,
            map,
            player,
            team,
            battle,
            viewport,
            text,
            screen: context.screen,
            last_button: context.last_button,
            flags: other_flags,
            unavailable,
        })
    }
}
