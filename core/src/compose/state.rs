//! Top-level game state derivation

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameState {
    Overworld,
    Battle,
    Menu,
    Dialog,
    Transition,
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GameState::Overworld => "overworld",
            GameState::Battle => "battle",
            GameState::Menu => "menu",
            GameState::Dialog => "dialog",
            GameState::Transition => "transition",
        })
    }
}

/// Which state flags are raised this frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActiveFlags {
    pub battle: bool,
    pub dialog: bool,
    pub menu: bool,
    pub transition: bool,
}

impl ActiveFlags {
    pub fn is_active(&self, state: GameState) -> bool {
        match state {
            GameState::Battle => self.battle,
            GameState::Dialog => self.dialog,
            GameState::Menu => self.menu,
            GameState::Transition => self.transition,
            GameState::Overworld => true,
        }
    }
}

/// Tie-break order between simultaneously active flags.
///
/// `Overworld` is the fallback when nothing is active and is never listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatePriority(Vec<GameState>);

impl StatePriority {
    /// Priority in the given order. Duplicates and `Overworld` are dropped;
    /// states left out can never win.
    pub fn new(order: impl IntoIterator<Item = GameState>) -> Self {
        let mut states = Vec::new();
        for state in order {
            if state != GameState::Overworld && !states.contains(&state) {
                states.push(state);
            }
        }
        Self(states)
    }

    /// First active state in priority order
    pub fn resolve(&self, flags: &ActiveFlags) -> GameState {
        self.0
            .iter()
            .copied()
            .find(|state| flags.is_active(*state))
            .unwrap_or(GameState::Overworld)
    }

    pub fn order(&self) -> &[GameState] {
        &self.0
    }
}

impl Default for StatePriority {
    fn default() -> Self {
        Self::new([
            GameState::Battle,
            GameState::Dialog,
            GameState::Menu,
            GameState::Transition,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_priority() {
        let priority = StatePriority::default();
        assert_eq!(priority.resolve(&ActiveFlags::default()), GameState::Overworld);

        let all = ActiveFlags {
            battle: true,
            dialog: true,
            menu: true,
            transition: true,
        };
        assert_eq!(priority.resolve(&all), GameState::Battle);

        let menu_and_dialog = ActiveFlags {
            dialog: true,
            menu: true,
            ..Default::default()
        };
        assert_eq!(priority.resolve(&menu_and_dialog), GameState::Dialog);

        let transition = ActiveFlags {
            transition: true,
            ..Default::default()
        };
        assert_eq!(priority.resolve(&transition), GameState::Transition);
    }

    #[test]
    fn test_custom_priority() {
        let priority = StatePriority::new([
            GameState::Menu,
            GameState::Overworld,
            GameState::Menu,
            GameState::Battle,
        ]);
        assert_eq!(priority.order(), [GameState::Menu, GameState::Battle]);

        let flags = ActiveFlags {
            battle: true,
            menu: true,
            dialog: true,
            ..Default::default()
        };
        assert_eq!(priority.resolve(&flags), GameState::Menu);

        // Dialog is not listed, so it never wins
        let dialog = ActiveFlags {
            dialog: true,
            ..Default::default()
        };
        assert_eq!(priority.resolve(&dialog), GameState::Overworld);
    }

    #[test]
    fn test_state_names() {
        assert_eq!(
            serde_json::to_string(&GameState::Transition).unwrap(),
            "\"transition\""
        );
        let parsed: Vec<GameState> = serde_json::from_str(r#"["battle", "menu"]"#).unwrap();
        assert_eq!(parsed, [GameState::Battle, GameState::Menu]);
        assert_eq!(GameState::Dialog.to_string(), "dialog");
    }
}
