//! Battle section

use super::section::{Flag, Section};
use super::snapshot::{BattleInfo, Combatant};
use crate::decode::Translated;
use crate::schema::Label;

/// Battle-flag value of a trainer battle (1 is a wild encounter)
pub const TRAINER_BATTLE: u32 = 2;

pub(super) fn build(mut section: Section<'_>, flag: &Flag) -> BattleInfo {
    let opponent = combatant(&mut section, "enemy");
    let active = combatant(&mut section, "player");

    BattleInfo {
        kind: flag.label.clone().unwrap_or(Label::Unknown(flag.raw)),
        trainer: flag.raw == TRAINER_BATTLE,
        opponent,
        active,
        active_move: section.label("move"),
        turn: section.scalar("turn"),
        extra: section.into_extra(),
    }
}

/// Combatant under `<side>.*`; absent when its species slot is empty.
fn combatant(section: &mut Section<'_>, side: &str) -> Option<Combatant> {
    let key = |name: &str| format!("{side}.{name}");

    let species = section.take(&key("species"))?;
    let species_raw = species.field.raw.as_scalar()?;
    let nickname = section.string(&key("nickname"));
    let level = section.scalar(&key("level"));
    let hp = section.scalar(&key("hp"));
    let max_hp = section.scalar(&key("max_hp"));
    let status = section.label(&key("status"));
    let mut types: Vec<Label> = [section.label(&key("type1")), section.label(&key("type2"))]
        .into_iter()
        .flatten()
        .collect();
    types.dedup();

    if species_raw == 0 {
        return None;
    }
    let species = match species.field.translated {
        Some(Translated::Label(label)) => label,
        _ => Label::Unknown(species_raw),
    };

    Some(Combatant {
        species,
        nickname,
        level,
        hp,
        max_hp,
        hp_percent: hp_percent(hp, max_hp),
        status,
        types,
    })
}

/// `hp * 100 / max_hp`, rounded; 0 when `max_hp` is 0
pub fn hp_percent(hp: Option<u32>, max_hp: Option<u32>) -> Option<u32> {
    let (hp, max_hp) = (u64::from(hp?), u64::from(max_hp?));
    if max_hp == 0 {
        return Some(0);
    }
    Some(((hp * 100 + max_hp / 2) / max_hp) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hp_percent() {
        assert_eq!(hp_percent(Some(20), Some(40)), Some(50));
        assert_eq!(hp_percent(Some(1), Some(3)), Some(33));
        assert_eq!(hp_percent(Some(2), Some(3)), Some(67));
        assert_eq!(hp_percent(Some(5), Some(0)), Some(0));
        assert_eq!(hp_percent(None, Some(10)), None);
    }
}
