//! Party section

use std::collections::BTreeMap;

use super::section::{Column, Section};
use super::snapshot::{Stats, TeamMember};
use crate::schema::Label;

/// Party slots in Gen 1 games
pub const MAX_PARTY: usize = 6;

pub(super) fn build(mut section: Section<'_>) -> Vec<TeamMember> {
    let Some(species) = section.column("species") else {
        return Vec::new();
    };
    let count = section.scalar("count");
    let nicknames = section.strings("nicknames").unwrap_or_default();
    let levels = section.column("level");
    let hp = section.column("hp");
    let max_hp = section.column("max_hp");
    let status = section.column("status");
    let type1 = section.column("type1");
    let type2 = section.column("type2");
    let move_slots = section.column("moves");
    let attack = section.column("attack");
    let defense = section.column("defense");
    let speed = section.column("speed");
    let special = section.column("special");

    // Unrecognised array fields become per-member keys
    let mut columns = BTreeMap::new();
    for key in section.array_keys() {
        if let Some(column) = section.column(key) {
            columns.insert(key.to_string(), column);
        }
    }
    let shared = section.into_extra();

    let slots = species.len().min(MAX_PARTY);
    let count = count.map_or(slots, |n| (n as usize).min(slots));
    let raw = |column: &Option<Column>, i| column.as_ref().and_then(|c| c.raw(i));
    let label = |column: &Option<Column>, i| column.as_ref().and_then(|c| c.label_or_unknown(i));

    let mut team = Vec::with_capacity(count);
    for i in 0..count {
        let level = raw(&levels, i);
        if level == Some(0) {
            continue;
        }

        let mut types: Vec<Label> = [label(&type1, i), label(&type2, i)]
            .into_iter()
            .flatten()
            .collect();
        types.dedup();

        let moves = move_slots
            .as_ref()
            .map(|m| {
                m.labelled_lanes(i)
                    .into_iter()
                    .filter(|(raw, _)| *raw != 0)
                    .map(|(_, label)| label)
                    .collect()
            })
            .unwrap_or_default();

        let stats = Stats {
            attack: raw(&attack, i),
            defense: raw(&defense, i),
            speed: raw(&speed, i),
            special: raw(&special, i),
        };
        let stats = (stats != Stats::default()).then_some(stats);

        let mut extra = shared.clone();
        for (key, column) in &columns {
            extra.insert(key.clone(), column.json(i));
        }

        team.push(TeamMember {
            slot: i + 1,
            species: species.label_or_unknown(i).unwrap_or(Label::Unknown(0)),
            nickname: nicknames.get(i).cloned(),
            level,
            hp: raw(&hp, i),
            max_hp: raw(&max_hp, i),
            status: label(&status, i),
            types,
            moves,
            stats,
            extra,
        });
    }
    team
}
