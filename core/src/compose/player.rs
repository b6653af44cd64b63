//! Player section

use super::section::Section;
use super::snapshot::{BagItem, PlayerInfo, Pokedex, Position};
use crate::schema::Label;

pub(super) fn build(mut section: Section<'_>) -> PlayerInfo {
    let x = section.scalar("x");
    let y = section.scalar("y");
    let facing = section.label("facing").unwrap_or(Label::Unknown(0));
    let position = match (x, y) {
        (Some(x), Some(y)) => Some(Position(x, y, facing)),
        _ => None,
    };

    let owned = section.count_set("pokedex.owned");
    let seen = section.count_set("pokedex.seen");
    let pokedex = (owned.is_some() || seen.is_some()).then(|| Pokedex {
        owned: owned.unwrap_or(0),
        seen: seen.unwrap_or(0),
    });

    let bag_count = section.scalar("bag_count");
    let items = section.column("bag.item");
    let quantities = section.column("bag.quantity");
    let mut bag = Vec::new();
    if let Some(items) = &items {
        let count = bag_count.map_or(items.len(), |n| (n as usize).min(items.len()));
        for i in 0..count {
            let raw = items.raw(i).unwrap_or(0);
            bag.push(BagItem {
                item: items.label(i).unwrap_or(Label::Unknown(raw)),
                quantity: quantities.as_ref().and_then(|q| q.raw(i)).unwrap_or(0),
            });
        }
    }

    PlayerInfo {
        position,
        money: section.scalar("money"),
        badges: section.labels("badges").unwrap_or_default(),
        pokedex,
        bag,
        party_size: section.scalar("party_size"),
        name: section.string("name"),
        extra: section.into_extra(),
    }
}
