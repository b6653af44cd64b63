//! Map section

use super::section::Section;
use super::snapshot::{MapInfo, Warp};

pub(super) fn build(mut section: Section<'_>) -> MapInfo {
    let name = section.label("id");
    let tileset = section.label("tileset");
    let dimensions = match (section.scalar("width"), section.scalar("height")) {
        (Some(width), Some(height)) => Some([width, height]),
        _ => None,
    };

    let warp_count = section.scalar("warp_count");
    let xs = section.column("warps.x");
    let ys = section.column("warps.y");
    let destinations = section.column("warps.destination");

    let mut warps = Vec::new();
    if let (Some(xs), Some(ys)) = (&xs, &ys) {
        let available = xs.len().min(ys.len());
        let count = warp_count.map_or(available, |n| (n as usize).min(available));
        for i in 0..count {
            let (Some(x), Some(y)) = (xs.raw(i), ys.raw(i)) else {
                continue;
            };
            warps.push(Warp {
                x,
                y,
                destination: destinations.as_ref().and_then(|d| d.label(i)),
            });
        }
    }

    MapInfo {
        name,
        tileset,
        dimensions,
        warps,
        extra: section.into_extra(),
    }
}
