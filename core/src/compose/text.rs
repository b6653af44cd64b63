//! Text section: screen text, dialog box and menu cursor

use std::ops::Range;

use super::section::Section;
use super::snapshot::{MenuState, TextContext, TextInfo};
use crate::decode::RawValue;

/// Menu cursor glyph
pub const CURSOR: char = '▶';
/// "More text" prompt glyph
pub const PROMPT: &str = "▼";
/// Screen rows covered by the dialog box
pub const DIALOG_ROWS: Range<usize> = 12..18;

/// What the text section contributes to state derivation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(super) struct TextSignals {
    pub menu: bool,
    pub dialog: bool,
}

/// Build the text section.
///
/// `menu_flag` and `dialog_flag` are the raw state flags; the on-screen text
/// refines them.
pub(super) fn build(
    mut section: Section<'_>,
    menu_flag: Option<bool>,
    dialog_flag: Option<bool>,
) -> (TextInfo, TextSignals) {
    let translator = section.translator();
    let rows: Option<Vec<String>> = section.take("screen").and_then(|entry| {
        let table = entry.spec.value_table.as_deref()?;
        match entry.field.raw {
            RawValue::Grid(grid) => Some(
                grid.iter()
                    .map(|row| translator.screen_row(row, table))
                    .collect(),
            ),
            _ => None,
        }
    });

    let mut menu = MenuState {
        current_item: section.scalar("menu_item"),
        max_item: section.scalar("menu_max"),
        cursor: None,
        selection: None,
    };

    let (lines, dialog) = match &rows {
        Some(rows) => {
            if menu_flag != Some(false) {
                find_cursor(rows, &mut menu);
            }
            (
                rows.iter().filter(|r| !r.trim().is_empty()).cloned().collect(),
                dialog_lines(rows),
            )
        }
        None => (Vec::new(), Vec::new()),
    };

    let signals = TextSignals {
        // Without a text grid the flag alone decides
        menu: match rows {
            Some(_) => menu.cursor.is_some(),
            None => menu_flag.unwrap_or(false),
        },
        dialog: dialog_flag.unwrap_or(false) || !dialog.is_empty(),
    };
    let context = if signals.menu {
        TextContext::Menu
    } else if signals.dialog {
        TextContext::Dialog
    } else {
        TextContext::None
    };

    let info = TextInfo {
        lines,
        dialog,
        menu,
        context,
        extra: section.into_extra(),
    };
    (info, signals)
}

fn find_cursor(rows: &[String], menu: &mut MenuState) {
    for (y, row) in rows.iter().enumerate() {
        let Some(x) = row.chars().position(|c| c == CURSOR) else {
            continue;
        };
        menu.cursor = Some([x, y]);
        menu.selection = row
            .chars()
            .skip(x + 1)
            .collect::<String>()
            .split_whitespace()
            .next()
            .map(str::to_string);
        return;
    }
}

fn dialog_lines(rows: &[String]) -> Vec<String> {
    let end = DIALOG_ROWS.end.min(rows.len());
    rows.get(DIALOG_ROWS.start..end)
        .unwrap_or_default()
        .iter()
        .map(|row| row.trim())
        .filter(|row| !row.is_empty() && !row.contains(CURSOR) && *row != PROMPT)
        .map(str::to_string)
        .collect()
}
