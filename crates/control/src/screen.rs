//! Parameter display on the 16-column LCD.
//!
//! The left part is the template text of the selected parameter, the right
//! part its label or number. Column 1 holds the channel indicator outside
//! the Options menu.

use params::descriptor;
use params::format::render_field;
use params::ParamKind;
use platform::TextDisplay;

use crate::state::ControlState;

/// 1-based LCD column of a 0-based template index.
fn column(index: usize) -> u8 {
    u8::try_from(index.saturating_add(1)).unwrap_or(u8::MAX)
}

/// Write the template of the selected parameter with the cursor hidden.
///
/// Numeric templates are split at the field: the text before the first `#`
/// goes to column 1 and any text after the field to its own column, so the
/// field itself is left for [`show_right`].
pub fn show_left<D: TextDisplay>(state: &mut ControlState, display: &mut D) {
    let Some(d) = descriptor(state.selection.param) else {
        return;
    };
    let template = d.template;
    match template.find('#') {
        None => display.show(template, 1, false),
        Some(hash) => {
            let tail = template
                .get(hash..)
                .and_then(|rest| rest.find(|c| !matches!(c, '#' | '_' | '.')))
                .map(|offset| hash.saturating_add(offset));
            if let Some(tail) = tail {
                display.show(template.get(tail..).unwrap_or(""), column(tail), false);
            }
            display.show(template.get(..hash).unwrap_or(""), 1, false);
        }
    }
    if !state.selection.in_options {
        display.show(state.selection.context.indicator(), 1, false);
    }
    state.cursor_visible = false;
}

/// Write the value of the selected parameter, then show the cursor at
/// `pos`.
pub fn show_right<D: TextDisplay>(state: &mut ControlState, display: &mut D, pos: u8) {
    let selection = state.selection;
    if let Some(d) = descriptor(selection.param) {
        let value = state.store.get(selection.param, selection.context);
        match d.layout.kind {
            ParamKind::Enumerated { .. } => {
                display.show(d.label(value).unwrap_or(""), d.layout.start, false);
            }
            ParamKind::Numeric {
                width, frac_digits, ..
            } => {
                let text = render_field(value, width, frac_digits);
                display.show(&text, d.layout.start, false);
            }
        }
    }
    place_cursor(state, display, pos, true);
}

/// Both halves, cursor at `pos`.
pub fn redisplay<D: TextDisplay>(state: &mut ControlState, display: &mut D, pos: u8) {
    show_left(state, display);
    show_right(state, display, pos);
}

/// Move the cursor without writing anything.
pub fn place_cursor<D: TextDisplay>(
    state: &mut ControlState,
    display: &mut D,
    pos: u8,
    visible: bool,
) {
    display.show("", pos, visible);
    state.cursor = pos;
    state.cursor_visible = visible;
}

/// Right-aligned number in a `width`-column field at `column`. The cursor
/// keeps its position and visibility.
pub fn show_number<D: TextDisplay>(
    state: &ControlState,
    display: &mut D,
    value: i32,
    column: u8,
    width: u8,
    frac_digits: u8,
) {
    display.show(&render_field(value, width, frac_digits), column, false);
    display.show("", state.cursor, state.cursor_visible);
}

/// Literal text from column 1 with the cursor hidden; the text is padded
/// to the full line.
pub fn show_message<D: TextDisplay>(state: &mut ControlState, display: &mut D, text: &str) {
    let mut line: heapless::String<{ platform::LCD_COLUMNS as usize }> = heapless::String::new();
    for ch in text.chars().chain(core::iter::repeat(' ')) {
        if line.push(ch).is_err() {
            break;
        }
    }
    display.show(&line, 1, false);
    place_cursor(state, display, 1, false);
}
