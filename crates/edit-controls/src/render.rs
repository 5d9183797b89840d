//! Drawing controls into a ratatui buffer.

use crate::control::TextControl;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Paragraph, Widget};

/// Columns a tab advances to.
pub const TAB_WIDTH: u16 = 4;

/// Widget view of a [`TextControl`].
///
/// Password controls draw their mask glyph in place of every character.
/// When focused the selection and the caret cell are drawn reversed.
pub struct TextView<'a> {
    control: &'a TextControl,
    focused: bool,
    block: Option<Block<'a>>,
}

impl<'a> TextView<'a> {
    pub fn new(control: &'a TextControl) -> Self {
        Self {
            control,
            focused: false,
            block: None,
        }
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }
}

/// A character placed on the view grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Glyph {
    index: usize,
    row: u16,
    col: u16,
    ch: char,
}

/// Place every displayed character, returning the glyphs and the caret cell.
fn layout(text: &str, caret: usize) -> (Vec<Glyph>, (u16, u16)) {
    let mut glyphs = Vec::with_capacity(text.len());
    let (mut row, mut col) = (0u16, 0u16);
    let mut caret_cell = None;

    for (index, ch) in text.chars().enumerate() {
        if index == caret {
            caret_cell = Some((row, col));
        }
        match ch {
            '\n' => {
                row = row.saturating_add(1);
                col = 0;
            }
            '\t' => {
                let next = (col / TAB_WIDTH + 1) * TAB_WIDTH;
                for c in col..next {
                    glyphs.push(Glyph { index, row, col: c, ch: ' ' });
                }
                col = next;
            }
            _ => {
                glyphs.push(Glyph { index, row, col, ch });
                col = col.saturating_add(1);
            }
        }
    }

    (glyphs, caret_cell.unwrap_or((row, col)))
}

impl Widget for TextView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = match self.block {
            Some(block) => {
                let block = if self.focused {
                    block.border_style(Style::default().fg(Color::Cyan))
                } else {
                    block
                };
                let inner = block.inner(area);
                block.render(area, buf);
                inner
            }
            None => area,
        };
        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let control = self.control;
        let base = if control.is_enabled() {
            Style::default().fg(Color::White)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let selected = Style::default().add_modifier(Modifier::REVERSED);
        let sel_start = control.selection_start();
        let sel_end = sel_start + control.selection_length();

        let (glyphs, (caret_row, caret_col)) = layout(&control.display_text(), control.caret_index());

        // Scroll just enough to keep the caret in view.
        let row_offset = caret_row.saturating_sub(inner.height - 1);
        let col_offset = caret_col.saturating_sub(inner.width - 1);

        for glyph in glyphs {
            if glyph.row < row_offset || glyph.col < col_offset {
                continue;
            }
            let (dx, dy) = (glyph.col - col_offset, glyph.row - row_offset);
            if dx >= inner.width || dy >= inner.height {
                continue;
            }
            let style = if self.focused && (sel_start..sel_end).contains(&glyph.index) {
                base.patch(selected)
            } else {
                base
            };
            if let Some(cell) = buf.cell_mut((inner.x + dx, inner.y + dy)) {
                cell.set_char(glyph.ch).set_style(style);
            }
        }

        if self.focused && control.selection_length() == 0 {
            let (dx, dy) = (caret_col - col_offset, caret_row - row_offset);
            if let Some(cell) = buf.cell_mut((inner.x + dx, inner.y + dy)) {
                cell.set_style(base.patch(selected));
            }
        }
    }
}

/// A push button that can hold focus.
pub struct ButtonView<'a> {
    label: &'a str,
    focused: bool,
}

impl<'a> ButtonView<'a> {
    pub fn new(label: &'a str) -> Self {
        Self { label, focused: false }
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }
}

impl Widget for ButtonView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let style = if self.focused {
            Style::default().fg(Color::Black).bg(Color::Cyan)
        } else {
            Style::default()
        };
        Paragraph::new(Line::from(self.label))
            .alignment(Alignment::Center)
            .style(style)
            .render(area, buf);
    }
}
