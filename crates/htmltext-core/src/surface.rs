//! Display surfaces.
//!
//! A [`DisplaySurface`] shows one [`StyledText`] and maps surface
//! coordinates back to text offsets. Link hit-testing always goes through
//! that mapping, never through span ranges directly.

use htmltext_types::input::PointerSequence;

use crate::pointer::{LinkHit, LinkMovement};
use crate::styled::StyledText;

/// A text-rendering surface the widget draws into.
pub trait DisplaySurface {
    /// Replace the displayed text.
    fn set_text(&mut self, text: StyledText);

    fn text(&self) -> &StyledText;

    /// Byte offset of the character drawn at surface point `(x, y)`.
    fn offset_at(&self, x: i32, y: i32) -> Option<usize>;

    /// Install the link movement method. Returns `true` when it was not
    /// installed before.
    fn install_movement(&mut self) -> bool;

    fn has_movement(&self) -> bool;

    /// Route one gesture through the surface. Returns the surface's own
    /// consumed status.
    fn dispatch_pointer(&mut self, sequence: &PointerSequence, hit: &mut LinkHit) -> bool;
}

// ---------------------------------------------------------------------------
// GridSurface
// ---------------------------------------------------------------------------

/// Headless surface with a fixed-cell monospace layout.
///
/// Every char takes one cell. Lines break on `'\n'` and wrap at
/// `columns`. Cell `(0, 0)` starts at surface origin.
#[derive(Debug, Clone)]
pub struct GridSurface {
    columns: usize,
    cell_width: u32,
    cell_height: u32,
    text: StyledText,
    /// Byte offset of each cell, row by row.
    rows: Vec<Vec<usize>>,
    movement: Option<LinkMovement>,
    consumes_touches: bool,
}

impl GridSurface {
    pub fn new(columns: usize, cell_width: u32, cell_height: u32) -> Self {
        Self {
            columns: columns.max(1),
            cell_width: cell_width.max(1),
            cell_height: cell_height.max(1),
            text: StyledText::default(),
            rows: Vec::new(),
            movement: None,
            consumes_touches: true,
        }
    }

    /// Whether the surface reports every gesture as consumed, the way an
    /// interactive text view does once a movement method is set.
    pub fn set_consumes_touches(&mut self, consumes: bool) {
        self.consumes_touches = consumes;
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Surface point at the centre of the cell holding `offset`.
    pub fn point_for(&self, offset: usize) -> Option<(i32, i32)> {
        self.rows.iter().enumerate().find_map(|(row, cells)| {
            let col = cells.iter().position(|&o| o == offset)?;
            let x = col as u32 * self.cell_width + self.cell_width / 2;
            let y = row as u32 * self.cell_height + self.cell_height / 2;
            Some((x as i32, y as i32))
        })
    }

    /// The laid-out text, one line per row.
    pub fn render(&self) -> String {
        let text = self.text.text();
        let mut out = String::with_capacity(text.len() + self.rows.len());
        for (i, cells) in self.rows.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            for &offset in cells {
                if let Some(c) = text[offset..].chars().next() {
                    out.push(c);
                }
            }
        }
        out
    }

    fn layout(&mut self) {
        self.rows.clear();
        if self.text.is_empty() {
            return;
        }
        let mut row = Vec::new();
        for (offset, c) in self.text.text().char_indices() {
            if c == '\n' {
                self.rows.push(std::mem::take(&mut row));
                continue;
            }
            if row.len() == self.columns {
                self.rows.push(std::mem::take(&mut row));
            }
            row.push(offset);
        }
        self.rows.push(row);
    }
}

impl DisplaySurface for GridSurface {
    fn set_text(&mut self, text: StyledText) {
        self.text = text;
        self.layout();
        // A press armed on the old text must not activate the new one.
        if let Some(movement) = self.movement.as_mut() {
            movement.reset();
        }
    }

    fn text(&self) -> &StyledText {
        &self.text
    }

    fn offset_at(&self, x: i32, y: i32) -> Option<usize> {
        offset_in(&self.rows, self.cell_width, self.cell_height, x, y)
    }

    fn install_movement(&mut self) -> bool {
        if self.movement.is_some() {
            return false;
        }
        self.movement = Some(LinkMovement::new());
        true
    }

    fn has_movement(&self) -> bool {
        self.movement.is_some()
    }

    fn dispatch_pointer(&mut self, sequence: &PointerSequence, hit: &mut LinkHit) -> bool {
        let mut consumed = false;
        if let Some(movement) = self.movement.as_mut() {
            for event in sequence.iter() {
                let offset = event
                    .position()
                    .and_then(|(x, y)| offset_in(&self.rows, self.cell_width, self.cell_height, x, y));
                consumed |= movement.on_event(event, &self.text, offset, hit);
            }
        }
        self.consumes_touches || consumed
    }
}

// Free function so dispatch can borrow the layout while the movement is
// borrowed mutably.
fn offset_in(rows: &[Vec<usize>], cell_width: u32, cell_height: u32, x: i32, y: i32) -> Option<usize> {
    if x < 0 || y < 0 {
        return None;
    }
    let row = (y as u32 / cell_height) as usize;
    let col = (x as u32 / cell_width) as usize;
    rows.get(row)?.get(col).copied()
}
