//! The gesture pad: semitone grid with note labels, plus the pointer

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::View;

#[derive(Clone, Copy, PartialEq)]
enum Cell {
    Empty,
    Natural,
    Sharp,
    Pointer,
}

/// Render the pad and return its inner area.
pub fn render_pad(frame: &mut Frame, area: Rect, view: &View) -> Rect {
    let block = Block::default()
        .title(" Pad  ← pitch →   ↑ loud / quiet ↓ ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if view.pointer.is_some() {
            Color::Cyan
        } else {
            Color::DarkGray
        }));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.width == 0 || inner.height < 2 {
        return inner;
    }

    let width = inner.width as usize;
    let column = |x01: f64| ((x01 * (width - 1) as f64).round() as usize).min(width - 1);

    // Label row: octave names at every C.
    let mut labels = vec![' '; width];
    for marker in view.markers.iter().filter(|m| m.label.starts_with('C') && m.natural) {
        let start = column(marker.x01);
        for (offset, ch) in marker.label.chars().enumerate() {
            if let Some(slot) = labels.get_mut(start + offset) {
                *slot = ch;
            }
        }
    }

    let mut grid = vec![Cell::Empty; width];
    for marker in &view.markers {
        grid[column(marker.x01)] = if marker.natural {
            Cell::Natural
        } else {
            Cell::Sharp
        };
    }

    let rows = inner.height as usize - 1;
    let pointer = view.pointer.map(|(x, y)| {
        let row = ((y * (rows.max(2) - 1) as f64).round() as usize).min(rows - 1);
        (column(x), row)
    });

    let mut lines = Vec::with_capacity(inner.height as usize);
    lines.push(Line::styled(
        labels.into_iter().collect::<String>(),
        Style::default().fg(Color::Yellow),
    ));
    for row in 0..rows {
        let spans: Vec<Span> = grid
            .iter()
            .enumerate()
            .map(|(col, &cell)| {
                let cell = if pointer == Some((col, row)) {
                    Cell::Pointer
                } else {
                    cell
                };
                match cell {
                    Cell::Pointer => Span::styled("●", Style::default().fg(Color::Cyan)),
                    Cell::Natural => Span::styled("│", Style::default().fg(Color::Gray)),
                    Cell::Sharp => Span::styled("┆", Style::default().fg(Color::DarkGray)),
                    Cell::Empty => Span::raw(" "),
                }
            })
            .collect();
        lines.push(Line::from(spans));
    }

    frame.render_widget(Paragraph::new(lines), inner);

    // Mouse rows below the label row map to y 0..1.
    Rect {
        y: inner.y + 1,
        height: inner.height - 1,
        ..inner
    }
}
