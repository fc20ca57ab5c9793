//! Recorded takes

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::ClipRow;

pub fn render_clips(frame: &mut Frame, area: Rect, clips: &[ClipRow]) {
    let block = Block::default()
        .title(format!(" Clips ({}) ", clips.len()))
        .borders(Borders::ALL);
    let rows = block.inner(area).height as usize;

    // Newest last; show the tail that fits.
    let lines: Vec<Line> = if clips.is_empty() {
        vec![Line::styled(
            " press [Space] to record a take",
            Style::default().fg(Color::DarkGray),
        )]
    } else {
        clips
            .iter()
            .skip(clips.len().saturating_sub(rows))
            .map(|clip| {
                Line::from(format!(
                    " {}  {}  {:.1} KB  {}",
                    clip.created_at,
                    clip.filename,
                    clip.bytes as f64 / 1024.0,
                    clip.mime_type
                ))
            })
            .collect()
    };

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
