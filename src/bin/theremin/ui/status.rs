//! Readout bar: frequency, volume, note, reverb and the toggles

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::View;

fn toggle(label: &str, on: bool) -> Span<'static> {
    let style = if on {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    Span::styled(format!("{label}  "), style)
}

pub fn render_status(frame: &mut Frame, area: Rect, view: &View) {
    let title = match view.sample_rate {
        Some(rate) => format!(" theremin  {:.1}kHz ", rate / 1000.0),
        None => " theremin  (no audio) ".to_string(),
    };
    let block = Block::default().title(title).borders(Borders::ALL);

    let readout = &view.readout;
    let mut spans = vec![
        Span::styled(
            format!(" {:>8}  ", readout.frequency),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(
            format!("vol {:>4}  ", readout.gain),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!("{:<10}", readout.note),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("reverb {:>4} (send {:.0}%)  ", readout.reverb, view.wet_ratio * 100.0),
            Style::default().fg(Color::Magenta),
        ),
        toggle("quantize", view.quantize),
        toggle("reverb", view.reverb),
        Span::styled(
            format!("{}  ", view.waveform),
            Style::default().fg(Color::Blue),
        ),
    ];
    if view.recording {
        spans.push(Span::styled(
            "● REC",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
    }

    let paragraph = Paragraph::new(Line::from(spans)).block(block);
    frame.render_widget(paragraph, area);
}
