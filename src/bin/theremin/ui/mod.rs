//! TUI widgets for the theremin
//!
//! Everything here is drawn from a [`View`] snapshot; no widget talks to
//! the engine directly.

mod clips;
mod pad;
mod scope;
mod status;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::Paragraph,
    Frame,
};

use theremin_dsp::{
    control::{Readout, ScaleMarker},
    synth::WaveformId,
};

use clips::render_clips;
use pad::render_pad;
use scope::render_scope;
use status::render_status;

/// One line of the clip list.
pub struct ClipRow {
    pub filename: String,
    pub created_at: String,
    pub bytes: usize,
    pub mime_type: String,
}

/// Everything the widgets need for one frame.
pub struct View {
    pub readout: Readout,
    pub quantize: bool,
    pub reverb: bool,
    pub wet_ratio: f64,
    pub waveform: WaveformId,
    pub recording: bool,
    pub sample_rate: Option<f32>,
    pub markers: Vec<ScaleMarker>,
    /// Last pointer position on the pad, normalized.
    pub pointer: Option<(f64, f64)>,
    pub scope: Vec<f32>,
    pub clips: Vec<ClipRow>,
    pub notice: Option<String>,
}

/// Draw the whole screen. Returns the pad's inner area for mouse mapping.
pub fn draw(frame: &mut Frame, view: &View) -> Rect {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Readouts + toggles
            Constraint::Min(8),    // Gesture pad
            Constraint::Length(7), // Scope
            Constraint::Length(6), // Clips
            Constraint::Length(1), // Help bar
        ])
        .split(frame.area());

    render_status(frame, chunks[0], view);
    let pad = render_pad(frame, chunks[1], view);
    render_scope(frame, chunks[2], &view.scope);
    render_clips(frame, chunks[3], &view.clips);

    let help = match &view.notice {
        Some(notice) => format!(" {notice}"),
        None => " [drag] play  [Q] quantize  [R] reverb  [+/-] wet  [W] waveform  [Space] record  [E] export  [Esc] quit".to_string(),
    };
    let help = Paragraph::new(help).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, chunks[4]);

    pad
}
