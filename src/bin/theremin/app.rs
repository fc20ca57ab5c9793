//! Event loop: terminal input → engine, engine state → widgets

use std::{io::stdout, path::PathBuf, time::Duration};

use color_eyre::eyre::{Result as EyreResult, WrapErr};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
};
use log::{info, warn};
use ratatui::{layout::Rect, DefaultTerminal};

use theremin_dsp::{
    engine::AudioSession,
    graph::NativeGraph,
    io::{OutputDevice, OutputStream},
    AudioError, EngineConfig, ThereminEngine,
};

use crate::ui::{self, ClipRow, View};

/// Samples kept for the oscilloscope.
const SCOPE_LEN: usize = 1024;
/// Step of the `+`/`-` keys on the reverb send.
const WET_STEP: f64 = 0.05;

pub struct App {
    engine: ThereminEngine,
    output: Option<OutputStream>,
    scope: Vec<f32>,
    incoming: Vec<f32>,
    pad: Rect,
    pointer: Option<(f64, f64)>,
    clips_dir: PathBuf,
    notice: Option<String>,
    should_quit: bool,
}

impl App {
    pub fn new(config: EngineConfig, clips_dir: PathBuf) -> EyreResult<Self> {
        let (session, output) = match OutputDevice::default_output() {
            Ok(device) => {
                let (graph, renderer) = NativeGraph::new(device.sample_rate());
                let stream = device
                    .play(renderer, SCOPE_LEN * 8)
                    .wrap_err("failed to start audio output")?;
                (AudioSession::open(Box::new(graph)), Some(stream))
            }
            Err(err) => {
                warn!("no audio output: {err}");
                (AudioSession::detached(), None)
            }
        };

        let engine = ThereminEngine::new(config, session).wrap_err("invalid configuration")?;
        let notice = output
            .is_none()
            .then(|| AudioError::UnsupportedAudioBackend.to_string());

        Ok(Self {
            engine,
            output,
            scope: vec![0.0; SCOPE_LEN],
            incoming: Vec::with_capacity(SCOPE_LEN * 8),
            pad: Rect::default(),
            pointer: None,
            clips_dir,
            notice,
            should_quit: false,
        })
    }

    pub fn run(mut self) -> EyreResult<()> {
        let mut terminal = ratatui::init();
        let mouse = execute!(stdout(), EnableMouseCapture);
        let result = match mouse {
            Ok(()) => self.event_loop(&mut terminal),
            Err(err) => Err(err).wrap_err("failed to enable mouse capture"),
        };
        let _ = execute!(stdout(), DisableMouseCapture);
        ratatui::restore();

        self.engine.close();
        info!("theremin closed with {} clip(s)", self.engine.clips().len());
        result
    }

    fn event_loop(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            self.engine.tick();
            self.poll_scope();

            terminal.draw(|frame| {
                let view = self.view();
                self.pad = ui::draw(frame, &view);
            })?;

            // ~60fps, sooner if a deferred step is due
            let wait = self
                .engine
                .next_task_in()
                .map_or(Duration::from_millis(16), |due| {
                    due.min(Duration::from_millis(16))
                });
            if event::poll(wait)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key),
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    Event::FocusLost => self.release_pointer(),
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn poll_scope(&mut self) {
        let Some(output) = self.output.as_mut() else {
            return;
        };
        self.incoming.clear();
        output.drain_scope(&mut self.incoming);
        if self.incoming.is_empty() {
            return;
        }
        self.scope.extend_from_slice(&self.incoming);
        if self.scope.len() > SCOPE_LEN {
            let excess = self.scope.len() - SCOPE_LEN;
            self.scope.drain(0..excess);
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        self.engine.note_user_gesture();
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true
            }
            KeyCode::Char('q') => {
                let on = self.engine.toggle_quantize();
                self.notice = Some(format!("quantize {}", if on { "on" } else { "off" }));
            }
            KeyCode::Char('r') => {
                let on = self.engine.toggle_reverb();
                self.notice = Some(format!("reverb {}", if on { "on" } else { "off" }));
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                self.engine.set_wet_ratio(self.engine.wet_ratio() + WET_STEP)
            }
            KeyCode::Char('-') => self.engine.set_wet_ratio(self.engine.wet_ratio() - WET_STEP),
            KeyCode::Char('w') => {
                let waveform = self.engine.cycle_waveform();
                self.notice = Some(format!("waveform {waveform}"));
            }
            KeyCode::Char(' ') => self.toggle_recording(),
            KeyCode::Char('e') => self.export_latest(),
            _ => {}
        }
    }

    fn toggle_recording(&mut self) {
        self.notice = match self.engine.toggle_recording() {
            Ok(true) => Some("recording…".to_string()),
            Ok(false) => self.engine.clips().last().map(|clip| {
                format!("saved take ({} bytes, {})", clip.byte_size(), clip.mime_type())
            }),
            Err(err) => Some(err.to_string()),
        };
    }

    fn export_latest(&mut self) {
        let Some(index) = self.engine.clips().len().checked_sub(1) else {
            self.notice = Some("no clips to export".to_string());
            return;
        };
        self.notice = Some(match self.engine.export_clip(index, &self.clips_dir) {
            Ok(path) => format!("wrote {}", path.display()),
            Err(err) => format!("export failed: {err}"),
        });
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let position = pad_position(self.pad, mouse.column, mouse.row);
        match (mouse.kind, position) {
            (MouseEventKind::Down(MouseButton::Left), Some((x, y))) => {
                self.pointer = Some((x, y));
                if let Err(err) = self.engine.down(x, y) {
                    self.notice = Some(err.to_string());
                }
            }
            (MouseEventKind::Drag(MouseButton::Left), Some((x, y))) => {
                self.pointer = Some((x, y));
                self.engine.move_to(x, y);
            }
            // Dragging off the pad counts as letting go.
            (MouseEventKind::Drag(MouseButton::Left), None) => {
                self.pointer = None;
                self.engine.cancel();
            }
            (MouseEventKind::Up(MouseButton::Left), _) => self.release_pointer(),
            _ => {}
        }
    }

    fn release_pointer(&mut self) {
        self.pointer = None;
        self.engine.up();
    }

    fn view(&self) -> View {
        let clips = self
            .engine
            .clips()
            .iter()
            .enumerate()
            .map(|(index, clip)| ClipRow {
                filename: self.engine.suggested_filename(index).unwrap_or_default(),
                created_at: clip.created_at().format("%H:%M:%S").to_string(),
                bytes: clip.byte_size(),
                mime_type: clip.mime_type().to_string(),
            })
            .collect();

        View {
            readout: self.engine.readout(),
            quantize: self.engine.quantize(),
            reverb: self.engine.reverb_enabled(),
            wet_ratio: self.engine.wet_ratio(),
            waveform: self.engine.waveform(),
            recording: self.engine.is_recording(),
            sample_rate: self.output.as_ref().map(OutputStream::sample_rate),
            markers: self.engine.scale_markers(),
            pointer: self.pointer,
            scope: self.scope.clone(),
            clips,
            notice: self.notice.clone(),
        }
    }
}

/// Normalized pad coordinates of a terminal cell, if it lies on the pad.
fn pad_position(pad: Rect, column: u16, row: u16) -> Option<(f64, f64)> {
    if pad.width == 0
        || pad.height == 0
        || column < pad.x
        || row < pad.y
        || column >= pad.x + pad.width
        || row >= pad.y + pad.height
    {
        return None;
    }
    let x = (column - pad.x) as f64 / (pad.width.max(2) - 1) as f64;
    let y = (row - pad.y) as f64 / (pad.height.max(2) - 1) as f64;
    Some((x.clamp(0.0, 1.0), y.clamp(0.0, 1.0)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad_corners_are_normalized() {
        let pad = Rect::new(10, 5, 21, 11);
        assert_eq!(pad_position(pad, 10, 5), Some((0.0, 0.0)));
        assert_eq!(pad_position(pad, 30, 15), Some((1.0, 1.0)));
        assert_eq!(pad_position(pad, 20, 10), Some((0.5, 0.5)));
        assert_eq!(pad_position(pad, 9, 5), None);
        assert_eq!(pad_position(pad, 31, 5), None);
    }
}
