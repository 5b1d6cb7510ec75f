//! Terminal user interface for recording and reviewing a voice clip.
//!
//! Draws the waveform surface above a one-line footer showing the phase,
//! timing, errors and key hints, and turns key and mouse input into commands.

use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind,
        KeyModifiers, MouseButton, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
};
use std::error::Error;
use std::io::{stdout, Stdout};
use std::time::Duration;

use super::session::{Phase, SessionSnapshot};
use crate::config::VisualizerConfig;
use crate::waveform::{WaveformHost, WaveformWidget};

/// How long input polling may block; also the refresh interval.
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

const FOOTER_HEIGHT: u16 = 1;

/// User input translated for the record loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UserCommand {
    /// No input this frame
    Continue,
    /// Start a new recording ('r')
    Start,
    /// Pause/resume recording or playback (Space)
    TogglePause,
    /// Stop recording ('s')
    Stop,
    /// Save the recorded data ('w')
    Save,
    /// Clear the canvas ('c')
    Clear,
    /// Exit (Escape or 'q')
    Quit,
    /// Pointer over the waveform at this surface x
    Hover(f64),
    /// Pointer left the waveform
    HoverEnd,
    /// Click on the waveform at this surface x
    Seek(f64),
}

/// Terminal UI for the recorder.
pub struct VoicewaveTui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    waveform_area: Rect,
}

impl VoicewaveTui {
    /// Creates a new TUI instance and enters alternate screen mode.
    ///
    /// # Errors
    /// - If terminal cannot be initialized
    /// - If raw mode cannot be enabled
    /// - If alternate screen or mouse capture cannot be entered
    pub fn new() -> Result<Self, Box<dyn Error>> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        execute!(
            stdout,
            crossterm::terminal::EnterAlternateScreen,
            EnableMouseCapture
        )?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        let size = terminal.size()?;

        Ok(VoicewaveTui {
            terminal,
            waveform_area: waveform_area(Rect::new(0, 0, size.width, size.height)),
        })
    }

    /// Area the waveform occupies for the current terminal size.
    ///
    /// # Errors
    /// - If the terminal size cannot be queried
    pub fn waveform_area(&mut self) -> Result<Rect, Box<dyn Error>> {
        let size = self.terminal.size()?;
        self.waveform_area = waveform_area(Rect::new(0, 0, size.width, size.height));
        Ok(self.waveform_area)
    }

    /// Draws the waveform surface and the footer.
    ///
    /// # Errors
    /// - If terminal rendering fails
    pub fn render(
        &mut self,
        host: &WaveformHost,
        snapshot: &SessionSnapshot,
        status: Option<&str>,
    ) -> Result<(), Box<dyn Error>> {
        let footer = footer_line(snapshot, host.hover_time(), host.config(), status);

        self.terminal.draw(|frame| {
            let area = frame.area();
            let waveform = waveform_area(area);

            let footer_area = Rect {
                x: area.x,
                y: area.y + area.height.saturating_sub(FOOTER_HEIGHT),
                width: area.width,
                height: FOOTER_HEIGHT.min(area.height),
            };

            frame.render_widget(WaveformWidget::new(host.surface()), waveform);

            let footer = Paragraph::new(footer).style(
                Style::default()
                    .fg(Color::Rgb(185, 207, 212))
                    .bg(Color::Rgb(0, 0, 0)),
            );
            frame.render_widget(footer, footer_area);
        })?;

        Ok(())
    }

    /// Waits up to one frame for input and translates it.
    ///
    /// # Errors
    /// - If event polling fails
    pub fn handle_input(&mut self) -> Result<UserCommand, Box<dyn Error>> {
        if !event::poll(FRAME_INTERVAL)? {
            return Ok(UserCommand::Continue);
        }

        let command = match event::read()? {
            Event::Key(key) if key.kind != KeyEventKind::Release => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => {
                    tracing::debug!("Escape or 'q' pressed: quitting");
                    UserCommand::Quit
                }
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    tracing::debug!("Ctrl+C pressed: quitting");
                    UserCommand::Quit
                }
                KeyCode::Char('r') => UserCommand::Start,
                KeyCode::Char(' ') => UserCommand::TogglePause,
                KeyCode::Char('s') => UserCommand::Stop,
                KeyCode::Char('w') => UserCommand::Save,
                KeyCode::Char('c') => UserCommand::Clear,
                _ => UserCommand::Continue,
            },
            Event::Mouse(mouse) => {
                let inside = self.waveform_area.contains(Position::new(mouse.column, mouse.row));
                let x = f64::from(mouse.column.saturating_sub(self.waveform_area.x)) + 0.5;
                match mouse.kind {
                    MouseEventKind::Moved | MouseEventKind::Drag(_) if inside => {
                        UserCommand::Hover(x)
                    }
                    MouseEventKind::Moved => UserCommand::HoverEnd,
                    MouseEventKind::Down(MouseButton::Left) if inside => UserCommand::Seek(x),
                    _ => UserCommand::Continue,
                }
            }
            _ => UserCommand::Continue,
        };
        Ok(command)
    }

    /// Cleans up terminal state and exits alternate screen mode.
    ///
    /// # Errors
    /// - If terminal mode cannot be disabled
    /// - If cursor cannot be shown
    pub fn cleanup(&mut self) -> Result<(), Box<dyn Error>> {
        disable_raw_mode()?;
        execute!(
            self.terminal.backend_mut(),
            DisableMouseCapture,
            crossterm::terminal::LeaveAlternateScreen
        )?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

fn waveform_area(area: Rect) -> Rect {
    Rect {
        x: area.x,
        y: area.y,
        width: area.width,
        height: area.height.saturating_sub(FOOTER_HEIGHT),
    }
}

/// Formats recording time as `m:ss`.
fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Builds the footer for the current state.
fn footer_line(
    snapshot: &SessionSnapshot,
    hover_time: Option<f64>,
    config: &VisualizerConfig,
    status: Option<&str>,
) -> Line<'static> {
    let mut spans = Vec::new();

    let (indicator, color) = match snapshot.phase {
        Phase::Recording => ("● ", Color::Red),
        Phase::Paused | Phase::PlaybackPaused => ("⏸ ", Color::Yellow),
        Phase::Playing => ("▶ ", Color::Green),
        Phase::Errored => ("✗ ", Color::Red),
        _ => ("○ ", Color::Gray),
    };
    spans.push(Span::styled(indicator, Style::default().fg(color)));

    match snapshot.phase {
        Phase::Acquiring => spans.push(Span::raw("waiting for microphone")),
        Phase::Recording | Phase::Paused => {
            spans.push(Span::raw(format_elapsed(snapshot.elapsed_recording_time)))
        }
        Phase::Stopping | Phase::Processing => {
            if config.processing_text {
                spans.push(Span::raw("Processing Audio..."));
            }
        }
        Phase::Ready | Phase::Playing | Phase::PlaybackPaused => {
            if config.progress_indicator_time {
                spans.push(Span::raw(format!(
                    "{:.2} / {:.2}",
                    snapshot.current_playback_time, snapshot.total_duration
                )));
            } else {
                spans.push(Span::raw(format!("{:.2}", snapshot.total_duration)));
            }
            if let Some(hover) = hover_time {
                spans.push(Span::styled(
                    format!("  [{hover:.2}]"),
                    Style::default().fg(Color::Cyan),
                ));
            }
        }
        Phase::Idle | Phase::Errored => spans.push(Span::raw(snapshot.phase.to_string())),
    }

    if let Some(error) = &snapshot.last_error {
        spans.push(Span::styled(
            format!("  {error}"),
            Style::default().fg(Color::Red),
        ));
    } else if let Some(status) = status {
        spans.push(Span::raw(format!("  {status}")));
    }

    spans.push(Span::styled(
        "  r rec · space pause · s stop · w save · c clear · q quit",
        Style::default().fg(Color::DarkGray),
    ));

    Line::from(spans)
}
