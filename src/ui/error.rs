//! Full-screen error display for failures before the recorder UI starts.

use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    text::Text,
    widgets::{Paragraph, Wrap},
};
use std::io::{self, Stdout};

const ERROR_BG: Color = Color::Rgb(255, 0, 0);
const ERROR_FG: Color = Color::Rgb(255, 255, 255);

/// Red full-screen message, dismissed with any key.
pub struct ErrorScreen {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    active: bool,
}

impl ErrorScreen {
    /// Enters raw mode and the alternate screen.
    ///
    /// # Errors
    /// - If terminal cannot be initialized
    pub fn new() -> anyhow::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(ErrorScreen {
            terminal,
            active: true,
        })
    }

    /// Shows `error_message` centered on a red screen until a key is pressed.
    /// Each line of the message is its own paragraph line, wrapped to 80% of
    /// the screen width.
    ///
    /// # Errors
    /// - If terminal rendering fails
    pub fn show_error(&mut self, error_message: &str) -> anyhow::Result<()> {
        let text = error_text(error_message);

        loop {
            self.terminal.draw(|frame| {
                let area = frame.area();
                frame
                    .buffer_mut()
                    .set_style(area, Style::default().bg(ERROR_BG));

                let padding_x = area.width / 10;
                let text_height = (text.height() as u16).min(area.height);
                let centered_area = Rect {
                    x: area.x + padding_x,
                    y: area.y + area.height.saturating_sub(text_height) / 2,
                    width: area.width.saturating_sub(padding_x * 2),
                    height: area.height - area.height.saturating_sub(text_height) / 2,
                };

                let paragraph = Paragraph::new(text.clone())
                    .alignment(Alignment::Center)
                    .wrap(Wrap { trim: true });
                frame.render_widget(paragraph, centered_area);
            })?;

            if event::poll(std::time::Duration::from_millis(100))? {
                if let Event::Key(_) = event::read()? {
                    break;
                }
            }
        }

        Ok(())
    }

    /// Leaves the alternate screen and restores the cursor.
    ///
    /// # Errors
    /// - If terminal mode cannot be disabled
    pub fn cleanup(&mut self) -> anyhow::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for ErrorScreen {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

fn error_text(message: &str) -> Text<'static> {
    let style = Style::default().fg(ERROR_FG).bg(ERROR_BG);
    Text::from(
        message
            .lines()
            .map(|line| Line::from(Span::styled(line.to_string(), style)))
            .collect::<Vec<_>>(),
    )
}
