//! Application orchestration and command routing.
//!
//! Handles command-line argument parsing and delegates to appropriate command handlers.

use crate::commands;
use crate::logging;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use std::process;

/// A terminal voice recorder with a live scrolling waveform and seekable playback
#[derive(Parser)]
#[command(name = "voicewave")]
#[command(version)]
#[command(about = "A terminal voice recorder with a live scrolling waveform and seekable playback")]
#[command(long_about = "A terminal voice recorder with a live scrolling waveform and seekable playback.\n\nWhile recording, the microphone's amplitude scrolls across the screen. After\nstopping, the whole recording is drawn as a static waveform that follows\nplayback; click on it to seek.\n\nDEFAULT COMMAND:\n    If no command is specified, 'record' is used by default.\n\nKEYS:\n    r       start a new recording\n    space   pause / resume recording or playback\n    s       stop recording\n    w       save the recording\n    c       clear\n    q, Esc  quit\n\nEXAMPLES:\n    # Record from the configured microphone\n    $ voicewave\n\n    # Show and play an existing file\n    $ voicewave play memo.wav\n\n    # Edit configuration file\n    $ voicewave config")]
#[command(
    after_help = "CONFIGURATION:\n    Config file:        ~/.config/voicewave/voicewave.toml\n    Logs:               ~/.local/state/voicewave/voicewave.log.*"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Record from the microphone with the live waveform (default)
    ///
    /// Space pauses/resumes, s stops, w saves, c clears, q/Escape quits.
    #[command(visible_alias = "r")]
    Record,

    /// Show the waveform of an existing audio file and play it
    ///
    /// Supports WAV, MP3, FLAC, Ogg Vorbis and AAC files.
    #[command(visible_alias = "p")]
    Play {
        /// Path to the audio file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Open configuration file in your preferred editor
    ///
    /// Uses $EDITOR environment variable or falls back to nano/vi.
    #[command(visible_alias = "c")]
    Config,

    /// List available audio devices
    ///
    /// Shows device IDs, names, and configurations to help configure
    /// the correct input device in voicewave.toml.
    #[command(name = "list-devices")]
    ListDevices,

    /// Show recent log entries from the application
    ///
    /// Display the last 50 lines of the most recent log file.
    Logs,

    /// Generate shell completion script
    ///
    /// Examples:
    ///   voicewave completions bash > voicewave.bash
    ///   voicewave completions zsh > _voicewave
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Runs the main application based on command-line arguments.
///
/// # Exit Codes
/// - 0: Success
/// - 1: General error
/// - 2: Usage error (invalid arguments)
///
/// # Errors
/// - If logging initialization fails
/// - If command execution fails
pub async fn run() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Commands that need neither logging nor the TUI
    match &cli.command {
        Some(Commands::Completions { shell }) => {
            generate(*shell, &mut Cli::command(), "voicewave", &mut io::stdout());
            return Ok(());
        }
        Some(Commands::ListDevices) => {
            return match commands::handle_list_devices() {
                Ok(()) => Ok(()),
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            };
        }
        Some(Commands::Logs) => {
            return match commands::handle_logs() {
                Ok(()) => Ok(()),
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            };
        }
        _ => {}
    }

    logging::init_logging()?;

    match cli.command {
        None | Some(Commands::Record) => commands::handle_record().await?,
        Some(Commands::Play { file }) => commands::handle_play(&file).await?,
        Some(Commands::Config) => commands::handle_config()?,
        Some(Commands::Completions { .. }) | Some(Commands::ListDevices) | Some(Commands::Logs) => {
            unreachable!("These commands are handled earlier")
        }
    }

    Ok(())
}
