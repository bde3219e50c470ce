use std::env;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use keyscore::{
    analyze, load_paths, load_song, Error, KeyPresser, Player, PlayerConfig, PlayerEvent,
    PressError, SongLibrary, Status,
};
use log::LevelFilter;

/// Play JSON key-sheet songs as timed key presses.
/// Logging is controlled with RUST_LOG; see docs for the env_logger crate.
/// If RUST_LOG is not set, the log level defaults to Info.
#[derive(Parser)]
#[command(version, about, long_about = None, verbatim_doc_comment)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a song, printing each key press
    Play {
        /// Song file
        file: PathBuf,
        /// Player configuration (YAML)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Override the countdown length in seconds
        #[arg(long)]
        countdown: Option<u32>,
        /// Restart the song when it finishes
        #[arg(long = "loop")]
        looping: bool,
    },
    /// Summarize songs without playing them
    Inspect {
        /// Song files or folders of song files
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Print the effective key mapping
    Keymap {
        /// Player configuration (YAML)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// Stands in for OS key injection by logging each symbol
struct ConsolePresser;

impl KeyPresser for ConsolePresser {
    fn press(&self, symbol: &str) -> Result<(), PressError> {
        log::info!("press {}", symbol);
        Ok(())
    }
}

fn main() {
    let cli = Cli::parse();

    let mut log_builder = env_logger::builder();
    if env::var("RUST_LOG").is_err() {
        log_builder.filter_level(LevelFilter::Info);
    }
    log_builder.init();

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(command: Commands) -> Result<(), Error> {
    match command {
        Commands::Play {
            file,
            config,
            countdown,
            looping,
        } => play(file, config, countdown, looping),
        Commands::Inspect { paths } => {
            inspect(paths);
            Ok(())
        }
        Commands::Keymap { config } => keymap(config),
    }
}

fn load_config(path: Option<PathBuf>) -> Result<PlayerConfig, Error> {
    match path {
        Some(path) => Ok(PlayerConfig::load(path)?),
        None => Ok(PlayerConfig::default()),
    }
}

fn play(
    file: PathBuf,
    config: Option<PathBuf>,
    countdown: Option<u32>,
    looping: bool,
) -> Result<(), Error> {
    let mut config = load_config(config)?;
    if let Some(seconds) = countdown {
        config.countdown_seconds = seconds;
    }
    config.loop_playback |= looping;

    let parsed = load_song(&file)?;
    for warning in &parsed.warnings {
        eprintln!("warning: {}", warning);
    }

    let player = Player::new(&config, Arc::new(ConsolePresser))?;
    let events = player.subscribe();
    player.select_song(parsed.song);
    player.play()?;

    for event in events.iter() {
        match event {
            PlayerEvent::Progress {
                current_ms,
                total_ms,
            } => println!("{:>8}ms / {}ms", current_ms, total_ms),
            PlayerEvent::StatusChanged(Status::Error(detail)) => {
                println!("{}", Status::Error(detail.clone()));
                return Err(keyscore::PlaybackError::Unexpected(detail).into());
            }
            PlayerEvent::StatusChanged(status) => {
                println!("{}", status);
                if status == Status::Finished && !player.is_looping() {
                    break;
                }
            }
            PlayerEvent::SongFinished | PlayerEvent::StateChanged(_) => {}
        }
    }
    Ok(())
}

fn inspect(paths: Vec<PathBuf>) {
    let mut library = SongLibrary::new();
    let summary = load_paths(&mut library, paths);

    for song in library.songs() {
        let analysis = analyze(song);
        println!(
            "{}: {} bpm, {} notes, {} groups, {} chords, {}ms",
            analysis.name,
            analysis.bpm,
            analysis.notes,
            analysis.groups,
            analysis.chords,
            analysis.duration_ms
        );
    }
    println!("{}", summary);
}

fn keymap(config: Option<PathBuf>) -> Result<(), Error> {
    let player = Player::new(&load_config(config)?, Arc::new(ConsolePresser))?;
    for (id, symbol) in player.dispatcher().keymap().iter() {
        println!("{:<8} {}", id.to_string(), symbol);
    }
    Ok(())
}
